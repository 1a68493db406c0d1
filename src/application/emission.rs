//! Text emitted per fragment in each delivery mode.

use std::fmt::Write as _;

use crate::domain::{Pagelet, PageletWire, ResourceKind};

/// Global object of the browser runtime.
pub const CLIENT_RUNTIME: &str = "BigPipe";
/// Entry point invoked once per arriving fragment.
pub const ARRIVAL_ENTRY: &str = "onPageletArrive";

/// DOM id of the hidden block carrying a fragment's markup.
pub fn block_id(pagelet: &Pagelet) -> String {
    format!("_{}", pagelet.id())
}

/// Encode a wire structure for embedding inside a `<script>` element.
pub fn encode_wire(wire: &PageletWire<'_>, pretty: bool) -> Result<String, serde_json::Error> {
    let json = if pretty {
        serde_json::to_string_pretty(wire)?
    } else {
        serde_json::to_string(wire)?
    };
    // `<\/` is a valid JSON escape and cannot close the script element.
    Ok(json.replace("</", "<\\/"))
}

/// Script expression resolving the hidden block, with the id as a JSON string literal.
fn element_lookup(block: &str) -> Result<String, serde_json::Error> {
    Ok(format!("document.getElementById({})", serde_json::to_string(block)?))
}

/// Hidden content block followed by the arrival call for one fragment.
pub fn pipelined_chunk(
    pagelet: &Pagelet,
    is_last: bool,
    pretty: bool,
) -> Result<String, serde_json::Error> {
    let block = block_id(pagelet);
    let markup = pagelet.render_markup();
    let json = encode_wire(&pagelet.wire(is_last), pretty)?;
    let lookup = element_lookup(&block)?;

    Ok(format!(
        "<code hidden id=\"{block}\"><!-- {markup} --></code>\n\
         <script>{CLIENT_RUNTIME}.{ARRIVAL_ENTRY}({json}, {lookup});</script>\n\n"
    ))
}

/// Static fallback: stylesheet tags, script tags, then inline scripts, one per line.
pub fn inline_chunk(pagelet: &Pagelet) -> String {
    let mut out = String::new();
    for kind in ResourceKind::ALL {
        for resource in pagelet.resources(kind) {
            out.push_str(&resource.html_tag());
            out.push('\n');
        }
    }
    for script in pagelet.inline_scripts() {
        let _ = writeln!(out, "<script>{script}</script>");
    }
    out
}
