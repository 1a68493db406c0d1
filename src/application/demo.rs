//! Demonstration page assembled from a handful of pagelets.

use crate::domain::{DomainError, Pagelet, Priority, markup::escape_attribute};

use super::error::AppError;
use super::factory::PageletFactory;
use super::scheduler::{RenderSummary, Scheduler};
use super::transport::Transport;

const PAGE_TAIL: &str = "</body>\n</html>\n";

struct Section {
    id: &'static str,
    priority: Priority,
    markup: &'static str,
    script: Option<&'static str>,
}

/// Sections in document order; priorities are mixed.
const SECTIONS: &[Section] = &[
    Section {
        id: "header",
        priority: Priority::HIGH,
        markup: "<header>\n\t<h1>pagepipe</h1>\n</header>",
        script: None,
    },
    Section {
        id: "sidebar",
        priority: Priority::LOW,
        markup: "<aside>\n\t<h2>Related</h2>\n\t<ul><li>Pagelets</li><li>Phases</li></ul>\n</aside>",
        script: Some("/static/pagelets/sidebar.js"),
    },
    Section {
        id: "content",
        priority: Priority::HIGHEST,
        markup: "<main>\n\t<h2>Progressive delivery</h2>\n\t<p>Each block arrives on its own.</p>\n</main>",
        script: Some("/static/pagelets/content.js"),
    },
    Section {
        id: "comments",
        priority: Priority::LOWEST,
        markup: "<section>\n\t<h2>Comments</h2>\n\t<p>Loaded last -- lowest priority on the page.</p>\n</section>",
        script: None,
    },
    Section {
        id: "footer",
        priority: Priority::NORMAL,
        markup: "<footer>\n\t<!-- generated -->\n\t<small>pagepipe</small>\n</footer>",
        script: None,
    },
];

/// Pagelets of the demo page, in document order.
pub fn demo_pagelets(factory: &PageletFactory) -> Result<Vec<Pagelet>, DomainError> {
    SECTIONS
        .iter()
        .map(|section| -> Result<Pagelet, DomainError> {
            let mut pagelet = factory
                .create_pagelet(Some(section.id), Some(section.priority))?
                .with_markup(section.markup);
            pagelet.attach_resource(factory.create_stylesheet(
                &format!("{}-css", section.id),
                &format!("/static/pagelets/{}.css", section.id),
            )?);
            if let Some(src) = section.script {
                pagelet.attach_resource(
                    factory.create_javascript(&format!("{}-js", section.id), src)?,
                );
            }
            pagelet.attach_inline_script(format!(
                "document.documentElement.dataset.{} = \"ready\";",
                section.id
            ));
            Ok(pagelet)
        })
        .collect()
}

fn page_head(runtime_script_url: Option<&str>) -> String {
    let mut head = String::from(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\" />\n<title>pagepipe</title>\n",
    );
    if let Some(url) = runtime_script_url {
        head.push_str(&format!(
            "<script src=\"{}\"></script>\n",
            escape_attribute(url)
        ));
    }
    head.push_str("</head>\n<body>\n");
    head
}

/// Write the page shell and its placeholders, then let the scheduler deliver
/// the pagelets, then close the document.
pub async fn stream_page<T>(
    scheduler: &mut Scheduler,
    pagelets: Vec<Pagelet>,
    runtime_script_url: &str,
    transport: &mut T,
) -> Result<RenderSummary, AppError>
where
    T: Transport + ?Sized,
{
    let pipelining = scheduler.is_pipelining_enabled();
    let mut shell = page_head(pipelining.then_some(runtime_script_url));
    for pagelet in &pagelets {
        shell.push_str(&scheduler.placeholder(pagelet));
        shell.push('\n');
    }
    transport.write(&shell).await?;

    for pagelet in pagelets {
        scheduler.register(pagelet);
    }
    let summary = scheduler.render(transport).await?;

    transport.write(PAGE_TAIL).await?;
    transport.flush().await?;
    Ok(summary)
}
