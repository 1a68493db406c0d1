use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pagepipe::application::{
    DebugJitter, Delay, NoDelay, RenderError, Scheduler, SchedulerOptions, Transport,
    TransportError,
};
use pagepipe::domain::markup::{HYPHEN_ENTITY, collapse_line_breaks_and_tabs};
use pagepipe::domain::{Pagelet, PageletId, PageletPhase, Priority, Resource};
use pagepipe::infra::transport::MemoryTransport;
use serde_json::Value;

fn scheduler(options: SchedulerOptions) -> Scheduler {
    Scheduler::with_options(options, Arc::new(NoDelay))
}

fn pipelined() -> Scheduler {
    scheduler(SchedulerOptions::default())
}

fn pagelet(id: &str, priority: i32) -> Pagelet {
    Pagelet::new(id, Priority::new(priority)).expect("valid pagelet")
}

/// Wire JSON carried by one pipelined chunk.
fn arrival(chunk: &str) -> Value {
    let start = chunk
        .find("onPageletArrive(")
        .map(|at| at + "onPageletArrive(".len())
        .expect("arrival call");
    let end = chunk
        .rfind(", document.getElementById(")
        .expect("arrival target");
    serde_json::from_str(&chunk[start..end]).expect("wire json")
}

fn arrivals(transport: &MemoryTransport) -> Vec<Value> {
    transport
        .chunks()
        .iter()
        .map(|chunk| arrival(chunk))
        .collect()
}

fn ids(wires: &[Value]) -> Vec<&str> {
    wires
        .iter()
        .map(|wire| wire["ID"].as_str().expect("id"))
        .collect()
}

#[derive(Default)]
struct RecordingDelay {
    pauses: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Delay for RecordingDelay {
    async fn pause(&self, duration: Duration) {
        self.pauses.lock().unwrap().push(duration);
    }
}

/// Accepts a fixed number of writes, then reports a closed peer.
struct FailingTransport {
    inner: MemoryTransport,
    writes_left: usize,
}

impl FailingTransport {
    fn after(writes: usize) -> Self {
        Self {
            inner: MemoryTransport::new(),
            writes_left: writes,
        }
    }
}

#[async_trait]
impl Transport for FailingTransport {
    async fn write(&mut self, text: &str) -> Result<(), TransportError> {
        if self.writes_left == 0 {
            return Err(TransportError::Closed);
        }
        self.writes_left -= 1;
        self.inner.write(text).await
    }

    async fn flush(&mut self) -> Result<(), TransportError> {
        self.inner.flush().await
    }
}

/// Refuses one flush call, counted from the first.
struct FlushFailsOnce {
    inner: MemoryTransport,
    flushes: usize,
    fail_at: usize,
}

#[async_trait]
impl Transport for FlushFailsOnce {
    async fn write(&mut self, text: &str) -> Result<(), TransportError> {
        self.inner.write(text).await
    }

    async fn flush(&mut self) -> Result<(), TransportError> {
        self.flushes += 1;
        if self.flushes == self.fail_at {
            return Err(TransportError::Io(std::io::Error::other("flush refused")));
        }
        self.inner.flush().await
    }
}

/// Text inside the hidden block's comment.
fn comment_body(chunk: &str) -> &str {
    let start = chunk.find("<!-- ").expect("comment open") + "<!-- ".len();
    let end = chunk.find(" --></code>").expect("comment close");
    &chunk[start..end]
}

#[tokio::test]
async fn delivers_by_priority_then_registration_order() {
    let mut scheduler = pipelined();
    scheduler.register(pagelet("a", 50));
    scheduler.register(pagelet("b", 100));
    scheduler.register(pagelet("c", 50));
    scheduler.register(pagelet("d", 0));
    scheduler.register(pagelet("e", 100));

    let mut transport = MemoryTransport::new();
    let summary = scheduler.render(&mut transport).await.unwrap();

    assert_eq!(summary.emitted, 5);
    assert!(summary.pipelined);
    assert_eq!(ids(&arrivals(&transport)), ["b", "e", "a", "c", "d"]);
    assert!(scheduler.is_empty());
}

#[tokio::test]
async fn render_order_previews_the_next_pass() {
    let mut scheduler = pipelined();
    scheduler.register(pagelet("a", 50));
    scheduler.register(pagelet("b", 100));
    scheduler.register(pagelet("c", 50));

    let order: Vec<&str> = scheduler
        .render_order()
        .into_iter()
        .map(PageletId::as_str)
        .collect();
    assert_eq!(order, ["b", "a", "c"]);
}

#[tokio::test]
async fn only_the_final_fragment_is_marked_last() {
    let mut scheduler = pipelined();
    for (id, priority) in [("x", 10), ("y", 30), ("z", 20)] {
        scheduler.register(pagelet(id, priority));
    }

    let mut transport = MemoryTransport::new();
    scheduler.render(&mut transport).await.unwrap();

    let wires = arrivals(&transport);
    let flagged: Vec<&str> = wires
        .iter()
        .filter(|wire| wire.get("IS_LAST") == Some(&Value::Bool(true)))
        .map(|wire| wire["ID"].as_str().unwrap())
        .collect();
    assert_eq!(flagged, ["x"]);
    assert!(wires[0].get("IS_LAST").is_none());
}

#[tokio::test]
async fn each_fragment_is_flushed_on_its_own() {
    let mut scheduler = pipelined();
    scheduler.register(pagelet("a", 1));
    scheduler.register(pagelet("b", 2));
    scheduler.register(pagelet("c", 3));

    let mut transport = MemoryTransport::new();
    transport.write("<html>").await.unwrap();
    scheduler.render(&mut transport).await.unwrap();

    // shell flush plus one per fragment
    assert_eq!(transport.flush_count(), 4);
    assert_eq!(transport.chunks().len(), 4);
    assert_eq!(transport.chunks()[0], "<html>");
    assert_eq!(transport.unflushed(), "");
}

#[tokio::test]
async fn duplicate_registration_is_ignored() {
    let mut scheduler = pipelined();
    assert!(scheduler.register(pagelet("a", 50)));
    assert!(!scheduler.register(pagelet("a", 100)));
    assert_eq!(scheduler.pending_len(), 1);

    let mut transport = MemoryTransport::new();
    scheduler.render(&mut transport).await.unwrap();

    let wires = arrivals(&transport);
    assert_eq!(ids(&wires), ["a"]);
    assert_eq!(wires[0]["PRIORITY"], 50);
}

#[tokio::test]
async fn empty_render_flushes_and_writes_nothing() {
    let mut scheduler = pipelined();
    let mut transport = MemoryTransport::new();

    let summary = scheduler.render(&mut transport).await.unwrap();

    assert_eq!(summary.emitted, 0);
    assert_eq!(transport.flush_count(), 1);
    assert_eq!(transport.output(), "");
}

#[tokio::test]
async fn unregistered_pagelets_are_not_delivered() {
    let mut scheduler = pipelined();
    scheduler.register(pagelet("keep", 10));
    scheduler.register(pagelet("drop", 20));

    let id = PageletId::new("drop").unwrap();
    assert!(scheduler.unregister(&id).is_some());
    assert!(scheduler.unregister(&id).is_none());
    assert!(!scheduler.is_registered(&id));

    let mut transport = MemoryTransport::new();
    scheduler.render(&mut transport).await.unwrap();
    assert_eq!(ids(&arrivals(&transport)), ["keep"]);
}

#[tokio::test]
async fn fallback_mode_inlines_tags_without_arrival_calls() {
    let mut scheduler = scheduler(SchedulerOptions {
        pipelining: false,
        ..SchedulerOptions::default()
    });
    let mut page = pagelet("side", 50);
    page.attach_resource(Resource::javascript("side-js", "/side.js").unwrap());
    page.attach_resource(Resource::stylesheet("side-css", "/side.css").unwrap());
    page.attach_inline_script("ready();");
    scheduler.register(page);

    let mut transport = MemoryTransport::new();
    let summary = scheduler.render(&mut transport).await.unwrap();

    assert!(!summary.pipelined);
    assert_eq!(transport.flush_count(), 1);
    let output = transport.output();
    assert!(!output.contains("onPageletArrive"));
    assert_eq!(
        output.lines().collect::<Vec<_>>(),
        [
            "<link rel=\"stylesheet\" href=\"/side.css\" />",
            "<script src=\"/side.js\"></script>",
            "<script>ready();</script>",
        ]
    );
}

#[tokio::test]
async fn markup_is_normalized_for_the_hidden_block() {
    let mut scheduler = pipelined();
    scheduler.register(pagelet("m", 50).with_markup("<p>a--b</p>\r\n\t\t<p>c</p>"));

    let mut transport = MemoryTransport::new();
    scheduler.render(&mut transport).await.unwrap();

    let chunk = &transport.chunks()[0];
    assert!(chunk.starts_with(
        "<code hidden id=\"_m\"><!-- <p>a&#45;&#45;b</p> <p>c</p> --></code>\n"
    ));
    assert!(chunk.ends_with("document.getElementById(\"_m\"));</script>\n\n"));
}

#[tokio::test]
async fn comment_escaping_round_trips_to_collapsed_markup() {
    let inputs = [
        "---",
        "<!-- x -->",
        "a-\n-b",
        "--\r\n--",
        "-",
        "a-",
        "<p>x</p>\t\t<p>y--z</p>",
    ];

    for input in inputs {
        let mut scheduler = pipelined();
        scheduler.register(pagelet("m", 50).with_markup(input));
        let mut transport = MemoryTransport::new();
        scheduler.render(&mut transport).await.unwrap();

        let body = comment_body(&transport.chunks()[0]);
        assert!(!body.contains("--"), "{input:?} left `--` in {body:?}");
        assert_eq!(
            body.replace(HYPHEN_ENTITY, "-"),
            collapse_line_breaks_and_tabs(input),
            "{input:?} did not round-trip"
        );
    }
}

#[tokio::test]
async fn script_terminators_in_callbacks_survive_encoding() {
    let mut scheduler = pipelined();
    let mut page = pagelet("s", 50);
    page.attach_phase_callback(PageletPhase::Html, "log('</script>');");
    scheduler.register(page);

    let mut transport = MemoryTransport::new();
    scheduler.render(&mut transport).await.unwrap();

    let chunk = &transport.chunks()[0];
    assert_eq!(chunk.matches("</script>").count(), 1);
    assert_eq!(
        arrival(chunk)["PHASE_CALLBACKS"]["HTML"][0],
        "log('</script>');"
    );
}

#[tokio::test]
async fn debug_mode_injects_diagnostics_and_pauses() {
    let delay = Arc::new(RecordingDelay::default());
    let mut scheduler = Scheduler::with_options(
        SchedulerOptions {
            debug: true,
            ..SchedulerOptions::default()
        },
        delay.clone(),
    );
    let mut page = pagelet("d", 50);
    page.attach_resource(Resource::stylesheet("d-css", "/d.css").unwrap());
    scheduler.register(page);
    scheduler.register(pagelet("e", 40));

    let mut transport = MemoryTransport::new();
    scheduler.render(&mut transport).await.unwrap();

    let pauses = delay.pauses.lock().unwrap().clone();
    assert_eq!(pauses.len(), 2);
    for pause in pauses {
        let ms = pause.as_millis();
        assert!((250..=350).contains(&ms), "pause {ms}ms out of range");
        assert_eq!(ms % 2, 0);
    }

    let first = &transport.chunks()[0];
    assert!(first.contains("\n  \"ID\": \"d\""), "debug json is pretty");

    let wire = arrival(first);
    for phase in ["INIT", "LOADCSS", "HTML", "LOADJS", "DONE"] {
        assert_eq!(
            wire["PHASE_CALLBACKS"][phase],
            serde_json::json!([{ "SUBJECT": "PAGELET", "ID": "d", "PHASE": phase }])
        );
    }
    let css = &wire["RESOURCES"]["STYLESHEET"][0]["PHASE_CALLBACKS"];
    for phase in ["INIT", "LOAD", "DONE"] {
        assert_eq!(
            css[phase],
            serde_json::json!([{ "SUBJECT": "STYLESHEET", "ID": "d-css", "PHASE": phase }])
        );
    }
}

#[tokio::test]
async fn debug_mode_is_ignored_without_pipelining() {
    let delay = Arc::new(RecordingDelay::default());
    let mut scheduler = Scheduler::with_options(
        SchedulerOptions {
            pipelining: false,
            debug: true,
            ..SchedulerOptions::default()
        },
        delay.clone(),
    );
    scheduler.register(pagelet("a", 50));

    let mut transport = MemoryTransport::new();
    scheduler.render(&mut transport).await.unwrap();

    assert!(delay.pauses.lock().unwrap().is_empty());
    assert!(!transport.output().contains("SUBJECT"));
}

#[tokio::test]
async fn failed_transport_leaves_undelivered_pagelets_pending() {
    let mut scheduler = pipelined();
    scheduler.register(pagelet("a", 30));
    scheduler.register(pagelet("b", 20));
    scheduler.register(pagelet("c", 10));

    let mut broken = FailingTransport::after(1);
    let err = scheduler.render(&mut broken).await.unwrap_err();
    assert!(matches!(
        err,
        RenderError::Transport(TransportError::Closed)
    ));
    assert_eq!(ids(&arrivals(&broken.inner)), ["a"]);
    assert_eq!(scheduler.pending_len(), 2);
    assert!(!scheduler.is_registered(&PageletId::new("a").unwrap()));

    let mut transport = MemoryTransport::new();
    scheduler.render(&mut transport).await.unwrap();
    let wires = arrivals(&transport);
    assert_eq!(ids(&wires), ["b", "c"]);
    assert_eq!(wires[1]["IS_LAST"], true);
}

#[tokio::test]
async fn failed_flush_does_not_duplicate_the_written_fragment() {
    let mut scheduler = pipelined();
    scheduler.register(pagelet("a", 20));
    scheduler.register(pagelet("b", 10));

    // first flush is the shell flush, second follows fragment `a`
    let mut transport = FlushFailsOnce {
        inner: MemoryTransport::new(),
        flushes: 0,
        fail_at: 2,
    };
    let err = scheduler.render(&mut transport).await.unwrap_err();
    assert!(matches!(err, RenderError::Transport(TransportError::Io(_))));
    assert_eq!(scheduler.pending_len(), 1);
    assert!(!scheduler.is_registered(&PageletId::new("a").unwrap()));

    scheduler.render(&mut transport).await.unwrap();
    let wires = arrivals(&transport.inner);
    assert_eq!(ids(&wires), ["a", "b"]);
    assert!(wires[0].get("IS_LAST").is_none());
    assert_eq!(wires[1]["IS_LAST"], true);
    assert!(scheduler.is_empty());
}

#[tokio::test]
async fn retried_debug_render_does_not_duplicate_diagnostics() {
    let mut scheduler = scheduler(SchedulerOptions {
        debug: true,
        pretty_debug_json: false,
        jitter: DebugJitter::new(0, 0).unwrap(),
        ..SchedulerOptions::default()
    });
    scheduler.register(pagelet("r", 50));

    let mut broken = FailingTransport::after(0);
    assert!(scheduler.render(&mut broken).await.is_err());
    assert_eq!(scheduler.pending_len(), 1);

    let mut transport = MemoryTransport::new();
    scheduler.render(&mut transport).await.unwrap();
    let wire = arrival(&transport.chunks()[0]);
    assert_eq!(wire["PHASE_CALLBACKS"]["INIT"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn mode_changes_apply_to_the_next_pass() {
    let mut scheduler = pipelined();
    scheduler.register(pagelet("first", 50));
    let mut transport = MemoryTransport::new();
    scheduler.render(&mut transport).await.unwrap();
    assert!(transport.output().contains("onPageletArrive"));

    scheduler.set_pipelining_enabled(false);
    assert!(!scheduler.is_pipelining_enabled());
    let mut page = pagelet("second", 50);
    page.attach_inline_script("go();");
    scheduler.register(page);

    let mut transport = MemoryTransport::new();
    scheduler.render(&mut transport).await.unwrap();
    assert_eq!(transport.output(), "<script>go();</script>\n");
}

#[test]
fn placeholder_follows_pipelining_flag() {
    let page = pagelet("slot", 50).with_markup("<b>x</b>");
    let mut scheduler = pipelined();
    assert_eq!(scheduler.placeholder(&page), "<div id=\"slot\"></div>");

    scheduler.set_pipelining_enabled(false);
    assert_eq!(scheduler.placeholder(&page), "<div id=\"slot\"><b>x</b></div>");
}
