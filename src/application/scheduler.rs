//! Priority-ordered pagelet scheduler.
//!
//! One scheduler serves one page render: callers register pagelets, then call
//! [`Scheduler::render`] once the page shell has been written. Pagelets are
//! delivered highest priority first, in registration order within a priority,
//! either as pipelined arrival chunks (one flush each) or, with pipelining
//! disabled, as plain inlined asset tags.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{Pagelet, PageletId, Priority};

use super::delay::{DebugJitter, Delay, TokioDelay};
use super::emission;
use super::transport::{Transport, TransportError};

const TARGET: &str = "pagepipe::scheduler";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("failed to encode wire structure: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Mode flags and debug tuning applied to a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerOptions {
    pub pipelining: bool,
    pub debug: bool,
    /// Pretty-print wire JSON while debug mode is on.
    pub pretty_debug_json: bool,
    pub jitter: DebugJitter,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            pipelining: true,
            debug: false,
            pretty_debug_json: true,
            jitter: DebugJitter::default(),
        }
    }
}

impl From<&crate::config::PipelineSettings> for SchedulerOptions {
    fn from(settings: &crate::config::PipelineSettings) -> Self {
        Self {
            pipelining: settings.enabled,
            debug: settings.debug,
            pretty_debug_json: settings.pretty_debug_json,
            jitter: settings.debug_jitter,
        }
    }
}

/// Outcome of a completed render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSummary {
    pub emitted: usize,
    pub pipelined: bool,
}

pub struct Scheduler {
    /// Keyed by registration sequence so iteration is registration order.
    pending: BTreeMap<u64, Pagelet>,
    index: HashMap<PageletId, u64>,
    next_seq: u64,
    options: SchedulerOptions,
    delay: Arc<dyn Delay>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::with_options(SchedulerOptions::default(), Arc::new(TokioDelay))
    }

    pub fn with_options(options: SchedulerOptions, delay: Arc<dyn Delay>) -> Self {
        Self {
            pending: BTreeMap::new(),
            index: HashMap::new(),
            next_seq: 0,
            options,
            delay,
        }
    }

    /// Queue a pagelet. Returns `false`, leaving the queue untouched, when a
    /// pagelet with the same identity is already pending.
    pub fn register(&mut self, pagelet: Pagelet) -> bool {
        if self.index.contains_key(pagelet.id()) {
            debug!(target: TARGET, pagelet = %pagelet.id(), "duplicate registration ignored");
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.index.insert(pagelet.id().clone(), seq);
        self.pending.insert(seq, pagelet);
        true
    }

    /// Remove a pending pagelet by identity; `None` when it is not queued.
    pub fn unregister(&mut self, id: &PageletId) -> Option<Pagelet> {
        let seq = self.index.remove(id)?;
        self.pending.remove(&seq)
    }

    pub fn is_registered(&self, id: &PageletId) -> bool {
        self.index.contains_key(id)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn set_pipelining_enabled(&mut self, enabled: bool) {
        self.options.pipelining = enabled;
    }

    pub fn is_pipelining_enabled(&self) -> bool {
        self.options.pipelining
    }

    pub fn set_debug_mode(&mut self, enabled: bool) {
        self.options.debug = enabled;
    }

    pub fn is_debug_mode(&self) -> bool {
        self.options.debug
    }

    pub fn options(&self) -> SchedulerOptions {
        self.options
    }

    /// Placeholder element for `pagelet` under the current pipelining flag.
    pub fn placeholder(&self, pagelet: &Pagelet) -> String {
        pagelet.placeholder(self.options.pipelining)
    }

    /// Identities in the order the next render pass would deliver them.
    pub fn render_order(&self) -> Vec<&PageletId> {
        self.ordered_sequence()
            .into_iter()
            .filter_map(|seq| self.pending.get(&seq).map(Pagelet::id))
            .collect()
    }

    fn ordered_sequence(&self) -> Vec<u64> {
        let mut buckets: BTreeMap<Reverse<Priority>, Vec<u64>> = BTreeMap::new();
        for (seq, pagelet) in &self.pending {
            buckets
                .entry(Reverse(pagelet.priority()))
                .or_default()
                .push(*seq);
        }
        buckets.into_values().flatten().collect()
    }

    /// Deliver every pending pagelet to `transport`.
    ///
    /// The delivery order and the `IS_LAST` position are fixed from a snapshot
    /// taken when the pass starts. A pagelet leaves the queue as soon as its
    /// chunk has been written, before the per-fragment flush. If a write
    /// fails, the pass stops and that pagelet and the ones after it stay
    /// pending so the caller can render again. A failed flush stops the pass
    /// too, but the written pagelet is not queued a second time.
    pub async fn render<T>(&mut self, transport: &mut T) -> Result<RenderSummary, RenderError>
    where
        T: Transport + ?Sized,
    {
        transport.flush().await?;

        let order = self.ordered_sequence();
        let total = order.len();
        let pipelined = self.options.pipelining;
        let mode = if pipelined { "pipelined" } else { "inline" };

        if total == 0 {
            debug!(target: TARGET, "render pass with no pending pagelets");
            return Ok(RenderSummary {
                emitted: 0,
                pipelined,
            });
        }

        counter!("pagepipe_render_passes_total", "mode" => mode).increment(1);
        info!(
            target: TARGET,
            pagelets = total,
            pipelining = pipelined,
            debug = self.options.debug,
            "render pass started"
        );

        let started = Instant::now();
        let mut emitted = 0;
        for (position, seq) in order.iter().enumerate() {
            let is_last = position + 1 == total;
            if let Err(err) = self.write_fragment(*seq, is_last, transport).await {
                return Err(abort(err, mode, emitted, total));
            }

            let Some(pagelet) = self.pending.remove(seq) else {
                continue;
            };
            self.index.remove(pagelet.id());
            emitted += 1;
            counter!("pagepipe_pagelets_emitted_total", "mode" => mode).increment(1);

            if pipelined {
                if let Err(err) = transport.flush().await {
                    return Err(abort(err.into(), mode, emitted, total));
                }
                debug!(
                    target: TARGET,
                    pagelet = %pagelet.id(),
                    priority = pagelet.priority().get(),
                    is_last,
                    "pagelet flushed"
                );
            }
        }

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        histogram!("pagepipe_render_ms", "mode" => mode).record(elapsed_ms);
        info!(target: TARGET, emitted, elapsed_ms, "render pass finished");

        Ok(RenderSummary { emitted, pipelined })
    }

    async fn write_fragment<T>(
        &mut self,
        seq: u64,
        is_last: bool,
        transport: &mut T,
    ) -> Result<(), RenderError>
    where
        T: Transport + ?Sized,
    {
        let Some(pagelet) = self.pending.get_mut(&seq) else {
            return Ok(());
        };

        if !self.options.pipelining {
            transport.write(&emission::inline_chunk(pagelet)).await?;
            return Ok(());
        }

        if self.options.debug {
            pagelet.inject_phase_diagnostics();
            let pause = self.options.jitter.sample();
            histogram!("pagepipe_debug_delay_ms").record(pause.as_millis() as f64);
            self.delay.pause(pause).await;
        }

        let pretty = self.options.debug && self.options.pretty_debug_json;
        let chunk = emission::pipelined_chunk(pagelet, is_last, pretty)?;
        transport.write(&chunk).await?;
        Ok(())
    }
}

fn abort(err: RenderError, mode: &'static str, emitted: usize, total: usize) -> RenderError {
    counter!("pagepipe_render_failures_total", "mode" => mode).increment(1);
    warn!(
        target: TARGET,
        error = %err,
        emitted,
        remaining = total - emitted,
        "render pass aborted"
    );
    err
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
