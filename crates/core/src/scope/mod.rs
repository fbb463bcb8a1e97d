//! Consumer-side entry point.
//!
//! [`Scope::new`] hands back the real-time [`LoudnessProducer`] together with
//! a [`Scope`] that the periodic tick drives: drain, ingest, render.

use crate::{
    loudness_queue, Frame, HistoryStore, LoudnessConsumer, LoudnessProducer, Result, ScopeConfig,
    Viewport, ViewportRenderer, ZoomController, ZoomEvent, ZoomState,
};

/// Outcome of one consumer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    /// Samples moved from the queue into history during this tick.
    pub ingested: usize,
    /// Samples the producer has dropped since construction.
    pub dropped_total: u64,
}

impl TickReport {
    /// New data arrived, so the view should be redrawn.
    pub fn needs_redraw(&self) -> bool {
        self.ingested > 0
    }
}

/// Consumer-side façade: owns the history, the zoom state and the renderer,
/// and drains the queue once per tick.
///
/// Everything here runs on the consumer thread. The matching
/// [`LoudnessProducer`] returned by [`Scope::new`] is the only handle the
/// real-time side needs.
#[derive(Debug)]
pub struct Scope {
    queue: LoudnessConsumer,
    history: HistoryStore,
    zoom: ZoomController,
    renderer: ViewportRenderer,
    reported_drops: u64,
}

impl Scope {
    /// Validates `config` and allocates every buffer up front.
    pub fn new(config: &ScopeConfig) -> Result<(LoudnessProducer, Self)> {
        config.validate()?;
        let (producer, queue) = loudness_queue(config.queue.capacity);
        let scope = Self {
            queue,
            history: HistoryStore::new(&config.history)?,
            zoom: ZoomController::new(config.zoom.clone())?,
            renderer: ViewportRenderer::new(config.render.clone())?,
            reported_drops: 0,
        };
        tracing::info!(
            queue_capacity = config.queue.capacity,
            history_capacity = config.history.capacity,
            decimation = config.history.decimation,
            "scope initialised"
        );
        Ok((producer, scope))
    }

    /// Drains every pending sample into the history.
    pub fn tick(&mut self) -> TickReport {
        let history = &mut self.history;
        let ingested = self.queue.drain_into(|sample| history.ingest(sample));

        let dropped_total = self.queue.dropped();
        if dropped_total > self.reported_drops {
            tracing::warn!(
                dropped = dropped_total - self.reported_drops,
                dropped_total,
                "loudness queue overflowed; newest samples were discarded"
            );
            self.reported_drops = dropped_total;
        }
        if ingested > 0 {
            tracing::debug!(ingested, total = self.history.total_ingested(), "tick");
        }

        TickReport {
            ingested,
            dropped_total,
        }
    }

    /// Builds this frame's geometry.
    pub fn render(&self, viewport: Viewport) -> Frame {
        self.renderer.render(&self.history, &self.zoom.state(), viewport)
    }

    /// Applies a scroll event. Returns whether a redraw is needed.
    pub fn handle_zoom(&mut self, event: ZoomEvent) -> bool {
        self.zoom.handle(event)
    }

    pub fn zoom(&self) -> ZoomState {
        self.zoom.state()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }
}
