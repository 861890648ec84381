use tracing::debug;

use super::{Artifact, new_render_id};
use crate::debounce::Debouncer;

/// What the preview pane currently shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RenderState {
    /// Nothing rendered yet.
    #[default]
    Idle,
    Success(Artifact),
    /// Terse diagnostic for the user.
    Failure(String),
}

/// A render the runtime should perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub seq: u64,
    pub render_id: String,
    pub source: String,
}

/// How a [`RenderRequest`] ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Rendered(Artifact),
    /// Validation rejected the source; the full render was skipped.
    Invalid(String),
    /// The renderer itself failed.
    Failed(String),
}

/// Schedules renders off a settle timer and applies only the newest result.
#[derive(Debug, Clone)]
pub struct RenderDriver {
    settle: Debouncer<String>,
    next_seq: u64,
    latest_seq: Option<u64>,
    state: RenderState,
}

impl RenderDriver {
    pub const fn new(settle_ms: u64) -> Self {
        Self {
            settle: Debouncer::new(settle_ms),
            next_seq: 0,
            latest_seq: None,
            state: RenderState::Idle,
        }
    }

    /// Note that the text changed; restarts the settle timer.
    pub fn on_change(&mut self, text: &str, now_ms: u64) {
        self.settle.queue(text.to_string(), now_ms);
    }

    /// Issue a render once the text has settled.
    ///
    /// Blank text is dropped without a request and the current visual stays.
    pub fn poll(&mut self, now_ms: u64) -> Option<RenderRequest> {
        let source = self.settle.take_ready(now_ms)?;
        if source.trim().is_empty() {
            return None;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.latest_seq = Some(seq);
        let request = RenderRequest {
            seq,
            render_id: new_render_id(),
            source,
        };
        debug!(seq, render_id = %request.render_id, "render scheduled");
        Some(request)
    }

    /// Apply a finished render. Returns `false` if a newer request has been
    /// issued since, in which case the outcome is ignored.
    pub fn apply(&mut self, seq: u64, outcome: RenderOutcome) -> bool {
        if self.latest_seq != Some(seq) {
            debug!(seq, latest = ?self.latest_seq, "stale render ignored");
            return false;
        }
        self.state = match outcome {
            RenderOutcome::Rendered(artifact) => RenderState::Success(artifact),
            RenderOutcome::Invalid(diagnostic) | RenderOutcome::Failed(diagnostic) => {
                RenderState::Failure(diagnostic)
            }
        };
        true
    }

    pub const fn state(&self) -> &RenderState {
        &self.state
    }

    /// The artifact currently on display, if the last applied render succeeded.
    pub const fn artifact(&self) -> Option<&Artifact> {
        match &self.state {
            RenderState::Success(artifact) => Some(artifact),
            _ => None,
        }
    }

    pub const fn is_settling(&self) -> bool {
        self.settle.is_pending()
    }

    pub fn deadline_ms(&self) -> Option<u64> {
        self.settle.deadline_ms()
    }
}
