//! Trailing-edge debouncing on an explicit millisecond clock.
//!
//! Callers pass `now_ms` in, so the same type serves the live event loop
//! (elapsed time since start) and tests (synthetic clocks).

/// Quiet period before an edit is pushed to the record store.
pub const AUTOSAVE_QUIET_MS: u64 = 1500;

/// Settle delay before an edit is pushed to the renderer.
pub const RENDER_SETTLE_MS: u64 = 200;

/// Holds at most one pending value and releases it once the input has been
/// quiet for `delay_ms`.
///
/// Queuing a new value replaces the pending one and restarts the quiet
/// period. Replaced values are dropped, never emitted.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay_ms: u64,
    pending: Option<(T, u64)>,
}

impl<T> Debouncer<T> {
    pub const fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    pub fn queue(&mut self, value: T, now_ms: u64) {
        self.pending = Some((value, now_ms));
    }

    /// Take the pending value if its quiet period has fully elapsed.
    pub fn take_ready(&mut self, now_ms: u64) -> Option<T> {
        let queued_at = self.pending.as_ref()?.1;
        if now_ms.saturating_sub(queued_at) >= self.delay_ms {
            self.pending.take().map(|(value, _)| value)
        } else {
            None
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Clock value at which the pending value becomes ready.
    pub fn deadline_ms(&self) -> Option<u64> {
        self.pending
            .as_ref()
            .map(|(_, queued_at)| queued_at.saturating_add(self.delay_ms))
    }

    pub const fn delay_ms(&self) -> u64 {
        self.delay_ms
    }
}
