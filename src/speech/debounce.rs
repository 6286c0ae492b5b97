use std::time::Duration;

/// Identity of one debounce cycle; only the newest ticket may dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceTicket(u64);

/// Quiet-period bookkeeping
///
/// Every notification supersedes the previous ticket. When the timer for
/// the current ticket elapses, the last notified text is released once.
#[derive(Debug)]
pub struct Debouncer {
    quiet_period: Duration,
    cycle: u64,
    pending: Option<String>,
}

impl Debouncer {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            cycle: 0,
            pending: None,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Record new text and restart the quiet period
    pub fn notify(&mut self, text: impl Into<String>) -> DebounceTicket {
        self.cycle += 1;
        self.pending = Some(text.into());
        DebounceTicket(self.cycle)
    }

    /// The timer for `ticket` fired
    ///
    /// Returns the text to dispatch if the ticket is still current and the
    /// text is non-empty after trimming.
    pub fn elapsed(&mut self, ticket: DebounceTicket) -> Option<String> {
        if ticket.0 != self.cycle {
            return None;
        }
        let text = self.pending.take()?;
        if text.trim().is_empty() {
            return None;
        }
        Some(text)
    }

    /// Invalidate any outstanding ticket
    pub fn cancel(&mut self) {
        self.cycle += 1;
        self.pending = None;
    }
}
