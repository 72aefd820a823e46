use std::time::Duration;

use tracing::trace;

/// Identifies one arming of a [`Debouncer`].
///
/// The shell runs the delayed task and reports the ticket back, only the ticket of the latest arming fires.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DebounceTicket {
    pub generation: u64,
    pub delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rearm {
    pub scheduled: DebounceTicket,
    /// The pending ticket that was superseded, if any.
    pub cancelled: Option<DebounceTicket>,
}

/// A cancellable delayed task, last-write-wins.
///
/// Arming again supersedes the pending ticket, so a burst of arms results in a single firing, `delay` after the
/// last one.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    generation: u64,
    pending: Option<DebounceTicket>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: 0,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Applies to subsequent arms only.
    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    pub fn arm(&mut self) -> Rearm {
        self.generation += 1;
        let scheduled = DebounceTicket {
            generation: self.generation,
            delay: self.delay,
        };
        let cancelled = self.pending.replace(scheduled);

        trace!("Debouncer armed. scheduled: {:?}, cancelled: {:?}", scheduled, cancelled);

        Rearm {
            scheduled,
            cancelled,
        }
    }

    pub fn cancel(&mut self) -> Option<DebounceTicket> {
        self.pending.take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_current(&self, ticket: &DebounceTicket) -> bool {
        self.pending.as_ref() == Some(ticket)
    }

    /// Consumes the pending ticket, returns `false` for a superseded or cancelled ticket.
    pub fn fire(&mut self, ticket: &DebounceTicket) -> bool {
        if !self.is_current(ticket) {
            trace!("Ignoring stale debounce ticket. ticket: {:?}", ticket);
            return false;
        }
        self.pending = None;
        true
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(Duration::from_millis(crate::config::DEFAULT_DEBOUNCE_MS))
    }
}
