use std::collections::HashMap;

use runframe_app::{DebounceTicket, Event};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::trace;

/// Runs the debounce timers requested by the core, each timer sends `Event::DebounceElapsed` when it expires.
pub struct DebounceScheduler {
    events: UnboundedSender<Event>,
    timers: HashMap<u64, JoinHandle<()>>,
}

impl DebounceScheduler {
    pub fn new(events: UnboundedSender<Event>) -> Self {
        Self {
            events,
            timers: HashMap::new(),
        }
    }

    pub fn schedule(&mut self, ticket: DebounceTicket) {
        trace!("Scheduling. ticket: {:?}", ticket);

        let events = self.events.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(ticket.delay).await;
            if events
                .send(Event::DebounceElapsed {
                    ticket,
                })
                .is_err()
            {
                trace!("Event receiver closed, dropping ticket. ticket: {:?}", ticket);
            }
        });

        self.timers
            .retain(|_generation, timer| !timer.is_finished());
        if let Some(previous) = self
            .timers
            .insert(ticket.generation, timer)
        {
            previous.abort();
        }
    }

    pub fn cancel(&mut self, ticket: DebounceTicket) {
        if let Some(timer) = self.timers.remove(&ticket.generation) {
            trace!("Cancelling. ticket: {:?}", ticket);
            timer.abort();
        }
    }

    /// True when every timer has either fired or been cancelled.
    pub fn is_idle(&self) -> bool {
        self.timers
            .values()
            .all(JoinHandle::is_finished)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc::unbounded_channel;

    use super::*;

    fn ticket(generation: u64) -> DebounceTicket {
        DebounceTicket {
            generation,
            delay: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn cancelled_timer_does_not_fire() {
        // given
        let (tx, mut rx) = unbounded_channel();
        let mut scheduler = DebounceScheduler::new(tx);

        // when
        scheduler.schedule(ticket(1));
        scheduler.cancel(ticket(1));
        scheduler.schedule(ticket(2));

        // then
        match rx.recv().await {
            Some(Event::DebounceElapsed {
                ticket,
            }) => assert_eq!(ticket.generation, 2),
            other => panic!("unexpected event: {:?}", other),
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
        assert!(scheduler.is_idle());
    }
}
