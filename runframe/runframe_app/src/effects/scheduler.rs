use std::future::Future;

use crux_core::capability::Operation;
use crux_core::command::NotificationBuilder;
use crux_core::{Command, Request};

use crate::debounce::DebounceTicket;

/// The shell sends `Event::DebounceElapsed` with the ticket once the delay has passed, unless cancelled.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub enum SchedulerOperation {
    Schedule { ticket: DebounceTicket },
    Cancel { ticket: DebounceTicket },
}

impl Operation for SchedulerOperation {
    type Output = ();
}

pub fn schedule_builder<Effect, Event>(
    ticket: DebounceTicket,
) -> NotificationBuilder<Effect, Event, impl Future<Output = ()>>
where
    Effect: From<Request<SchedulerOperation>> + Send + 'static,
    Event: Send + 'static,
{
    Command::notify_shell(SchedulerOperation::Schedule {
        ticket,
    })
}

pub fn schedule<Effect, Event>(ticket: DebounceTicket) -> Command<Effect, Event>
where
    Effect: From<Request<SchedulerOperation>> + Send + 'static,
    Event: Send + 'static,
{
    schedule_builder(ticket).into()
}

pub fn cancel<Effect, Event>(ticket: DebounceTicket) -> Command<Effect, Event>
where
    Effect: From<Request<SchedulerOperation>> + Send + 'static,
    Event: Send + 'static,
{
    Command::notify_shell(SchedulerOperation::Cancel {
        ticket,
    })
    .into()
}
