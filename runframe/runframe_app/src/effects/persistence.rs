use crux_core::capability::Operation;
use crux_core::{Command, Request};

use crate::controller::BatchId;

/// The shell writes `content` to `path` and answers with `Event::PersistCompleted` for the batch.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub enum PersistenceOperation {
    WriteManualEdits {
        batch: BatchId,
        path: String,
        content: String,
    },
}

impl Operation for PersistenceOperation {
    type Output = ();
}

pub fn write_manual_edits<Effect, Event>(batch: BatchId, path: String, content: String) -> Command<Effect, Event>
where
    Effect: From<Request<PersistenceOperation>> + Send + 'static,
    Event: Send + 'static,
{
    Command::notify_shell(PersistenceOperation::WriteManualEdits {
        batch,
        path,
        content,
    })
    .into()
}
