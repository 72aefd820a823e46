use crux_core::capability::Operation;
use crux_core::{Command, Request};
use file_sync::FsMap;

/// Ask the shell to run the circuit worker.
///
/// The shell sends `Event::RenderStarted` before executing and `Event::RenderCompleted` afterwards.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub enum RunnerOperation {
    Render {
        trigger: u64,
        fs_map: FsMap,
        entrypoint: String,
    },
}

impl Operation for RunnerOperation {
    type Output = ();
}

pub fn render<Effect, Event>(trigger: u64, fs_map: FsMap, entrypoint: String) -> Command<Effect, Event>
where
    Effect: From<Request<RunnerOperation>> + Send + 'static,
    Event: Send + 'static,
{
    Command::notify_shell(RunnerOperation::Render {
        trigger,
        fs_map,
        entrypoint,
    })
    .into()
}
