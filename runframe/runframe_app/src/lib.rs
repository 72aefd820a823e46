use std::collections::BTreeMap;
use std::time::SystemTime;

use circuit_output::CircuitOutput;
use crux_core::macros::effect;
use crux_core::render::RenderOperation;
pub use crux_core::Core;
use crux_core::{render, App, Command};
pub use file_sync::FsMap;
pub use manual_edits::EditEvent;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

pub use crate::auto_render::AutoRenderPolicy;
pub use crate::config::RunFrameConfig;
pub use crate::controller::{BatchId, ControllerState, EditEventController, FlushOutcome};
pub use crate::debounce::{DebounceTicket, Debouncer};
use crate::effects::persistence::PersistenceOperation;
use crate::effects::runner::RunnerOperation;
use crate::effects::scheduler::SchedulerOperation;
use crate::effects::{persistence, runner, scheduler};
pub use crate::payload::{build_run_completed_payload, ExecutionError, RenderCompletedPayload};

pub mod auto_render;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod effects;
pub mod eval_version;
pub mod payload;
pub mod worker;

#[cfg(test)]
mod tests;

#[derive(Default)]
pub struct RunFrame;

struct PendingWrite {
    content: String,
    finished: bool,
}

#[derive(Default)]
pub struct Model {
    config: RunFrameConfig,
    controller: EditEventController,
    auto_render: AutoRenderPolicy,
    fs_map: FsMap,
    /// The output of the last successful render, used to resolve component ids to selectors.
    circuit_output: CircuitOutput,
    /// Documents handed to the shell for writing, keyed by batch, until the write is confirmed.
    pending_writes: BTreeMap<BatchId, PendingWrite>,
    /// The newest batch whose write has been confirmed, an older confirmation must not replace its document.
    last_confirmed_batch: Option<BatchId>,
    rendering: bool,
    last_payload: Option<RenderCompletedPayload>,

    notification: Option<(chrono::DateTime<chrono::Utc>, Notification)>,
}

impl Model {
    fn notify(&mut self, level: NotificationLevel, message: String) {
        self.notification
            .replace((chrono::DateTime::from(SystemTime::now()), Notification {
                level,
                message,
            }));
    }

    fn manual_edits_text(&self) -> Option<&str> {
        self.fs_map
            .get(&self.config.manual_edits_file_path)
            .map(String::as_str)
    }

    fn render_command(&self, trigger: u64) -> Command<Effect, Event> {
        runner::render(trigger, self.fs_map.clone(), self.config.entrypoint.clone())
    }
}

#[effect]
pub enum Effect {
    Render(RenderOperation),
    Scheduler(SchedulerOperation),
    Persistence(PersistenceOperation),
    Runner(RunnerOperation),
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

#[derive(serde::Serialize, serde::Deserialize, Default, Debug, Clone, PartialEq)]
pub struct RunFrameViewModel {
    pub state: ControllerState,
    /// Edits to overlay on the rendered output.
    pub edit_events_for_render: Vec<EditEvent>,
    pub unapplied_edit_events: usize,
    pub render_trigger_count: u64,
    pub last_payload: Option<RenderCompletedPayload>,
    pub notification: Option<(chrono::DateTime<chrono::Utc>, Notification)>,
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub enum Event {
    None,
    Configure {
        config: RunFrameConfig,
    },
    /// The initial file map of the session.
    FilesLoaded {
        files: FsMap,
    },
    /// A file was changed outside of the edit event flow, e.g. by the code editor.
    FileChanged {
        path: String,
        content: String,
    },
    EditEventReceived {
        edit_event: EditEvent,
    },
    DebounceElapsed {
        ticket: DebounceTicket,
    },
    PersistCompleted {
        batch: BatchId,
        result: Result<(), String>,
    },
    RequestRender,
    RenderStarted,
    RenderCompleted {
        circuit_output: Option<CircuitOutput>,
        execution_error: Option<ExecutionError>,
    },
    /// Discard all edit events, e.g. when another project is opened.
    Reset,
}

impl RunFrame {
    fn update_inner(
        &self,
        event: <RunFrame as App>::Event,
    ) -> Box<
        dyn FnOnce(
            &mut <RunFrame as App>::Model,
        ) -> Result<Command<<RunFrame as App>::Effect, <RunFrame as App>::Event>, AppError>,
    > {
        match event {
            Event::None => Box::new(|_model: &mut Model| Ok(render::render())),
            Event::Configure {
                config,
            } => Box::new(move |model: &mut Model| {
                info!("Configuring. config: {:?}", config);
                model
                    .controller
                    .debouncer_mut()
                    .set_delay(config.debounce());
                model
                    .auto_render
                    .set_enabled(config.auto_rerender_on_edit_finish);
                model.config = config;

                Ok(render::render())
            }),
            Event::FilesLoaded {
                files,
            } => Box::new(move |model: &mut Model| {
                info!("Files loaded. files: {}", files.len());
                model.fs_map = files;

                Ok(render::render())
            }),
            Event::FileChanged {
                path,
                content,
            } => Box::new(move |model: &mut Model| {
                if model.fs_map.get(&path) == Some(&content) {
                    trace!("File unchanged. path: {}", path);
                    return Ok(Command::done());
                }

                debug!("File changed. path: {}", path);
                model.fs_map.insert(path, content);

                let trigger = model.auto_render.request_render();

                Ok(Command::all(vec![model.render_command(trigger), render::render()]))
            }),
            Event::EditEventReceived {
                edit_event,
            } => Box::new(move |model: &mut Model| {
                let rearm = model
                    .controller
                    .push_edit_event(edit_event);

                let mut commands = Vec::with_capacity(3);
                if let Some(cancelled) = rearm.cancelled {
                    commands.push(scheduler::cancel(cancelled));
                }
                commands.push(scheduler::schedule(rearm.scheduled));
                commands.push(render::render());

                Ok(Command::all(commands))
            }),
            Event::DebounceElapsed {
                ticket,
            } => Box::new(move |model: &mut Model| {
                let existing_document_text = model
                    .manual_edits_text()
                    .map(str::to_string);

                let outcome = model.controller.flush(
                    &ticket,
                    &model.circuit_output,
                    existing_document_text.as_deref(),
                );

                match outcome {
                    FlushOutcome::Stale => Ok(Command::done()),
                    FlushOutcome::Deferred | FlushOutcome::Nothing => Ok(render::render()),
                    FlushOutcome::Persist(request) => {
                        if let Some(warning) = request.warning {
                            model.notify(
                                NotificationLevel::Warning,
                                format!("Malformed manual edits have been replaced. cause: {}", warning),
                            );
                        }

                        model
                            .pending_writes
                            .insert(request.batch, PendingWrite {
                                content: request.content.clone(),
                                finished: request.finished,
                            });

                        Ok(Command::all(vec![
                            persistence::write_manual_edits(
                                request.batch,
                                model.config.manual_edits_file_path.clone(),
                                request.content,
                            ),
                            render::render(),
                        ]))
                    }
                    FlushOutcome::Failed {
                        error,
                    } => {
                        model.notify(NotificationLevel::Error, format!("Unable to apply edits. cause: {}", error));
                        Ok(render::render())
                    }
                }
            }),
            Event::PersistCompleted {
                batch,
                result,
            } => Box::new(move |model: &mut Model| {
                let pending_write = model
                    .pending_writes
                    .remove(&batch)
                    .ok_or(AppError::UnknownBatch(batch))?;

                match result {
                    Ok(()) => {
                        model.controller.mark_persisted(batch);

                        // every batch folds all unconfirmed events, so a newer document contains the older edits
                        if model
                            .last_confirmed_batch
                            .is_none_or(|last| batch > last)
                        {
                            model.last_confirmed_batch = Some(batch);
                            model.fs_map.insert(
                                model.config.manual_edits_file_path.clone(),
                                pending_write.content,
                            );
                        } else {
                            debug!(
                                "Keeping newer manual edits. batch: {:?}, last_confirmed_batch: {:?}",
                                batch, model.last_confirmed_batch
                            );
                        }

                        match model
                            .auto_render
                            .on_batch_persisted(pending_write.finished)
                        {
                            Some(trigger) => Ok(Command::all(vec![model.render_command(trigger), render::render()])),
                            None => Ok(render::render()),
                        }
                    }
                    Err(reason) => {
                        warn!("Unable to save manual edits. batch: {:?}, cause: {}", batch, reason);
                        model.notify(
                            NotificationLevel::Error,
                            format!("Unable to save manual edits. cause: {}", reason),
                        );

                        let mut commands = Vec::with_capacity(3);
                        if let Some(rearm) = model.controller.mark_persist_failed(batch) {
                            if let Some(cancelled) = rearm.cancelled {
                                commands.push(scheduler::cancel(cancelled));
                            }
                            commands.push(scheduler::schedule(rearm.scheduled));
                        }
                        commands.push(render::render());

                        Ok(Command::all(commands))
                    }
                }
            }),
            Event::RequestRender => Box::new(|model: &mut Model| {
                let trigger = model.auto_render.request_render();

                Ok(model.render_command(trigger))
            }),
            Event::RenderStarted => Box::new(|model: &mut Model| {
                if model.rendering {
                    warn!("Render started while another render is in flight");
                }
                model.rendering = true;

                let reflected = model.controller.mark_render_started();
                debug!("Edit events read by the render. count: {}", reflected.len());

                Ok(render::render())
            }),
            Event::RenderCompleted {
                circuit_output,
                execution_error,
            } => Box::new(move |model: &mut Model| {
                if !model.rendering {
                    return Err(AppError::RenderNotStarted);
                }
                model.rendering = false;

                let dropped = model.controller.begin_reconciling();
                debug!("Edit events reflected in the finished render. count: {}", dropped.len());

                let payload = build_run_completed_payload(circuit_output.as_ref(), execution_error.as_ref());
                info!(
                    "Render completed. has_execution_error: {}, errors: {}",
                    payload.has_execution_error,
                    payload.errors.len()
                );

                // keep the previous output when execution failed, ids in pending edits still resolve against it
                if let Some(circuit_output) = circuit_output {
                    model.circuit_output = circuit_output;
                }

                model.controller.mark_render_complete();
                model.last_payload = Some(payload);

                Ok(render::render())
            }),
            Event::Reset => Box::new(|model: &mut Model| {
                let cancelled = model.controller.reset();
                model.pending_writes.clear();
                model.rendering = false;
                model.last_payload = None;

                let mut commands = Vec::with_capacity(2);
                if let Some(cancelled) = cancelled {
                    commands.push(scheduler::cancel(cancelled));
                }
                commands.push(render::render());

                Ok(Command::all(commands))
            }),
        }
    }
}

impl App for RunFrame {
    type Event = Event;
    type Model = Model;
    type ViewModel = RunFrameViewModel;
    type Capabilities = ();
    type Effect = Effect;

    fn update(
        &self,
        event: Self::Event,
        model: &mut Self::Model,
        _caps: &Self::Capabilities,
    ) -> Command<Self::Effect, Self::Event> {
        let try_fn = self.update_inner(event);

        model.notification.take();

        match try_fn(model) {
            Err(e) => {
                model.notify(NotificationLevel::Error, format!("{}", e));
                render::render()
            }
            Ok(command) => command,
        }
    }

    fn view(&self, model: &Self::Model) -> Self::ViewModel {
        let view_model = RunFrameViewModel {
            state: model.controller.state(),
            edit_events_for_render: model
                .controller
                .edit_events_for_render()
                .into_iter()
                .cloned()
                .collect(),
            unapplied_edit_events: model.controller.unapplied_count(),
            render_trigger_count: model.auto_render.render_trigger_count(),
            last_payload: model.last_payload.clone(),
            notification: model.notification.clone(),
        };

        trace!("view model: {:?}", view_model);

        view_model
    }
}

#[derive(Error, Debug)]
enum AppError {
    #[error("Unknown persistence batch. batch: {0:?}")]
    UnknownBatch(BatchId),
    #[error("Render completed without being started")]
    RenderNotStarted,
}
