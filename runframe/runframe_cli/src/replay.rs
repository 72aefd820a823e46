//! Replays edit events through the core, with real timers, file writes and renders.
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail};
use crossbeam_channel::{unbounded, Receiver, Sender};
use file_sync::{load_initial_files, FetchError, FsMap, RemoteFile};
use manual_edits::EditEvent;
use runframe_app::effects::persistence::PersistenceOperation;
use runframe_app::effects::runner::RunnerOperation;
use runframe_app::effects::scheduler::SchedulerOperation;
use runframe_app::worker::{run_render, CircuitWorker};
use runframe_app::{Core, Effect, Event, NotificationLevel, RenderCompletedPayload, RunFrame, RunFrameConfig};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::scheduler::DebounceScheduler;

#[derive(serde::Serialize, Debug)]
pub struct ReplaySummary {
    pub renders: usize,
    pub render_trigger_count: u64,
    pub last_payload: Option<RenderCompletedPayload>,
}

/// Build the file map of a project directory, file paths are relative and '/' separated.
pub async fn load_project(directory: &Path) -> anyhow::Result<FsMap> {
    let mut remote_files = vec![];
    collect_files(directory, directory, &mut remote_files)?;
    remote_files.sort_by(|a, b| a.file_path.cmp(&b.file_path));

    debug!("Loading project. directory: {:?}, files: {}", directory, remote_files.len());

    let fs_map = load_initial_files(&remote_files, |file| {
        let path = directory.join(&file.file_path);
        let file_path = file.file_path.clone();
        async move {
            std::fs::read_to_string(&path).map_err(|error| FetchError::Request {
                file_path,
                reason: error.to_string(),
            })
        }
    })
    .await;

    Ok(fs_map)
}

fn collect_files(root: &Path, directory: &Path, remote_files: &mut Vec<RemoteFile>) -> anyhow::Result<()> {
    for entry in std::fs::read_dir(directory)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(root, &path, remote_files)?;
            continue;
        }

        let relative_path = path
            .strip_prefix(root)?
            .components()
            .map(|component| {
                component
                    .as_os_str()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect::<Vec<_>>()
            .join("/");

        remote_files.push(RemoteFile {
            file_id: relative_path.clone(),
            file_path: relative_path,
        });
    }
    Ok(())
}

pub struct Replay<W> {
    core: Core<RunFrame>,
    project_directory: PathBuf,
    worker: W,
    scheduler: DebounceScheduler,
    events_tx: UnboundedSender<Event>,
    renders: usize,
}

impl<W: CircuitWorker> Replay<W> {
    pub async fn run(
        project_directory: PathBuf,
        config: RunFrameConfig,
        worker: W,
        edit_events: Vec<EditEvent>,
        interval: Duration,
    ) -> anyhow::Result<ReplaySummary> {
        let fs_map = load_project(&project_directory).await?;
        if fs_map.is_empty() {
            bail!("No files in project. directory: {:?}", project_directory);
        }

        let (events_tx, mut events_rx) = unbounded_channel::<Event>();

        let mut replay = Replay {
            core: Core::new(),
            project_directory,
            worker,
            scheduler: DebounceScheduler::new(events_tx.clone()),
            events_tx: events_tx.clone(),
            renders: 0,
        };

        replay
            .dispatch(Event::Configure {
                config,
            })
            .await?;
        replay
            .dispatch(Event::FilesLoaded {
                files: fs_map,
            })
            .await?;
        replay
            .dispatch(Event::RequestRender)
            .await?;

        info!("Replaying edit events. count: {}, interval: {:?}", edit_events.len(), interval);
        let feeder = Self::spawn_feeder(events_tx, edit_events, interval);

        loop {
            if let Ok(event) = events_rx.try_recv() {
                replay.dispatch(event).await?;
                continue;
            }

            if replay.scheduler.is_idle() && feeder.is_finished() {
                // a timer or the feeder may have sent just before finishing
                match events_rx.try_recv() {
                    Ok(event) => {
                        replay.dispatch(event).await?;
                        continue;
                    }
                    Err(_) => break,
                }
            }

            match events_rx.recv().await {
                Some(event) => replay.dispatch(event).await?,
                None => break,
            }
        }

        let view = replay.core.view();
        info!(
            "Replay finished. renders: {}, render_trigger_count: {}, state: {}",
            replay.renders, view.render_trigger_count, view.state
        );

        Ok(ReplaySummary {
            renders: replay.renders,
            render_trigger_count: view.render_trigger_count,
            last_payload: view.last_payload,
        })
    }

    fn spawn_feeder(
        events_tx: UnboundedSender<Event>,
        edit_events: Vec<EditEvent>,
        interval: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            for (index, edit_event) in edit_events.into_iter().enumerate() {
                if index > 0 && !interval.is_zero() {
                    tokio::time::sleep(interval).await;
                }
                if events_tx
                    .send(Event::EditEventReceived {
                        edit_event,
                    })
                    .is_err()
                {
                    warn!("Event receiver closed, stopping replay");
                    return;
                }
            }
        })
    }

    /// Process an event and every effect it causes, including effects of events sent by the effects.
    async fn dispatch(&mut self, event: Event) -> anyhow::Result<()> {
        let (tx, rx) = unbounded::<Effect>();

        self.process_event(event, &tx)?;

        self.run_effects(&rx, &tx).await
    }

    fn process_event(&self, event: Event, tx: &Sender<Effect>) -> anyhow::Result<()> {
        trace!("process_event. event: {:?}", event);

        for effect in self.core.process_event(event) {
            tx.send(effect)
                .map_err(|e| anyhow!("{:?}", e))?;
        }
        Ok(())
    }

    async fn run_effects(&mut self, rx: &Receiver<Effect>, tx: &Sender<Effect>) -> anyhow::Result<()> {
        while let Ok(effect) = rx.try_recv() {
            trace!("run_effects. effect: {:?}", effect);
            match effect {
                _render @ Effect::Render(_) => {
                    let view = self.core.view();

                    if let Some((_timestamp, notification)) = view.notification {
                        match notification.level {
                            NotificationLevel::Error => error!("{}", notification.message),
                            NotificationLevel::Warning => warn!("{}", notification.message),
                            NotificationLevel::Info => info!("{}", notification.message),
                        }
                    }
                }
                Effect::Scheduler(request) => match request.operation {
                    SchedulerOperation::Schedule {
                        ticket,
                    } => self.scheduler.schedule(ticket),
                    SchedulerOperation::Cancel {
                        ticket,
                    } => self.scheduler.cancel(ticket),
                },
                Effect::Persistence(request) => match request.operation {
                    PersistenceOperation::WriteManualEdits {
                        batch,
                        path,
                        content,
                    } => {
                        let file_path = self.project_directory.join(&path);
                        info!("Writing manual edits. batch: {:?}, path: {:?}", batch, file_path);

                        let result = std::fs::write(&file_path, content).map_err(|error| error.to_string());

                        self.send(Event::PersistCompleted {
                            batch,
                            result,
                        });
                    }
                },
                Effect::Runner(request) => match request.operation {
                    RunnerOperation::Render {
                        trigger,
                        fs_map,
                        entrypoint,
                    } => {
                        info!("Rendering. trigger: {}, entrypoint: {}", trigger, entrypoint);

                        self.process_event(Event::RenderStarted, tx)?;

                        let completed = run_render(&mut self.worker, &fs_map, &entrypoint).await;
                        self.renders += 1;

                        self.send(completed);
                    }
                },
            }
        }
        Ok(())
    }

    fn send(&self, event: Event) {
        if self.events_tx.send(event).is_err() {
            warn!("Event receiver closed");
        }
    }
}
