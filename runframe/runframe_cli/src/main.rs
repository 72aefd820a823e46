use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use anyhow::Context;
use circuit_output::CircuitOutput;
use clap::Parser;
use file_sync::{reconcile_files, FsMap};
use manual_edits::{apply_edit_events_with_recovery, EditEvent, ManualEditState, RecoveredManualEdits};
use runframe_app::eval_version::EvalVersionResolver;
use runframe_app::{build_run_completed_payload, ExecutionError, RunFrameConfig};
use tracing::{info, warn};

use crate::file_server::{FileServerClient, FILE_UPDATED};
use crate::opts::{ModeCommand, Opts};
use crate::registry::NpmRegistry;
use crate::replay::Replay;
use crate::worker::PrecomputedCircuitWorker;

mod file_server;
mod opts;
mod registry;
mod replay;
mod scheduler;
mod worker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = argfile::expand_args(argfile::parse_fromfile, argfile::PREFIX)?;

    let opts = Opts::parse_from(args);

    cli::tracing::configure_tracing(opts.trace.clone(), opts.verbose.clone())?;

    let config = match &opts.config {
        Some(path) => RunFrameConfig::load(path)?,
        None => RunFrameConfig::default(),
    };

    match opts.command {
        ModeCommand::ApplyEdits {
            events,
            circuit,
            manual_edits,
            server,
        } => {
            let manual_edits_path = manual_edits.unwrap_or_else(|| config.manual_edits_file_path.clone());
            let edit_events = load_edit_events(&events)?;
            let circuit_output = load_circuit_output(&circuit)?;

            match server {
                None => apply_edits_locally(&edit_events, &circuit_output, &PathBuf::from(manual_edits_path))?,
                Some(server) => {
                    apply_edits_on_server(&edit_events, &circuit_output, &manual_edits_path, server).await?
                }
            }
        }
        ModeCommand::Payload {
            circuit,
            execution_error,
        } => {
            let circuit_output = circuit
                .as_deref()
                .map(load_circuit_output)
                .transpose()?;
            let execution_error = execution_error.map(|(name, message)| ExecutionError::new(name, message));

            let payload = build_run_completed_payload(circuit_output.as_ref(), execution_error.as_ref());

            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        ModeCommand::Sync {
            server,
            cache,
            changed,
            output,
        } => {
            let client = FileServerClient::new(server);
            let remote_files = client.list_files().await?;

            let cache: FsMap = match cache {
                Some(path) => serde_json::from_str(&read_to_string(path)?)?,
                None => FsMap::new(),
            };

            let fs_map = reconcile_files(&remote_files, &cache, &changed, |file| {
                let client = &client;
                let file = file.clone();
                async move { client.fetch(&file).await }
            })
            .await;

            std::fs::write(&output, serde_json::to_string_pretty(&fs_map)?)?;
            info!("Synced files. files: {}, output: {:?}", fs_map.len(), output);
        }
        ModeCommand::ResolveVersion {
            version,
            force_latest,
            registry,
        } => {
            let resolver = EvalVersionResolver::new(NpmRegistry::new(registry));
            let resolved = resolver
                .resolve(&version, force_latest)
                .await?;

            println!("{}", resolved);
        }
        ModeCommand::Replay {
            project,
            events,
            circuit,
            interval,
            debounce,
            no_auto_render,
        } => {
            let mut config = config;
            if let Some(debounce) = debounce {
                config.debounce_ms = debounce.as_millis() as u64;
            }
            if no_auto_render {
                config.auto_rerender_on_edit_finish = false;
            }

            let edit_events = load_edit_events(&events)?;
            let worker =
                PrecomputedCircuitWorker::new(load_circuit_output(&circuit)?, config.manual_edits_file_path.clone());

            let summary = Replay::run(project, config, worker, edit_events, interval).await?;

            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

fn load_edit_events(path: &Path) -> anyhow::Result<Vec<EditEvent>> {
    let content = read_to_string(path).with_context(|| format!("Unable to read edit events. path: {:?}", path))?;
    let edit_events: Vec<EditEvent> =
        serde_json::from_str(&content).with_context(|| format!("Invalid edit events. path: {:?}", path))?;
    info!("Loaded edit events. count: {}, path: {:?}", edit_events.len(), path);
    Ok(edit_events)
}

fn load_circuit_output(path: &Path) -> anyhow::Result<CircuitOutput> {
    let content = read_to_string(path).with_context(|| format!("Unable to read circuit output. path: {:?}", path))?;
    let circuit_output =
        CircuitOutput::from_json_str(&content).with_context(|| format!("Invalid circuit output. path: {:?}", path))?;
    info!("Loaded circuit output. elements: {}, path: {:?}", circuit_output.len(), path);
    Ok(circuit_output)
}

fn fold(edit_events: &[EditEvent], circuit_output: &CircuitOutput, existing: Option<&str>) -> ManualEditState {
    let RecoveredManualEdits {
        state,
        warning,
    } = apply_edit_events_with_recovery(edit_events, circuit_output, existing);

    if let Some(warning) = warning {
        warn!("Malformed manual edits have been replaced. cause: {}", warning);
    }

    state
}

fn apply_edits_locally(
    edit_events: &[EditEvent],
    circuit_output: &CircuitOutput,
    manual_edits_path: &Path,
) -> anyhow::Result<()> {
    let existing = manual_edits::file::read_document_text(manual_edits_path)?;

    let state = fold(edit_events, circuit_output, existing.as_deref());
    manual_edits::file::save(&state, manual_edits_path)?;

    info!(
        "Applied edit events. pcb_placements: {}, schematic_placements: {}, trace_hints: {}",
        state.pcb_placements.len(),
        state.schematic_placements.len(),
        state.manual_trace_hints.len()
    );

    Ok(())
}

async fn apply_edits_on_server(
    edit_events: &[EditEvent],
    circuit_output: &CircuitOutput,
    manual_edits_path: &str,
    server: String,
) -> anyhow::Result<()> {
    let client = FileServerClient::new(server);

    let existing = client
        .get_file(manual_edits_path)
        .await?;

    let state = fold(edit_events, circuit_output, existing.as_deref());
    let content = state.to_json_string()?;

    client
        .upsert_file(manual_edits_path, &content)
        .await?;
    client
        .create_event(FILE_UPDATED, manual_edits_path)
        .await?;

    info!("Applied edit events on server. path: {}", manual_edits_path);

    Ok(())
}
