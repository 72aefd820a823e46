use circuit_output::CircuitOutput;
use file_sync::{is_static_asset_content, FsMap};
use futures::future::BoxFuture;
use thiserror::Error;
use tracing::{info, warn};

use crate::payload::ExecutionError;
use crate::Event;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkerError {
    #[error("No files to execute")]
    EmptyFsMap,
    #[error("Entrypoint not found. entrypoint: {0}")]
    MissingEntrypoint(String),
    #[error("Execution failed. name: {}, message: {}", .0.name, .0.message)]
    Execution(ExecutionError),
}

impl From<WorkerError> for ExecutionError {
    fn from(value: WorkerError) -> Self {
        match value {
            WorkerError::Execution(error) => error,
            other => ExecutionError::new("WorkerError", other.to_string()),
        }
    }
}

/// Evaluates user circuit code, implemented by the shell.
pub trait CircuitWorker: Send {
    fn execute_with_fs_map<'a>(
        &'a mut self,
        fs_map: &'a FsMap,
        entrypoint: &'a str,
    ) -> BoxFuture<'a, Result<(), WorkerError>>;
    fn render_until_settled(&mut self) -> BoxFuture<'_, Result<(), WorkerError>>;
    fn get_circuit_json(&mut self) -> BoxFuture<'_, Result<CircuitOutput, WorkerError>>;
}

/// Check the inputs that a worker cannot execute without.
pub fn validate_execution_input(fs_map: &FsMap, entrypoint: &str) -> Result<(), WorkerError> {
    if fs_map.is_empty() {
        return Err(WorkerError::EmptyFsMap);
    }
    match fs_map.get(entrypoint) {
        Some(content) if !is_static_asset_content(content) => Ok(()),
        _ => Err(WorkerError::MissingEntrypoint(entrypoint.to_string())),
    }
}

/// Run one render on `worker`, returning the event that completes it.
///
/// Worker failures are reported as the execution error of the render rather than propagated.
pub async fn run_render<W: CircuitWorker + ?Sized>(worker: &mut W, fs_map: &FsMap, entrypoint: &str) -> Event {
    let result = async {
        validate_execution_input(fs_map, entrypoint)?;
        worker
            .execute_with_fs_map(fs_map, entrypoint)
            .await?;
        worker.render_until_settled().await?;
        worker.get_circuit_json().await
    }
    .await;

    match result {
        Ok(circuit_output) => {
            info!("Render finished. elements: {}", circuit_output.len());
            Event::RenderCompleted {
                circuit_output: Some(circuit_output),
                execution_error: None,
            }
        }
        Err(error) => {
            warn!("Render failed. cause: {}", error);
            Event::RenderCompleted {
                circuit_output: None,
                execution_error: Some(error.into()),
            }
        }
    }
}
