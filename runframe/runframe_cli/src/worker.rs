use circuit_output::CircuitOutput;
use file_sync::FsMap;
use futures::future::BoxFuture;
use futures::FutureExt;
use manual_edits::ManualEditState;
use runframe_app::worker::{CircuitWorker, WorkerError};
use tracing::{info, warn};

/// Stands in for the circuit evaluator, every render produces the same precomputed circuit output.
pub struct PrecomputedCircuitWorker {
    circuit_output: CircuitOutput,
    manual_edits_file_path: String,
    executions: usize,
}

impl PrecomputedCircuitWorker {
    pub fn new(circuit_output: CircuitOutput, manual_edits_file_path: impl Into<String>) -> Self {
        Self {
            circuit_output,
            manual_edits_file_path: manual_edits_file_path.into(),
            executions: 0,
        }
    }
}

impl CircuitWorker for PrecomputedCircuitWorker {
    fn execute_with_fs_map<'a>(
        &'a mut self,
        fs_map: &'a FsMap,
        entrypoint: &'a str,
    ) -> BoxFuture<'a, Result<(), WorkerError>> {
        async move {
            self.executions += 1;

            let manual_edits = match ManualEditState::from_optional_json_str(
                fs_map
                    .get(&self.manual_edits_file_path)
                    .map(String::as_str),
            ) {
                Ok(manual_edits) => manual_edits,
                Err(error) => {
                    warn!("Ignoring malformed manual edits. cause: {}", error);
                    ManualEditState::default()
                }
            };

            info!(
                "Executing. execution: {}, entrypoint: {}, files: {}, pcb_placements: {}, schematic_placements: {}, trace_hints: {}",
                self.executions,
                entrypoint,
                fs_map.len(),
                manual_edits.pcb_placements.len(),
                manual_edits.schematic_placements.len(),
                manual_edits.manual_trace_hints.len(),
            );

            Ok(())
        }
        .boxed()
    }

    fn render_until_settled(&mut self) -> BoxFuture<'_, Result<(), WorkerError>> {
        async { Ok(()) }.boxed()
    }

    fn get_circuit_json(&mut self) -> BoxFuture<'_, Result<CircuitOutput, WorkerError>> {
        let circuit_output = self.circuit_output.clone();
        async move { Ok(circuit_output) }.boxed()
    }
}
