//! Tracks edit events across render cycles.
//!
//! Every event carries two independent flags:
//!
//! * persistence: unpersisted, requested (part of a batch whose write is in flight) or persisted.
//! * reflected in render: set when a render starts after the event was persisted, the event is dropped once that
//!   render has finished.
//!
//! An event is *applied* once its batch has been folded and handed to the persistence layer. A failed write
//! reverts the batch to unpersisted, so an edit is never dropped before its write has been confirmed.
use circuit_output::CircuitOutput;
use manual_edits::{apply_edit_events_with_recovery, EditEvent};
use tracing::{debug, info, trace, warn};

use crate::debounce::{DebounceTicket, Debouncer, Rearm};

#[derive(
    serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display,
)]
pub enum ControllerState {
    /// No unapplied events, not rendering.
    #[default]
    Idle,
    /// Unapplied events present, debounce pending.
    Accumulating,
    /// A render is in flight, new events may still arrive.
    Rendering,
    /// A render just finished, events reflected in it are being dropped.
    Reconciling,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BatchId(pub u64);

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    Unpersisted,
    Requested(BatchId),
    Persisted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackedEditEvent {
    pub edit_event: EditEvent,
    pub persistence: Persistence,
    pub reflected_in_render: bool,
}

impl TrackedEditEvent {
    fn new(edit_event: EditEvent) -> Self {
        Self {
            edit_event,
            persistence: Persistence::Unpersisted,
            reflected_in_render: false,
        }
    }

    pub fn is_applied(&self) -> bool {
        !matches!(self.persistence, Persistence::Unpersisted)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersistRequest {
    pub batch: BatchId,
    /// The complete manual edits document.
    pub content: String,
    /// True if the batch contains at least one edit that is no longer in progress.
    pub finished: bool,
    /// Present when the existing document was malformed and has been replaced.
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlushOutcome {
    /// The ticket was superseded or cancelled.
    Stale,
    /// An edit is still being dragged, the flush waits for the final event.
    Deferred,
    /// Nothing to persist.
    Nothing,
    Persist(PersistRequest),
    /// Folding failed, the events stay unapplied.
    Failed { error: String },
}

#[derive(Debug, Clone, Default)]
pub struct EditEventController {
    edit_events: Vec<TrackedEditEvent>,
    debouncer: Debouncer,
    state: ControllerState,
    next_batch: u64,
}

impl EditEventController {
    pub fn new(debouncer: Debouncer) -> Self {
        Self {
            debouncer,
            ..Self::default()
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn debouncer_mut(&mut self) -> &mut Debouncer {
        &mut self.debouncer
    }

    pub fn tracked_edit_events(&self) -> &[TrackedEditEvent] {
        &self.edit_events
    }

    pub fn unapplied_count(&self) -> usize {
        self.edit_events
            .iter()
            .filter(|tracked| !tracked.is_applied())
            .count()
    }

    /// Buffer an edit event and (re-)arm the debounce.
    ///
    /// An unapplied event with the same `edit_event_id` is replaced in place, so a drag that emits many
    /// in-progress events followed by a final one occupies a single slot. Id-less previews of the same type
    /// replace each other likewise.
    pub fn push_edit_event(&mut self, edit_event: EditEvent) -> Rearm {
        let superseded = self
            .edit_events
            .iter_mut()
            .rev()
            .filter(|tracked| !tracked.is_applied())
            .find(|tracked| supersedes(&edit_event, &tracked.edit_event));

        match superseded {
            Some(tracked) => {
                trace!("Replacing unapplied edit event. type: {}", edit_event.edit_event_type());
                tracked.edit_event = edit_event;
            }
            None => {
                trace!("Buffering edit event. type: {}", edit_event.edit_event_type());
                self.edit_events
                    .push(TrackedEditEvent::new(edit_event));
            }
        }

        let rearm = self.debouncer.arm();
        self.settle();
        rearm
    }

    /// Fold the pending events onto the existing document when the debounce fires.
    ///
    /// Every event not yet confirmed persisted is folded, in arrival order. Previously handled events are
    /// skipped by the reducer via the `_edit_event_id` stamps in the document.
    pub fn flush(
        &mut self,
        ticket: &DebounceTicket,
        circuit_output: &CircuitOutput,
        existing_document_text: Option<&str>,
    ) -> FlushOutcome {
        if !self.debouncer.fire(ticket) {
            return FlushOutcome::Stale;
        }

        let dragging = self
            .edit_events
            .iter()
            .filter(|tracked| !tracked.is_applied())
            .find(|tracked| tracked.edit_event.in_progress() && tracked.edit_event.edit_event_id().is_some());
        if let Some(tracked) = dragging {
            debug!(
                "Deferring flush, edit in progress. edit_event_id: {:?}",
                tracked.edit_event.edit_event_id()
            );
            self.settle();
            return FlushOutcome::Deferred;
        }

        let batch_indexes = self
            .edit_events
            .iter()
            .enumerate()
            .filter(|(_index, tracked)| !tracked.is_applied())
            .map(|(index, _tracked)| index)
            .collect::<Vec<_>>();

        if batch_indexes.is_empty() {
            self.settle();
            return FlushOutcome::Nothing;
        }

        let edit_events = self
            .edit_events
            .iter()
            .filter(|tracked| tracked.persistence != Persistence::Persisted)
            .map(|tracked| tracked.edit_event.clone())
            .collect::<Vec<_>>();

        let recovered = apply_edit_events_with_recovery(&edit_events, circuit_output, existing_document_text);

        let content = match recovered.state.to_json_string() {
            Ok(content) => content,
            Err(error) => {
                warn!("Unable to fold edit events. cause: {}", error);
                self.settle();
                return FlushOutcome::Failed {
                    error: error.to_string(),
                };
            }
        };

        let batch = BatchId(self.next_batch);
        self.next_batch += 1;

        let mut finished = false;
        for index in batch_indexes.iter() {
            let tracked = &mut self.edit_events[*index];
            tracked.persistence = Persistence::Requested(batch);
            finished |= !tracked.edit_event.in_progress();
        }
        self.settle();

        info!(
            "Requesting persistence. batch: {:?}, events: {}, finished: {}",
            batch,
            batch_indexes.len(),
            finished
        );

        FlushOutcome::Persist(PersistRequest {
            batch,
            content,
            finished,
            warning: recovered
                .warning
                .map(|warning| warning.to_string()),
        })
    }

    /// Returns the amount of events confirmed.
    pub fn mark_persisted(&mut self, batch: BatchId) -> usize {
        let mut count = 0;
        for tracked in self
            .edit_events
            .iter_mut()
            .filter(|tracked| tracked.persistence == Persistence::Requested(batch))
        {
            tracked.persistence = Persistence::Persisted;
            count += 1;
        }
        debug!("Batch persisted. batch: {:?}, events: {}", batch, count);
        count
    }

    /// Revert the batch to unapplied and re-arm the debounce so it will be retried.
    ///
    /// Returns `None` if the batch is unknown, e.g. after a reset.
    pub fn mark_persist_failed(&mut self, batch: BatchId) -> Option<Rearm> {
        let mut count = 0;
        for tracked in self
            .edit_events
            .iter_mut()
            .filter(|tracked| tracked.persistence == Persistence::Requested(batch))
        {
            tracked.persistence = Persistence::Unpersisted;
            count += 1;
        }

        if count == 0 {
            return None;
        }

        warn!("Persistence failed, edits will be retried. batch: {:?}, events: {}", batch, count);

        let rearm = self.debouncer.arm();
        self.settle();
        Some(rearm)
    }

    /// Flags every persisted event as reflected, the upcoming render reads the document they were written to.
    ///
    /// Events whose write is still in flight are not flagged. Returns the flagged events.
    pub fn mark_render_started(&mut self) -> Vec<EditEvent> {
        self.state = ControllerState::Rendering;

        let in_flight = self
            .edit_events
            .iter()
            .filter(|tracked| matches!(tracked.persistence, Persistence::Requested(_)))
            .count();
        if in_flight > 0 {
            warn!(
                "Render started before persistence was confirmed, keeping unconfirmed edits. count: {}",
                in_flight
            );
        }

        let reflected = self
            .edit_events
            .iter_mut()
            .filter(|tracked| tracked.persistence == Persistence::Persisted)
            .map(|tracked| {
                tracked.reflected_in_render = true;
                tracked.edit_event.clone()
            })
            .collect::<Vec<_>>();

        debug!(
            "Render started. reflected: {}, events: {}",
            reflected.len(),
            self.edit_events.len()
        );

        reflected
    }

    /// Enter `Reconciling` and drop the events reflected in the finished render. Returns the dropped events.
    ///
    /// Events persisted while the render was in flight were not read by it and are kept.
    pub fn begin_reconciling(&mut self) -> Vec<EditEvent> {
        if self.state != ControllerState::Rendering {
            warn!("Reconciling without a render in flight. state: {}", self.state);
        }
        self.state = ControllerState::Reconciling;

        let (reflected, remaining): (Vec<_>, Vec<_>) = std::mem::take(&mut self.edit_events)
            .into_iter()
            .partition(|tracked| tracked.reflected_in_render);
        self.edit_events = remaining;

        debug!(
            "Reconciling. dropped: {}, remaining: {}",
            reflected.len(),
            self.edit_events.len()
        );

        reflected
            .into_iter()
            .map(|tracked| tracked.edit_event)
            .collect()
    }

    /// Leave the render cycle, reconciling first if that has not happened yet.
    pub fn mark_render_complete(&mut self) {
        if self.state != ControllerState::Reconciling {
            self.begin_reconciling();
        }

        self.state = ControllerState::Idle;
        self.settle();

        debug!("Render complete. state: {}", self.state);
    }

    /// While rendering all events are exposed so pending visual state survives the render, otherwise only the
    /// unapplied events.
    pub fn edit_events_for_render(&self) -> Vec<&EditEvent> {
        let rendering = self.state == ControllerState::Rendering;

        self.edit_events
            .iter()
            .filter(|tracked| rendering || !tracked.is_applied())
            .map(|tracked| &tracked.edit_event)
            .collect()
    }

    /// Forget all events and cancel the pending debounce, returning the cancelled ticket.
    pub fn reset(&mut self) -> Option<DebounceTicket> {
        info!("Resetting edit events. discarded: {}", self.edit_events.len());
        self.edit_events.clear();
        self.state = ControllerState::Idle;
        self.debouncer.cancel()
    }

    fn settle(&mut self) {
        if matches!(self.state, ControllerState::Rendering | ControllerState::Reconciling) {
            return;
        }

        self.state = match self.unapplied_count() > 0 || self.debouncer.is_pending() {
            true => ControllerState::Accumulating,
            false => ControllerState::Idle,
        };
    }
}

fn supersedes(edit_event: &EditEvent, existing: &EditEvent) -> bool {
    match (edit_event.edit_event_id(), existing.edit_event_id()) {
        (Some(edit_event_id), Some(existing_id)) => edit_event_id == existing_id,
        (None, None) => {
            edit_event.is_preview()
                && existing.is_preview()
                && edit_event.edit_event_type() == existing.edit_event_type()
        }
        _ => false,
    }
}
