use std::collections::HashSet;

use crate::document::ManualEditState;

/// Ids of edit events that have already been folded into a document.
///
/// Seeded from the `_edit_event_id` stamps of an existing document so re-applying a recorded event is a no-op.
#[derive(Debug, Default)]
pub struct HandledEditEvents(HashSet<String>);

impl HandledEditEvents {
    pub fn seed_from(state: &ManualEditState) -> Self {
        Self(
            state
                .recorded_edit_event_ids()
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn contains(&self, edit_event_id: &str) -> bool {
        self.0.contains(edit_event_id)
    }

    pub fn mark(&mut self, edit_event_id: &str) {
        self.0.insert(edit_event_id.to_string());
    }
}
