use tracing::debug;

/// Decides when persisted edits should trigger a fresh render.
///
/// Each request increments the render trigger count, the shell renders whenever the count changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoRenderPolicy {
    enabled: bool,
    render_trigger_count: u64,
}

impl AutoRenderPolicy {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            render_trigger_count: 0,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn render_trigger_count(&self) -> u64 {
        self.render_trigger_count
    }

    /// Called once per persisted batch, at most one render is requested per batch.
    ///
    /// `finished` is true when the batch contains at least one edit that is no longer in progress.
    pub fn on_batch_persisted(&mut self, finished: bool) -> Option<u64> {
        if !self.enabled || !finished {
            debug!("Not requesting render. enabled: {}, finished: {}", self.enabled, finished);
            return None;
        }

        Some(self.request_render())
    }

    /// Explicit requests are honored regardless of `enabled`.
    pub fn request_render(&mut self) -> u64 {
        self.render_trigger_count += 1;
        debug!("Render requested. trigger: {}", self.render_trigger_count);
        self.render_trigger_count
    }
}

impl Default for AutoRenderPolicy {
    fn default() -> Self {
        Self::new(true)
    }
}
