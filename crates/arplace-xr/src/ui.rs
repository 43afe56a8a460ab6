//! Presentation-only UI setters driven by the placement core.

/// Receives status updates for display. Carries no business logic.
pub trait UiSink {
    fn set_status(&mut self, text: &str);

    fn set_tips(&mut self, text: &str);

    fn set_ar_running(&mut self, running: bool);

    /// Enables or disables the confirm / cancel controls.
    fn set_placing_enabled(&mut self, enabled: bool);

    fn set_active_model(&mut self, model_id: &str);
}
