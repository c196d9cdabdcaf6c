//! Break notifications.
//!
//! Best-effort: permission is checked lazily and requested once per send
//! attempt until granted; a denied permission turns every send into a
//! silent no-op.

use crate::error::ServiceError;

/// Platform notification backend.
pub trait NotificationSink: Send + Sync {
    fn is_permission_granted(&self) -> bool;

    /// Ask the platform for permission. Returns whether it was granted.
    fn request_permission(&self) -> bool;

    fn send(&self, title: &str, body: &str) -> Result<(), ServiceError>;
}

/// Writes notifications to the log. Used when no desktop backend exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn is_permission_granted(&self) -> bool {
        true
    }

    fn request_permission(&self) -> bool {
        true
    }

    fn send(&self, title: &str, body: &str) -> Result<(), ServiceError> {
        tracing::info!(title, body, "notification");
        Ok(())
    }
}

pub struct NotificationService {
    sink: Box<dyn NotificationSink>,
    enabled: bool,
    permission_granted: bool,
}

impl NotificationService {
    pub fn new(sink: Box<dyn NotificationSink>) -> Self {
        Self {
            sink,
            enabled: true,
            permission_granted: false,
        }
    }

    /// A service that never sends anything.
    pub fn disabled() -> Self {
        Self {
            sink: Box::new(LogNotifier),
            enabled: false,
            permission_granted: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Check permission and request it if missing.
    pub fn init(&mut self) -> bool {
        self.permission_granted = self.sink.is_permission_granted();
        if !self.permission_granted {
            self.permission_granted = self.sink.request_permission();
        }
        self.permission_granted
    }

    pub fn send_break_start_notification(&mut self) -> bool {
        self.send("Break Time!", "Time to take a break and recharge.")
    }

    pub fn send_break_end_notification(&mut self) -> bool {
        self.send("Break Over", "Time to get back to focus.")
    }

    /// Returns whether the notification was handed to the platform.
    fn send(&mut self, title: &str, body: &str) -> bool {
        if !self.enabled {
            return false;
        }
        if !self.permission_granted && !self.init() {
            tracing::debug!(title, "notification permission denied");
            return false;
        }
        match self.sink.send(title, body) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, title, "failed to send notification");
                false
            }
        }
    }
}
