//! Desktop notification backend.

use focalite_core::{NotificationSink, ServiceError};
use notify_rust::Notification;

/// Sends notifications through the platform notification daemon.
/// Desktop platforms do not gate notifications behind a runtime prompt, so
/// permission is always reported as granted.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier;

impl NotificationSink for DesktopNotifier {
    fn is_permission_granted(&self) -> bool {
        true
    }

    fn request_permission(&self) -> bool {
        true
    }

    fn send(&self, title: &str, body: &str) -> Result<(), ServiceError> {
        Notification::new()
            .summary(title)
            .body(body)
            .appname("focalite")
            .icon("alarm-clock")
            .show()
            .map(|_| ())
            .map_err(|e| ServiceError::Notification(e.to_string()))
    }
}
