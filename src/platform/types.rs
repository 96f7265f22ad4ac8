use crate::error::AppError;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveWindow {
    /// Display name of the foreground application.
    pub app_name: String,
    pub window_title: Option<String>,
    pub bundle_id: Option<String>,
}

/// Whether idle time can currently be observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IdleDetection {
    Available,
    /// The OS refused access to global input events.
    PermissionDenied,
    /// No backend to ask (no display server, unsupported OS, query failed).
    Unavailable,
}

/// One reading of the user's activity.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivitySample {
    pub idle_secs: u64,
    pub foreground_app: Option<String>,
    pub idle_detection: IdleDetection,
}

pub trait PlatformTracker: Send + Sync {
    fn get_active_window(&self) -> Option<ActiveWindow>;
    fn get_idle_time_secs(&self) -> Result<u64, AppError>;

    /// Read idle time and foreground app together.
    ///
    /// When idle time cannot be read the sample reports zero idle seconds,
    /// so the user is never classified as idle, and says why in `idle_detection`.
    fn sample(&self) -> ActivitySample {
        let (idle_secs, idle_detection) = match self.get_idle_time_secs() {
            Ok(secs) => (secs, IdleDetection::Available),
            Err(AppError::PermissionDenied { .. }) => (0, IdleDetection::PermissionDenied),
            Err(e) => {
                log::debug!("Idle time unavailable: {e}");
                (0, IdleDetection::Unavailable)
            }
        };

        ActivitySample {
            idle_secs,
            foreground_app: self.get_active_window().map(|w| w.app_name),
            idle_detection,
        }
    }
}
