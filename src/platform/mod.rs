pub mod types;

pub use types::{ActiveWindow, ActivitySample, IdleDetection, PlatformTracker};

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "macos")]
pub use macos::MacOSTracker as NativeTracker;

#[cfg(target_os = "linux")]
pub use linux::LinuxTracker as NativeTracker;

// Platforms without a backend run with idle detection and app detection off.
#[cfg(not(any(target_os = "macos", target_os = "linux")))]
pub struct NativeTracker;

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
impl PlatformTracker for NativeTracker {
    fn get_active_window(&self) -> Option<ActiveWindow> {
        None
    }

    fn get_idle_time_secs(&self) -> Result<u64, crate::error::AppError> {
        Err(crate::error::AppError::Unavailable {
            capability: "idle detection",
            reason: "unsupported platform".into(),
        })
    }
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
impl NativeTracker {
    pub fn new() -> Self {
        Self
    }
}
