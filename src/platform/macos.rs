#![allow(unsafe_code, reason = "AppKit and CoreGraphics are only reachable through FFI")]

use super::{ActiveWindow, PlatformTracker};
use crate::error::AppError;
use core_graphics::event_source::CGEventSourceStateID;
use objc2::rc::autoreleasepool;
use objc2_app_kit::NSWorkspace;
use std::time::Duration;

/// `kCGAnyInputEventType`, which `CGEventType` has no variant for.
const ANY_INPUT_EVENT_TYPE: u32 = u32::MAX;

// core-graphics exposes the state ids but not this query.
#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGEventSourceSecondsSinceLastEventType(state_id: CGEventSourceStateID, event_type: u32) -> f64;
}

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    fn AXIsProcessTrusted() -> u8;
}

pub struct MacOSTracker;

impl Default for MacOSTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl MacOSTracker {
    pub fn new() -> Self {
        Self
    }

    fn is_trusted() -> bool {
        unsafe { AXIsProcessTrusted() != 0 }
    }
}

impl PlatformTracker for MacOSTracker {
    fn get_active_window(&self) -> Option<ActiveWindow> {
        autoreleasepool(|_| {
            let workspace = unsafe { NSWorkspace::sharedWorkspace() };
            let app = unsafe { workspace.frontmostApplication() }?;
            let app_name = unsafe { app.localizedName() }?.to_string();
            let bundle_id = unsafe { app.bundleIdentifier() }.map(|id| id.to_string());

            Some(ActiveWindow {
                app_name,
                window_title: None,
                bundle_id,
            })
        })
    }

    fn get_idle_time_secs(&self) -> Result<u64, AppError> {
        if !Self::is_trusted() {
            return Err(AppError::PermissionDenied {
                capability: "global input monitoring",
            });
        }

        let secs = unsafe {
            CGEventSourceSecondsSinceLastEventType(
                CGEventSourceStateID::CombinedSessionState,
                ANY_INPUT_EVENT_TYPE,
            )
        };

        Duration::try_from_secs_f64(secs)
            .map(|idle| idle.as_secs())
            .map_err(|e| AppError::Unavailable {
                capability: "idle detection",
                reason: format!("CoreGraphics returned {secs}: {e}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // Requires a logged-in macOS session
    fn test_get_active_window() {
        let tracker = MacOSTracker::new();
        let window = tracker.get_active_window();
        assert!(window.is_some_and(|w| !w.app_name.is_empty()));
    }

    #[test]
    #[ignore] // Requires accessibility permission
    fn test_get_idle_time() {
        let tracker = MacOSTracker::new();
        let idle = tracker.get_idle_time_secs().unwrap();
        assert!(idle < 86400);
    }
}
