use super::{ActiveWindow, PlatformTracker};
use crate::error::AppError;
use x11rb::connection::Connection;
use x11rb::protocol::screensaver;
use x11rb::protocol::xproto::{AtomEnum, ConnectionExt, Window};

pub struct LinuxTracker {
    conn: Option<x11rb::rust_connection::RustConnection>,
    root: Window,
}

impl Default for LinuxTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LinuxTracker {
    pub fn new() -> Self {
        match x11rb::connect(None) {
            Ok((conn, screen_num)) => {
                let Some(root) = conn.setup().roots.get(screen_num).map(|screen| screen.root) else {
                    log::warn!(
                        "Invalid screen number {screen_num} ({} screens available). Activity detection disabled.",
                        conn.setup().roots.len()
                    );
                    return Self { conn: None, root: 0 };
                };
                Self {
                    conn: Some(conn),
                    root,
                }
            }
            Err(e) => {
                // Wayland-only and headless sessions land here; the tracker keeps running degraded.
                log::warn!("Failed to connect to X server: {e}. Activity detection disabled.");
                Self { conn: None, root: 0 }
            }
        }
    }

    fn get_atom(&self, name: &str) -> Option<u32> {
        self.conn
            .as_ref()?
            .intern_atom(false, name.as_bytes())
            .ok()?
            .reply()
            .ok()
            .map(|r| r.atom)
    }

    fn get_window_property(&self, window: Window, atom: u32) -> Option<String> {
        let reply = self
            .conn
            .as_ref()?
            .get_property(false, window, atom, AtomEnum::ANY, 0, 1024)
            .ok()?
            .reply()
            .ok()?;

        if reply.value.is_empty() {
            return None;
        }

        String::from_utf8(reply.value).ok()
    }

    fn get_active_window_id(&self) -> Option<Window> {
        let conn = self.conn.as_ref()?;
        let atom = self.get_atom("_NET_ACTIVE_WINDOW")?;
        let reply = conn
            .get_property(false, self.root, atom, AtomEnum::WINDOW, 0, 1)
            .ok()?
            .reply()
            .ok()?;

        let id = reply.value32()?.next().filter(|&id| id != 0);
        id
    }
}

/// `WM_CLASS` holds "instance\0class\0"; the class is the capitalised display name.
fn app_name_from_wm_class(raw: &str) -> Option<String> {
    let mut parts = raw.split('\0').filter(|part| !part.is_empty());
    let instance = parts.next();
    parts.next().or(instance).map(ToString::to_string)
}

impl PlatformTracker for LinuxTracker {
    fn get_active_window(&self) -> Option<ActiveWindow> {
        let window_id = self.get_active_window_id()?;

        let name_atom = self
            .get_atom("_NET_WM_NAME")
            .unwrap_or_else(|| AtomEnum::WM_NAME.into());
        let window_title = self.get_window_property(window_id, name_atom);

        let app_name = self
            .get_window_property(window_id, AtomEnum::WM_CLASS.into())
            .and_then(|raw| app_name_from_wm_class(&raw))?;

        Some(ActiveWindow {
            app_name,
            window_title,
            bundle_id: None,
        })
    }

    fn get_idle_time_secs(&self) -> Result<u64, AppError> {
        let Some(conn) = self.conn.as_ref() else {
            return Err(AppError::Unavailable {
                capability: "idle detection",
                reason: "no X server connection".into(),
            });
        };

        let info = screensaver::query_info(conn, self.root)
            .map_err(|e| AppError::Unavailable {
                capability: "idle detection",
                reason: e.to_string(),
            })?
            .reply()
            .map_err(|e| AppError::Unavailable {
                capability: "idle detection",
                reason: e.to_string(),
            })?;

        Ok(u64::from(info.ms_since_user_input / 1000))
    }
}
