//! Decides the work state for one tick.
//!
//! Rules are checked in a fixed order and the first match wins:
//! 1. idle longer than the threshold: `Idle`
//! 2. a work focus session is active: `Working`
//! 3. auto-detect is on and a work app is in front: `Working`
//! 4. auto-detect is on and the user was `Working`: `Resting`
//! 5. otherwise the state is left alone

use crate::models::WorkState;
use crate::settings::EffectiveSettings;

/// Everything the classifier looks at besides the current state.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifierInput<'a> {
    pub idle_secs: u64,
    pub foreground_app: Option<&'a str>,
    pub work_focus_active: bool,
}

pub struct Classifier {
    work_apps: Vec<String>,
    idle_threshold_secs: u64,
    auto_detect_enabled: bool,
}

impl Classifier {
    pub fn new(settings: &EffectiveSettings) -> Self {
        Self {
            work_apps: settings.work_apps.clone(),
            idle_threshold_secs: settings.idle_threshold_secs,
            auto_detect_enabled: settings.auto_detect_enabled,
        }
    }

    /// Returns the new state, or `None` when the current one should persist.
    pub fn classify(&self, input: &ClassifierInput<'_>, current: WorkState) -> Option<WorkState> {
        if input.idle_secs > self.idle_threshold_secs {
            return Some(WorkState::Idle);
        }

        if input.work_focus_active {
            return Some(WorkState::Working);
        }

        if !self.auto_detect_enabled {
            return None;
        }

        if input.foreground_app.is_some_and(|app| self.is_work_app(app)) {
            return Some(WorkState::Working);
        }

        if current == WorkState::Working {
            return Some(WorkState::Resting);
        }

        None
    }

    /// Case-sensitive exact match against the configured names.
    pub fn is_work_app(&self, app_name: &str) -> bool {
        self.work_apps.iter().any(|name| name == app_name)
    }

    pub fn idle_threshold_secs(&self) -> u64 {
        self.idle_threshold_secs
    }

    pub fn reload(&mut self, settings: &EffectiveSettings) {
        *self = Self::new(settings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::TrackerSettings;

    fn classifier(work_apps: &str, auto_detect: bool) -> Classifier {
        let settings = TrackerSettings {
            auto_detect_enabled: auto_detect,
            idle_threshold_secs: 300,
            work_apps: work_apps.into(),
        };
        Classifier::new(&settings.effective())
    }

    fn input(idle_secs: u64, app: Option<&str>, focus: bool) -> ClassifierInput<'_> {
        ClassifierInput {
            idle_secs,
            foreground_app: app,
            work_focus_active: focus,
        }
    }

    #[test]
    fn test_work_app_in_front_is_working() {
        let c = classifier("Editor", true);
        assert_eq!(c.classify(&input(0, Some("Editor"), false), WorkState::Idle), Some(WorkState::Working));
    }

    #[test]
    fn test_idle_over_threshold_always_wins() {
        let c = classifier("Editor", true);
        for current in [WorkState::Working, WorkState::Resting, WorkState::Idle] {
            for focus in [false, true] {
                for app in [Some("Editor"), Some("Browser"), None] {
                    assert_eq!(
                        c.classify(&input(301, app, focus), current),
                        Some(WorkState::Idle),
                        "idle must win for {current:?}, focus={focus}, app={app:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_idle_exactly_at_threshold_is_not_idle() {
        let c = classifier("Editor", true);
        assert_eq!(c.classify(&input(300, Some("Editor"), false), WorkState::Working), Some(WorkState::Working));
    }

    #[test]
    fn test_focus_forces_working_even_without_auto_detect() {
        let c = classifier("Editor", false);
        assert_eq!(c.classify(&input(0, Some("Browser"), true), WorkState::Resting), Some(WorkState::Working));
    }

    #[test]
    fn test_switching_away_from_work_app_is_resting() {
        let c = classifier("Editor", true);
        assert_eq!(c.classify(&input(0, Some("Browser"), false), WorkState::Working), Some(WorkState::Resting));
    }

    #[test]
    fn test_non_work_app_keeps_resting_and_idle() {
        let c = classifier("Editor", true);
        assert_eq!(c.classify(&input(0, Some("Browser"), false), WorkState::Resting), None);
        assert_eq!(c.classify(&input(0, Some("Browser"), false), WorkState::Idle), None);
        assert_eq!(c.classify(&input(0, None, false), WorkState::Idle), None);
    }

    #[test]
    fn test_auto_detect_off_leaves_state_alone() {
        let c = classifier("Editor", false);
        assert_eq!(c.classify(&input(0, Some("Editor"), false), WorkState::Resting), None);
        assert_eq!(c.classify(&input(0, Some("Browser"), false), WorkState::Working), None);
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let c = classifier("Xcode", true);
        assert!(c.is_work_app("Xcode"));
        assert!(!c.is_work_app("xcode"));
        assert!(!c.is_work_app("Xcode Beta"));
    }

    #[test]
    fn test_entries_are_trimmed() {
        let c = classifier("  Xcode ,  Terminal", true);
        assert!(c.is_work_app("Terminal"));
        assert!(!c.is_work_app(" Terminal"));
    }

    #[test]
    fn test_reload_picks_up_new_apps() {
        let mut c = classifier("Editor", true);
        assert!(!c.is_work_app("MyNewApp"));

        let settings = TrackerSettings {
            auto_detect_enabled: true,
            idle_threshold_secs: 60,
            work_apps: "Editor, MyNewApp".into(),
        };
        c.reload(&settings.effective());

        assert!(c.is_work_app("MyNewApp"));
        assert_eq!(c.idle_threshold_secs(), 60);
    }
}
