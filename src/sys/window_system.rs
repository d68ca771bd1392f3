use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::model::display::Display;
use crate::model::window::{WindowId, pid_t};
use crate::sys::geometry::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredWindow {
    pub id: WindowId,
    pub pid: pid_t,
    pub frame: Frame,
}

/// Everything the reactor needs from the platform. Implementations are
/// shared with the recovery path, which may run on another thread, so every
/// method takes `&self`.
pub trait WindowSystem: Send + Sync {
    /// Currently on-screen windows that are candidates for management.
    fn discover_windows(&self) -> Vec<DiscoveredWindow>;

    fn set_window_frame(&self, pid: pid_t, id: WindowId, frame: Frame) -> bool;

    fn focus_window(&self, pid: pid_t, id: WindowId) -> bool;

    fn get_focused_window(&self, pid: pid_t) -> Option<WindowId>;

    fn should_manage_window(&self, pid: pid_t, id: WindowId) -> bool;

    fn is_window_on_screen(&self, id: WindowId) -> bool;

    /// Every window id the process owns, including background tabs.
    fn get_all_window_ids(&self, pid: pid_t) -> Vec<WindowId>;

    fn observe_app(&self, pid: pid_t) -> bool;

    fn unobserve_app(&self, pid: pid_t);

    fn get_display_topology(&self) -> Vec<Display>;

    /// `None` while the window's identity cannot be resolved yet.
    fn window_frame(&self, pid: pid_t, id: WindowId) -> Option<Frame>;

    fn app_bundle_id(&self, pid: pid_t) -> Option<String>;
}

/// Runs `f` up to `attempts` times, sleeping `delay` between misses.
pub fn retry<T>(attempts: u32, delay: Duration, mut f: impl FnMut() -> Option<T>) -> Option<T> {
    let attempts = attempts.max(1);
    for attempt in 1..=attempts {
        if let Some(value) = f() {
            return Some(value);
        }
        trace!(attempt, attempts, "not resolvable yet");
        if attempt < attempts && !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn retry_stops_at_first_success() {
        let mut calls = 0;
        let got = retry(5, Duration::ZERO, || {
            calls += 1;
            (calls == 3).then_some(calls)
        });
        assert_eq!(got, Some(3));
        assert_eq!(calls, 3);
    }

    #[test]
    fn retry_gives_up_after_attempts() {
        let mut calls = 0;
        let got: Option<()> = retry(4, Duration::ZERO, || {
            calls += 1;
            None
        });
        assert_eq!(got, None);
        assert_eq!(calls, 4);
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let mut calls = 0;
        let _ = retry(0, Duration::ZERO, || {
            calls += 1;
            None::<()>
        });
        assert_eq!(calls, 1);
    }
}
