//! Bringing parked windows back on screen.
//!
//! Windows on hidden workspaces sit almost entirely off screen. If the
//! process dies without moving them back they are effectively lost, so every
//! exit path (normal shutdown, fatal signal, panic) runs [`restore_parked`].

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::common::collections::HashMap;
use crate::model::display::{Display, DisplayId};
use crate::model::window::{WindowId, pid_t};
use crate::sys::geometry::Frame;
use crate::sys::window_system::WindowSystem;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParkedWindow {
    pub pid: pid_t,
    pub display: DisplayId,
    pub width: f64,
    pub height: f64,
}

/// Windows currently parked off screen. Shared between the reactor and the
/// recovery paths.
#[derive(Debug, Clone, Default)]
pub struct ParkedLedger(Arc<Mutex<HashMap<WindowId, ParkedWindow>>>);

impl ParkedLedger {
    pub fn new() -> Self { Self::default() }

    pub fn park(&self, wid: WindowId, window: ParkedWindow) { self.0.lock().insert(wid, window); }

    pub fn unpark(&self, wid: WindowId) -> Option<ParkedWindow> { self.0.lock().remove(&wid) }

    pub fn contains(&self, wid: WindowId) -> bool { self.0.lock().contains_key(&wid) }

    pub fn len(&self) -> usize { self.0.lock().len() }

    pub fn is_empty(&self) -> bool { self.0.lock().is_empty() }

    pub fn windows(&self) -> Vec<WindowId> {
        let mut out: Vec<_> = self.0.lock().keys().copied().collect();
        out.sort_unstable();
        out
    }

    fn take_all(&self) -> Vec<(WindowId, ParkedWindow)> {
        let mut out: Vec<_> = self.0.lock().drain().collect();
        out.sort_unstable_by_key(|(wid, _)| *wid);
        out
    }
}

/// Where a parked window reappears: centered in the usable area of the
/// display it was parked on, or of the primary display if that one is gone.
pub fn centered_frame(displays: &[Display], window: &ParkedWindow) -> Option<Frame> {
    let display = displays
        .iter()
        .find(|d| d.id == window.display)
        .or_else(|| displays.iter().find(|d| d.is_primary))
        .or_else(|| displays.first())?;
    Some(display.visible_frame.centered(window.width, window.height))
}

/// Moves every parked window back on screen. Returns how many were restored.
pub fn restore_parked<W: WindowSystem + ?Sized>(ledger: &ParkedLedger, window_system: &W) -> usize {
    let parked = ledger.take_all();
    if parked.is_empty() {
        return 0;
    }
    let displays = window_system.get_display_topology();
    let mut restored = 0;
    for (wid, window) in parked {
        let Some(frame) = centered_frame(&displays, &window) else {
            warn!(?wid, "no display to restore window onto");
            continue;
        };
        if window_system.set_window_frame(window.pid, wid, frame) {
            restored += 1;
        } else {
            warn!(?wid, pid = window.pid, "could not restore parked window");
        }
    }
    info!(restored, "restored parked windows");
    restored
}

/// Everything the recovery paths need, detached from the reactor so it can be
/// moved to a signal thread or a panic hook.
pub struct RecoveryHandle<W: ?Sized> {
    ledger: ParkedLedger,
    window_system: Arc<W>,
}

impl<W: ?Sized> Clone for RecoveryHandle<W> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            window_system: self.window_system.clone(),
        }
    }
}

impl<W: WindowSystem + ?Sized> RecoveryHandle<W> {
    pub fn new(ledger: ParkedLedger, window_system: Arc<W>) -> Self { Self { ledger, window_system } }

    pub fn restore(&self) -> usize { restore_parked(&self.ledger, &*self.window_system) }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::sys::headless::HeadlessWindowSystem;

    fn display(id: u32, x: f64) -> Display {
        Display {
            id: DisplayId::new(id),
            visible_frame: Frame::new(x, 25.0, 1000.0, 775.0),
            full_frame: Frame::new(x, 0.0, 1000.0, 800.0),
            is_primary: id == 1,
        }
    }

    #[test]
    fn parked_windows_are_centered_on_their_display() {
        let ws = HeadlessWindowSystem::new(vec![display(1, 0.0), display(2, 1000.0)]);
        let ledger = ParkedLedger::new();
        for id in 1..=3 {
            let wid = WindowId::new(id);
            ws.add_window(10, wid, Frame::new(1999.0, 799.0, 400.0, 300.0));
            ledger.park(wid, ParkedWindow {
                pid: 10,
                display: DisplayId::new(2),
                width: 400.0,
                height: 300.0,
            });
        }

        assert_eq!(restore_parked(&ledger, &ws), 3);
        assert!(ledger.is_empty());
        for id in 1..=3 {
            assert_eq!(ws.frame(WindowId::new(id)), Some(Frame::new(1300.0, 262.5, 400.0, 300.0)));
        }
    }

    #[test]
    fn missing_display_falls_back_to_primary() {
        let ws = HeadlessWindowSystem::new(vec![display(1, 0.0)]);
        let ledger = ParkedLedger::new();
        ws.add_window(10, WindowId::new(1), Frame::new(1999.0, 799.0, 2000.0, 300.0));
        ledger.park(WindowId::new(1), ParkedWindow {
            pid: 10,
            display: DisplayId::new(7),
            width: 2000.0,
            height: 300.0,
        });
        let handle = RecoveryHandle::new(ledger.clone(), Arc::new(ws));
        assert_eq!(handle.restore(), 1);
        assert_eq!(handle.restore(), 0);
    }

    #[test]
    fn failed_restores_are_not_counted() {
        let ws = HeadlessWindowSystem::new(vec![display(1, 0.0)]);
        let ledger = ParkedLedger::new();
        ledger.park(WindowId::new(5), ParkedWindow {
            pid: 10,
            display: DisplayId::new(1),
            width: 10.0,
            height: 10.0,
        });
        assert_eq!(restore_parked(&ledger, &ws), 0);
    }
}
