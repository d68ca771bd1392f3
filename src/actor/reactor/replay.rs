//! Scripted runs against the headless window system.
//!
//! A script describes the displays and windows the fake platform starts
//! with, then a list of steps: events for the reactor, or changes to the fake
//! world (a window appears, the user moves something). Events go through the
//! same bounded queue as in production and are drained before each world
//! change so the two stay ordered.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info_span};

use super::{Event, Reactor, channel};
use crate::common::config::Config;
use crate::model::display::Display;
use crate::model::server::StateSnapshot;
use crate::model::window::{WindowId, pid_t};
use crate::sys::geometry::Frame;
use crate::sys::headless::{FakeWindow, HeadlessWindowSystem};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScriptWindow {
    pub id: WindowId,
    pub pid: pid_t,
    pub frame: Frame,
    #[serde(default = "yes")]
    pub on_screen: bool,
    #[serde(default = "yes")]
    pub manageable: bool,
}

fn yes() -> bool { true }

impl ScriptWindow {
    fn fake(&self) -> FakeWindow {
        FakeWindow {
            pid: self.pid,
            frame: self.frame,
            on_screen: self.on_screen,
            manageable: self.manageable,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Step {
    Event(Event),
    AddWindow(ScriptWindow),
    RemoveWindow(WindowId),
    RemoveApp(pid_t),
    MoveWindow(WindowId, Frame),
    SetOnScreen(WindowId, bool),
    SetFocused(pid_t, WindowId),
    SetBundleId(pid_t, String),
    SetDisplays(Vec<Display>),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Script {
    pub displays: Vec<Display>,
    #[serde(default)]
    pub windows: Vec<ScriptWindow>,
    #[serde(default)]
    pub bundle_ids: Vec<(pid_t, String)>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Script {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut buf = String::new();
        File::open(path)?.read_to_string(&mut buf)?;
        Self::parse(&buf)
    }

    pub fn parse(buf: &str) -> anyhow::Result<Self> {
        let script: Script = ron::from_str(buf)?;
        if script.displays.is_empty() {
            anyhow::bail!("script declares no displays");
        }
        Ok(script)
    }

    /// A headless window system holding the script's initial displays,
    /// windows and bundle ids.
    pub fn world(&self) -> Arc<HeadlessWindowSystem> {
        let world = Arc::new(HeadlessWindowSystem::new(self.displays.clone()));
        for window in &self.windows {
            world.insert_window(window.id, window.fake());
        }
        for (pid, bundle_id) in &self.bundle_ids {
            world.set_bundle_id(*pid, bundle_id.clone());
        }
        world
    }
}

/// Runs `script` from startup to the last step and returns the final state.
/// Parked windows are left parked so the snapshot shows them.
pub fn replay(config: Config, script: &Script) -> StateSnapshot {
    let world = script.world();
    let (tx, rx) = channel(config.settings.event_queue_capacity);
    let mut reactor = Reactor::new(config, world.clone());
    reactor.start();

    for (index, step) in script.steps.iter().enumerate() {
        let _span = info_span!("replay step", index).entered();
        if let Step::Event(event) = step {
            tx.send(event.clone());
            continue;
        }
        reactor.drain(&rx);
        debug!(?step, "world change");
        apply_world_change(&world, step);
    }
    reactor.drain(&rx);
    reactor.snapshot()
}

/// Applies a non-event step to the fake platform. Event steps are ignored.
pub fn apply_world_change(world: &HeadlessWindowSystem, step: &Step) {
    match step {
        Step::Event(_) => {}
        Step::AddWindow(window) => world.insert_window(window.id, window.fake()),
        Step::RemoveWindow(id) => {
            world.remove_window(*id);
        }
        Step::RemoveApp(pid) => world.remove_app(*pid),
        Step::MoveWindow(id, frame) => world.move_window(*id, *frame),
        Step::SetOnScreen(id, on_screen) => world.set_on_screen(*id, *on_screen),
        Step::SetFocused(pid, id) => world.set_focused(*pid, *id),
        Step::SetBundleId(pid, bundle_id) => world.set_bundle_id(*pid, bundle_id.clone()),
        Step::SetDisplays(displays) => world.set_displays(displays.clone()),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::actor::reactor::Command;
    use crate::actor::reactor::testing::{test_config, w};

    const SCRIPT: &str = r#"(
        displays: [
            (id: 1, visible_frame: (x: 0.0, y: 25.0, width: 1000.0, height: 775.0),
             full_frame: (x: 0.0, y: 0.0, width: 1000.0, height: 800.0), is_primary: true),
        ],
        windows: [
            (id: 1, pid: 10, frame: (x: 100.0, y: 100.0, width: 300.0, height: 300.0)),
        ],
        steps: [
            AddWindow((id: 2, pid: 11, frame: (x: 600.0, y: 100.0, width: 300.0, height: 300.0))),
            Event(WindowCreated(pid: 11, window_id: 2)),
            Event(WindowFocused(pid: 11, window_id: 2)),
            Event(Command(MoveWindowToWorkspace(3))),
        ],
    )"#;

    #[test]
    fn script_runs_to_completion() {
        let script = Script::parse(SCRIPT).unwrap();
        let snapshot = replay(test_config(), &script);

        assert_eq!(snapshot.windows.len(), 2);
        let moved = snapshot.windows.iter().find(|d| d.id == w(2)).unwrap();
        assert_eq!(moved.workspace.get(), 3);
        assert!(moved.is_parked);
        let stayed = snapshot.windows.iter().find(|d| d.id == w(1)).unwrap();
        assert_eq!(stayed.frame, Frame::new(0.0, 25.0, 1000.0, 775.0));
        assert_eq!(snapshot.dropped_events, 0);
    }

    #[test]
    fn script_without_displays_is_rejected() {
        assert!(Script::parse("(displays: [])").is_err());
    }

    #[test]
    fn world_changes_wait_for_queued_events() {
        let mut script = Script::parse(SCRIPT).unwrap();
        script.steps = vec![
            Step::Event(Event::Command(Command::FocusWorkspace(2))),
            Step::MoveWindow(w(1), Frame::new(5.0, 5.0, 10.0, 10.0)),
            Step::Event(Event::Command(Command::FocusWorkspace(1))),
        ];
        let snapshot = replay(test_config(), &script);
        let window = &snapshot.windows[0];
        assert!(!window.is_parked);
        assert_eq!(window.frame, Frame::new(0.0, 25.0, 1000.0, 775.0));
    }
}
