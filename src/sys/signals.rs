//! Fatal signal handling.
//!
//! The terminating signals are blocked process wide and collected by a
//! dedicated thread with `sigwait`, so the cleanup runs as ordinary code
//! rather than inside an async signal handler. After cleanup the signal is
//! re-raised with its default disposition.

use nix::sys::signal::{SigHandler, SigSet, Signal, raise, signal};
use tracing::{error, warn};

pub const FATAL_SIGNALS: [Signal; 4] = [Signal::SIGINT, Signal::SIGTERM, Signal::SIGHUP, Signal::SIGQUIT];

fn fatal_set() -> SigSet {
    let mut set = SigSet::empty();
    for sig in FATAL_SIGNALS {
        set.add(sig);
    }
    set
}

/// Blocks the fatal signals on the calling thread and starts the watcher.
/// Must run before any other thread is spawned so they inherit the mask.
pub fn install(on_fatal: impl FnOnce() + Send + 'static) -> anyhow::Result<()> {
    let set = fatal_set();
    set.thread_block()?;
    std::thread::Builder::new().name("signal-watcher".to_string()).spawn(move || {
        let sig = match set.wait() {
            Ok(sig) => sig,
            Err(err) => {
                error!(%err, "sigwait failed; fatal signals will not restore windows");
                return;
            }
        };
        error!(?sig, "fatal signal received, restoring parked windows");
        on_fatal();
        reraise(sig, &set);
    })?;
    Ok(())
}

fn reraise(sig: Signal, set: &SigSet) {
    // SAFETY: SigDfl installs no handler code.
    if let Err(err) = unsafe { signal(sig, SigHandler::SigDfl) } {
        warn!(%err, ?sig, "could not reset signal disposition");
    }
    if let Err(err) = set.thread_unblock() {
        warn!(%err, "could not unblock fatal signals");
    }
    if let Err(err) = raise(sig) {
        warn!(%err, ?sig, "could not re-raise signal");
    }
    std::process::exit(128 + sig as i32);
}
