use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tessel_wm::actor::reactor::{self, Reactor, Script, Step};
use tessel_wm::common::config::{Config, config_file};
use tessel_wm::common::log;
use tessel_wm::sys::headless::HeadlessWindowSystem;
use tessel_wm::sys::recovery::RecoveryHandle;
use tessel_wm::sys::signals;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "tessel")]
#[command(about = "Tiling window manager core driven by scripted platforms")]
struct Cli {
    /// Config file to use instead of ~/.tessel.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a RON script deterministically and print the final state as JSON.
    Replay {
        script: PathBuf,
        /// Print the layout trees instead of the full state.
        #[arg(long)]
        trees: bool,
    },
    /// Run the reactor on its own queue, feeding it the script from a
    /// producer thread. Parked windows are restored on exit, on fatal
    /// signals and on panic.
    Run { script: PathBuf },
    /// Check the config file for problems.
    CheckConfig {
        /// Rewrite the file with out-of-range values fixed.
        #[arg(long)]
        fix: bool,
    },
}

static RECOVERY: OnceLock<RecoveryHandle<HeadlessWindowSystem>> = OnceLock::new();

fn main() {
    let opt: Cli = Parser::parse();
    log::init_logging();
    install_panic_hook();

    if let Err(err) = run(opt) {
        error!("{err:#}");
        std::process::exit(1);
    }
}

fn run(opt: Cli) -> anyhow::Result<()> {
    let path = opt.config.unwrap_or_else(config_file);
    match opt.command {
        Commands::CheckConfig { fix } => check_config(&path, fix),
        Commands::Replay { script, trees } => {
            let config = load_config(&path)?;
            let script = Script::load(&script).with_context(|| format!("loading {}", script.display()))?;
            let snapshot = reactor::replay(config, &script);
            if trees {
                for layout in &snapshot.layouts {
                    println!("workspace {} on display {:?}", layout.workspace, layout.display);
                    println!("{}", layout.tree);
                }
            } else {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            }
            Ok(())
        }
        Commands::Run { script } => {
            let config = load_config(&path)?;
            let script = Script::load(&script).with_context(|| format!("loading {}", script.display()))?;
            run_live(config, script)
        }
    }
}

fn load_config(path: &std::path::Path) -> anyhow::Result<Config> {
    let mut config = Config::read_or_default(path).with_context(|| format!("reading {}", path.display()))?;
    for issue in config.validate() {
        warn!(%issue, "config problem");
    }
    let fixed = config.auto_fix_values();
    if fixed > 0 {
        info!(fixed, "adjusted out-of-range config values");
    }
    Ok(config)
}

fn check_config(path: &std::path::Path, fix: bool) -> anyhow::Result<()> {
    let mut config = Config::read_or_default(path).with_context(|| format!("reading {}", path.display()))?;
    let issues = config.validate();
    for issue in &issues {
        println!("{issue}");
    }
    if fix && !issues.is_empty() {
        let fixed = config.auto_fix_values();
        config.save(path)?;
        println!("fixed {fixed} value(s) in {}", path.display());
        return Ok(());
    }
    if !issues.is_empty() {
        anyhow::bail!("{} problem(s) in {}", issues.len(), path.display());
    }
    println!("{} is valid", path.display());
    Ok(())
}

fn run_live(config: Config, script: Script) -> anyhow::Result<()> {
    let world = script.world();
    let (tx, rx) = reactor::channel(config.settings.event_queue_capacity);
    let mut reactor = Reactor::new(config, world.clone());

    let handle = reactor.recovery_handle();
    if RECOVERY.set(handle.clone()).is_err() {
        warn!("recovery handle already installed; panics restore the first reactor's windows");
    }
    // Before any thread is spawned so every thread inherits the signal mask.
    signals::install(move || {
        handle.restore();
    })?;

    reactor.start();

    let producer = std::thread::Builder::new().name("script-producer".to_string()).spawn(move || {
        for step in script.steps {
            match step {
                Step::Event(event) => {
                    tx.send(event);
                }
                step => reactor::apply_world_change(&world, &step),
            }
        }
    })?;

    reactor.run(rx);
    if producer.join().is_err() {
        anyhow::bail!("script producer panicked");
    }
    info!("reactor stopped");
    Ok(())
}

#[cfg(panic = "unwind")]
fn install_panic_hook() {
    // Abort on panic instead of unwinding into the run loop, restoring parked
    // windows first.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        original_hook(info);
        if let Some(handle) = RECOVERY.get() {
            handle.restore();
        }
        std::process::abort();
    }));
}

#[cfg(not(panic = "unwind"))]
fn install_panic_hook() {}
