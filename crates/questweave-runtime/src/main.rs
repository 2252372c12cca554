//! Questweave scripted session runner.

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use questweave_core::collaborators::CompanionDirectory;
use questweave_core::config::KernelConfig;
use questweave_core::rng::SeededRng;
use questweave_runtime::companions::CompanionRoster;
use questweave_runtime::kernel::{Kernel, KernelDeps};
use questweave_runtime::session::{DEMO_PLAYER, Session, builtin_script, load_script};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    // Read configuration from environment.
    let config = match std::env::var_os("QUESTWEAVE_CONFIG") {
        Some(path) => KernelConfig::from_file(&PathBuf::from(path))?,
        None => KernelConfig::default(),
    };
    let seed: u64 = std::env::var("QUESTWEAVE_SEED")
        .unwrap_or_else(|_| "0".to_string())
        .parse()
        .map_err(|e| format!("QUESTWEAVE_SEED must be a valid u64: {e}"))?;
    let steps = match std::env::var_os("QUESTWEAVE_SCRIPT") {
        Some(path) => load_script(&PathBuf::from(path))?,
        None => builtin_script(),
    };

    tracing::info!(seed, steps = steps.len(), "Starting Questweave session");

    let roster = Arc::new(CompanionRoster::new());
    let companions: Arc<dyn CompanionDirectory> = roster.clone();
    let deps = KernelDeps::in_memory(Box::new(SeededRng::from_seed(seed)), companions);
    let kernel = Kernel::new(&config, deps);

    let report = Session::new(&kernel, roster, DEMO_PLAYER).run(&steps)?;
    kernel.shutdown();

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
