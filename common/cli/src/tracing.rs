use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use tracing::info;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Configures the global tracing subscriber.
///
/// * `RUST_LOG` takes precedence, the verbosity flags provide the default level.
/// * When `trace` is specified the log is written to that file (no ansi colors), otherwise to stdout.
pub fn configure_tracing(trace: Option<PathBuf>, verbosity: Verbosity<InfoLevel>) -> anyhow::Result<()> {
    let default_directive: Directive = verbosity
        .tracing_level_filter()
        .into();

    let filter = EnvFilter::builder()
        .with_default_directive(default_directive)
        .from_env_lossy();

    let registry = tracing_subscriber::registry().with(filter);

    match &trace {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Unable to create trace file. path: {:?}", path))?;
            registry
                .with(
                    fmt::layer()
                        .with_writer(Arc::new(file))
                        .with_ansi(false),
                )
                .try_init()?;
        }
        None => {
            registry
                .with(fmt::layer())
                .try_init()?;
        }
    }

    info!("Tracing configured. trace: {:?}", trace);

    Ok(())
}
