//! solidpipe entry point
//!
//! Usage: `solidpipe [config.ron]`

use solidpipe_demo::{DemoConfig, DemoError};

fn main() -> Result<(), DemoError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "solidpipe_demo=info,solidpipe_cad=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            tracing::info!("Loading configuration from {}", path);
            DemoConfig::load(&path)?
        }
        None => DemoConfig::default(),
    };

    let summary = solidpipe_demo::run(&config)?;
    tracing::info!(
        "Displayed {} shapes and {} wires ({} failures)",
        summary.shape_count(),
        summary.wire_count(),
        summary.failures.len()
    );
    Ok(())
}
