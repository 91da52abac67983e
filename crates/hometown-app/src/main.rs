// Hometown map entry point.
//
// Startup sequence:
// 1. Initialize tracing (stderr)
// 2. Load config (copying defaults on first run)
// 3. Fetch dataset, build the city directory, write the base view
// 4. Enrich cities with locations and photos, write the final view

use anyhow::Context;
use tracing::info;

use hometown_app::app;
use hometown_core::config;

const DEFAULT_LOG_FILTER: &str =
    "hometown=info,hometown_app=info,hometown_core=info,hometown_places=info,warn";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    info!("Hometown map starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: dataset={}, {} fields, output={}",
        config.dataset.source,
        config.fields.len(),
        config.output.path
    );

    let view = app::run(config).await?;
    let located = view.markers.iter().filter(|m| m.position.is_some()).count();
    info!(
        "Done: {} markers ({} located), {} cities listed",
        view.markers.len(),
        located,
        view.city_list.len()
    );
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
