// Standings updater entry point.
//
// Run sequence:
// 1. Initialize tracing (stderr)
// 2. Load config (defaults copied into config/ when missing)
// 3. Build the upstream client and fetcher
// 4. Fetch every roster user and build the league views
// 5. Write the cache artifacts

use showstand_app::fetcher::{ApiClient, HistoryFetcher};
use showstand_app::pipeline;
use showstand_core::config;

use anyhow::Context;
use chrono::Utc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: league={}, {} teams, mode={:?}",
        config.league.name,
        config.league.roster.len(),
        config.runtime.run.mode
    );

    let client =
        ApiClient::from_config(&config.runtime.fetch).context("failed to build HTTP client")?;
    let fetcher = HistoryFetcher::new(client, &config.runtime.fetch);

    let now = Utc::now().with_timezone(&config.timezone);
    let output = pipeline::run(&config, &fetcher, now).await;

    let out_dir = std::path::Path::new(&config.runtime.output.dir);
    let written = pipeline::write_outputs(&output, out_dir)
        .with_context(|| format!("failed to write artifacts to {}", out_dir.display()))?;
    info!(
        "Wrote {} artifacts to {} at {}",
        written.len(),
        out_dir.display(),
        output.generated_at
    );

    Ok(())
}

/// Initialize tracing to stderr, filtered by `RUST_LOG`.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("showstand=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
