use scangate::config::Settings;
use scangate::coordinator::CoordinatorBuilder;
use scangate::error::AppError;
use tracing::Level;

const SETTINGS_FILE: &str = "scangate.toml";

fn init_logging(level: Level) {
    tracing_subscriber::fmt().with_max_level(level).init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let settings = Settings::load(SETTINGS_FILE)?;
    init_logging(settings.max_log_level());
    tracing::info!(
        "Starting checkpoint with {:?} gateway, cooldown {}s, duplicate window {}s",
        settings.gateway.kind,
        settings.cooldown_secs,
        settings.duplicate_window_secs
    );

    let mut coordinator = CoordinatorBuilder::new(settings).build()?;
    if let Some(directory) = coordinator.directory() {
        match directory.list_employees().await {
            Ok(employees) => tracing::info!("{} employees registered", employees.len()),
            Err(e) => tracing::warn!("Failed to load employee list: {}", e),
        }
    }
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
    coordinator.stop();
    let stats = coordinator.session().stats();
    tracing::info!(
        "Session {} finished: {} frames, {} logged, {} denied, {} failed",
        coordinator.session().id(),
        stats.frames,
        stats.logged,
        stats.denied,
        stats.failed
    );
    Ok(())
}
