use env_logger::{Builder, WriteStyle};
use log::error;
use w1sheets::config::AppConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load configuration first (without logging)
    let config = AppConfig::new().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {:#}", e);
        // Fall back to default configuration
        AppConfig::default()
    });

    // Initialise logger with a configured log level
    Builder::new()
        .filter_level(config.get_log_level())
        .write_style(WriteStyle::Always)
        .format_timestamp_secs()
        .init();

    if let Err(e) = w1sheets::run(config).await {
        error!("Application error: {e:#}");
        // Print chain of error causes
        for cause in e.chain().skip(1) {
            error!("Caused by: {cause}");
        }
        return Err(e);
    }
    Ok(())
}
