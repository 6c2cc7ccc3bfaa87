use language_detector::config::{self, ServiceConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    language_detector::init_tracing(config::log_format_from_env()?)?;

    let config = ServiceConfig::from_env();
    if let Err(e) = language_detector::run(config).await {
        tracing::error!(error = %e, "language-detector exiting");
        return Err(e.into());
    }
    Ok(())
}
