use anyhow::Result;
use pdfeditor_core::config::Config;
use pdfeditor_core::host;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_args_and_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    host::run(config).await
}
