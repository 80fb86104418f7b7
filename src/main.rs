mod app_context;
mod config;
mod jobs;
mod monitor;
mod server;

use tracing_subscriber::EnvFilter;

use crate::app_context::AppContext;
use crate::config::{load_config, Config};
use crate::jobs::start_background_jobs;

const CONFIG_PATH_VAR: &str = "LOADCAST_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

fn init_json_logging() {
    if let Err(error) = tracing_log::LogTracer::init() {
        eprintln!(
            "logging bridge initialization failed (continuing with existing logger): {}",
            error
        );
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .json()
        .with_current_span(false)
        .with_span_list(false)
        .finish();

    if let Err(error) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("global logger initialization failed: {}", error);
    }
}

#[tokio::main]
async fn main() {
    init_json_logging();

    let config_path =
        std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let config: Config = match load_config(&config_path) {
        Ok(config) => config,
        Err(error) => {
            log::error!("Configuration error: {}", error);
            return;
        }
    };

    if let Err(error) = config.validate() {
        log::error!("Configuration validation failed: {}", error);
        return;
    }

    log::info!(
        "loadcast starting sample_rate={} listen_addr={} assets_dir={}",
        config.sample_rate,
        config.listen_addr,
        config.assets_dir
    );

    let app_context = AppContext::new(config);

    start_background_jobs(app_context.clone());

    if let Err(error) = server::run(app_context).await {
        log::error!("CRITICAL: server terminated: {}", error);
    }
}
