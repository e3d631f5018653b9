use vesti::api::server::start_api_server;
use vesti::api::ApiContext;
use vesti::config::{self, AppConfig};
use vesti::generation::{ModelParams, ReplicateClient};
use vesti::service::TryOnService;

#[tokio::main]
async fn main() {
    vesti::init_tracing();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = AppConfig::from_env().expect("configuration error");

    let model = ReplicateClient::new(config.generation.clone()).expect("generation client error");
    let service = TryOnService::new(model, ModelParams::default(), config.fallback_policy);

    let server = start_api_server(config.bind_addr, config.port, ApiContext::new(service))
        .await
        .expect("failed to start API server");

    tracing::info!(addr = %server.session.server_addr, "try-on API listening");

    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for shutdown signal");

    let mut server = server;
    server.shutdown();
}
