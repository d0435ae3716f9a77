use aurora_rag::{api, config, logging, processing::RagService};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    config::init_config();
    logging::init_tracing();

    let config = config::get_config();
    let service = Arc::new(RagService::new());
    let app = api::create_router(service, config.service_token.clone());

    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, config.app_port))
        .await
        .expect("Failed to bind listener");
    tracing::info!("Listening on http://0.0.0.0:{}", config.app_port);
    axum::serve(listener, app).await.unwrap();
}
