use std::sync::Arc;

use apiflow_events::EventPublisher;
use apiflow_import::{configure_routes, create_import_app_state, ImportApiDoc, ImportCoordinator};
use axum::Router;
use clap::Args;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::{DatabaseArgs, ImportConfigArgs};

#[derive(Args)]
pub struct ServeCommand {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1:8080", env = "APIFLOW_ADDRESS")]
    pub address: String,

    #[command(flatten)]
    pub database: DatabaseArgs,

    #[command(flatten)]
    pub import: ImportConfigArgs,
}

impl ServeCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run())
    }

    async fn run(self) -> anyhow::Result<()> {
        let db = self.database.connect().await?;
        let events = Arc::new(EventPublisher::new());
        let coordinator = ImportCoordinator::new(db, self.import.config(), events)?;
        debug!(config = ?coordinator.config(), "Import coordinator ready");

        let app = build_app(Arc::new(coordinator));
        let listener = TcpListener::bind(&self.address).await?;
        info!("Import API listening on {}", self.address);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("Import API exited");
        Ok(())
    }
}

fn build_app(coordinator: Arc<ImportCoordinator>) -> Router {
    let api = configure_routes().with_state(create_import_app_state(coordinator));
    Router::new()
        .nest("/api", api)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ImportApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until the process is killed
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down...");
}
