use std::sync::Arc;

use apiflow_core::problemdetails::{self, Problem, ProblemDetails};
use apiflow_core::MAX_PAYLOAD_BYTES;
use apiflow_import_types::{DomainMapping, ImportError, ImportResponse, MissingData};
use axum::{
    extract::{DefaultBodyLimit, State},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use tracing::error;
use utoipa::OpenApi;

use crate::handlers::types::{ImportAppState, ImportRpcRequest, RpcCode};

/// Base64 inflates by a third; leave room for the JSON envelope
const MAX_REQUEST_BODY_BYTES: usize = MAX_PAYLOAD_BYTES / 3 * 4 + 1024 * 1024;

/// RFC 7807 body for a failed import, carrying the RPC code and error kind
pub fn import_problem(error: ImportError) -> Problem {
    let kind = error.kind();
    let code = RpcCode::from(kind);
    if code == RpcCode::Internal {
        error!(kind = %kind, error = %error, "Import failed");
    }

    problemdetails::new(code.status())
        .with_title(code.title())
        .with_detail(error.to_string())
        .with_code(code.as_str())
        .with_value("kind", kind.as_str())
}

#[derive(OpenApi)]
#[openapi(
    paths(import),
    components(schemas(ImportRpcRequest, ImportResponse, MissingData, DomainMapping, ProblemDetails)),
    info(
        title = "Imports API",
        description = "Turns HAR recordings, OpenAPI documents, Postman collections, \
        YAML flows and cURL commands into stored requests and flows.",
        version = "1.0.0"
    ),
    tags(
        (name = "Imports", description = "Request and flow import")
    )
)]
pub struct ImportApiDoc;

pub fn configure_routes() -> Router<Arc<ImportAppState>> {
    Router::new()
        .route("/imports", post(import))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
}

/// Import a payload into a workspace
///
/// Without `domain_data` the call only reports the API domains found in
/// the payload. Calling again with `domain_data` (possibly empty) stores
/// the result and returns the new flow.
#[utoipa::path(
    tag = "Imports",
    post,
    path = "/imports",
    request_body = ImportRpcRequest,
    responses(
        (status = 200, description = "Domains to confirm, or the stored flow", body = ImportResponse),
        (status = 400, description = "Invalid payload or arguments", body = ProblemDetails),
        (status = 403, description = "Workspace access denied", body = ProblemDetails),
        (status = 404, description = "Workspace not found", body = ProblemDetails),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    )
)]
async fn import(
    State(app_state): State<Arc<ImportAppState>>,
    Json(body): Json<ImportRpcRequest>,
) -> Result<impl IntoResponse, Problem> {
    let request = body.into_request().map_err(import_problem)?;
    let response = app_state
        .coordinator
        .import(request)
        .await
        .map_err(import_problem)?;
    Ok(Json(response))
}
