//! Download and system handlers.

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use utoipa::{IntoParams, OpenApi};

use super::gateway::{RequestCancellation, client_closed_response};
use crate::api::AppState;
use crate::types::{
    Credentials, DownloadFormat, DownloadMode, DownloadOutcome, DownloadRequest, GeneratedBook,
};

/// Query parameters accepted by the download endpoint
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DownloadParams {
    /// Fetch and embed inline chapter images (default: false)
    #[serde(default)]
    pub download_images: bool,

    /// Whether the identifier addresses a story or a part (default: story)
    #[serde(default)]
    pub mode: DownloadMode,

    /// Artifact format (default: epub)
    #[serde(default)]
    pub format: DownloadFormat,

    /// Account username; must be paired with `password`
    pub username: Option<String>,

    /// Account password; must be paired with `username`
    pub password: Option<String>,
}

/// GET /download/:identifier - Convert a story into a downloadable book
#[utoipa::path(
    get,
    path = "/download/{identifier}",
    tag = "download",
    params(
        ("identifier" = u64, Path, description = "Story id (mode=story) or part id (mode=part)"),
        DownloadParams,
    ),
    responses(
        (status = 200, description = "The assembled artifact, as an attachment"),
        (status = 403, description = "Credential exchange rejected"),
        (status = 404, description = "Story does not exist or was deleted"),
        (status = 422, description = "Partial credential pair"),
        (status = 429, description = "Content source rate limit"),
        (status = 500, description = "Unexpected failure")
    )
)]
pub async fn download_story(
    State(state): State<AppState>,
    Path(identifier): Path<u64>,
    Query(params): Query<DownloadParams>,
    cancellation: Option<Extension<RequestCancellation>>,
) -> Response {
    // Validation happens before anything touches the network
    let credentials = match Credentials::from_parts(params.username, params.password) {
        Ok(credentials) => credentials,
        Err(error) => {
            tracing::warn!(identifier, "partial credential pair rejected");
            return error.into_response();
        }
    };

    let request = DownloadRequest {
        identifier,
        mode: params.mode,
        format: params.format,
        include_images: params.download_images,
        credentials,
    };
    tracing::info!(
        identifier,
        mode = ?request.mode,
        format = ?request.format,
        download_images = request.include_images,
        "download requested"
    );

    let RequestCancellation(cancel) = cancellation
        .map(|Extension(cancellation)| cancellation)
        .unwrap_or_default();

    match state.downloader.download(request, cancel).await {
        DownloadOutcome::Success(book) => artifact_response(book),
        DownloadOutcome::Failed(error) => error.into_response(),
        // The transport already closed; nothing we resolve with is delivered
        DownloadOutcome::Cancelled => client_closed_response(),
    }
}

/// Stream the finished artifact as an attachment.
///
/// This suspends on nothing but local buffer writes; the book's backing
/// memory is released once the response body is written out.
fn artifact_response(book: GeneratedBook) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, book.media_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", book.filename),
            ),
        ],
        book.bytes,
    )
        .into_response()
}

/// GET /health - Health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "Service is alive"))
)]
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /openapi.json - OpenAPI specification
pub async fn openapi_spec() -> impl IntoResponse {
    Json(super::ApiDoc::openapi())
}
