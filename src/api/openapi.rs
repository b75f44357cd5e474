//! OpenAPI documentation for the REST API

use utoipa::OpenApi;

/// OpenAPI document covering the download surface
#[derive(OpenApi)]
#[openapi(
    info(
        title = "wattpad-dl API",
        description = "Converts a hosted serialized story into a downloadable EPUB or PDF.",
        license(name = "MIT OR Apache-2.0"),
    ),
    paths(crate::api::routes::download_story, crate::api::routes::health_check),
    components(schemas(
        crate::types::DownloadMode,
        crate::types::DownloadFormat,
        crate::types::StoryId,
    )),
    tags(
        (name = "download", description = "Story download and conversion"),
        (name = "system", description = "Health and diagnostics"),
    )
)]
pub struct ApiDoc;
