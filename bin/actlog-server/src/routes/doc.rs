use utoipa::OpenApi;

use crate::routes::{health, log};

#[derive(OpenApi)]
#[openapi(info(
    title = "actlog-server",
    description = "Ingest and query user-interaction event logs",
    version = "0.1.0"
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(log::LogApi::openapi());
    root
}
