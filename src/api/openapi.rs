use super::handlers::{health, login};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(login::login, health::health),
    components(schemas(login::LoginRequest, health::Health)),
    tags(
        (name = "login", description = "Email and password login"),
        (name = "health", description = "Service liveness"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    // Use Cargo.toml metadata instead of the utoipa defaults.
    doc.info.title = env!("CARGO_PKG_NAME").to_string();
    doc.info.version = env!("CARGO_PKG_VERSION").to_string();
    doc.info.description = Some(env!("CARGO_PKG_DESCRIPTION").to_string());
    doc
}
