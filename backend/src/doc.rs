//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] collects every annotated handler under `inbound::http` and the
//! session cookie security scheme. Swagger UI serves it in debug builds.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::{Error, ErrorCode, ShareAction, ShareStatus, User};
use crate::inbound::http::auth::MeResponse;
use crate::inbound::http::diagrams_dto::{
    CreateDiagramRequest, CreateDiagramResponse, DiagramListResponse, DiagramResponse,
    DiagramSummary, ShareRequest, ShareResponse, SharedDiagramResponse, UpdateDiagramRequest,
};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Signed session cookie issued by GET /auth/google/callback.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "renderboard API",
        description = "Saved diagrams, share links, and guest publishing."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::auth::login,
        crate::inbound::http::auth::callback,
        crate::inbound::http::auth::logout,
        crate::inbound::http::auth::me,
        crate::inbound::http::diagrams::create_diagram,
        crate::inbound::http::diagrams::create_guest_diagram,
        crate::inbound::http::diagrams::list_diagrams,
        crate::inbound::http::diagrams::get_diagram,
        crate::inbound::http::diagrams::update_diagram,
        crate::inbound::http::diagrams::delete_diagram,
        crate::inbound::http::diagrams::share_diagram,
        crate::inbound::http::share::resolve_share,
        crate::inbound::http::og::snapshot,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        User,
        MeResponse,
        ShareAction,
        ShareStatus,
        CreateDiagramRequest,
        CreateDiagramResponse,
        UpdateDiagramRequest,
        ShareRequest,
        ShareResponse,
        DiagramResponse,
        DiagramSummary,
        DiagramListResponse,
        SharedDiagramResponse,
    )),
    tags(
        (name = "auth", description = "Login and session"),
        (name = "diagrams", description = "Saved and guest diagrams"),
        (name = "share", description = "Share link resolution"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/api/diagrams")]
    #[case("/api/diagrams/guest")]
    #[case("/api/diagrams/{id}")]
    #[case("/api/diagrams/{id}/share")]
    #[case("/api/share/{token}")]
    #[case("/og/{id}")]
    #[case("/auth/me")]
    fn documents_gallery_paths(#[case] path: &str) {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key(path), "missing {path}");
    }

    #[test]
    fn registers_session_cookie_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("SessionCookie"));
        assert!(
            components
                .schemas
                .keys()
                .any(|name| name == "Error" || name.ends_with(".Error"))
        );
    }
}
