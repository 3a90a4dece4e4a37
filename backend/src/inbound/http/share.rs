//! Share link resolution.
//!
//! ```text
//! GET /api/share/{token}
//! ```

use actix_web::{HttpResponse, get, web};

use crate::domain::Error;
use crate::inbound::http::ApiResult;
use crate::inbound::http::cache_control::no_store_header;
use crate::inbound::http::diagrams_dto::{DiagramResponse, SharedDiagramResponse};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Resolve a share token to its diagram.
///
/// Expired or disabled links answer 401 with a login hint for anonymous
/// callers and 200 with `status: "expired"` for any logged-in caller.
#[utoipa::path(
    get,
    path = "/api/share/{token}",
    params(("token" = String, Path, description = "Share token")),
    responses(
        (status = 200, description = "Shared diagram", body = SharedDiagramResponse),
        (status = 401, description = "Share inactive; login required", body = Error),
        (status = 404, description = "Unknown token", body = Error)
    ),
    tags = ["share"],
    operation_id = "resolveShare",
    security([])
)]
#[get("/api/share/{token}")]
pub async fn resolve_share(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let shared = state.gallery.read_shared(session.user(), &path).await?;
    Ok(HttpResponse::Ok()
        .insert_header(no_store_header())
        .json(SharedDiagramResponse {
            status: shared.status,
            diagram: DiagramResponse::for_viewer(shared.diagram, session.user()),
        }))
}
