//! Snapshot image endpoint.
//!
//! ```text
//! GET /og/{id}?token=T
//! ```

use actix_web::http::header;
use actix_web::{HttpResponse, get, web};

use crate::domain::{DiagramId, Error};
use crate::inbound::http::ApiResult;
use crate::inbound::http::cache_control::PRIVATE_SHORT_LIVED;
use crate::inbound::http::diagrams_dto::TokenQuery;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Stream a diagram's snapshot under the same read rules as the diagram.
#[utoipa::path(
    get,
    path = "/og/{id}",
    params(("id" = String, Path, description = "Diagram id"), TokenQuery),
    responses(
        (status = 200, description = "Snapshot image", content_type = "image/png"),
        (status = 403, description = "Private diagram", body = Error),
        (status = 404, description = "Unknown diagram or no snapshot", body = Error)
    ),
    tags = ["diagrams"],
    operation_id = "getSnapshot",
    security([])
)]
#[get("/og/{id}")]
pub async fn snapshot(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    query: web::Query<TokenQuery>,
) -> ApiResult<HttpResponse> {
    let id = DiagramId::parse(&path)?;
    let blob = state
        .gallery
        .read_image(session.user(), &id, query.token.as_deref())
        .await?;
    Ok(HttpResponse::Ok()
        .content_type(blob.content_type)
        .insert_header((header::CACHE_CONTROL, PRIVATE_SHORT_LIVED))
        .body(blob.bytes))
}
