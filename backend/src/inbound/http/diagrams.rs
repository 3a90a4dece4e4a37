//! Diagram API handlers.
//!
//! ```text
//! POST   /api/diagrams              Save a diagram for the session user
//! POST   /api/diagrams/guest        Publish an anonymous 3-day share
//! GET    /api/diagrams?limit=N      The session user's diagrams
//! GET    /api/diagrams/{id}?token=T Read one diagram
//! PATCH  /api/diagrams/{id}         Edit title and description
//! DELETE /api/diagrams/{id}         Delete
//! POST   /api/diagrams/{id}/share   Enable, disable, or rotate the share link
//! ```

use actix_web::{HttpRequest, HttpResponse, delete, get, patch, post, web};

use crate::domain::{
    CreatedDiagram, DiagramId, DiagramPatch, Error, LIST_LIMIT_DEFAULT, ReadDiagram,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::cache_control::no_store_header;
use crate::inbound::http::client_ip::client_id;
use crate::inbound::http::diagrams_dto::{
    CreateDiagramRequest, CreateDiagramResponse, DiagramListResponse, DiagramResponse,
    DiagramSummary, ListQuery, ShareRequest, ShareResponse, TokenQuery, UpdateDiagramRequest,
};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

fn created_response(state: &HttpState, created: CreatedDiagram, with_share: bool) -> HttpResponse {
    let CreatedDiagram {
        diagram,
        image_stored,
    } = created;
    let share = with_share.then(|| ShareResponse::from_diagram(state, &diagram));
    HttpResponse::Created().json(CreateDiagramResponse {
        id: diagram.id.to_string(),
        url: state.diagram_url(&diagram.id),
        image_stored,
        share,
    })
}

/// Save a diagram owned by the session user.
#[utoipa::path(
    post,
    path = "/api/diagrams",
    request_body = CreateDiagramRequest,
    responses(
        (status = 201, description = "Diagram created", body = CreateDiagramResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Login required", body = Error),
        (status = 413, description = "Payload too large", body = Error)
    ),
    tags = ["diagrams"],
    operation_id = "createDiagram"
)]
#[post("/api/diagrams")]
pub async fn create_diagram(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateDiagramRequest>,
) -> ApiResult<HttpResponse> {
    let (draft, image) = payload.into_inner().into_parts()?;
    let created = state
        .gallery
        .create_owned(session.user(), draft, image)
        .await?;
    Ok(created_response(&state, created, false))
}

/// Publish an anonymous diagram behind a 3-day share link.
#[utoipa::path(
    post,
    path = "/api/diagrams/guest",
    request_body = CreateDiagramRequest,
    responses(
        (status = 201, description = "Guest diagram created", body = CreateDiagramResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 413, description = "Payload too large", body = Error),
        (status = 429, description = "Rate limited", body = Error)
    ),
    tags = ["diagrams"],
    operation_id = "createGuestDiagram",
    security([])
)]
#[post("/api/diagrams/guest")]
pub async fn create_guest_diagram(
    req: HttpRequest,
    state: web::Data<HttpState>,
    payload: web::Json<CreateDiagramRequest>,
) -> ApiResult<HttpResponse> {
    let (draft, image) = payload.into_inner().into_parts()?;
    let created = state
        .gallery
        .create_guest(&client_id(&req, state.trust_cdn_header), draft, image)
        .await?;
    Ok(created_response(&state, created, true))
}

/// The session user's diagrams, newest first.
#[utoipa::path(
    get,
    path = "/api/diagrams",
    params(ListQuery),
    responses(
        (status = 200, description = "Owned diagrams", body = DiagramListResponse),
        (status = 401, description = "Login required", body = Error)
    ),
    tags = ["diagrams"],
    operation_id = "listDiagrams"
)]
#[get("/api/diagrams")]
pub async fn list_diagrams(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<ListQuery>,
) -> ApiResult<HttpResponse> {
    let limit = query.limit.unwrap_or(LIST_LIMIT_DEFAULT);
    let diagrams = state.gallery.list_owned(session.user(), limit).await?;
    let items = diagrams.into_iter().map(DiagramSummary::from).collect();
    Ok(HttpResponse::Ok()
        .insert_header(no_store_header())
        .json(DiagramListResponse { items }))
}

/// Read a diagram; private ones need ownership or a share token.
#[utoipa::path(
    get,
    path = "/api/diagrams/{id}",
    params(("id" = String, Path, description = "Diagram id"), TokenQuery),
    responses(
        (status = 200, description = "Diagram", body = DiagramResponse),
        (status = 401, description = "Share expired; login required", body = Error),
        (status = 403, description = "Private diagram", body = Error),
        (status = 404, description = "Unknown diagram", body = Error)
    ),
    tags = ["diagrams"],
    operation_id = "getDiagram",
    security([])
)]
#[get("/api/diagrams/{id}")]
pub async fn get_diagram(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    query: web::Query<TokenQuery>,
) -> ApiResult<HttpResponse> {
    let id = DiagramId::parse(&path)?;
    let ReadDiagram { diagram, .. } = state
        .gallery
        .read(session.user(), &id, query.token.as_deref())
        .await?;
    Ok(HttpResponse::Ok()
        .insert_header(no_store_header())
        .json(DiagramResponse::for_viewer(diagram, session.user())))
}

/// Edit title and description.
#[utoipa::path(
    patch,
    path = "/api/diagrams/{id}",
    params(("id" = String, Path, description = "Diagram id")),
    request_body = UpdateDiagramRequest,
    responses(
        (status = 200, description = "Updated diagram", body = DiagramResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Login required", body = Error),
        (status = 403, description = "Not the owner", body = Error),
        (status = 404, description = "Unknown diagram", body = Error)
    ),
    tags = ["diagrams"],
    operation_id = "updateDiagram"
)]
#[patch("/api/diagrams/{id}")]
pub async fn update_diagram(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<UpdateDiagramRequest>,
) -> ApiResult<web::Json<DiagramResponse>> {
    let id = DiagramId::parse(&path)?;
    let patch = DiagramPatch::try_from(payload.into_inner())?;
    let diagram = state.gallery.update(session.user(), &id, patch).await?;
    Ok(web::Json(DiagramResponse::for_viewer(
        diagram,
        session.user(),
    )))
}

/// Delete a diagram; snapshot cleanup is best effort.
#[utoipa::path(
    delete,
    path = "/api/diagrams/{id}",
    params(("id" = String, Path, description = "Diagram id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Login required", body = Error),
        (status = 403, description = "Not the owner", body = Error),
        (status = 404, description = "Unknown diagram", body = Error)
    ),
    tags = ["diagrams"],
    operation_id = "deleteDiagram"
)]
#[delete("/api/diagrams/{id}")]
pub async fn delete_diagram(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = DiagramId::parse(&path)?;
    state.gallery.delete(session.user(), &id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Enable, disable, or rotate the share link.
#[utoipa::path(
    post,
    path = "/api/diagrams/{id}/share",
    params(("id" = String, Path, description = "Diagram id")),
    request_body = ShareRequest,
    responses(
        (status = 200, description = "Share state", body = ShareResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Login required", body = Error),
        (status = 403, description = "Not the owner", body = Error),
        (status = 404, description = "Unknown diagram", body = Error)
    ),
    tags = ["diagrams"],
    operation_id = "shareDiagram"
)]
#[post("/api/diagrams/{id}/share")]
pub async fn share_diagram(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<ShareRequest>,
) -> ApiResult<web::Json<ShareResponse>> {
    let id = DiagramId::parse(&path)?;
    let ShareRequest {
        action,
        expires_in_days,
    } = payload.into_inner();
    let diagram = state
        .gallery
        .share(session.user(), &id, action, expires_in_days)
        .await?;
    Ok(web::Json(ShareResponse::from_diagram(&state, &diagram)))
}
