//! Shared HTTP adapter state.
//!
//! Handlers receive this via `web::Data` and only touch domain services, so
//! the route table can be exercised against in-memory adapters.

use crate::domain::{AuthService, DiagramId, GalleryService, SessionCodec, ShareToken};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Authorised diagram operations.
    pub gallery: GalleryService,
    /// OAuth login flow.
    pub auth: AuthService,
    /// Session cookie codec.
    pub sessions: SessionCodec,
    /// Absolute origin used in share and image links, without a trailing slash.
    pub public_base_url: String,
    /// Whether `CF-Connecting-IP` identifies guest clients.
    pub trust_cdn_header: bool,
}

impl HttpState {
    /// Bundle the services; `public_base_url` is normalised.
    pub fn new(
        gallery: GalleryService,
        auth: AuthService,
        sessions: SessionCodec,
        public_base_url: impl Into<String>,
    ) -> Self {
        let public_base_url = public_base_url.into().trim_end_matches('/').to_owned();
        Self {
            gallery,
            auth,
            sessions,
            public_base_url,
            trust_cdn_header: false,
        }
    }

    /// Identify guests by the CDN client header instead of the socket peer.
    #[must_use]
    pub fn with_trusted_cdn_header(mut self, trusted: bool) -> Self {
        self.trust_cdn_header = trusted;
        self
    }

    /// Public URL of a share link.
    pub fn share_url(&self, token: &ShareToken) -> String {
        format!("{}/share/{}", self.public_base_url, token.as_ref())
    }

    /// Public URL of a diagram.
    pub fn diagram_url(&self, id: &DiagramId) -> String {
        format!("{}/d/{id}", self.public_base_url)
    }

    /// Site-relative URL of a diagram snapshot.
    pub fn image_url(id: &DiagramId) -> String {
        format!("/og/{id}")
    }
}
