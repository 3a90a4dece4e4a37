//! Client identity used for guest rate limiting.

use actix_web::HttpRequest;

/// Header set by the fronting CDN with the original client address.
pub const CF_CONNECTING_IP: &str = "CF-Connecting-IP";

const UNKNOWN_CLIENT: &str = "unknown";

/// Best-effort client identifier.
///
/// The CDN header is honoured only when `trust_cdn_header` is set, i.e. when
/// the listener is reachable solely through the CDN. Otherwise any caller
/// could mint fresh rate-limit buckets by rotating the header, so the socket
/// peer is used. All callers that cannot be identified share the `unknown`
/// buckets.
pub fn client_id(req: &HttpRequest, trust_cdn_header: bool) -> String {
    let forwarded = trust_cdn_header
        .then(|| req.headers().get(CF_CONNECTING_IP))
        .flatten()
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_owned();
    }
    req.peer_addr()
        .map_or_else(|| UNKNOWN_CLIENT.to_owned(), |addr| addr.ip().to_string())
}
