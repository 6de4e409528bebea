//! Proxy link redemption.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::Response,
};
use tracing::{debug, info, warn};

use debridgate_common::{Error, TunnelType};
use debridgate_proxy::{resolve_proxy_token, ResolvedProxyLink};

use crate::error::ApiResult;
use crate::state::AppState;

/// Upstream response headers passed on to the client.
const FORWARDED_HEADERS: [HeaderName; 7] = [
    header::CONTENT_TYPE,
    header::CONTENT_LENGTH,
    header::CONTENT_RANGE,
    header::CONTENT_DISPOSITION,
    header::ACCEPT_RANGES,
    header::LAST_MODIFIED,
    header::ETAG,
];

/// GET /v0/proxy/{token}
pub async fn redeem(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    serve_link(&state, &token, &headers).await
}

/// GET /v0/proxy/{token}/{filename}
///
/// The filename only makes the URL friendlier for players; it is ignored.
pub async fn redeem_named(
    State(state): State<AppState>,
    Path((token, _filename)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    serve_link(&state, &token, &headers).await
}

async fn serve_link(state: &AppState, token: &str, headers: &HeaderMap) -> ApiResult<Response> {
    let resolved = resolve_proxy_token(token, &state.auth)?;
    let tunnel = resolved.tunnel.unwrap_or_default();

    if tunnel == TunnelType::Direct && resolved.headers.is_empty() {
        debug!(user = %resolved.user, "redirecting proxy link");
        return redirect(&resolved.link);
    }

    info!(user = %resolved.user, tunnel = %tunnel, "streaming proxy link");
    stream(state, tunnel, &resolved, headers).await
}

fn redirect(link: &str) -> ApiResult<Response> {
    let location = HeaderValue::from_str(link)
        .map_err(|_| Error::InvalidLink("proxy link target is not a valid location".to_string()))?;

    Response::builder()
        .status(StatusCode::FOUND)
        .header(header::LOCATION, location)
        .body(Body::empty())
        .map_err(|e| Error::InvalidLink(e.to_string()).into())
}

async fn stream(
    state: &AppState,
    tunnel: TunnelType,
    resolved: &ResolvedProxyLink,
    headers: &HeaderMap,
) -> ApiResult<Response> {
    let mut request = state.client(tunnel).get(&resolved.link);

    for (name, value) in &resolved.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| Error::InvalidLink(format!("invalid proxy header: {}", name)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| Error::InvalidLink(format!("invalid value for proxy header: {}", name)))?;
        request = request.header(name, value);
    }
    if let Some(range) = headers.get(header::RANGE) {
        request = request.header(header::RANGE, range.clone());
    }

    let upstream = request.send().await.map_err(|e| {
        warn!(error = %e, "upstream request failed");
        Error::Network(format!("Upstream request failed: {}", e))
    })?;

    let status = upstream.status();
    debug!(status = %status, "upstream responded");

    let mut response = Response::builder().status(status);
    for name in FORWARDED_HEADERS {
        if let Some(value) = upstream.headers().get(&name) {
            response = response.header(name, value.clone());
        }
    }

    response
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(|e| Error::Network(format!("Failed to relay upstream response: {}", e)).into())
}
