//! Proxy link creation and resolution.

use jsonwebtoken::{
    decode, encode, get_current_timestamp, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

use debridgate_common::{Error, Result, TunnelType};
use debridgate_crypto::{
    base64_decode, base64_decode_string, base64_encode, open_string, seal_string,
    ENCRYPTION_FORMAT,
};

use crate::auth::ProxyAuth;

/// Route prefix of proxy links.
pub const PROXY_PATH: &str = "/v0/proxy";

/// Tag of unsigned tokens.
const UNSIGNED_PREFIX: &str = "base64.";

/// `iss` claim of signed tokens.
const ISSUER: &str = "debridgate";

/// `enc_format` of signed tokens whose link is only base64 encoded.
const BASE64_FORMAT: &str = "base64";

/// Separates a header name from its value inside a signed link blob.
const HEADER_SEPARATOR: &str = ": ";

/// Characters escaped in the filename path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// What to wrap in a proxy link.
#[derive(Debug, Clone, Default)]
pub struct ProxyLinkRequest {
    /// Backend URL.
    pub link: String,
    /// Headers to send upstream when the link is redeemed.
    pub headers: BTreeMap<String, String>,
    pub tunnel: Option<TunnelType>,
    /// Lifetime, zero for a link that never expires.
    pub expires_in: Duration,
    pub user: String,
    /// The user's secret.
    pub password: String,
    pub encrypt: bool,
    /// Trailing path segment, derived from `link` when absent.
    pub filename: Option<String>,
}

impl ProxyLinkRequest {
    pub fn new(
        link: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            link: link.into(),
            user: user.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_tunnel(mut self, tunnel: TunnelType) -> Self {
        self.tunnel = Some(tunnel);
        self
    }

    pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
        self.expires_in = expires_in;
        self
    }

    pub fn with_encryption(mut self, encrypt: bool) -> Self {
        self.encrypt = encrypt;
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Whether this request produces a signed token.
    pub fn is_signed(&self) -> bool {
        self.encrypt || !self.expires_in.is_zero()
    }

    fn validate(&self) -> Result<()> {
        if self.link.is_empty() || self.link.contains(is_line_break) {
            return Err(Error::InvalidInput("Invalid proxy link target".to_string()));
        }
        if self.user.is_empty() || self.user.contains(':') {
            return Err(Error::InvalidInput("Invalid proxy link user".to_string()));
        }
        for (name, value) in &self.headers {
            let bad_name =
                name.is_empty() || name.contains(|c: char| c == ':' || is_line_break(c));
            if bad_name || value.contains(is_line_break) {
                return Err(Error::InvalidInput(format!("Invalid proxy header: {}", name)));
            }
        }
        Ok(())
    }
}

fn is_line_break(c: char) -> bool {
    c == '\n' || c == '\r'
}

/// A redeemed proxy link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProxyLink {
    pub link: String,
    pub headers: BTreeMap<String, String>,
    pub tunnel: Option<TunnelType>,
    /// Authenticated user the link was issued for.
    pub user: String,
}

#[derive(Serialize, Deserialize)]
struct UnsignedPayload {
    u: String,
    v: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    reqh: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tunt: Option<TunnelType>,
}

#[derive(Serialize, Deserialize)]
struct TokenData {
    enc_link: String,
    enc_format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tunt: Option<TunnelType>,
}

#[derive(Serialize, Deserialize)]
struct Claims {
    iss: String,
    sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<u64>,
    data: TokenData,
}

/// Only the subject, read before the signature is checked.
#[derive(Deserialize)]
struct Subject {
    sub: String,
}

/// Build the token part of a proxy link.
pub fn create_proxy_token(request: &ProxyLinkRequest) -> Result<String> {
    request.validate()?;

    if !request.is_signed() {
        let payload = UnsignedPayload {
            u: format!("{}:{}", request.user, request.password),
            v: request.link.clone(),
            reqh: request.headers.clone(),
            tunt: request.tunnel,
        };
        let blob = serde_json::to_vec(&payload)?;
        return Ok(format!("{}{}", UNSIGNED_PREFIX, base64_encode(blob)));
    }

    let mut blob = request.link.clone();
    for (name, value) in &request.headers {
        blob.push('\n');
        blob.push_str(name);
        blob.push_str(HEADER_SEPARATOR);
        blob.push_str(value);
    }

    let (enc_link, enc_format) = if request.encrypt {
        (seal_string(&request.password, &blob)?, ENCRYPTION_FORMAT)
    } else {
        (base64_encode(&blob), BASE64_FORMAT)
    };

    let claims = Claims {
        iss: ISSUER.to_string(),
        sub: request.user.clone(),
        exp: (!request.expires_in.is_zero())
            .then(|| get_current_timestamp() + request.expires_in.as_secs().max(1)),
        data: TokenData {
            enc_link,
            enc_format: enc_format.to_string(),
            tunt: request.tunnel,
        },
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(request.password.as_bytes()),
    )
    .map_err(|e| Error::Crypto(format!("Failed to sign proxy token: {}", e)))
}

/// Build a complete proxy link under `base_url`.
pub fn create_proxy_link(base_url: &str, request: &ProxyLinkRequest) -> Result<String> {
    let token = create_proxy_token(request)?;
    let mut link = format!("{}{}/{}", base_url.trim_end_matches('/'), PROXY_PATH, token);

    let filename = request
        .filename
        .clone()
        .filter(|f| !f.is_empty())
        .or_else(|| filename_from_link(&request.link));
    if let Some(filename) = filename {
        link.push('/');
        link.extend(utf8_percent_encode(&filename, PATH_SEGMENT));
    }

    Ok(link)
}

/// Last non-empty path segment of `link`, percent-decoded.
pub fn filename_from_link(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    let segment = url.path_segments()?.rev().find(|s| !s.is_empty())?;
    let decoded = percent_decode_str(segment).decode_utf8().ok()?;
    Some(decoded.into_owned())
}

/// Redeem a token.
///
/// Unsigned tokens are accepted only when their embedded credential matches
/// `auth`. Signed tokens are verified with the secret of their subject.
///
/// # Errors
/// - `InvalidLink` if the token is malformed
/// - `Unauthorized` for bad credentials, bad signatures, expired tokens and
///   unknown subjects
/// - `Crypto` if an encrypted link fails to decrypt
pub fn resolve_proxy_token(token: &str, auth: &ProxyAuth) -> Result<ResolvedProxyLink> {
    match token.strip_prefix(UNSIGNED_PREFIX) {
        Some(encoded) => resolve_unsigned(encoded, auth),
        None => resolve_signed(token, auth),
    }
}

fn resolve_unsigned(encoded: &str, auth: &ProxyAuth) -> Result<ResolvedProxyLink> {
    let blob = base64_decode(encoded)
        .map_err(|_| Error::InvalidLink("malformed proxy token".to_string()))?;
    let payload: UnsignedPayload = serde_json::from_slice(&blob)
        .map_err(|_| Error::InvalidLink("malformed proxy token".to_string()))?;

    let (user, password) = payload
        .u
        .split_once(':')
        .ok_or_else(|| Error::InvalidLink("proxy token has no credential".to_string()))?;

    if !auth.verify(user, password) {
        debug!(user, "rejected unsigned proxy token");
        return Err(Error::Unauthorized("invalid proxy credential".to_string()));
    }

    Ok(ResolvedProxyLink {
        link: payload.v,
        headers: payload.reqh,
        tunnel: payload.tunt,
        user: user.to_string(),
    })
}

/// Read `sub` from an unverified JWT payload.
fn peek_subject(token: &str) -> Result<String> {
    let malformed = || Error::InvalidLink("malformed proxy token".to_string());

    let mut parts = token.split('.');
    let (Some(_), Some(payload), Some(_), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(malformed());
    };

    let json = base64_decode(payload).map_err(|_| malformed())?;
    let subject: Subject = serde_json::from_slice(&json).map_err(|_| malformed())?;
    Ok(subject.sub)
}

fn resolve_signed(token: &str, auth: &ProxyAuth) -> Result<ResolvedProxyLink> {
    let user = peek_subject(token)?;
    let secret = auth
        .password(&user)
        .ok_or_else(|| Error::Unauthorized(format!("unknown proxy user: {}", user)))?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_issuer(&[ISSUER]);
    validation.set_required_spec_claims(&["iss", "sub"]);

    let claims = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|e| {
            debug!(user = %user, error = %e, "rejected signed proxy token");
            Error::Unauthorized(format!("invalid proxy token: {}", e))
        })?
        .claims;

    // `exp` is whole seconds; a token is dead from the second it names.
    if claims.exp.is_some_and(|exp| exp <= get_current_timestamp()) {
        debug!(user = %user, "rejected expired proxy token");
        return Err(Error::Unauthorized("proxy token expired".to_string()));
    }

    let blob = match claims.data.enc_format.as_str() {
        ENCRYPTION_FORMAT => open_string(secret, &claims.data.enc_link)?,
        BASE64_FORMAT => base64_decode_string(&claims.data.enc_link)
            .map_err(|_| Error::InvalidLink("malformed proxy link blob".to_string()))?,
        other => {
            return Err(Error::InvalidLink(format!(
                "unsupported proxy link format: {}",
                other
            )))
        }
    };

    let mut lines = blob.split('\n');
    let link = lines.next().unwrap_or_default().to_string();
    let mut headers = BTreeMap::new();
    for line in lines {
        let (name, value) = line
            .split_once(HEADER_SEPARATOR)
            .ok_or_else(|| Error::InvalidLink("malformed proxy link header".to_string()))?;
        headers.insert(name.to_string(), value.to_string());
    }

    if link.is_empty() {
        return Err(Error::InvalidLink("proxy token has no link".to_string()));
    }

    Ok(ResolvedProxyLink {
        link,
        headers,
        tunnel: claims.data.tunt,
        user,
    })
}
