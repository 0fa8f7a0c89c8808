// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request authentication.
//!
//! Two methods, checked in order:
//! 1. HTTP basic `admin:<password>` for the operator account.
//! 2. Bearer token: `<b64url(claims)>.<b64url(hmac-sha256(claims, site secret))>`,
//!    the format minted by the external authenticator.
//!
//! The middleware never rejects by itself; it resolves the caller into an
//! [`AuthInfo`] extension and leaves authorization to the handlers.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;

use parlor_core::User;

use crate::error::ApiError;
use crate::server::AppState;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct AuthConfig {
    /// Password for HTTP basic `admin:<password>`. `None` disables basic auth.
    pub admin_passwd: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("admin_passwd", &self.admin_passwd.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// Signed token payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user: User,
    pub site: String,
    /// Unix expiry, seconds.
    pub exp: i64,
}

/// Resolved caller, inserted into request extensions by [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct AuthInfo(pub Option<User>);

impl AuthInfo {
    pub fn role(&self) -> &'static str {
        match &self.0 {
            Some(u) if u.admin => "admin",
            Some(_) => "user",
            None => "anon",
        }
    }

    pub fn require_user(&self) -> Result<&User, ApiError> {
        self.0
            .as_ref()
            .ok_or_else(|| ApiError::unauthorized("authentication required"))
    }

    pub fn require_admin(&self) -> Result<&User, ApiError> {
        let user = self.require_user()?;
        if !user.admin {
            return Err(ApiError::forbidden("admin access required"));
        }
        Ok(user)
    }
}

/// Mint a bearer token for `claims` with the site secret. Used by tests and
/// token tooling; the server only verifies.
pub fn sign_claims(secret: &str, claims: &Claims) -> Result<String, ApiError> {
    let payload = serde_json::to_vec(claims)
        .map_err(|e| ApiError::bad_request("claims serialization", e.to_string()))?;
    let encoded = URL_SAFE_NO_PAD.encode(payload);
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ApiError::bad_request("hmac init", e.to_string()))?;
    mac.update(encoded.as_bytes());
    let sig = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    Ok(format!("{encoded}.{sig}"))
}

fn verify_token(secret: &str, token: &str) -> Option<Claims> {
    let (payload, sig) = token.split_once('.')?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(payload.as_bytes());
    let sig_bytes = URL_SAFE_NO_PAD.decode(sig).ok()?;
    mac.verify_slice(&sig_bytes).ok()?;

    let claims: Claims = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).ok()?).ok()?;
    if claims.exp < Utc::now().timestamp() {
        debug!(user = %claims.user.id, "bearer token expired");
        return None;
    }
    Some(claims)
}

fn site_from_query(query: Option<&str>) -> Option<String> {
    let query = query?;
    query.split('&').find_map(|pair| {
        pair.strip_prefix("site=")
            .map(|v| v.split('#').next().unwrap_or(v).to_string())
    })
}

fn basic_admin(auth_header: &str, expected: &str) -> bool {
    let Some(encoded) = auth_header.strip_prefix("Basic ") else {
        return false;
    };
    let Ok(decoded) = base64::engine::general_purpose::STANDARD.decode(encoded) else {
        return false;
    };
    match String::from_utf8(decoded) {
        Ok(creds) => creds == format!("admin:{expected}"),
        Err(_) => false,
    }
}

/// Resolve the caller and stash it in request extensions. A bad or expired
/// token degrades to anonymous rather than failing the request.
pub async fn auth_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let header = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let mut resolved: Option<User> = None;

    if let Some(header) = header.as_deref() {
        if let Some(passwd) = &state.auth.admin_passwd {
            if basic_admin(header, passwd) {
                resolved = Some(User {
                    id: "admin".into(),
                    name: "admin".into(),
                    admin: true,
                    ..User::default()
                });
            }
        }

        if resolved.is_none() {
            if let Some(token) = header.strip_prefix("Bearer ") {
                let site = site_from_query(request.uri().query()).unwrap_or_default();
                if let Ok(secret) = state.svc.admin_store().key(&site).await {
                    if let Some(claims) = verify_token(&secret, token) {
                        if claims.site == site {
                            resolved = Some(claims.user);
                        } else {
                            debug!(token_site = %claims.site, request_site = %site, "token site mismatch");
                        }
                    }
                }
            }
        }
    }

    request.extensions_mut().insert(AuthInfo(resolved));
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(site: &str, exp_offset: i64) -> Claims {
        Claims {
            user: User {
                id: "u-1".into(),
                name: "user one".into(),
                ..User::default()
            },
            site: site.into(),
            exp: Utc::now().timestamp() + exp_offset,
        }
    }

    #[test]
    fn token_round_trip() {
        let token = sign_claims("s3cret", &claims("site-1", 300)).unwrap();
        let verified = verify_token("s3cret", &token).unwrap();
        assert_eq!(verified.user.id, "u-1");
        assert_eq!(verified.site, "site-1");
    }

    #[test]
    fn wrong_secret_rejected() {
        let token = sign_claims("s3cret", &claims("site-1", 300)).unwrap();
        assert!(verify_token("other", &token).is_none());
    }

    #[test]
    fn expired_token_rejected() {
        let token = sign_claims("s3cret", &claims("site-1", -10)).unwrap();
        assert!(verify_token("s3cret", &token).is_none());
    }

    #[test]
    fn tampered_payload_rejected() {
        let token = sign_claims("s3cret", &claims("site-1", 300)).unwrap();
        let (_, sig) = token.split_once('.').unwrap();
        let forged = Claims {
            user: User {
                id: "u-1".into(),
                admin: true,
                ..User::default()
            },
            site: "site-1".into(),
            exp: Utc::now().timestamp() + 300,
        };
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        assert!(verify_token("s3cret", &format!("{payload}.{sig}")).is_none());
    }

    #[test]
    fn basic_header_check() {
        let encoded = base64::engine::general_purpose::STANDARD.encode("admin:hunter2");
        assert!(basic_admin(&format!("Basic {encoded}"), "hunter2"));
        assert!(!basic_admin(&format!("Basic {encoded}"), "other"));
        assert!(!basic_admin("Bearer xyz", "hunter2"));
    }

    #[test]
    fn site_query_extraction() {
        assert_eq!(
            site_from_query(Some("url=https://x&site=site-1&sort=-time")).as_deref(),
            Some("site-1")
        );
        assert!(site_from_query(Some("url=https://x")).is_none());
        assert!(site_from_query(None).is_none());
    }
}
