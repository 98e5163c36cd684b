use std::time::Duration;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{config::JwtConfig, error::ApiError, state::AppState};

/// Token type used to distinguish access and refresh JWTs.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT payload. The `jti` identifier is what the revocation set keys on.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub jti: Uuid,
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
    pub aud: String,
    pub kind: TokenKind,
}

/// JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            issuer,
            audience,
            access_ttl_minutes,
            refresh_ttl_minutes,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            access_ttl: Duration::from_secs((access_ttl_minutes as u64) * 60),
            refresh_ttl: Duration::from_secs((refresh_ttl_minutes as u64) * 60),
        }
    }
}

impl JwtKeys {
    fn sign_with_kind(&self, user_id: Uuid, kind: TokenKind) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            jti: Uuid::new_v4(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, TokenKind::Access)
    }
    pub fn sign_refresh(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, TokenKind::Refresh)
    }

    /// Validate signature, expiry, issuer and audience. Expiry failures are
    /// distinguished from malformed/bad-signature tokens so the API boundary
    /// can map them to different status codes.
    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => {
                debug!(user_id = %data.claims.sub, kind = ?data.claims.kind, "jwt verified");
                Ok(data.claims)
            }
            Err(e) => match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    Err(ApiError::auth("Token has expired"))
                }
                _ => {
                    warn!(error = %e, "jwt rejected");
                    Err(ApiError::invalid_token("Invalid token"))
                }
            },
        }
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Authorization token is missing"))?;
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .ok_or_else(|| ApiError::unauthorized("Authorization token is missing"))
}

fn verify_bearer(parts: &Parts, state: &AppState, kind: TokenKind) -> Result<Claims, ApiError> {
    let keys = JwtKeys::from_ref(state);
    let token = bearer_token(parts)?;
    let claims = keys.verify(token)?;
    if claims.kind != kind {
        return Err(ApiError::invalid_token("Wrong token type"));
    }
    if state.revoked.is_revoked(&claims.jti) {
        return Err(ApiError::auth("Token has been revoked"));
    }
    Ok(claims)
}

/// Validated access-token claims, for handlers that need the `jti`.
pub struct AccessClaims(pub Claims);

/// Validated refresh-token claims.
#[derive(Debug)]
pub struct RefreshClaims(pub Claims);

/// The authenticated caller's user id, extracted from a bearer access token.
#[derive(Debug)]
pub struct AuthUser(pub Uuid);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AccessClaims
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        verify_bearer(parts, &state, TokenKind::Access).map(AccessClaims)
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for RefreshClaims
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        verify_bearer(parts, &state, TokenKind::Refresh).map(RefreshClaims)
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        verify_bearer(parts, &state, TokenKind::Access).map(|claims| AuthUser(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn make_keys(state: &AppState) -> JwtKeys {
        JwtKeys::from_ref(state)
    }

    fn parts_with_bearer(token: &str) -> Parts {
        let req = axum::http::Request::builder()
            .uri("/")
            .header(
                axum::http::header::AUTHORIZATION,
                format!("Bearer {token}"),
            )
            .body(())
            .unwrap();
        req.into_parts().0
    }

    #[tokio::test]
    async fn sign_and_verify_access_token() {
        let state = AppState::fake();
        let keys = make_keys(&state);
        let user_id = Uuid::new_v4();
        let token = keys.sign_access(user_id).expect("sign access");
        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.kind, TokenKind::Access);
    }

    #[tokio::test]
    async fn tokens_carry_unique_identifiers() {
        let state = AppState::fake();
        let keys = make_keys(&state);
        let user_id = Uuid::new_v4();
        let a = keys.verify(&keys.sign_access(user_id).unwrap()).unwrap();
        let b = keys.verify(&keys.sign_access(user_id).unwrap()).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[tokio::test]
    async fn expired_token_maps_to_unauthorized() {
        let state = AppState::fake();
        let keys = make_keys(&state);
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            jti: Uuid::new_v4(),
            iat: (now - 7200) as usize,
            exp: (now - 3600) as usize,
            iss: "test-issuer".into(),
            aud: "test-aud".into(),
            kind: TokenKind::Access,
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).unwrap();
        let err = keys.verify(&token).unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbage_token_maps_to_unprocessable() {
        let state = AppState::fake();
        let keys = make_keys(&state);
        let err = keys.verify("not.a.jwt").unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let state = AppState::fake();
        let req = axum::http::Request::builder().uri("/").body(()).unwrap();
        let mut parts = req.into_parts().0;
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_extractor_rejects_access_token() {
        let state = AppState::fake();
        let keys = make_keys(&state);
        let token = keys.sign_access(Uuid::new_v4()).unwrap();
        let mut parts = parts_with_bearer(&token);
        let err = RefreshClaims::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn refresh_extractor_accepts_refresh_token() {
        let state = AppState::fake();
        let keys = make_keys(&state);
        let user_id = Uuid::new_v4();
        let token = keys.sign_refresh(user_id).unwrap();
        let mut parts = parts_with_bearer(&token);
        let RefreshClaims(claims) = RefreshClaims::from_request_parts(&mut parts, &state)
            .await
            .expect("refresh token accepted");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.kind, TokenKind::Refresh);
    }

    #[tokio::test]
    async fn revoked_token_is_rejected_until_then_valid() {
        let state = AppState::fake();
        let keys = make_keys(&state);
        let user_id = Uuid::new_v4();
        let token = keys.sign_access(user_id).unwrap();
        let claims = keys.verify(&token).unwrap();

        let mut parts = parts_with_bearer(&token);
        assert!(AuthUser::from_request_parts(&mut parts, &state).await.is_ok());

        state.revoked.revoke(claims.jti);
        let mut parts = parts_with_bearer(&token);
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        // a fresh token for the same user still validates
        let other = keys.sign_access(user_id).unwrap();
        let mut parts = parts_with_bearer(&other);
        assert!(AuthUser::from_request_parts(&mut parts, &state).await.is_ok());
    }
}
