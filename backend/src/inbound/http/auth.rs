//! Bearer credential verification.
//!
//! Tokens are HS256 JWTs carrying `sub` (the user id), `exp`, `iat`, an
//! optional `iss`/`aud` pair, and a `roles` array. Issuer and audience are
//! checked only when configured.

use std::future::{Ready, ready};
use std::sync::Arc;
use std::time::Duration;

use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{FromRequest, HttpMessage, HttpRequest, web};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use crate::domain::{AuthenticatedUser, Error, UserId};

use super::state::HttpState;

/// Default lifetime of issued tokens.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

const BEARER_PREFIX: &str = "bearer ";

/// Verification parameters for bearer tokens.
#[derive(Clone)]
pub struct AuthConfig {
    secret: Zeroizing<String>,
    issuer: Option<String>,
    audience: Option<String>,
    expiration: Duration,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("expiration", &self.expiration)
            .finish()
    }
}

impl AuthConfig {
    /// Config with the given HS256 secret and no issuer or audience checks.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Zeroizing::new(secret.into()),
            issuer: None,
            audience: None,
            expiration: DEFAULT_TOKEN_LIFETIME,
        }
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: Option<String>) -> Self {
        self.issuer = issuer;
        self
    }

    #[must_use]
    pub fn with_audience(mut self, audience: Option<String>) -> Self {
        self.audience = audience;
        self
    }

    #[must_use]
    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = expiration;
        self
    }

    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    #[must_use]
    pub fn audience(&self) -> Option<&str> {
        self.audience.as_deref()
    }

    /// Lifetime of tokens issued with this config.
    #[must_use]
    pub fn expiration(&self) -> Duration {
        self.expiration
    }
}

/// Registered and private claims carried by a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Issues and verifies bearer tokens.
pub struct JwtAuthenticator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: Option<String>,
    audience: Option<String>,
    lifetime: i64,
    clock: Arc<dyn Clock>,
}

impl JwtAuthenticator {
    /// Build an authenticator from its configuration.
    pub fn new(config: &AuthConfig, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            lifetime: i64::try_from(config.expiration.as_secs()).unwrap_or(i64::MAX),
            clock,
        }
    }

    /// Sign a token for `user_id` with the configured lifetime.
    pub fn issue(&self, user_id: &UserId, roles: &[&str]) -> Result<String, Error> {
        let iat = self.clock.utc().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: iat.saturating_add(self.lifetime),
            iat,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            roles: roles.iter().map(|role| (*role).to_owned()).collect(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| Error::internal(format!("failed to sign token: {err}")))
    }

    /// Verify `token` and resolve the caller it names.
    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser, Error> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|err| {
            debug!(error = %err, "bearer token rejected");
            match err.kind() {
                ErrorKind::ExpiredSignature => Error::unauthorized("token expired"),
                _ => Error::unauthorized("invalid token"),
            }
        })?;
        let user_id = UserId::new(&data.claims.sub)
            .map_err(|_| Error::unauthorized("token subject is not a user id"))?;
        Ok(AuthenticatedUser::new(user_id, data.claims.roles))
    }
}

fn bearer_token(req: &HttpRequest) -> Result<&str, Error> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| Error::unauthorized("missing bearer token"))?;
    let value = header
        .to_str()
        .map_err(|_| Error::unauthorized("malformed authorization header"))?;
    let prefix = value.get(..BEARER_PREFIX.len());
    if !prefix.is_some_and(|prefix| prefix.eq_ignore_ascii_case(BEARER_PREFIX)) {
        return Err(Error::unauthorized("authorization scheme must be Bearer"));
    }
    let token = value.get(BEARER_PREFIX.len()..).unwrap_or_default().trim();
    if token.is_empty() {
        return Err(Error::unauthorized("missing bearer token"));
    }
    Ok(token)
}

/// Resolve the caller for `req`.
///
/// An identity already placed in the request extensions (by the credit guard)
/// is reused; otherwise the bearer token is verified.
pub fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, Error> {
    if let Some(user) = req.extensions().get::<AuthenticatedUser>() {
        return Ok(user.clone());
    }
    let state = req
        .app_data::<web::Data<HttpState>>()
        .ok_or_else(|| Error::internal("HTTP state is not configured"))?;
    let user = state.auth.verify(bearer_token(req)?)?;
    req.extensions_mut().insert(user.clone());
    Ok(user)
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use chrono::{TimeZone, Utc};
    use mockable::{DefaultClock, MockClock};
    use rstest::{fixture, rstest};

    use crate::domain::ErrorCode;

    const SECRET: &str = "test-secret-of-reasonable-length";

    #[fixture]
    fn authenticator() -> JwtAuthenticator {
        JwtAuthenticator::new(&AuthConfig::new(SECRET), Arc::new(DefaultClock))
    }

    fn stale_clock() -> Arc<dyn Clock> {
        let mut clock = MockClock::new();
        clock
            .expect_utc()
            .returning(|| Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).single().expect("valid"));
        Arc::new(clock)
    }

    #[rstest]
    fn issued_tokens_verify_with_roles(authenticator: JwtAuthenticator) {
        let user_id = UserId::random();
        let token = authenticator.issue(&user_id, &["admin"]).expect("sign");
        let user = authenticator.verify(&token).expect("verify");
        assert_eq!(user.id(), user_id);
        assert!(user.is_admin());
    }

    #[rstest]
    fn expired_tokens_are_rejected(authenticator: JwtAuthenticator) {
        let stale = JwtAuthenticator::new(&AuthConfig::new(SECRET), stale_clock());
        let token = stale.issue(&UserId::random(), &[]).expect("sign");
        let error = authenticator.verify(&token).expect_err("expired");
        assert_eq!(error.code(), ErrorCode::Unauthorized);
        assert_eq!(error.message(), "token expired");
    }

    #[rstest]
    fn foreign_secrets_are_rejected(authenticator: JwtAuthenticator) {
        let other = JwtAuthenticator::new(&AuthConfig::new("another-secret"), Arc::new(DefaultClock));
        let token = other.issue(&UserId::random(), &[]).expect("sign");
        assert!(authenticator.verify(&token).is_err());
    }

    #[rstest]
    fn configured_issuer_must_match() {
        let strict = JwtAuthenticator::new(
            &AuthConfig::new(SECRET).with_issuer(Some("pantry".to_owned())),
            Arc::new(DefaultClock),
        );
        let other = JwtAuthenticator::new(
            &AuthConfig::new(SECRET).with_issuer(Some("elsewhere".to_owned())),
            Arc::new(DefaultClock),
        );
        let token = other.issue(&UserId::random(), &[]).expect("sign");
        assert!(strict.verify(&token).is_err());
        let token = strict.issue(&UserId::random(), &[]).expect("sign");
        assert!(strict.verify(&token).is_ok());
    }

    #[rstest]
    fn audience_is_ignored_unless_configured(authenticator: JwtAuthenticator) {
        let with_aud = JwtAuthenticator::new(
            &AuthConfig::new(SECRET).with_audience(Some("mobile".to_owned())),
            Arc::new(DefaultClock),
        );
        let token = with_aud.issue(&UserId::random(), &[]).expect("sign");
        assert!(authenticator.verify(&token).is_ok());
        assert!(with_aud.verify(&token).is_ok());
    }

    #[rstest]
    #[case(None)]
    #[case(Some("Basic dXNlcjpwYXNz"))]
    #[case(Some("Bearer "))]
    fn unusable_headers_are_unauthorised(#[case] header: Option<&str>) {
        let mut request = TestRequest::default();
        if let Some(value) = header {
            request = request.insert_header((AUTHORIZATION, value));
        }
        let error = bearer_token(&request.to_http_request()).expect_err("rejected");
        assert_eq!(error.code(), ErrorCode::Unauthorized);
    }

    #[rstest]
    fn scheme_is_case_insensitive() {
        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "bearer abc.def.ghi"))
            .to_http_request();
        assert_eq!(bearer_token(&req).expect("token"), "abc.def.ghi");
    }
}
