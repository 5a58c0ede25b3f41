//! Bearer-token authentication.
//!
//! Users sign in with the external identity service, which issues HS256 JWTs. Handlers that need a user take an
//! [`AuthenticatedUser`] argument; the extractor reads the `Authorization: Bearer` header and hands the token to
//! whichever [`Authenticator`] was registered as app data.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header::AUTHORIZATION, web, FromRequest, HttpRequest};
use borongan_engine::{db_types::UserId, payment_objects::Payer};
use jwt_compact::{
    alg::{Hs256, Hs256Key},
    AlgorithmExt,
    TimeOptions,
    UntrustedToken,
};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// The custom claims carried by identity-service access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub aud: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

impl AuthenticatedUser {
    pub fn user_id(&self) -> UserId {
        UserId::from(self.user_id.as_str())
    }

    pub fn payer(&self) -> Payer {
        Payer {
            user_id: self.user_id.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            phone: self.phone.clone(),
        }
    }
}

pub trait Authenticator: Send + Sync {
    fn authenticate(&self, bearer_token: &str) -> Result<AuthenticatedUser, AuthError>;
}

pub struct JwtAuthenticator {
    key: Option<Hs256Key>,
    audience: Option<String>,
}

impl JwtAuthenticator {
    pub fn new(config: &AuthConfig) -> Self {
        let key = (!config.jwt_secret.is_empty()).then(|| Hs256Key::new(config.jwt_secret.reveal().as_bytes()));
        Self { key, audience: config.audience.clone() }
    }
}

impl Authenticator for JwtAuthenticator {
    fn authenticate(&self, bearer_token: &str) -> Result<AuthenticatedUser, AuthError> {
        let key = self.key.as_ref().ok_or(AuthError::NotConfigured)?;
        let untrusted =
            UntrustedToken::new(bearer_token).map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
        let token = Hs256
            .validator::<JwtClaims>(key)
            .validate(&untrusted)
            .map_err(|e| AuthError::ValidationError(e.to_string()))?;
        let claims = token.claims();
        claims
            .validate_expiration(&TimeOptions::default())
            .map_err(|e| AuthError::ValidationError(e.to_string()))?;
        let custom = &claims.custom;
        if let Some(expected) = &self.audience {
            if custom.aud.as_deref() != Some(expected.as_str()) {
                return Err(AuthError::ValidationError("Token was issued for a different audience.".into()));
            }
        }
        let email = custom
            .email
            .clone()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| AuthError::ValidationError("Token carries no email address.".into()))?;
        trace!("💻️ Authenticated user {}", custom.sub);
        Ok(AuthenticatedUser {
            user_id: custom.sub.clone(),
            email,
            full_name: custom.user_metadata.full_name.clone(),
            phone: custom.user_metadata.phone.clone(),
        })
    }
}

fn bearer_token(req: &HttpRequest) -> Result<&str, AuthError> {
    let value = req.headers().get(AUTHORIZATION).ok_or(AuthError::MissingToken)?;
    let value = value.to_str().map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)?;
    Ok(token)
}

fn authenticate_request(req: &HttpRequest) -> Result<AuthenticatedUser, ServerError> {
    let authenticator = req.app_data::<web::Data<dyn Authenticator>>().ok_or_else(|| {
        error!("💻️ No authenticator has been registered with the app");
        AuthError::NotConfigured
    })?;
    let token = bearer_token(req)?;
    let user = authenticator.authenticate(token).map_err(|e| {
        debug!("💻️ Rejected bearer token. {e}");
        e
    })?;
    Ok(user)
}

impl FromRequest for AuthenticatedUser {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate_request(req))
    }
}
