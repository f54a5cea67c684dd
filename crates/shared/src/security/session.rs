use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::ErrorUnauthorized,
    http::header::AUTHORIZATION,
    Error, FromRequest, HttpMessage, HttpRequest,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use futures_util::future::{ready, LocalBoxFuture, Ready};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// The authenticated user behind a request, as asserted by the login service
/// that issued the session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserInfo {
    pub tname: String,
    pub email: String,
}

#[derive(Serialize, Deserialize)]
struct SessionClaims {
    tname: String,
    email: String,
    exp: i64,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SessionError {
    Malformed,
    BadSignature,
    Expired,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Malformed => write!(f, "malformed session token"),
            SessionError::BadSignature => write!(f, "session token signature mismatch"),
            SessionError::Expired => write!(f, "session token expired"),
        }
    }
}

impl std::error::Error for SessionError {}

fn sign(secret: &str, payload: &[u8]) -> Vec<u8> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Issue a `payload.signature` token: base64url claims, hex HMAC-SHA256.
pub fn issue_token(secret: &str, user: &UserInfo, ttl_seconds: i64) -> String {
    let claims = SessionClaims {
        tname: user.tname.clone(),
        email: user.email.clone(),
        exp: Utc::now().timestamp() + ttl_seconds,
    };
    let payload =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).expect("claims serialize to JSON"));
    let signature = hex::encode(sign(secret, payload.as_bytes()));
    format!("{payload}.{signature}")
}

pub fn verify_token(secret: &str, token: &str) -> Result<UserInfo, SessionError> {
    let (payload, signature) = token.rsplit_once('.').ok_or(SessionError::Malformed)?;
    let provided = hex::decode(signature).map_err(|_| SessionError::Malformed)?;
    let expected = sign(secret, payload.as_bytes());
    if provided.len() != expected.len() || !bool::from(provided.ct_eq(&expected)) {
        return Err(SessionError::BadSignature);
    }

    let claims_bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| SessionError::Malformed)?;
    let claims: SessionClaims =
        serde_json::from_slice(&claims_bytes).map_err(|_| SessionError::Malformed)?;
    if claims.exp <= Utc::now().timestamp() {
        return Err(SessionError::Expired);
    }

    Ok(UserInfo {
        tname: claims.tname,
        email: claims.email,
    })
}

impl FromRequest for UserInfo {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<UserInfo>()
                .cloned()
                .ok_or_else(|| ErrorUnauthorized("No authenticated session")),
        )
    }
}

/// Actix middleware: every request must carry `Authorization: Bearer <token>`
/// with a token signed by the portal's session secret. The verified identity
/// is stashed in request extensions for the `UserInfo` extractor.
pub struct SessionAuth {
    secret: String,
}

impl SessionAuth {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = SessionAuthService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionAuthService {
            service,
            secret: self.secret.clone(),
        }))
    }
}

pub struct SessionAuthService<S> {
    service: S,
    secret: String,
}

impl<S, B> Service<ServiceRequest> for SessionAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if let Some(auth_header) = req.headers().get(AUTHORIZATION) {
            if let Ok(auth_str) = auth_header.to_str() {
                if auth_str.len() > 7 {
                    let (scheme, token) = auth_str.split_at(7);
                    if scheme.eq_ignore_ascii_case("Bearer ") {
                        match verify_token(&self.secret, token) {
                            Ok(user) => {
                                req.extensions_mut().insert(user);
                                let fut = self.service.call(req);
                                return Box::pin(async move {
                                    let res = fut.await?;
                                    Ok(res)
                                });
                            }
                            Err(e) => {
                                log::debug!("Rejecting session token: {e}");
                            }
                        }
                    }
                }
            }
        }

        Box::pin(async move { Err(ErrorUnauthorized("Missing or invalid session token")) })
    }
}
