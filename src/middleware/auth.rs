use crate::core::AppError;
use actix_web::{
    body::{BoxBody, EitherBody},
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    Error, FromRequest, HttpMessage, HttpRequest, ResponseError,
};
use futures_util::future::LocalBoxFuture;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;

/// Paths reachable without a bearer token
const PUBLIC_PATHS: &[&str] = &[
    "/health",
    "/ready",
    "/api/topup/callback",
    "/api/premium/momo-callback",
    "/api/premium/plans",
];

/// Claims issued by the external auth service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or(self.sub.as_deref())
            .filter(|id| !id.trim().is_empty())
    }
}

/// Caller identity inserted by `JwtAuth`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthenticatedUser>()
                .cloned()
                .ok_or_else(|| AppError::unauthorized("User is not authenticated")),
        )
    }
}

/// Verify a bearer token and extract the user id
pub fn verify_token(token: &str, secret: &str) -> crate::core::Result<AuthenticatedUser> {
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AppError::unauthorized("Token expired"),
            _ => AppError::unauthorized("Invalid token"),
        })?;

    let user_id = data
        .claims
        .user_id()
        .ok_or_else(|| AppError::unauthorized("Token carries no user id"))?;

    Ok(AuthenticatedUser {
        user_id: user_id.to_string(),
    })
}

/// Bearer token authentication middleware
pub struct JwtAuth {
    secret: Arc<String>,
}

impl JwtAuth {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Arc::new(secret.into()),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<BoxBody, B>>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtAuthMiddleware<S>;
    type Future = Ready<std::result::Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddleware {
            service: Rc::new(service),
            secret: self.secret.clone(),
        }))
    }
}

pub struct JwtAuthMiddleware<S> {
    service: Rc<S>,
    secret: Arc<String>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<BoxBody, B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = self.service.clone();
        let secret = self.secret.clone();

        Box::pin(async move {
            if PUBLIC_PATHS.contains(&req.path()) {
                return svc.call(req).await.map(|res| res.map_into_right_body());
            }

            let token = req
                .headers()
                .get("Authorization")
                .and_then(|h| h.to_str().ok())
                .and_then(|h| h.strip_prefix("Bearer "))
                .map(str::trim);

            let verified = match token {
                Some(token) => verify_token(token, &secret),
                None => Err(AppError::unauthorized("Missing bearer token")),
            };

            match verified {
                Ok(user) => {
                    req.extensions_mut().insert(user);
                    svc.call(req).await.map(|res| res.map_into_right_body())
                }
                Err(e) => Ok(req.into_response(e.error_response()).map_into_left_body()),
            }
        })
    }
}
