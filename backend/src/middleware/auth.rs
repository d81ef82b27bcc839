//! Authentication middleware
//!
//! JWT bearer authentication and role-tier access control. The decoded token
//! becomes an explicit [`Actor`] that handlers pass into every service call.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use shared::{Actor, AppRole};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::AppState;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Missing means Viewer
    #[serde(default)]
    pub role: Option<AppRole>,
    /// Partner store for Viewer accounts
    #[serde(default)]
    pub store_id: Option<Uuid>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    fn into_actor(self) -> Actor {
        let name = self.name.unwrap_or_else(|| self.sub.clone());
        let actor = Actor::new(self.sub, name, self.role.unwrap_or_default());
        match self.store_id {
            Some(store_id) => actor.with_store(store_id),
            None => actor,
        }
    }
}

/// Sign a token for `actor` valid for `ttl`
pub fn issue_token(actor: &Actor, secret: &str, ttl: Duration) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: actor.user_id.clone(),
        name: Some(actor.name.clone()),
        role: Some(actor.role),
        store_id: actor.store_id,
        exp: (now + ttl).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
}

/// Decode and validate a bearer token
pub fn decode_token(token: &str, secret: &str) -> AppResult<Actor> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims.into_actor())
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
}

/// Authentication middleware that validates JWT tokens and stores the actor
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(&request) else {
        return AppError::Unauthorized("Missing or invalid Authorization header".to_string())
            .into_response();
    };

    let actor = match decode_token(token, &state.config.jwt.secret) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };

    request.extensions_mut().insert(actor);

    next.run(request).await
}

/// Guard for the external timer: the bearer must equal the configured cron secret
pub async fn cron_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let secret = &state.config.cron.secret;
    match bearer_token(&request) {
        Some(token) if !secret.is_empty() && token == secret => next.run(request).await,
        _ => AppError::Unauthorized("Invalid cron secret".to_string()).into_response(),
    }
}

/// Extractor for the authenticated actor
#[derive(Clone, Debug)]
pub struct CurrentUser(pub Actor);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

/// Role guard used by every service before it touches the store
pub fn require_role(actor: &Actor, required: AppRole, action: &str) -> AppResult<()> {
    if actor.has_role(required) {
        Ok(())
    } else {
        Err(AppError::InsufficientPermissions(format!(
            "{} requires {} role",
            action, required
        )))
    }
}

/// Store guard for store-scoped reads
pub fn require_store_access(actor: &Actor, store_id: Uuid) -> AppResult<()> {
    if actor.can_view_store(store_id) {
        Ok(())
    } else {
        Err(AppError::InsufficientPermissions(
            "This account can only view its own store".to_string(),
        ))
    }
}

/// Narrow a store filter to what the actor may see.
///
/// Staff keep the requested filter. A Viewer always gets its own store and
/// is refused when it asks for another one or has none assigned.
pub fn scope_store_filter(actor: &Actor, requested: Option<Uuid>) -> AppResult<Option<Uuid>> {
    if actor.has_role(AppRole::Staff) {
        return Ok(requested);
    }
    match (actor.store_id, requested) {
        (None, _) => Err(AppError::InsufficientPermissions(
            "No store is assigned to this account".to_string(),
        )),
        (Some(own), Some(asked)) if asked != own => Err(AppError::InsufficientPermissions(
            "This account can only view its own store".to_string(),
        )),
        (Some(own), _) => Ok(Some(own)),
    }
}
