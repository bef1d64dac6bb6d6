//! Authentication middleware
//!
//! JWT authentication and role checks

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use shared::UserRole;
use uuid::Uuid;

use crate::error::{AppError, ErrorDetail, ErrorResponse};
use crate::services::auth::{decode_access_token, Claims};
use crate::AppState;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl AuthUser {
    /// Reject unless the caller may post requirements
    pub fn require_vendor(&self) -> Result<(), AppError> {
        if self.role.can_post_requirements() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Only vendors can do this".to_string()))
        }
    }

    /// Reject unless the caller may submit proposals
    pub fn require_seller(&self) -> Result<(), AppError> {
        if self.role.can_submit_proposals() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Only suppliers and farmers can do this".to_string(),
            ))
        }
    }
}

impl TryFrom<Claims> for AuthUser {
    type Error = String;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| "Invalid user ID in token")?;
        let role = claims
            .role
            .parse::<UserRole>()
            .map_err(|_| "Invalid role in token")?;
        Ok(AuthUser { user_id, role })
    }
}

/// Authentication middleware that validates the bearer JWT and stores the
/// caller in the request extensions
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return unauthorized_response("Missing or invalid Authorization header");
    };

    let claims = match decode_access_token(bearer.token(), &state.config.jwt.secret) {
        Ok(claims) => claims,
        Err(msg) => return unauthorized_response(&msg),
    };

    let auth_user = match AuthUser::try_from(claims) {
        Ok(user) => user,
        Err(msg) => return unauthorized_response(&msg),
    };

    request.extensions_mut().insert(auth_user);

    next.run(request).await
}

/// Create unauthorized response
fn unauthorized_response(message: &str) -> Response {
    let error = ErrorResponse {
        error: ErrorDetail::new("UNAUTHORIZED", message),
    };

    (StatusCode::UNAUTHORIZED, Json(error)).into_response()
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                let error = ErrorResponse {
                    error: ErrorDetail::new("UNAUTHORIZED", "Authentication required"),
                };
                (StatusCode::UNAUTHORIZED, Json(error))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: &str, role: &str) -> Claims {
        Claims {
            sub: sub.to_string(),
            role: role.to_string(),
            exp: 0,
            iat: 0,
        }
    }

    #[test]
    fn claims_convert_to_auth_user() {
        let id = Uuid::new_v4();
        let user = AuthUser::try_from(claims(&id.to_string(), "supplier")).unwrap();
        assert_eq!(user.user_id, id);
        assert_eq!(user.role, UserRole::Supplier);
        assert!(user.require_seller().is_ok());
        assert!(user.require_vendor().is_err());
    }

    #[test]
    fn malformed_claims_are_rejected() {
        assert!(AuthUser::try_from(claims("not-a-uuid", "vendor")).is_err());
        assert!(AuthUser::try_from(claims(&Uuid::new_v4().to_string(), "admin")).is_err());
    }
}
