use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use diesel::r2d2::PoolError;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde_json::json;
use thiserror::Error;

use crate::auth::Capability;
use crate::enums::Role;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("not logged in")]
    Unauthenticated,
    #[error("invalid username or password")]
    BadCredentials,
    #[error("a {role} may not {capability}")]
    Forbidden { role: Role, capability: Capability },
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("database error: {0}")]
    Database(#[from] DieselError),
    #[error("connection pool error: {0}")]
    Pool(#[from] PoolError),
    #[error("blocking task failed: {0}")]
    Blocking(#[from] BlockingError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    /// Turns a unique-key violation into a `Conflict` carrying `message`,
    /// leaving every other error untouched.
    pub fn on_duplicate(err: DieselError, message: &str) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                ApiError::Conflict(message.to_owned())
            }
            other => ApiError::Database(other),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthenticated | ApiError::BadCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) | ApiError::Database(DieselError::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Database(_)
            | ApiError::Pool(_)
            | ApiError::Blocking(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        HttpResponse::build(status).json(json!({
            "success": false,
            "message": self.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(ApiError::validation("Please select a patient.").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::NotFound("visit").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Database(DieselError::NotFound).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Forbidden { role: Role::Lab, capability: Capability::RecordVisits }.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::Database(DieselError::RollbackTransaction).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn non_unique_errors_pass_through_on_duplicate() {
        let err = ApiError::on_duplicate(DieselError::NotFound, "Card number already exists.");
        assert!(matches!(err, ApiError::Database(DieselError::NotFound)));
    }

    #[test]
    fn forbidden_message_names_role_and_capability() {
        let err = ApiError::Forbidden { role: Role::Receptionist, capability: Capability::ViewDoctorQueue };
        assert_eq!(err.to_string(), "a receptionist may not view the doctor's queue");
    }

    #[actix_web::test]
    async fn body_carries_failure_flag_and_message() {
        let resp = ApiError::Conflict("Patient is already in the doctor's queue.".into()).error_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["message"], "Patient is already in the doctor's queue.");
    }
}
