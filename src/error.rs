// src/error.rs
use actix_web::http::header;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

/// Where a request without an acceptable session is sent.
pub const LOGIN_PATH: &str = "/auth/login";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    /// Missing session or role mismatch. Rendered as a redirect to the login screen.
    #[error("{0}")]
    LoginRequired(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Validation Error: {0}")]
    ValidationError(String),
    #[error("Database Error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("Auth Error: {0}")]
    AuthError(String),
    #[error("Internal Server Error: {0}")]
    InternalServerError(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ApiError::DatabaseError(err) => {
                log::error!("Database error: {}", err);
                "Database error".to_string()
            }
            ApiError::InternalServerError(msg) => {
                log::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = ErrorResponse { success: false, message };

        match self {
            ApiError::LoginRequired(_) => HttpResponse::SeeOther()
                .insert_header((header::LOCATION, LOGIN_PATH))
                .json(body),
            ApiError::BadRequest(_) => HttpResponse::BadRequest().json(body),
            ApiError::NotFound(_) => HttpResponse::NotFound().json(body),
            ApiError::Forbidden(_) => HttpResponse::Forbidden().json(body),
            ApiError::Conflict(_) => HttpResponse::Conflict().json(body),
            ApiError::ValidationError(_) => HttpResponse::UnprocessableEntity().json(body),
            ApiError::AuthError(_) => HttpResponse::Unauthorized().json(body),
            ApiError::DatabaseError(_) | ApiError::InternalServerError(_) => {
                HttpResponse::InternalServerError().json(body)
            }
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

impl ApiError {
    pub fn not_found(entity: &str) -> Self {
        ApiError::NotFound(format!("{} not found", entity))
    }

    pub fn bad_request(msg: &str) -> Self {
        ApiError::BadRequest(msg.to_string())
    }

    pub fn login_required() -> Self {
        ApiError::LoginRequired("Please log in to continue.".to_string())
    }

    pub fn unauthorized_access() -> Self {
        ApiError::LoginRequired("Unauthorized access.".to_string())
    }

    /// Maps store constraint failures on a write to caller-facing errors.
    /// Unique violations become a conflict carrying `conflict_msg`,
    /// foreign-key violations a bad request, a write lock still held by another
    /// writer after the busy timeout a conflict; everything else stays a database error.
    pub fn from_write(err: sqlx::Error, conflict_msg: impl Into<String>) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return ApiError::Conflict(conflict_msg.into());
            }
            if db_err.is_foreign_key_violation() {
                return ApiError::BadRequest("Referenced record does not exist".to_string());
            }
        }
        if is_busy(&err) {
            log::warn!("Write abandoned on a locked database: {}", err);
            return ApiError::Conflict(BUSY_MESSAGE.to_string());
        }
        ApiError::DatabaseError(err)
    }
}

/// SQLITE_BUSY and SQLITE_BUSY_SNAPSHOT.
const BUSY_CODES: [&str; 2] = ["5", "517"];

const BUSY_MESSAGE: &str = "Another change is being saved. Please try again.";

fn is_busy(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .map_or(false, |code| BUSY_CODES.contains(&&*code)),
        _ => false,
    }
}
