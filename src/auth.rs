use actix_web::dev::Payload;
use actix_web::http::header::Header;
use actix_web::{web, FromRequest, HttpRequest};
use actix_web_httpauth::headers::authorization::{Authorization, Bearer};
use bcrypt::{hash, verify};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header as JwtHeader, Validation};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::future::{ready, Ready};
use std::sync::Arc;
use strum::{Display, EnumString};
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::validator::{validate_not_blank, validate_username};

pub const SESSION_COOKIE: &str = "ganaderia_session";

// ======== USER MODEL ========

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

// ======== USER ROLE ========

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum UserRole {
    #[strum(to_string = "Administrator", serialize = "Administrador", serialize = "admin")]
    Administrator,
    #[strum(to_string = "Caretaker", serialize = "Cuidador")]
    Caretaker,
}

impl UserRole {
    pub fn parse(s: &str) -> Option<Self> {
        s.trim().parse().ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Administrator => "Administrator",
            UserRole::Caretaker => "Caretaker",
        }
    }

    /// Landing endpoint for a freshly authenticated session.
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            UserRole::Administrator => "/dashboard/admin",
            UserRole::Caretaker => "/dashboard/caretaker",
        }
    }
}

// ======== REQUEST/RESPONSE STRUCTS ========

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        length(min = 3, max = 80, message = "Username must be 3-80 characters"),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: i64,
    pub user: UserInfo,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<User> for UserInfo {
    type Error = ApiError;

    fn try_from(user: User) -> Result<Self, Self::Error> {
        let role = user.get_role()?;
        Ok(Self {
            id: user.id,
            username: user.username,
            role,
            created_at: user.created_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub role: UserRole,
    pub exp: i64,
    pub iat: i64,
}

// ======== AUTH SERVICE ========

pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    bcrypt_cost: u32,
    session_hours: i64,
}

impl AuthService {
    pub fn new(jwt_secret: &str, bcrypt_cost: u32, session_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            bcrypt_cost,
            session_hours,
        }
    }

    pub fn session_seconds(&self) -> i64 {
        self.session_hours * 3600
    }

    pub fn hash_password(&self, password: &str) -> ApiResult<String> {
        hash(password, self.bcrypt_cost)
            .map_err(|e| ApiError::InternalServerError(format!("Failed to hash password: {}", e)))
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> ApiResult<bool> {
        verify(password, hash)
            .map_err(|_| ApiError::InternalServerError("Password verification failed".to_string()))
    }

    pub fn generate_token(&self, user: &User) -> ApiResult<String> {
        let now = Utc::now();
        let exp = now + Duration::hours(self.session_hours);

        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            role: user.get_role()?,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&JwtHeader::default(), &claims, &self.encoding_key)
            .map_err(|_| ApiError::AuthError("Failed to generate token".to_string()))
    }

    pub fn verify_token(&self, token: &str) -> ApiResult<Claims> {
        let validation = Validation::default();
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ApiError::AuthError("Token expired".to_string())
                }
                _ => ApiError::AuthError("Invalid token".to_string()),
            })
    }
}

// ======== USER METHODS ========

impl User {
    pub async fn find_by_username(pool: &SqlitePool, username: &str) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> ApiResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| ApiError::not_found("User"))
    }

    /// Inserts a user with an already validated username and a plain password.
    /// A taken username is reported as a conflict and nothing is written.
    pub async fn create(
        pool: &SqlitePool,
        username: &str,
        password: &str,
        role: UserRole,
        auth_service: &AuthService,
    ) -> ApiResult<User> {
        if Self::find_by_username(pool, username).await?.is_some() {
            return Err(ApiError::Conflict(username_taken(username)));
        }

        let password_hash = auth_service.hash_password(password)?;
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO users (username, password_hash, role, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(username)
        .bind(&password_hash)
        .bind(role.as_str())
        .bind(now)
        .execute(pool)
        .await
        .map_err(|e| ApiError::from_write(e, username_taken(username)))?;

        Self::find_by_id(pool, result.last_insert_rowid()).await
    }

    pub async fn count(pool: &SqlitePool) -> ApiResult<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;
        Ok(total)
    }

    pub fn get_role(&self) -> ApiResult<UserRole> {
        UserRole::parse(&self.role).ok_or_else(|| {
            ApiError::InternalServerError(format!("User {} has unknown role '{}'", self.id, self.role))
        })
    }
}

fn username_taken(username: &str) -> String {
    format!("The username '{}' already exists.", username)
}

// ======== SESSION EXTRACTORS ========

/// Request-scoped identity decoded from the session token.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub user_id: i64,
    pub username: String,
    pub role: UserRole,
}

impl From<Claims> for Session {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username,
            role: claims.role,
        }
    }
}

impl Session {
    pub fn require(self, role: UserRole) -> ApiResult<Session> {
        if self.role == role {
            Ok(self)
        } else {
            log::warn!(
                "User {} ({}) denied access to a {} operation",
                self.username, self.role, role
            );
            Err(ApiError::unauthorized_access())
        }
    }
}

/// Token from `Authorization: Bearer`, falling back to the session cookie.
fn session_token(req: &HttpRequest) -> Option<String> {
    if let Ok(auth) = Authorization::<Bearer>::parse(req) {
        return Some(auth.into_scheme().token().to_string());
    }
    req.cookie(SESSION_COOKIE).map(|c| c.value().to_string())
}

pub fn extract_session(req: &HttpRequest) -> ApiResult<Session> {
    let auth_service = req
        .app_data::<web::Data<Arc<AuthService>>>()
        .ok_or_else(|| ApiError::InternalServerError("Auth service not available".to_string()))?;

    let token = session_token(req).ok_or_else(ApiError::login_required)?;

    match auth_service.verify_token(&token) {
        Ok(claims) => Ok(claims.into()),
        Err(err) => {
            log::warn!("Session rejected: {}", err);
            Err(ApiError::login_required())
        }
    }
}

impl FromRequest for Session {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(extract_session(req))
    }
}

/// Session whose role is Administrator.
#[derive(Debug, Clone)]
pub struct AdminSession(pub Session);

impl FromRequest for AdminSession {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            extract_session(req)
                .and_then(|s| s.require(UserRole::Administrator))
                .map(AdminSession),
        )
    }
}

/// Session whose role is Caretaker.
#[derive(Debug, Clone)]
pub struct CaretakerSession(pub Session);

impl FromRequest for CaretakerSession {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            extract_session(req)
                .and_then(|s| s.require(UserRole::Caretaker))
                .map(CaretakerSession),
        )
    }
}
