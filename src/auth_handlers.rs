// src/auth_handlers.rs - Login, registration, logout and user management

use actix_web::cookie::{time, Cookie, SameSite};
use actix_web::http::header;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::AppState;
use crate::auth::{
    AdminSession, AuthService, LoginRequest, LoginResponse, RegisterRequest, Session, User,
    UserInfo, UserRole, SESSION_COOKIE,
};
use crate::error::{ApiError, ApiResult, LOGIN_PATH};
use crate::handlers::{ApiResponse, PaginatedResponse, PaginationQuery};

// ======== REQUEST STRUCTS ========

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    pub role: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
}

fn parse_role(role: &str) -> ApiResult<UserRole> {
    UserRole::parse(role).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Invalid role '{}'. Valid roles: Administrator, Caretaker",
            role
        ))
    })
}

fn session_cookie(token: String, config: &crate::config::Config) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .secure(config.security.require_https)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(config.auth.session_hours))
        .finish()
}

fn see_other(location: &str) -> actix_web::HttpResponseBuilder {
    let mut builder = HttpResponse::SeeOther();
    builder.insert_header((header::LOCATION, location));
    builder
}

// ======== AUTH HANDLERS ========

/// Root: send the visitor to the landing screen of their role, or to login.
pub async fn index(session: Option<Session>) -> HttpResponse {
    match session {
        Some(session) => see_other(session.role.dashboard_path()).finish(),
        None => see_other(LOGIN_PATH).finish(),
    }
}

/// Login screen. An existing session goes straight to its dashboard.
pub async fn login_screen(session: Option<Session>) -> HttpResponse {
    match session {
        Some(session) => see_other(session.role.dashboard_path()).finish(),
        None => HttpResponse::Ok().json(ApiResponse::<()>::message(
            "Please log in with your username and password.",
        )),
    }
}

pub async fn login(
    app_state: web::Data<Arc<AppState>>,
    auth_service: web::Data<Arc<AuthService>>,
    request: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    request.validate()?;

    let invalid = || ApiError::AuthError("Invalid username or password.".to_string());

    let user = User::find_by_username(&app_state.db_pool, request.username.trim())
        .await?
        .ok_or_else(invalid)?;

    if !auth_service.verify_password(&request.password, &user.password_hash)? {
        log::warn!("Failed login for user {}", user.username);
        return Err(invalid());
    }

    let token = auth_service.generate_token(&user)?;
    let user_info = UserInfo::try_from(user)?;

    log::info!("User {} logged in as {}", user_info.username, user_info.role);

    let response = LoginResponse {
        token: token.clone(),
        expires_in: auth_service.session_seconds(),
        user: user_info,
    };

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(token, &app_state.config))
        .json(ApiResponse::success_with_message(
            response,
            "Login successful.".to_string(),
        )))
}

/// Self-registration. Administrator accounts are only open while the store has
/// no users, unless `auth.allow_admin_registration` is set.
pub async fn register(
    app_state: web::Data<Arc<AppState>>,
    auth_service: web::Data<Arc<AuthService>>,
    request: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    request.validate()?;
    let role = parse_role(&request.role)?;

    if role == UserRole::Administrator
        && !app_state.config.auth.allow_admin_registration
        && User::count(&app_state.db_pool).await? > 0
    {
        return Err(ApiError::Forbidden(
            "Administrator accounts can only be created by an administrator".to_string(),
        ));
    }

    let user = User::create(
        &app_state.db_pool,
        request.username.trim(),
        &request.password,
        role,
        &auth_service,
    )
    .await?;

    log::info!("New user registered: {} with role {}", user.username, role);

    Ok(HttpResponse::Created().json(ApiResponse::success_with_message(
        UserInfo::try_from(user)?,
        "Registration successful. You can now log in.".to_string(),
    )))
}

pub async fn logout(session: Option<Session>) -> HttpResponse {
    if let Some(session) = session {
        log::info!("User {} logged out", session.username);
    }

    let mut removal = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    removal.make_removal();

    see_other(LOGIN_PATH)
        .cookie(removal)
        .json(ApiResponse::<()>::message("You have been logged out."))
}

pub async fn me(
    session: Session,
    app_state: web::Data<Arc<AppState>>,
) -> ApiResult<HttpResponse> {
    let user = User::find_by_id(&app_state.db_pool, session.user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(UserInfo::try_from(user)?)))
}

// ======== USER MANAGEMENT (ADMIN) ========

pub async fn get_users(
    _session: AdminSession,
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<PaginationQuery>,
) -> ApiResult<HttpResponse> {
    let (page, per_page, offset) = query.normalize();

    let total = User::count(&app_state.db_pool).await?;
    let users: Vec<User> = sqlx::query_as("SELECT * FROM users ORDER BY username LIMIT ? OFFSET ?")
        .bind(per_page)
        .bind(offset)
        .fetch_all(&app_state.db_pool)
        .await?;

    let user_infos = users
        .into_iter()
        .map(UserInfo::try_from)
        .collect::<ApiResult<Vec<_>>>()?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(PaginatedResponse::new(
        user_infos, total, page, per_page,
    ))))
}

pub async fn get_user(
    _session: AdminSession,
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let user = User::find_by_id(&app_state.db_pool, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(UserInfo::try_from(user)?)))
}

pub async fn create_user(
    session: AdminSession,
    app_state: web::Data<Arc<AppState>>,
    auth_service: web::Data<Arc<AuthService>>,
    request: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    request.validate()?;
    let role = parse_role(&request.role)?;

    let user = User::create(
        &app_state.db_pool,
        request.username.trim(),
        &request.password,
        role,
        &auth_service,
    )
    .await?;

    log::info!("Admin {} created user {} ({})", session.0.username, user.username, role);

    Ok(HttpResponse::Created().json(ApiResponse::success_with_message(
        UserInfo::try_from(user)?,
        "User created successfully.".to_string(),
    )))
}

pub async fn update_user(
    session: AdminSession,
    app_state: web::Data<Arc<AppState>>,
    auth_service: web::Data<Arc<AuthService>>,
    path: web::Path<i64>,
    request: web::Json<UpdateUserRequest>,
) -> ApiResult<HttpResponse> {
    let user_id = path.into_inner();
    request.validate()?;

    let user = User::find_by_id(&app_state.db_pool, user_id).await?;

    let role = match request.role {
        Some(ref role) => parse_role(role)?,
        None => user.get_role()?,
    };

    if user_id == session.0.user_id && role != session.0.role {
        return Err(ApiError::BadRequest("Cannot change your own role".to_string()));
    }

    let password_hash = match request.password {
        Some(ref password) => auth_service.hash_password(password)?,
        None => user.password_hash,
    };

    sqlx::query("UPDATE users SET role = ?, password_hash = ? WHERE id = ?")
        .bind(role.as_str())
        .bind(&password_hash)
        .bind(user_id)
        .execute(&app_state.db_pool)
        .await?;

    log::info!("Admin {} updated user {}", session.0.username, user_id);

    let updated = User::find_by_id(&app_state.db_pool, user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        UserInfo::try_from(updated)?,
        "User updated successfully.".to_string(),
    )))
}

pub async fn delete_user(
    session: AdminSession,
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let user_id = path.into_inner();

    if user_id == session.0.user_id {
        return Err(ApiError::BadRequest("You cannot delete your own account.".to_string()));
    }

    let target = User::find_by_id(&app_state.db_pool, user_id).await?;

    let owned_counts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM counts WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(&app_state.db_pool)
        .await?;
    if owned_counts > 0 {
        return Err(ApiError::Conflict(format!(
            "User {} has recorded {} counts and cannot be deleted.",
            target.username, owned_counts
        )));
    }

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(&app_state.db_pool)
        .await
        .map_err(|e| ApiError::from_write(e, "User is still referenced"))?;

    log::info!("Admin {} deleted user {}", session.0.username, target.username);
    Ok(HttpResponse::Ok().json(ApiResponse::message(format!(
        "User {} deleted successfully.",
        target.username
    ))))
}
