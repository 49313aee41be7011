//! Fixtures shared by handler tests

use chrono::Utc;
use std::sync::Arc;

use crate::AppState;
use crate::auth::{AuthService, User, UserRole};
use crate::config::Config;
use crate::db::test_pool;

pub struct TestContext {
    pub state: Arc<AppState>,
    pub auth: Arc<AuthService>,
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.auth.jwt_secret = "test-secret-that-is-long-enough-1234".to_string();
    config.auth.bcrypt_cost = 4;
    config
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let auth = Arc::new(AuthService::new(
            &config.auth.jwt_secret,
            config.auth.bcrypt_cost,
            config.auth.session_hours,
        ));
        let state = Arc::new(AppState {
            db_pool: test_pool().await,
            config,
        });
        Self { state, auth }
    }

    /// Stores a user with password `password123` and returns it with a session token.
    pub async fn user(&self, username: &str, role: UserRole) -> (User, String) {
        let user = User::create(&self.state.db_pool, username, "password123", role, &self.auth)
            .await
            .unwrap();
        let token = self.auth.generate_token(&user).unwrap();
        (user, token)
    }

    pub async fn animal(&self, code: &str, status: &str) -> i64 {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO animals (code, animal_type, status, created_at, updated_at) VALUES (?, 'Vaca', ?, ?, ?)",
        )
            .bind(code)
            .bind(status)
            .bind(now)
            .bind(now)
            .execute(&self.state.db_pool)
            .await
            .unwrap()
            .last_insert_rowid()
    }
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

/// Initialises the full route table against a `TestContext`.
macro_rules! test_app {
    ($ctx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($ctx.state.clone()))
                .app_data(actix_web::web::Data::new($ctx.auth.clone()))
                .app_data(actix_web::web::Data::new(crate::monitoring::Metrics::new()))
                .configure(crate::configure_routes),
        )
        .await
    };
}

pub(crate) use test_app;
