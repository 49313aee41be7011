// src/main.rs
use actix_cors::Cors;
use actix_web::http::header;
use actix_web::middleware::{Compress, DefaultHeaders, Logger};
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool};
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod animal_handlers;
mod auth;
mod auth_handlers;
mod config;
mod count_handlers;
mod crud_handlers;
mod dashboard_handlers;
mod db;
mod error;
mod handlers;
mod models;
mod monitoring;
mod reconciliation;
pub mod repositories;
pub mod validator;

#[cfg(test)]
mod testing;

use auth::{AuthService, User, UserRole};
use config::{is_production, load_config, Config};
use crud_handlers::crud_scope;
use monitoring::{Metrics, RequestLogger};
use repositories::{
    EquipmentRepository, FeedRepository, PastureRepository, PenRepository,
    SupplierRepository, TreatmentRepository,
};

pub struct AppState {
    pub db_pool: SqlitePool,
    pub config: Config,
}

/// Every route of the service. Expects `AppState`, `AuthService` and `Metrics`
/// in the application data.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/", web::get().to(auth_handlers::index))

        // Health check and metrics (no auth)
        .service(
            web::scope("/health")
                .route("", web::get().to(monitoring::health_check))
                .route("/ready", web::get().to(monitoring::readiness_check))
                .route("/metrics", web::get().to(monitoring::metrics_endpoint))
        )

        .service(
            web::scope("/auth")
                .route("/login", web::get().to(auth_handlers::login_screen))
                .route("/login", web::post().to(auth_handlers::login))
                .route("/register", web::post().to(auth_handlers::register))
                .route("/logout", web::post().to(auth_handlers::logout))
                .route("/me", web::get().to(auth_handlers::me))
        )

        .service(
            web::scope("/dashboard")
                .route("/admin", web::get().to(dashboard_handlers::admin_dashboard))
                .route("/caretaker", web::get().to(dashboard_handlers::caretaker_dashboard))
        )

        .service(
            web::scope("/api/v1")
                .service(
                    web::scope("/animals")
                        .route("", web::get().to(animal_handlers::get_animals))
                        .route("", web::post().to(animal_handlers::create_animal))
                        .route("/{id}", web::get().to(animal_handlers::get_animal))
                        .route("/{id}", web::put().to(animal_handlers::update_animal))
                        .route("/{id}", web::delete().to(animal_handlers::delete_animal))
                        .route("/{id}/treatments", web::get().to(animal_handlers::get_animal_treatments))
                )
                .service(
                    web::scope("/users")
                        .route("", web::get().to(auth_handlers::get_users))
                        .route("", web::post().to(auth_handlers::create_user))
                        .route("/{id}", web::get().to(auth_handlers::get_user))
                        .route("/{id}", web::put().to(auth_handlers::update_user))
                        .route("/{id}", web::delete().to(auth_handlers::delete_user))
                )
                .service(
                    web::scope("/roll-call")
                        .route("", web::get().to(count_handlers::get_roster))
                        .route("", web::post().to(count_handlers::submit_roll_call))
                )
                .service(
                    web::scope("/counts")
                        .route("", web::get().to(count_handlers::get_counts))
                        .route("/{id}", web::get().to(count_handlers::get_count))
                )
                .service(
                    web::scope("/alerts")
                        .route("", web::get().to(count_handlers::get_alerts))
                        .route("/{id}/resolve", web::post().to(count_handlers::resolve_alert))
                )
                .service(crud_scope::<PenRepository>("/pens"))
                .service(crud_scope::<TreatmentRepository>("/treatments"))
                .service(crud_scope::<SupplierRepository>("/suppliers"))
                .service(crud_scope::<FeedRepository>("/feeds"))
                .service(crud_scope::<PastureRepository>("/pastures"))
                .service(crud_scope::<EquipmentRepository>("/equipment"))
        );
}

// ==================== MAIN ====================

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (this calls load_env_file internally)
    let config = load_config()?;

    setup_logging(&config)?;

    if is_production() {
        validate_production_config(&config)?;
    }

    config.print_startup_info();

    setup_database(&config.database.url).await?;
    let pool = create_database_pool(&config.database).await?;
    db::run_migrations(&pool).await?;

    let auth_service = Arc::new(AuthService::new(
        &config.auth.jwt_secret,
        config.auth.bcrypt_cost,
        config.auth.session_hours,
    ));

    create_default_admin_if_needed(&pool, &auth_service).await?;

    let app_state = Arc::new(AppState {
        db_pool: pool.clone(),
        config: config.clone(),
    });

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    log::info!("Starting server at http://{}", bind_address);

    let workers = config.server.workers;
    let metrics_arc = Arc::new(Metrics::new());
    let metrics = web::Data::from(metrics_arc.clone());

    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(setup_cors(&config.security.allowed_origins))
            .wrap(setup_security_headers(&config.security))
            .wrap(Logger::default())
            .wrap(Compress::default())
            .wrap(RequestLogger::new(metrics_arc.clone()))
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::Data::new(auth_service.clone()))
            .app_data(metrics.clone())
            .configure(configure_routes)
    });

    if let Some(workers) = workers {
        server = server.workers(workers);
    }

    server
        .bind(&bind_address)?
        .run()
        .await
        .context("Server failed to run")?;

    pool.close().await;
    Ok(())
}

// ==================== HELPER FUNCTIONS ====================

pub fn setup_cors(allowed_origins: &[String]) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ])
        .expose_headers(vec![header::CONTENT_LENGTH, header::LOCATION])
        .supports_credentials()
        .max_age(3600);

    for origin in allowed_origins {
        if origin.is_empty() {
            continue;
        }
        if origin == "*" {
            log::warn!("Using wildcard CORS (*) in development mode");
            cors = cors.allow_any_origin();
        } else {
            cors = cors.allowed_origin(origin);
        }
    }

    cors
}

fn setup_logging(config: &Config) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.as_str()));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .context("Failed to initialise logging")?;

    Ok(())
}

fn validate_production_config(config: &Config) -> anyhow::Result<()> {
    if config.auth.jwt_secret.len() < 32 {
        anyhow::bail!("Insecure JWT secret in production! Must be at least 32 characters.");
    }

    if config.security.allowed_origins.iter().any(|o| o == "*") {
        anyhow::bail!("Wildcard CORS origins not allowed in production!");
    }

    if config.auth.allow_admin_registration {
        log::warn!("Administrator self-registration is enabled in production");
    }

    Ok(())
}

async fn setup_database(database_url: &str) -> anyhow::Result<()> {
    if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
        log::info!("Creating database: {}", database_url);
        Sqlite::create_database(database_url).await?;
    }
    Ok(())
}

async fn create_database_pool(db_config: &config::DatabaseConfig) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&db_config.url)
        .with_context(|| format!("Invalid DATABASE_URL: {}", db_config.url))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(db_config.connect_timeout));

    let pool = SqlitePoolOptions::new()
        .max_connections(db_config.max_connections)
        .min_connections(db_config.min_connections)
        .acquire_timeout(Duration::from_secs(db_config.connect_timeout))
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    Ok(pool)
}

fn setup_security_headers(config: &config::SecurityConfig) -> DefaultHeaders {
    let mut headers = DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "DENY"))
        .add(("X-XSS-Protection", "1; mode=block"))
        .add(("Referrer-Policy", "strict-origin-when-cross-origin"));

    if config.require_https {
        headers = headers.add((
            "Strict-Transport-Security",
            "max-age=31536000; includeSubDomains; preload",
        ));
    }

    headers
}

fn generate_password() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

/// Creates the `admin` Administrator when the users table is empty.
async fn create_default_admin_if_needed(
    pool: &SqlitePool,
    auth_service: &AuthService,
) -> anyhow::Result<()> {
    let user_count = User::count(pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to count users: {}", e))?;

    if user_count > 0 {
        return Ok(());
    }

    let (password, generated) = match env::var("DEFAULT_ADMIN_PASSWORD") {
        Ok(password) if password.len() >= 8 => (password, false),
        Ok(_) => anyhow::bail!("DEFAULT_ADMIN_PASSWORD must be at least 8 characters"),
        Err(_) => (generate_password(), true),
    };

    User::create(pool, "admin", &password, UserRole::Administrator, auth_service)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create default admin user: {}", e))?;

    log::warn!("Default administrator created:");
    log::warn!("  Username: admin");
    if generated {
        log::warn!("  Password: {} (generated - change it after the first login)", password);
    } else {
        log::warn!("  Password: taken from DEFAULT_ADMIN_PASSWORD");
    }

    Ok(())
}
