// src/db.rs - Schema bootstrap

use sqlx::SqlitePool;
use anyhow::Result;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Foreign keys are also enabled on the connect options; keep it explicit for raw pools
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE CHECK(length(username) >= 3 AND length(username) <= 80),
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL CHECK(role IN ('Administrator', 'Caretaker')),
            created_at DATETIME NOT NULL
        )
        "#,
    )
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS animals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE CHECK(length(code) > 0 AND length(code) <= 20),
            animal_type TEXT NOT NULL CHECK(length(trim(animal_type)) > 0 AND length(animal_type) <= 50),
            name TEXT CHECK(name IS NULL OR length(name) <= 100),
            status TEXT NOT NULL CHECK(length(trim(status)) > 0 AND length(status) <= 50),
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL
        )
        "#,
    )
        .execute(pool)
        .await?;

    // One count per roll-call submission
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS counts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            counted_at DATETIME NOT NULL,
            expected_count INTEGER NOT NULL CHECK(expected_count >= 0),
            observed_count INTEGER NOT NULL CHECK(observed_count >= 0),
            user_id INTEGER NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users (id)
        )
        "#,
    )
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS alerts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            message TEXT NOT NULL,
            resolved INTEGER NOT NULL DEFAULT 0 CHECK(resolved IN (0, 1)),
            count_id INTEGER NOT NULL UNIQUE,
            FOREIGN KEY (count_id) REFERENCES counts (id) ON DELETE CASCADE
        )
        "#,
    )
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pens (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE CHECK(length(name) > 0 AND length(name) <= 100),
            capacity INTEGER CHECK(capacity IS NULL OR capacity >= 1),
            location TEXT CHECK(location IS NULL OR length(location) <= 255),
            notes TEXT CHECK(notes IS NULL OR length(notes) <= 1000),
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL
        )
        "#,
    )
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS treatments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            animal_id INTEGER NOT NULL,
            name TEXT NOT NULL CHECK(length(name) > 0 AND length(name) <= 255),
            medication TEXT CHECK(medication IS NULL OR length(medication) <= 255),
            dose TEXT CHECK(dose IS NULL OR length(dose) <= 100),
            administered_on DATE NOT NULL,
            notes TEXT CHECK(notes IS NULL OR length(notes) <= 1000),
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL,
            FOREIGN KEY (animal_id) REFERENCES animals (id) ON DELETE CASCADE
        )
        "#,
    )
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS suppliers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE CHECK(length(name) > 0 AND length(name) <= 255),
            contact_name TEXT CHECK(contact_name IS NULL OR length(contact_name) <= 255),
            phone TEXT CHECK(phone IS NULL OR length(phone) <= 50),
            email TEXT CHECK(email IS NULL OR length(email) <= 255),
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL
        )
        "#,
    )
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS feeds (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL CHECK(length(name) > 0 AND length(name) <= 255),
            quantity REAL NOT NULL CHECK(quantity >= 0),
            unit TEXT NOT NULL CHECK(length(unit) > 0 AND length(unit) <= 20),
            supplier_id INTEGER,
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL,
            FOREIGN KEY (supplier_id) REFERENCES suppliers (id) ON DELETE SET NULL
        )
        "#,
    )
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pastures (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE CHECK(length(name) > 0 AND length(name) <= 100),
            area_hectares REAL CHECK(area_hectares IS NULL OR area_hectares > 0),
            grass_type TEXT CHECK(grass_type IS NULL OR length(grass_type) <= 100),
            status TEXT NOT NULL DEFAULT 'available' CHECK(length(status) <= 50),
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL
        )
        "#,
    )
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS equipment (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL CHECK(length(name) > 0 AND length(name) <= 255),
            kind TEXT CHECK(kind IS NULL OR length(kind) <= 100),
            status TEXT NOT NULL DEFAULT 'operational' CHECK(length(status) <= 50),
            acquired_on DATE,
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL
        )
        "#,
    )
        .execute(pool)
        .await?;

    // ==================== CREATE INDEXES ====================

    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_animals_status ON animals(status)",
        "CREATE INDEX IF NOT EXISTS idx_animals_type ON animals(animal_type)",
        "CREATE INDEX IF NOT EXISTS idx_counts_counted_at ON counts(counted_at)",
        "CREATE INDEX IF NOT EXISTS idx_counts_user ON counts(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_alerts_resolved ON alerts(resolved)",
        "CREATE INDEX IF NOT EXISTS idx_treatments_animal ON treatments(animal_id)",
        "CREATE INDEX IF NOT EXISTS idx_feeds_supplier ON feeds(supplier_id)",
    ];

    for statement in indexes {
        sqlx::query(statement).execute(pool).await?;
    }

    log::info!("Database schema is up to date");
    Ok(())
}

/// Single-connection in-memory database with the schema applied.
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;

    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    // Every connection to :memory: is a separate database, so keep exactly one
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

/// File-backed WAL database shared by several connections.
#[cfg(test)]
pub async fn file_pool(path: &std::path::Path, max_connections: u32) -> SqlitePool {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::time::Duration;

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[actix_rt::test]
    async fn test_migrations_are_idempotent() {
        let pool = test_pool().await;
        run_migrations(&pool).await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        assert_eq!(
            tables,
            vec![
                "alerts", "animals", "counts", "equipment", "feeds", "pastures", "pens",
                "suppliers", "treatments", "users"
            ]
        );
    }

    #[actix_rt::test]
    async fn test_deleting_animal_row_cascades_to_treatments() {
        let pool = test_pool().await;
        let now = Utc::now();

        let animal_id = sqlx::query(
            "INSERT INTO animals (code, animal_type, status, created_at, updated_at) VALUES ('VAC-001', 'Vaca', 'InHerd', ?, ?)",
        )
        .bind(now)
        .bind(now)
        .execute(&pool)
        .await
        .unwrap()
        .last_insert_rowid();

        sqlx::query(
            "INSERT INTO treatments (animal_id, name, administered_on, created_at, updated_at) VALUES (?, 'Deworming', '2026-03-01', ?, ?)",
        )
        .bind(animal_id)
        .bind(now)
        .bind(now)
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query("DELETE FROM animals WHERE id = ?")
            .bind(animal_id)
            .execute(&pool)
            .await
            .unwrap();

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM treatments")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[actix_rt::test]
    async fn test_deleting_count_cascades_to_alert() {
        let pool = test_pool().await;
        let now = Utc::now();

        let user_id = sqlx::query(
            "INSERT INTO users (username, password_hash, role, created_at) VALUES ('rosa', 'x', 'Caretaker', ?)",
        )
        .bind(now)
        .execute(&pool)
        .await
        .unwrap()
        .last_insert_rowid();

        let count_id = sqlx::query(
            "INSERT INTO counts (counted_at, expected_count, observed_count, user_id) VALUES (?, 2, 1, ?)",
        )
        .bind(now)
        .bind(user_id)
        .execute(&pool)
        .await
        .unwrap()
        .last_insert_rowid();

        sqlx::query("INSERT INTO alerts (message, count_id) VALUES ('missing', ?)")
            .bind(count_id)
            .execute(&pool)
            .await
            .unwrap();

        // A second alert for the same count violates the one-to-one link
        let duplicate = sqlx::query("INSERT INTO alerts (message, count_id) VALUES ('again', ?)")
            .bind(count_id)
            .execute(&pool)
            .await;
        assert!(duplicate.is_err());

        sqlx::query("DELETE FROM counts WHERE id = ?")
            .bind(count_id)
            .execute(&pool)
            .await
            .unwrap();

        let alerts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM alerts")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(alerts, 0);
    }
}
