// src/models/headcount.rs
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// One roll-call record. Never edited after creation.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Count {
    pub id: i64,
    pub counted_at: DateTime<Utc>,
    pub expected_count: i64,
    pub observed_count: i64,
    pub user_id: i64,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Alert {
    pub id: i64,
    pub message: String,
    pub resolved: bool,
    pub count_id: i64,
}

/// Count joined with its caretaker and optional alert, for the reports screen.
#[derive(Debug, Serialize, sqlx::FromRow, Clone)]
pub struct CountReport {
    pub id: i64,
    pub counted_at: DateTime<Utc>,
    pub expected_count: i64,
    pub observed_count: i64,
    pub user_id: i64,
    pub caretaker: String,
    pub alert_id: Option<i64>,
    pub alert_message: Option<String>,
    pub alert_resolved: Option<bool>,
}

/// Alert with the context of the count that raised it.
#[derive(Debug, Serialize, sqlx::FromRow, Clone)]
pub struct AlertView {
    pub id: i64,
    pub message: String,
    pub resolved: bool,
    pub count_id: i64,
    pub counted_at: DateTime<Utc>,
    pub caretaker: String,
}

/// Animal shown on the roll-call roster.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub id: i64,
    pub code: String,
    pub animal_type: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RollCallSubmission {
    /// Identities of the animals the caretaker saw.
    #[serde(default, alias = "animales_presentes")]
    pub present: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AlertListQuery {
    #[serde(default)]
    pub include_resolved: bool,
}
