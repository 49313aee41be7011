//! Headcount reconciliation
//!
//! Compares the in-herd roster with the animals a caretaker reported present
//! and records one Count per submission, plus an Alert when animals are missing.

use chrono::Utc;
use serde::Serialize;
use sqlx::{Executor, Sqlite, SqlitePool};
use std::collections::BTreeSet;

use crate::error::{ApiError, ApiResult};
use crate::models::{Alert, AnimalStatus, Count, RosterEntry};

pub const ALL_PRESENT_NOTICE: &str = "Count saved. All animals are present.";

/// Outcome of comparing the expected roster with the reported identities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub expected_count: i64,
    pub observed_count: i64,
    /// Expected animals not reported, in identity order.
    pub missing: Vec<RosterEntry>,
    /// Reported identities that are not on the roster.
    pub unknown: Vec<i64>,
}

impl Reconciliation {
    /// `expected` must be ordered by identity.
    pub fn compute(expected: &[RosterEntry], observed: &BTreeSet<i64>) -> Self {
        let expected_count = expected.len() as i64;
        let observed_count = observed.len() as i64;

        let missing = if observed_count < expected_count {
            expected
                .iter()
                .filter(|animal| !observed.contains(&animal.id))
                .cloned()
                .collect()
        } else {
            Vec::new()
        };

        let expected_ids: BTreeSet<i64> = expected.iter().map(|a| a.id).collect();
        let unknown = observed.difference(&expected_ids).copied().collect();

        Self {
            expected_count,
            observed_count,
            missing,
            unknown,
        }
    }

    /// Fewer animals reported than expected.
    pub fn has_shortfall(&self) -> bool {
        self.observed_count < self.expected_count
    }

    pub fn alert_message(&self) -> Option<String> {
        if !self.has_shortfall() {
            return None;
        }
        let codes: Vec<&str> = self.missing.iter().map(|a| a.code.as_str()).collect();
        Some(format!(
            "Count discrepancy. {} animals missing: {}",
            self.missing.len(),
            codes.join(", ")
        ))
    }
}

/// What was persisted for one roll-call submission.
#[derive(Debug, Serialize)]
pub struct CountOutcome {
    pub count: Count,
    pub alert: Option<Alert>,
    pub missing: Vec<RosterEntry>,
}

impl CountOutcome {
    pub fn notice(&self) -> String {
        match &self.alert {
            Some(alert) => alert.message.clone(),
            None => ALL_PRESENT_NOTICE.to_string(),
        }
    }
}

/// Animals a caretaker is expected to find, in identity order.
pub async fn roster<'e, E>(executor: E) -> ApiResult<Vec<RosterEntry>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let roster = sqlx::query_as::<_, RosterEntry>(
        "SELECT id, code, animal_type, name FROM animals WHERE status = ? ORDER BY id",
    )
        .bind(AnimalStatus::IN_HERD)
        .fetch_all(executor)
        .await?;
    Ok(roster)
}

/// Records a Count (and an Alert on shortfall) for the identities `present`.
///
/// The Count row is the first statement of the transaction, so the write lock
/// is held before the roster is read and the expected set is the one current
/// at submission time. A caretaker whose user row is gone gets
/// `LoginRequired`. With `reject_unknown` any identity outside the roster
/// fails the whole submission.
pub async fn record_count(
    pool: &SqlitePool,
    caretaker_id: i64,
    present: &[i64],
    reject_unknown: bool,
) -> ApiResult<CountOutcome> {
    let observed: BTreeSet<i64> = present.iter().copied().collect();
    let counted_at = Utc::now();

    let mut tx = pool.begin().await?;

    let count_id = sqlx::query(
        r#"INSERT INTO counts (counted_at, expected_count, observed_count, user_id)
           VALUES (?, (SELECT COUNT(*) FROM animals WHERE status = ?), ?, ?)"#,
    )
        .bind(counted_at)
        .bind(AnimalStatus::IN_HERD)
        .bind(observed.len() as i64)
        .bind(caretaker_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                log::warn!("Roll call from user {} who no longer exists", caretaker_id);
                ApiError::login_required()
            }
            other => ApiError::from_write(other, "Count could not be stored"),
        })?
        .last_insert_rowid();

    let expected = roster(&mut *tx).await?;
    let result = Reconciliation::compute(&expected, &observed);

    if !result.unknown.is_empty() {
        if reject_unknown {
            return Err(ApiError::ValidationError(format!(
                "Animals not on the current roster: {}",
                join_ids(&result.unknown)
            )));
        }
        log::warn!(
            "Roll call by user {} listed animals not on the roster: {}",
            caretaker_id,
            join_ids(&result.unknown)
        );
    }

    let alert = match result.alert_message() {
        Some(message) => {
            let alert_id = sqlx::query("INSERT INTO alerts (message, resolved, count_id) VALUES (?, 0, ?)")
                .bind(&message)
                .bind(count_id)
                .execute(&mut *tx)
                .await?
                .last_insert_rowid();
            Some(Alert {
                id: alert_id,
                message,
                resolved: false,
                count_id,
            })
        }
        None => None,
    };

    tx.commit().await?;

    let count = Count {
        id: count_id,
        counted_at,
        expected_count: result.expected_count,
        observed_count: result.observed_count,
        user_id: caretaker_id,
    };

    match &alert {
        Some(a) => log::warn!("Count {} raised alert {}: {}", count.id, a.id, a.message),
        None => log::info!(
            "Count {} recorded: {}/{} animals present",
            count.id, count.observed_count, count.expected_count
        ),
    }

    Ok(CountOutcome {
        count,
        alert,
        missing: result.missing,
    })
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter().map(i64::to_string).collect::<Vec<_>>().join(", ")
}
