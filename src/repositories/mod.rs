// src/repositories/mod.rs
//! Store access for the administrator-managed farm records

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::SqlitePool;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::handlers::{PaginatedResponse, PaginationQuery};

pub mod records;

pub use records::{
    EquipmentRepository, FeedRepository, PastureRepository, PenRepository,
    SupplierRepository, TreatmentRepository,
};

/// Uniform list/get/create/update/delete over one table.
#[async_trait]
pub trait CrudRepository: Default + Send + Sync + 'static {
    type Entity: Serialize + Send + Unpin + for<'r> sqlx::FromRow<'r, SqliteRow>;
    type Create: DeserializeOwned + Validate + Send + 'static;
    type Update: DeserializeOwned + Validate + Send + 'static;

    /// Name of the table in the database
    fn table_name(&self) -> &'static str;

    /// Human label used in notices ("Pen", "Supplier", ...)
    fn entity_label(&self) -> &'static str;

    /// Columns matched by the `search` list parameter
    fn search_fields(&self) -> &'static [&'static str] {
        &[]
    }

    fn default_sort_field(&self) -> &'static str {
        "id"
    }

    async fn create(&self, pool: &SqlitePool, data: Self::Create) -> ApiResult<Self::Entity>;

    /// Applies the present fields of `data` to the stored record.
    async fn update(&self, pool: &SqlitePool, id: i64, data: Self::Update) -> ApiResult<Self::Entity>;

    async fn get_by_id(&self, pool: &SqlitePool, id: i64) -> ApiResult<Option<Self::Entity>> {
        let query = format!("SELECT * FROM {} WHERE id = ?", self.table_name());

        let result = sqlx::query_as::<_, Self::Entity>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(result)
    }

    async fn find(&self, pool: &SqlitePool, id: i64) -> ApiResult<Self::Entity> {
        self.get_by_id(pool, id)
            .await?
            .ok_or_else(|| ApiError::not_found(self.entity_label()))
    }

    async fn delete(&self, pool: &SqlitePool, id: i64) -> ApiResult<()> {
        let query = format!("DELETE FROM {} WHERE id = ?", self.table_name());

        let result = sqlx::query(&query)
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| ApiError::from_write(e, format!("{} is still in use", self.entity_label())))?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found(self.entity_label()));
        }

        Ok(())
    }

    async fn get_paginated(
        &self,
        pool: &SqlitePool,
        query: &PaginationQuery,
    ) -> ApiResult<PaginatedResponse<Self::Entity>> {
        let (page, per_page, offset) = query.normalize();

        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && !self.search_fields().is_empty());

        let where_clause = match search {
            Some(_) => {
                let like_conditions: Vec<String> = self
                    .search_fields()
                    .iter()
                    .map(|f| format!("{} LIKE ?", f))
                    .collect();
                format!(" WHERE ({})", like_conditions.join(" OR "))
            }
            None => String::new(),
        };
        let search_pattern = search.map(|s| format!("%{}%", s));

        // === COUNT QUERY ===
        let count_sql = format!("SELECT COUNT(*) FROM {}{}", self.table_name(), where_clause);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(ref pattern) = search_pattern {
            for _ in self.search_fields() {
                count_query = count_query.bind(pattern);
            }
        }
        let total = count_query.fetch_one(pool).await?;

        // === SELECT QUERY ===
        let select_sql = format!(
            "SELECT * FROM {}{} ORDER BY {} DESC LIMIT ? OFFSET ?",
            self.table_name(),
            where_clause,
            self.default_sort_field()
        );
        let mut select_query = sqlx::query_as::<_, Self::Entity>(&select_sql);
        if let Some(ref pattern) = search_pattern {
            for _ in self.search_fields() {
                select_query = select_query.bind(pattern);
            }
        }
        let data = select_query
            .bind(per_page)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        Ok(PaginatedResponse::new(data, total, page, per_page))
    }
}

/// Trimmed replacement for a required text column, or the current value.
pub fn merge_required(update: Option<String>, current: String) -> String {
    match update {
        Some(value) => value.trim().to_string(),
        None => current,
    }
}

/// New value for an optional text column: absent keeps, blank clears.
pub fn merge_optional(update: Option<String>, current: Option<String>) -> Option<String> {
    match update {
        Some(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        None => current,
    }
}
