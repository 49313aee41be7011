// src/repositories/records.rs
//! Pens, treatments, suppliers, feed stock, pastures and equipment

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use super::{merge_optional, merge_required, CrudRepository};
use crate::error::{ApiError, ApiResult};
use crate::models::*;
use crate::validator::normalize_optional;

fn name_taken(label: &str, name: &str) -> String {
    format!("A {} named '{}' already exists.", label, name)
}

// ==================== PENS ====================

#[derive(Debug, Default, Clone, Copy)]
pub struct PenRepository;

#[async_trait]
impl CrudRepository for PenRepository {
    type Entity = Pen;
    type Create = CreatePenRequest;
    type Update = UpdatePenRequest;

    fn table_name(&self) -> &'static str {
        "pens"
    }

    fn entity_label(&self) -> &'static str {
        "Pen"
    }

    fn search_fields(&self) -> &'static [&'static str] {
        &["name", "location"]
    }

    async fn create(&self, pool: &SqlitePool, data: CreatePenRequest) -> ApiResult<Pen> {
        let now = Utc::now();
        let name = data.name.trim().to_string();

        let result = sqlx::query(
            r#"INSERT INTO pens (name, capacity, location, notes, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
            .bind(&name)
            .bind(data.capacity)
            .bind(normalize_optional(&data.location))
            .bind(normalize_optional(&data.notes))
            .bind(now)
            .bind(now)
            .execute(pool)
            .await
            .map_err(|e| ApiError::from_write(e, name_taken("pen", &name)))?;

        self.find(pool, result.last_insert_rowid()).await
    }

    async fn update(&self, pool: &SqlitePool, id: i64, data: UpdatePenRequest) -> ApiResult<Pen> {
        let current = self.find(pool, id).await?;
        let name = merge_required(data.name, current.name);

        sqlx::query(
            r#"UPDATE pens SET name = ?, capacity = ?, location = ?, notes = ?, updated_at = ?
               WHERE id = ?"#,
        )
            .bind(&name)
            .bind(data.capacity.or(current.capacity))
            .bind(merge_optional(data.location, current.location))
            .bind(merge_optional(data.notes, current.notes))
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| ApiError::from_write(e, name_taken("pen", &name)))?;

        self.find(pool, id).await
    }
}

// ==================== TREATMENTS ====================

#[derive(Debug, Default, Clone, Copy)]
pub struct TreatmentRepository;

impl TreatmentRepository {
    /// Treatments of one animal, most recent first.
    pub async fn list_for_animal(&self, pool: &SqlitePool, animal_id: i64) -> ApiResult<Vec<Treatment>> {
        let treatments = sqlx::query_as::<_, Treatment>(
            "SELECT * FROM treatments WHERE animal_id = ? ORDER BY administered_on DESC, id DESC",
        )
            .bind(animal_id)
            .fetch_all(pool)
            .await?;
        Ok(treatments)
    }
}

#[async_trait]
impl CrudRepository for TreatmentRepository {
    type Entity = Treatment;
    type Create = CreateTreatmentRequest;
    type Update = UpdateTreatmentRequest;

    fn table_name(&self) -> &'static str {
        "treatments"
    }

    fn entity_label(&self) -> &'static str {
        "Treatment"
    }

    fn search_fields(&self) -> &'static [&'static str] {
        &["name", "medication"]
    }

    async fn create(&self, pool: &SqlitePool, data: CreateTreatmentRequest) -> ApiResult<Treatment> {
        let now = Utc::now();
        let administered_on = data.administered_on.unwrap_or_else(|| now.date_naive());

        let result = sqlx::query(
            r#"INSERT INTO treatments
               (animal_id, name, medication, dose, administered_on, notes, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
            .bind(data.animal_id)
            .bind(data.name.trim())
            .bind(normalize_optional(&data.medication))
            .bind(normalize_optional(&data.dose))
            .bind(administered_on)
            .bind(normalize_optional(&data.notes))
            .bind(now)
            .bind(now)
            .execute(pool)
            .await
            .map_err(|e| ApiError::from_write(e, "Treatment already recorded"))?;

        log::info!("Treatment '{}' recorded for animal {}", data.name.trim(), data.animal_id);
        self.find(pool, result.last_insert_rowid()).await
    }

    async fn update(&self, pool: &SqlitePool, id: i64, data: UpdateTreatmentRequest) -> ApiResult<Treatment> {
        let current = self.find(pool, id).await?;

        sqlx::query(
            r#"UPDATE treatments SET name = ?, medication = ?, dose = ?, administered_on = ?,
               notes = ?, updated_at = ? WHERE id = ?"#,
        )
            .bind(merge_required(data.name, current.name))
            .bind(merge_optional(data.medication, current.medication))
            .bind(merge_optional(data.dose, current.dose))
            .bind(data.administered_on.unwrap_or(current.administered_on))
            .bind(merge_optional(data.notes, current.notes))
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;

        self.find(pool, id).await
    }
}

// ==================== SUPPLIERS ====================

#[derive(Debug, Default, Clone, Copy)]
pub struct SupplierRepository;

#[async_trait]
impl CrudRepository for SupplierRepository {
    type Entity = Supplier;
    type Create = CreateSupplierRequest;
    type Update = UpdateSupplierRequest;

    fn table_name(&self) -> &'static str {
        "suppliers"
    }

    fn entity_label(&self) -> &'static str {
        "Supplier"
    }

    fn search_fields(&self) -> &'static [&'static str] {
        &["name", "contact_name", "email"]
    }

    async fn create(&self, pool: &SqlitePool, data: CreateSupplierRequest) -> ApiResult<Supplier> {
        let now = Utc::now();
        let name = data.name.trim().to_string();

        let result = sqlx::query(
            r#"INSERT INTO suppliers (name, contact_name, phone, email, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
            .bind(&name)
            .bind(normalize_optional(&data.contact_name))
            .bind(normalize_optional(&data.phone))
            .bind(normalize_optional(&data.email))
            .bind(now)
            .bind(now)
            .execute(pool)
            .await
            .map_err(|e| ApiError::from_write(e, name_taken("supplier", &name)))?;

        self.find(pool, result.last_insert_rowid()).await
    }

    async fn update(&self, pool: &SqlitePool, id: i64, data: UpdateSupplierRequest) -> ApiResult<Supplier> {
        let current = self.find(pool, id).await?;
        let name = merge_required(data.name, current.name);

        sqlx::query(
            r#"UPDATE suppliers SET name = ?, contact_name = ?, phone = ?, email = ?, updated_at = ?
               WHERE id = ?"#,
        )
            .bind(&name)
            .bind(merge_optional(data.contact_name, current.contact_name))
            .bind(merge_optional(data.phone, current.phone))
            .bind(merge_optional(data.email, current.email))
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| ApiError::from_write(e, name_taken("supplier", &name)))?;

        self.find(pool, id).await
    }
}

// ==================== FEED STOCK ====================

#[derive(Debug, Default, Clone, Copy)]
pub struct FeedRepository;

#[async_trait]
impl CrudRepository for FeedRepository {
    type Entity = Feed;
    type Create = CreateFeedRequest;
    type Update = UpdateFeedRequest;

    fn table_name(&self) -> &'static str {
        "feeds"
    }

    fn entity_label(&self) -> &'static str {
        "Feed"
    }

    fn search_fields(&self) -> &'static [&'static str] {
        &["name"]
    }

    async fn create(&self, pool: &SqlitePool, data: CreateFeedRequest) -> ApiResult<Feed> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"INSERT INTO feeds (name, quantity, unit, supplier_id, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
            .bind(data.name.trim())
            .bind(data.quantity)
            .bind(data.unit.trim())
            .bind(data.supplier_id)
            .bind(now)
            .bind(now)
            .execute(pool)
            .await
            .map_err(|e| ApiError::from_write(e, "Feed already recorded"))?;

        self.find(pool, result.last_insert_rowid()).await
    }

    async fn update(&self, pool: &SqlitePool, id: i64, data: UpdateFeedRequest) -> ApiResult<Feed> {
        let current = self.find(pool, id).await?;

        sqlx::query(
            r#"UPDATE feeds SET name = ?, quantity = ?, unit = ?, supplier_id = ?, updated_at = ?
               WHERE id = ?"#,
        )
            .bind(merge_required(data.name, current.name))
            .bind(data.quantity.unwrap_or(current.quantity))
            .bind(merge_required(data.unit, current.unit))
            .bind(data.supplier_id.or(current.supplier_id))
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| ApiError::from_write(e, "Feed already recorded"))?;

        self.find(pool, id).await
    }
}

// ==================== PASTURES ====================

#[derive(Debug, Default, Clone, Copy)]
pub struct PastureRepository;

#[async_trait]
impl CrudRepository for PastureRepository {
    type Entity = Pasture;
    type Create = CreatePastureRequest;
    type Update = UpdatePastureRequest;

    fn table_name(&self) -> &'static str {
        "pastures"
    }

    fn entity_label(&self) -> &'static str {
        "Pasture"
    }

    fn search_fields(&self) -> &'static [&'static str] {
        &["name", "grass_type", "status"]
    }

    async fn create(&self, pool: &SqlitePool, data: CreatePastureRequest) -> ApiResult<Pasture> {
        let now = Utc::now();
        let name = data.name.trim().to_string();
        let status = normalize_optional(&data.status)
            .unwrap_or_else(|| DEFAULT_PASTURE_STATUS.to_string());

        let result = sqlx::query(
            r#"INSERT INTO pastures (name, area_hectares, grass_type, status, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
            .bind(&name)
            .bind(data.area_hectares)
            .bind(normalize_optional(&data.grass_type))
            .bind(&status)
            .bind(now)
            .bind(now)
            .execute(pool)
            .await
            .map_err(|e| ApiError::from_write(e, name_taken("pasture", &name)))?;

        self.find(pool, result.last_insert_rowid()).await
    }

    async fn update(&self, pool: &SqlitePool, id: i64, data: UpdatePastureRequest) -> ApiResult<Pasture> {
        let current = self.find(pool, id).await?;
        let name = merge_required(data.name, current.name);

        sqlx::query(
            r#"UPDATE pastures SET name = ?, area_hectares = ?, grass_type = ?, status = ?,
               updated_at = ? WHERE id = ?"#,
        )
            .bind(&name)
            .bind(data.area_hectares.or(current.area_hectares))
            .bind(merge_optional(data.grass_type, current.grass_type))
            .bind(merge_required(data.status, current.status))
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| ApiError::from_write(e, name_taken("pasture", &name)))?;

        self.find(pool, id).await
    }
}

// ==================== EQUIPMENT ====================

#[derive(Debug, Default, Clone, Copy)]
pub struct EquipmentRepository;

#[async_trait]
impl CrudRepository for EquipmentRepository {
    type Entity = Equipment;
    type Create = CreateEquipmentRequest;
    type Update = UpdateEquipmentRequest;

    fn table_name(&self) -> &'static str {
        "equipment"
    }

    fn entity_label(&self) -> &'static str {
        "Equipment"
    }

    fn search_fields(&self) -> &'static [&'static str] {
        &["name", "kind", "status"]
    }

    async fn create(&self, pool: &SqlitePool, data: CreateEquipmentRequest) -> ApiResult<Equipment> {
        let now = Utc::now();
        let status = normalize_optional(&data.status)
            .unwrap_or_else(|| DEFAULT_EQUIPMENT_STATUS.to_string());

        let result = sqlx::query(
            r#"INSERT INTO equipment (name, kind, status, acquired_on, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
            .bind(data.name.trim())
            .bind(normalize_optional(&data.kind))
            .bind(&status)
            .bind(data.acquired_on)
            .bind(now)
            .bind(now)
            .execute(pool)
            .await
            .map_err(|e| ApiError::from_write(e, "Equipment already recorded"))?;

        self.find(pool, result.last_insert_rowid()).await
    }

    async fn update(&self, pool: &SqlitePool, id: i64, data: UpdateEquipmentRequest) -> ApiResult<Equipment> {
        let current = self.find(pool, id).await?;

        sqlx::query(
            r#"UPDATE equipment SET name = ?, kind = ?, status = ?, acquired_on = ?, updated_at = ?
               WHERE id = ?"#,
        )
            .bind(merge_required(data.name, current.name))
            .bind(merge_optional(data.kind, current.kind))
            .bind(merge_required(data.status, current.status))
            .bind(data.acquired_on.or(current.acquired_on))
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;

        self.find(pool, id).await
    }
}
