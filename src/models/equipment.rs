// src/models/equipment.rs
use serde::{Deserialize, Serialize};
use validator::Validate;
use chrono::{DateTime, NaiveDate, Utc};

use crate::validator::validate_not_blank;

pub const DEFAULT_EQUIPMENT_STATUS: &str = "operational";

/// Farm machinery and tools.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Equipment {
    pub id: i64,
    pub name: String,
    pub kind: Option<String>,
    pub status: String,
    pub acquired_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEquipmentRequest {
    #[validate(
        length(max = 255, message = "Equipment name cannot exceed 255 characters"),
        custom(function = "validate_not_blank")
    )]
    pub name: String,

    #[validate(length(max = 100, message = "Kind cannot exceed 100 characters"))]
    pub kind: Option<String>,

    #[validate(
        length(max = 50, message = "Status cannot exceed 50 characters"),
        custom(function = "validate_not_blank")
    )]
    pub status: Option<String>,

    pub acquired_on: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateEquipmentRequest {
    #[validate(
        length(max = 255, message = "Equipment name cannot exceed 255 characters"),
        custom(function = "validate_not_blank")
    )]
    pub name: Option<String>,

    #[validate(length(max = 100, message = "Kind cannot exceed 100 characters"))]
    pub kind: Option<String>,

    #[validate(
        length(max = 50, message = "Status cannot exceed 50 characters"),
        custom(function = "validate_not_blank")
    )]
    pub status: Option<String>,

    pub acquired_on: Option<NaiveDate>,
}
