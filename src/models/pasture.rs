// src/models/pasture.rs
use serde::{Deserialize, Serialize};
use validator::Validate;
use chrono::{DateTime, Utc};

use crate::validator::validate_not_blank;

pub const DEFAULT_PASTURE_STATUS: &str = "available";

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Pasture {
    pub id: i64,
    pub name: String,
    pub area_hectares: Option<f64>,
    pub grass_type: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePastureRequest {
    #[validate(
        length(max = 100, message = "Pasture name cannot exceed 100 characters"),
        custom(function = "validate_not_blank")
    )]
    pub name: String,

    #[validate(range(exclusive_min = 0.0, message = "Area must be positive"))]
    pub area_hectares: Option<f64>,

    #[validate(length(max = 100, message = "Grass type cannot exceed 100 characters"))]
    pub grass_type: Option<String>,

    #[validate(
        length(max = 50, message = "Status cannot exceed 50 characters"),
        custom(function = "validate_not_blank")
    )]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePastureRequest {
    #[validate(
        length(max = 100, message = "Pasture name cannot exceed 100 characters"),
        custom(function = "validate_not_blank")
    )]
    pub name: Option<String>,

    #[validate(range(exclusive_min = 0.0, message = "Area must be positive"))]
    pub area_hectares: Option<f64>,

    #[validate(length(max = 100, message = "Grass type cannot exceed 100 characters"))]
    pub grass_type: Option<String>,

    #[validate(
        length(max = 50, message = "Status cannot exceed 50 characters"),
        custom(function = "validate_not_blank")
    )]
    pub status: Option<String>,
}
