// src/models/feed.rs
use serde::{Deserialize, Serialize};
use validator::Validate;
use chrono::{DateTime, Utc};

use crate::validator::validate_not_blank;

/// Feed stock on hand.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Feed {
    pub id: i64,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub supplier_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateFeedRequest {
    #[validate(
        length(max = 255, message = "Feed name cannot exceed 255 characters"),
        custom(function = "validate_not_blank")
    )]
    pub name: String,

    #[validate(range(min = 0.0, message = "Quantity must be non-negative"))]
    pub quantity: f64,

    #[validate(
        length(max = 20, message = "Unit cannot exceed 20 characters"),
        custom(function = "validate_not_blank")
    )]
    pub unit: String,

    pub supplier_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateFeedRequest {
    #[validate(
        length(max = 255, message = "Feed name cannot exceed 255 characters"),
        custom(function = "validate_not_blank")
    )]
    pub name: Option<String>,

    #[validate(range(min = 0.0, message = "Quantity must be non-negative"))]
    pub quantity: Option<f64>,

    #[validate(
        length(max = 20, message = "Unit cannot exceed 20 characters"),
        custom(function = "validate_not_blank")
    )]
    pub unit: Option<String>,

    pub supplier_id: Option<i64>,
}
