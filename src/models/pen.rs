// src/models/pen.rs
use serde::{Deserialize, Serialize};
use validator::Validate;
use chrono::{DateTime, Utc};

use crate::validator::validate_not_blank;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Pen {
    pub id: i64,
    pub name: String,
    pub capacity: Option<i64>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePenRequest {
    #[validate(
        length(max = 100, message = "Pen name cannot exceed 100 characters"),
        custom(function = "validate_not_blank")
    )]
    pub name: String,

    #[validate(range(min = 1, message = "Capacity must be at least 1"))]
    pub capacity: Option<i64>,

    #[validate(length(max = 255, message = "Location cannot exceed 255 characters"))]
    pub location: Option<String>,

    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePenRequest {
    #[validate(
        length(max = 100, message = "Pen name cannot exceed 100 characters"),
        custom(function = "validate_not_blank")
    )]
    pub name: Option<String>,

    #[validate(range(min = 1, message = "Capacity must be at least 1"))]
    pub capacity: Option<i64>,

    #[validate(length(max = 255, message = "Location cannot exceed 255 characters"))]
    pub location: Option<String>,

    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,
}
