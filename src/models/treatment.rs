// src/models/treatment.rs
use serde::{Deserialize, Serialize};
use validator::Validate;
use chrono::{DateTime, NaiveDate, Utc};

use crate::validator::validate_not_blank;

/// Veterinary treatment given to one animal. Removed together with the animal row.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Treatment {
    pub id: i64,
    pub animal_id: i64,
    pub name: String,
    pub medication: Option<String>,
    pub dose: Option<String>,
    pub administered_on: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTreatmentRequest {
    pub animal_id: i64,

    #[validate(
        length(max = 255, message = "Treatment name cannot exceed 255 characters"),
        custom(function = "validate_not_blank")
    )]
    pub name: String,

    #[validate(length(max = 255, message = "Medication cannot exceed 255 characters"))]
    pub medication: Option<String>,

    #[validate(length(max = 100, message = "Dose cannot exceed 100 characters"))]
    pub dose: Option<String>,

    /// Defaults to today.
    pub administered_on: Option<NaiveDate>,

    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTreatmentRequest {
    #[validate(
        length(max = 255, message = "Treatment name cannot exceed 255 characters"),
        custom(function = "validate_not_blank")
    )]
    pub name: Option<String>,

    #[validate(length(max = 255, message = "Medication cannot exceed 255 characters"))]
    pub medication: Option<String>,

    #[validate(length(max = 100, message = "Dose cannot exceed 100 characters"))]
    pub dose: Option<String>,

    pub administered_on: Option<NaiveDate>,

    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,
}
