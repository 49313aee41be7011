// src/models/animal.rs
use serde::{Deserialize, Serialize};
use validator::Validate;
use chrono::{DateTime, Utc};

use crate::validator::validate_not_blank;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Animal {
    pub id: i64,
    pub code: String,
    pub animal_type: String,
    pub name: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Herd status of an animal.
///
/// `InHerd` animals make up the roll-call roster; `Inactive` marks a soft-deleted
/// animal. Any other value is kept verbatim (sold, quarantined, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnimalStatus {
    InHerd,
    Inactive,
    Other(String),
}

impl AnimalStatus {
    pub const IN_HERD: &'static str = "InHerd";
    pub const INACTIVE: &'static str = "Inactive";

    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        let key: String = trimmed
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "inherd" | "enrebaño" | "enrebano" => AnimalStatus::InHerd,
            "inactive" | "inactivo" => AnimalStatus::Inactive,
            _ => AnimalStatus::Other(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AnimalStatus::InHerd => Self::IN_HERD,
            AnimalStatus::Inactive => Self::INACTIVE,
            AnimalStatus::Other(s) => s,
        }
    }
}

impl Default for AnimalStatus {
    fn default() -> Self {
        AnimalStatus::InHerd
    }
}

/// Leading part of an animal code: the first three characters of the type,
/// uppercased. The stored code appends `-NNN`, the 1-based sequence of the type.
pub fn code_prefix(animal_type: &str) -> String {
    animal_type.trim().chars().take(3).collect::<String>().to_uppercase()
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAnimalRequest {
    #[validate(
        length(max = 50, message = "Type cannot exceed 50 characters"),
        custom(function = "validate_not_blank")
    )]
    pub animal_type: String,

    #[validate(length(max = 100, message = "Name cannot exceed 100 characters"))]
    pub name: Option<String>,

    #[validate(
        length(max = 50, message = "Status cannot exceed 50 characters"),
        custom(function = "validate_not_blank")
    )]
    pub status: Option<String>,
}

/// Partial update. A present but empty `name` clears the name.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAnimalRequest {
    #[validate(
        length(max = 50, message = "Type cannot exceed 50 characters"),
        custom(function = "validate_not_blank")
    )]
    pub animal_type: Option<String>,

    #[validate(length(max = 100, message = "Name cannot exceed 100 characters"))]
    pub name: Option<String>,

    #[validate(
        length(max = 50, message = "Status cannot exceed 50 characters"),
        custom(function = "validate_not_blank")
    )]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_prefix() {
        assert_eq!(code_prefix("Vaca"), "VAC");
        assert_eq!(code_prefix("oveja"), "OVE");
        assert_eq!(code_prefix("Ox"), "OX");
        assert_eq!(code_prefix("ñandú"), "ÑAN");
        assert_eq!(code_prefix("  Cabra "), "CAB");
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(AnimalStatus::parse("InHerd"), AnimalStatus::InHerd);
        assert_eq!(AnimalStatus::parse("in herd"), AnimalStatus::InHerd);
        assert_eq!(AnimalStatus::parse("En rebaño"), AnimalStatus::InHerd);
        assert_eq!(AnimalStatus::parse("inactivo"), AnimalStatus::Inactive);
        assert_eq!(AnimalStatus::parse(" Sold "), AnimalStatus::Other("Sold".to_string()));
        assert_eq!(AnimalStatus::parse("Sold").as_str(), "Sold");
        assert_eq!(AnimalStatus::default().as_str(), "InHerd");
    }

    #[test]
    fn test_create_request_rejects_blank_type() {
        let request = CreateAnimalRequest {
            animal_type: "  ".to_string(),
            name: None,
            status: None,
        };
        assert!(request.validate().is_err());

        let request = CreateAnimalRequest {
            animal_type: "Vaca".to_string(),
            name: Some("Lola".to_string()),
            status: Some(String::new()),
        };
        assert!(request.validate().is_err());
    }
}
