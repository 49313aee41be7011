// src/models/mod.rs

pub mod animal;
pub mod equipment;
pub mod feed;
pub mod headcount;
pub mod pasture;
pub mod pen;
pub mod supplier;
pub mod treatment;

pub use animal::*;
pub use equipment::*;
pub use feed::*;
pub use headcount::*;
pub use pasture::*;
pub use pen::*;
pub use supplier::*;
pub use treatment::*;

use serde::Serialize;

/// Figures shown on the administrator landing screen.
#[derive(Debug, Serialize)]
pub struct AdminDashboard {
    pub active_animals: i64,
    pub in_herd_animals: i64,
    pub unresolved_alerts: i64,
    pub total_counts: i64,
    pub latest_count: Option<CountReport>,
}

/// Figures shown on the caretaker landing screen.
#[derive(Debug, Serialize)]
pub struct CaretakerDashboard {
    pub roster_size: i64,
    pub recent_counts: Vec<Count>,
}
