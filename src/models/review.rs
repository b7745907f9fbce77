use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorReview {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub cost_rating: u8,
    pub hospitality_rating: u8,
    pub med_rec_rating: u8,
    pub overall_rating: u8,
    pub comment: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Per-doctor averages over all reviews. Averages are `None` when the
/// doctor has no reviews yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub review_count: i64,
    pub avg_overall: Option<f64>,
    pub avg_cost: Option<f64>,
    pub avg_hospitality: Option<f64>,
    pub avg_med_rec: Option<f64>,
}
