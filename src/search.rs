//! Doctor search with rating aggregates and optional distance ordering.

use std::cmp::Ordering;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::repository::{self, DoctorFilter};
use crate::error::{PortalError, PortalResult};
use crate::models::*;

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSort {
    #[default]
    Rating,
    Distance,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorSearch {
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub min_rating: Option<f64>,
    #[serde(default)]
    pub pincode: Option<String>,
    #[serde(default)]
    pub sort: SearchSort,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorSearchResult {
    pub doctor: DoctorProfile,
    pub ratings: RatingSummary,
    /// Great-circle distance from the searching patient, when both
    /// sides have coordinates.
    pub distance_km: Option<f64>,
}

/// Great-circle distance in kilometres between two (lat, lon) points.
pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = (from.0.to_radians(), from.1.to_radians());
    let (lat2, lon2) = (to.0.to_radians(), to.1.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// `None` sorts after every `Some`.
fn none_last(a: Option<f64>, b: Option<f64>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => {
            let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Search doctors for `patient`.
///
/// Unreviewed doctors pass any `min_rating` and sort after rated ones.
/// Distance sorting needs the patient's coordinates and falls back to
/// rating order without them.
pub fn search_doctors(
    conn: &Connection,
    patient: &PatientProfile,
    search: &DoctorSearch,
) -> PortalResult<Vec<DoctorSearchResult>> {
    if let Some(min) = search.min_rating {
        if !min.is_finite() || !(0.0..=10.0).contains(&min) {
            return Err(PortalError::validation("min_rating must be between 0 and 10"));
        }
    }
    let specialty = search.specialty.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let pincode = search.pincode.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let filter = DoctorFilter {
        specialty,
        pincode,
        min_rating: search.min_rating,
    };
    let origin = patient.coordinates();
    let mut results: Vec<DoctorSearchResult> = repository::search_doctor_rows(conn, &filter)?
        .into_iter()
        .map(|(doctor, ratings)| {
            let distance_km = origin
                .zip(doctor.coordinates())
                .map(|(from, to)| haversine_km(from, to));
            DoctorSearchResult {
                doctor,
                ratings,
                distance_km,
            }
        })
        .collect();

    // Rows arrive ordered by name; stable sorts keep that as the tiebreak.
    match (search.sort, origin) {
        (SearchSort::Distance, Some(_)) => {
            results.sort_by(|a, b| none_last(a.distance_km, b.distance_km, false));
        }
        _ => {
            results.sort_by(|a, b| {
                none_last(a.ratings.avg_overall, b.ratings.avg_overall, true)
                    .then_with(|| b.ratings.review_count.cmp(&a.ratings.review_count))
            });
        }
    }

    tracing::debug!(
        patient_id = %patient.id,
        specialty = ?specialty,
        sort = ?search.sort,
        results = results.len(),
        "Doctor search"
    );
    Ok(results)
}
