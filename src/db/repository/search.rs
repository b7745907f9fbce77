use rusqlite::{params, Connection};

use super::profile::{doctor_from_row, DOCTOR_COLUMNS};
use crate::db::DatabaseError;
use crate::models::*;

/// Storage-side doctor filters. `None` means "no filter".
#[derive(Debug, Clone, Default)]
pub struct DoctorFilter<'a> {
    /// Case-insensitive substring of the specialty.
    pub specialty: Option<&'a str>,
    pub pincode: Option<&'a str>,
    /// Minimum average overall rating. Unreviewed doctors always pass.
    pub min_rating: Option<f64>,
}

/// Escape `%`, `_` and `\` so user text matches literally under `ESCAPE '\'`.
fn like_pattern(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len() + 2);
    escaped.push('%');
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Doctors joined with their review aggregate, by name.
pub fn search_doctor_rows(
    conn: &Connection,
    filter: &DoctorFilter<'_>,
) -> Result<Vec<(DoctorProfile, RatingSummary)>, DatabaseError> {
    let sql = format!(
        "SELECT {DOCTOR_COLUMNS}, COALESCE(r.review_count, 0), r.avg_overall, r.avg_cost,
             r.avg_hospitality, r.avg_med_rec
         FROM doctor_profiles
         LEFT JOIN (
             SELECT doctor_id, COUNT(*) AS review_count, AVG(overall_rating) AS avg_overall,
                 AVG(cost_rating) AS avg_cost, AVG(hospitality_rating) AS avg_hospitality,
                 AVG(med_rec_rating) AS avg_med_rec
             FROM doctor_reviews GROUP BY doctor_id
         ) r ON r.doctor_id = doctor_profiles.id
         WHERE (?1 IS NULL OR specialty LIKE ?1 ESCAPE '\\')
           AND (?2 IS NULL OR pincode = ?2)
           AND (?3 IS NULL OR r.avg_overall IS NULL OR r.avg_overall >= ?3)
         ORDER BY full_name ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![
            filter.specialty.map(like_pattern),
            filter.pincode,
            filter.min_rating,
        ],
        |row| {
            let doctor = doctor_from_row(row)?;
            let summary = RatingSummary {
                review_count: row.get(12)?,
                avg_overall: row.get(13)?,
                avg_cost: row.get(14)?,
                avg_hospitality: row.get(15)?,
                avg_med_rec: row.get(16)?,
            };
            Ok((doctor, summary))
        },
    )?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}
