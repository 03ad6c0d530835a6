//! Ranking arithmetic shared by every store backend.
//!
//! The Postgres backend renders the same formulas into SQL from the constants below, so the two
//! backends stay in lockstep.

use time::OffsetDateTime;

/// Weight of the logarithmic popularity boost in the hybrid score.
pub const POPULARITY_WEIGHT: f64 = 0.1;
/// How many views one useful vote is worth in the hybrid score.
pub const SEARCH_USEFUL_WEIGHT: f64 = 10.0;
/// How many views one useful vote is worth in the trending score.
pub const TRENDING_USEFUL_WEIGHT: f64 = 5.0;
/// Hours added to the age before decay, so brand new issues do not divide by ~0.
pub const TRENDING_AGE_OFFSET_HOURS: f64 = 2.0;
pub const TRENDING_GRAVITY: f64 = 1.5;

/// Cosine of the angle between `a` and `b`.
///
/// Returns `0.0` when either vector has zero norm or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
	if a.len() != b.len() {
		return 0.0;
	}

	let mut dot = 0.0_f64;
	let mut norm_a = 0.0_f64;
	let mut norm_b = 0.0_f64;

	for (&x, &y) in a.iter().zip(b) {
		let (x, y) = (f64::from(x), f64::from(y));

		dot += x * y;
		norm_a += x * x;
		norm_b += y * y;
	}

	if norm_a == 0.0 || norm_b == 0.0 {
		return 0.0;
	}

	dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// `sim * (1 + 0.1 * ln(views + 10 * useful + 1))`.
pub fn hybrid_score(similarity: f64, view_count: u64, useful_count: u64) -> f64 {
	let engagement = view_count as f64 + SEARCH_USEFUL_WEIGHT * useful_count as f64 + 1.0;

	similarity * (1.0 + POPULARITY_WEIGHT * engagement.ln())
}

/// `(views + 5 * useful + 1) / (age_hours + 2)^1.5`.
pub fn trending_score(view_count: u64, useful_count: u64, age_hours: f64) -> f64 {
	let engagement = view_count as f64 + TRENDING_USEFUL_WEIGHT * useful_count as f64 + 1.0;

	engagement / (age_hours.max(0.0) + TRENDING_AGE_OFFSET_HOURS).powf(TRENDING_GRAVITY)
}

/// Hours elapsed between `created_at` and `now`, clamped at zero.
pub fn age_hours(created_at: OffsetDateTime, now: OffsetDateTime) -> f64 {
	((now - created_at).as_seconds_f64() / 3_600.0).max(0.0)
}
