//! Data quality scoring.
//!
//! Two entry points exist. [`QualityScorer::score`] is the base completeness
//! ratio computed from parsed rows. [`QualityScorer::adjust`] layers fixed
//! bonuses for volume and schema shape on top of a profile's score.

use tracing::debug;

use crate::core::DataProfile;

/// Bonuses applied by [`QualityScorer::adjust`].
#[derive(Debug, Clone, PartialEq)]
pub struct QualityBonuses {
    /// Row count above which the volume bonus applies
    pub large_volume_rows: u64,
    pub large_volume: f64,
    /// Field count above which the wide-schema bonus applies
    pub wide_schema_fields: usize,
    pub wide_schema: f64,
    /// Bonus when any field name contains `id`
    pub identifier: f64,
    /// Bonus when any field name contains `time` or `date`
    pub temporal: f64,
}

impl Default for QualityBonuses {
    fn default() -> Self {
        Self {
            large_volume_rows: 1000,
            large_volume: 0.10,
            wide_schema_fields: 5,
            wide_schema: 0.05,
            identifier: 0.10,
            temporal: 0.05,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QualityScorer {
    bonuses: QualityBonuses,
}

impl QualityScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bonuses(bonuses: QualityBonuses) -> Self {
        Self { bonuses }
    }

    /// Completeness ratio `1 - empty / total` over data rows (header excluded).
    ///
    /// A cell is empty when it is blank after trimming. Zero rows, or rows
    /// with no cells at all, score 0.0.
    pub fn score<R, C>(rows: &[R]) -> f64
    where
        R: AsRef<[C]>,
        C: AsRef<str>,
    {
        let mut total = 0usize;
        let mut empty = 0usize;
        for row in rows {
            for cell in row.as_ref() {
                total += 1;
                if cell.as_ref().trim().is_empty() {
                    empty += 1;
                }
            }
        }

        if total == 0 {
            return 0.0;
        }
        1.0 - (empty as f64 / total as f64)
    }

    /// Applies the profile-level bonuses to the profile's base score, clamped to [0, 1].
    pub fn adjust(&self, profile: &DataProfile) -> f64 {
        let mut score = profile.data_quality_score;
        let b = &self.bonuses;

        if profile.total_rows > b.large_volume_rows {
            score += b.large_volume;
        }
        if profile.fields.len() > b.wide_schema_fields {
            score += b.wide_schema;
        }

        let names: Vec<String> = profile
            .fields
            .iter()
            .map(|f| f.name.to_lowercase())
            .collect();
        if names.iter().any(|n| n.contains("id")) {
            score += b.identifier;
        }
        if names.iter().any(|n| n.contains("time") || n.contains("date")) {
            score += b.temporal;
        }

        let adjusted = score.clamp(0.0, 1.0);
        debug!(
            base = profile.data_quality_score,
            adjusted, "Adjusted profile quality score"
        );
        adjusted
    }
}
