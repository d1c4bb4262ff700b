//! Storage-system decision for a profile.
//!
//! The primary system is a pure function of `(total_rows, quality_score, data_type)`,
//! evaluated top to bottom:
//!
//! | condition                          | primary    | secondary             |
//! |------------------------------------|------------|-----------------------|
//! | `total_rows > 1,000,000`           | ClickHouse | HDFS, PostgreSQL      |
//! | `quality > 0.8` and format is CSV  | PostgreSQL | ClickHouse, HDFS      |
//! | otherwise                          | PostgreSQL | ClickHouse, HDFS      |

use crate::core::{
    DataFormat, DataProfile, StorageOption, StorageOptions, StorageReasoning,
    StorageRecommendation, StorageSystem,
};

/// Row count above which the columnar store is chosen.
pub const LARGE_VOLUME_ROWS: u64 = 1_000_000;

/// Quality above which clean CSV goes to the relational store.
pub const CLEAN_CSV_QUALITY: f64 = 0.8;

#[derive(Debug, Clone)]
pub struct StorageAdvisor {
    large_volume_rows: u64,
}

impl Default for StorageAdvisor {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageAdvisor {
    pub fn new() -> Self {
        Self {
            large_volume_rows: LARGE_VOLUME_ROWS,
        }
    }

    /// Applies the decision table. Returns the primary system and the ordered alternatives.
    #[allow(clippy::if_same_then_else)]
    pub fn choose(
        &self,
        total_rows: u64,
        quality_score: f64,
        data_type: DataFormat,
    ) -> (StorageSystem, Vec<StorageSystem>) {
        use StorageSystem::*;

        if total_rows > self.large_volume_rows {
            (ClickHouse, vec![Hdfs, PostgreSQL])
        } else if quality_score > CLEAN_CSV_QUALITY && data_type == DataFormat::Csv {
            (PostgreSQL, vec![ClickHouse, Hdfs])
        } else {
            (PostgreSQL, vec![ClickHouse, Hdfs])
        }
    }

    pub fn recommend(&self, profile: &DataProfile) -> StorageRecommendation {
        let (primary, secondary) = self.choose(
            profile.total_rows,
            profile.data_quality_score,
            profile.data_type,
        );

        let reasoning = StorageReasoning {
            file_type: profile.data_type,
            data_volume: profile.total_rows,
            quality_score: profile.data_quality_score,
            rationale: format!(
                "{primary} is suitable for data with {} rows and quality {:.2}",
                profile.total_rows, profile.data_quality_score
            ),
        };

        StorageRecommendation {
            primary_storage: primary,
            secondary_storage: secondary,
            reasoning,
            storage_options: storage_options(primary),
        }
    }
}

fn storage_options(primary: StorageSystem) -> StorageOptions {
    let option = |system: StorageSystem, reasons: &[&str]| StorageOption {
        suitable: system == primary,
        reasons: reasons.iter().map(|r| r.to_string()).collect(),
    };

    StorageOptions {
        postgresql: option(
            StorageSystem::PostgreSQL,
            &[
                "Structured relational data",
                "Good fit for high-quality data",
                "ACID transactions",
            ],
        ),
        clickhouse: option(
            StorageSystem::ClickHouse,
            &["Fast analytical queries", "Columnar compression"],
        ),
        hdfs: option(
            StorageSystem::Hdfs,
            &["Horizontal scalability", "Fault tolerance"],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_large_volume_goes_to_clickhouse() {
        let (primary, secondary) =
            StorageAdvisor::new().choose(1_000_001, 0.99, DataFormat::Csv);
        assert_eq!(primary, StorageSystem::ClickHouse);
        assert_eq!(secondary, vec![StorageSystem::Hdfs, StorageSystem::PostgreSQL]);
    }

    #[test]
    fn test_boundary_volume_stays_relational() {
        let (primary, _) = StorageAdvisor::new().choose(1_000_000, 0.1, DataFormat::Json);
        assert_eq!(primary, StorageSystem::PostgreSQL);
    }

    #[test]
    fn test_default_tier() {
        for format in [DataFormat::Csv, DataFormat::Json, DataFormat::Xml] {
            let (primary, secondary) = StorageAdvisor::new().choose(10, 0.5, format);
            assert_eq!(primary, StorageSystem::PostgreSQL);
            assert_eq!(
                secondary,
                vec![StorageSystem::ClickHouse, StorageSystem::Hdfs]
            );
        }
    }

    #[test]
    fn test_options_always_list_all_systems() {
        let options = storage_options(StorageSystem::ClickHouse);
        assert!(!options.postgresql.suitable);
        assert!(options.clickhouse.suitable);
        assert!(!options.hdfs.suitable);
        for system in StorageSystem::ALL {
            assert!(!options.get(system).reasons.is_empty());
        }
    }
}
