/*!
 * # RIPS Health-Claims Data Library
 *
 * A Rust library for parsing, validating, and cross-referencing RIPS
 * (Registro Individual de Prestación de Servicios) healthcare billing files.
 *
 * ## Features
 *
 * - 🧩 **Segment Parsing**: marker-delimited flat files with a heuristic fallback for markerless inputs
 * - ✅ **Count Validation**: declared CT counts reconciled against parsed counts, per segment
 * - 📊 **Provider Aggregation**: cross-file billing summaries keyed by provider identity
 * - 🔗 **Enrichment**: column-name-tolerant joins against contract and coverage spreadsheets
 * - 🔍 **CUPS Cross-Reference**: per-code activity counts and frequency-of-use ratios
 * - 💾 **Exports**: JSON and normalized CSV report sheets
 * - 🛡️ **Resilient**: malformed lines are skipped, never fatal; results carry explicit ok/fail status
 *
 * ## Quick Start
 *
 * ```no_run
 * use rips::prelude::*;
 *
 * # fn main() -> Result<()> {
 * // Load every RIPS file in a directory, plus any recognized tables
 * let dataset = RipsDataset::load_standard("./data")?;
 *
 * // Per-file validation results
 * for validation in &dataset.validations {
 *     for check in validation.failures() {
 *         println!(
 *             "{}: segment {} expected {} found {}",
 *             validation.file_name, check.name, check.expected, check.found
 *         );
 *     }
 * }
 *
 * // Consolidated provider billing
 * for provider in dataset.providers.values() {
 *     println!("{}: {}", provider.provider_name, provider.total_value);
 * }
 *
 * // Export the report sheets
 * dataset.export_csv("report.csv")?;
 * # Ok(())
 * # }
 * ```
 *
 * ## Loading Data
 *
 * ```no_run
 * # use rips::prelude::*;
 * # fn main() -> Result<()> {
 * let dataset = RipsDatasetBuilder::new()
 *     .rips_file("data/AF440010095404.txt")
 *     .rips_file("data/AF440010095405.txt")
 *     .cups_dictionary("data/cups.csv")
 *     .contracts_table("data/especialidades.csv")
 *     .coverage_table("data/asiste.csv")
 *     .build()?;
 *
 * let report = dataset.coincidence_report()?;
 * println!("{} codes cross-referenced", report.records.len());
 * # Ok(())
 * # }
 * ```
 *
 * ## Configuration
 *
 * ```no_run
 * # use rips::prelude::*;
 * # fn main() -> Result<()> {
 * let config = ConfigBuilder::new()
 *     .progress_bar(false)
 *     .skip_unreadable_files(true)
 *     .build();
 * rips::config::set_global_config(config);
 * # Ok(())
 * # }
 * ```
 *
 * ## RIPS Files
 *
 * A RIPS submission bundles segments of typed records: AF (provider and
 * contract billing), CT (control counts), US (user registry) and the
 * clinical activity segments AC, AP, AT, AN, AH, AU. Segment blocks are
 * delimited by `ARCHIVO-RIPS-<CODE>` marker lines; files without markers
 * are classified line by line.
 */

// Re-export error types from root
pub use error::{RipsError, Result, ErrorContext, ExportFormat};

// Public modules
pub mod data_types;
pub mod schema;
pub mod error;
pub mod parser;
pub mod validate;
pub mod aggregate;
pub mod lookup;
pub mod enrich;
pub mod coincidence;
pub mod analytics;
pub mod reader;
pub mod dataset;
pub mod export;
pub mod config;
pub mod analyzer;

/// Prelude module for convenient imports
///
/// Import everything you need with:
/// ```
/// use rips::prelude::*;
/// ```
pub mod prelude {
    pub use crate::data_types::*;
    pub use crate::parser::{parse_segments, parse_segments_with};
    pub use crate::validate::{expected_counts, found_counts, validate_file};
    pub use crate::aggregate::{aggregate_files, extract_providers, merge_providers};
    pub use crate::lookup::TableIndex;
    pub use crate::enrich::{enrich_providers, AuxiliaryIndexes};
    pub use crate::coincidence::build_report;
    pub use crate::analytics::{collect_users, unique_users, ActivityRanking};
    pub use crate::reader::RipsReader;
    pub use crate::dataset::{RipsDataset, RipsDatasetBuilder, DatasetStatistics};
    pub use crate::export::{ReportExporter, JsonExporter, CsvExporter};
    pub use crate::error::{RipsError, Result};
    pub use crate::config::{ConfigBuilder, HeuristicThresholds};
    pub use crate::ExportFormat;
    #[cfg(feature = "analyze")]
    pub use crate::analyzer::{AnalyzerConfig, ErrorAnalyzer};
}

/// RIPS data constants
pub mod constants {
    /// Marker prefix delimiting segment blocks
    pub const SEGMENT_MARKER: &str = crate::schema::SEGMENT_MARKER;

    /// Control segment code
    pub const CONTROL_SEGMENT: &str = crate::schema::CONTROL_SEGMENT;

    /// Provider/contract billing segment code
    pub const PROVIDER_SEGMENT: &str = crate::schema::PROVIDER_SEGMENT;

    /// User registry segment code
    pub const USER_SEGMENT: &str = crate::schema::USER_SEGMENT;

    /// Activity segments scanned by the coincidence engine
    pub const ACTIVITY_SEGMENTS: [&str; 7] = crate::schema::ACTIVITY_SEGMENTS;
}

/// Common recipes and utility functions
pub mod cookbook {
    use crate::prelude::*;
    use std::collections::HashMap;

    /// Validate a set of already-loaded file contents, in order
    ///
    /// # Example
    /// ```
    /// # use rips::cookbook::validate_texts;
    /// let results = validate_texts(&[("a.txt", "ARCHIVO-RIPS-CT\nx,x,AF,0\nARCHIVO-RIPS-CT")]);
    /// assert_eq!(results.len(), 1);
    /// ```
    pub fn validate_texts(files: &[(&str, &str)]) -> Vec<FileValidation> {
        files
            .iter()
            .map(|(name, text)| validate_file(name, &parse_segments(text)))
            .collect()
    }

    /// Total billed value per regimen label across a provider map
    pub fn billed_by_regimen(providers: &ProviderMap) -> HashMap<String, f64> {
        let mut totals = HashMap::new();
        for provider in providers.values() {
            *totals.entry(provider.regimen.clone()).or_insert(0.0) += provider.total_value;
        }
        totals
    }

    /// Providers whose aggregates found no auxiliary row during enrichment
    pub fn unenriched_providers(providers: &ProviderMap) -> Vec<&ProviderAggregate> {
        providers.values().filter(|p| !p.is_enriched()).collect()
    }
}
