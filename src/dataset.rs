/*!
 * Unified dataset API for RIPS data
 *
 * Provides a builder pattern and unified interface for loading a batch of
 * RIPS files together with the optional CUPS dictionary and auxiliary
 * tables, running the full pipeline: parse, validate, aggregate, enrich.
 *
 * Files are processed in the caller-supplied order; parsing each file is a
 * pure computation (parallelized under the `parallel` feature) and the
 * provider merge is a sequential fold, so outputs are reproducible for
 * identical inputs.
 */

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::aggregate::aggregate_files;
use crate::analytics::{activity_ranking, collect_users, unique_users, ActivityRanking};
use crate::coincidence::{build_report, unique_patient_count};
use crate::config::global_config;
use crate::data_types::{
    AnalysisTarget, CoincidenceReport, CupsEntry, FileValidation, ProviderMap, SegmentCheck,
    SegmentMap, UserRecord,
};
use crate::enrich::{enrich_providers, AuxiliaryIndexes};
use crate::parser::parse_segments_with;
use crate::reader::RipsReader;
use crate::validate::validate_file;
use crate::{Result, RipsError};

/// Builder for loading a complete RIPS dataset
///
/// # Example
/// ```no_run
/// # use rips::dataset::RipsDatasetBuilder;
/// let dataset = RipsDatasetBuilder::new()
///     .rips_file("data/AF440010095404.txt")
///     .rips_file("data/AF440010095405.txt")
///     .cups_dictionary("data/cups.csv")
///     .contracts_table("data/especialidades.csv")
///     .coverage_table("data/asiste.csv")
///     .build()?;
/// # Ok::<(), rips::RipsError>(())
/// ```
pub struct RipsDatasetBuilder {
    rips_paths: Vec<PathBuf>,
    cups_path: Option<PathBuf>,
    contracts_path: Option<PathBuf>,
    coverage_path: Option<PathBuf>,
    skip_unreadable_files: bool,
    #[cfg(feature = "progress")]
    show_progress: bool,
}

impl Default for RipsDatasetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RipsDatasetBuilder {
    /// Create a new dataset builder
    pub fn new() -> Self {
        Self {
            rips_paths: Vec::new(),
            cups_path: None,
            contracts_path: None,
            coverage_path: None,
            skip_unreadable_files: false,
            #[cfg(feature = "progress")]
            show_progress: true,
        }
    }

    /// Add one RIPS file; call order fixes the processing order
    pub fn rips_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.rips_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Add several RIPS files, preserving iteration order
    pub fn rips_files<P, I>(mut self, paths: I) -> Self
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = P>,
    {
        self.rips_paths
            .extend(paths.into_iter().map(|p| p.as_ref().to_path_buf()));
        self
    }

    /// Set the path to the CUPS dictionary
    pub fn cups_dictionary<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.cups_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the path to the contracts table (joined by contract number)
    pub fn contracts_table<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.contracts_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the path to the coverage table (joined by tax-ID)
    pub fn coverage_table<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.coverage_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enable or disable skipping unreadable files
    pub fn skip_unreadable_files(mut self, skip: bool) -> Self {
        self.skip_unreadable_files = skip;
        self
    }

    #[cfg(feature = "progress")]
    /// Enable or disable progress bars
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Build the dataset, loading and processing all specified files
    pub fn build(self) -> Result<RipsDataset> {
        if self.rips_paths.is_empty() {
            return Err(RipsError::Custom {
                message: "No RIPS files specified".to_string(),
                suggestion: Some("Use .rips_file() or .rips_files() to add input files".to_string()),
            });
        }

        let reader = RipsReader::new().with_skip_unreadable_files(self.skip_unreadable_files);
        #[cfg(feature = "progress")]
        let reader = reader.with_progress_bar(self.show_progress);

        let texts = reader.load_rips_files(&self.rips_paths)?;
        let thresholds = global_config().heuristic;

        // Per-file parsing is pure; order of the result vector matches the
        // input order regardless of execution order.
        #[cfg(feature = "parallel")]
        let parsed: Vec<(String, SegmentMap)> = {
            use rayon::prelude::*;
            texts
                .par_iter()
                .map(|(name, text)| (name.clone(), parse_segments_with(text, &thresholds)))
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let parsed: Vec<(String, SegmentMap)> = texts
            .iter()
            .map(|(name, text)| (name.clone(), parse_segments_with(text, &thresholds)))
            .collect();

        let validations: Vec<FileValidation> = parsed
            .iter()
            .map(|(name, segments)| validate_file(name, segments))
            .collect();

        let providers = aggregate_files(
            parsed
                .iter()
                .map(|(name, segments)| (name.as_str(), segments)),
        );

        let mut segments = SegmentMap::new();
        for (_, file_segments) in parsed {
            segments.merge(file_segments);
        }

        let contracts_table = self
            .contracts_path
            .map(|path| reader.load_table(path))
            .transpose()?;
        let coverage_table = self
            .coverage_path
            .map(|path| reader.load_table(path))
            .transpose()?;
        let indexes = AuxiliaryIndexes::build(contracts_table.as_deref(), coverage_table.as_deref());

        let cups = self
            .cups_path
            .map(|path| reader.load_cups_dictionary(path))
            .transpose()?
            .unwrap_or_default();

        let providers = enrich_providers(&providers, &indexes);

        Ok(RipsDataset {
            file_names: texts.iter().map(|(name, _)| name.clone()).collect(),
            texts,
            validations,
            providers,
            segments,
            cups,
            indexes,
        })
    }

    /// Build a dataset from a directory of data files.
    ///
    /// `*.txt` files, sorted by name, are taken as RIPS inputs; delimited
    /// tables are recognized by name: `cups` selects the dictionary,
    /// `contrato`/`especialidad` the contracts table, `asiste`/`cobertura`
    /// the coverage table.
    pub fn from_directory<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();

        if !dir.is_dir() {
            return Err(RipsError::Custom {
                message: format!("'{}' is not a directory", dir.display()),
                suggestion: Some("Provide a directory path containing RIPS data files".to_string()),
            });
        }

        let mut builder = Self::new();
        let mut rips_paths = Vec::new();

        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("")
                .to_lowercase();

            if filename.ends_with(".txt") {
                rips_paths.push(path);
            } else if filename.contains("cups") {
                builder = builder.cups_dictionary(path);
            } else if filename.contains("contrato") || filename.contains("especialidad") {
                builder = builder.contracts_table(path);
            } else if filename.contains("asiste") || filename.contains("cobertura") {
                builder = builder.coverage_table(path);
            }
        }

        rips_paths.sort();
        Ok(builder.rips_files(rips_paths))
    }
}

/// Unified RIPS dataset: parsed segments, validation results, enriched
/// provider aggregates and the optional CUPS dictionary
pub struct RipsDataset {
    /// Processed file names, in processing order
    pub file_names: Vec<String>,
    /// Raw file contents, kept for error-analysis context
    texts: Vec<(String, String)>,
    /// Per-file validation results, in processing order
    pub validations: Vec<FileValidation>,
    /// Enriched provider aggregates
    pub providers: ProviderMap,
    /// Cross-file union of all parsed segments
    pub segments: SegmentMap,
    /// CUPS dictionary entries, empty when no dictionary was loaded
    pub cups: Vec<CupsEntry>,
    /// Auxiliary lookup indexes used for enrichment
    indexes: AuxiliaryIndexes,
}

impl RipsDataset {
    /// Load a dataset from a directory of data files
    ///
    /// # Example
    /// ```no_run
    /// # use rips::dataset::RipsDataset;
    /// let dataset = RipsDataset::load_standard("./data")?;
    /// # Ok::<(), rips::RipsError>(())
    /// ```
    pub fn load_standard<P: AsRef<Path>>(dir: P) -> Result<Self> {
        RipsDatasetBuilder::from_directory(dir)?.build()
    }

    /// Number of files processed
    pub fn len(&self) -> usize {
        self.file_names.len()
    }

    /// Whether the dataset holds no files
    pub fn is_empty(&self) -> bool {
        self.file_names.is_empty()
    }

    /// Raw text of a processed file
    pub fn file_text(&self, file_name: &str) -> Option<&str> {
        self.texts
            .iter()
            .find(|(name, _)| name == file_name)
            .map(|(_, text)| text.as_str())
    }

    /// The auxiliary indexes backing enrichment
    pub fn indexes(&self) -> &AuxiliaryIndexes {
        &self.indexes
    }

    /// Parsed user registry, in file order
    pub fn users(&self) -> Vec<UserRecord> {
        collect_users(&self.segments)
    }

    /// Deduplicated user registry, keyed by document number
    pub fn unique_users(&self) -> BTreeMap<String, UserRecord> {
        unique_users(self.users())
    }

    /// Unique patients across all US segments
    pub fn unique_user_count(&self) -> usize {
        unique_patient_count(&self.segments)
    }

    /// Build the coincidence report from the loaded CUPS dictionary
    pub fn coincidence_report(&self) -> Result<CoincidenceReport> {
        if self.cups.is_empty() {
            return Err(RipsError::Custom {
                message: "No CUPS dictionary loaded".to_string(),
                suggestion: Some(
                    "Add .cups_dictionary(path) to the builder before requesting the report"
                        .to_string(),
                ),
            });
        }
        Ok(build_report(
            &self.cups,
            &self.segments,
            &self.providers,
            &self.indexes,
        ))
    }

    /// Rank dictionary codes by activity occurrences
    pub fn activity_ranking(&self, limit: usize) -> Vec<ActivityRanking> {
        activity_ranking(&self.cups, &self.segments, limit)
    }

    /// Assemble the context for the external error analyzer from a failed
    /// segment check
    pub fn analysis_target(
        &self,
        validation: &FileValidation,
        check: &SegmentCheck,
    ) -> Option<AnalysisTarget> {
        let content = self.file_text(&validation.file_name)?;
        Some(AnalysisTarget {
            file_name: validation.file_name.clone(),
            segment: check.name.as_str().to_string(),
            expected: check.expected,
            found: check.found,
            file_content: content.to_string(),
        })
    }

    /// Get dataset statistics
    pub fn statistics(&self) -> DatasetStatistics {
        DatasetStatistics::from_dataset(self)
    }
}

/// Dataset statistics
#[derive(Debug, Clone)]
pub struct DatasetStatistics {
    pub files_loaded: usize,
    pub files_passed: usize,
    pub files_failed: usize,
    pub segment_types: usize,
    pub total_lines: usize,
    pub providers: usize,
    pub total_billed_value: f64,
    pub unique_patients: usize,
    pub cups_entries: usize,
}

impl DatasetStatistics {
    /// Calculate statistics from a dataset
    pub fn from_dataset(dataset: &RipsDataset) -> Self {
        let files_passed = dataset.validations.iter().filter(|v| v.passed()).count();

        Self {
            files_loaded: dataset.len(),
            files_passed,
            files_failed: dataset.len() - files_passed,
            segment_types: dataset.segments.segment_count(),
            total_lines: dataset.segments.total_lines(),
            providers: dataset.providers.len(),
            total_billed_value: dataset.providers.values().map(|p| p.total_value).sum(),
            unique_patients: dataset.unique_user_count(),
            cups_entries: dataset.cups.len(),
        }
    }

    /// Print a formatted summary of the statistics
    pub fn print_summary(&self) {
        println!("=== RIPS Dataset Statistics ===");
        println!("Files Loaded: {}", self.files_loaded);
        println!(
            "  Passed validation: {} / Failed: {}",
            self.files_passed, self.files_failed
        );
        println!("Segment Types: {}", self.segment_types);
        println!("Total Record Lines: {}", self.total_lines);
        println!("Providers: {}", self.providers);
        println!(
            "Total Billed Value: {}",
            crate::export::format_currency(self.total_billed_value)
        );
        println!("Unique Patients: {}", self.unique_patients);

        if self.cups_entries > 0 {
            println!("CUPS Dictionary Entries: {}", self.cups_entries);
        }
    }
}
