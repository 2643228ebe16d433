/*!
 * Data type definitions for RIPS records
 *
 * This module contains type-safe representations of the structures flowing
 * through the pipeline: segment collections, validation results, provider
 * aggregates, CUPS dictionary entries, coincidence records and the user
 * registry.
 */

use std::collections::{BTreeMap, HashMap};
use serde::{Deserialize, Serialize};
use chrono::NaiveDate;

/// Two-letter RIPS segment code (e.g. "AF", "CT", "US", "AC")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentCode(String);

impl SegmentCode {
    /// Create a new segment code, validating format
    pub fn new(code: &str) -> Result<Self, crate::RipsError> {
        let trimmed = code.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(crate::RipsError::invalid_segment_code(code));
        }
        Ok(SegmentCode(trimmed.to_ascii_uppercase()))
    }

    /// Normalize raw text into a segment code without validating.
    ///
    /// Control records derive codes from arbitrary file content, so the
    /// parser keys segments by whatever the file declared, garbage included;
    /// a bad code then surfaces as a count mismatch rather than being lost.
    pub fn normalized(code: &str) -> Self {
        SegmentCode(code.trim().to_ascii_uppercase())
    }

    /// Get the code as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SegmentCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Named groups of same-typed record lines within one or more RIPS files.
///
/// Built once per file by the segment parser and consumed read-only; the
/// cross-file union used by the coincidence engine is produced with
/// [`SegmentMap::merge`], which preserves per-segment line order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SegmentMap {
    segments: HashMap<SegmentCode, Vec<String>>,
}

impl SegmentMap {
    /// Create an empty segment map
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a segment, creating its (possibly empty) line list
    pub fn open(&mut self, code: SegmentCode) {
        self.segments.entry(code).or_default();
    }

    /// Append a line to a segment
    pub fn push_line(&mut self, code: SegmentCode, line: String) {
        self.segments.entry(code).or_default().push(line);
    }

    /// Get the lines of a segment by code text
    pub fn lines(&self, code: &str) -> Option<&[String]> {
        self.segments
            .get(&SegmentCode::normalized(code))
            .map(|v| v.as_slice())
    }

    /// Number of distinct segments
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Total number of record lines across all segments
    pub fn total_lines(&self) -> usize {
        self.segments.values().map(|v| v.len()).sum()
    }

    /// Check whether no segment was produced at all
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Iterate over (code, lines) pairs in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (&SegmentCode, &Vec<String>)> {
        self.segments.iter()
    }

    /// All segment codes present, sorted ascending
    pub fn codes(&self) -> Vec<SegmentCode> {
        let mut codes: Vec<SegmentCode> = self.segments.keys().cloned().collect();
        codes.sort();
        codes
    }

    /// Fold another map into this one, extending line lists in call order
    pub fn merge(&mut self, other: SegmentMap) {
        for (code, lines) in other.segments {
            self.segments.entry(code).or_default().extend(lines);
        }
    }
}

/// Billing regimen declared in the AF segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Regimen {
    Subsidized,
    Contributory,
    Other,
}

impl Regimen {
    /// Classify a raw regimen label from the data
    pub fn from_label(label: &str) -> Self {
        let upper = label.to_uppercase();
        if upper.contains("SUBSIDI") {
            Regimen::Subsidized
        } else if upper.contains("CONTRIBUTIV") {
            Regimen::Contributory
        } else {
            Regimen::Other
        }
    }
}

/// One billing-period entry of a provider aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AfDetail {
    /// Billing period start as it appears in the file (dd/mm/yyyy)
    pub period_start: String,
    /// Billing period end as it appears in the file (dd/mm/yyyy)
    pub period_end: String,
    /// Billed value for the period
    pub value: f64,
    /// RIPS file this entry came from
    pub source_file: String,
}

impl AfDetail {
    /// Human-readable period label, "start a end"
    pub fn period_label(&self) -> String {
        format!("{} a {}", self.period_start, self.period_end)
    }

    /// Parsed period start, used to order detail rows chronologically
    pub fn start_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.period_start.trim(), "%d/%m/%Y").ok()
    }
}

/// Provider/contract aggregate accumulated from AF segment lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderAggregate {
    pub provider_name: String,
    pub tax_id: String,
    pub contract: String,
    pub service_type: String,
    /// Regimen label as declared in the data (e.g. SUBSIDIADO)
    pub regimen: String,
    pub details: Vec<AfDetail>,
    pub total_value: f64,
    // Enrichment fields, populated from the auxiliary tables when available
    pub department: Option<String>,
    pub municipality: Option<String>,
    pub contract_value: Option<f64>,
    pub population: Option<u64>,
}

impl ProviderAggregate {
    /// Aggregation key: tax-ID and provider name joined with a dash
    pub fn key(&self) -> String {
        format!("{}-{}", self.tax_id, self.provider_name)
    }

    /// Classified regimen
    pub fn regimen_kind(&self) -> Regimen {
        Regimen::from_label(&self.regimen)
    }

    /// Whether any enrichment field has been populated
    pub fn is_enriched(&self) -> bool {
        self.department.is_some()
            || self.municipality.is_some()
            || self.contract_value.is_some()
            || self.population.is_some()
    }
}

/// Provider aggregates keyed by `"{tax_id}-{provider_name}"`.
///
/// A BTreeMap keeps report and export ordering reproducible without an
/// extra sort at every consumer.
pub type ProviderMap = BTreeMap<String, ProviderAggregate>;

/// Outcome of comparing expected vs found counts for one segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Ok,
    Fail,
}

impl std::fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationStatus::Ok => write!(f, "ok"),
            ValidationStatus::Fail => write!(f, "fail"),
        }
    }
}

/// Expected-vs-found comparison for one segment of one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentCheck {
    pub name: SegmentCode,
    pub expected: u64,
    pub found: u64,
    pub status: ValidationStatus,
}

/// Validation result for one RIPS file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileValidation {
    pub file_name: String,
    /// One entry per segment, sorted ascending by name, CT excluded
    pub segments: Vec<SegmentCheck>,
}

impl FileValidation {
    /// Whether every segment matched its declared count
    pub fn passed(&self) -> bool {
        self.segments
            .iter()
            .all(|s| s.status == ValidationStatus::Ok)
    }

    /// Segments that failed the count check
    pub fn failures(&self) -> impl Iterator<Item = &SegmentCheck> {
        self.segments
            .iter()
            .filter(|s| s.status == ValidationStatus::Fail)
    }
}

/// One row of the CUPS service-code dictionary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CupsEntry {
    /// Primary service code
    pub code: String,
    /// Superseding ("vigente") code, empty when the primary is current
    pub current_code: String,
    /// Service description
    pub name: String,
    /// Service-type label used for population resolution
    pub service_type: String,
}

impl CupsEntry {
    /// Whether the entry carries any usable code
    pub fn has_code(&self) -> bool {
        !self.code.trim().is_empty() || !self.current_code.trim().is_empty()
    }
}

/// Cross-reference result for one CUPS dictionary entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coincidence {
    pub code: String,
    pub current_code: String,
    pub name: String,
    pub service_type: String,
    /// Match count per activity segment
    pub per_segment: BTreeMap<SegmentCode, u64>,
    /// Sum of all per-segment counts
    pub total: u64,
    /// Population denominator used for the frequency-of-use ratio
    pub population: u64,
    /// total / population, 0.0 when the denominator is 0
    pub frequency_of_use: f64,
}

/// Final cross-reference report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoincidenceReport {
    /// Enriched provider aggregates
    pub providers: ProviderMap,
    /// One record per dictionary entry, dictionary order preserved
    pub records: Vec<Coincidence>,
    /// Unique patients across all US segments, keyed by document number
    pub total_population: usize,
}

/// One patient from the US (user registry) segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub document_type: String,
    pub document_number: String,
    pub habilitation_code: String,
    pub user_type: String,
    pub first_surname: String,
    pub second_surname: String,
    pub first_name: String,
    pub second_name: String,
    pub age: Option<u32>,
    /// Age unit code: 1 = years, 2 = months, 3 = days
    pub age_unit: String,
    pub sex: String,
    pub department: String,
    pub municipality: String,
    pub zone: String,
}

impl UserRecord {
    /// Age with its unit suffix, e.g. "31A", "6M", "15D"
    pub fn formatted_age(&self) -> String {
        match self.age {
            Some(age) => {
                let suffix = match self.age_unit.as_str() {
                    "1" => "A",
                    "2" => "M",
                    "3" => "D",
                    _ => "",
                };
                format!("{}{}", age, suffix)
            }
            None => String::new(),
        }
    }

    /// Given names followed by surnames, collapsed and trimmed
    pub fn full_name(&self) -> String {
        [
            &self.first_name,
            &self.second_name,
            &self.first_surname,
            &self.second_surname,
        ]
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// Context handed to the external error-analysis service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisTarget {
    pub file_name: String,
    pub segment: String,
    pub expected: u64,
    pub found: u64,
    pub file_content: String,
}

/// Response from the external error-analysis service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorAnalysis {
    /// Explanation of the error context
    pub analysis: String,
    /// Ranked correction suggestions
    pub suggestions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_code_validation() {
        assert!(SegmentCode::new("AF").is_ok());
        assert!(SegmentCode::new(" us ").is_ok());
        assert!(SegmentCode::new("").is_err());
        assert!(SegmentCode::new("A1").is_err());
        assert_eq!(SegmentCode::new("af").unwrap().as_str(), "AF");
    }

    #[test]
    fn test_segment_code_normalized_keeps_garbage() {
        assert_eq!(SegmentCode::normalized("a1").as_str(), "A1");
    }

    #[test]
    fn test_segment_map_merge_preserves_order() {
        let mut a = SegmentMap::new();
        a.push_line(SegmentCode::normalized("AC"), "one".into());
        let mut b = SegmentMap::new();
        b.push_line(SegmentCode::normalized("AC"), "two".into());
        a.merge(b);
        assert_eq!(
            a.lines("AC").unwrap(),
            &["one".to_string(), "two".to_string()]
        );
    }

    #[test]
    fn test_regimen_classification() {
        assert_eq!(Regimen::from_label("SUBSIDIADO"), Regimen::Subsidized);
        assert_eq!(Regimen::from_label("contributivo"), Regimen::Contributory);
        assert_eq!(Regimen::from_label("PARTICULAR"), Regimen::Other);
    }

    #[test]
    fn test_detail_period_label_and_date() {
        let d = AfDetail {
            period_start: "01/04/2025".into(),
            period_end: "30/04/2025".into(),
            value: 100.0,
            source_file: "a.txt".into(),
        };
        assert_eq!(d.period_label(), "01/04/2025 a 30/04/2025");
        assert_eq!(
            d.start_date(),
            NaiveDate::from_ymd_opt(2025, 4, 1)
        );
    }

    #[test]
    fn test_user_formatted_age() {
        let mut u = UserRecord {
            document_type: "CC".into(),
            document_number: "123".into(),
            habilitation_code: String::new(),
            user_type: "2".into(),
            first_surname: "PEREZ".into(),
            second_surname: String::new(),
            first_name: "ANA".into(),
            second_name: String::new(),
            age: Some(31),
            age_unit: "1".into(),
            sex: "F".into(),
            department: "44".into(),
            municipality: "001".into(),
            zone: "U".into(),
        };
        assert_eq!(u.formatted_age(), "31A");
        u.age_unit = "2".into();
        assert_eq!(u.formatted_age(), "31M");
        assert_eq!(u.full_name(), "ANA PEREZ");
    }
}
