/*!
 * Export functionality for RIPS reports
 *
 * Provides the report-writer boundary: JSON for downstream tooling and a
 * normalized set of CSV sheets (consolidated providers, per-period details,
 * coincidence table) matching the workbook layout consumers expect.
 * Currency values render in Colombian-peso style (`$1.234.567`, no
 * decimals); frequency-of-use ratios render with exactly four decimals.
 */

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::data_types::{AfDetail, CoincidenceReport};
use crate::dataset::RipsDataset;
use crate::schema::ACTIVITY_SEGMENTS;
use crate::{ExportFormat, Result, RipsError};

/// Trait for implementing RIPS report exporters
pub trait ReportExporter {
    /// Export the dataset
    fn export(&self, dataset: &RipsDataset, path: &Path) -> Result<()>;

    /// Get the export format
    fn format(&self) -> ExportFormat;
}

/// Format a peso amount: no decimals, `.` as thousands separator
pub fn format_currency(value: f64) -> String {
    let negative = value < 0.0;
    let units = value.abs().round() as u64;

    let digits = units.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    if negative {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

/// Format a frequency-of-use ratio to four decimal places
pub fn format_frequency(value: f64) -> String {
    format!("{:.4}", value)
}

/// JSON exporter for RIPS datasets
pub struct JsonExporter {
    /// Whether to pretty-print the JSON
    pub pretty_print: bool,
}

impl Default for JsonExporter {
    fn default() -> Self {
        Self { pretty_print: true }
    }
}

impl JsonExporter {
    /// Create a new JSON exporter
    pub fn new() -> Self {
        Self::default()
    }

    /// Set pretty printing
    pub fn with_pretty_print(mut self, pretty: bool) -> Self {
        self.pretty_print = pretty;
        self
    }
}

impl ReportExporter for JsonExporter {
    fn export(&self, dataset: &RipsDataset, path: &Path) -> Result<()> {
        let coincidence: Option<CoincidenceReport> = dataset.coincidence_report().ok();

        let document = serde_json::json!({
            "files": dataset.file_names,
            "validations": dataset.validations,
            "providers": dataset.providers,
            "totalPopulation": dataset.unique_user_count(),
            "coincidence": coincidence,
        });

        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        if self.pretty_print {
            serde_json::to_writer_pretty(writer, &document)?;
        } else {
            serde_json::to_writer(writer, &document)?;
        }

        Ok(())
    }

    fn format(&self) -> ExportFormat {
        ExportFormat::Json
    }
}

/// CSV exporter for RIPS datasets
///
/// Writes normalized sheets next to the base path: `<base>_providers.csv`,
/// `<base>_details.csv` and, when a dictionary was loaded,
/// `<base>_coincidences.csv`.
pub struct CsvExporter {
    /// Field delimiter
    pub delimiter: u8,
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvExporter {
    /// Create a new CSV exporter
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    fn sheet_path(base: &Path, suffix: &str) -> std::path::PathBuf {
        let dir = base.parent().unwrap_or(Path::new("."));
        let stem = base
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("rips_export");
        dir.join(format!("{}_{}.csv", stem, suffix))
    }

    fn writer(&self, path: &Path) -> Result<csv::Writer<File>> {
        csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_path(path)
            .map_err(RipsError::from)
    }

    fn export_providers(&self, dataset: &RipsDataset, path: &Path) -> Result<()> {
        let mut writer = self.writer(path)?;
        writer.write_record([
            "Nombre del prestador",
            "NI",
            "Contrato",
            "Tipo de servicio",
            "Regimen",
            "Departamento",
            "Municipio",
            "Valor Contrato",
            "Poblacion",
            "Valor LMA Total",
        ])?;

        let mut total = 0.0;
        for provider in dataset.providers.values() {
            total += provider.total_value;
            writer.write_record([
                provider.provider_name.clone(),
                provider.tax_id.clone(),
                provider.contract.clone(),
                provider.service_type.clone(),
                provider.regimen.clone(),
                provider.department.clone().unwrap_or_default(),
                provider.municipality.clone().unwrap_or_default(),
                provider
                    .contract_value
                    .map(format_currency)
                    .unwrap_or_default(),
                provider
                    .population
                    .map(|p| p.to_string())
                    .unwrap_or_default(),
                format_currency(provider.total_value),
            ])?;
        }

        let mut total_row = vec![String::new(); 8];
        total_row.push("TOTAL GENERAL".to_string());
        total_row.push(format_currency(total));
        writer.write_record(&total_row)?;
        writer.flush()?;
        Ok(())
    }

    fn export_details(&self, dataset: &RipsDataset, path: &Path) -> Result<()> {
        let mut writer = self.writer(path)?;
        writer.write_record([
            "Nombre del prestador",
            "NI",
            "Periodo",
            "Valor LMA",
            "Archivo origen",
        ])?;

        for provider in dataset.providers.values() {
            let mut details: Vec<&AfDetail> = provider.details.iter().collect();
            // Chronological within each provider; undated rows keep their
            // file order at the end.
            details.sort_by_key(|d| (d.start_date().is_none(), d.start_date()));

            for detail in details {
                writer.write_record([
                    provider.provider_name.clone(),
                    provider.tax_id.clone(),
                    detail.period_label(),
                    format_currency(detail.value),
                    detail.source_file.clone(),
                ])?;
            }

            writer.write_record([
                provider.provider_name.clone(),
                provider.tax_id.clone(),
                "TOTAL".to_string(),
                format_currency(provider.total_value),
                String::new(),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }

    fn export_coincidences(&self, report: &CoincidenceReport, path: &Path) -> Result<()> {
        let mut writer = self.writer(path)?;

        let mut header = vec![
            "Tipo Ser".to_string(),
            "CUPS".to_string(),
            "CUPS Vigente".to_string(),
            "Nombre CUPS".to_string(),
        ];
        header.extend(ACTIVITY_SEGMENTS.iter().map(|s| s.to_string()));
        header.push("Total".to_string());
        header.push("Poblacion".to_string());
        header.push("Frecuencia de Uso".to_string());
        writer.write_record(&header)?;

        for record in &report.records {
            let mut row = vec![
                record.service_type.clone(),
                record.code.clone(),
                record.current_code.clone(),
                record.name.clone(),
            ];
            for segment in ACTIVITY_SEGMENTS {
                let count = record
                    .per_segment
                    .get(&crate::data_types::SegmentCode::normalized(segment))
                    .copied()
                    .unwrap_or(0);
                row.push(count.to_string());
            }
            row.push(record.total.to_string());
            row.push(record.population.to_string());
            row.push(format_frequency(record.frequency_of_use));
            writer.write_record(&row)?;
        }

        writer.flush()?;
        Ok(())
    }
}

impl ReportExporter for CsvExporter {
    fn export(&self, dataset: &RipsDataset, path: &Path) -> Result<()> {
        self.export_providers(dataset, &Self::sheet_path(path, "providers"))?;
        self.export_details(dataset, &Self::sheet_path(path, "details"))?;

        if let Ok(report) = dataset.coincidence_report() {
            self.export_coincidences(&report, &Self::sheet_path(path, "coincidences"))?;
        }

        Ok(())
    }

    fn format(&self) -> ExportFormat {
        ExportFormat::Csv
    }
}

impl RipsDataset {
    /// Export the dataset in the given format
    pub fn export<P: AsRef<Path>>(&self, path: P, format: ExportFormat) -> Result<()> {
        match format {
            ExportFormat::Json => JsonExporter::new().export(self, path.as_ref()),
            ExportFormat::Csv => CsvExporter::new().export(self, path.as_ref()),
        }
    }

    /// Export the dataset as pretty-printed JSON
    pub fn export_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        JsonExporter::new().export(self, path.as_ref())
    }

    /// Export the dataset as normalized CSV sheets
    pub fn export_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        CsvExporter::new().export(self, path.as_ref())
    }

    /// Export the coincidence table alone
    pub fn export_coincidence_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let report = self.coincidence_report()?;
        CsvExporter::new().export_coincidences(&report, path.as_ref())
    }
}

/// Write a plain-text validation summary, one line per segment check
pub fn write_validation_summary<W: Write>(
    writer: &mut W,
    validations: &[crate::data_types::FileValidation],
) -> Result<()> {
    for validation in validations {
        writeln!(writer, "{}", validation.file_name)?;
        if validation.segments.is_empty() {
            writeln!(writer, "  (no segments detected, no CT declarations)")?;
            continue;
        }
        for check in &validation.segments {
            writeln!(
                writer,
                "  {}  expected {:>6}  found {:>6}  {}",
                check.name, check.expected, check.found, check.status
            )?;
        }
    }
    Ok(())
}
