/*!
 * File readers for RIPS text, auxiliary tables, and the CUPS dictionary
 *
 * This module is the boundary between the filesystem and the pure parsing
 * core: RIPS submissions load as raw text (legacy encodings tolerated via
 * lossy UTF-8), auxiliary spreadsheets and the CUPS dictionary load as cell
 * matrices through the `csv` crate with flexible record lengths.
 */

use std::fs::File;
use std::path::Path;

use csv::ReaderBuilder;

#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    data_types::CupsEntry,
    lookup::find_column,
    schema::{
        CUPS_CODE_COLUMNS, CUPS_CURRENT_CODE_COLUMNS, CUPS_NAME_COLUMNS,
        CUPS_SERVICE_TYPE_COLUMNS,
    },
    Result, RipsError,
};

/// Reader for RIPS files and auxiliary tabular inputs
pub struct RipsReader {
    /// Whether to skip unreadable files (true) or fail on first error (false)
    skip_unreadable_files: bool,
    /// Delimiter for auxiliary tables and the CUPS dictionary
    table_delimiter: u8,
    /// Whether to show progress bar during batch loads
    #[cfg(feature = "progress")]
    show_progress_bar: bool,
}

impl Default for RipsReader {
    fn default() -> Self {
        Self::new()
    }
}

impl RipsReader {
    /// Create a new reader with default settings
    pub fn new() -> Self {
        Self {
            skip_unreadable_files: false,
            table_delimiter: b',',
            #[cfg(feature = "progress")]
            show_progress_bar: true,
        }
    }

    /// Enable or disable skipping unreadable files in batch loads
    pub fn with_skip_unreadable_files(mut self, skip: bool) -> Self {
        self.skip_unreadable_files = skip;
        self
    }

    /// Set the delimiter used for auxiliary tables (default `,`)
    pub fn with_table_delimiter(mut self, delimiter: u8) -> Self {
        self.table_delimiter = delimiter;
        self
    }

    #[cfg(feature = "progress")]
    /// Enable or disable the progress bar
    pub fn with_progress_bar(mut self, show: bool) -> Self {
        self.show_progress_bar = show;
        self
    }

    /// Load one RIPS file as text.
    ///
    /// RIPS submissions frequently arrive in legacy Windows encodings;
    /// invalid UTF-8 sequences are replaced rather than rejected, since the
    /// delimited structure survives replacement characters.
    pub fn load_rips_text<P: AsRef<Path>>(&self, path: P) -> Result<String> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RipsError::file_not_found_with_suggestion(path.to_path_buf()));
        }
        let bytes = std::fs::read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Load a batch of RIPS files in the given order, returning
    /// (file name, text) pairs.
    ///
    /// With `skip_unreadable_files` enabled, files that cannot be read are
    /// reported and dropped instead of aborting the batch.
    pub fn load_rips_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Vec<(String, String)>> {
        #[cfg(feature = "progress")]
        let progress_bar = if self.show_progress_bar && paths.len() > 1 {
            let pb = ProgressBar::new(paths.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap()
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let mut contents = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned());

            #[cfg(feature = "progress")]
            if let Some(ref pb) = progress_bar {
                pb.set_message(file_name.clone());
            }

            match self.load_rips_text(path) {
                Ok(text) => contents.push((file_name, text)),
                Err(e) => {
                    if self.skip_unreadable_files {
                        eprintln!("Warning: skipping {}: {}", path.display(), e);
                    } else {
                        return Err(e);
                    }
                }
            }

            #[cfg(feature = "progress")]
            if let Some(ref pb) = progress_bar {
                pb.inc(1);
            }
        }

        #[cfg(feature = "progress")]
        if let Some(pb) = progress_bar {
            pb.finish_with_message("Loading complete");
        }

        Ok(contents)
    }

    /// Load an auxiliary table as a matrix of cells, header row included
    pub fn load_table<P: AsRef<Path>>(&self, path: P) -> Result<Vec<Vec<String>>> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RipsError::file_not_found_with_suggestion(path.to_path_buf()));
        }

        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.table_delimiter)
            .from_reader(file);

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(|cell| cell.to_string()).collect());
        }
        Ok(rows)
    }

    /// Load the CUPS dictionary, resolving its columns by header aliases.
    ///
    /// The primary and superseding code columns are both optional in the
    /// header, but a dictionary exposing neither is rejected.
    pub fn load_cups_dictionary<P: AsRef<Path>>(&self, path: P) -> Result<Vec<CupsEntry>> {
        let table = self.load_table(path.as_ref())?;
        let Some(header) = table.first() else {
            return Ok(Vec::new());
        };

        let code_col = find_column(header, CUPS_CODE_COLUMNS);
        let current_col = find_column(header, CUPS_CURRENT_CODE_COLUMNS);
        let name_col = find_column(header, CUPS_NAME_COLUMNS);
        let service_col = find_column(header, CUPS_SERVICE_TYPE_COLUMNS);

        if code_col.is_none() && current_col.is_none() {
            return Err(RipsError::Custom {
                message: format!(
                    "No CUPS code column found in '{}'",
                    path.as_ref().display()
                ),
                suggestion: Some(format!(
                    "The header must contain one of: {}",
                    CUPS_CODE_COLUMNS.join(", ")
                )),
            });
        }

        let cell = |row: &[String], col: Option<usize>| -> String {
            col.and_then(|c| row.get(c))
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        };

        Ok(table[1..]
            .iter()
            .map(|row| CupsEntry {
                code: cell(row, code_col),
                current_code: cell(row, current_col),
                name: cell(row, name_col),
                service_type: cell(row, service_col),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_rips_text_missing_file() {
        let reader = RipsReader::new();
        let err = reader.load_rips_text("definitely/not/here.txt").unwrap_err();
        assert!(matches!(err, RipsError::FileNotFound { .. }));
    }

    #[test]
    fn test_load_rips_text_tolerates_invalid_utf8() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"AF,PRESTADOR PEREZ,NI,1\xFF\n").unwrap();
        let reader = RipsReader::new();
        let text = reader.load_rips_text(file.path()).unwrap();
        assert!(text.starts_with("AF,PRESTADOR PEREZ,NI,1"));
    }

    #[test]
    fn test_load_table_flexible_rows() {
        let file = write_temp("a,b,c\n1,2\nx,y,z,extra\n");
        let reader = RipsReader::new();
        let table = reader.load_table(file.path()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table[1], vec!["1".to_string(), "2".to_string()]);
        assert_eq!(table[2].len(), 4);
    }

    #[test]
    fn test_load_cups_dictionary_by_aliases() {
        let file = write_temp(
            "Tipo Ser,CUPS,CUPS VIGENTE,NOMBRE CUPS\n\
             ESPECIALIDADES,890201,,CONSULTA ESPECIALIZADA\n\
             LABORATORIO,903800,903801,HEMOGRAMA\n",
        );
        let reader = RipsReader::new();
        let dictionary = reader.load_cups_dictionary(file.path()).unwrap();
        assert_eq!(dictionary.len(), 2);
        assert_eq!(dictionary[0].code, "890201");
        assert_eq!(dictionary[0].service_type, "ESPECIALIDADES");
        assert_eq!(dictionary[1].current_code, "903801");
        assert_eq!(dictionary[1].name, "HEMOGRAMA");
    }

    #[test]
    fn test_load_cups_dictionary_without_code_column() {
        let file = write_temp("Nombre,Tipo\nX,Y\n");
        let reader = RipsReader::new();
        assert!(reader.load_cups_dictionary(file.path()).is_err());
    }
}
