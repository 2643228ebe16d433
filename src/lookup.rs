/*!
 * Column-name-tolerant indexes over auxiliary tabular data
 *
 * Auxiliary spreadsheets arrive with drifting header spellings. An index is
 * built by locating the join-key column through an ordered alias list, then
 * mapping each data row by its key cell. A missing key column produces an
 * empty, unusable index: enrichment for that source becomes a no-op rather
 * than an error. Alias resolution happens once per source at build time and
 * is cached on the index.
 */

use std::collections::HashMap;

use crate::schema::normalize_header;

/// Index over one auxiliary table, keyed by a join column
#[derive(Debug, Clone, Default)]
pub struct TableIndex {
    /// Normalized header row, cached for enrichment-column resolution
    header: Vec<String>,
    key_column: Option<usize>,
    rows: HashMap<String, Vec<String>>,
}

impl TableIndex {
    /// An index that matches nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build an index from a cell matrix whose first row is the header.
    ///
    /// The key column is the first header cell equal (after normalization)
    /// to any alias, aliases tried in order. Rows with an empty key cell are
    /// skipped; duplicate keys keep the last row seen.
    pub fn build(table: &[Vec<String>], key_aliases: &[&str]) -> Self {
        let Some(header_row) = table.first() else {
            return Self::empty();
        };
        let header: Vec<String> = header_row.iter().map(|h| normalize_header(h)).collect();

        let Some(key_column) = find_column_normalized(&header, key_aliases) else {
            return Self {
                header,
                key_column: None,
                rows: HashMap::new(),
            };
        };

        let mut rows = HashMap::new();
        for row in &table[1..] {
            let Some(key_cell) = row.get(key_column) else {
                continue;
            };
            let key = key_cell.trim();
            if key.is_empty() {
                continue;
            }
            rows.insert(key.to_string(), row.clone());
        }

        Self {
            header,
            key_column: Some(key_column),
            rows,
        }
    }

    /// Whether the key column was found at build time
    pub fn is_usable(&self) -> bool {
        self.key_column.is_some()
    }

    /// Number of indexed rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the index holds no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up the row for a join-key value
    pub fn get(&self, key: &str) -> Option<&Vec<String>> {
        self.rows.get(key.trim())
    }

    /// Resolve a column by alias list against the cached header
    pub fn column(&self, aliases: &[&str]) -> Option<usize> {
        find_column_normalized(&self.header, aliases)
    }

    /// Read a cell of a row through an alias list, trimmed, non-empty
    pub fn cell<'a>(&self, row: &'a [String], aliases: &[&str]) -> Option<&'a str> {
        let idx = self.column(aliases)?;
        let cell = row.get(idx)?.trim();
        if cell.is_empty() {
            None
        } else {
            Some(cell)
        }
    }
}

/// Find the index of the first header cell matching any candidate name,
/// candidates tried in order, matching case- and accent-insensitively
pub fn find_column(header: &[String], aliases: &[&str]) -> Option<usize> {
    let normalized: Vec<String> = header.iter().map(|h| normalize_header(h)).collect();
    find_column_normalized(&normalized, aliases)
}

fn find_column_normalized(header: &[String], aliases: &[&str]) -> Option<usize> {
    for alias in aliases {
        let wanted = normalize_header(alias);
        if let Some(idx) = header.iter().position(|h| *h == wanted) {
            return Some(idx);
        }
    }
    None
}

/// Parse a numeric cell that may be plain or currency/number-formatted.
///
/// Strips everything but digits, separators and sign, then resolves the
/// `.`/`,` thousands-vs-decimal ambiguity the way Colombian spreadsheets
/// format values: when both appear, `.` groups thousands and `,` marks
/// decimals; a lone `,` marks decimals; a lone `.` followed by exactly
/// three digits groups thousands.
pub fn parse_number(cell: &str) -> Option<f64> {
    let cleaned: String = cell
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let dots = cleaned.matches('.').count();
    let commas = cleaned.matches(',').count();

    let canonical = if dots > 0 && commas > 0 {
        cleaned.replace('.', "").replace(',', ".")
    } else if commas > 1 {
        cleaned.replace(',', "")
    } else if commas == 1 {
        cleaned.replace(',', ".")
    } else if dots > 1 {
        cleaned.replace('.', "")
    } else if dots == 1 {
        let after = cleaned.split('.').nth(1).unwrap_or("");
        if after.len() == 3 && after.chars().all(|c| c.is_ascii_digit()) {
            cleaned.replace('.', "")
        } else {
            cleaned
        }
    } else {
        cleaned
    };

    canonical.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Vec<Vec<String>> {
        vec![
            vec![
                "Número de Contrato".to_string(),
                "Departamento".to_string(),
                "Población Subsidiado".to_string(),
            ],
            vec!["C-001".to_string(), "LA GUAJIRA".to_string(), "1.200".to_string()],
            vec!["C-002".to_string(), "CESAR".to_string(), "800".to_string()],
            vec!["".to_string(), "IGNORED".to_string(), "1".to_string()],
            vec!["C-001".to_string(), "MAGDALENA".to_string(), "1.300".to_string()],
        ]
    }

    #[test]
    fn test_build_and_lookup() {
        let index = TableIndex::build(&table(), &["NUMERO DE CONTRATO", "CONTRATO"]);
        assert!(index.is_usable());
        assert_eq!(index.len(), 2);
        // Duplicate key: last write wins.
        assert_eq!(index.get("C-001").unwrap()[1], "MAGDALENA");
        assert_eq!(index.get(" C-002 ").unwrap()[1], "CESAR");
        assert!(index.get("C-999").is_none());
    }

    #[test]
    fn test_alias_order_first_match_wins() {
        let header = vec!["CONTRATO".to_string(), "NUMERO DE CONTRATO".to_string()];
        // "NUMERO DE CONTRATO" is tried first and matches column 1 even
        // though "CONTRATO" would match column 0.
        assert_eq!(find_column(&header, &["NUMERO DE CONTRATO", "CONTRATO"]), Some(1));
        assert_eq!(find_column(&header, &["CONTRATO"]), Some(0));
    }

    #[test]
    fn test_missing_key_column_yields_unusable_index() {
        let index = TableIndex::build(&table(), &["NIT"]);
        assert!(!index.is_usable());
        assert!(index.is_empty());
        assert!(index.get("C-001").is_none());
    }

    #[test]
    fn test_cell_access_through_aliases() {
        let index = TableIndex::build(&table(), &["NUMERO DE CONTRATO"]);
        let row = index.get("C-002").unwrap().clone();
        assert_eq!(index.cell(&row, &["DEPARTAMENTO", "DEPTO"]), Some("CESAR"));
        assert_eq!(index.cell(&row, &["MUNICIPIO"]), None);
    }

    #[test]
    fn test_parse_number_formats() {
        assert_eq!(parse_number("1234567"), Some(1234567.0));
        assert_eq!(parse_number("$ 1.234.567"), Some(1234567.0));
        assert_eq!(parse_number("1.234.567,50"), Some(1234567.5));
        assert_eq!(parse_number("1.200"), Some(1200.0));
        assert_eq!(parse_number("12.5"), Some(12.5));
        assert_eq!(parse_number("3,5"), Some(3.5));
        assert_eq!(parse_number("-42"), Some(-42.0));
        assert_eq!(parse_number("N/A"), None);
        assert_eq!(parse_number(""), None);
    }
}
