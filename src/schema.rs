/*!
 * Schema definitions for RIPS files and auxiliary tables
 *
 * This module contains the positional column layouts of the RIPS segments,
 * the per-segment service-code offsets used by the coincidence engine, and
 * the header alias sets accepted when reading the auxiliary spreadsheets and
 * the CUPS dictionary. Column positions are data contracts tied to the
 * external file format; keeping them here makes a layout change a one-place
 * edit.
 */

/// Marker prefix that opens/closes a segment block inside a RIPS file
pub const SEGMENT_MARKER: &str = "ARCHIVO-RIPS-";

/// Prefix of comment lines ignored inside segment blocks
pub const COMMENT_PREFIX: &str = "***";

/// Control segment declaring expected record counts
pub const CONTROL_SEGMENT: &str = "CT";

/// Provider/contract billing segment
pub const PROVIDER_SEGMENT: &str = "AF";

/// User (patient registry) segment
pub const USER_SEGMENT: &str = "US";

/// Activity segments scanned by the coincidence engine, in report order
pub const ACTIVITY_SEGMENTS: [&str; 7] = ["AP", "AC", "AT", "AN", "AH", "AU", "US"];

/// 0-indexed column holding the CUPS service code, per activity segment.
///
/// US has no fixed service-code column; the coincidence engine falls back
/// to a delimiter-bounded containment test for it.
pub fn service_code_column(segment: &str) -> Option<usize> {
    match segment {
        "AC" => Some(6),
        "AP" => Some(7),
        "AU" => Some(6),
        "AH" => Some(8),
        "AN" => Some(6),
        "AT" => Some(6),
        _ => None,
    }
}

/// Column layout of the AF (provider/contract) segment
pub struct AfLayout {
    pub provider_name: usize,
    pub tax_id: usize,
    pub period_start: usize,
    pub period_end: usize,
    pub contract: usize,
    pub service_type: usize,
    pub regimen: usize,
    pub billed_value: usize,
    /// Lines with fewer columns are skipped as partial records
    pub min_columns: usize,
}

pub const AF_LAYOUT: AfLayout = AfLayout {
    provider_name: 1,
    tax_id: 3,
    period_start: 6,
    period_end: 7,
    contract: 10,
    service_type: 11,
    regimen: 12,
    billed_value: 16,
    min_columns: 17,
};

/// Column layout of the CT (control) segment
pub struct CtLayout {
    /// Column whose first two characters name the counted segment
    pub segment_code: usize,
    pub count: usize,
    pub min_columns: usize,
}

pub const CT_LAYOUT: CtLayout = CtLayout {
    segment_code: 2,
    count: 3,
    min_columns: 4,
};

/// Column layout of the US (user registry) segment
pub struct UsLayout {
    pub document_type: usize,
    pub document_number: usize,
    pub habilitation_code: usize,
    pub user_type: usize,
    pub first_surname: usize,
    pub second_surname: usize,
    pub first_name: usize,
    pub second_name: usize,
    pub age: usize,
    pub age_unit: usize,
    pub sex: usize,
    pub department: usize,
    pub municipality: usize,
    pub zone: usize,
    pub min_columns: usize,
}

pub const US_LAYOUT: UsLayout = UsLayout {
    document_type: 0,
    document_number: 1,
    habilitation_code: 2,
    user_type: 3,
    first_surname: 4,
    second_surname: 5,
    first_name: 6,
    second_name: 7,
    age: 8,
    age_unit: 9,
    sex: 10,
    department: 11,
    municipality: 12,
    zone: 13,
    min_columns: 15,
};

// Default thresholds for the heuristic fallback classifier (markerless
// files). Runtime values live in `RipsConfig::heuristic`; these are the
// documented defaults: a control line needs at least 4 columns, a provider
// line at least 17, a user line at least 11.
pub const DEFAULT_CONTROL_MIN_COLUMNS: usize = 4;
pub const DEFAULT_PROVIDER_MIN_COLUMNS: usize = 17;
pub const DEFAULT_USER_MIN_COLUMNS: usize = 11;

// ---------------------------------------------------------------------------
// Auxiliary-table header aliases
//
// Header names are matched after `normalize_header`: trimmed, upper-cased,
// internal whitespace collapsed, Spanish accents folded. Candidates are
// tried in order; the first match wins. A missing key column disables that
// enrichment source entirely.
// ---------------------------------------------------------------------------

/// Join-key aliases for the contracts table (keyed by contract number)
pub const CONTRACT_KEY_COLUMNS: &[&str] = &[
    "NUMERO DE CONTRATO",
    "NUMERO CONTRATO",
    "NO CONTRATO",
    "CONTRATO",
];

/// Join-key aliases for the coverage table (keyed by tax ID)
pub const TAX_ID_KEY_COLUMNS: &[&str] = &[
    "NIT",
    "NUMERO DE IDENTIFICACION",
    "IDENTIFICACION",
    "NI",
];

/// Location columns, shared by both auxiliary tables
pub const DEPARTMENT_COLUMNS: &[&str] = &["DEPARTAMENTO", "DEPTO"];
pub const MUNICIPALITY_COLUMNS: &[&str] = &["MUNICIPIO", "MPIO"];

/// Contract-value aliases for the subsidized regimen
pub const SUBSIDIZED_CONTRACT_VALUE_COLUMNS: &[&str] = &[
    "VALOR CONTRATO SUBSIDIADO",
    "VALOR SUBSIDIADO",
    "VALOR CONTRATO",
];

/// Contract-value aliases for the contributory regimen
pub const CONTRIBUTORY_CONTRACT_VALUE_COLUMNS: &[&str] = &[
    "VALOR CONTRATO CONTRIBUTIVO",
    "VALOR CONTRIBUTIVO",
    "VALOR CONTRATO",
];

/// General-population aliases for the subsidized regimen
pub const SUBSIDIZED_POPULATION_COLUMNS: &[&str] = &[
    "POBLACION SUBSIDIADO",
    "POBLACION SUBSIDIADA",
    "POBLACION",
];

/// General-population aliases for the contributory regimen
pub const CONTRIBUTORY_POPULATION_COLUMNS: &[&str] = &[
    "POBLACION CONTRIBUTIVO",
    "POBLACION CONTRIBUTIVA",
    "POBLACION",
];

/// Specialty whose utilization is measured against its own population column
pub struct SpecialtyPopulation {
    /// Keywords that identify the specialty in a service-type label
    pub keywords: &'static [&'static str],
    pub subsidized_columns: &'static [&'static str],
    pub contributory_columns: &'static [&'static str],
}

/// Specialties carrying their own population denominators
pub const SPECIALTY_POPULATIONS: &[SpecialtyPopulation] = &[
    SpecialtyPopulation {
        keywords: &["PEDIATR"],
        subsidized_columns: &[
            "POBLACION PEDIATRIA SUBSIDIADO",
            "POBLACION PEDIATRIA",
            "PEDIATRIA",
        ],
        contributory_columns: &[
            "POBLACION PEDIATRIA CONTRIBUTIVO",
            "POBLACION PEDIATRIA",
            "PEDIATRIA",
        ],
    },
    SpecialtyPopulation {
        keywords: &["GINECO", "OBSTETRIC"],
        subsidized_columns: &[
            "POBLACION GINECOLOGIA SUBSIDIADO",
            "POBLACION GINECOLOGIA",
            "GINECOLOGIA",
        ],
        contributory_columns: &[
            "POBLACION GINECOLOGIA CONTRIBUTIVO",
            "POBLACION GINECOLOGIA",
            "GINECOLOGIA",
        ],
    },
    SpecialtyPopulation {
        keywords: &["MEDICINA INTERNA", "INTERNISTA"],
        subsidized_columns: &[
            "POBLACION MEDICINA INTERNA SUBSIDIADO",
            "POBLACION MEDICINA INTERNA",
            "MEDICINA INTERNA",
        ],
        contributory_columns: &[
            "POBLACION MEDICINA INTERNA CONTRIBUTIVO",
            "POBLACION MEDICINA INTERNA",
            "MEDICINA INTERNA",
        ],
    },
];

/// Service descriptions measured against the provider's whole population
pub const WHOLE_POPULATION_SERVICES: &[&str] = &[
    "MEDICINA GENERAL",
    "ODONTOLOGIA",
    "ENFERMERIA",
    "LABORATORIO",
    "IMAGENES",
    "IMAGENOLOGIA",
    "RADIOLOGIA",
    "TRANSPORTE",
    "URGENCIAS",
    "HOSPITALIZACION",
    "NUTRICION",
    "PSICOLOGIA",
];

// CUPS dictionary column aliases
pub const CUPS_CODE_COLUMNS: &[&str] = &["CUPS", "CODIGO CUPS", "CODIGO"];
pub const CUPS_CURRENT_CODE_COLUMNS: &[&str] = &["CUPS VIGENTE", "CODIGO VIGENTE"];
pub const CUPS_NAME_COLUMNS: &[&str] = &["NOMBRE CUPS", "NOMBRE", "DESCRIPCION"];
pub const CUPS_SERVICE_TYPE_COLUMNS: &[&str] = &["TIPO SER", "TIPO SERVICIO", "TIPO DE SERVICIO"];

/// Normalize header or label text for matching: trim, upper-case, collapse
/// internal whitespace, fold Spanish accented vowels and Ñ
pub fn normalize_header(text: &str) -> String {
    let folded: String = text
        .to_uppercase()
        .chars()
        .map(|c| match c {
            'Á' => 'A',
            'É' => 'E',
            'Í' => 'I',
            'Ó' => 'O',
            'Ú' | 'Ü' => 'U',
            'Ñ' => 'N',
            _ => c,
        })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether a service-type label belongs to the whole-population whitelist
pub fn is_whole_population_service(label: &str) -> bool {
    let normalized = normalize_header(label);
    WHOLE_POPULATION_SERVICES
        .iter()
        .any(|service| normalized.contains(service))
}

/// Specialty population table entry for a service-type label, if any
pub fn specialty_for(label: &str) -> Option<&'static SpecialtyPopulation> {
    let normalized = normalize_header(label);
    SPECIALTY_POPULATIONS
        .iter()
        .find(|s| s.keywords.iter().any(|kw| normalized.contains(kw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_code_offsets() {
        assert_eq!(service_code_column("AC"), Some(6));
        assert_eq!(service_code_column("AP"), Some(7));
        assert_eq!(service_code_column("AU"), Some(6));
        assert_eq!(service_code_column("AH"), Some(8));
        assert_eq!(service_code_column("AN"), Some(6));
        assert_eq!(service_code_column("AT"), Some(6));
        assert_eq!(service_code_column("US"), None);
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  Población   Subsidiado "), "POBLACION SUBSIDIADO");
        assert_eq!(normalize_header("Número de Contrato"), "NUMERO DE CONTRATO");
    }

    #[test]
    fn test_whole_population_whitelist() {
        assert!(is_whole_population_service("CONSULTA MEDICINA GENERAL"));
        assert!(is_whole_population_service("odontología"));
        assert!(!is_whole_population_service("PEDIATRIA"));
    }

    #[test]
    fn test_specialty_lookup() {
        assert!(specialty_for("CONSULTA PEDIATRÍA").is_some());
        assert!(specialty_for("GINECOLOGIA Y OBSTETRICIA").is_some());
        assert!(specialty_for("MEDICINA INTERNA").is_some());
        assert!(specialty_for("MEDICINA GENERAL").is_none());
    }
}
