/*!
 * Enrichment and reconciliation of provider aggregates
 *
 * Joins provider aggregates against the auxiliary lookup indexes: the
 * contracts table (keyed by contract number, tried first) and the coverage
 * table (keyed by tax-ID, the fallback). A hit fills in location fields and
 * the regimen-dependent contract value and population figures. Enrichment
 * never mutates its input and is idempotent; numeric cells that fail to
 * parse leave previously-enriched values untouched.
 */

use crate::data_types::{ProviderAggregate, ProviderMap, Regimen};
use crate::lookup::{parse_number, TableIndex};
use crate::schema::{
    is_whole_population_service, specialty_for, CONTRACT_KEY_COLUMNS,
    CONTRIBUTORY_CONTRACT_VALUE_COLUMNS, CONTRIBUTORY_POPULATION_COLUMNS, DEPARTMENT_COLUMNS,
    MUNICIPALITY_COLUMNS, SUBSIDIZED_CONTRACT_VALUE_COLUMNS, SUBSIDIZED_POPULATION_COLUMNS,
    TAX_ID_KEY_COLUMNS,
};

/// The two auxiliary lookup indexes used for enrichment
#[derive(Debug, Clone, Default)]
pub struct AuxiliaryIndexes {
    /// Primary index, keyed by contract number
    pub contracts: TableIndex,
    /// Secondary index, keyed by tax-ID
    pub coverage: TableIndex,
}

impl AuxiliaryIndexes {
    /// Build both indexes from raw cell matrices; either may be absent
    pub fn build(
        contracts_table: Option<&[Vec<String>]>,
        coverage_table: Option<&[Vec<String>]>,
    ) -> Self {
        Self {
            contracts: contracts_table
                .map(|t| TableIndex::build(t, CONTRACT_KEY_COLUMNS))
                .unwrap_or_else(TableIndex::empty),
            coverage: coverage_table
                .map(|t| TableIndex::build(t, TAX_ID_KEY_COLUMNS))
                .unwrap_or_else(TableIndex::empty),
        }
    }

    /// Whether any source can answer lookups
    pub fn is_usable(&self) -> bool {
        self.contracts.is_usable() || self.coverage.is_usable()
    }

    /// Resolve the auxiliary row for a provider: contract number against the
    /// contracts index first, tax-ID against the coverage index as fallback
    pub fn row_for<'a>(
        &'a self,
        provider: &ProviderAggregate,
    ) -> Option<(&'a TableIndex, &'a Vec<String>)> {
        if let Some(row) = self.contracts.get(&provider.contract) {
            return Some((&self.contracts, row));
        }
        self.coverage
            .get(&provider.tax_id)
            .map(|row| (&self.coverage, row))
    }

    /// Population denominator for a provider and service-type label.
    ///
    /// Whole-population services use the provider's general population.
    /// Specialty services (pediatrics, gynecology, internal medicine) read
    /// their own population column from whichever source matched the
    /// provider; anything unresolved falls back to the general population.
    pub fn population_for(&self, provider: &ProviderAggregate, service_type: &str) -> u64 {
        let general = provider.population.unwrap_or(0);

        if is_whole_population_service(service_type) {
            return general;
        }

        if let Some(specialty) = specialty_for(service_type) {
            if let Some((index, row)) = self.row_for(provider) {
                let aliases = match provider.regimen_kind() {
                    Regimen::Contributory => specialty.contributory_columns,
                    _ => specialty.subsidized_columns,
                };
                if let Some(population) = index
                    .cell(row, aliases)
                    .and_then(parse_number)
                    .filter(|n| *n >= 0.0)
                {
                    return population as u64;
                }
            }
        }

        general
    }
}

/// Enrich every provider aggregate from the auxiliary indexes, returning a
/// modified copy of the input map
pub fn enrich_providers(providers: &ProviderMap, indexes: &AuxiliaryIndexes) -> ProviderMap {
    let mut enriched = providers.clone();

    for provider in enriched.values_mut() {
        let Some((index, row)) = indexes.row_for(provider) else {
            continue;
        };

        if let Some(department) = index.cell(row, DEPARTMENT_COLUMNS) {
            provider.department = Some(department.to_string());
        }
        if let Some(municipality) = index.cell(row, MUNICIPALITY_COLUMNS) {
            provider.municipality = Some(municipality.to_string());
        }

        let (value_aliases, population_aliases) = match provider.regimen_kind() {
            Regimen::Contributory => (
                CONTRIBUTORY_CONTRACT_VALUE_COLUMNS,
                CONTRIBUTORY_POPULATION_COLUMNS,
            ),
            _ => (
                SUBSIDIZED_CONTRACT_VALUE_COLUMNS,
                SUBSIDIZED_POPULATION_COLUMNS,
            ),
        };

        if let Some(value) = index.cell(row, value_aliases).and_then(parse_number) {
            provider.contract_value = Some(value);
        }
        if let Some(population) = index
            .cell(row, population_aliases)
            .and_then(parse_number)
            .filter(|n| *n >= 0.0)
        {
            provider.population = Some(population as u64);
        }
    }

    enriched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::AfDetail;

    fn provider(contract: &str, tax_id: &str, regimen: &str, service: &str) -> ProviderAggregate {
        ProviderAggregate {
            provider_name: "IPS TEST".to_string(),
            tax_id: tax_id.to_string(),
            contract: contract.to_string(),
            service_type: service.to_string(),
            regimen: regimen.to_string(),
            details: vec![AfDetail {
                period_start: "01/01/2025".to_string(),
                period_end: "31/01/2025".to_string(),
                value: 100.0,
                source_file: "a.txt".to_string(),
            }],
            total_value: 100.0,
            department: None,
            municipality: None,
            contract_value: None,
            population: None,
        }
    }

    fn provider_map(p: ProviderAggregate) -> ProviderMap {
        let mut map = ProviderMap::new();
        map.insert(p.key(), p);
        map
    }

    fn contracts_table() -> Vec<Vec<String>> {
        vec![
            vec![
                "Numero de Contrato",
                "Departamento",
                "Municipio",
                "Valor Contrato Subsidiado",
                "Poblacion Subsidiado",
                "Poblacion Pediatria",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            vec![
                "C-001",
                "LA GUAJIRA",
                "URIBIA",
                "$ 1.234.567",
                "1.200",
                "300",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        ]
    }

    fn coverage_table() -> Vec<Vec<String>> {
        vec![
            vec!["NIT", "Departamento", "Poblacion Subsidiado"]
                .into_iter()
                .map(String::from)
                .collect(),
            vec!["900794134", "CESAR", "500"]
                .into_iter()
                .map(String::from)
                .collect(),
        ]
    }

    #[test]
    fn test_enrichment_from_contracts_index() {
        let indexes = AuxiliaryIndexes::build(Some(&contracts_table()), None);
        let providers = provider_map(provider("C-001", "900794134", "SUBSIDIADO", "ESPECIALIDADES"));

        let enriched = enrich_providers(&providers, &indexes);
        let p = enriched.values().next().unwrap();
        assert_eq!(p.department.as_deref(), Some("LA GUAJIRA"));
        assert_eq!(p.municipality.as_deref(), Some("URIBIA"));
        assert_eq!(p.contract_value, Some(1234567.0));
        assert_eq!(p.population, Some(1200));

        // Input untouched.
        assert!(providers.values().next().unwrap().department.is_none());
    }

    #[test]
    fn test_fallback_to_coverage_index_by_tax_id() {
        let indexes = AuxiliaryIndexes::build(Some(&contracts_table()), Some(&coverage_table()));
        let providers = provider_map(provider("UNKNOWN", "900794134", "SUBSIDIADO", "BASICA"));

        let enriched = enrich_providers(&providers, &indexes);
        let p = enriched.values().next().unwrap();
        assert_eq!(p.department.as_deref(), Some("CESAR"));
        assert_eq!(p.population, Some(500));
        // Coverage table has no municipality or contract value columns.
        assert!(p.municipality.is_none());
        assert!(p.contract_value.is_none());
    }

    #[test]
    fn test_missing_header_leaves_field_unset() {
        let table = vec![
            vec!["Numero de Contrato".to_string(), "Municipio".to_string()],
            vec!["C-001".to_string(), "URIBIA".to_string()],
        ];
        let indexes = AuxiliaryIndexes::build(Some(&table), None);
        let providers = provider_map(provider("C-001", "1", "SUBSIDIADO", "BASICA"));

        let enriched = enrich_providers(&providers, &indexes);
        let p = enriched.values().next().unwrap();
        assert!(p.department.is_none());
        assert_eq!(p.municipality.as_deref(), Some("URIBIA"));
    }

    #[test]
    fn test_enrichment_is_idempotent() {
        let indexes = AuxiliaryIndexes::build(Some(&contracts_table()), None);
        let providers = provider_map(provider("C-001", "1", "SUBSIDIADO", "BASICA"));

        let once = enrich_providers(&providers, &indexes);
        let twice = enrich_providers(&once, &indexes);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_parse_failure_keeps_previous_value() {
        let indexes = AuxiliaryIndexes::build(Some(&contracts_table()), None);
        let providers = provider_map(provider("C-001", "1", "SUBSIDIADO", "BASICA"));
        let enriched = enrich_providers(&providers, &indexes);

        let garbage = vec![
            vec![
                "Numero de Contrato".to_string(),
                "Valor Contrato Subsidiado".to_string(),
                "Poblacion Subsidiado".to_string(),
            ],
            vec!["C-001".to_string(), "pendiente".to_string(), "n/a".to_string()],
        ];
        let garbage_indexes = AuxiliaryIndexes::build(Some(&garbage), None);

        let re_enriched = enrich_providers(&enriched, &garbage_indexes);
        let p = re_enriched.values().next().unwrap();
        assert_eq!(p.contract_value, Some(1234567.0));
        assert_eq!(p.population, Some(1200));
    }

    #[test]
    fn test_population_for_whitelist_and_specialty() {
        let indexes = AuxiliaryIndexes::build(Some(&contracts_table()), None);
        let mut p = provider("C-001", "1", "SUBSIDIADO", "BASICA");
        p.population = Some(1200);

        assert_eq!(indexes.population_for(&p, "MEDICINA GENERAL"), 1200);
        assert_eq!(indexes.population_for(&p, "CONSULTA PEDIATRIA"), 300);
        // Specialty without its own column falls back to general population.
        assert_eq!(indexes.population_for(&p, "GINECOLOGIA"), 1200);
        // No data at all: denominator 0, never a fault.
        let orphan = provider("NONE", "0", "SUBSIDIADO", "X");
        assert_eq!(indexes.population_for(&orphan, "PEDIATRIA"), 0);
    }
}
