/*!
 * Provider aggregator for the AF (provider/contract) segment
 *
 * Extracts provider/contract/billing-period records from AF lines and
 * accumulates them across files keyed by tax-ID and provider name. The
 * cross-file accumulation is an explicit fold over per-file partial maps:
 * merging partials must produce exactly the same totals and detail order as
 * one pass over the concatenated AF lines.
 */

use crate::data_types::{AfDetail, ProviderAggregate, ProviderMap, SegmentMap};
use crate::schema::{AF_LAYOUT, PROVIDER_SEGMENT};

/// Extract provider aggregates from one parsed file.
///
/// AF lines with fewer than the layout's minimum column count are skipped
/// as partial records; unparseable billed values contribute 0.
pub fn extract_providers(segments: &SegmentMap, source_file: &str) -> ProviderMap {
    let mut providers = ProviderMap::new();

    let Some(af_lines) = segments.lines(PROVIDER_SEGMENT) else {
        return providers;
    };

    for line in af_lines {
        let cols: Vec<&str> = line.split(',').collect();
        if cols.len() < AF_LAYOUT.min_columns {
            continue;
        }

        let provider_name = cols[AF_LAYOUT.provider_name].trim().to_string();
        let tax_id = cols[AF_LAYOUT.tax_id].trim().to_string();
        let value = cols[AF_LAYOUT.billed_value]
            .trim()
            .parse::<f64>()
            .unwrap_or(0.0);

        let detail = AfDetail {
            period_start: cols[AF_LAYOUT.period_start].trim().to_string(),
            period_end: cols[AF_LAYOUT.period_end].trim().to_string(),
            value,
            source_file: source_file.to_string(),
        };

        let key = format!("{}-{}", tax_id, provider_name);
        let entry = providers.entry(key).or_insert_with(|| ProviderAggregate {
            provider_name,
            tax_id,
            contract: cols[AF_LAYOUT.contract].trim().to_string(),
            service_type: cols[AF_LAYOUT.service_type].trim().to_string(),
            regimen: cols[AF_LAYOUT.regimen].trim().to_string(),
            details: Vec::new(),
            total_value: 0.0,
            department: None,
            municipality: None,
            contract_value: None,
            population: None,
        });

        entry.details.push(detail);
        entry.total_value += value;
    }

    providers
}

/// Fold one per-file partial map into the accumulator.
///
/// Existing keys keep their descriptive fields from the first encounter;
/// detail lists are concatenated in call order and totals summed.
pub fn merge_providers(into: &mut ProviderMap, from: ProviderMap) {
    for (key, partial) in from {
        match into.get_mut(&key) {
            Some(existing) => {
                existing.total_value += partial.total_value;
                existing.details.extend(partial.details);
            }
            None => {
                into.insert(key, partial);
            }
        }
    }
}

/// Aggregate provider data across many parsed files, in the given order
pub fn aggregate_files<'a, I>(files: I) -> ProviderMap
where
    I: IntoIterator<Item = (&'a str, &'a SegmentMap)>,
{
    let mut providers = ProviderMap::new();
    for (file_name, segments) in files {
        merge_providers(&mut providers, extract_providers(segments, file_name));
    }
    providers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HeuristicThresholds;
    use crate::parser::parse_segments_with;

    const FILE_A: &str = "ARCHIVO-RIPS-AF\n\
        440010095404,IPS KOTTUSHI,NI,900794134,ACP170,05/05/2025,01/04/2025,30/04/2025,EPSI01,DUSAKAWI,44847-08EB,ESPECIALIDADES,SUBSIDIADO,0,0,0,100,\n\
        ARCHIVO-RIPS-AF";

    const FILE_B: &str = "ARCHIVO-RIPS-AF\n\
        440010095404,IPS KOTTUSHI,NI,900794134,ACP171,05/06/2025,01/05/2025,31/05/2025,EPSI01,DUSAKAWI,44847-08EB,ESPECIALIDADES,SUBSIDIADO,0,0,0,250,\n\
        440010095405,IPS WAYUU,NI,800123456,ACP900,05/06/2025,01/05/2025,31/05/2025,EPSI01,DUSAKAWI,44850-01AA,BASICA,CONTRIBUTIVO,0,0,0,75,\n\
        ARCHIVO-RIPS-AF";

    fn parse(text: &str) -> SegmentMap {
        parse_segments_with(text, &HeuristicThresholds::default())
    }

    #[test]
    fn test_extract_af_fields() {
        let providers = extract_providers(&parse(FILE_A), "a.txt");
        let agg = &providers["900794134-IPS KOTTUSHI"];
        assert_eq!(agg.provider_name, "IPS KOTTUSHI");
        assert_eq!(agg.tax_id, "900794134");
        assert_eq!(agg.contract, "44847-08EB");
        assert_eq!(agg.service_type, "ESPECIALIDADES");
        assert_eq!(agg.regimen, "SUBSIDIADO");
        assert_eq!(agg.total_value, 100.0);
        assert_eq!(agg.details.len(), 1);
        assert_eq!(agg.details[0].period_label(), "01/04/2025 a 30/04/2025");
        assert_eq!(agg.details[0].source_file, "a.txt");
    }

    #[test]
    fn test_short_lines_skipped() {
        let segments = parse("ARCHIVO-RIPS-AF\na,b,c,d\nARCHIVO-RIPS-AF");
        assert!(extract_providers(&segments, "x.txt").is_empty());
    }

    #[test]
    fn test_unparseable_value_counts_zero() {
        let text = "ARCHIVO-RIPS-AF\n\
            x,P,NI,1,x,x,01/01/2025,31/01/2025,x,x,C1,SERV,SUBSIDIADO,0,0,0,not-a-number,\n\
            ARCHIVO-RIPS-AF";
        let providers = extract_providers(&parse(text), "x.txt");
        let agg = &providers["1-P"];
        assert_eq!(agg.total_value, 0.0);
        assert_eq!(agg.details[0].value, 0.0);
    }

    #[test]
    fn test_merge_accumulates_same_key() {
        let a = parse(FILE_A);
        let b = parse(FILE_B);
        let merged = aggregate_files(vec![("a.txt", &a), ("b.txt", &b)]);

        let agg = &merged["900794134-IPS KOTTUSHI"];
        assert_eq!(agg.total_value, 350.0);
        assert_eq!(agg.details.len(), 2);
        assert_eq!(agg.details[0].source_file, "a.txt");
        assert_eq!(agg.details[1].source_file, "b.txt");

        assert_eq!(merged["800123456-IPS WAYUU"].total_value, 75.0);
    }

    #[test]
    fn test_merge_commutativity_with_concatenation() {
        // Separately extracted and merged partials must equal one pass over
        // the concatenated AF lines (with matching source file names).
        let a = parse(FILE_A);
        let b = parse(FILE_B);
        let merged = aggregate_files(vec![("rips.txt", &a), ("rips.txt", &b)]);

        let mut concatenated = a.clone();
        concatenated.merge(b);
        let single_pass = extract_providers(&concatenated, "rips.txt");

        assert_eq!(merged, single_pass);
    }

    #[test]
    fn test_totals_equal_detail_sums() {
        let a = parse(FILE_A);
        let b = parse(FILE_B);
        let merged = aggregate_files(vec![("a.txt", &a), ("b.txt", &b)]);
        for agg in merged.values() {
            let detail_sum: f64 = agg.details.iter().map(|d| d.value).sum();
            assert_eq!(agg.total_value, detail_sum);
        }
    }
}
