/*!
 * Coincidence (cross-reference) engine
 *
 * Joins the CUPS dictionary against the cross-file union of activity
 * segments. Segments with a fixed service-code column are matched exactly
 * at that offset; the US segment has no such column and falls back to a
 * delimiter-bounded containment test against the raw line — an intentionally
 * looser match inherited from the file format, kept as documented behavior.
 * Each record's frequency-of-use divides its total match count by the
 * population resolved for the entry's service type; a zero denominator
 * yields a ratio of exactly zero.
 */

use std::collections::{BTreeMap, HashSet};

use crate::data_types::{
    Coincidence, CoincidenceReport, CupsEntry, ProviderAggregate, ProviderMap, SegmentCode,
    SegmentMap,
};
use crate::enrich::AuxiliaryIndexes;
use crate::schema::{service_code_column, ACTIVITY_SEGMENTS, USER_SEGMENT, US_LAYOUT};

/// Build the coincidence report for a code dictionary against all parsed
/// activity segments, using enriched provider data for the denominators
pub fn build_report(
    dictionary: &[CupsEntry],
    segments: &SegmentMap,
    providers: &ProviderMap,
    indexes: &AuxiliaryIndexes,
) -> CoincidenceReport {
    let representative = representative_provider(providers);

    let records = dictionary
        .iter()
        .filter(|entry| entry.has_code())
        .map(|entry| cross_reference(entry, segments, representative, indexes))
        .collect();

    CoincidenceReport {
        providers: providers.clone(),
        records,
        total_population: unique_patient_count(segments),
    }
}

/// Cross-reference one dictionary entry against every activity segment
fn cross_reference(
    entry: &CupsEntry,
    segments: &SegmentMap,
    representative: Option<&ProviderAggregate>,
    indexes: &AuxiliaryIndexes,
) -> Coincidence {
    let code = entry.code.trim();
    let current = entry.current_code.trim();

    let mut per_segment = BTreeMap::new();
    let mut total = 0u64;

    for segment in ACTIVITY_SEGMENTS {
        let lines = segments.lines(segment).unwrap_or(&[]);
        let count = match service_code_column(segment) {
            Some(column) => count_offset_matches(lines, column, code, current),
            None => count_containment_matches(lines, code, current),
        };
        per_segment.insert(SegmentCode::normalized(segment), count);
        total += count;
    }

    let population = representative
        .map(|provider| indexes.population_for(provider, &entry.service_type))
        .unwrap_or(0);
    let frequency_of_use = if population > 0 {
        total as f64 / population as f64
    } else {
        0.0
    };

    Coincidence {
        code: entry.code.clone(),
        current_code: entry.current_code.clone(),
        name: entry.name.clone(),
        service_type: entry.service_type.clone(),
        per_segment,
        total,
        population,
        frequency_of_use,
    }
}

/// Total matches for one dictionary entry across all activity segments
pub fn total_matches(entry: &CupsEntry, segments: &SegmentMap) -> u64 {
    let code = entry.code.trim();
    let current = entry.current_code.trim();

    ACTIVITY_SEGMENTS
        .iter()
        .map(|segment| {
            let lines = segments.lines(segment).unwrap_or(&[]);
            match service_code_column(segment) {
                Some(column) => count_offset_matches(lines, column, code, current),
                None => count_containment_matches(lines, code, current),
            }
        })
        .sum()
}

/// Count lines whose service-code column equals either code
fn count_offset_matches(lines: &[String], column: usize, code: &str, current: &str) -> u64 {
    lines
        .iter()
        .filter(|line| {
            line.split(',')
                .nth(column)
                .map(|cell| {
                    let cell = cell.trim();
                    !cell.is_empty() && (cell == code || (!current.is_empty() && cell == current))
                })
                .unwrap_or(false)
        })
        .count() as u64
}

/// Count lines containing either code bounded by delimiters on both sides
fn count_containment_matches(lines: &[String], code: &str, current: &str) -> u64 {
    let needles: Vec<String> = [code, current]
        .iter()
        .filter(|c| !c.is_empty())
        .map(|c| format!(",{},", c))
        .collect();

    lines
        .iter()
        .filter(|line| {
            let bounded = format!(",{},", line);
            needles.iter().any(|needle| bounded.contains(needle))
        })
        .count() as u64
}

/// The provider whose enrichment backs population resolution: the first
/// enriched aggregate in key order, else the first aggregate
fn representative_provider(providers: &ProviderMap) -> Option<&ProviderAggregate> {
    providers
        .values()
        .find(|p| p.is_enriched())
        .or_else(|| providers.values().next())
}

/// Unique patients across all US segment lines, keyed by document number
pub fn unique_patient_count(segments: &SegmentMap) -> usize {
    let Some(lines) = segments.lines(USER_SEGMENT) else {
        return 0;
    };

    let documents: HashSet<&str> = lines
        .iter()
        .filter_map(|line| line.split(',').nth(US_LAYOUT.document_number))
        .map(str::trim)
        .filter(|doc| !doc.is_empty())
        .collect();
    documents.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::SegmentMap;

    fn entry(code: &str, current: &str, service: &str) -> CupsEntry {
        CupsEntry {
            code: code.to_string(),
            current_code: current.to_string(),
            name: format!("SERVICIO {}", code),
            service_type: service.to_string(),
        }
    }

    fn segments_with_ac_hits() -> SegmentMap {
        let mut segments = SegmentMap::new();
        let ac = SegmentCode::normalized("AC");
        // Column 6 holds the service code in AC lines.
        for _ in 0..4 {
            segments.push_line(ac.clone(), "a,b,c,d,e,f,890201,h".to_string());
        }
        segments.push_line(ac.clone(), "a,b,c,d,e,f,999999,h".to_string());
        // 890201 in a non-code column must not count.
        segments.push_line(ac, "890201,b,c,d,e,f,111111,h".to_string());
        segments
    }

    #[test]
    fn test_offset_match_scenario() {
        let dictionary = vec![entry("890201", "", "ESPECIALIDADES")];
        let report = build_report(
            &dictionary,
            &segments_with_ac_hits(),
            &ProviderMap::new(),
            &AuxiliaryIndexes::default(),
        );

        assert_eq!(report.records.len(), 1);
        let record = &report.records[0];
        assert_eq!(record.total, 4);
        for segment in ACTIVITY_SEGMENTS {
            let expected = if segment == "AC" { 4 } else { 0 };
            assert_eq!(
                record.per_segment[&SegmentCode::normalized(segment)],
                expected,
                "segment {}",
                segment
            );
        }
    }

    #[test]
    fn test_zero_denominator_yields_zero_ratio() {
        let dictionary = vec![entry("890201", "", "ESPECIALIDADES")];
        let report = build_report(
            &dictionary,
            &segments_with_ac_hits(),
            &ProviderMap::new(),
            &AuxiliaryIndexes::default(),
        );
        let record = &report.records[0];
        assert_eq!(record.population, 0);
        assert_eq!(record.frequency_of_use, 0.0);
        assert!(record.frequency_of_use.is_finite());
    }

    #[test]
    fn test_superseding_code_matches() {
        let mut segments = SegmentMap::new();
        segments.push_line(
            SegmentCode::normalized("AP"),
            "a,b,c,d,e,f,g,903801,i".to_string(),
        );
        let dictionary = vec![entry("903800", "903801", "LABORATORIO")];
        let report = build_report(
            &dictionary,
            &segments,
            &ProviderMap::new(),
            &AuxiliaryIndexes::default(),
        );
        assert_eq!(report.records[0].total, 1);
    }

    #[test]
    fn test_us_containment_is_delimiter_bounded() {
        let mut segments = SegmentMap::new();
        let us = SegmentCode::normalized("US");
        segments.push_line(us.clone(), "CC,123,x,890201,y".to_string());
        // Substring of a longer token: must not match.
        segments.push_line(us.clone(), "CC,124,x,1890201,y".to_string());
        // Code at end of line: bounded by the appended delimiter.
        segments.push_line(us, "CC,125,x,890201".to_string());

        let dictionary = vec![entry("890201", "", "ESPECIALIDADES")];
        let report = build_report(
            &dictionary,
            &segments,
            &ProviderMap::new(),
            &AuxiliaryIndexes::default(),
        );
        assert_eq!(
            report.records[0].per_segment[&SegmentCode::normalized("US")],
            2
        );
    }

    #[test]
    fn test_dictionary_order_preserved_and_codeless_skipped() {
        let dictionary = vec![
            entry("890201", "", "A"),
            entry("", "", "B"),
            entry("903800", "", "C"),
        ];
        let report = build_report(
            &dictionary,
            &SegmentMap::new(),
            &ProviderMap::new(),
            &AuxiliaryIndexes::default(),
        );
        let codes: Vec<&str> = report.records.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["890201", "903800"]);
    }

    #[test]
    fn test_unique_patient_count_dedups_documents() {
        let mut segments = SegmentMap::new();
        let us = SegmentCode::normalized("US");
        segments.push_line(us.clone(), "CC,111,a".to_string());
        segments.push_line(us.clone(), "CC,222,b".to_string());
        segments.push_line(us.clone(), "TI,111,c".to_string());
        segments.push_line(us, "CC,,d".to_string());
        assert_eq!(unique_patient_count(&segments), 2);
    }
}
