/*!
 * Validation engine: declared vs actual record counts
 *
 * The CT (control) segment declares how many records each other segment
 * should carry. Validation reconciles those declarations against the counts
 * the parser actually produced. Count mismatches are ordinary results, not
 * errors; a file without a CT segment simply fails every found segment
 * against an expectation of zero.
 */

use std::collections::{BTreeSet, HashMap};

use crate::data_types::{FileValidation, SegmentCheck, SegmentCode, SegmentMap, ValidationStatus};
use crate::schema::{CONTROL_SEGMENT, CT_LAYOUT};

/// Sum the declared record counts per segment code from all CT lines.
///
/// Multiple CT lines for the same code add up (multi-page control sections).
/// Non-numeric counts contribute nothing.
pub fn expected_counts(segments: &SegmentMap) -> HashMap<SegmentCode, u64> {
    let mut expected = HashMap::new();

    let Some(control_lines) = segments.lines(CONTROL_SEGMENT) else {
        return expected;
    };

    for line in control_lines {
        let cols: Vec<&str> = line.split(',').collect();
        if cols.len() < CT_LAYOUT.min_columns {
            continue;
        }
        let code: String = cols[CT_LAYOUT.segment_code].trim().chars().take(2).collect();
        if code.is_empty() {
            continue;
        }
        if let Ok(count) = cols[CT_LAYOUT.count].trim().parse::<u64>() {
            *expected.entry(SegmentCode::normalized(&code)).or_insert(0) += count;
        }
    }

    expected
}

/// Count the lines actually parsed into each segment, CT excluded
pub fn found_counts(segments: &SegmentMap) -> HashMap<SegmentCode, u64> {
    segments
        .iter()
        .filter(|(code, _)| code.as_str() != CONTROL_SEGMENT)
        .map(|(code, lines)| (code.clone(), lines.len() as u64))
        .collect()
}

/// Validate one parsed file: compare declared and found counts segment by
/// segment, over the union of both key sets, sorted ascending, CT excluded
pub fn validate_file(file_name: &str, segments: &SegmentMap) -> FileValidation {
    let expected = expected_counts(segments);
    let found = found_counts(segments);

    let names: BTreeSet<SegmentCode> = expected
        .keys()
        .chain(found.keys())
        .filter(|code| code.as_str() != CONTROL_SEGMENT)
        .cloned()
        .collect();

    let checks = names
        .into_iter()
        .map(|name| {
            let exp = expected.get(&name).copied().unwrap_or(0);
            let fnd = found.get(&name).copied().unwrap_or(0);
            SegmentCheck {
                status: if exp == fnd {
                    ValidationStatus::Ok
                } else {
                    ValidationStatus::Fail
                },
                name,
                expected: exp,
                found: fnd,
            }
        })
        .collect();

    FileValidation {
        file_name: file_name.to_string(),
        segments: checks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HeuristicThresholds;
    use crate::parser::parse_segments_with;

    fn parse(text: &str) -> SegmentMap {
        parse_segments_with(text, &HeuristicThresholds::default())
    }

    fn fixture(af_lines: usize, ac_lines: usize) -> SegmentMap {
        let mut text = String::from("ARCHIVO-RIPS-CT\nx,x,AF,5\nx,x,AC,5\nARCHIVO-RIPS-CT\n");
        text.push_str("ARCHIVO-RIPS-AF\n");
        for i in 0..af_lines {
            text.push_str(&format!("af,line,{}\n", i));
        }
        text.push_str("ARCHIVO-RIPS-AF\nARCHIVO-RIPS-AC\n");
        for i in 0..ac_lines {
            text.push_str(&format!("ac,line,{}\n", i));
        }
        text.push_str("ARCHIVO-RIPS-AC\n");
        parse(&text)
    }

    #[test]
    fn test_expected_counts_sum_per_code() {
        let segments = parse(
            "ARCHIVO-RIPS-CT\n\
             x,x,AF,5\n\
             x,x,AF,3\n\
             x,x,AC,7\n\
             ARCHIVO-RIPS-CT",
        );
        let expected = expected_counts(&segments);
        assert_eq!(expected[&SegmentCode::normalized("AF")], 8);
        assert_eq!(expected[&SegmentCode::normalized("AC")], 7);
    }

    #[test]
    fn test_expected_counts_ignores_non_numeric() {
        let segments = parse(
            "ARCHIVO-RIPS-CT\n\
             x,x,AF,cinco\n\
             x,x,AF,4\n\
             ARCHIVO-RIPS-CT",
        );
        let expected = expected_counts(&segments);
        assert_eq!(expected[&SegmentCode::normalized("AF")], 4);
    }

    #[test]
    fn test_expected_counts_code_case_normalized() {
        let segments = parse("ARCHIVO-RIPS-CT\nx,x,afc123,2\nARCHIVO-RIPS-CT");
        let expected = expected_counts(&segments);
        assert_eq!(expected[&SegmentCode::normalized("AF")], 2);
    }

    #[test]
    fn test_validation_scenario_ok_and_fail() {
        let result = validate_file("test.txt", &fixture(5, 3));
        assert_eq!(result.segments.len(), 2);

        // Sorted ascending: AC before AF.
        assert_eq!(result.segments[0].name, SegmentCode::normalized("AC"));
        assert_eq!(result.segments[0].expected, 5);
        assert_eq!(result.segments[0].found, 3);
        assert_eq!(result.segments[0].status, ValidationStatus::Fail);

        assert_eq!(result.segments[1].name, SegmentCode::normalized("AF"));
        assert_eq!(result.segments[1].expected, 5);
        assert_eq!(result.segments[1].found, 5);
        assert_eq!(result.segments[1].status, ValidationStatus::Ok);

        assert!(!result.passed());
        assert_eq!(result.failures().count(), 1);
    }

    #[test]
    fn test_found_matches_parser_exactly() {
        let segments = fixture(5, 3);
        let found = found_counts(&segments);
        assert_eq!(found[&SegmentCode::normalized("AF")], 5);
        assert_eq!(found[&SegmentCode::normalized("AC")], 3);
        assert!(!found.contains_key(&SegmentCode::normalized("CT")));
    }

    #[test]
    fn test_missing_control_segment_fails_everything() {
        let segments = parse("ARCHIVO-RIPS-AF\na,b,c\nd,e,f\nARCHIVO-RIPS-AF");
        let result = validate_file("no_ct.txt", &segments);
        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.segments[0].expected, 0);
        assert_eq!(result.segments[0].found, 2);
        assert_eq!(result.segments[0].status, ValidationStatus::Fail);
    }

    #[test]
    fn test_declared_but_absent_segment_reported() {
        let segments = parse("ARCHIVO-RIPS-CT\nx,x,AH,2\nARCHIVO-RIPS-CT");
        let result = validate_file("absent.txt", &segments);
        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.segments[0].name, SegmentCode::normalized("AH"));
        assert_eq!(result.segments[0].expected, 2);
        assert_eq!(result.segments[0].found, 0);
    }
}
