/*!
 * User registry and utilization analytics
 *
 * Parses the US (user registry) segment into typed patient records, dedups
 * them by document number, and ranks dictionary codes by how often they
 * appear across the activity segments.
 */

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::coincidence::total_matches;
use crate::data_types::{CupsEntry, SegmentMap, UserRecord};
use crate::schema::{USER_SEGMENT, US_LAYOUT};

/// Parse one US segment line into a user record.
///
/// Lines with fewer than the layout's minimum column count are skipped.
pub fn parse_user(line: &str) -> Option<UserRecord> {
    let cols: Vec<&str> = line.split(',').collect();
    if cols.len() < US_LAYOUT.min_columns {
        return None;
    }

    let field = |idx: usize| cols[idx].trim().to_string();

    Some(UserRecord {
        document_type: field(US_LAYOUT.document_type),
        document_number: field(US_LAYOUT.document_number),
        habilitation_code: field(US_LAYOUT.habilitation_code),
        user_type: field(US_LAYOUT.user_type),
        first_surname: field(US_LAYOUT.first_surname),
        second_surname: field(US_LAYOUT.second_surname),
        first_name: field(US_LAYOUT.first_name),
        second_name: field(US_LAYOUT.second_name),
        age: cols[US_LAYOUT.age].trim().parse().ok(),
        age_unit: field(US_LAYOUT.age_unit),
        sex: field(US_LAYOUT.sex),
        department: field(US_LAYOUT.department),
        municipality: field(US_LAYOUT.municipality),
        zone: field(US_LAYOUT.zone),
    })
}

/// Parse every US line of a segment map, in file order
pub fn collect_users(segments: &SegmentMap) -> Vec<UserRecord> {
    segments
        .lines(USER_SEGMENT)
        .unwrap_or(&[])
        .iter()
        .filter_map(|line| parse_user(line))
        .collect()
}

/// Dedup users by document number; a repeated document keeps the last
/// record seen
pub fn unique_users(users: Vec<UserRecord>) -> BTreeMap<String, UserRecord> {
    users
        .into_iter()
        .filter(|u| !u.document_number.is_empty())
        .map(|u| (u.document_number.clone(), u))
        .collect()
}

/// One dictionary code ranked by total activity matches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRanking {
    pub code: String,
    pub description: String,
    pub count: u64,
}

/// Rank dictionary codes by occurrence across the activity segments,
/// descending, ties broken by code; zero-count codes are omitted
pub fn activity_ranking(
    dictionary: &[CupsEntry],
    segments: &SegmentMap,
    limit: usize,
) -> Vec<ActivityRanking> {
    let mut ranking: Vec<ActivityRanking> = dictionary
        .iter()
        .filter(|entry| entry.has_code())
        .map(|entry| ActivityRanking {
            code: entry.code.clone(),
            description: entry.name.clone(),
            count: total_matches(entry, segments),
        })
        .filter(|r| r.count > 0)
        .collect();

    ranking.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.code.cmp(&b.code)));
    ranking.truncate(limit);
    ranking
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::SegmentCode;

    const US_LINE: &str = "CC,1065810101,440010095404,2,EPIAYU,PUSHAINA,MARIA,JOSE,31,1,F,44,847,R,N";

    #[test]
    fn test_parse_user_fields() {
        let user = parse_user(US_LINE).unwrap();
        assert_eq!(user.document_type, "CC");
        assert_eq!(user.document_number, "1065810101");
        assert_eq!(user.full_name(), "MARIA JOSE EPIAYU PUSHAINA");
        assert_eq!(user.formatted_age(), "31A");
        assert_eq!(user.sex, "F");
        assert_eq!(user.department, "44");
        assert_eq!(user.municipality, "847");
    }

    #[test]
    fn test_parse_user_rejects_short_lines() {
        assert!(parse_user("CC,123,x").is_none());
    }

    #[test]
    fn test_unique_users_last_record_wins() {
        let mut segments = SegmentMap::new();
        let us = SegmentCode::normalized("US");
        segments.push_line(us.clone(), US_LINE.to_string());
        segments.push_line(
            us,
            "TI,1065810101,440010095404,2,EPIAYU,PUSHAINA,MARIA,JOSE,32,1,F,44,847,R,N".to_string(),
        );

        let users = unique_users(collect_users(&segments));
        assert_eq!(users.len(), 1);
        assert_eq!(users["1065810101"].document_type, "TI");
        assert_eq!(users["1065810101"].age, Some(32));
    }

    #[test]
    fn test_activity_ranking_orders_by_count() {
        let mut segments = SegmentMap::new();
        let ac = SegmentCode::normalized("AC");
        for _ in 0..3 {
            segments.push_line(ac.clone(), "a,b,c,d,e,f,890201,h".to_string());
        }
        segments.push_line(ac, "a,b,c,d,e,f,903800,h".to_string());

        let dictionary = vec![
            CupsEntry {
                code: "903800".into(),
                current_code: String::new(),
                name: "LAB".into(),
                service_type: "LABORATORIO".into(),
            },
            CupsEntry {
                code: "890201".into(),
                current_code: String::new(),
                name: "CONSULTA".into(),
                service_type: "MEDICINA GENERAL".into(),
            },
            CupsEntry {
                code: "999999".into(),
                current_code: String::new(),
                name: "UNUSED".into(),
                service_type: "X".into(),
            },
        ];

        let ranking = activity_ranking(&dictionary, &segments, 10);
        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking[0].code, "890201");
        assert_eq!(ranking[0].count, 3);
        assert_eq!(ranking[1].code, "903800");
    }
}
