//! Vulnerability part of the merge.
//!
//! Two vulnerability entries describe the same issue when they share any
//! identifier, the entry's own id or any reference id. For a matched pair
//! the affects lists are unioned by ref and the ratings reconciled per
//! scoring method: the fresher document wins, freshness taken from the
//! entries' `updated` (falling back to `published`) stamps; without usable
//! stamps the higher score wins.

use chrono::{DateTime, FixedOffset};
use tracing::debug;

use crate::model::{Sbom, Vulnerability};

/// Whether two entries refer to the same vulnerability. Entries without any
/// identifier never match, mirroring the component identity rule.
#[must_use]
pub fn vulnerabilities_match(a: &Vulnerability, b: &Vulnerability) -> bool {
    let other = b.aliases();
    a.aliases().iter().any(|id| other.contains(id))
}

pub(super) fn merge_vulnerabilities(governing: &mut Sbom, incoming: Vec<Vulnerability>) {
    let mut merged = governing.vulnerabilities.take().unwrap_or_default();
    for vulnerability in incoming {
        match merged
            .iter_mut()
            .find(|existing| vulnerabilities_match(existing, &vulnerability))
        {
            Some(existing) => merge_pair(existing, vulnerability),
            None => merged.push(vulnerability),
        }
    }
    governing.vulnerabilities = if merged.is_empty() { None } else { Some(merged) };
}

fn merge_pair(existing: &mut Vulnerability, incoming: Vulnerability) {
    let incoming_is_fresher = match (freshness(existing), freshness(&incoming)) {
        (Some(old), Some(new)) => Some(new > old),
        _ => None,
    };

    // affects: union by ref, existing order first
    let mut affects = existing.affects.take().unwrap_or_default();
    if let Some(incoming_affects) = incoming.affects {
        for affect in incoming_affects {
            if !affects.iter().any(|a| a.affect_ref == affect.affect_ref) {
                affects.push(affect);
            }
        }
    }
    existing.affects = if affects.is_empty() { None } else { Some(affects) };

    // ratings: one entry per scoring method
    let mut ratings = existing.ratings.take().unwrap_or_default();
    if let Some(incoming_ratings) = incoming.ratings {
        for rating in incoming_ratings {
            match ratings.iter_mut().find(|r| r.method == rating.method) {
                None => ratings.push(rating),
                Some(current) => {
                    let replace = match incoming_is_fresher {
                        Some(fresher) => fresher,
                        None => match (rating.score, current.score) {
                            (Some(new), Some(old)) => new > old,
                            (Some(_), None) => true,
                            _ => false,
                        },
                    };
                    if replace {
                        debug!(
                            "rating for method {:?} replaced by incoming entry",
                            current.method
                        );
                        *current = rating;
                    }
                }
            }
        }
    }
    existing.ratings = if ratings.is_empty() { None } else { Some(ratings) };

    if incoming_is_fresher == Some(true) {
        if incoming.updated.is_some() {
            existing.updated = incoming.updated;
        }
        if incoming.published.is_some() {
            existing.published = incoming.published;
        }
    }
}

fn freshness(vulnerability: &Vulnerability) -> Option<DateTime<FixedOffset>> {
    vulnerability
        .updated
        .as_deref()
        .or(vulnerability.published.as_deref())
        .and_then(|stamp| DateTime::parse_from_rfc3339(stamp).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vuln(value: serde_json::Value) -> Vulnerability {
        serde_json::from_value(value).unwrap()
    }

    fn empty_sbom_with(vulnerabilities: Vec<Vulnerability>) -> Sbom {
        Sbom {
            vulnerabilities: Some(vulnerabilities),
            ..Sbom::default()
        }
    }

    #[test]
    fn test_match_via_reference_alias() {
        let a = vuln(json!({"id": "CVE-2024-0001"}));
        let b = vuln(json!({
            "id": "GHSA-aaaa-bbbb-cccc",
            "references": [{"id": "CVE-2024-0001"}]
        }));
        assert!(vulnerabilities_match(&a, &b));
    }

    #[test]
    fn test_entries_without_ids_never_match() {
        let a = vuln(json!({"description": "something"}));
        let b = vuln(json!({"description": "something"}));
        assert!(!vulnerabilities_match(&a, &b));
    }

    #[test]
    fn test_affects_union_by_ref() {
        let mut governing = empty_sbom_with(vec![vuln(json!({
            "id": "CVE-1", "affects": [{"ref": "a"}, {"ref": "b"}]
        }))]);
        merge_vulnerabilities(
            &mut governing,
            vec![vuln(json!({"id": "CVE-1", "affects": [{"ref": "b"}, {"ref": "c"}]}))],
        );

        let merged = &governing.vulnerabilities.as_ref().unwrap()[0];
        let refs: Vec<&str> = merged
            .affects
            .as_ref()
            .unwrap()
            .iter()
            .map(|a| a.affect_ref.as_str())
            .collect();
        assert_eq!(refs, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_fresher_entry_wins_rating() {
        let mut governing = empty_sbom_with(vec![vuln(json!({
            "id": "CVE-1",
            "updated": "2024-01-01T00:00:00Z",
            "ratings": [{"method": "CVSSv3", "score": 9.8}]
        }))]);
        merge_vulnerabilities(
            &mut governing,
            vec![vuln(json!({
                "id": "CVE-1",
                "updated": "2024-06-01T00:00:00Z",
                "ratings": [{"method": "CVSSv3", "score": 5.0}]
            }))],
        );

        let merged = &governing.vulnerabilities.as_ref().unwrap()[0];
        let rating = &merged.ratings.as_ref().unwrap()[0];
        assert_eq!(rating.score, Some(5.0));
        assert_eq!(merged.updated.as_deref(), Some("2024-06-01T00:00:00Z"));
    }

    #[test]
    fn test_stale_entry_keeps_existing_rating() {
        let mut governing = empty_sbom_with(vec![vuln(json!({
            "id": "CVE-1",
            "updated": "2024-06-01T00:00:00Z",
            "ratings": [{"method": "CVSSv3", "score": 9.8}]
        }))]);
        merge_vulnerabilities(
            &mut governing,
            vec![vuln(json!({
                "id": "CVE-1",
                "updated": "2024-01-01T00:00:00Z",
                "ratings": [{"method": "CVSSv3", "score": 5.0}]
            }))],
        );

        let rating = &governing.vulnerabilities.as_ref().unwrap()[0].ratings.as_ref().unwrap()[0];
        assert_eq!(rating.score, Some(9.8));
    }

    #[test]
    fn test_without_stamps_higher_score_wins() {
        let mut governing = empty_sbom_with(vec![vuln(json!({
            "id": "CVE-1",
            "ratings": [{"method": "CVSSv3", "score": 5.0}]
        }))]);
        merge_vulnerabilities(
            &mut governing,
            vec![vuln(json!({
                "id": "CVE-1",
                "ratings": [{"method": "CVSSv3", "score": 7.5}, {"method": "CVSSv2", "score": 4.0}]
            }))],
        );

        let ratings = governing.vulnerabilities.as_ref().unwrap()[0]
            .ratings
            .as_ref()
            .unwrap()
            .clone();
        assert_eq!(ratings.len(), 2);
        assert_eq!(ratings[0].score, Some(7.5));
    }

    #[test]
    fn test_unmatched_vulnerability_is_appended() {
        let mut governing = empty_sbom_with(vec![vuln(json!({"id": "CVE-1"}))]);
        merge_vulnerabilities(&mut governing, vec![vuln(json!({"id": "CVE-2"}))]);
        assert_eq!(governing.vulnerabilities.as_ref().unwrap().len(), 2);
    }
}
