//! Belt statistics.
//!
//! Computes totals over the ordered belt groups produced by the
//! aggregator, for the report summary and the CLI threshold check.

use crate::models::{achievement, BeltGroup, BeltSummary, ManagerRecord, Role};

/// Summarize each belt. Totals are taken over officer rows only so that
/// synthesized managers are not counted twice.
pub fn summarize_belts(
    groups: &[BeltGroup],
    metric_fields: &[String],
    achievement_metric: &str,
) -> Vec<BeltSummary> {
    groups
        .iter()
        .map(|group| {
            let mut summary = BeltSummary {
                belt: group.belt.to_string(),
                metrics: metric_fields.iter().map(|f| (f.clone(), 0.0)).collect(),
                ..BeltSummary::default()
            };

            for record in &group.ordered_records {
                match record.role() {
                    Role::So => summary.officers += 1,
                    Role::Asm => summary.asms += 1,
                    Role::Rsm => summary.rsms += 1,
                    Role::Som => summary.soms += 1,
                }

                if let Some(officer) = record.as_officer() {
                    for (field, total) in summary.metrics.iter_mut() {
                        *total += officer.leaf.metric(field);
                    }
                    summary.target += officer.leaf.target;
                }
            }

            let actual = summary.metrics.get(achievement_metric).copied().unwrap_or(0.0);
            summary.achievement = achievement(actual, summary.target);
            summary
        })
        .collect()
}

/// Managers whose achievement is below `threshold` percent, lowest first.
pub fn managers_below(groups: &[BeltGroup], threshold: f64) -> Vec<&ManagerRecord> {
    let mut below: Vec<&ManagerRecord> = groups
        .iter()
        .flat_map(|g| g.ordered_records.iter())
        .filter_map(|r| r.as_manager())
        .filter(|m| m.achievement < threshold)
        .collect();

    below.sort_by(|a, b| {
        a.achievement
            .partial_cmp(&b.achievement)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    below
}

/// Total number of officer rows across all belts.
pub fn officer_count(groups: &[BeltGroup]) -> usize {
    groups
        .iter()
        .flat_map(|g| g.ordered_records.iter())
        .filter(|r| !r.is_manager())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::HierarchyAggregator;
    use crate::models::LeafRecord;
    use std::collections::HashMap;

    fn create_test_groups() -> Vec<BeltGroup> {
        let mut a = LeafRecord::new("1", "A", "DHAKA-01-ZONE-01");
        a.asm = "X".to_string();
        a.metrics.insert("secondaryValue".to_string(), 80.0);

        let mut b = LeafRecord::new("2", "B", "DHAKA-02-ZONE-01");
        b.asm = "X".to_string();
        b.rsm = "R".to_string();
        b.metrics.insert("secondaryValue".to_string(), 40.0);

        let mut c = LeafRecord::new("3", "C", "KHULNA-ZONE-03");
        c.asm = "Y".to_string();
        c.metrics.insert("secondaryValue".to_string(), 10.0);

        let targets: HashMap<String, f64> = [("1", 100.0), ("2", 100.0), ("3", 100.0)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        HierarchyAggregator::default().aggregate(&[a, b, c], &targets, None)
    }

    #[test]
    fn test_summarize_belts() {
        let groups = create_test_groups();
        let fields = vec!["secondaryValue".to_string()];

        let summaries = summarize_belts(&groups, &fields, "secondaryValue");

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].belt, "Belt-1");
        assert_eq!(summaries[0].officers, 2);
        assert_eq!(summaries[0].asms, 1);
        assert_eq!(summaries[0].rsms, 1);
        assert_eq!(summaries[0].metrics.get("secondaryValue"), Some(&120.0));
        assert_eq!(summaries[0].target, 200.0);
        assert!((summaries[0].achievement - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_managers_below() {
        let groups = create_test_groups();

        let below = managers_below(&groups, 50.0);
        let names: Vec<_> = below.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Y", "R"]);

        assert!(managers_below(&groups, 0.0).is_empty());
    }

    #[test]
    fn test_officer_count() {
        assert_eq!(officer_count(&create_test_groups()), 3);
        assert_eq!(officer_count(&[]), 0);
    }
}
