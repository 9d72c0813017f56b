//! Report generation.
//!
//! This module renders a rollup [`Report`] as Markdown, JSON, or CSV.
//! CSV is the flat row export used for spreadsheets: one row per ordered
//! record, belts in sequence.

use crate::config::ReportConfig;
use crate::models::{BeltGroup, BeltSummary, HierarchyRecord, Report, ReportMetadata, Role};
use anyhow::{Context, Result};

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, settings: &ReportConfig) -> String {
    let mut output = String::new();

    output.push_str("# Sales Hierarchy Rollup\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents(report));
    output.push_str(&generate_summary_section(
        &report.summaries,
        &report.metadata.achievement_metric,
        settings.decimals,
    ));

    for group in &report.groups {
        output.push_str(&generate_belt_section(
            group,
            &report.metadata.metric_fields,
            settings,
        ));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!("- **Period:** {}\n", metadata.period));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(role) = metadata.role_filter {
        section.push_str(&format!("- **Role Filter:** {}\n", role));
    }
    section.push_str(&format!("- **Linkage:** `{}`\n", metadata.linkage));
    section.push_str(&format!(
        "- **Achievement:** {} / target\n",
        column_title(&metadata.achievement_metric)
    ));
    section.push_str(&format!(
        "- **Officers Loaded:** {}\n",
        metadata.officers_loaded
    ));
    section.push_str(&format!(
        "- **Duration:** {:.2}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &Report) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Summary](#summary)\n");

    for group in &report.groups {
        let title = group.belt.to_string();
        toc.push_str(&format!("- [{}](#{})\n", title, anchor(&title)));
    }

    toc.push('\n');

    toc
}

/// Generate the per-belt summary table.
fn generate_summary_section(
    summaries: &[BeltSummary],
    achievement_metric: &str,
    decimals: usize,
) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");

    if summaries.is_empty() {
        section.push_str("No records matched. Nothing to roll up.\n\n");
        return section;
    }

    section.push_str(&format!(
        "| Belt | SO | ASM | RSM | SOM | {} | Target | Achievement |\n",
        column_title(achievement_metric)
    ));
    section.push_str("|:---|:---:|:---:|:---:|:---:|---:|---:|---:|\n");

    for summary in summaries {
        let actual = summary
            .metrics
            .get(achievement_metric)
            .copied()
            .unwrap_or(0.0);
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} | {}% |\n",
            summary.belt,
            summary.officers,
            summary.asms,
            summary.rsms,
            summary.soms,
            amount(actual, decimals),
            amount(summary.target, decimals),
            amount(summary.achievement, decimals),
        ));
    }
    section.push('\n');

    section
}

/// Generate the hierarchy table for one belt.
fn generate_belt_section(group: &BeltGroup, metric_fields: &[String], settings: &ReportConfig) -> String {
    let mut section = String::new();
    let title = group.belt.to_string();

    section.push_str(&format!("## {} {{#{}}}\n\n", title, anchor(&title)));

    let mut header = String::from("| Role | Name | Zone |");
    let mut align = String::from("|:---|:---|:---|");
    for field in metric_fields {
        header.push_str(&format!(" {} |", column_title(field)));
        align.push_str("---:|");
    }
    header.push_str(" Target | Achievement |\n");
    align.push_str("---:|---:|\n");
    section.push_str(&header);
    section.push_str(&align);

    for record in &group.ordered_records {
        section.push_str(&generate_record_row(record, metric_fields, settings.decimals));
    }
    section.push('\n');

    if settings.include_team_ids {
        let managers: Vec<_> = group
            .ordered_records
            .iter()
            .filter_map(HierarchyRecord::as_manager)
            .collect();
        if !managers.is_empty() {
            section.push_str("<details>\n<summary>Team members</summary>\n\n");
            for manager in managers {
                section.push_str(&format!(
                    "- **{} {}:** {}\n",
                    manager.role,
                    manager.name,
                    manager.team_member_ids.join(", ")
                ));
            }
            section.push_str("\n</details>\n\n");
        }
    }

    section
}

/// Generate one table row, indented by tier.
fn generate_record_row(record: &HierarchyRecord, metric_fields: &[String], decimals: usize) -> String {
    let role = record.role();
    let indent = "&nbsp;&nbsp;&nbsp;&nbsp;".repeat(role.depth());
    let name = if record.is_manager() {
        format!("{}**{}**", indent, escape_cell(record.name()))
    } else {
        format!("{}{}", indent, escape_cell(record.name()))
    };

    let mut row = format!("| {} | {} | {} |", role, name, escape_cell(record.zone()));
    for field in metric_fields {
        row.push_str(&format!(" {} |", amount(record.metric(field), decimals)));
    }
    row.push_str(&format!(
        " {} | {}% |\n",
        amount(record.target(), decimals),
        amount(record.achievement(), decimals)
    ));

    row
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by salesroll*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Generate CSV rows, one per ordered record.
///
/// Officer rows with no manager at a tier show `Unknown {Tier}`; manager
/// rows leave the reference columns empty.
pub fn generate_csv_report(report: &Report, decimals: usize) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header: Vec<String> = [
        "belt", "role", "level", "id", "name", "outlet", "zone", "asm", "rsm", "som",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    header.extend(report.metadata.metric_fields.iter().cloned());
    header.extend(["target", "achievement", "team_size"].iter().map(|s| s.to_string()));
    writer.write_record(&header).context("Failed to write CSV header")?;

    for group in &report.groups {
        for record in &group.ordered_records {
            let role = record.role();
            let mut row = vec![
                group.belt.to_string(),
                role.to_string(),
                (3 - role.depth()).to_string(),
                record.id().to_string(),
                record.name().to_string(),
            ];

            match record {
                HierarchyRecord::Officer(officer) => {
                    let leaf = &officer.leaf;
                    row.push(leaf.outlet.clone().unwrap_or_default());
                    row.push(leaf.zone.clone());
                    for tier in [Role::Asm, Role::Rsm, Role::Som] {
                        let name = leaf.manager(tier);
                        row.push(if name.is_empty() {
                            tier.unknown_label()
                        } else {
                            name.to_string()
                        });
                    }
                }
                HierarchyRecord::Manager(manager) => {
                    row.push(String::new());
                    row.push(manager.zone.clone());
                    row.extend(std::iter::repeat(String::new()).take(3));
                }
            }

            for field in &report.metadata.metric_fields {
                row.push(amount(record.metric(field), decimals));
            }
            row.push(amount(record.target(), decimals));
            row.push(amount(record.achievement(), decimals));
            row.push(match record {
                HierarchyRecord::Manager(m) => m.team_member_ids.len().to_string(),
                HierarchyRecord::Officer(_) => String::new(),
            });

            writer
                .write_record(&row)
                .with_context(|| format!("Failed to write CSV row for {}", record.id()))?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV output: {}", e.error()))?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

/// `primaryValue` -> `Primary Value`
pub fn column_title(field: &str) -> String {
    let mut title = String::new();
    for (i, ch) in field.chars().enumerate() {
        if i == 0 {
            title.extend(ch.to_uppercase());
        } else if ch == '_' || ch == '-' {
            title.push(' ');
        } else {
            if ch.is_uppercase() && !title.ends_with(' ') {
                title.push(' ');
            }
            title.push(ch);
        }
    }
    title
}

fn amount(value: f64, decimals: usize) -> String {
    format!("{:.*}", decimals, value)
}

fn anchor(title: &str) -> String {
    title.replace(' ', "-").to_lowercase()
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{summarize_belts, HierarchyAggregator, RollupOptions};
    use crate::models::{LeafRecord, Period};
    use chrono::Utc;
    use std::collections::HashMap;

    fn create_test_report() -> Report {
        let mut a = LeafRecord::new("1", "Sohel", "DHAKA-01-ZONE-01");
        a.asm = "Anwar".to_string();
        a.outlet = Some("Mirpur Traders".to_string());
        a.metrics.insert("primaryValue".to_string(), 1500.0);
        a.metrics.insert("secondaryValue".to_string(), 1200.0);

        let mut b = LeafRecord::new("2", "Tareq", "KHULNA-ZONE-03");
        b.metrics.insert("secondaryValue".to_string(), 300.0);

        let targets: HashMap<String, f64> = [("1".to_string(), 1000.0)].into_iter().collect();
        let options = RollupOptions::default();
        let groups = HierarchyAggregator::new(options.clone()).aggregate(&[a, b], &targets, None);
        let fields = options.metric_fields;

        Report {
            metadata: ReportMetadata {
                source: "fixtures/leaves.json".to_string(),
                period: Period { year: 2026, month: 9 },
                generated_at: Utc::now(),
                role_filter: None,
                linkage: "shared-leaves".to_string(),
                metric_fields: fields.clone(),
                achievement_metric: "secondaryValue".to_string(),
                officers_loaded: 2,
                duration_seconds: 0.01,
            },
            summaries: summarize_belts(&groups, &fields, "secondaryValue"),
            groups,
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report, &ReportConfig::default());

        assert!(markdown.contains("# Sales Hierarchy Rollup"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("- **Period:** 2026-09"));
        assert!(markdown.contains("## Belt-1"));
        assert!(markdown.contains("## Belt-3"));
        assert!(markdown.contains("**Anwar**"));
        assert!(markdown.contains("| Primary Value |"));
        assert!(markdown.contains("120.00%"));
        assert!(!markdown.contains("Team members"));
    }

    #[test]
    fn test_markdown_team_ids() {
        let report = create_test_report();
        let settings = ReportConfig {
            decimals: 0,
            include_team_ids: true,
        };

        let markdown = generate_markdown_report(&report, &settings);

        assert!(markdown.contains("- **ASM Anwar:** 1"));
        assert!(markdown.contains("| 1500 |"));
    }

    #[test]
    fn test_empty_summary() {
        let section = generate_summary_section(&[], "secondaryValue", 2);
        assert!(section.contains("Nothing to roll up"));
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"orderedRecords\""));
        assert!(json.contains("\"belt\": \"Belt-1\""));
        assert!(json.contains("\"isManager\": true"));
        assert!(json.contains("\"teamMemberIds\""));
    }

    #[test]
    fn test_generate_csv_report() {
        let report = create_test_report();
        let csv = generate_csv_report(&report, 1).unwrap();
        let lines: Vec<_> = csv.lines().collect();

        assert!(lines[0].starts_with("belt,role,level,id,name,outlet,zone,asm,rsm,som,"));
        assert!(lines[0].ends_with("target,achievement,team_size"));
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("Belt-1,ASM,1,ASM_Anwar,Anwar,,DHAKA-01-ZONE-01,,,"));
        assert!(lines[2].contains("Mirpur Traders"));
        assert!(lines[2].contains("Anwar,Unknown RSM,Unknown SOM"));
        assert!(lines[3].contains("Unknown ASM,Unknown RSM,Unknown SOM"));
    }

    #[test]
    fn test_column_title() {
        assert_eq!(column_title("primaryValue"), "Primary Value");
        assert_eq!(column_title("collection_amount"), "Collection amount");
        assert_eq!(column_title("target"), "Target");
    }
}
