//! Data models for the sales hierarchy rollup.
//!
//! This module contains the core data structures used throughout
//! the application for representing officers, synthesized managers,
//! belt groups, and reports.

use chrono::{DateTime, Datelike, Local, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Metric name to value. Every configured metric is present once a record
/// has passed through the aggregator.
pub type Metrics = BTreeMap<String, f64>;

/// Keys already used by officer and manager rows. Metrics are flattened next
/// to them, so a metric may not reuse one.
pub const RESERVED_FIELDS: [&str; 12] = [
    "id",
    "name",
    "outlet",
    "zone",
    "role",
    "asm",
    "rsm",
    "som",
    "target",
    "achievement",
    "isManager",
    "teamMemberIds",
];

pub fn is_reserved_field(name: &str) -> bool {
    RESERVED_FIELDS.contains(&name)
}

/// Position in the sales organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Sales officer - the leaf of the organization
    So,
    /// Area sales manager
    Asm,
    /// Regional sales manager
    Rsm,
    /// Sales operations manager
    Som,
}

/// Manager tiers in ascending seniority.
pub const MANAGER_TIERS: [Role; 3] = [Role::Asm, Role::Rsm, Role::Som];

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::So => write!(f, "SO"),
            Role::Asm => write!(f, "ASM"),
            Role::Rsm => write!(f, "RSM"),
            Role::Som => write!(f, "SOM"),
        }
    }
}

impl Role {
    /// Parse a role code case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "SO" => Some(Role::So),
            "ASM" => Some(Role::Asm),
            "RSM" => Some(Role::Rsm),
            "SOM" => Some(Role::Som),
            _ => None,
        }
    }

    /// Whether this role is one of the three manager tiers.
    pub fn is_manager(&self) -> bool {
        *self != Role::So
    }

    /// The manager tier directly below this one.
    pub fn subordinate(&self) -> Option<Role> {
        match self {
            Role::Som => Some(Role::Rsm),
            Role::Rsm => Some(Role::Asm),
            Role::Asm | Role::So => None,
        }
    }

    /// Manager tiers below this one, nearest first.
    pub fn lower_tiers(&self) -> impl Iterator<Item = Role> + '_ {
        MANAGER_TIERS.into_iter().rev().filter(move |t| t < self)
    }

    /// Position in `MANAGER_TIERS`; `None` for officers.
    pub fn tier_index(&self) -> Option<usize> {
        MANAGER_TIERS.iter().position(|t| t == self)
    }

    /// Nesting depth when the hierarchy is printed top-down.
    pub fn depth(&self) -> usize {
        match self {
            Role::Som => 0,
            Role::Rsm => 1,
            Role::Asm => 2,
            Role::So => 3,
        }
    }

    /// Label used when an officer carries no manager name for this tier.
    pub fn unknown_label(&self) -> String {
        format!("Unknown {}", self)
    }
}

/// Coarse geographic grouping derived from a zone code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Belt {
    #[serde(rename = "Belt-1")]
    Belt1,
    #[serde(rename = "Belt-3")]
    Belt3,
    #[serde(rename = "Unknown Belt")]
    Unknown,
}

impl fmt::Display for Belt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Belt::Belt1 => write!(f, "Belt-1"),
            Belt::Belt3 => write!(f, "Belt-3"),
            Belt::Unknown => write!(f, "Unknown Belt"),
        }
    }
}

/// Reporting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    /// The current calendar month in local time.
    pub fn current() -> Self {
        let now = Local::now();
        Self {
            year: now.year(),
            month: now.month(),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Percentage of `actual` against `target`. Zero when there is no positive target.
pub fn achievement(actual: f64, target: f64) -> f64 {
    if target > 0.0 {
        let pct = actual / target * 100.0;
        if pct.is_finite() {
            pct
        } else {
            0.0
        }
    } else {
        0.0
    }
}

/// One sales officer's figures for the period.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafRecord {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outlet: Option<String>,
    /// Free-text zone code, e.g. `DHAKA-01-ZONE-01`.
    pub zone: String,
    pub role: Role,
    pub asm: String,
    pub rsm: String,
    pub som: String,
    /// Target for the period, looked up by `id` at aggregation time.
    pub target: f64,
    #[serde(flatten)]
    pub metrics: Metrics,
}

impl LeafRecord {
    /// Creates an officer with no manager references and no metrics.
    pub fn new(id: impl Into<String>, name: impl Into<String>, zone: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            outlet: None,
            zone: zone.into(),
            role: Role::So,
            asm: String::new(),
            rsm: String::new(),
            som: String::new(),
            target: 0.0,
            metrics: Metrics::new(),
        }
    }

    /// Name of this officer's manager at `tier`. Empty when unassigned.
    pub fn manager(&self, tier: Role) -> &str {
        match tier {
            Role::Asm => &self.asm,
            Role::Rsm => &self.rsm,
            Role::Som => &self.som,
            Role::So => "",
        }
    }

    /// Value of a metric, 0 when absent.
    pub fn metric(&self, field: &str) -> f64 {
        self.metrics.get(field).copied().unwrap_or(0.0)
    }
}

/// A real manager user, used to resolve the zone of a synthesized manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffRecord {
    pub name: String,
    pub role: Role,
    pub zone: String,
}

/// Manager users known to the backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaffDirectory {
    entries: Vec<StaffRecord>,
}

impl StaffDirectory {
    pub fn new(entries: Vec<StaffRecord>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Zone of the first entry matching both name and role with a non-empty zone.
    pub fn zone_of(&self, name: &str, role: Role) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.role == role && e.name == name && !e.zone.is_empty())
            .map(|e| e.zone.as_str())
    }
}

/// An officer as it appears in the rollup output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficerRecord {
    #[serde(flatten)]
    pub leaf: LeafRecord,
    pub achievement: f64,
    pub is_manager: bool,
}

/// A manager summary synthesized from the officers that name them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerRecord {
    /// `{tier}_{name}`
    pub id: String,
    pub name: String,
    pub role: Role,
    pub zone: String,
    /// Sum of each metric across the team.
    #[serde(flatten)]
    pub metrics: Metrics,
    pub target: f64,
    pub achievement: f64,
    pub team_member_ids: Vec<String>,
    pub is_manager: bool,
}

impl ManagerRecord {
    pub fn metric(&self, field: &str) -> f64 {
        self.metrics.get(field).copied().unwrap_or(0.0)
    }
}

/// Either kind of row in an ordered belt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HierarchyRecord {
    Officer(OfficerRecord),
    Manager(ManagerRecord),
}

impl HierarchyRecord {
    pub fn id(&self) -> &str {
        match self {
            HierarchyRecord::Officer(o) => &o.leaf.id,
            HierarchyRecord::Manager(m) => &m.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            HierarchyRecord::Officer(o) => &o.leaf.name,
            HierarchyRecord::Manager(m) => &m.name,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            HierarchyRecord::Officer(o) => o.leaf.role,
            HierarchyRecord::Manager(m) => m.role,
        }
    }

    pub fn zone(&self) -> &str {
        match self {
            HierarchyRecord::Officer(o) => &o.leaf.zone,
            HierarchyRecord::Manager(m) => &m.zone,
        }
    }

    pub fn metric(&self, field: &str) -> f64 {
        match self {
            HierarchyRecord::Officer(o) => o.leaf.metric(field),
            HierarchyRecord::Manager(m) => m.metric(field),
        }
    }

    pub fn target(&self) -> f64 {
        match self {
            HierarchyRecord::Officer(o) => o.leaf.target,
            HierarchyRecord::Manager(m) => m.target,
        }
    }

    pub fn achievement(&self) -> f64 {
        match self {
            HierarchyRecord::Officer(o) => o.achievement,
            HierarchyRecord::Manager(m) => m.achievement,
        }
    }

    pub fn is_manager(&self) -> bool {
        matches!(self, HierarchyRecord::Manager(_))
    }

    pub fn as_manager(&self) -> Option<&ManagerRecord> {
        match self {
            HierarchyRecord::Manager(m) => Some(m),
            HierarchyRecord::Officer(_) => None,
        }
    }

    pub fn as_officer(&self) -> Option<&OfficerRecord> {
        match self {
            HierarchyRecord::Officer(o) => Some(o),
            HierarchyRecord::Manager(_) => None,
        }
    }
}

/// All records of one belt in org-chart order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeltGroup {
    pub belt: Belt,
    pub ordered_records: Vec<HierarchyRecord>,
}

/// Totals for one belt, counted over officer rows only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeltSummary {
    pub belt: String,
    pub officers: usize,
    pub asms: usize,
    pub rsms: usize,
    pub soms: usize,
    pub metrics: Metrics,
    pub target: f64,
    pub achievement: f64,
}

/// Metadata about the rollup report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Where the officer data came from (file path or backend URL).
    pub source: String,
    pub period: Period,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_filter: Option<Role>,
    pub linkage: String,
    pub metric_fields: Vec<String>,
    pub achievement_metric: String,
    pub officers_loaded: usize,
    pub duration_seconds: f64,
}

/// The complete rollup report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub summaries: Vec<BeltSummary>,
    pub groups: Vec<BeltGroup>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ordering() {
        assert!(Role::So < Role::Asm);
        assert!(Role::Asm < Role::Rsm);
        assert!(Role::Rsm < Role::Som);
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("asm"), Some(Role::Asm));
        assert_eq!(Role::parse(" SOM "), Some(Role::Som));
        assert_eq!(Role::parse("admin"), None);
    }

    #[test]
    fn test_lower_tiers() {
        let below_som: Vec<_> = Role::Som.lower_tiers().collect();
        assert_eq!(below_som, vec![Role::Rsm, Role::Asm]);
        assert_eq!(Role::Asm.lower_tiers().count(), 0);
    }

    #[test]
    fn test_tier_index() {
        for (i, tier) in MANAGER_TIERS.iter().enumerate() {
            assert_eq!(tier.tier_index(), Some(i));
        }
        assert_eq!(Role::So.tier_index(), None);
    }

    #[test]
    fn test_reserved_fields() {
        assert!(is_reserved_field("target"));
        assert!(is_reserved_field("teamMemberIds"));
        assert!(!is_reserved_field("primaryValue"));
    }

    #[test]
    fn test_belt_ordering_and_display() {
        assert!(Belt::Belt1 < Belt::Belt3);
        assert!(Belt::Belt3 < Belt::Unknown);
        assert_eq!(Belt::Unknown.to_string(), "Unknown Belt");
        assert_eq!(
            serde_json::to_string(&Belt::Belt1).unwrap(),
            "\"Belt-1\""
        );
    }

    #[test]
    fn test_achievement_zero_target() {
        assert_eq!(achievement(500.0, 0.0), 0.0);
        assert_eq!(achievement(500.0, -10.0), 0.0);
        assert_eq!(achievement(50.0, 200.0), 25.0);
    }

    #[test]
    fn test_staff_directory_lookup() {
        let dir = StaffDirectory::new(vec![
            StaffRecord {
                name: "Karim".to_string(),
                role: Role::Rsm,
                zone: "DHAKA-01".to_string(),
            },
            StaffRecord {
                name: "Karim".to_string(),
                role: Role::Asm,
                zone: "DHAKA-01-ZONE-01".to_string(),
            },
        ]);

        assert_eq!(dir.zone_of("Karim", Role::Asm), Some("DHAKA-01-ZONE-01"));
        assert_eq!(dir.zone_of("Karim", Role::Rsm), Some("DHAKA-01"));
        assert_eq!(dir.zone_of("Karim", Role::Som), None);
    }

    #[test]
    fn test_officer_serializes_flat() {
        let mut leaf = LeafRecord::new("7", "Rahim", "KHULNA-ZONE-03");
        leaf.metrics.insert("primaryValue".to_string(), 120.0);
        let record = OfficerRecord {
            leaf,
            achievement: 0.0,
            is_manager: false,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["primaryValue"], 120.0);
        assert_eq!(json["role"], "SO");
        assert_eq!(json["isManager"], false);
        assert!(json.get("outlet").is_none());
    }
}
