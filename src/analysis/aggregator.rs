//! Hierarchy resolution and rollup.
//!
//! Rebuilds the SOM -> RSM -> ASM -> SO reporting tree from flat officer
//! records, synthesizes one summary record per named manager, and orders
//! everything into a single top-down sequence per belt.

use crate::analysis::zone::{classify_zone, derive_team_zone};
use crate::models::{
    achievement, Belt, BeltGroup, HierarchyRecord, LeafRecord, ManagerRecord, Metrics,
    OfficerRecord, Role, StaffDirectory, MANAGER_TIERS,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::debug;

/// How a manager is attached to the manager one tier above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkageRule {
    /// A child is under a parent when any officer in the child's team names
    /// the parent at the parent's tier.
    #[default]
    SharedLeaves,
    /// Legacy: a child is under a parent when the child's zone contains the
    /// parent's (non-empty) zone.
    ZoneContainment,
}

impl fmt::Display for LinkageRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkageRule::SharedLeaves => write!(f, "shared-leaves"),
            LinkageRule::ZoneContainment => write!(f, "zone-containment"),
        }
    }
}

/// Which metrics to roll up and how managers link together.
#[derive(Debug, Clone, PartialEq)]
pub struct RollupOptions {
    /// Metric fields summed at every tier. Missing values count as 0.
    pub metric_fields: Vec<String>,
    /// Metric compared against target for achievement.
    pub achievement_metric: String,
    pub linkage: LinkageRule,
}

impl Default for RollupOptions {
    fn default() -> Self {
        Self {
            metric_fields: vec![
                "primaryValue".to_string(),
                "secondaryValue".to_string(),
                "marketReturn".to_string(),
                "officeReturn".to_string(),
                "collectionAmount".to_string(),
            ],
            achievement_metric: "secondaryValue".to_string(),
            linkage: LinkageRule::SharedLeaves,
        }
    }
}

/// Builds belt groups from officer records. Holds no state between calls.
#[derive(Debug, Clone, Default)]
pub struct HierarchyAggregator {
    options: RollupOptions,
    directory: StaffDirectory,
}

impl HierarchyAggregator {
    pub fn new(options: RollupOptions) -> Self {
        Self {
            options,
            directory: StaffDirectory::default(),
        }
    }

    /// Use real manager users to resolve manager zones.
    pub fn with_directory(mut self, directory: StaffDirectory) -> Self {
        self.directory = directory;
        self
    }

    /// Group officers by belt, synthesize managers, and order each belt.
    ///
    /// `role_filter` is applied to the union of officers and managers before
    /// ordering. Belts without any surviving record are omitted.
    pub fn aggregate(
        &self,
        leaves: &[LeafRecord],
        targets: &HashMap<String, f64>,
        role_filter: Option<Role>,
    ) -> Vec<BeltGroup> {
        let mut belts: BTreeMap<Belt, Vec<LeafRecord>> = BTreeMap::new();

        for leaf in leaves {
            let mut leaf = leaf.clone();
            leaf.target = targets.get(&leaf.id).copied().unwrap_or(0.0);
            for field in &self.options.metric_fields {
                leaf.metrics.entry(field.clone()).or_insert(0.0);
            }
            belts.entry(classify_zone(&leaf.zone)).or_default().push(leaf);
        }

        belts
            .into_iter()
            .filter_map(|(belt, members)| {
                let ordered_records = self.assemble_belt(&members, role_filter);
                debug!(
                    "{}: {} officers in, {} records out",
                    belt,
                    members.len(),
                    ordered_records.len()
                );
                if ordered_records.is_empty() {
                    None
                } else {
                    Some(BeltGroup {
                        belt,
                        ordered_records,
                    })
                }
            })
            .collect()
    }

    fn assemble_belt(&self, leaves: &[LeafRecord], role_filter: Option<Role>) -> Vec<HierarchyRecord> {
        let keep = |role: Role| role_filter.map_or(true, |r| r == role);

        let mut officers: Vec<&LeafRecord> = if keep(Role::So) {
            leaves.iter().collect()
        } else {
            Vec::new()
        };
        officers.sort_by(|a, b| alphabetical(&a.name, &a.id, &b.name, &b.id));

        let managers = MANAGER_TIERS.map(|tier| {
            if keep(tier) {
                self.synthesize(tier, leaves)
            } else {
                Vec::new()
            }
        });

        let mut assembly = BeltAssembly::new(
            officers,
            managers,
            self.options.linkage,
            &self.options.achievement_metric,
        );
        assembly.single_tier = role_filter.is_some();
        assembly.run();
        assembly.out
    }

    /// One record per distinct non-empty manager name at `tier`, in order of
    /// first appearance.
    fn synthesize<'a>(&self, tier: Role, leaves: &'a [LeafRecord]) -> Vec<Synthesized<'a>> {
        let mut order: Vec<&'a str> = Vec::new();
        let mut teams: HashMap<&'a str, Vec<&'a LeafRecord>> = HashMap::new();

        for leaf in leaves {
            let name = leaf.manager(tier);
            if name.is_empty() {
                continue;
            }
            teams
                .entry(name)
                .or_insert_with(|| {
                    order.push(name);
                    Vec::new()
                })
                .push(leaf);
        }

        order
            .into_iter()
            .map(|name| {
                let team = teams.remove(name).unwrap_or_default();
                let record = self.summarize_team(tier, name, &team);
                Synthesized { record, team }
            })
            .collect()
    }

    fn summarize_team(&self, tier: Role, name: &str, team: &[&LeafRecord]) -> ManagerRecord {
        let mut metrics: Metrics = self
            .options
            .metric_fields
            .iter()
            .map(|f| (f.clone(), 0.0))
            .collect();
        let mut target = 0.0;

        for member in team {
            for (field, value) in &member.metrics {
                *metrics.entry(field.clone()).or_insert(0.0) += value;
            }
            target += member.target;
        }

        let actual = metrics
            .get(&self.options.achievement_metric)
            .copied()
            .unwrap_or(0.0);

        let zone = match self.directory.zone_of(name, tier) {
            Some(zone) => zone.to_string(),
            None => derive_team_zone(team.iter().map(|m| m.zone.as_str())),
        };

        ManagerRecord {
            id: format!("{}_{}", tier, name),
            name: name.to_string(),
            role: tier,
            zone,
            metrics,
            target,
            achievement: achievement(actual, target),
            team_member_ids: team.iter().map(|m| m.id.clone()).collect(),
            is_manager: true,
        }
    }
}

/// A synthesized manager with the officers it was built from.
struct Synthesized<'a> {
    record: ManagerRecord,
    team: Vec<&'a LeafRecord>,
}

/// Case-insensitive name order, then exact name, then id.
fn alphabetical(a_name: &str, a_id: &str, b_name: &str, b_id: &str) -> std::cmp::Ordering {
    a_name
        .to_lowercase()
        .cmp(&b_name.to_lowercase())
        .then_with(|| a_name.cmp(b_name))
        .then_with(|| a_id.cmp(b_id))
}

/// Ordering state for a single belt. Each record is emitted at most once;
/// the first placement wins.
struct BeltAssembly<'a> {
    officers: Vec<&'a LeafRecord>,
    placed_officers: Vec<bool>,
    /// Indexed by `Role::tier_index`, each in discovery order.
    managers: [Vec<Synthesized<'a>>; 3],
    placed_managers: [Vec<bool>; 3],
    /// Indices into `managers`, sorted by name.
    alpha: [Vec<usize>; 3],
    linkage: LinkageRule,
    achievement_metric: &'a str,
    /// Set when a role filter is active; every tier is then listed by name.
    single_tier: bool,
    out: Vec<HierarchyRecord>,
}

impl<'a> BeltAssembly<'a> {
    fn new(
        officers: Vec<&'a LeafRecord>,
        managers: [Vec<Synthesized<'a>>; 3],
        linkage: LinkageRule,
        achievement_metric: &'a str,
    ) -> Self {
        let placed_officers = vec![false; officers.len()];
        let placed_managers = [
            vec![false; managers[0].len()],
            vec![false; managers[1].len()],
            vec![false; managers[2].len()],
        ];
        let alpha = [0, 1, 2].map(|t| {
            let mut idx: Vec<usize> = (0..managers[t].len()).collect();
            idx.sort_by(|&a, &b| {
                let (ma, mb) = (&managers[t][a].record, &managers[t][b].record);
                alphabetical(&ma.name, &ma.id, &mb.name, &mb.id)
            });
            idx
        });

        Self {
            officers,
            placed_officers,
            managers,
            placed_managers,
            alpha,
            linkage,
            achievement_metric,
            single_tier: false,
            out: Vec::new(),
        }
    }

    fn run(&mut self) {
        // SOM chains in discovery order, by name when filtered to one tier
        let soms = if self.single_tier {
            self.by_name(Role::Som)
        } else {
            self.by_discovery(Role::Som)
        };
        for idx in soms {
            self.emit_manager(Role::Som, idx);
        }

        // Whatever the SOM chains did not reach, senior tiers first
        for tier in [Role::Rsm, Role::Asm] {
            for idx in self.by_name(tier) {
                self.emit_manager(tier, idx);
            }
        }

        self.emit_officers_where(|_| true);
    }

    fn by_name(&self, tier: Role) -> Vec<usize> {
        tier.tier_index()
            .map(|t| self.alpha[t].clone())
            .unwrap_or_default()
    }

    fn by_discovery(&self, tier: Role) -> Vec<usize> {
        tier.tier_index()
            .map(|t| (0..self.managers[t].len()).collect())
            .unwrap_or_default()
    }

    fn emit_manager(&mut self, tier: Role, idx: usize) {
        let Some(t) = tier.tier_index() else {
            return;
        };
        if self.placed_managers[t][idx] {
            return;
        }
        self.placed_managers[t][idx] = true;
        self.out
            .push(HierarchyRecord::Manager(self.managers[t][idx].record.clone()));

        if let Some(child_tier) = tier.subordinate() {
            for child in self.children(tier, idx, child_tier) {
                self.emit_manager(child_tier, child);
            }
        }

        // Officers reporting here with no manager in between
        let name = self.managers[t][idx].record.name.clone();
        let skipped: Vec<Role> = tier.lower_tiers().collect();
        self.emit_officers_where(|leaf| {
            leaf.manager(tier) == name && skipped.iter().all(|&lt| leaf.manager(lt).is_empty())
        });
    }

    /// Unplaced managers at `child_tier` linked to the given parent, by name.
    fn children(&self, parent_tier: Role, parent_idx: usize, child_tier: Role) -> Vec<usize> {
        let (Some(p), Some(c)) = (parent_tier.tier_index(), child_tier.tier_index()) else {
            return Vec::new();
        };
        let parent = &self.managers[p][parent_idx].record;

        self.alpha[c]
            .iter()
            .copied()
            .filter(|&i| !self.placed_managers[c][i])
            .filter(|&i| {
                let child = &self.managers[c][i];
                match self.linkage {
                    LinkageRule::SharedLeaves => child
                        .team
                        .iter()
                        .any(|leaf| leaf.manager(parent_tier) == parent.name),
                    LinkageRule::ZoneContainment => {
                        !parent.zone.is_empty() && child.record.zone.contains(&parent.zone)
                    }
                }
            })
            .collect()
    }

    fn emit_officers_where<F>(&mut self, pred: F)
    where
        F: Fn(&LeafRecord) -> bool,
    {
        for i in 0..self.officers.len() {
            let leaf = self.officers[i];
            if self.placed_officers[i] || !pred(leaf) {
                continue;
            }
            self.placed_officers[i] = true;
            let actual = leaf.metric(self.achievement_metric);
            self.out.push(HierarchyRecord::Officer(OfficerRecord {
                leaf: leaf.clone(),
                achievement: achievement(actual, leaf.target),
                is_manager: false,
            }));
        }
    }
}
