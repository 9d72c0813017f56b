//! Zone code helpers.
//!
//! Zone codes are free text such as `DHAKA-01-ZONE-01`. The belt is
//! encoded as a substring; manager zones are best-effort guesses.

use crate::models::Belt;
use std::collections::BTreeMap;

const BELT_ONE_MARKER: &str = "ZONE-01";
const BELT_THREE_MARKER: &str = "ZONE-03";

/// Classify a zone code into its belt.
pub fn classify_zone(zone: &str) -> Belt {
    if zone.contains(BELT_ONE_MARKER) {
        Belt::Belt1
    } else if zone.contains(BELT_THREE_MARKER) {
        Belt::Belt3
    } else {
        Belt::Unknown
    }
}

/// Derive a display zone for a manager from the zones of their team.
///
/// Uses the longest common prefix of `-`-separated tokens. When the team
/// shares no prefix, falls back to the most frequent zone (ties go to the
/// lexicographically smallest). Returns an empty string for a team with no
/// zones at all.
pub fn derive_team_zone<'a, I>(zones: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let zones: Vec<&str> = zones.into_iter().filter(|z| !z.is_empty()).collect();
    if zones.is_empty() {
        return String::new();
    }

    let mut prefix: Vec<&str> = zones[0].split('-').collect();
    for zone in &zones[1..] {
        let common = prefix
            .iter()
            .zip(zone.split('-'))
            .take_while(|(a, b)| **a == *b)
            .count();
        prefix.truncate(common);
    }

    if !prefix.is_empty() {
        return prefix.join("-");
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for zone in &zones {
        *counts.entry(*zone).or_default() += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for (zone, count) in counts {
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((zone, count)),
        }
    }

    best.map(|(zone, _)| zone.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_zone() {
        assert_eq!(classify_zone("DHAKA-01-ZONE-01"), Belt::Belt1);
        assert_eq!(classify_zone("KHULNA-ZONE-03"), Belt::Belt3);
        assert_eq!(classify_zone("SYLHET-ZONE-02"), Belt::Unknown);
        assert_eq!(classify_zone(""), Belt::Unknown);
    }

    #[test]
    fn test_derive_common_prefix() {
        let zone = derive_team_zone(["DHAKA-01-ZONE-01", "DHAKA-02-ZONE-01"]);
        assert_eq!(zone, "DHAKA");

        let zone = derive_team_zone(["DHAKA-01-ZONE-01", "DHAKA-01-ZONE-01"]);
        assert_eq!(zone, "DHAKA-01-ZONE-01");
    }

    #[test]
    fn test_derive_falls_back_to_most_frequent() {
        let zone = derive_team_zone(["KHULNA-ZONE-03", "JESSORE-ZONE-03", "JESSORE-ZONE-03"]);
        assert_eq!(zone, "JESSORE-ZONE-03");

        // Tie goes to the lexicographically smallest
        let zone = derive_team_zone(["KHULNA-ZONE-03", "JESSORE-ZONE-03"]);
        assert_eq!(zone, "JESSORE-ZONE-03");
    }

    #[test]
    fn test_derive_ignores_empty_zones() {
        assert_eq!(derive_team_zone(["", "RAJSHAHI-ZONE-01"]), "RAJSHAHI-ZONE-01");
        assert_eq!(derive_team_zone(["", ""]), "");
    }
}
