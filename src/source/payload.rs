//! Flattening of backend payloads.
//!
//! The user report endpoint returns one row per user with role, zone,
//! manager names and metric columns. Officers become [`LeafRecord`]s;
//! manager users only feed the [`StaffDirectory`].

use crate::models::{LeafRecord, Metrics, Role, StaffDirectory, StaffRecord};
use crate::source::SourceError;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

const ID_KEYS: &[&str] = &["id", "_id", "userId", "user_id"];
const USER_LIST_KEYS: &[&str] = &["data", "users", "results"];
const TARGET_LIST_KEYS: &[&str] = &["targets", "data"];
const TARGET_VALUE_KEYS: &[&str] = &["target", "amount", "targetAmount", "value"];

/// Officers and manager users decoded from a user report.
#[derive(Debug, Clone, Default)]
pub struct UserPayload {
    pub leaves: Vec<LeafRecord>,
    pub directory: StaffDirectory,
    /// Rows dropped for a missing id or an unrecognized role.
    pub skipped: usize,
}

/// Decode the user report into officers and a staff directory.
///
/// Accepts a bare array or an object wrapping it under `data`, `users` or
/// `results`. Every field in `metric_fields` is set on each officer,
/// defaulting to 0; numeric strings count as numbers.
pub fn parse_users(
    value: &Value,
    origin: &str,
    metric_fields: &[String],
) -> Result<UserPayload, SourceError> {
    let rows = list_of(value, USER_LIST_KEYS).ok_or_else(|| SourceError::Shape {
        origin: origin.to_string(),
        message: "expected an array of users".to_string(),
    })?;

    let mut payload = UserPayload::default();
    let mut staff = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let Some(row) = row.as_object() else {
            warn!("Skipping user row {} from {}: not an object", index, origin);
            payload.skipped += 1;
            continue;
        };

        let role_text = text(row, &["role"]);
        let role = if role_text.is_empty() {
            Role::So
        } else {
            match Role::parse(&role_text) {
                Some(role) => role,
                None => {
                    debug!("Skipping user row {} with role '{}'", index, role_text);
                    payload.skipped += 1;
                    continue;
                }
            }
        };

        let name = text(row, &["name", "fullName"]);
        let zone = text(row, &["zone"]);

        if role.is_manager() {
            staff.push(StaffRecord { name, role, zone });
            continue;
        }

        let id = text(row, ID_KEYS);
        if id.is_empty() {
            warn!("Skipping officer row {} from {}: no id", index, origin);
            payload.skipped += 1;
            continue;
        }

        let outlet = Some(text(row, &["outlet", "outletName"])).filter(|o| !o.is_empty());

        let metrics: Metrics = metric_fields
            .iter()
            .map(|field| {
                let value = row.get(field).and_then(number).unwrap_or(0.0);
                (field.clone(), value)
            })
            .collect();

        payload.leaves.push(LeafRecord {
            id,
            name,
            outlet,
            zone,
            role,
            asm: text(row, &["asm"]),
            rsm: text(row, &["rsm"]),
            som: text(row, &["som"]),
            target: 0.0,
            metrics,
        });
    }

    payload.directory = StaffDirectory::new(staff);
    Ok(payload)
}

/// Decode targets into an id -> target map. Later duplicates win.
///
/// Accepts an array of `{userId|id, target|amount}` rows, an object
/// wrapping such an array under `targets` or `data`, or a plain object
/// map of id to number.
pub fn parse_targets(value: &Value, origin: &str) -> Result<HashMap<String, f64>, SourceError> {
    let mut targets = HashMap::new();

    if let Some(rows) = list_of(value, TARGET_LIST_KEYS) {
        for row in rows {
            let Some(row) = row.as_object() else {
                continue;
            };
            let id = text(row, &["userId", "user_id", "id", "_id"]);
            if id.is_empty() {
                debug!("Skipping target row without a user id");
                continue;
            }
            let amount = TARGET_VALUE_KEYS
                .iter()
                .find_map(|k| row.get(*k).and_then(number))
                .unwrap_or(0.0);
            targets.insert(id, amount);
        }
        return Ok(targets);
    }

    match value.as_object() {
        Some(map) => {
            for (id, amount) in map {
                match number(amount) {
                    Some(amount) => {
                        targets.insert(id.clone(), amount);
                    }
                    None => debug!("Ignoring non-numeric target for {}", id),
                }
            }
            Ok(targets)
        }
        None => Err(SourceError::Shape {
            origin: origin.to_string(),
            message: "expected a target list or an id -> target object".to_string(),
        }),
    }
}

/// The array itself, or the first array found under one of `keys`.
fn list_of<'v>(value: &'v Value, keys: &[&str]) -> Option<&'v Vec<Value>> {
    match value {
        Value::Array(rows) => Some(rows),
        Value::Object(map) => keys.iter().find_map(|k| map.get(*k).and_then(Value::as_array)),
        _ => None,
    }
}

/// First present key rendered as trimmed text. Nested `{ "name": .. }`
/// objects (populated references) yield their name.
fn text(row: &Map<String, Value>, keys: &[&str]) -> String {
    for key in keys {
        let rendered = match row.get(*key) {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Object(inner)) => text(inner, &["name"]),
            _ => continue,
        };
        if !rendered.is_empty() {
            return rendered;
        }
    }
    String::new()
}

fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields() -> Vec<String> {
        vec!["primaryValue".to_string(), "secondaryValue".to_string()]
    }

    #[test]
    fn test_parse_users_splits_officers_and_staff() {
        let value = json!({
            "data": [
                { "_id": "u1", "name": " Sohel ", "zone": "DHAKA-01-ZONE-01", "role": "SO",
                  "asm": "Anwar", "rsm": { "name": "Rafiq" }, "primaryValue": 120, "secondaryValue": "80.5" },
                { "_id": "u2", "name": "Anwar", "zone": "DHAKA-01", "role": "ASM" },
                { "_id": "u3", "name": "Admin", "role": "Admin" },
                { "name": "No Id", "zone": "DHAKA-01-ZONE-01" },
                "garbage"
            ]
        });

        let payload = parse_users(&value, "test", &fields()).unwrap();

        assert_eq!(payload.leaves.len(), 1);
        let leaf = &payload.leaves[0];
        assert_eq!(leaf.id, "u1");
        assert_eq!(leaf.name, "Sohel");
        assert_eq!(leaf.rsm, "Rafiq");
        assert_eq!(leaf.som, "");
        assert_eq!(leaf.metric("primaryValue"), 120.0);
        assert_eq!(leaf.metric("secondaryValue"), 80.5);

        assert_eq!(payload.directory.len(), 1);
        assert_eq!(payload.directory.zone_of("Anwar", Role::Asm), Some("DHAKA-01"));
        assert_eq!(payload.skipped, 3);
    }

    #[test]
    fn test_parse_users_defaults_missing_metrics() {
        let value = json!([{ "id": 42, "name": "Kamal", "zone": "KHULNA-ZONE-03" }]);

        let payload = parse_users(&value, "test", &fields()).unwrap();

        let leaf = &payload.leaves[0];
        assert_eq!(leaf.id, "42");
        assert_eq!(leaf.role, Role::So);
        assert_eq!(leaf.metrics.get("secondaryValue"), Some(&0.0));
        assert!(leaf.outlet.is_none());
    }

    #[test]
    fn test_parse_users_rejects_scalar() {
        let err = parse_users(&json!(12), "test", &fields()).unwrap_err();
        assert!(matches!(err, SourceError::Shape { .. }));
    }

    #[test]
    fn test_parse_targets_list() {
        let value = json!({
            "targets": [
                { "userId": "u1", "target": 500 },
                { "userId": "u2", "amount": "250" },
                { "target": 9 },
                { "userId": "u1", "target": 600 }
            ]
        });

        let targets = parse_targets(&value, "test").unwrap();

        assert_eq!(targets.len(), 2);
        assert_eq!(targets.get("u1"), Some(&600.0));
        assert_eq!(targets.get("u2"), Some(&250.0));
    }

    #[test]
    fn test_parse_targets_map() {
        let value = json!({ "u1": 100, "u2": "n/a" });

        let targets = parse_targets(&value, "test").unwrap();

        assert_eq!(targets.len(), 1);
        assert_eq!(targets.get("u1"), Some(&100.0));
    }
}
