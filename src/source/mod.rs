//! Rollup input loading.
//!
//! Officer rows and targets come either from local JSON exports or from
//! the REST backend. Both inputs are fetched concurrently and the
//! aggregator only runs once both have resolved.

pub mod backend;
pub mod error;
pub mod payload;

pub use backend::{BackendClient, Session};
pub use error::SourceError;
pub use payload::{parse_targets, parse_users};

use crate::models::{LeafRecord, Period, StaffDirectory};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Where to load from and what to extract.
#[derive(Debug, Clone)]
pub struct SourcePlan {
    pub leaves_path: Option<PathBuf>,
    pub targets_path: Option<PathBuf>,
    pub base_url: Option<String>,
    pub timeout_seconds: u64,
    pub session: Session,
    pub period: Period,
    pub metric_fields: Vec<String>,
}

/// Everything the aggregator needs for one run.
#[derive(Debug, Clone, Default)]
pub struct RollupInput {
    pub leaves: Vec<LeafRecord>,
    pub directory: StaffDirectory,
    pub targets: HashMap<String, f64>,
    /// Human-readable description of where the officers came from.
    pub origin: String,
    pub skipped: usize,
}

impl SourcePlan {
    /// Label for the officer source used in logs and report metadata.
    pub fn origin(&self) -> String {
        match (&self.leaves_path, &self.base_url) {
            (Some(path), _) => path.display().to_string(),
            (None, Some(url)) => format!("{}{}", url.trim_end_matches('/'), backend::USERS_ENDPOINT),
            (None, None) => String::from("<none>"),
        }
    }
}

/// Load officers, staff directory and targets according to `plan`.
///
/// Local files take precedence over the backend for each input
/// independently. Missing targets are not an error: every officer then
/// has a target of 0.
pub async fn load(plan: &SourcePlan) -> Result<RollupInput, SourceError> {
    let client = match plan.base_url {
        Some(ref url) => Some(BackendClient::new(url, plan.timeout_seconds, plan.session.clone())?),
        None => None,
    };

    let users = async {
        match (&plan.leaves_path, &client) {
            (Some(path), _) => read_json(path).await,
            (None, Some(client)) => client.fetch_users(plan.period).await,
            (None, None) => Err(SourceError::NoSource),
        }
    };

    let targets = async {
        match (&plan.targets_path, &client) {
            (Some(path), _) => read_json(path).await.map(Some),
            (None, Some(client)) => client.fetch_targets(plan.period).await.map(Some),
            (None, None) => Ok(None),
        }
    };

    let (users, targets) = futures::try_join!(users, targets)?;

    let origin = plan.origin();
    let payload = parse_users(&users, &origin, &plan.metric_fields)?;
    let targets = match targets {
        Some(value) => parse_targets(&value, &target_origin(plan))?,
        None => {
            warn!("No target source configured; all targets default to 0");
            HashMap::new()
        }
    };

    info!(
        "Loaded {} officers, {} managers in directory, {} targets from {}",
        payload.leaves.len(),
        payload.directory.len(),
        targets.len(),
        origin
    );
    if payload.skipped > 0 {
        warn!("Skipped {} unusable user rows", payload.skipped);
    }

    Ok(RollupInput {
        leaves: payload.leaves,
        directory: payload.directory,
        targets,
        origin,
        skipped: payload.skipped,
    })
}

fn target_origin(plan: &SourcePlan) -> String {
    match (&plan.targets_path, &plan.base_url) {
        (Some(path), _) => path.display().to_string(),
        (None, Some(url)) => format!("{}{}", url.trim_end_matches('/'), backend::TARGETS_ENDPOINT),
        (None, None) => String::from("<none>"),
    }
}

async fn read_json(path: &Path) -> Result<Value, SourceError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SourceError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    serde_json::from_str(&content).map_err(|source| SourceError::Json {
        origin: path.display().to_string(),
        source,
    })
}
