//! Alias rotation and the retention pass

use crate::candidate::RetentionCandidate;
use crate::error::Result;
use crate::plan::{SkipReason, plan_retention};
use sluice_config::RetentionConfig;
use sluice_store::{AliasAction, IndexAdmin, StoreError};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of one retention pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetentionOutcome {
    /// Nothing was sent to the store
    Skipped(SkipReason),
    /// One delete request was sent
    Deleted {
        deleted: Vec<String>,
        kept: Vec<String>,
        acknowledged: bool,
    },
    /// Listing or deleting collections failed
    Failed(StoreError),
}

impl RetentionOutcome {
    /// Collections the store confirmed as deleted
    pub fn deleted(&self) -> &[String] {
        match self {
            Self::Deleted {
                deleted,
                acknowledged: true,
                ..
            } => deleted,
            _ => &[],
        }
    }
}

/// Result of [`RetentionPolicy::update_aliases`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasUpdate {
    /// Actions sent in the single alias request, empty if none was sent
    pub actions: Vec<AliasAction>,
    /// Whether the store acknowledged the request (true when none was needed)
    pub acknowledged: bool,
    /// Outcome of the retention pass, if retention is enabled
    pub retention: Option<RetentionOutcome>,
}

impl AliasUpdate {
    fn unchanged() -> Self {
        Self {
            actions: Vec::new(),
            acknowledged: true,
            retention: None,
        }
    }
}

/// Moves aliases to new rotations and prunes old ones
///
/// Holds no state besides its configuration. Every mutation is a single
/// round trip to the store, which is trusted to apply an alias request
/// atomically.
pub struct RetentionPolicy {
    admin: Arc<dyn IndexAdmin>,
    config: RetentionConfig,
}

impl RetentionPolicy {
    pub fn new(admin: Arc<dyn IndexAdmin>, config: RetentionConfig) -> Self {
        Self { admin, config }
    }

    pub fn config(&self) -> &RetentionConfig {
        &self.config
    }

    /// Current target of `alias`, or `alias` itself when it does not resolve
    pub async fn resolve_alias(&self, alias: &str) -> String {
        match self.admin.get_aliases(alias).await {
            Ok(targets) => targets
                .into_keys()
                .next()
                .unwrap_or_else(|| alias.to_string()),
            Err(e) => {
                debug!(alias, error = %e, "alias lookup failed");
                alias.to_string()
            }
        }
    }

    /// Newest rotation `alias` points to, or `alias` itself
    pub async fn resolve_most_recent(&self, alias: &str) -> String {
        let targets = match self.admin.get_aliases(alias).await {
            Ok(targets) => targets,
            Err(e) => {
                debug!(alias, error = %e, "alias lookup failed");
                return alias.to_string();
            }
        };

        targets
            .keys()
            .filter_map(|name| RetentionCandidate::parse(alias, name))
            .min_by(RetentionCandidate::newest_first)
            .map(|candidate| candidate.name)
            .unwrap_or_else(|| alias.to_string())
    }

    /// Point `alias` (and the identifier alias, if configured) at `concrete`
    ///
    /// Existing pointers of `alias` are removed and the new one added in
    /// one request, so readers never see the alias unassigned. Runs the
    /// retention pass afterwards when retention is enabled.
    pub async fn update_aliases(&self, alias: &str, concrete: &str) -> Result<AliasUpdate> {
        if alias == concrete {
            return Ok(AliasUpdate::unchanged());
        }

        let actions = self.plan_aliases(alias, concrete).await?;

        let acknowledged = if actions.is_empty() {
            true
        } else {
            let acknowledged = self.admin.update_aliases(&actions).await?;
            if acknowledged {
                info!(alias, concrete, actions = actions.len(), "aliases updated");
            } else {
                warn!(alias, concrete, "alias update was not acknowledged");
            }
            acknowledged
        };

        let retention = if self.config.enabled {
            Some(
                self.perform_retention_policy(
                    alias,
                    concrete,
                    self.config.diff,
                    self.config.min_to_keep,
                )
                .await,
            )
        } else {
            None
        };

        Ok(AliasUpdate {
            actions,
            acknowledged,
            retention,
        })
    }

    async fn plan_aliases(&self, alias: &str, concrete: &str) -> Result<Vec<AliasAction>> {
        let identifier = self.config.identifier.as_deref();
        let existing = self.admin.get_aliases(alias).await?;

        if existing.is_empty() {
            let mut actions = vec![AliasAction::add(alias, concrete)];
            if let Some(identifier) = identifier {
                actions.push(AliasAction::add(identifier, concrete));
            }
            return Ok(actions);
        }

        let identified: BTreeSet<String> = match identifier {
            Some(identifier) => self.admin.get_aliases(identifier).await?.into_keys().collect(),
            None => BTreeSet::new(),
        };

        let mut actions = Vec::new();
        for collection in existing.keys() {
            if collection == concrete {
                continue;
            }
            if !collection.starts_with(alias) {
                warn!(alias, collection = %collection, "alias pointer left in place");
                continue;
            }
            actions.push(AliasAction::remove(alias, collection.as_str()));
            if let Some(identifier) = identifier {
                if identified.contains(collection) {
                    actions.push(AliasAction::remove(identifier, collection.as_str()));
                }
            }
        }

        if actions.is_empty() {
            if existing.contains_key(concrete) {
                debug!(alias, concrete, "alias already current");
            } else {
                warn!(alias, concrete, "no alias pointer to switch");
            }
            return Ok(actions);
        }

        actions.push(AliasAction::add(alias, concrete));
        if let Some(identifier) = identifier {
            actions.push(AliasAction::add(identifier, concrete));
        }
        Ok(actions)
    }

    /// Delete rotations of `alias` more than `max_age` ordinals older than
    /// `concrete`, keeping at least `min_to_keep` of them
    ///
    /// Best-effort: store failures and unacknowledged deletes are logged and
    /// reported in the outcome, never returned as errors.
    pub async fn perform_retention_policy(
        &self,
        alias: &str,
        concrete: &str,
        max_age: i64,
        min_to_keep: i64,
    ) -> RetentionOutcome {
        let collections = match self.admin.list_collections().await {
            Ok(collections) => collections,
            Err(e) => {
                warn!(alias, error = %e, "retention skipped, cannot list collections");
                return RetentionOutcome::Failed(e);
            }
        };

        let plan = match plan_retention(alias, concrete, &collections, max_age, min_to_keep) {
            Ok(plan) => plan,
            Err(reason) => {
                info!(alias, concrete, %reason, "retention skipped");
                return RetentionOutcome::Skipped(reason);
            }
        };

        match self.admin.delete_collections(&plan.deleted).await {
            Ok(acknowledged) => {
                if acknowledged {
                    info!(alias, deleted = ?plan.deleted, kept = plan.kept.len(), "retention deleted collections");
                } else {
                    warn!(alias, deleted = ?plan.deleted, "retention delete was not acknowledged");
                }
                RetentionOutcome::Deleted {
                    deleted: plan.deleted,
                    kept: plan.kept,
                    acknowledged,
                }
            }
            Err(e) => {
                warn!(alias, error = %e, "retention delete failed");
                RetentionOutcome::Failed(e)
            }
        }
    }
}

impl std::fmt::Debug for RetentionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetentionPolicy")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "policy_test.rs"]
mod policy_test;
