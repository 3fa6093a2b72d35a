//! # Configuration Resolver
//!
//! Resolution is a pure function of the live fragment set and the context, so the
//! resolver is safe to call for speculative previews.
//!
//! ## Precedence
//!
//! Candidates are ranked by specificity (number of set attributes, the workflow
//! included). Between fragments of equal specificity the most recently created one
//! wins, then the higher id. Ranked fragments are merged least specific first, so the
//! winner's values overlay everything else.
//!
//! ## Caching
//!
//! Results are cached per selection key together with the store generation and the
//! workflow's core category version they were computed at. A store write bumps the
//! generation and a category registration bumps the version, so a stale entry is
//! recomputed instead of served. Entries of older generations are swept once a newer
//! generation is cached.

use dashmap::DashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::merge::merge_all;
use super::{EffectiveConfiguration, RelatedSelector, ResolverError, ResolverResult};
use crate::config::ResolverConfig;
use crate::models::{FragmentCategory, FragmentId, RunContext, SelectionKey, SelectorFragment};
use crate::selector::SelectorStore;

#[derive(Debug, Clone)]
struct CachedConfiguration {
    generation: u64,
    categories_version: u64,
    configuration: EffectiveConfiguration,
}

/// Core categories registered for a workflow; the version grows with every registration
#[derive(Debug, Clone)]
struct CoreCategories {
    version: u64,
    categories: BTreeSet<FragmentCategory>,
}

/// Resolves effective configurations from a selector store
#[derive(Debug)]
pub struct ConfigurationResolver {
    store: Arc<SelectorStore>,
    cache: DashMap<SelectionKey, CachedConfiguration>,
    cache_enabled: bool,
    /// Newest generation whose older entries were swept from the cache
    swept_generation: AtomicU64,
    default_core_categories: BTreeSet<FragmentCategory>,
    workflow_core_categories: DashMap<String, CoreCategories>,
}

impl ConfigurationResolver {
    pub fn new(store: Arc<SelectorStore>, config: &ResolverConfig) -> Self {
        Self {
            store,
            cache: DashMap::new(),
            cache_enabled: config.cache_enabled,
            swept_generation: AtomicU64::new(0),
            default_core_categories: config.core_categories.clone(),
            workflow_core_categories: DashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<SelectorStore> {
        &self.store
    }

    /// Set the categories merged into the configuration of a workflow's runs
    pub fn register_core_categories(
        &self,
        workflow: &str,
        categories: BTreeSet<FragmentCategory>,
    ) -> ResolverResult<()> {
        if categories.is_empty() {
            return Err(ResolverError::EmptyCoreCategories {
                workflow: workflow.to_string(),
            });
        }

        self.workflow_core_categories
            .entry(workflow.to_string())
            .and_modify(|registered| {
                registered.version += 1;
                registered.categories = categories.clone();
            })
            .or_insert_with(|| CoreCategories {
                version: 1,
                categories,
            });
        self.cache.retain(|key, _| key.workflow != workflow);
        Ok(())
    }

    pub fn core_categories_for(&self, workflow: &str) -> BTreeSet<FragmentCategory> {
        self.core_categories_with_version(workflow).1
    }

    /// Categories of a workflow with their registration version, 0 for the defaults
    fn core_categories_with_version(&self, workflow: &str) -> (u64, BTreeSet<FragmentCategory>) {
        self.workflow_core_categories
            .get(workflow)
            .map(|entry| (entry.version, entry.categories.clone()))
            .unwrap_or_else(|| (0, self.default_core_categories.clone()))
    }

    /// Resolve the effective configuration of a context
    pub fn resolve(&self, context: &RunContext) -> ResolverResult<EffectiveConfiguration> {
        let key = context.selection_key();
        let (categories_version, core_categories) =
            self.core_categories_with_version(&context.workflow);

        if self.cache_enabled {
            let generation = self.store.generation();
            if let Some(cached) = self.cache.get(&key) {
                let fresh = cached.generation == generation
                    && cached.categories_version == categories_version;
                if fresh {
                    debug!(context = %context, generation, "Configuration cache hit");
                    return Ok(cached.configuration.clone());
                }
            }
        }

        let snapshot = self.store.matching_snapshot(context);

        let mut core: Vec<&SelectorFragment> = Vec::new();
        let mut related: BTreeMap<FragmentCategory, Vec<&SelectorFragment>> = BTreeMap::new();
        for fragment in &snapshot.fragments {
            if core_categories.contains(&fragment.category) {
                core.push(fragment);
            } else {
                related.entry(fragment.category).or_default().push(fragment);
            }
        }

        if core.is_empty() {
            debug!(context = %context, "No matching core fragments");
            return Err(ResolverError::NoConfigurationFound {
                context: context.to_string(),
            });
        }

        let (config_value, provenance) = merge_ranked(core);
        let related_selectors = related
            .into_iter()
            .map(|(category, fragments)| {
                let (value, provenance) = merge_ranked(fragments);
                (category, RelatedSelector { value, provenance })
            })
            .collect();

        let configuration = EffectiveConfiguration {
            workflow: context.workflow.clone(),
            config_value,
            provenance,
            related_selectors,
            resolved_at: snapshot.last_write_at,
        };

        debug!(
            context = %context,
            provenance = ?configuration.provenance,
            generation = snapshot.generation,
            "Resolved configuration"
        );

        if self.cache_enabled {
            self.sweep_older_than(snapshot.generation);
            self.cache.insert(
                key,
                CachedConfiguration {
                    generation: snapshot.generation,
                    categories_version,
                    configuration: configuration.clone(),
                },
            );
        }

        Ok(configuration)
    }

    /// Drop entries computed before `generation`, once per generation
    fn sweep_older_than(&self, generation: u64) {
        if self.swept_generation.fetch_max(generation, Ordering::SeqCst) >= generation {
            return;
        }
        self.cache.retain(|_, cached| cached.generation >= generation);
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

/// Merge fragments in precedence order and return the value with its provenance
fn merge_ranked(mut fragments: Vec<&SelectorFragment>) -> (serde_json::Value, Vec<FragmentId>) {
    fragments.sort_by_key(|fragment| (fragment.specificity(), fragment.created_at, fragment.id));

    let value = merge_all(fragments.iter().map(|fragment| &fragment.payload));
    let provenance = fragments.iter().map(|fragment| fragment.id).collect();
    (value, provenance)
}
