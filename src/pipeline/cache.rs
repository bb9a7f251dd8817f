//! Batch lookup cache.
//!
//! Before classifying a batch of edges, every synonym that actually occurs in
//! some edge's text is gathered, grouped by the lookup filter of the entity it
//! belongs to, and resolved with one bulk call per group. Candidates are
//! cached per filter, so a name shared by entities of different types keeps
//! a separate answer for each. The classifier then reads candidates from the
//! cache only.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use futures::{StreamExt, TryStreamExt, stream};
use tracing::debug;

use super::NormalizedMap;
use super::index::EntityIndex;
use crate::domain::{Edge, LookupResult, exact_matches};
use crate::services::{LookupFilters, NameLookup, ServiceError};

/// Candidates per lookup filter and synonym string, already narrowed to
/// exact matches.
#[derive(Debug, Clone, Default)]
pub struct LookupCache {
    entries: HashMap<LookupFilters, HashMap<String, Vec<LookupResult>>>,
}

impl LookupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, filters: &LookupFilters, synonym: &str) -> Option<&[LookupResult]> {
        self.entries
            .get(filters)?
            .get(synonym)
            .map(Vec::as_slice)
    }

    pub fn contains(&self, filters: &LookupFilters, synonym: &str) -> bool {
        self.entries
            .get(filters)
            .is_some_and(|group| group.contains_key(synonym))
    }

    /// Cached synonym strings across all filters.
    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Store raw lookup results for `synonym` under `filters`, keeping only
    /// exact matches.
    ///
    /// Results for a synonym already present are appended, skipping
    /// identifiers that are already cached.
    pub fn insert(
        &mut self,
        filters: &LookupFilters,
        synonym: impl Into<String>,
        results: Vec<LookupResult>,
    ) {
        let synonym = synonym.into();
        let exact = exact_matches(&synonym, results);
        let entry = self
            .entries
            .entry(filters.clone())
            .or_default()
            .entry(synonym)
            .or_default();
        for candidate in exact {
            if !entry.iter().any(|c| c.curie == candidate.curie) {
                entry.push(candidate);
            }
        }
    }

    /// Resolve every planned synonym, `concurrency` bulk calls at a time.
    pub async fn populate(
        &mut self,
        plan: LookupPlan,
        lookup: &dyn NameLookup,
        concurrency: usize,
    ) -> Result<usize, ServiceError> {
        let calls = plan.groups.len();
        if calls == 0 {
            return Ok(0);
        }

        let answers: Vec<(LookupFilters, HashMap<String, Vec<LookupResult>>)> =
            stream::iter(plan.groups.into_iter().map(move |(filters, strings)| async move {
                let strings: Vec<String> = strings.into_iter().collect();
                let answer = lookup.bulk_lookup(&strings, &filters).await?;
                Ok::<_, ServiceError>((filters, answer))
            }))
            .buffered(concurrency.max(1))
            .try_collect()
            .await?;

        for (filters, answer) in answers {
            for (synonym, results) in answer {
                self.insert(&filters, synonym, results);
            }
        }

        debug!(calls, cached = self.len(), "Lookup cache populated");
        Ok(calls)
    }
}

/// Synonyms to look up, grouped by filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupPlan {
    groups: BTreeMap<LookupFilters, BTreeSet<String>>,
}

impl LookupPlan {
    pub fn groups(&self) -> impl Iterator<Item = (&LookupFilters, &BTreeSet<String>)> {
        self.groups.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total synonym strings across groups.
    pub fn len(&self) -> usize {
        self.groups.values().map(BTreeSet::len).sum()
    }
}

/// Collect the synonyms of `edges` that appear in their supporting text and
/// are not cached yet under the owning entity's filter.
///
/// Entities missing from `index` are skipped.
pub fn plan_lookups(
    edges: &[Edge],
    normalized: &NormalizedMap,
    index: &EntityIndex,
    cache: &LookupCache,
) -> LookupPlan {
    let mut plan = LookupPlan::default();

    for edge in edges {
        let Some(text) = edge.supporting_text() else {
            continue;
        };
        for curie in [&edge.subject, &edge.object] {
            let Some(entity) = normalized
                .get(curie)
                .and_then(Option::as_ref)
                .and_then(|e| index.get(e.preferred_id()))
            else {
                continue;
            };

            let found = entity.matcher.find(&text);
            if found.is_empty() {
                continue;
            }
            let group = plan.groups.entry(entity.filters.clone()).or_default();
            group.extend(
                found
                    .into_iter()
                    .filter(|s| !cache.contains(&entity.filters, s)),
            );
        }
    }

    plan.groups.retain(|_, strings| !strings.is_empty());
    plan
}
