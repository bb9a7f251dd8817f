//! Entities of one edge batch, prepared for lookup and classification.
//!
//! Each preferred identifier gets its lookup filter and its compiled synonym
//! patterns once; lookup planning and classification both read them from
//! here, so the two always agree on which filter a role's synonyms belong to.

use std::borrow::Cow;
use std::collections::HashMap;

use super::{NormalizedMap, SynonymMap};
use crate::domain::{Curie, Edge, SynonymSet, curie_prefix};
use crate::matching::SynonymMatcher;
use crate::services::LookupFilters;

const GENE_TYPE: &str = "biolink:Gene";
const GENE_PREFIXES: [&str; 3] = ["NCBIGene", "HGNC", "ENSEMBL"];

/// Lookup filter for the entity behind one edge role.
///
/// The most specific type restricts the search; gene entities are further
/// restricted to `human_taxon` to avoid cross-species name collisions.
pub fn lookup_filters(
    preferred_id: &str,
    synonyms: &SynonymSet,
    human_taxon: &str,
) -> LookupFilters {
    let primary_type = synonyms.primary_type();
    let is_gene = primary_type.as_deref() == Some(GENE_TYPE)
        || GENE_PREFIXES.contains(&curie_prefix(preferred_id));

    let mut filters = LookupFilters {
        biolink_type: primary_type,
        ..LookupFilters::default()
    };
    if is_gene {
        filters.only_taxa.push(human_taxon.to_string());
    }
    filters
}

#[derive(Debug, Clone)]
pub struct IndexedEntity {
    pub filters: LookupFilters,
    pub matcher: SynonymMatcher,
}

impl IndexedEntity {
    pub fn new(preferred_id: &str, synonyms: &SynonymSet, human_taxon: &str) -> Self {
        Self {
            filters: lookup_filters(preferred_id, synonyms, human_taxon),
            matcher: SynonymMatcher::new(&synonyms.names),
        }
    }
}

/// Indexed entities keyed by preferred identifier.
#[derive(Debug, Clone)]
pub struct EntityIndex {
    human_taxon: String,
    entities: HashMap<Curie, IndexedEntity>,
}

impl EntityIndex {
    pub fn new(human_taxon: impl Into<String>) -> Self {
        Self {
            human_taxon: human_taxon.into(),
            entities: HashMap::new(),
        }
    }

    pub fn human_taxon(&self) -> &str {
        &self.human_taxon
    }

    /// Index both roles of every edge that has supporting text, skipping
    /// entities without a normalized identifier or usable synonyms.
    pub fn extend_from(&mut self, edges: &[Edge], normalized: &NormalizedMap, synonyms: &SynonymMap) {
        for edge in edges.iter().filter(|e| e.supporting_text().is_some()) {
            for curie in [&edge.subject, &edge.object] {
                let Some(entity) = normalized.get(curie).and_then(Option::as_ref) else {
                    continue;
                };
                let preferred_id = entity.preferred_id();
                if self.entities.contains_key(preferred_id) {
                    continue;
                }
                let Some(set) = synonyms.get(preferred_id).filter(|s| !s.is_empty()) else {
                    continue;
                };
                self.entities.insert(
                    preferred_id.to_string(),
                    IndexedEntity::new(preferred_id, set, &self.human_taxon),
                );
            }
        }
    }

    pub fn get(&self, preferred_id: &str) -> Option<&IndexedEntity> {
        self.entities.get(preferred_id)
    }

    /// The indexed entry for `preferred_id`, or one built on the spot from
    /// `synonyms` when the entity was not indexed.
    pub fn entity(&self, preferred_id: &str, synonyms: &SynonymSet) -> Cow<'_, IndexedEntity> {
        match self.entities.get(preferred_id) {
            Some(indexed) => Cow::Borrowed(indexed),
            None => Cow::Owned(IndexedEntity::new(preferred_id, synonyms, &self.human_taxon)),
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn clear(&mut self) {
        self.entities.clear();
    }
}
