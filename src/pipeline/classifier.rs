//! Per-edge classification.
//!
//! Checks run in a fixed order and the first failing one decides the outcome:
//! supporting text, normalization, synonyms, presence in text, ambiguity of
//! any found synonym, and finally whether each winner is the expected entity.

use super::cache::LookupCache;
use super::index::EntityIndex;
use super::{NormalizedMap, SynonymMap};
use crate::domain::{
    Classification, DebugTrace, Edge, LookupResult, NormalizedEntity, Role, SynonymSet,
};
use crate::matching::{Resolution, resolve};

/// Classify `edge` using only already-fetched data.
///
/// Candidates for each role are read from the cache under that role's own
/// lookup filter, taken from `index`.
pub fn classify(
    edge: &Edge,
    cache: &LookupCache,
    normalized: &NormalizedMap,
    synonyms: &SynonymMap,
    index: &EntityIndex,
) -> (Classification, DebugTrace) {
    let mut trace = DebugTrace::for_edge(edge);

    let Some(text) = edge.supporting_text() else {
        return unresolved(trace, "No supporting text available");
    };

    let subject = normalized.get(&edge.subject).and_then(Option::as_ref);
    let object = normalized.get(&edge.object).and_then(Option::as_ref);
    trace.subject_preferred = subject.map(|e| e.preferred_id().to_string());
    trace.object_preferred = object.map(|e| e.preferred_id().to_string());

    let (subject, object) = match (subject, object) {
        (Some(s), Some(o)) => (s, o),
        (None, None) => {
            return unresolved(trace, "Missing normalized data for subject and object");
        }
        (None, Some(_)) => return unresolved(trace, "Missing normalized data for subject"),
        (Some(_), None) => return unresolved(trace, "Missing normalized data for object"),
    };

    let (subject_set, object_set) = match (
        usable_synonyms(synonyms, subject),
        usable_synonyms(synonyms, object),
    ) {
        (Some(s), Some(o)) => (s, o),
        (None, None) => return unresolved(trace, "Missing synonyms for subject and object"),
        (None, Some(_)) => return unresolved(trace, "Missing synonyms for subject"),
        (Some(_), None) => return unresolved(trace, "Missing synonyms for object"),
    };

    let subject_index = index.entity(subject.preferred_id(), subject_set);
    let object_index = index.entity(object.preferred_id(), object_set);
    trace.subject.synonyms_found = subject_index.matcher.find(&text);
    trace.object.synonyms_found = object_index.matcher.find(&text);

    match (
        trace.subject.synonyms_found.is_empty(),
        trace.object.synonyms_found.is_empty(),
    ) {
        (true, true) => return unresolved(trace, "Neither subject nor object found in text"),
        (true, false) => return unresolved(trace, "Subject not found in text"),
        (false, true) => return unresolved(trace, "Object not found in text"),
        (false, false) => {}
    }

    let mut ambiguity = None;
    let mut mismatch = None;
    for (role, expected, indexed) in [
        (Role::Subject, subject, &subject_index),
        (Role::Object, object, &object_index),
    ] {
        let role_trace = trace.role_mut(role);
        for synonym in &role_trace.synonyms_found {
            let Some(candidates) = cache
                .get(&indexed.filters, synonym)
                .filter(|c| !c.is_empty())
            else {
                continue;
            };
            match resolve(synonym, candidates) {
                Resolution::Ambiguous(kind) => {
                    role_trace.ambiguous = true;
                    role_trace
                        .lookup_data
                        .insert(synonym.clone(), summarize(candidates));
                    ambiguity.get_or_insert_with(|| kind.describe(synonym));
                }
                Resolution::Winner(winner) => {
                    role_trace
                        .lookup_data
                        .insert(synonym.clone(), vec![winner.summarized()]);
                    if !expected.is_equivalent(&winner.curie) {
                        mismatch.get_or_insert_with(|| {
                            format!(
                                "{} synonym \"{synonym}\" resolves to {} but expected {}",
                                role.title(),
                                winner.curie,
                                expected.preferred_id()
                            )
                        });
                    }
                }
                Resolution::NoCandidates => {}
            }
        }
    }

    if let Some(reason) = ambiguity {
        trace.reason = Some(reason);
        return (Classification::Ambiguous, trace);
    }
    if let Some(reason) = mismatch {
        return unresolved(trace, reason);
    }
    (Classification::Passed, trace)
}

fn usable_synonyms<'a>(
    synonyms: &'a SynonymMap,
    entity: &NormalizedEntity,
) -> Option<&'a SynonymSet> {
    synonyms
        .get(entity.preferred_id())
        .filter(|set| !set.is_empty())
}

fn summarize(candidates: &[LookupResult]) -> Vec<LookupResult> {
    candidates.iter().map(LookupResult::summarized).collect()
}

fn unresolved(mut trace: DebugTrace, reason: impl Into<String>) -> (Classification, DebugTrace) {
    trace.reason = Some(reason.into());
    (Classification::Unresolved, trace)
}
