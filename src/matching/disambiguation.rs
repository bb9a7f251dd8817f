//! Preferred-label hierarchy.
//!
//! Given a synonym found in text and the lookup candidates that carry it
//! exactly, decide whether one entity is the unambiguous referent:
//!
//! 1. a single candidate wins outright;
//! 2. otherwise candidates whose preferred label equals the synonym
//!    (case-insensitive) are *preferred*, the rest that list it as a synonym
//!    are *regular*;
//! 3. more than one preferred candidate is ambiguous;
//! 4. exactly one preferred candidate wins, however many regular ones exist;
//! 5. with no preferred candidate, a lone regular candidate wins;
//! 6. with no preferred candidate, several regular candidates are ambiguous.

use crate::domain::{AmbiguityKind, LookupResult};

/// Outcome of resolving one synonym.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution<'a> {
    /// Exactly one entity is the referent.
    Winner(&'a LookupResult),
    /// Several entities are equally plausible.
    Ambiguous(AmbiguityKind),
    /// No candidate carries the synonym, so there is nothing to decide.
    NoCandidates,
}

impl<'a> Resolution<'a> {
    pub fn winner(self) -> Option<&'a LookupResult> {
        match self {
            Self::Winner(w) => Some(w),
            _ => None,
        }
    }

    pub fn is_ambiguous(self) -> bool {
        matches!(self, Self::Ambiguous(_))
    }
}

/// Apply the preferred-label hierarchy to `candidates` for `synonym`.
pub fn resolve<'a>(synonym: &str, candidates: &'a [LookupResult]) -> Resolution<'a> {
    match candidates {
        [] => return Resolution::NoCandidates,
        [only] => return Resolution::Winner(only),
        _ => {}
    }

    let (preferred, regular): (Vec<&LookupResult>, Vec<&LookupResult>) = candidates
        .iter()
        .filter(|c| c.is_exact_match(synonym))
        .partition(|c| c.label_matches(synonym));

    match (preferred.as_slice(), regular.as_slice()) {
        ([winner], _) => Resolution::Winner(*winner),
        ([_, _, ..], _) => Resolution::Ambiguous(AmbiguityKind::MultiplePreferredLabels),
        ([], [winner]) => Resolution::Winner(*winner),
        ([], [_, _, ..]) => Resolution::Ambiguous(AmbiguityKind::MultipleRegularSynonyms),
        ([], []) => Resolution::NoCandidates,
    }
}
