//! Whole-word, case-insensitive synonym search.

use std::collections::HashSet;

use regex::{Regex, RegexBuilder, RegexSet, RegexSetBuilder};
use tracing::warn;

/// Compiled-size ceiling for one entity's pattern set.
const SET_SIZE_LIMIT: usize = 64 * (1 << 20);

/// Compiled whole-word patterns for one list of synonyms.
///
/// Build it once per entity and reuse it for every text that mentions the
/// entity.
#[derive(Debug, Clone)]
pub struct SynonymMatcher {
    synonyms: Vec<String>,
    patterns: Patterns,
}

#[derive(Debug, Clone)]
enum Patterns {
    Empty,
    Set(RegexSet),
    /// Used when the combined set exceeds the size limit. Synonyms whose own
    /// pattern fails to compile are left out.
    Each(Vec<(usize, Regex)>),
}

impl SynonymMatcher {
    /// Compile `candidates`. Blank and repeated candidates are dropped.
    pub fn new<S: AsRef<str>>(candidates: &[S]) -> Self {
        let mut seen = HashSet::new();
        let synonyms: Vec<String> = candidates
            .iter()
            .map(AsRef::as_ref)
            .filter(|c| !c.trim().is_empty() && seen.insert(*c))
            .map(ToString::to_string)
            .collect();

        if synonyms.is_empty() {
            return Self {
                synonyms,
                patterns: Patterns::Empty,
            };
        }

        let sources: Vec<String> = synonyms.iter().map(|s| word_pattern(s)).collect();
        let patterns = match RegexSetBuilder::new(&sources)
            .case_insensitive(true)
            .size_limit(SET_SIZE_LIMIT)
            .build()
        {
            Ok(set) => Patterns::Set(set),
            Err(e) => {
                warn!(
                    synonyms = synonyms.len(),
                    error = %e,
                    "Synonym set too large, compiling patterns one by one"
                );
                Patterns::Each(compile_each(&synonyms, &sources))
            }
        };

        Self { synonyms, patterns }
    }

    /// Synonyms occurring in `text` as whole words, in candidate order.
    pub fn find(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        match &self.patterns {
            Patterns::Empty => Vec::new(),
            Patterns::Set(set) => set
                .matches(text)
                .into_iter()
                .map(|i| self.synonyms[i].clone())
                .collect(),
            Patterns::Each(patterns) => patterns
                .iter()
                .filter(|(_, re)| re.is_match(text))
                .map(|(i, _)| self.synonyms[*i].clone())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.synonyms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.synonyms.is_empty()
    }
}

/// Return the candidates that occur in `text` as whole words.
///
/// Matching ignores case and requires a word boundary on both sides, so
/// `"tein"` never matches inside `"protein"`. Empty candidates are skipped.
/// The result keeps the candidates' original casing, in first-seen order,
/// without duplicates.
///
/// Compiles the candidates on every call; hold a [`SynonymMatcher`] when the
/// same list is searched repeatedly.
pub fn find_matches<S: AsRef<str>>(text: &str, candidates: &[S]) -> Vec<String> {
    if text.trim().is_empty() || candidates.is_empty() {
        return Vec::new();
    }
    SynonymMatcher::new(candidates).find(text)
}

fn word_pattern(synonym: &str) -> String {
    format!(r"\b{}\b", regex::escape(synonym))
}

fn compile_each(synonyms: &[String], sources: &[String]) -> Vec<(usize, Regex)> {
    sources
        .iter()
        .enumerate()
        .filter_map(|(i, source)| {
            match RegexBuilder::new(source).case_insensitive(true).build() {
                Ok(re) => Some((i, re)),
                Err(e) => {
                    warn!(synonym = %synonyms[i], error = %e, "Could not compile synonym pattern");
                    None
                }
            }
        })
        .collect()
}
