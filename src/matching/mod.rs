//! Lexical matching: finding synonyms in text and picking a single entity
//! for a synonym that several entities share.

pub mod disambiguation;
pub mod text;

pub use disambiguation::{Resolution, resolve};
pub use text::{SynonymMatcher, find_matches};
