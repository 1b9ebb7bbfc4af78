/// Bio-link detection predicate.
pub mod detection;
/// Shared formatting helpers (durations, user mentions).
pub mod formatting;
/// Pure parser helpers.
pub mod parse;
/// User-facing notice texts.
pub mod text;
/// Shared time helpers.
pub mod time;
