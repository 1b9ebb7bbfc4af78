/// Substrings that mark a profile text as carrying a link.
///
/// `@` matches any handle mention, so this set flags far more than actual
/// URLs. Narrowing it is a product decision, not a code cleanup.
pub const BIO_LINK_MARKERS: &[&str] = &["http://", "https://", "t.me", "@"];

/// Return `true` when the profile text contains any bio-link marker,
/// ignoring ASCII case.
pub fn contains_bio_link(profile_text: &str) -> bool {
    if profile_text.is_empty() {
        return false;
    }

    let lowered = profile_text.to_lowercase();
    BIO_LINK_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}
