//! Image reference validation
//!
//! Syntactic pre-filter only. Whether the image actually exists is decided
//! later by pulling it.

use regex::Regex;
use std::sync::LazyLock;

/// Segments of word characters, `-`, `_` and `.` (at most 20 each) joined by
/// `/` or `:`, with at least one separator.
static IMAGE_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([-_A-Za-z0-9.]{0,20}[/:])+[-_A-Za-z0-9.]{0,20}$")
        .expect("image reference pattern must compile")
});

/// Returns `true` when `s` is a structurally valid image reference
pub fn is_valid_image_ref(s: &str) -> bool {
    IMAGE_REF.is_match(s)
}
