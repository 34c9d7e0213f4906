use crate::domain::constants::TRICHION_KEYWORD;

/// Whether manual trichion placement should be offered for a result with these warnings.
///
/// Evaluated per result; warnings change between recalculations so the answer is never cached.
pub fn offers_override<S: AsRef<str>>(warnings: &[S]) -> bool {
    warnings
        .iter()
        .any(|w| w.as_ref().to_lowercase().contains(TRICHION_KEYWORD))
}
