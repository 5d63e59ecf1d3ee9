use crate::errors::EngineError;

/// Maximum length of a domain name in octets, per RFC 1035.
pub const MAX_NAME_OCTETS: usize = 255;

/// Normalize a queried name for classification and table lookups.
///
/// Strips one trailing dot, rejects empty, oversize, and non-ASCII input,
/// and folds ASCII case. All store columns are case-folded, so every lookup
/// goes through this boundary exactly once.
pub fn normalize(name: &str) -> Result<String, EngineError> {
    let name = name.strip_suffix('.').unwrap_or(name);

    if name.is_empty() {
        return Err(EngineError::InvalidDomainName("empty name".into()));
    }
    if name.len() > MAX_NAME_OCTETS {
        return Err(EngineError::InvalidDomainName(format!(
            "name exceeds {MAX_NAME_OCTETS} octets"
        )));
    }
    if !name.is_ascii() {
        return Err(EngineError::InvalidDomainName(format!(
            "non-ASCII name '{name}'"
        )));
    }

    Ok(name.to_ascii_lowercase())
}

/// Split a name into its leading label and the remainder after the first dot.
///
/// Returns `None` when there is no dot or the remainder would be empty, i.e.
/// for single-label names and names with a trailing dot.
pub fn split_first_label(name: &str) -> Option<(&str, &str)> {
    match name.split_once('.') {
        Some((label, parent)) if !label.is_empty() && !parent.is_empty() => {
            Some((label, parent))
        }
        _ => None,
    }
}
