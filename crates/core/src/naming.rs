//! File-name rules shared by the rename path and anything that displays names.

/// Characters that are never allowed in a working name.
pub const INVALID_NAME_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Extension of `name` including the leading dot, or `None`.
///
/// The extension runs from the last `.` to the end. A dot at position 0
/// (`.gitignore`) marks a hidden file, not an extension.
pub fn extension(name: &str) -> Option<&str> {
    match name.rfind('.') {
        None | Some(0) => None,
        Some(idx) => Some(&name[idx..]),
    }
}

/// Case-insensitive extension equality. Two names without an extension match.
pub fn same_extension(a: &str, b: &str) -> bool {
    match (extension(a), extension(b)) {
        (None, None) => true,
        (Some(x), Some(y)) => x.to_lowercase() == y.to_lowercase(),
        _ => false,
    }
}

pub fn contains_invalid_chars(name: &str) -> bool {
    name.contains(INVALID_NAME_CHARS)
}

/// Key used for duplicate detection within one opportunity.
pub fn collision_key(name: &str) -> String {
    name.to_lowercase()
}
