//! JSON pointer to `$`-path conversion
//!
//! Copyright (c) 2025 Report Sink Team
//! Licensed under the Apache-2.0 license

/// Convert a JSON pointer such as `/stage_info/0/action` into `$.stage_info[0].action`.
///
/// Segments made only of ASCII digits are rendered as array indices. `~1` and `~0`
/// escapes are decoded.
pub fn pointer_to_path(pointer: &str) -> String {
    let mut path = String::from("$");
    if pointer.is_empty() {
        return path;
    }
    for segment in pointer.trim_start_matches('/').split('/') {
        let segment = segment.replace("~1", "/").replace("~0", "~");
        if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
            path.push('[');
            path.push_str(&segment);
            path.push(']');
        } else {
            path = child_path(&path, &segment);
        }
    }
    path
}

/// Path of a named property under `parent`
pub fn child_path(parent: &str, property: &str) -> String {
    format!("{}.{}", parent, property)
}
