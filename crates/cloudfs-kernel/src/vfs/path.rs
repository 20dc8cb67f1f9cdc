//! Virtual path ↔ object key mapping.
//!
//! Hosts address content as `~/upload/28/photo.jpg`; the store holds it at
//! `upload/28/photo.jpg`. For any path that starts with `~/` (and has no
//! further leading `/`), `to_virtual_path(&to_store_key(p)) == p`.

/// Root marker of virtual paths.
pub const ROOT_MARKER: &str = "~/";

/// Name of the zero-byte object that marks a directory as existing.
pub const SENTINEL_NAME: &str = "__empty";

/// Delimiter between key segments.
pub const DELIMITER: char = '/';

/// Strip the `~/` marker, then any remaining leading `/`.
pub fn to_store_key(virtual_path: &str) -> String {
    let path = if virtual_path == "~" {
        ""
    } else {
        virtual_path.strip_prefix(ROOT_MARKER).unwrap_or(virtual_path)
    };
    path.trim_start_matches(DELIMITER).to_string()
}

/// Prepend the `~/` marker.
pub fn to_virtual_path(store_key: &str) -> String {
    format!("{ROOT_MARKER}{store_key}")
}

/// Key of a directory: its store key without trailing delimiters.
pub fn directory_key(virtual_path: &str) -> String {
    to_store_key(virtual_path)
        .trim_end_matches(DELIMITER)
        .to_string()
}

/// Listing prefix for the contents of a directory key (`""` for the root).
pub fn list_prefix(dir_key: &str) -> String {
    if dir_key.is_empty() {
        String::new()
    } else {
        format!("{dir_key}{DELIMITER}")
    }
}

/// Key of a directory's sentinel object.
pub fn sentinel_key(dir_key: &str) -> String {
    format!("{}{SENTINEL_NAME}", list_prefix(dir_key))
}

/// Last non-empty segment of a key or path.
pub fn file_name(key: &str) -> &str {
    key.trim_end_matches(DELIMITER)
        .rsplit(DELIMITER)
        .next()
        .unwrap_or("")
}
