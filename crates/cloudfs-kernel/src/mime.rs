//! Content-type lookup for uploads.

/// Sent when the extension is missing or unknown.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Maps a file extension (without the dot) to a MIME type.
pub trait MimeLookup: Send + Sync {
    fn content_type(&self, extension: &str) -> Option<String>;
}

/// Lookup backed by `mime_guess`'s extension table.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuessMime;

impl MimeLookup for GuessMime {
    fn content_type(&self, extension: &str) -> Option<String> {
        mime_guess::from_ext(extension)
            .first()
            .map(|m| m.essence_str().to_string())
    }
}

/// Extension of the last path segment: the text after its last `.`.
pub fn extension(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.rfind('.')
        .map(|idx| &name[idx + 1..])
        .filter(|ext| !ext.is_empty())
}

/// Content type for `path`, falling back to [`DEFAULT_CONTENT_TYPE`].
pub fn content_type_for(lookup: &dyn MimeLookup, path: &str) -> String {
    extension(path)
        .and_then(|ext| lookup.content_type(&ext.to_ascii_lowercase()))
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
}
