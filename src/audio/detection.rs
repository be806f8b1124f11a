use std::path::Path;

/// Check if a file has one of the recognized extensions (case-insensitive)
///
/// `extensions` must already be lower-case and without the leading dot.
pub fn has_recognized_extension(path: &Path, extensions: &[String]) -> bool {
    if let Some(ext) = path.extension() {
        let ext = ext.to_string_lossy().to_lowercase();
        extensions.iter().any(|e| *e == ext)
    } else {
        false
    }
}
