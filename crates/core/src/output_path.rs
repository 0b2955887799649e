//! Output path normalization for download links.
//!
//! Render workers report where they wrote the file, which may be a Windows
//! drive path (`C:\renders\x.mp4`), a server-local path
//! (`/srv/renders/x.mp4`) or an already public path (`/output/x.mp4`).
//! Only the public form can be linked.

/// Public root every finished render is served under.
pub const DEFAULT_DOWNLOAD_ROOT: &str = "/output/";

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Whether `path` starts with a drive-letter prefix such as `C:`.
fn has_drive_prefix(path: &str) -> bool {
    let mut chars = path.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic()
    )
}

/// Last path segment, splitting on both `/` and `\`.
fn file_name(path: &str) -> &str {
    path.rsplit(is_separator).next().unwrap_or(path)
}

/// Map a stored output path onto the public download root.
///
/// - Drive-letter paths keep only their final segment.
/// - Other paths not already under `download_root` lose everything up to
///   and including the last separator.
/// - Paths already under `download_root` are returned unchanged.
///
/// The result always starts with `download_root`, so normalizing twice is
/// the same as normalizing once.
pub fn normalize_output_path(path: &str, download_root: &str) -> String {
    if has_drive_prefix(path) || !path.starts_with(download_root) {
        format!("{download_root}{}", file_name(path))
    } else {
        path.to_string()
    }
}
