//! Best-effort MIME detection for reported results.
//!
//! Advisory only: nothing in the match pipeline filters on it.
use std::fs::File;
use std::io::Read;
use std::path::Path;

const BINARY_CHECK_SIZE: usize = 8000;

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const TEXT_PLAIN: &str = "text/plain";

/// Extensions the magic-number sniffer cannot recognise (plain text formats).
const TEXT_TYPES: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("log", "text/plain"),
    ("md", "text/markdown"),
    ("rst", "text/x-rst"),
    ("py", "text/x-python"),
    ("rs", "text/x-rust"),
    ("js", "text/javascript"),
    ("ts", "text/x-typescript"),
    ("go", "text/x-go"),
    ("java", "text/x-java"),
    ("c", "text/x-c"),
    ("h", "text/x-c"),
    ("cpp", "text/x-c++"),
    ("sh", "text/x-shellscript"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("csv", "text/csv"),
    ("json", "application/json"),
    ("yaml", "application/yaml"),
    ("yml", "application/yaml"),
    ("toml", "application/toml"),
    ("xml", "application/xml"),
    ("svg", "image/svg+xml"),
    ("sql", "application/sql"),
    ("ini", "text/plain"),
    ("cfg", "text/plain"),
];

/// MIME type of `path`: magic bytes first, then the extension, then a NUL-byte heuristic.
pub fn content_type(path: &Path, extension: &str) -> String {
    if let Ok(Some(kind)) = infer::get_from_path(path) {
        return kind.mime_type().to_string();
    }

    if let Some((_, mime)) = TEXT_TYPES.iter().find(|(ext, _)| *ext == extension) {
        return mime.to_string();
    }

    if is_binary(path) {
        OCTET_STREAM.to_string()
    } else {
        TEXT_PLAIN.to_string()
    }
}

/// More than 30% NUL bytes in the first block counts as binary.
pub fn is_binary(path: &Path) -> bool {
    if let Ok(mut file) = File::open(path) {
        let mut buffer = vec![0u8; BINARY_CHECK_SIZE];
        if let Ok(n) = file.read(&mut buffer) {
            if n > 0 {
                let null_bytes = buffer[..n].iter().filter(|&&b| b == 0).count();
                return (null_bytes as f64 / n as f64) > 0.3;
            }
        }
    }
    false
}
