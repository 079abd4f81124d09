//! Content-Type lookup by file extension.

use std::path::Path;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Maps a file extension (without the dot, any case) to a content type.
pub fn content_type_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "md" => "text/markdown",

        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "bmp" => "image/bmp",

        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",

        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "webm" => "video/webm",

        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "wasm" => "application/wasm",

        _ => DEFAULT_CONTENT_TYPE,
    }
}

/// Content type for a path, `application/octet-stream` when the path has no
/// extension or an unknown one.
pub fn content_type_for(path: &Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(content_type_for_extension)
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}
