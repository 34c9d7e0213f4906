use crate::domain::models::ImageBlob;
use anyhow::Context;
use std::path::Path;

fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        _ => "application/octet-stream",
    }
}

/// Reads a user-selected photograph. Contents are not decoded; the service does that.
pub fn load_image(path: &Path) -> anyhow::Result<ImageBlob> {
    let mime = guess_mime(path);
    if !mime.starts_with("image/") {
        anyhow::bail!("not an image file: {}", path.display());
    }
    let bytes =
        std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    if bytes.is_empty() {
        anyhow::bail!("image file is empty: {}", path.display());
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string());
    Ok(ImageBlob::new(file_name, mime, bytes))
}
