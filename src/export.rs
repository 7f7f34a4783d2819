use crate::{
    config::EXPORT_PREFIX,
    error::Result,
    models::{GenerationResult, ImageMime},
};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// `proshoot-ai-<unix millis>.<ext>`; the extension follows the result's
/// MIME type and falls back to `png`.
pub fn export_file_name(result: &GenerationResult, now: DateTime<Utc>) -> String {
    let extension = ImageMime::parse(&result.mime_type)
        .map(|mime| mime.extension())
        .unwrap_or("png");
    format!("{}{}.{}", EXPORT_PREFIX, now.timestamp_millis(), extension)
}

/// Decodes `result` and writes it into `dir`, returning the written path.
pub fn save_result(result: &GenerationResult, dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let bytes = result.decode()?;
    let mut now = Utc::now();
    let mut path = dir.join(export_file_name(result, now));
    // Several results can be saved within the same millisecond.
    while path.exists() {
        now += chrono::Duration::milliseconds(1);
        path = dir.join(export_file_name(result, now));
    }

    std::fs::write(&path, &bytes)?;
    log::info!("💾 Saved {} bytes to {}", bytes.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_file_name() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let png = GenerationResult::new("image/png", "AAAA");
        assert_eq!(export_file_name(&png, now), "proshoot-ai-1700000000123.png");

        let jpeg = GenerationResult::new("image/jpeg", "AAAA");
        assert_eq!(export_file_name(&jpeg, now), "proshoot-ai-1700000000123.jpg");

        let odd = GenerationResult::new("image/heic", "AAAA");
        assert!(export_file_name(&odd, now).ends_with(".png"));
    }

    #[test]
    fn test_save_result() {
        let dir = tempfile::tempdir().unwrap();
        let result = GenerationResult::new("image/png", "aGVsbG8=");

        let first = save_result(&result, dir.path()).unwrap();
        let second = save_result(&result, dir.path()).unwrap();

        assert_ne!(first, second);
        assert_eq!(std::fs::read(&first).unwrap(), b"hello");
        assert!(first
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("proshoot-ai-"));
    }

    #[test]
    fn test_save_rejects_bad_payload() {
        let dir = tempfile::tempdir().unwrap();
        let broken = GenerationResult {
            data_url: "data:image/png;base64,@@@".into(),
            mime_type: "image/png".into(),
            created_at: Utc::now(),
        };
        assert!(save_result(&broken, dir.path()).is_err());
    }
}
