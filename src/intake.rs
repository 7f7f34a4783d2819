use crate::{
    config::{MAX_IMAGES, MAX_IMAGE_BYTES},
    error::{Result, ShootError},
    models::{ImageInput, ImageMime, RawFile},
};

/// Outcome of validating one upload batch.
#[derive(Debug, Default)]
pub struct IntakeOutcome {
    pub accepted: Vec<ImageInput>,
    pub rejected: Vec<ShootError>,
    pub skipped: Vec<String>,
}

impl IntakeOutcome {
    /// The failure reported for the batch; the last rejection wins.
    pub fn failure(&self) -> Option<&ShootError> {
        self.rejected.last()
    }

    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Validates a batch against the images already accepted.
///
/// The whole batch is refused when it would exceed [`MAX_IMAGES`]. Otherwise
/// each file is judged on its own: non-image and non allow-listed types are
/// skipped, oversized files are rejected, everything else is encoded.
pub fn validate_batch(files: Vec<RawFile>, current_count: usize) -> Result<IntakeOutcome> {
    if current_count + files.len() > MAX_IMAGES {
        log::warn!(
            "Rejecting batch of {} images ({} already loaded, max {})",
            files.len(),
            current_count,
            MAX_IMAGES
        );
        return Err(ShootError::Capacity { max: MAX_IMAGES });
    }

    let mut outcome = IntakeOutcome::default();
    for file in files {
        if !file.mime_type.starts_with("image/") {
            log::debug!("Skipping non-image file {} ({})", file.name, file.mime_type);
            outcome.skipped.push(file.name);
            continue;
        }
        let Some(mime) = ImageMime::parse(&file.mime_type) else {
            log::debug!("Skipping unsupported image type {} ({})", file.name, file.mime_type);
            outcome.skipped.push(file.name);
            continue;
        };
        if file.len() > MAX_IMAGE_BYTES {
            log::warn!("File {} is {} bytes, over the upload limit", file.name, file.len());
            outcome.rejected.push(ShootError::FileTooLarge {
                name: file.name,
                limit_bytes: MAX_IMAGE_BYTES,
            });
            continue;
        }

        let input = ImageInput::new(file.name, mime, file.bytes);
        log::debug!("Accepted reference image {} ({})", input.id, input.mime_type);
        outcome.accepted.push(input);
    }

    Ok(outcome)
}

/// Removes the image with `id`; unknown ids are ignored.
pub fn remove_image(images: &mut Vec<ImageInput>, id: &str) -> Option<ImageInput> {
    let index = images.iter().position(|image| image.id == id)?;
    Some(images.remove(index))
}
