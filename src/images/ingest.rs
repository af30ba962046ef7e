/// Image ingestion pipeline
///
/// Turns raw user-selected files into embeddable JPEG payloads:
/// decode once, downscale so neither side exceeds the bound, re-encode.
/// Each file is processed on its own blocking task; a bad file only
/// fails itself.
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage, GenericImageView};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use crate::error::ImageDecodeError;
use crate::state::data::ImagePayload;

/// Longest side allowed after downscaling
const DEFAULT_MAX_DIMENSION: u32 = 800;
/// JPEG quality (0.7 on a 0..1 scale)
const DEFAULT_JPEG_QUALITY: u8 = 70;

/// Result for one input file, in the same position as the input
pub type IngestOutcome = Result<ImagePayload, ImageDecodeError>;

/// One user-selected file
#[derive(Debug, Clone)]
pub struct RawImage {
    /// File name, used in logs and error notices
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub max_dimension: u32,
    pub jpeg_quality: u8,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl IngestSettings {
    /// Bring hand-edited values back into the range the encoder accepts
    pub fn clamped(self) -> Self {
        Self {
            max_dimension: self.max_dimension.max(1),
            jpeg_quality: self.jpeg_quality.clamp(1, 100),
        }
    }
}

/// Compute output dimensions preserving aspect ratio.
///
/// Scales down only. Wide images are constrained by width, everything
/// else (tall and square) by height.
pub fn target_dimensions(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width > height {
        if width > max {
            let scaled = (height as f64 * (max as f64 / width as f64)).round() as u32;
            return (max, scaled.max(1));
        }
    } else if height > max {
        let scaled = (width as f64 * (max as f64 / height as f64)).round() as u32;
        return (scaled.max(1), max);
    }
    (width, height)
}

/// Process a single file into a payload
pub fn ingest_one(input: &RawImage, settings: &IngestSettings) -> IngestOutcome {
    let settings = settings.clamped();
    if input.bytes.is_empty() {
        return Err(ImageDecodeError::Empty(input.name.clone()));
    }

    // Step 1: Decode (format guessed from the content, not the file name)
    let img = image::load_from_memory(&input.bytes).map_err(|e| ImageDecodeError::Decode {
        name: input.name.clone(),
        reason: e.to_string(),
    })?;

    // Step 2: Downscale
    let (width, height) = img.dimensions();
    let (target_w, target_h) = target_dimensions(width, height, settings.max_dimension);
    let resized = if (target_w, target_h) == (width, height) {
        img
    } else {
        img.resize_exact(target_w, target_h, FilterType::Lanczos3)
    };

    // Step 3: Re-encode (JPEG has no alpha channel)
    let jpeg = encode_jpeg(&resized, settings.jpeg_quality).map_err(|reason| {
        ImageDecodeError::Encode {
            name: input.name.clone(),
            reason,
        }
    })?;

    debug!(
        "{}: {}x{} -> {}x{}, {}KB",
        input.name,
        width,
        height,
        target_w,
        target_h,
        jpeg.len() / 1024
    );

    Ok(ImagePayload::from_jpeg(&jpeg))
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, String> {
    let rgb = img.to_rgb8();
    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    encoder.encode_image(&rgb).map_err(|e| e.to_string())?;
    Ok(buffer)
}

/// Ingest a batch of files.
///
/// All items start at once on the blocking pool and are awaited in input
/// order, so `outcomes[i]` always belongs to `inputs[i]`.
pub async fn ingest_batch(inputs: Vec<RawImage>, settings: IngestSettings) -> Vec<IngestOutcome> {
    let total = inputs.len();
    let handles: Vec<_> = inputs
        .into_iter()
        .map(|input| {
            let name = input.name.clone();
            let handle = tokio::task::spawn_blocking(move || ingest_one(&input, &settings));
            (name, handle)
        })
        .collect();

    let mut outcomes = Vec::with_capacity(total);
    for (name, handle) in handles {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Ingestion task for {} failed: {}", name, e);
                Err(ImageDecodeError::Task(name))
            }
        };

        if let Err(e) = &outcome {
            warn!("Skipping image: {}", e);
        }
        outcomes.push(outcome);
    }

    let succeeded = outcomes.iter().filter(|o| o.is_ok()).count();
    info!("Ingested {}/{} images", succeeded, total);

    outcomes
}

/// Read user-picked files from disk.
///
/// An unreadable file becomes an empty input so it fails on its own
/// during ingestion instead of dropping out of the batch.
pub async fn load_files(paths: Vec<PathBuf>) -> Vec<RawImage> {
    let mut images = Vec::with_capacity(paths.len());

    for path in paths {
        let name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                Vec::new()
            }
        };

        images.push(RawImage { name, bytes });
    }

    images
}
