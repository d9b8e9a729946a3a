//! Perceptual image hashing for similarity detection.
//!
//! Every decoded image gets four independent 64-bit fingerprints:
//!
//! - **aHash**: mean-thresholded 8×8 thumbnail
//! - **dHash**: horizontal gradient signs
//! - **pHash**: DCT low frequencies thresholded at the median
//! - **wHash**: Haar wavelet low-pass band thresholded at the median
//!
//! Two images are compared by averaging the four Hamming distances and
//! turning that into a 0–100 similarity score. Resolution is recorded for
//! display but never weighs into the score.

use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use image_hasher::{HashAlg, HasherConfig};
use serde::Serialize;
use thiserror::Error;

/// Bit width of every fingerprint.
pub const HASH_BITS: u32 = 64;

/// Side of the square grid each fingerprint is computed on.
const HASH_SIDE: u32 = 8;

/// Working resolution for the wavelet hash: three Haar levels down to 8×8.
const WAVELET_SCALE: u32 = 64;

/// Errors that can occur during perceptual hashing.
#[derive(Debug, Error)]
pub enum PerceptualError {
    /// The file could not be opened.
    #[error("Failed to open image {0}: {1}")]
    Io(String, #[source] std::io::Error),

    /// Failed to decode the image.
    #[error("Failed to load image {0}: {1}")]
    LoadError(String, #[source] image::ImageError),
}

/// Four perceptual fingerprints plus the decoded dimensions of one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PerceptualHashRecord {
    /// Average (mean) hash
    pub ahash: u64,
    /// Difference (gradient) hash
    pub dhash: u64,
    /// Frequency-domain (DCT) hash
    pub phash: u64,
    /// Wavelet-domain (Haar) hash
    pub whash: u64,
    /// Decoded width in pixels
    pub width: u32,
    /// Decoded height in pixels
    pub height: u32,
}

impl PerceptualHashRecord {
    /// `"WxH"` string for display.
    #[must_use]
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    /// The pHash as 16 hex digits; used as the group's representative hash.
    #[must_use]
    pub fn preview(&self) -> String {
        format!("{:016x}", self.phash)
    }

    /// Per-type Hamming distances in (a, d, p, w) order.
    #[must_use]
    pub fn distances(&self, other: &Self) -> [u32; 4] {
        [
            (self.ahash ^ other.ahash).count_ones(),
            (self.dhash ^ other.dhash).count_ones(),
            (self.phash ^ other.phash).count_ones(),
            (self.whash ^ other.whash).count_ones(),
        ]
    }

    /// Similarity in percent: `(1 - avg_distance / 64) * 100`.
    #[must_use]
    pub fn similarity(&self, other: &Self) -> f64 {
        let distances = self.distances(other);
        let avg = f64::from(distances.iter().sum::<u32>()) / distances.len() as f64;
        (1.0 - avg / f64::from(HASH_BITS)) * 100.0
    }
}

/// Computes and compares perceptual fingerprints for images.
pub struct ImageAnalyzer {
    average: image_hasher::Hasher,
    difference: image_hasher::Hasher,
    frequency: image_hasher::Hasher,
}

impl Default for ImageAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageAnalyzer {
    /// Create an analyzer producing 64-bit hashes.
    #[must_use]
    pub fn new() -> Self {
        let base = || HasherConfig::new().hash_size(HASH_SIDE, HASH_SIDE);
        Self {
            average: base().hash_alg(HashAlg::Mean).to_hasher(),
            difference: base().hash_alg(HashAlg::Gradient).to_hasher(),
            frequency: base().hash_alg(HashAlg::Median).preproc_dct().to_hasher(),
        }
    }

    /// Decode the image at `path` and fingerprint it.
    ///
    /// The format is sniffed from the file's magic bytes, so a mislabelled
    /// extension still decodes.
    ///
    /// # Errors
    ///
    /// Returns [`PerceptualError`] if the file cannot be opened or decoded.
    pub fn analyze(&self, path: &Path) -> Result<PerceptualHashRecord, PerceptualError> {
        let display = || path.display().to_string();
        let img = image::ImageReader::open(path)
            .map_err(|e| PerceptualError::Io(display(), e))?
            .with_guessed_format()
            .map_err(|e| PerceptualError::Io(display(), e))?
            .decode()
            .map_err(|e| PerceptualError::LoadError(display(), e))?;

        Ok(self.fingerprint(&img))
    }

    /// Fingerprint an already decoded image.
    #[must_use]
    pub fn fingerprint(&self, img: &DynamicImage) -> PerceptualHashRecord {
        PerceptualHashRecord {
            ahash: pack_bits(self.average.hash_image(img).as_bytes()),
            dhash: pack_bits(self.difference.hash_image(img).as_bytes()),
            phash: pack_bits(self.frequency.hash_image(img).as_bytes()),
            whash: wavelet_hash(img),
            width: img.width(),
            height: img.height(),
        }
    }

    /// Whether two fingerprints are at least `threshold` percent similar.
    ///
    /// Symmetric in its first two arguments, and a lower threshold never
    /// rejects a pair a higher one accepted.
    #[must_use]
    pub fn compare(
        &self,
        a: &PerceptualHashRecord,
        b: &PerceptualHashRecord,
        threshold: u8,
    ) -> bool {
        a.similarity(b) >= f64::from(threshold)
    }
}

/// Fold up to eight hash bytes into a `u64`, first byte most significant.
fn pack_bits(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .take(8)
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

/// Haar wavelet hash.
///
/// The image is reduced to a 64×64 luma grid and the low-pass (LL) band is
/// taken three times, leaving 8×8 coefficients. The global mean is removed
/// first (the coarsest LL coefficient), then each coefficient becomes one bit
/// depending on whether it is above the median.
fn wavelet_hash(img: &DynamicImage) -> u64 {
    let gray: GrayImage = image::imageops::resize(
        &img.to_luma8(),
        WAVELET_SCALE,
        WAVELET_SCALE,
        FilterType::Lanczos3,
    );

    let mut side = WAVELET_SCALE as usize;
    let mut band: Vec<f64> = gray.pixels().map(|p| f64::from(p.0[0]) / 255.0).collect();

    let mean = band.iter().sum::<f64>() / band.len() as f64;
    for v in &mut band {
        *v -= mean;
    }

    while side > HASH_SIDE as usize {
        let half = side / 2;
        let mut next = vec![0.0; half * half];
        for y in 0..half {
            for x in 0..half {
                let i = 2 * y * side + 2 * x;
                next[y * half + x] =
                    (band[i] + band[i + 1] + band[i + side] + band[i + side + 1]) / 2.0;
            }
        }
        band = next;
        side = half;
    }

    let mut sorted = band.clone();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    let median = (sorted[mid - 1] + sorted[mid]) / 2.0;

    band.iter().fold(0u64, |acc, &v| (acc << 1) | u64::from(v > median))
}
