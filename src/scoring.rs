//! Shot-change scoring.
//!
//! Each sampled frame is reduced to a small grayscale [`FrameSignature`].
//! Two adjacent signatures are compared with a 64-bin luma histogram
//! distance and a mean absolute pixel difference; the average of the two
//! is the dissimilarity score, in `[0, 1]`.
//!
//! This is a cheap proxy for a cut, not exact scene detection: a histogram
//! alone misses cuts between shots of similar brightness, pixel difference
//! alone overreacts to camera motion.

use std::time::Duration;

use image::{DynamicImage, GrayImage, imageops::FilterType};

const HISTOGRAM_BINS: usize = 64;

/// Dissimilarity between two temporally adjacent sampled frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotScore {
    /// Timestamp of the later frame of the pair.
    pub timestamp: Duration,
    /// Frame number of the later frame of the pair.
    pub frame_number: u64,
    /// Dissimilarity in `[0, 1]`; higher means more change.
    pub score: f64,
}

/// Downscaled luma plane plus its histogram.
#[derive(Debug, Clone)]
pub struct FrameSignature {
    pixels: GrayImage,
    histogram: [u32; HISTOGRAM_BINS],
}

impl FrameSignature {
    /// Reduce `image` to a `width × height` grayscale signature.
    pub fn from_image(image: &DynamicImage, width: u32, height: u32) -> Self {
        let pixels = image
            .resize_exact(width.max(1), height.max(1), FilterType::Triangle)
            .to_luma8();
        let mut histogram = [0u32; HISTOGRAM_BINS];
        for pixel in pixels.as_raw() {
            histogram[(pixel >> 2) as usize] += 1;
        }
        Self { pixels, histogram }
    }

    /// Dissimilarity between two signatures, in `[0, 1]`.
    pub fn dissimilarity(&self, other: &FrameSignature) -> f64 {
        0.5 * self.histogram_distance(other) + 0.5 * self.pixel_distance(other)
    }

    /// `1 - intersection / max(mass)` over the luma histograms.
    fn histogram_distance(&self, other: &FrameSignature) -> f64 {
        let intersection: u64 = self
            .histogram
            .iter()
            .zip(other.histogram.iter())
            .map(|(a, b)| u64::from(*a.min(b)))
            .sum();
        let mass_self: u64 = self.histogram.iter().map(|&v| u64::from(v)).sum();
        let mass_other: u64 = other.histogram.iter().map(|&v| u64::from(v)).sum();
        let mass = mass_self.max(mass_other);
        if mass == 0 {
            return 0.0;
        }
        1.0 - intersection as f64 / mass as f64
    }

    /// Mean absolute luma difference, normalised to `[0, 1]`.
    fn pixel_distance(&self, other: &FrameSignature) -> f64 {
        let lhs = self.pixels.as_raw();
        let rhs = other.pixels.as_raw();
        let count = lhs.len().min(rhs.len());
        if count == 0 {
            return 0.0;
        }
        let total: u64 = lhs
            .iter()
            .zip(rhs.iter())
            .map(|(a, b)| u64::from(a.abs_diff(*b)))
            .sum();
        total as f64 / (count as f64 * 255.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use image::{Luma, Rgb, RgbImage};

    fn solid(value: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 18, Rgb([value, value, value])))
    }

    #[test]
    fn identical_frames_score_zero() {
        let a = FrameSignature::from_image(&solid(90), 16, 9);
        let b = FrameSignature::from_image(&solid(90), 16, 9);
        assert_eq!(a.dissimilarity(&b), 0.0);
    }

    #[test]
    fn black_to_white_scores_one() {
        let black = FrameSignature::from_image(&solid(0), 16, 9);
        let white = FrameSignature::from_image(&solid(255), 16, 9);
        assert!((black.dissimilarity(&white) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn score_is_symmetric() {
        let gradient = DynamicImage::ImageLuma8(GrayImage::from_fn(32, 18, |x, _| {
            Luma([(x * 8) as u8])
        }));
        let a = FrameSignature::from_image(&gradient, 16, 9);
        let b = FrameSignature::from_image(&solid(40), 16, 9);
        assert_eq!(a.dissimilarity(&b), b.dissimilarity(&a));
    }

    #[test]
    fn small_brightness_drift_stays_below_default_threshold() {
        let a = FrameSignature::from_image(&solid(100), 16, 9);
        let b = FrameSignature::from_image(&solid(102), 16, 9);
        assert!(a.dissimilarity(&b) < crate::config::DEFAULT_CHANGE_THRESHOLD);
    }
}
