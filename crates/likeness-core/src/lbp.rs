//! Image-side texture pipeline: grayscale, resize, histogram equalization,
//! then a rotation-invariant uniform local binary pattern.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};

use crate::texture::{LbpParams, TextureHistogram};

/// Per-pixel texture label map producer.
pub trait TextureDescriptor {
    /// One label in `[0, P + 1]` per pixel, row-major.
    fn label_map(&self, gray: &GrayImage, params: LbpParams) -> Vec<u32>;
}

/// Uniform LBP with bilinear neighbour sampling.
///
/// A pattern with at most two 0/1 transitions between consecutive samples is
/// "uniform" and labelled by its number of set bits; every other pattern
/// gets the catch-all label `P + 1`. Samples falling outside the image read 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformLbp;

impl TextureDescriptor for UniformLbp {
    fn label_map(&self, gray: &GrayImage, params: LbpParams) -> Vec<u32> {
        let (w, h) = gray.dimensions();
        let p = params.points as usize;
        if p == 0 {
            return vec![0; w as usize * h as usize];
        }

        // Offsets are rounded to 5 decimals so that axis-aligned samples land
        // exactly on pixel centres.
        let offsets: Vec<(f64, f64)> = (0..p)
            .map(|i| {
                let theta = 2.0 * std::f64::consts::PI * i as f64 / p as f64;
                let dr = round5(-params.radius * theta.sin());
                let dc = round5(params.radius * theta.cos());
                (dr, dc)
            })
            .collect();

        let mut labels = Vec::with_capacity(w as usize * h as usize);
        let mut bits = vec![false; p];

        for r in 0..h {
            for c in 0..w {
                let center = gray.get_pixel(c, r)[0] as f64;
                for (bit, &(dr, dc)) in bits.iter_mut().zip(offsets.iter()) {
                    let sample = bilinear(gray, r as f64 + dr, c as f64 + dc);
                    *bit = sample - center >= 0.0;
                }

                let transitions = bits.windows(2).filter(|pair| pair[0] != pair[1]).count();
                let label = if transitions <= 2 {
                    bits.iter().filter(|&&b| b).count() as u32
                } else {
                    params.points + 1
                };
                labels.push(label);
            }
        }

        labels
    }
}

fn round5(v: f64) -> f64 {
    (v * 1e5).round() / 1e5
}

/// Bilinear sample at fractional (row, col); out-of-bounds pixels read 0.
fn bilinear(gray: &GrayImage, r: f64, c: f64) -> f64 {
    let (w, h) = gray.dimensions();
    let pixel = |row: f64, col: f64| -> f64 {
        if row < 0.0 || col < 0.0 || row >= h as f64 || col >= w as f64 {
            0.0
        } else {
            gray.get_pixel(col as u32, row as u32)[0] as f64
        }
    };

    let (minr, maxr) = (r.floor(), r.ceil());
    let (minc, maxc) = (c.floor(), c.ceil());
    let dr = r - minr;
    let dc = c - minc;

    // Interpolate as `a + t * (b - a)` so flat regions stay exact.
    let lerp = |a: f64, b: f64, t: f64| a + t * (b - a);
    let top = lerp(pixel(minr, minc), pixel(minr, maxc), dc);
    let bottom = lerp(pixel(maxr, minc), pixel(maxr, maxc), dc);
    lerp(top, bottom, dr)
}

/// Global histogram equalization in-place.
///
/// Maps each intensity through the image CDF rescaled to 0–255. A constant
/// image is left untouched.
pub fn equalize_histogram(gray: &mut GrayImage) {
    let mut hist = [0u32; 256];
    for px in gray.pixels() {
        hist[px[0] as usize] += 1;
    }

    let total: u32 = hist.iter().sum();
    let mut cdf = [0u32; 256];
    let mut running = 0u32;
    for (slot, count) in cdf.iter_mut().zip(hist.iter()) {
        running += count;
        *slot = running;
    }

    let cdf_min = cdf.iter().copied().find(|&v| v > 0).unwrap_or(0);
    let denom = total.saturating_sub(cdf_min);
    if denom == 0 {
        return;
    }

    let mut lut = [0u8; 256];
    for (i, v) in lut.iter_mut().enumerate() {
        let scaled = (cdf[i].saturating_sub(cdf_min)) as f64 * 255.0 / denom as f64;
        *v = scaled.round().clamp(0.0, 255.0) as u8;
    }

    for px in gray.pixels_mut() {
        px[0] = lut[px[0] as usize];
    }
}

/// Full texture path from a decoded image to a normalized histogram.
///
/// The image is reduced to a `size`×`size` equalized grayscale crop before
/// the descriptor runs, so histograms from different resolutions compare.
pub fn texture_histogram<D: TextureDescriptor + ?Sized>(
    image: &DynamicImage,
    params: LbpParams,
    size: u32,
    descriptor: &D,
) -> TextureHistogram {
    let gray = image.to_luma8();
    let mut resized = image::imageops::resize(&gray, size, size, FilterType::Triangle);
    equalize_histogram(&mut resized);

    let labels = descriptor.label_map(&resized, params);
    tracing::trace!(pixels = labels.len(), bins = params.bins(), "texture labels computed");
    TextureHistogram::from_labels(&labels, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn checkerboard(size: u32) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            if (x + y) % 2 == 0 { Luma([200]) } else { Luma([20]) }
        })
    }

    #[test]
    fn test_flat_image_interior_is_all_ones() {
        let gray = GrayImage::from_pixel(16, 16, Luma([100]));
        let params = LbpParams { points: 8, radius: 1.0 };
        let labels = UniformLbp.label_map(&gray, params);
        assert_eq!(labels.len(), 256);
        // Interior pixels see neighbours equal to the centre: every bit set.
        let interior = labels[5 * 16 + 5];
        assert_eq!(interior, 8);
        assert!(labels.iter().all(|&l| l <= params.points + 1));
    }

    #[test]
    fn test_single_bright_pixel_is_uniform_zero() {
        let mut gray = GrayImage::from_pixel(9, 9, Luma([10]));
        gray.put_pixel(4, 4, Luma([250]));
        let labels = UniformLbp.label_map(&gray, LbpParams { points: 8, radius: 1.0 });
        assert_eq!(labels[4 * 9 + 4], 0);
    }

    #[test]
    fn test_horizontal_pair_is_non_uniform() {
        let mut gray = GrayImage::from_pixel(9, 9, Luma([10]));
        gray.put_pixel(4, 4, Luma([100]));
        gray.put_pixel(3, 4, Luma([250]));
        gray.put_pixel(5, 4, Luma([250]));
        let params = LbpParams { points: 8, radius: 1.0 };
        let labels = UniformLbp.label_map(&gray, params);
        // Only the left and right samples are set: three transitions.
        assert_eq!(labels[4 * 9 + 4], params.points + 1);
    }

    #[test]
    fn test_equalize_stretches_range() {
        let mut gray = GrayImage::from_fn(4, 4, |x, _| Luma([100 + x as u8]));
        equalize_histogram(&mut gray);
        let min = gray.pixels().map(|p| p[0]).min().unwrap();
        let max = gray.pixels().map(|p| p[0]).max().unwrap();
        assert_eq!(min, 0);
        assert_eq!(max, 255);
    }

    #[test]
    fn test_equalize_constant_image_unchanged() {
        let mut gray = GrayImage::from_pixel(4, 4, Luma([77]));
        equalize_histogram(&mut gray);
        assert!(gray.pixels().all(|p| p[0] == 77));
    }

    #[test]
    fn test_texture_histogram_shape() {
        let image = DynamicImage::ImageLuma8(checkerboard(40));
        let params = LbpParams::default();
        let h = texture_histogram(&image, params, 32, &UniformLbp);
        assert_eq!(h.len(), 26);
        assert!(h.is_normalized(1e-5));
    }
}
