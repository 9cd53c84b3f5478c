//! Per-frame image normalization.
//!
//! Every screenshot is mapped to a `TARGET_SIZE`×`TARGET_SIZE` RGB raster by one
//! of three strategies:
//!
//! - **stretch**: resize straight to the target, ignoring aspect ratio.
//! - **crop**: cut the centered square of side `min(h, w)`, then resize.
//! - **pad**: letterbox to a square of side `max(h, w)` with black, then resize.
//!
//! All resizing uses area averaging: each output pixel is the coverage-weighted
//! mean of the source pixels under its footprint.

use std::fmt;

use image::RgbImage;

use crate::common::TARGET_SIZE;

// ============================================================================
// Resize mode
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ResizeMode {
    Stretch,
    Crop,
    #[default]
    Pad,
}

impl ResizeMode {
    /// Exact, case-sensitive match on the three known names.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "stretch" => Some(ResizeMode::Stretch),
            "crop" => Some(ResizeMode::Crop),
            "pad" => Some(ResizeMode::Pad),
            _ => None,
        }
    }

    /// Like [`ResizeMode::parse`], but any unrecognized name resolves to `Pad`.
    pub fn resolve(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResizeMode::Stretch => "stretch",
            ResizeMode::Crop => "crop",
            ResizeMode::Pad => "pad",
        }
    }
}

impl fmt::Display for ResizeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Normalizer seam
// ============================================================================

/// Maps one decoded frame to a `TARGET_SIZE` square.
///
/// The assembler only talks to this trait, so a recording or otherwise
/// substituted normalizer can stand in for [`AreaNormalizer`].
pub trait FrameNormalizer {
    fn normalize(&self, image: RgbImage, mode: ResizeMode) -> RgbImage;
}

/// The production normalizer: [`normalize_image`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AreaNormalizer;

impl FrameNormalizer for AreaNormalizer {
    fn normalize(&self, image: RgbImage, mode: ResizeMode) -> RgbImage {
        normalize_image(image, mode)
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// `None` in, `None` out; otherwise see [`normalize_image`].
pub fn normalize(image: Option<RgbImage>, mode: ResizeMode) -> Option<RgbImage> {
    image.map(|img| normalize_image(img, mode))
}

/// Normalize a frame to exactly `TARGET_SIZE`×`TARGET_SIZE`.
///
/// A zero-area input has nothing to average and comes back all black.
pub fn normalize_image(image: RgbImage, mode: ResizeMode) -> RgbImage {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return RgbImage::new(TARGET_SIZE, TARGET_SIZE);
    }

    let square = match mode {
        ResizeMode::Stretch => image,
        ResizeMode::Crop if w != h => center_crop(&image),
        ResizeMode::Pad if w != h => pad_to_square(&image),
        ResizeMode::Crop | ResizeMode::Pad => image,
    };

    if square.dimensions() == (TARGET_SIZE, TARGET_SIZE) {
        square
    } else {
        resize_area(&square, TARGET_SIZE, TARGET_SIZE)
    }
}

/// Square window of side `min(h, w)` starting at `dim / 2 - min / 2` on each axis.
///
/// With integer division the window sits half a pixel left of (or above) the
/// true center when the leftover margin is odd.
fn center_crop(image: &RgbImage) -> RgbImage {
    let (w, h) = image.dimensions();
    let side = w.min(h);
    let half = side / 2;
    let x = (w / 2).saturating_sub(half);
    let y = (h / 2).saturating_sub(half);
    image::imageops::crop_imm(image, x, y, side, side).to_image()
}

/// Letterbox to a `max(h, w)` square with black. An odd margin puts the extra
/// row (or column) at the bottom (or right).
fn pad_to_square(image: &RgbImage) -> RgbImage {
    let (w, h) = image.dimensions();
    let side = w.max(h) as usize;
    let top = (side - h as usize) / 2;
    let left = (side - w as usize) / 2;
    let row_len = w as usize * 3;

    let mut canvas = RgbImage::new(side as u32, side as u32);
    let dst: &mut [u8] = &mut canvas;
    for (y, src_row) in image.as_raw().chunks_exact(row_len).enumerate() {
        let offset = ((top + y) * side + left) * 3;
        dst[offset..offset + row_len].copy_from_slice(src_row);
    }
    canvas
}

// ============================================================================
// Area resampling
// ============================================================================

/// For each destination index along one axis: the first source index it
/// touches and the normalized coverage of that and following source pixels.
fn area_weights(src_len: u32, dst_len: u32) -> Vec<(usize, Vec<f32>)> {
    let src = src_len as f64;
    let dst = dst_len as f64;
    (0..dst_len)
        .map(|o| {
            let start = o as f64 * src / dst;
            let end = ((o + 1) as f64 * src / dst).min(src);
            let span = end - start;
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(src_len as usize);
            let weights = (first..last)
                .map(|i| {
                    let lo = start.max(i as f64);
                    let hi = end.min(i as f64 + 1.0);
                    ((hi - lo).max(0.0) / span) as f32
                })
                .collect();
            (first, weights)
        })
        .collect()
}

/// Resize with area averaging. Separable: a horizontal pass into an `f32`
/// buffer, then a vertical pass that rounds back to `u8`.
pub fn resize_area(image: &RgbImage, dst_w: u32, dst_h: u32) -> RgbImage {
    let (w, h) = image.dimensions();
    let mut out = RgbImage::new(dst_w, dst_h);
    if w == 0 || h == 0 || dst_w == 0 || dst_h == 0 {
        return out;
    }

    let x_weights = area_weights(w, dst_w);
    let y_weights = area_weights(h, dst_h);
    let (w, dst_w) = (w as usize, dst_w as usize);

    let mut rows = vec![0.0f32; h as usize * dst_w * 3];
    for (src_row, tmp_row) in image
        .as_raw()
        .chunks_exact(w * 3)
        .zip(rows.chunks_exact_mut(dst_w * 3))
    {
        for ((first, weights), px) in x_weights.iter().zip(tmp_row.chunks_exact_mut(3)) {
            for (k, &wt) in weights.iter().enumerate() {
                let s = (first + k) * 3;
                px[0] += src_row[s] as f32 * wt;
                px[1] += src_row[s + 1] as f32 * wt;
                px[2] += src_row[s + 2] as f32 * wt;
            }
        }
    }

    let dst: &mut [u8] = &mut out;
    for ((first, weights), out_row) in y_weights.iter().zip(dst.chunks_exact_mut(dst_w * 3)) {
        for (x, px) in out_row.chunks_exact_mut(3).enumerate() {
            let mut acc = [0.0f32; 3];
            for (k, &wt) in weights.iter().enumerate() {
                let s = ((first + k) * dst_w + x) * 3;
                acc[0] += rows[s] * wt;
                acc[1] += rows[s + 1] * wt;
                acc[2] += rows[s + 2] * wt;
            }
            for (dst_c, v) in px.iter_mut().zip(acc) {
                *dst_c = v.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

    fn assert_target_shape(img: &RgbImage) {
        assert_eq!(img.dimensions(), (TARGET_SIZE, TARGET_SIZE));
        assert_eq!(img.as_raw().len(), (TARGET_SIZE * TARGET_SIZE * 3) as usize);
    }

    #[test]
    fn test_output_is_always_target_size() {
        let sizes = [(1, 1), (50, 100), (100, 50), (256, 256), (640, 480), (7, 3), (1, 300)];
        for (w, h) in sizes {
            for mode in [ResizeMode::Stretch, ResizeMode::Crop, ResizeMode::Pad] {
                let out = normalize_image(RgbImage::new(w, h), mode);
                assert_eq!(
                    out.dimensions(),
                    (TARGET_SIZE, TARGET_SIZE),
                    "{w}x{h} in {mode} mode"
                );
            }
        }
    }

    #[test]
    fn test_normalize_none_is_none() {
        for mode in [ResizeMode::Stretch, ResizeMode::Crop, ResizeMode::Pad] {
            assert!(normalize(None, mode).is_none());
        }
        assert!(normalize(Some(RgbImage::new(10, 10)), ResizeMode::Pad).is_some());
    }

    #[test]
    fn test_zero_area_input_is_black() {
        let out = normalize_image(RgbImage::new(0, 0), ResizeMode::Crop);
        assert_target_shape(&out);
        assert!(out.pixels().all(|p| *p == BLACK));
    }

    #[test]
    fn test_resolve_unknown_mode_is_pad() {
        assert_eq!(ResizeMode::resolve("stretch"), ResizeMode::Stretch);
        assert_eq!(ResizeMode::resolve("crop"), ResizeMode::Crop);
        assert_eq!(ResizeMode::resolve("pad"), ResizeMode::Pad);
        assert_eq!(ResizeMode::resolve("unknown_mode"), ResizeMode::Pad);
        assert_eq!(ResizeMode::resolve("Crop"), ResizeMode::Pad);
        assert_eq!(ResizeMode::resolve(""), ResizeMode::Pad);
    }

    #[test]
    fn test_unknown_mode_matches_pad_output() {
        let mut img = RgbImage::from_pixel(100, 50, WHITE);
        img.put_pixel(10, 10, Rgb([200, 10, 30]));
        let fallback = normalize_image(img.clone(), ResizeMode::resolve("unknown_mode"));
        let padded = normalize_image(img, ResizeMode::Pad);
        assert_eq!(fallback, padded);
        assert_eq!(*fallback.get_pixel(0, 0), BLACK);
    }

    #[test]
    fn test_stretch_keeps_target_sized_input() {
        let mut img = RgbImage::new(TARGET_SIZE, TARGET_SIZE);
        img.put_pixel(3, 4, Rgb([1, 2, 3]));
        let out = normalize_image(img.clone(), ResizeMode::Stretch);
        assert_eq!(out, img);
    }

    #[test]
    fn test_stretch_area_averages_when_shrinking() {
        // 1px checkerboard: every 2x2 output footprint holds two black and two white.
        let img = RgbImage::from_fn(512, 512, |x, y| if (x + y) % 2 == 0 { WHITE } else { BLACK });
        let out = normalize_image(img, ResizeMode::Stretch);
        assert_target_shape(&out);
        for p in out.pixels() {
            assert!((127..=128).contains(&p.0[0]), "expected mid gray, got {:?}", p);
        }
    }

    #[test]
    fn test_uniform_color_survives_resize() {
        let color = Rgb([12, 200, 77]);
        for (w, h) in [(50, 50), (300, 170), (33, 257)] {
            let out = resize_area(&RgbImage::from_pixel(w, h, color), TARGET_SIZE, TARGET_SIZE);
            assert!(out.pixels().all(|p| *p == color), "{w}x{h}");
        }
    }

    #[test]
    fn test_crop_keeps_center_marker() {
        // 100 wide, 50 tall, white band over x in 25..=75.
        let img = RgbImage::from_fn(100, 50, |x, _| if (25..=75).contains(&x) { WHITE } else { BLACK });
        let out = normalize_image(img, ResizeMode::Crop);
        assert_target_shape(&out);
        assert_eq!(*out.get_pixel(128, 128), WHITE);
    }

    #[test]
    fn test_crop_window_arithmetic_on_odd_margin() {
        // 5 wide, 2 tall: start = 5/2 - 2/2 = 1, so columns 1 and 2 are kept.
        let img = RgbImage::from_fn(5, 2, |x, _| Rgb([(x * 50) as u8, 0, 0]));
        let cropped = center_crop(&img);
        assert_eq!(cropped.dimensions(), (2, 2));
        assert_eq!(cropped.get_pixel(0, 0).0[0], 50);
        assert_eq!(cropped.get_pixel(1, 0).0[0], 100);

        let out = normalize_image(img, ResizeMode::Crop);
        assert_eq!(out.get_pixel(0, 0).0[0], 50);
        assert_eq!(out.get_pixel(255, 255).0[0], 100);
    }

    #[test]
    fn test_crop_tall_image() {
        let img = RgbImage::from_fn(40, 120, |_, y| if (40..80).contains(&y) { WHITE } else { BLACK });
        let out = normalize_image(img, ResizeMode::Crop);
        assert!(out.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn test_pad_wide_image_has_black_top_and_bottom() {
        let img = RgbImage::from_pixel(100, 50, WHITE);
        let out = normalize_image(img, ResizeMode::Pad);
        assert_target_shape(&out);
        assert_eq!(*out.get_pixel(128, 0), BLACK);
        assert_eq!(*out.get_pixel(128, 255), BLACK);
        assert_eq!(*out.get_pixel(128, 128), WHITE);
        // Left and right edges are original content.
        assert_eq!(*out.get_pixel(0, 128), WHITE);
        assert_eq!(*out.get_pixel(255, 128), WHITE);
    }

    #[test]
    fn test_pad_tall_image_has_black_sides() {
        let img = RgbImage::from_pixel(50, 100, WHITE);
        let out = normalize_image(img, ResizeMode::Pad);
        assert_eq!(*out.get_pixel(0, 128), BLACK);
        assert_eq!(*out.get_pixel(255, 128), BLACK);
        assert_eq!(*out.get_pixel(128, 0), WHITE);
    }

    #[test]
    fn test_pad_odd_margin_goes_bottom() {
        // 6 wide, 3 tall: top = 1, bottom = 2.
        let img = RgbImage::from_pixel(6, 3, WHITE);
        let padded = pad_to_square(&img);
        assert_eq!(padded.dimensions(), (6, 6));
        let column: Vec<Rgb<u8>> = (0..6).map(|y| *padded.get_pixel(2, y)).collect();
        assert_eq!(column, vec![BLACK, WHITE, WHITE, WHITE, BLACK, BLACK]);
    }

    #[test]
    fn test_upscale_small_square() {
        let img = RgbImage::from_fn(2, 2, |x, _| if x == 0 { BLACK } else { WHITE });
        let out = normalize_image(img, ResizeMode::Pad);
        assert_eq!(*out.get_pixel(0, 0), BLACK);
        assert_eq!(*out.get_pixel(127, 200), BLACK);
        assert_eq!(*out.get_pixel(128, 200), WHITE);
        assert_eq!(*out.get_pixel(255, 0), WHITE);
    }

    #[test]
    fn test_area_weights_sum_to_one() {
        for (src, dst) in [(100, 256), (640, 256), (256, 256), (3, 256), (1000, 7)] {
            for (_, weights) in area_weights(src, dst) {
                let total: f32 = weights.iter().sum();
                assert!((total - 1.0).abs() < 1e-4, "{src}->{dst}: {total}");
            }
        }
    }

    #[test]
    fn test_area_normalizer_matches_free_function() {
        let img = RgbImage::from_fn(90, 30, |x, y| Rgb([x as u8, y as u8, 7]));
        let via_trait = AreaNormalizer.normalize(img.clone(), ResizeMode::Crop);
        assert_eq!(via_trait, normalize_image(img, ResizeMode::Crop));
    }
}
