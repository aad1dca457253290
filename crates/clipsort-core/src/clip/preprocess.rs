//! Image preprocessing for CLIP ViT-B/32.
//!
//! CLIP expects:
//! - Input size: 224×224 pixels, center-cropped to a square first
//! - Resampling: bilinear, sampling ratio `source / destination`
//! - Normalization: `(pixel - mean) / std` with the CLIP per-channel constants
//! - Tensor layout: NCHW [1, 3, 224, 224]
//!
//! Intermediate rasters keep alpha-premultiplied 16-bit samples; cropping
//! and resizing round-trip through 8-bit storage. The result therefore
//! matches the reference numeric pipeline sample for sample.

use image::{DynamicImage, Rgba, RgbaImage};
use ndarray::Array4;

/// Side of the square model input.
pub const IMAGE_SIZE: u32 = 224;

/// Number of color channels (RGB).
pub const CHANNELS: usize = 3;

/// Length of the flattened pixel tensor.
pub const PIXEL_TENSOR_LEN: usize = CHANNELS * (IMAGE_SIZE as usize) * (IMAGE_SIZE as usize);

/// CLIP normalization mean (per-channel).
pub const CLIP_MEAN: [f32; CHANNELS] = [0.48145466, 0.4578275, 0.40821073];

/// CLIP normalization std (per-channel).
pub const CLIP_STD: [f32; CHANNELS] = [0.26862954, 0.26130258, 0.27577711];

const MAX_SAMPLE: u32 = 0xFFFF;

/// An RGBA raster with alpha-premultiplied 16-bit samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    samples: Vec<u16>,
}

impl Raster {
    /// Convert a decoded image, premultiplying color by alpha.
    pub fn from_image(image: &DynamicImage) -> Self {
        let rgba = image.to_rgba16();
        let (width, height) = rgba.dimensions();
        let mut samples = rgba.into_raw();
        for px in samples.chunks_exact_mut(4) {
            let alpha = u32::from(px[3]);
            for c in &mut px[..3] {
                *c = (u32::from(*c) * alpha / MAX_SAMPLE) as u16;
            }
        }
        Self {
            width,
            height,
            samples,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw samples, four per pixel in row-major order.
    pub fn samples(&self) -> &[u16] {
        &self.samples
    }

    fn pixel(&self, x: usize, y: usize) -> &[u16] {
        let offset = (y * self.width as usize + x) * 4;
        &self.samples[offset..offset + 4]
    }
}

/// Crop the longer side symmetrically so the raster becomes square.
///
/// The offset is `(long - short) / 2` rounded down. A square raster is
/// returned as-is; a cropped one is stored at 8-bit precision.
pub fn center_crop(raster: Raster) -> Raster {
    let (w, h) = (raster.width, raster.height);
    if w == h {
        return raster;
    }

    let side = w.min(h);
    let (x_off, y_off) = if w > h {
        ((w - h) / 2, 0)
    } else {
        (0, (h - w) / 2)
    };

    let mut samples = Vec::with_capacity(side as usize * side as usize * 4);
    for y in 0..side as usize {
        for x in 0..side as usize {
            let px = raster.pixel(x + x_off as usize, y + y_off as usize);
            samples.extend(px.iter().map(|&s| widen(narrow(s))));
        }
    }

    Raster {
        width: side,
        height: side,
        samples,
    }
}

/// Bilinear resize to `width × height` 8-bit RGBA.
///
/// Destination pixel `(x, y)` samples the source at `(x · sw/width,
/// y · sh/height)`; the second tap is clamped to the last row/column, so
/// edges are replicated. Alpha is interpolated like color.
pub fn resize_bilinear(raster: &Raster, width: u32, height: u32) -> RgbaImage {
    let (src_w, src_h) = (raster.width as usize, raster.height as usize);
    let x_ratio = src_w as f64 / f64::from(width);
    let y_ratio = src_h as f64 / f64::from(height);

    RgbaImage::from_fn(width, height, |x, y| {
        let src_x = f64::from(x) * x_ratio;
        let src_y = f64::from(y) * y_ratio;

        let x0 = src_x.floor() as usize;
        let y0 = src_y.floor() as usize;
        let x1 = (x0 + 1).min(src_w - 1);
        let y1 = (y0 + 1).min(src_h - 1);

        let x_frac = src_x - x0 as f64;
        let y_frac = src_y - y0 as f64;

        let p00 = raster.pixel(x0, y0);
        let p10 = raster.pixel(x1, y0);
        let p01 = raster.pixel(x0, y1);
        let p11 = raster.pixel(x1, y1);

        let mut out = [0u8; 4];
        for (c, slot) in out.iter_mut().enumerate() {
            let value = bilinear(
                f64::from(p00[c]),
                f64::from(p10[c]),
                f64::from(p01[c]),
                f64::from(p11[c]),
                x_frac,
                y_frac,
            );
            *slot = narrow(value as u16);
        }
        Rgba(out)
    })
}

fn bilinear(c00: f64, c10: f64, c01: f64, c11: f64, x_frac: f64, y_frac: f64) -> f64 {
    c00 * (1.0 - x_frac) * (1.0 - y_frac)
        + c10 * x_frac * (1.0 - y_frac)
        + c01 * (1.0 - x_frac) * y_frac
        + c11 * x_frac * y_frac
}

fn narrow(sample: u16) -> u8 {
    (sample >> 8) as u8
}

fn widen(sample: u8) -> u16 {
    u16::from(sample) * 0x101
}

/// Normalize an RGBA image into a `[1, 3, H, W]` tensor, dropping alpha.
pub fn to_tensor(image: &RgbaImage) -> Array4<f32> {
    let (w, h) = image.dimensions();
    let mut tensor = Array4::<f32>::zeros((1, CHANNELS, h as usize, w as usize));
    for ((_, c, y, x), value) in tensor.indexed_iter_mut() {
        let sample = image.get_pixel(x as u32, y as u32)[c];
        let unit = f32::from(widen(sample)) / MAX_SAMPLE as f32;
        *value = (unit - CLIP_MEAN[c]) / CLIP_STD[c];
    }
    tensor
}

/// Preprocess a decoded image for CLIP inference.
///
/// Always yields a `[1, 3, 224, 224]` tensor regardless of aspect ratio.
pub fn preprocess(image: &DynamicImage) -> Array4<f32> {
    let square = center_crop(Raster::from_image(image));
    let resized = resize_bilinear(&square, IMAGE_SIZE, IMAGE_SIZE);
    to_tensor(&resized)
}
