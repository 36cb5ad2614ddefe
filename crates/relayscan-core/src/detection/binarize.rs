//! Adaptive binarization and integral-image helpers shared by the detection strategies.

use image::{GrayImage, Luma};

/// Foreground (ink) value in binary images.
pub const INK: u8 = 255;

/// Summed-area table with a one-pixel zero border.
///
/// `sum(x0, y0, x1, y1)` covers the half-open rectangle `[x0, x1) × [y0, y1)`.
pub struct IntegralImage {
    width: u32,
    height: u32,
    table: Vec<u64>,
}

impl IntegralImage {
    /// Integral of raw intensities.
    pub fn of_intensity(image: &GrayImage) -> Self {
        Self::build(image, |v| v as u64)
    }

    /// Integral of the ink indicator (1 for foreground, 0 otherwise).
    pub fn of_ink(binary: &GrayImage) -> Self {
        Self::build(binary, |v| u64::from(v > 0))
    }

    fn build(image: &GrayImage, f: impl Fn(u8) -> u64) -> Self {
        let (w, h) = image.dimensions();
        let iw = w as usize + 1;
        let mut table = vec![0u64; iw * (h as usize + 1)];
        for y in 0..h as usize {
            let mut row_sum = 0u64;
            for x in 0..w as usize {
                row_sum += f(image.get_pixel(x as u32, y as u32)[0]);
                table[(y + 1) * iw + (x + 1)] = row_sum + table[y * iw + (x + 1)];
            }
        }
        IntegralImage {
            width: w,
            height: h,
            table,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sum over `[x0, x1) × [y0, y1)`, clamped to the image.
    pub fn sum(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> u64 {
        let x1 = x1.min(self.width) as usize;
        let y1 = y1.min(self.height) as usize;
        let x0 = (x0 as usize).min(x1);
        let y0 = (y0 as usize).min(y1);
        let iw = self.width as usize + 1;
        self.table[y1 * iw + x1] + self.table[y0 * iw + x0]
            - self.table[y0 * iw + x1]
            - self.table[y1 * iw + x0]
    }
}

/// Adaptive mean threshold, inverted so ink becomes [`INK`].
///
/// For every pixel the mean over a `block_size × block_size` window
/// (clamped at the borders) is computed; the pixel is foreground when its
/// intensity is at or below `mean - c`.
pub fn binarize(gray: &GrayImage, block_size: u32, c: f32) -> GrayImage {
    let (w, h) = gray.dimensions();
    let mut out = GrayImage::new(w, h);
    if w == 0 || h == 0 {
        return out;
    }

    let integral = IntegralImage::of_intensity(gray);
    let half = block_size / 2;

    for y in 0..h {
        let y0 = y.saturating_sub(half);
        let y1 = (y + half + 1).min(h);
        for x in 0..w {
            let x0 = x.saturating_sub(half);
            let x1 = (x + half + 1).min(w);
            let area = ((x1 - x0) * (y1 - y0)) as f32;
            let mean = integral.sum(x0, y0, x1, y1) as f32 / area;
            let value = gray.get_pixel(x, y)[0] as f32;
            if value <= mean - c {
                out.put_pixel(x, y, Luma([INK]));
            }
        }
    }

    out
}

/// Fraction of ink inside `[x0, x1) × [y0, y1)`; `None` for an empty region.
pub fn ink_fraction(ink: &IntegralImage, x0: u32, y0: u32, x1: u32, y1: u32) -> Option<f32> {
    let x1 = x1.min(ink.width());
    let y1 = y1.min(ink.height());
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    let area = u64::from(x1 - x0) * u64::from(y1 - y0);
    let fraction = ink.sum(x0, y0, x1, y1) as f32 / area as f32;
    Some(fraction.clamp(0.0, 1.0))
}
