use crate::error::{Error, Result};
use crate::geometry::Coordinate;

/// Rectangular grid of 8-bit opacity values, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    alpha: Vec<u8>,
}

impl Raster {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            alpha: vec![0; width as usize * height as usize],
        }
    }

    pub fn from_alpha(width: u32, height: u32, alpha: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if alpha.len() != expected {
            return Err(Error::RasterSize {
                expected,
                actual: alpha.len(),
            });
        }
        Ok(Self {
            width,
            height,
            alpha,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn alpha(&self) -> &[u8] {
        &self.alpha
    }

    fn index(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.width && y < self.height, "({x}, {y}) outside raster");
        y as usize * self.width as usize + x as usize
    }

    pub fn opacity(&self, x: u32, y: u32) -> u8 {
        self.alpha[self.index(x, y)]
    }

    pub fn set_opacity(&mut self, x: u32, y: u32, value: u8) {
        let idx = self.index(x, y);
        self.alpha[idx] = value;
    }

    pub fn is_blank(&self) -> bool {
        self.alpha.iter().all(|a| *a == 0)
    }

    pub fn clear(&mut self) {
        self.alpha.fill(0);
    }

    /// Opaque pixel coordinates in row-major order, keeping every `stride`-th.
    pub fn opaque_pixels(&self, stride: usize) -> Vec<(u32, u32)> {
        let width = self.width as usize;
        self.alpha
            .iter()
            .enumerate()
            .filter(|(_, a)| **a > 0)
            .map(|(idx, _)| ((idx % width) as u32, (idx / width) as u32))
            .step_by(stride.max(1))
            .collect()
    }

    /// Copy a `width × height` window starting at `(x, y)`. Parts of the
    /// window outside this raster come out transparent.
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Raster {
        let mut out = Raster::new(width, height);
        let x_end = (x + width).min(self.width);
        let y_end = (y + height).min(self.height);
        if x >= x_end {
            return out;
        }
        let run = (x_end - x) as usize;
        for sy in y..y_end {
            let src = self.index(x, sy);
            let dst = out.index(0, sy - y);
            out.alpha[dst..dst + run].copy_from_slice(&self.alpha[src..src + run]);
        }
        out
    }

    /// Source-over composite of `src` with its top-left at `(dx, dy)`,
    /// clipped to this raster.
    pub fn composite(&mut self, src: &Raster, dx: i32, dy: i32) {
        for sy in 0..src.height {
            let ty = dy + sy as i32;
            if ty < 0 || ty >= self.height as i32 {
                continue;
            }
            for sx in 0..src.width {
                let tx = dx + sx as i32;
                if tx < 0 || tx >= self.width as i32 {
                    continue;
                }
                let s = src.opacity(sx, sy);
                if s == 0 {
                    continue;
                }
                let idx = self.index(tx as u32, ty as u32);
                self.alpha[idx] = over(s, self.alpha[idx]);
            }
        }
    }

    /// Gaussian halo around the opaque pixels (sigma = radius / 2). The
    /// original pixels are kept at full strength underneath the halo.
    pub fn blurred(&self, radius: f32) -> Raster {
        if !radius.is_finite() || radius <= 0.0 || self.alpha.is_empty() {
            return self.clone();
        }
        let kernel = gaussian_kernel_q16(radius / 2.0);
        let mut tmp = vec![0u8; self.alpha.len()];
        let mut out = vec![0u8; self.alpha.len()];
        horizontal_blur_q16(&self.alpha, &mut tmp, self.width, self.height, &kernel);
        vertical_blur_q16(&tmp, &mut out, self.width, self.height, &kernel);
        for (dst, src) in out.iter_mut().zip(&self.alpha) {
            *dst = (*dst).max(*src);
        }
        Raster {
            width: self.width,
            height: self.height,
            alpha: out,
        }
    }
}

fn over(src: u8, dst: u8) -> u8 {
    let s = u16::from(src);
    let d = u16::from(dst);
    (s + (d * (255 - s) + 127) / 255) as u8
}

/// Number of pixels a blur of `radius` spreads beyond the glyph edge.
pub fn blur_margin(radius: f32) -> u32 {
    if !radius.is_finite() || radius <= 0.0 {
        return 0;
    }
    (1.5 * radius).ceil() as u32
}

fn gaussian_kernel_q16(sigma: f32) -> Vec<u32> {
    let r = (3.0 * sigma).ceil().max(1.0) as i32;
    let sigma = f64::from(sigma);
    let denom = 2.0 * sigma * sigma;
    let weights_f: Vec<f64> = (-r..=r)
        .map(|i| {
            let x = f64::from(i);
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = weights_f.iter().sum();

    let mut weights: Vec<u32> = weights_f
        .iter()
        .map(|w| ((w / sum) * 65536.0).round().clamp(0.0, 65536.0) as u32)
        .collect();
    let acc: i64 = weights.iter().map(|w| i64::from(*w)).sum();
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        weights[mid] = (i64::from(weights[mid]) + delta).clamp(0, 65536) as u32;
    }
    weights
}

// Samples outside the raster count as transparent so the halo fades out
// instead of smearing edge pixels.
fn horizontal_blur_q16(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    for y in 0..height as i32 {
        for x in 0..w {
            let mut acc = 0u64;
            for (ki, &kw) in k.iter().enumerate() {
                let sx = x + ki as i32 - radius;
                if sx < 0 || sx >= w {
                    continue;
                }
                acc += u64::from(kw) * u64::from(src[(y * w + sx) as usize]);
            }
            dst[(y * w + x) as usize] = q16_to_u8(acc);
        }
    }
}

fn vertical_blur_q16(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let h = height as i32;
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0u64;
            for (ki, &kw) in k.iter().enumerate() {
                let sy = y + ki as i32 - radius;
                if sy < 0 || sy >= h {
                    continue;
                }
                acc += u64::from(kw) * u64::from(src[(sy * w + x) as usize]);
            }
            dst[(y * w + x) as usize] = q16_to_u8(acc);
        }
    }
}

fn q16_to_u8(acc: u64) -> u8 {
    ((acc + 32768) >> 16).min(255) as u8
}

/// Tight rectangle around the opaque pixels of a raster.
///
/// `start` and `end` are inclusive corners, so `width`/`height` are the
/// distances between them and the cropped raster is one pixel larger in
/// each direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl BoundingBox {
    /// Scan every `stride`-th row and column. Returns `None` when nothing
    /// opaque was seen.
    pub fn measure(raster: &Raster, stride: u32) -> Option<BoundingBox> {
        let stride = stride.max(1) as usize;
        let mut found: Option<BoundingBox> = None;
        for y in (0..raster.height()).step_by(stride) {
            for x in (0..raster.width()).step_by(stride) {
                if raster.opacity(x, y) == 0 {
                    continue;
                }
                found = Some(match found {
                    None => BoundingBox {
                        min_x: x,
                        min_y: y,
                        max_x: x,
                        max_y: y,
                    },
                    Some(b) => BoundingBox {
                        min_x: b.min_x.min(x),
                        min_y: b.min_y.min(y),
                        max_x: b.max_x.max(x),
                        max_y: b.max_y.max(y),
                    },
                });
            }
        }
        found
    }

    pub fn start(&self) -> Coordinate {
        Coordinate::new(self.min_x as f32, self.min_y as f32)
    }

    pub fn end(&self) -> Coordinate {
        Coordinate::new(self.max_x as f32, self.max_y as f32)
    }

    pub fn width(&self) -> u32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y
    }

    pub fn crop_width(&self) -> u32 {
        self.width() + 1
    }

    pub fn crop_height(&self) -> u32 {
        self.height() + 1
    }

    /// Grow by `margin` on every side, clamped to a `width × height` extent.
    pub fn inflate(&self, margin: u32, width: u32, height: u32) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.saturating_sub(margin),
            min_y: self.min_y.saturating_sub(margin),
            max_x: (self.max_x + margin).min(width.saturating_sub(1)),
            max_y: (self.max_y + margin).min(height.saturating_sub(1)),
        }
    }

    pub fn crop(&self, raster: &Raster) -> Raster {
        raster.crop(self.min_x, self.min_y, self.crop_width(), self.crop_height())
    }
}
