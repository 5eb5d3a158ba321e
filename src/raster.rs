use anyhow::{anyhow, Result};
use tiny_skia::Pixmap;

/// Straight RGBA color. The surface keeps every pixel fully opaque, so the
/// pixmap's premultiplied storage and straight RGBA coincide.
pub type Rgba = [u8; 4];

pub const fn rgb(r: u8, g: u8, b: u8) -> Rgba {
    [r, g, b, 255]
}

/// The raster target a phase renderer overwrites each frame.
///
/// Exclusively owned by the animation driver for the clip's lifetime; only the
/// capture sink ever reads it back.
pub struct Surface {
    pixmap: Pixmap,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let pixmap = Pixmap::new(width, height)
            .ok_or_else(|| anyhow!("failed to allocate {width}x{height} surface"))?;
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }

    /// Copies the frame out as straight RGBA for the encoder.
    pub fn to_rgba(&self) -> Vec<u8> {
        self.pixmap.data().to_vec()
    }

    pub fn fill(&mut self, color: Rgba) {
        for texel in self.pixmap.data_mut().chunks_exact_mut(4) {
            texel[0] = color[0];
            texel[1] = color[1];
            texel[2] = color[2];
            texel[3] = 255;
        }
    }

    /// Source-over blend of one pixel. Output stays opaque.
    pub fn blend_pixel(&mut self, x: i32, y: i32, src: Rgba) {
        if x < 0 || y < 0 || x >= self.width() as i32 || y >= self.height() as i32 {
            return;
        }
        let alpha = u16::from(src[3]);
        if alpha == 0 {
            return;
        }
        let width = self.width();
        let idx = ((y as u32 * width + x as u32) * 4) as usize;
        let data = self.pixmap.data_mut();
        let inv_alpha = 255_u16 - alpha;
        for channel in 0..3 {
            let dst = u16::from(data[idx + channel]);
            let src_c = u16::from(src[channel]);
            data[idx + channel] = ((src_c * alpha + dst * inv_alpha + 127) / 255) as u8;
        }
        data[idx + 3] = 255;
    }

    /// Fills a rectangle, blending when the color carries partial alpha.
    pub fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Rgba) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + width as i32).min(self.width() as i32);
        let y1 = (y + height as i32).min(self.height() as i32);
        if color[3] == 255 {
            let surface_width = self.width();
            let data = self.pixmap.data_mut();
            for py in y0..y1 {
                for px in x0..x1 {
                    let idx = ((py as u32 * surface_width + px as u32) * 4) as usize;
                    data[idx] = color[0];
                    data[idx + 1] = color[1];
                    data[idx + 2] = color[2];
                    data[idx + 3] = 255;
                }
            }
        } else {
            for py in y0..y1 {
                for px in x0..x1 {
                    self.blend_pixel(px, py, color);
                }
            }
        }
    }

    pub fn fill_circle(&mut self, cx: i32, cy: i32, radius: u32, color: Rgba) {
        let r = radius as i32;
        let r_sq = r * r;
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy <= r_sq {
                    self.blend_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Diagonal three-stop gradient across the whole surface, matching a
    /// canvas linear gradient from (0,0) to (width,height).
    pub fn diagonal_gradient(&mut self, stops: &[(f32, Rgba)]) {
        debug_assert!(stops.len() >= 2);
        let width = self.width();
        let height = self.height();
        let w = width as f32;
        let h = height as f32;
        let denom = w * w + h * h;
        let data = self.pixmap.data_mut();
        for y in 0..height {
            for x in 0..width {
                let t = (x as f32 * w + y as f32 * h) / denom;
                let color = sample_stops(stops, t);
                let idx = ((y * width + x) * 4) as usize;
                data[idx] = color[0];
                data[idx + 1] = color[1];
                data[idx + 2] = color[2];
                data[idx + 3] = 255;
            }
        }
    }
}

fn sample_stops(stops: &[(f32, Rgba)], t: f32) -> Rgba {
    let t = t.clamp(0.0, 1.0);
    let mut lower = stops[0];
    for &stop in stops {
        if stop.0 <= t {
            lower = stop;
        }
    }
    let mut upper = stops[stops.len() - 1];
    for &stop in stops.iter().rev() {
        if stop.0 >= t {
            upper = stop;
        }
    }
    if (upper.0 - lower.0).abs() < f32::EPSILON {
        return lower.1;
    }
    let local = (t - lower.0) / (upper.0 - lower.0);
    let mut out = [0_u8; 4];
    for channel in 0..4 {
        let a = f32::from(lower.1[channel]);
        let b = f32::from(upper.1[channel]);
        out[channel] = (a + (b - a) * local).round() as u8;
    }
    out
}

/// Placement of an image scaled to fully cover a target area, cropping the
/// overflow and centering along the longer axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverFit {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

pub fn cover_fit(
    image_width: u32,
    image_height: u32,
    area_x: i32,
    area_y: i32,
    area_width: u32,
    area_height: u32,
) -> CoverFit {
    let image_ratio = image_width as f64 / image_height as f64;
    let area_ratio = area_width as f64 / area_height as f64;

    if image_ratio > area_ratio {
        // Wider than the area: match height, center-crop horizontally.
        let draw_height = area_height;
        let draw_width = (area_height as f64 * image_ratio).round() as u32;
        CoverFit {
            x: area_x - ((draw_width - area_width) / 2) as i32,
            y: area_y,
            width: draw_width,
            height: draw_height,
        }
    } else {
        // Taller than the area: match width, center-crop vertically.
        let draw_width = area_width;
        let draw_height = (area_width as f64 / image_ratio).round() as u32;
        CoverFit {
            x: area_x,
            y: area_y - ((draw_height - area_height) / 2) as i32,
            width: draw_width,
            height: draw_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{cover_fit, rgb, Surface};

    fn pixel(surface: &Surface, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y * surface.width() + x) * 4) as usize;
        let data = surface.data();
        [data[idx], data[idx + 1], data[idx + 2], data[idx + 3]]
    }

    #[test]
    fn fill_sets_every_pixel_opaque() {
        let mut surface = Surface::new(4, 3).expect("surface");
        surface.fill(rgb(10, 20, 30));
        for y in 0..3 {
            for x in 0..4 {
                assert_eq!(pixel(&surface, x, y), [10, 20, 30, 255]);
            }
        }
    }

    #[test]
    fn blend_pixel_half_alpha_mixes_toward_source() {
        let mut surface = Surface::new(1, 1).expect("surface");
        surface.fill(rgb(0, 0, 0));
        surface.blend_pixel(0, 0, [255, 255, 255, 128]);
        let [r, g, b, a] = pixel(&surface, 0, 0);
        assert_eq!(a, 255);
        assert!(r >= 127 && r <= 129, "expected ~128, got {r}");
        assert_eq!(r, g);
        assert_eq!(g, b);
    }

    #[test]
    fn blend_pixel_ignores_out_of_bounds() {
        let mut surface = Surface::new(2, 2).expect("surface");
        surface.fill(rgb(1, 2, 3));
        surface.blend_pixel(-1, 0, [255, 255, 255, 255]);
        surface.blend_pixel(0, 5, [255, 255, 255, 255]);
        assert_eq!(pixel(&surface, 0, 0), [1, 2, 3, 255]);
    }

    #[test]
    fn fill_rect_clips_to_surface() {
        let mut surface = Surface::new(4, 4).expect("surface");
        surface.fill(rgb(0, 0, 0));
        surface.fill_rect(2, 2, 10, 10, rgb(255, 0, 0));
        assert_eq!(pixel(&surface, 1, 1), [0, 0, 0, 255]);
        assert_eq!(pixel(&surface, 3, 3), [255, 0, 0, 255]);
    }

    #[test]
    fn gradient_endpoints_hit_first_and_last_stop() {
        let mut surface = Surface::new(8, 8).expect("surface");
        let stops = [
            (0.0, rgb(45, 42, 53)),
            (0.6, rgb(26, 24, 32)),
            (1.0, rgb(15, 14, 18)),
        ];
        surface.diagonal_gradient(&stops);
        assert_eq!(pixel(&surface, 0, 0), [45, 42, 53, 255]);
        // The bottom-right pixel sits just short of t=1; it must be close to
        // the final stop and strictly darker than the first.
        let corner = pixel(&surface, 7, 7);
        assert!(corner[0] < 30, "corner {corner:?} should be near #0f0e12");
    }

    #[test]
    fn cover_fit_wide_image_matches_height() {
        // 2:1 image into a square area: height matches, width overflows.
        let fit = cover_fit(200, 100, 0, 130, 100, 100);
        assert_eq!(fit.height, 100);
        assert_eq!(fit.width, 200);
        assert_eq!(fit.y, 130);
        assert_eq!(fit.x, -50, "horizontal overflow must be centered");
    }

    #[test]
    fn cover_fit_tall_image_matches_width() {
        let fit = cover_fit(100, 200, 10, 0, 100, 100);
        assert_eq!(fit.width, 100);
        assert_eq!(fit.height, 200);
        assert_eq!(fit.x, 10);
        assert_eq!(fit.y, -50, "vertical overflow must be centered");
    }

    #[test]
    fn cover_fit_exact_ratio_fills_area() {
        let fit = cover_fit(400, 300, 0, 0, 40, 30);
        assert_eq!(
            fit,
            super::CoverFit {
                x: 0,
                y: 0,
                width: 40,
                height: 30
            }
        );
    }
}
