use crate::glyphs::{PixelFont, GLYPH_SIZE};
use crate::raster::{rgb, Surface};

/// Glyph cell edge in pixels.
pub const CELL_SIZE: u32 = 32;
/// The whole grid advances one alphabet position every this many frames.
pub const CYCLE_FRAMES: u32 = 10;
/// Pulse phase advance per frame.
pub const PULSE_RATE: f32 = 0.05;

const ALPHABET: [char; 15] = [
    'S', '$', 'E', '@', 'I', '1', '{', 'S', '}', 'M', '#', 'I', '!', 'C', '[',
];

const GLYPH_COLOR: [u8; 4] = rgb(0xa8, 0x6b, 0x94);

/// Character shown at (row, col) on a grid `columns` wide at `frame`.
/// Pure: the whole grid cycles through the alphabet in lockstep, no
/// per-cell randomness.
pub fn cell_char(row: u32, col: u32, columns: u32, frame: u32) -> char {
    let index = (row * columns + col + frame / CYCLE_FRAMES) % ALPHABET.len() as u32;
    ALPHABET[index as usize]
}

/// Pulsing opacity for `frame`. Deliberately asymmetric around the sine's
/// zero crossing: squared above, linear below. Kept as shipped; see DESIGN.md.
pub fn pulse_opacity(frame: u32) -> f32 {
    let s = (frame as f32 * PULSE_RATE).sin();
    if s > 0.0 {
        0.7 + s * s * 0.15
    } else {
        0.7 + s * 0.15
    }
}

/// Glow blur radius for `frame`, scaled from the pulse.
pub fn glow_radius(frame: u32) -> u32 {
    (pulse_opacity(frame) * 30.0).round() as u32
}

/// Draws the cipher grid over the rectangle at (x, y). A blurred white halo
/// goes down first, then the crisp glyphs on top.
pub fn render(surface: &mut Surface, font: &PixelFont, x: u32, y: u32, width: u32, height: u32, frame: u32) {
    let columns = width / CELL_SIZE;
    let rows = height / CELL_SIZE;
    if columns == 0 || rows == 0 {
        return;
    }

    let mask = rasterize_grid(font, columns, rows, width, height, frame);
    let opacity = pulse_opacity(frame);
    let halo = box_blur_mask(&mask, width as usize, height as usize, glow_radius(frame) as usize);

    for py in 0..height {
        for px in 0..width {
            let idx = (py * width + px) as usize;
            let halo_alpha = (f32::from(halo[idx]) * opacity * 0.35).round() as u8;
            if halo_alpha > 0 {
                surface.blend_pixel(
                    (x + px) as i32,
                    (y + py) as i32,
                    [255, 255, 255, halo_alpha],
                );
            }
            if mask[idx] > 0 {
                let alpha = (f32::from(mask[idx]) * opacity).round() as u8;
                surface.blend_pixel(
                    (x + px) as i32,
                    (y + py) as i32,
                    [GLYPH_COLOR[0], GLYPH_COLOR[1], GLYPH_COLOR[2], alpha],
                );
            }
        }
    }
}

/// Coverage mask of the grid's glyphs, 255 where a glyph texel lands.
fn rasterize_grid(font: &PixelFont, columns: u32, rows: u32, width: u32, height: u32, frame: u32) -> Vec<u8> {
    let mut mask = vec![0_u8; (width * height) as usize];
    for row in 0..rows {
        for col in 0..columns {
            let ch = cell_char(row, col, columns, frame);
            let cell_x = col * CELL_SIZE;
            let cell_y = row * CELL_SIZE;
            for ty in 0..CELL_SIZE {
                let sy = ty * GLYPH_SIZE / CELL_SIZE;
                for tx in 0..CELL_SIZE {
                    let sx = tx * GLYPH_SIZE / CELL_SIZE;
                    if font.sample(ch, sx, sy) {
                        let px = cell_x + tx;
                        let py = cell_y + ty;
                        if px < width && py < height {
                            mask[(py * width + px) as usize] = 255;
                        }
                    }
                }
            }
        }
    }
    mask
}

/// Two-pass separable box blur of a single-channel mask.
fn box_blur_mask(mask: &[u8], width: usize, height: usize, radius: usize) -> Vec<u8> {
    if radius == 0 {
        return mask.to_vec();
    }
    let mut tmp = vec![0_u8; mask.len()];
    let mut out = vec![0_u8; mask.len()];
    let window = 2 * radius + 1;

    // Horizontal pass.
    for y in 0..height {
        let row = &mask[y * width..(y + 1) * width];
        let mut sum: u32 = 0;
        for x in 0..width.min(radius + 1) {
            sum += u32::from(row[x]);
        }
        for x in 0..width {
            tmp[y * width + x] = (sum as usize / window) as u8;
            if x + radius + 1 < width {
                sum += u32::from(row[x + radius + 1]);
            }
            if x >= radius {
                sum -= u32::from(row[x - radius]);
            }
        }
    }

    // Vertical pass.
    for x in 0..width {
        let mut sum: u32 = 0;
        for y in 0..height.min(radius + 1) {
            sum += u32::from(tmp[y * width + x]);
        }
        for y in 0..height {
            out[y * width + x] = (sum as usize / window) as u8;
            if y + radius + 1 < height {
                sum += u32::from(tmp[(y + radius + 1) * width + x]);
            }
            if y >= radius {
                sum -= u32::from(tmp[(y - radius) * width + x]);
            }
        }
    }

    out
}
