use crate::raster::{Rgba, Surface};

pub const GLYPH_SIZE: u32 = 8;

const ASCII_START: u8 = 0x20;
const ASCII_END: u8 = 0x7e;
const GLYPH_COUNT: usize = (ASCII_END - ASCII_START + 1) as usize;

type GlyphRows = [u8; GLYPH_SIZE as usize];

/// Embedded 8x8 pixel glyph set covering printable ASCII plus the check mark
/// the terminal script uses. Row bytes are MSB-left: bit 7 is column 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelFont;

impl PixelFont {
    pub fn new() -> Self {
        Self
    }

    fn rows(ch: char) -> Option<&'static GlyphRows> {
        if ch == '\u{2713}' {
            return Some(&CHECK_MARK);
        }
        let code = u32::from(ch);
        if code < u32::from(ASCII_START) || code > u32::from(ASCII_END) {
            return None;
        }
        Some(&GLYPHS[(code - u32::from(ASCII_START)) as usize])
    }

    /// True when the glyph for `ch` has an on pixel at (x, y) in its 8x8 box.
    /// Unsupported codepoints sample as empty everywhere.
    pub fn sample(&self, ch: char, x: u32, y: u32) -> bool {
        if x >= GLYPH_SIZE || y >= GLYPH_SIZE {
            return false;
        }
        match Self::rows(ch) {
            Some(rows) => (rows[y as usize] >> (GLYPH_SIZE - 1 - x)) & 1 == 1,
            None => false,
        }
    }

    /// Monospace advance: one scaled glyph box per character.
    pub fn text_width(&self, text: &str, size: u32) -> u32 {
        text.chars().count() as u32 * size
    }

    /// Draws `text` with its top-left corner at (x, y), each glyph scaled to
    /// `size` pixels square with nearest sampling.
    pub fn draw_text(&self, surface: &mut Surface, x: i32, y: i32, size: u32, text: &str, color: Rgba) {
        let mut pen_x = x;
        for ch in text.chars() {
            self.draw_glyph(surface, pen_x, y, size, ch, color);
            pen_x += size as i32;
        }
    }

    pub fn draw_glyph(&self, surface: &mut Surface, x: i32, y: i32, size: u32, ch: char, color: Rgba) {
        if Self::rows(ch).is_none() {
            return;
        }
        for ty in 0..size {
            let sy = ty * GLYPH_SIZE / size;
            for tx in 0..size {
                let sx = tx * GLYPH_SIZE / size;
                if self.sample(ch, sx, sy) {
                    surface.blend_pixel(x + tx as i32, y + ty as i32, color);
                }
            }
        }
    }
}

const CHECK_MARK: GlyphRows = [0x00, 0x08, 0x08, 0x10, 0xa0, 0x40, 0x00, 0x00];

#[rustfmt::skip]
const GLYPHS: [GlyphRows; GLYPH_COUNT] = [
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], // space
    [0x20, 0x20, 0x20, 0x20, 0x20, 0x00, 0x20, 0x00], // !
    [0x50, 0x50, 0x50, 0x00, 0x00, 0x00, 0x00, 0x00], // "
    [0x50, 0x50, 0xf8, 0x50, 0xf8, 0x50, 0x50, 0x00], // #
    [0x20, 0x78, 0xa0, 0x70, 0x28, 0xf0, 0x20, 0x00], // $
    [0xc8, 0x10, 0x10, 0x20, 0x40, 0x40, 0x98, 0x00], // %
    [0x60, 0x90, 0xa0, 0x40, 0xa8, 0x90, 0x68, 0x00], // &
    [0x20, 0x20, 0x40, 0x00, 0x00, 0x00, 0x00, 0x00], // '
    [0x10, 0x20, 0x40, 0x40, 0x40, 0x20, 0x10, 0x00], // (
    [0x40, 0x20, 0x10, 0x10, 0x10, 0x20, 0x40, 0x00], // )
    [0x00, 0x20, 0xa8, 0x70, 0xa8, 0x20, 0x00, 0x00], // *
    [0x00, 0x20, 0x20, 0xf8, 0x20, 0x20, 0x00, 0x00], // +
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x20, 0x20, 0x40], // ,
    [0x00, 0x00, 0x00, 0xf8, 0x00, 0x00, 0x00, 0x00], // -
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x30, 0x30, 0x00], // .
    [0x08, 0x08, 0x10, 0x20, 0x40, 0x80, 0x80, 0x00], // /
    [0x70, 0x88, 0x98, 0xa8, 0xc8, 0x88, 0x70, 0x00], // 0
    [0x20, 0x60, 0x20, 0x20, 0x20, 0x20, 0x70, 0x00], // 1
    [0x70, 0x88, 0x08, 0x10, 0x20, 0x40, 0xf8, 0x00], // 2
    [0xf8, 0x10, 0x20, 0x10, 0x08, 0x88, 0x70, 0x00], // 3
    [0x10, 0x30, 0x50, 0x90, 0xf8, 0x10, 0x10, 0x00], // 4
    [0xf8, 0x80, 0xf0, 0x08, 0x08, 0x88, 0x70, 0x00], // 5
    [0x30, 0x40, 0x80, 0xf0, 0x88, 0x88, 0x70, 0x00], // 6
    [0xf8, 0x08, 0x10, 0x20, 0x40, 0x40, 0x40, 0x00], // 7
    [0x70, 0x88, 0x88, 0x70, 0x88, 0x88, 0x70, 0x00], // 8
    [0x70, 0x88, 0x88, 0x78, 0x08, 0x10, 0x60, 0x00], // 9
    [0x00, 0x00, 0x30, 0x30, 0x00, 0x30, 0x30, 0x00], // :
    [0x00, 0x00, 0x30, 0x30, 0x00, 0x30, 0x20, 0x40], // ;
    [0x08, 0x10, 0x20, 0x40, 0x20, 0x10, 0x08, 0x00], // <
    [0x00, 0x00, 0xf8, 0x00, 0xf8, 0x00, 0x00, 0x00], // =
    [0x40, 0x20, 0x10, 0x08, 0x10, 0x20, 0x40, 0x00], // >
    [0x70, 0x88, 0x08, 0x10, 0x20, 0x00, 0x20, 0x00], // ?
    [0x70, 0x88, 0x08, 0x68, 0xa8, 0xa8, 0x70, 0x00], // @
    [0x70, 0x88, 0x88, 0xf8, 0x88, 0x88, 0x88, 0x00], // A
    [0xf0, 0x88, 0x88, 0xf0, 0x88, 0x88, 0xf0, 0x00], // B
    [0x70, 0x88, 0x80, 0x80, 0x80, 0x88, 0x70, 0x00], // C
    [0xf0, 0x88, 0x88, 0x88, 0x88, 0x88, 0xf0, 0x00], // D
    [0xf8, 0x80, 0x80, 0xf0, 0x80, 0x80, 0xf8, 0x00], // E
    [0xf8, 0x80, 0x80, 0xf0, 0x80, 0x80, 0x80, 0x00], // F
    [0x70, 0x88, 0x80, 0xb8, 0x88, 0x88, 0x70, 0x00], // G
    [0x88, 0x88, 0x88, 0xf8, 0x88, 0x88, 0x88, 0x00], // H
    [0x70, 0x20, 0x20, 0x20, 0x20, 0x20, 0x70, 0x00], // I
    [0x38, 0x10, 0x10, 0x10, 0x10, 0x90, 0x60, 0x00], // J
    [0x88, 0x90, 0xa0, 0xc0, 0xa0, 0x90, 0x88, 0x00], // K
    [0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0xf8, 0x00], // L
    [0x88, 0xd8, 0xa8, 0xa8, 0x88, 0x88, 0x88, 0x00], // M
    [0x88, 0xc8, 0xa8, 0x98, 0x88, 0x88, 0x88, 0x00], // N
    [0x70, 0x88, 0x88, 0x88, 0x88, 0x88, 0x70, 0x00], // O
    [0xf0, 0x88, 0x88, 0xf0, 0x80, 0x80, 0x80, 0x00], // P
    [0x70, 0x88, 0x88, 0x88, 0xa8, 0x90, 0x68, 0x00], // Q
    [0xf0, 0x88, 0x88, 0xf0, 0xa0, 0x90, 0x88, 0x00], // R
    [0x70, 0x88, 0x80, 0x70, 0x08, 0x88, 0x70, 0x00], // S
    [0xf8, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x00], // T
    [0x88, 0x88, 0x88, 0x88, 0x88, 0x88, 0x70, 0x00], // U
    [0x88, 0x88, 0x88, 0x88, 0x88, 0x50, 0x20, 0x00], // V
    [0x88, 0x88, 0x88, 0xa8, 0xa8, 0xd8, 0x88, 0x00], // W
    [0x88, 0x88, 0x50, 0x20, 0x50, 0x88, 0x88, 0x00], // X
    [0x88, 0x88, 0x50, 0x20, 0x20, 0x20, 0x20, 0x00], // Y
    [0xf8, 0x08, 0x10, 0x20, 0x40, 0x80, 0xf8, 0x00], // Z
    [0x70, 0x40, 0x40, 0x40, 0x40, 0x40, 0x70, 0x00], // [
    [0x80, 0x80, 0x40, 0x20, 0x10, 0x08, 0x08, 0x00], // backslash
    [0x70, 0x10, 0x10, 0x10, 0x10, 0x10, 0x70, 0x00], // ]
    [0x20, 0x50, 0x88, 0x00, 0x00, 0x00, 0x00, 0x00], // ^
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xf8, 0x00], // _
    [0x40, 0x20, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00], // `
    [0x00, 0x00, 0x70, 0x08, 0x78, 0x88, 0x78, 0x00], // a
    [0x80, 0x80, 0xf0, 0x88, 0x88, 0x88, 0xf0, 0x00], // b
    [0x00, 0x00, 0x70, 0x88, 0x80, 0x88, 0x70, 0x00], // c
    [0x08, 0x08, 0x78, 0x88, 0x88, 0x88, 0x78, 0x00], // d
    [0x00, 0x00, 0x70, 0x88, 0xf8, 0x80, 0x70, 0x00], // e
    [0x30, 0x40, 0xe0, 0x40, 0x40, 0x40, 0x40, 0x00], // f
    [0x00, 0x00, 0x78, 0x88, 0x88, 0x78, 0x08, 0x70], // g
    [0x80, 0x80, 0xf0, 0x88, 0x88, 0x88, 0x88, 0x00], // h
    [0x20, 0x00, 0x60, 0x20, 0x20, 0x20, 0x70, 0x00], // i
    [0x10, 0x00, 0x30, 0x10, 0x10, 0x10, 0x90, 0x60], // j
    [0x80, 0x80, 0x90, 0xa0, 0xc0, 0xa0, 0x90, 0x00], // k
    [0x60, 0x20, 0x20, 0x20, 0x20, 0x20, 0x70, 0x00], // l
    [0x00, 0x00, 0xd0, 0xa8, 0xa8, 0xa8, 0xa8, 0x00], // m
    [0x00, 0x00, 0xf0, 0x88, 0x88, 0x88, 0x88, 0x00], // n
    [0x00, 0x00, 0x70, 0x88, 0x88, 0x88, 0x70, 0x00], // o
    [0x00, 0x00, 0xf0, 0x88, 0x88, 0xf0, 0x80, 0x80], // p
    [0x00, 0x00, 0x78, 0x88, 0x88, 0x78, 0x08, 0x08], // q
    [0x00, 0x00, 0xb0, 0xc8, 0x80, 0x80, 0x80, 0x00], // r
    [0x00, 0x00, 0x78, 0x80, 0x70, 0x08, 0xf0, 0x00], // s
    [0x40, 0x40, 0xe0, 0x40, 0x40, 0x48, 0x30, 0x00], // t
    [0x00, 0x00, 0x88, 0x88, 0x88, 0x98, 0x68, 0x00], // u
    [0x00, 0x00, 0x88, 0x88, 0x88, 0x50, 0x20, 0x00], // v
    [0x00, 0x00, 0x88, 0x88, 0xa8, 0xa8, 0x50, 0x00], // w
    [0x00, 0x00, 0x88, 0x50, 0x20, 0x50, 0x88, 0x00], // x
    [0x00, 0x00, 0x88, 0x88, 0x88, 0x78, 0x08, 0x70], // y
    [0x00, 0x00, 0xf8, 0x10, 0x20, 0x40, 0xf8, 0x00], // z
    [0x30, 0x20, 0x20, 0x40, 0x20, 0x20, 0x30, 0x00], // {
    [0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x00], // |
    [0x60, 0x20, 0x20, 0x10, 0x20, 0x20, 0x60, 0x00], // }
    [0x00, 0x00, 0x48, 0xa8, 0x90, 0x00, 0x00, 0x00], // ~
];

#[cfg(test)]
mod tests {
    use super::{PixelFont, GLYPH_SIZE};
    use crate::raster::{rgb, Surface};

    #[test]
    fn letter_a_has_visible_pixels() {
        let font = PixelFont::new();
        let mut seen = false;
        for y in 0..GLYPH_SIZE {
            for x in 0..GLYPH_SIZE {
                if font.sample('A', x, y) {
                    seen = true;
                }
            }
        }
        assert!(seen);
    }

    #[test]
    fn check_mark_is_supported() {
        let font = PixelFont::new();
        let on = (0..GLYPH_SIZE)
            .flat_map(|y| (0..GLYPH_SIZE).map(move |x| (x, y)))
            .filter(|&(x, y)| font.sample('\u{2713}', x, y))
            .count();
        assert!(on > 0);
    }

    #[test]
    fn unsupported_codepoint_samples_empty() {
        let font = PixelFont::new();
        for y in 0..GLYPH_SIZE {
            for x in 0..GLYPH_SIZE {
                assert!(!font.sample('\u{00e9}', x, y));
            }
        }
    }

    #[test]
    fn out_of_box_sample_is_empty() {
        let font = PixelFont::new();
        assert!(!font.sample('A', GLYPH_SIZE, 0));
        assert!(!font.sample('A', 0, GLYPH_SIZE));
    }

    #[test]
    fn distinct_letters_differ() {
        let font = PixelFont::new();
        let mut differs = false;
        for y in 0..GLYPH_SIZE {
            for x in 0..GLYPH_SIZE {
                if font.sample('I', x, y) != font.sample('M', x, y) {
                    differs = true;
                }
            }
        }
        assert!(differs);
    }

    #[test]
    fn text_width_is_monospace() {
        let font = PixelFont::new();
        assert_eq!(font.text_width("SEISMIC://system", 32), 16 * 32);
        assert_eq!(font.text_width("", 32), 0);
    }

    #[test]
    fn draw_text_touches_surface() {
        let font = PixelFont::new();
        let mut surface = Surface::new(64, 16).expect("surface");
        surface.fill(rgb(0, 0, 0));
        font.draw_text(&mut surface, 0, 0, 16, "A", rgb(255, 255, 255));
        let lit = surface
            .data()
            .chunks_exact(4)
            .filter(|px| px[0] > 0)
            .count();
        assert!(lit > 0, "drawing a glyph must change pixels");
    }
}
