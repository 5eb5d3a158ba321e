use anyhow::Result;

use crate::glyphs::PixelFont;
use crate::overlay;
use crate::raster::{rgb, Rgba, Surface};
use crate::scene::PreparedScene;
use crate::timeline::{Phase, Timeline};

/// Vertical space the terminal chrome occupies; the reveal area starts here.
pub const HEADER_HEIGHT: u32 = 130;
/// Frames over which the reveal image fades in (one second at 30 fps).
pub const REVEAL_FADE_IN_FRAMES: u32 = 30;

const BACKGROUND_STOPS: [(f32, Rgba); 3] = [
    (0.0, rgb(0x2d, 0x2a, 0x35)),
    (0.6, rgb(0x1a, 0x18, 0x20)),
    (1.0, rgb(0x0f, 0x0e, 0x12)),
];
const FADE_COLOR: [u8; 3] = [0x1a, 0x18, 0x20];
const HEADER_BAR: Rgba = rgb(0xd8, 0x93, 0xc3);
const DOT_RED: Rgba = rgb(0xff, 0x5f, 0x56);
const DOT_YELLOW: Rgba = rgb(0xff, 0xbd, 0x2e);
const DOT_GREEN: Rgba = rgb(0x27, 0xc9, 0x3f);
const TITLE: &str = "SEISMIC://system";
const TITLE_SIZE: u32 = 32;

const SCRIPT_TEXT_SIZE: u32 = 34;
const SCRIPT_X: i32 = 100;
const SCRIPT_FIRST_BASELINE: i32 = 180;
const SCRIPT_LINE_HEIGHT: i32 = 40;

/// Fade-phase black overlay opacity: a linear ramp 0 -> 1 over one second.
pub fn fade_opacity(local_frame: u32, fps: u32) -> f32 {
    (local_frame as f32 / fps as f32).min(1.0)
}

/// Reveal-phase image opacity: linear fade-in over the first 30 frames.
pub fn reveal_opacity(local_frame: u32) -> f32 {
    (local_frame as f32 / REVEAL_FADE_IN_FRAMES as f32).min(1.0)
}

/// Dispatches an absolute frame index to its phase renderer.
pub fn render_frame(
    surface: &mut Surface,
    scene: &PreparedScene,
    timeline: &Timeline,
    frame: u32,
) -> Result<()> {
    let (phase, local_frame) = timeline.phase_at(frame)?;
    match phase {
        Phase::Terminal => render_terminal(surface, scene, local_frame),
        Phase::Fade => render_fade(surface, scene, timeline, local_frame),
        Phase::Reveal => render_reveal(surface, scene, local_frame),
    }
    Ok(())
}

/// Terminal phase: gradient backdrop, chrome header, and every script line
/// already revealed at `local_frame`. Unrevealed lines are omitted entirely,
/// but each line keeps its ordinal slot.
pub fn render_terminal(surface: &mut Surface, scene: &PreparedScene, local_frame: u32) {
    surface.diagonal_gradient(&BACKGROUND_STOPS);
    draw_header(surface);

    let font = PixelFont::new();
    let mut baseline = SCRIPT_FIRST_BASELINE;
    for line in &scene.script {
        if local_frame >= line.reveal_frame && !line.text.is_empty() {
            font.draw_text(
                surface,
                SCRIPT_X,
                baseline - SCRIPT_TEXT_SIZE as i32,
                SCRIPT_TEXT_SIZE,
                &line.text,
                line.color,
            );
        }
        baseline += SCRIPT_LINE_HEIGHT;
    }
}

/// Fade phase: the final terminal frame frozen as a backdrop, with a black
/// overlay ramping linearly to opaque.
pub fn render_fade(
    surface: &mut Surface,
    scene: &PreparedScene,
    timeline: &Timeline,
    local_frame: u32,
) {
    render_terminal(surface, scene, timeline.terminal_last_local());
    let alpha = (fade_opacity(local_frame, timeline.fps()) * 255.0).round() as u8;
    if alpha > 0 {
        surface.fill_rect(
            0,
            0,
            surface.width(),
            surface.height(),
            [FADE_COLOR[0], FADE_COLOR[1], FADE_COLOR[2], alpha],
        );
    }
}

/// Reveal phase: backdrop and header, the cover-fitted profile picture fading
/// in below the header, then the cipher-grid overlay once the fade-in is done.
pub fn render_reveal(surface: &mut Surface, scene: &PreparedScene, local_frame: u32) {
    surface.diagonal_gradient(&BACKGROUND_STOPS);
    draw_header(surface);

    let area_y = HEADER_HEIGHT;
    let area_width = surface.width();
    let area_height = surface.height() - HEADER_HEIGHT;

    let opacity = reveal_opacity(local_frame);
    if opacity > 0.0 {
        let image = &scene.fitted_image;
        for py in 0..area_height.min(image.height()) {
            for px in 0..area_width.min(image.width()) {
                let texel = image.get_pixel(px, py);
                let alpha = (f32::from(texel[3]) * opacity).round() as u8;
                if alpha > 0 {
                    surface.blend_pixel(
                        px as i32,
                        (area_y + py) as i32,
                        [texel[0], texel[1], texel[2], alpha],
                    );
                }
            }
        }
    }

    if local_frame > REVEAL_FADE_IN_FRAMES {
        let font = PixelFont::new();
        overlay::render(
            surface,
            &font,
            0,
            area_y,
            area_width,
            area_height,
            local_frame,
        );
    }
}

fn draw_header(surface: &mut Surface) {
    let width = surface.width();
    surface.fill_rect(0, 50, width, 80, HEADER_BAR);

    let dot_y = 90;
    surface.fill_circle(50, dot_y, 8, DOT_RED);
    surface.fill_circle(90, dot_y, 8, DOT_YELLOW);
    surface.fill_circle(130, dot_y, 8, DOT_GREEN);

    let font = PixelFont::new();
    let title_width = font.text_width(TITLE, TITLE_SIZE);
    let title_x = (width.saturating_sub(title_width) / 2) as i32;
    font.draw_text(surface, title_x, 95 - TITLE_SIZE as i32, TITLE_SIZE, TITLE, rgb(255, 255, 255));
}
