use std::path::Path;

use anyhow::{bail, Context, Result};
use image::{imageops, ImageReader, RgbaImage};

use crate::phases::HEADER_HEIGHT;
use crate::raster::{cover_fit, rgb, Rgba};
use crate::schema::{Environment, Profile};

pub const COMMENT_GREEN: Rgba = rgb(0x6a, 0x99, 0x55);
pub const CODE_YELLOW: Rgba = rgb(0xdc, 0xdc, 0xaa);
pub const OK_TEAL: Rgba = rgb(0x4e, 0xc9, 0xb0);
pub const PLAIN_GREY: Rgba = rgb(0xd4, 0xd4, 0xd4);
pub const STRING_ORANGE: Rgba = rgb(0xce, 0x91, 0x78);
pub const LOG_BLUE: Rgba = rgb(0x9c, 0xdc, 0xfe);

/// One line of the terminal typing sequence. Visible for every local frame
/// `>= reveal_frame` until the phase ends; lines never disappear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLine {
    pub reveal_frame: u32,
    pub text: String,
    pub color: Rgba,
}

/// The fixed typing script with the member's details interpolated.
/// Reveal frames are non-decreasing in sequence order.
pub fn terminal_script(profile: &Profile) -> Vec<ScriptLine> {
    let line = |reveal_frame: u32, text: String, color: Rgba| ScriptLine {
        reveal_frame,
        text,
        color,
    };
    vec![
        line(15, "// Initializing SEISMIC System...".into(), COMMENT_GREEN),
        line(40, "const blockchain = initSeismic();".into(), CODE_YELLOW),
        line(60, "\u{2713} Privacy-enabled blockchain active".into(), OK_TEAL),
        line(75, String::new(), PLAIN_GREY),
        line(85, "// Loading member profile...".into(), COMMENT_GREEN),
        line(105, "const member = {".into(), CODE_YELLOW),
        line(125, format!("  username: \"{}\",", profile.username), STRING_ORANGE),
        line(145, format!("  region: \"{}\",", profile.region), STRING_ORANGE),
        line(165, format!("  magnitude: \"{}\"", profile.magnitude), STRING_ORANGE),
        line(180, "};".into(), CODE_YELLOW),
        line(190, String::new(), PLAIN_GREY),
        line(200, "// Verifying credentials...".into(), COMMENT_GREEN),
        line(215, "const verification = verify(member);".into(), CODE_YELLOW),
        line(225, "\u{2713} Member verified".into(), OK_TEAL),
        line(230, String::new(), PLAIN_GREY),
        line(235, "console.log(\"Welcome to SEISMIC\");".into(), LOG_BLUE),
        line(238, "// Building products users can trust".into(), COMMENT_GREEN),
    ]
}

/// Raw scene inputs: the member profile and the decoded profile picture.
/// Built once before the driver starts; the driver never starts without it.
#[derive(Debug, Clone)]
pub struct SceneData {
    pub profile: Profile,
    pub image: RgbaImage,
}

impl SceneData {
    pub fn load(profile: Profile, image_path: &Path) -> Result<Self> {
        profile.validate()?;
        let image = ImageReader::open(image_path)
            .with_context(|| format!("failed opening profile image {}", image_path.display()))?
            .decode()
            .with_context(|| format!("failed decoding profile image {}", image_path.display()))?
            .to_rgba8();
        Ok(Self { profile, image })
    }

    pub fn from_image(profile: Profile, image: RgbaImage) -> Result<Self> {
        profile.validate()?;
        if image.width() == 0 || image.height() == 0 {
            bail!("profile image has zero dimensions");
        }
        Ok(Self { profile, image })
    }

    /// Resolves everything frame rendering needs up front: the script and the
    /// profile picture cover-fitted and cropped to the reveal area.
    pub fn prepare(&self, environment: &Environment) -> Result<PreparedScene> {
        environment.validate()?;
        let width = environment.resolution.width;
        let height = environment.resolution.height;
        if height <= HEADER_HEIGHT {
            bail!(
                "frame height {} leaves no room below the {}px header",
                height,
                HEADER_HEIGHT
            );
        }
        let area_width = width;
        let area_height = height - HEADER_HEIGHT;

        let fit = cover_fit(
            self.image.width(),
            self.image.height(),
            0,
            0,
            area_width,
            area_height,
        );
        let scaled = imageops::resize(
            &self.image,
            fit.width,
            fit.height,
            imageops::FilterType::Triangle,
        );
        let fitted = imageops::crop_imm(
            &scaled,
            (-fit.x) as u32,
            (-fit.y) as u32,
            area_width,
            area_height,
        )
        .to_image();

        Ok(PreparedScene {
            profile: self.profile.clone(),
            script: terminal_script(&self.profile),
            fitted_image: fitted,
        })
    }
}

/// Immutable per-session render data. Read-only for the clip's lifetime.
#[derive(Debug, Clone)]
pub struct PreparedScene {
    pub profile: Profile,
    pub script: Vec<ScriptLine>,
    /// Profile picture already cover-fitted to the area below the header.
    pub fitted_image: RgbaImage,
}
