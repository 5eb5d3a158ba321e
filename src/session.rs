use std::path::Path;

use anyhow::Result;

use crate::driver::{AnimationDriver, ProgressFn};
use crate::encoding::{CaptureSink, FfmpegMode, FfmpegPipe};
use crate::scene::{PreparedScene, SceneData};
use crate::schema::{EncodingConfig, Environment, Profile};

/// One complete capture: validated inputs, a prepared scene, and the encoder
/// settings. Consumed by `record`, so a session records at most once.
pub struct Session {
    environment: Environment,
    encoding: EncodingConfig,
    scene: PreparedScene,
}

impl Session {
    pub fn new(
        profile: Profile,
        image_path: &Path,
        environment: Environment,
        encoding: EncodingConfig,
    ) -> Result<Self> {
        let scene = SceneData::load(profile, image_path)?.prepare(&environment)?;
        Ok(Self {
            environment,
            encoding,
            scene,
        })
    }

    pub fn from_scene(
        scene: PreparedScene,
        environment: Environment,
        encoding: EncodingConfig,
    ) -> Self {
        Self {
            environment,
            encoding,
            scene,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// `seismic-<username>-<unix millis>.webm`, unique per invocation.
    pub fn default_output_name(&self) -> String {
        format!(
            "seismic-{}-{}.webm",
            self.scene.profile.username,
            chrono::Utc::now().timestamp_millis()
        )
    }

    /// Runs the wall-clock-paced capture into an arbitrary sink.
    pub fn record<S: CaptureSink>(self, sink: S, progress: Option<ProgressFn>) -> Result<()> {
        let mut driver = AnimationDriver::new(&self.environment, self.scene, sink)?;
        if let Some(progress) = progress {
            driver = driver.with_progress(progress);
        }
        driver.run()
    }

    /// Records straight into a WebM file through a piped ffmpeg process.
    pub fn record_to_file(
        self,
        output_path: &Path,
        mode: FfmpegMode,
        progress: Option<ProgressFn>,
    ) -> Result<()> {
        let pipe =
            FfmpegPipe::spawn_with_mode(&self.environment, &self.encoding, output_path, mode)?;
        self.record(pipe, progress)
    }
}

#[cfg(test)]
mod tests {
    use super::Session;
    use crate::scene::SceneData;
    use crate::schema::{EncodingConfig, Environment, Profile, Resolution};
    use image::RgbaImage;

    fn test_session() -> Session {
        let profile = Profile {
            username: "quake42".to_owned(),
            region: "PNW".to_owned(),
            magnitude: "5.2".to_owned(),
        };
        let env = Environment {
            resolution: Resolution {
                width: 160,
                height: 162,
            },
            ..Environment::default()
        };
        let scene = SceneData::from_image(
            profile,
            RgbaImage::from_pixel(16, 16, image::Rgba([1, 2, 3, 255])),
        )
        .expect("scene")
        .prepare(&env)
        .expect("prepare");
        Session::from_scene(scene, env, EncodingConfig::default())
    }

    #[test]
    fn default_output_name_embeds_username_and_timestamp() {
        let name = test_session().default_output_name();
        assert!(name.starts_with("seismic-quake42-"));
        assert!(name.ends_with(".webm"));
        let millis = name
            .trim_start_matches("seismic-quake42-")
            .trim_end_matches(".webm");
        assert!(millis.parse::<i64>().is_ok(), "bad timestamp in {name}");
    }

    #[test]
    fn session_loads_profile_image_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("avatar.png");
        RgbaImage::from_pixel(24, 24, image::Rgba([9, 9, 9, 255]))
            .save(&path)
            .expect("write png");
        let profile = Profile {
            username: "quake42".to_owned(),
            region: "PNW".to_owned(),
            magnitude: "5.2".to_owned(),
        };
        let env = Environment {
            resolution: Resolution {
                width: 160,
                height: 162,
            },
            ..Environment::default()
        };
        Session::new(profile, &path, env, EncodingConfig::default()).expect("session");
    }

    #[test]
    fn missing_image_fails_session_construction() {
        let profile = Profile {
            username: "quake42".to_owned(),
            region: "PNW".to_owned(),
            magnitude: "5.2".to_owned(),
        };
        let result = Session::new(
            profile,
            std::path::Path::new("/nonexistent/profile.png"),
            Environment::default(),
            EncodingConfig::default(),
        );
        assert!(result.is_err());
    }
}
