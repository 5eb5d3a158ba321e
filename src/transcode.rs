use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{anyhow, bail, Context, Result};

use crate::encoding::FfmpegMode;

/// Best-effort WebM to MP4 conversion step. Failure here never invalidates
/// the captured clip; callers keep the source file and report the error.
pub struct Transcoder {
    ffmpeg_path: PathBuf,
}

impl Transcoder {
    /// Resolves an ffmpeg binary for `mode` and verifies it responds to
    /// `-version` before any conversion is attempted.
    pub fn resolve(mode: FfmpegMode) -> Result<Self> {
        let ffmpeg_path = resolve_ffmpeg_path(mode)?;
        let status = Command::new(&ffmpeg_path)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| {
                format!(
                    "ffmpeg not runnable at {} (install ffmpeg to enable mp4 conversion)",
                    ffmpeg_path.display()
                )
            })?;
        if !status.success() {
            bail!(
                "ffmpeg at {} exited with {status} during probe",
                ffmpeg_path.display()
            );
        }
        Ok(Self { ffmpeg_path })
    }

    pub fn transcode(&self, input: &Path, output: &Path) -> Result<()> {
        if !input.exists() {
            bail!("transcode input {} does not exist", input.display());
        }
        let args = mp4_args(input, output);
        let output_result = Command::new(&self.ffmpeg_path)
            .args(args.iter().map(String::as_str))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .context("failed to run ffmpeg for mp4 conversion")?;
        if !output_result.status.success() {
            let stderr = String::from_utf8_lossy(&output_result.stderr);
            let text = stderr.trim();
            let skip = text.chars().count().saturating_sub(500);
            let tail: String = text.chars().skip(skip).collect();
            return Err(anyhow!(
                "mp4 conversion failed with {} (stderr_tail='{}')",
                output_result.status,
                tail
            ));
        }
        Ok(())
    }
}

fn resolve_ffmpeg_path(mode: FfmpegMode) -> Result<PathBuf> {
    match mode {
        FfmpegMode::Auto | FfmpegMode::System => Ok(PathBuf::from("ffmpeg")),
        FfmpegMode::Sidecar => {
            #[cfg(feature = "sidecar_ffmpeg")]
            {
                Ok(ffmpeg_sidecar::paths::ffmpeg_path())
            }
            #[cfg(not(feature = "sidecar_ffmpeg"))]
            {
                Err(anyhow!(
                    "ffmpeg sidecar mode requested but this build lacks `sidecar_ffmpeg`. Rebuild with `--features sidecar_ffmpeg`."
                ))
            }
        }
    }
}

/// Conversion favors speed over size: the mp4 is a convenience copy, the
/// WebM stays the canonical capture.
pub fn mp4_args(input: &Path, output: &Path) -> Vec<String> {
    vec![
        "-hide_banner".to_owned(),
        "-loglevel".to_owned(),
        "error".to_owned(),
        "-y".to_owned(),
        "-i".to_owned(),
        input.to_string_lossy().into_owned(),
        "-c:v".to_owned(),
        "libx264".to_owned(),
        "-preset".to_owned(),
        "ultrafast".to_owned(),
        "-crf".to_owned(),
        "28".to_owned(),
        "-pix_fmt".to_owned(),
        "yuv420p".to_owned(),
        "-movflags".to_owned(),
        "+faststart".to_owned(),
        output.to_string_lossy().into_owned(),
    ]
}

/// Sibling path with the extension swapped to `.mp4`.
pub fn mp4_output_path(input: &Path) -> PathBuf {
    input.with_extension("mp4")
}

#[cfg(test)]
mod tests {
    use super::{mp4_args, mp4_output_path, Transcoder};
    use std::path::{Path, PathBuf};

    #[test]
    fn mp4_args_match_the_conversion_recipe() {
        let args = mp4_args(Path::new("clip.webm"), Path::new("clip.mp4"));
        let joined = args.join(" ");
        assert!(joined.contains("-i clip.webm"));
        assert!(joined.contains("-c:v libx264"));
        assert!(joined.contains("-preset ultrafast"));
        assert!(joined.contains("-crf 28"));
        assert!(joined.contains("-pix_fmt yuv420p"));
        assert!(joined.contains("-movflags +faststart"));
        assert!(joined.ends_with("clip.mp4"));
    }

    #[test]
    fn failed_conversion_leaves_the_source_clip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("clip.webm");
        std::fs::write(&input, b"not really webm").expect("write input");

        let transcoder = Transcoder {
            ffmpeg_path: PathBuf::from("/nonexistent/ffmpeg"),
        };
        let output = dir.path().join("clip.mp4");
        assert!(transcoder.transcode(&input, &output).is_err());
        assert!(input.exists(), "source clip must survive a failed conversion");
        assert!(!output.exists());
    }

    #[test]
    fn missing_input_is_rejected_before_spawning() {
        let transcoder = Transcoder {
            ffmpeg_path: PathBuf::from("/nonexistent/ffmpeg"),
        };
        let result = transcoder.transcode(Path::new("/no/such/clip.webm"), Path::new("/tmp/x.mp4"));
        assert!(result.is_err());
    }

    #[test]
    fn mp4_path_swaps_the_extension() {
        assert_eq!(
            mp4_output_path(Path::new("out/seismic-quake42-17.webm")),
            Path::new("out/seismic-quake42-17.mp4")
        );
    }
}
