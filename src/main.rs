use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use seismic_promo::encoding::FfmpegMode;
use seismic_promo::scene::{terminal_script, SceneData};
use seismic_promo::schema::{EncodingConfig, Environment, Profile};
use seismic_promo::session::Session;
use seismic_promo::timeline::Timeline;
use seismic_promo::transcode::{mp4_output_path, Transcoder};

#[derive(Debug, Parser)]
#[command(name = "seismic-promo")]
#[command(about = "SEISMIC member promo clip renderer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Render a member promo clip to WebM.
    Render {
        #[command(flatten)]
        member: MemberArgs,
        /// Profile picture revealed in the final segment.
        #[arg(long)]
        image: PathBuf,
        /// Output WebM path. Defaults to seismic-<username>-<millis>.webm.
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
        #[arg(long)]
        fps: Option<u32>,
        /// Clip length in seconds.
        #[arg(long = "duration")]
        duration_seconds: Option<u32>,
        #[arg(long = "ffmpeg-mode", default_value = "auto", value_parser = parse_ffmpeg_mode)]
        ffmpeg_mode: FfmpegMode,
        /// Also convert the capture to mp4. Failure keeps the WebM.
        #[arg(long)]
        transcode: bool,
    },
    /// Convert an existing WebM capture to mp4.
    Transcode {
        input: PathBuf,
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
        #[arg(long = "ffmpeg-mode", default_value = "auto", value_parser = parse_ffmpeg_mode)]
        ffmpeg_mode: FfmpegMode,
    },
    /// Validate inputs without rendering.
    Check {
        #[command(flatten)]
        member: MemberArgs,
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Args)]
struct MemberArgs {
    /// YAML file with username, region, and magnitude.
    #[arg(long, conflicts_with_all = ["username", "region", "magnitude"])]
    profile: Option<PathBuf>,
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    region: Option<String>,
    #[arg(long)]
    magnitude: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            member,
            image,
            output,
            fps,
            duration_seconds,
            ffmpeg_mode,
            transcode,
        } => run_render(
            member,
            &image,
            output,
            fps,
            duration_seconds,
            ffmpeg_mode,
            transcode,
        ),
        Commands::Transcode {
            input,
            output,
            ffmpeg_mode,
        } => run_transcode(&input, output, ffmpeg_mode),
        Commands::Check {
            member,
            image,
            json,
        } => run_check(member, &image, json),
    }
}

fn run_render(
    member: MemberArgs,
    image: &Path,
    output: Option<PathBuf>,
    fps: Option<u32>,
    duration_seconds: Option<u32>,
    ffmpeg_mode: FfmpegMode,
    transcode: bool,
) -> Result<()> {
    let profile = load_profile(&member)?;
    let environment = build_environment(fps, duration_seconds);
    let session = Session::new(profile, image, environment, EncodingConfig::default())?;
    let output = output.unwrap_or_else(|| PathBuf::from(session.default_output_name()));

    let progress_fps = session.environment().fps;
    let progress = Box::new(move |frame: u32, total: u32| {
        if frame % progress_fps == 0 {
            eprintln!("rendered frame {}/{}", frame + 1, total);
        }
    });

    session.record_to_file(&output, ffmpeg_mode, Some(progress))?;
    println!("Wrote {}", output.display());

    if transcode {
        let mp4 = mp4_output_path(&output);
        match Transcoder::resolve(ffmpeg_mode).and_then(|t| t.transcode(&output, &mp4)) {
            Ok(()) => println!("Wrote {}", mp4.display()),
            Err(error) => {
                eprintln!("warning: mp4 conversion failed, keeping WebM: {error:#}");
            }
        }
    }
    Ok(())
}

fn run_transcode(input: &Path, output: Option<PathBuf>, ffmpeg_mode: FfmpegMode) -> Result<()> {
    let output = output.unwrap_or_else(|| mp4_output_path(input));
    let transcoder = Transcoder::resolve(ffmpeg_mode)?;
    transcoder.transcode(input, &output)?;
    println!("Wrote {}", output.display());
    Ok(())
}

fn run_check(member: MemberArgs, image: &Path, json: bool) -> Result<()> {
    let profile = load_profile(&member)?;
    let environment = Environment::default();
    let timeline = Timeline::new(&environment)?;
    let scene = SceneData::load(profile.clone(), image)?;
    scene.prepare(&environment)?;
    let script = terminal_script(&profile);

    if json {
        let report = serde_json::json!({
            "username": profile.username,
            "region": profile.region,
            "magnitude": profile.magnitude,
            "image": image.display().to_string(),
            "width": environment.resolution.width,
            "height": environment.resolution.height,
            "fps": environment.fps,
            "duration_seconds": environment.duration_seconds,
            "total_frames": timeline.total_frames(),
            "script_lines": script.len(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "OK: {} ({}x{}, {} fps, {} frames)",
            profile.username,
            environment.resolution.width,
            environment.resolution.height,
            environment.fps,
            timeline.total_frames()
        );
        println!("Image: {}", image.display());
        println!("Script lines: {}", script.len());
    }
    Ok(())
}

fn load_profile(member: &MemberArgs) -> Result<Profile> {
    let profile = if let Some(path) = &member.profile {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed reading profile {}", path.display()))?;
        serde_yaml::from_str(&text)
            .with_context(|| format!("failed parsing profile {}", path.display()))?
    } else {
        match (&member.username, &member.region, &member.magnitude) {
            (Some(username), Some(region), Some(magnitude)) => Profile {
                username: username.clone(),
                region: region.clone(),
                magnitude: magnitude.clone(),
            },
            _ => bail!(
                "pass --profile <yaml> or all of --username, --region, and --magnitude"
            ),
        }
    };
    profile.validate()?;
    Ok(profile)
}

fn build_environment(fps: Option<u32>, duration_seconds: Option<u32>) -> Environment {
    let mut environment = Environment::default();
    if let Some(fps) = fps {
        environment.fps = fps;
    }
    if let Some(duration_seconds) = duration_seconds {
        environment.duration_seconds = duration_seconds;
    }
    environment
}

fn parse_ffmpeg_mode(value: &str) -> Result<FfmpegMode, String> {
    match value {
        "auto" => Ok(FfmpegMode::Auto),
        "system" => Ok(FfmpegMode::System),
        "sidecar" => Ok(FfmpegMode::Sidecar),
        other => Err(format!(
            "unknown ffmpeg mode '{other}' (expected auto, system, or sidecar)"
        )),
    }
}
