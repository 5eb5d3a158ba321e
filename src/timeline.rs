use anyhow::{bail, Result};

use crate::schema::Environment;

/// Seconds of terminal typing before the fade begins.
pub const TERMINAL_SECONDS: u32 = 8;
/// Seconds the fade-to-black transition lasts.
pub const FADE_SECONDS: u32 = 1;

/// One of the three contiguous, mutually exclusive segments of the clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Terminal,
    Fade,
    Reveal,
}

/// Partition of the absolute frame range `[0, total)` into the three phases.
/// Boundaries are whole seconds, so they are frame-aligned by construction.
#[derive(Debug, Clone, Copy)]
pub struct Timeline {
    fps: u32,
    terminal_end: u32,
    fade_end: u32,
    total_frames: u32,
}

impl Timeline {
    pub fn new(environment: &Environment) -> Result<Self> {
        environment.validate()?;
        let fps = environment.fps;
        let terminal_end = TERMINAL_SECONDS * fps;
        let fade_end = (TERMINAL_SECONDS + FADE_SECONDS) * fps;
        let total_frames = environment.total_frames();
        if total_frames <= fade_end {
            bail!(
                "clip must be longer than {} seconds to leave room for the reveal, got {}",
                TERMINAL_SECONDS + FADE_SECONDS,
                environment.duration_seconds
            );
        }
        Ok(Self {
            fps,
            terminal_end,
            fade_end,
            total_frames,
        })
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn total_frames(&self) -> u32 {
        self.total_frames
    }

    /// Maps an absolute frame index to its phase and local frame index.
    pub fn phase_at(&self, frame: u32) -> Result<(Phase, u32)> {
        if frame >= self.total_frames {
            bail!(
                "frame {} outside clip range [0, {})",
                frame,
                self.total_frames
            );
        }
        if frame < self.terminal_end {
            Ok((Phase::Terminal, frame))
        } else if frame < self.fade_end {
            Ok((Phase::Fade, frame - self.terminal_end))
        } else {
            Ok((Phase::Reveal, frame - self.fade_end))
        }
    }

    /// Last local frame of the terminal phase; the fade re-renders this as its
    /// frozen backdrop.
    pub fn terminal_last_local(&self) -> u32 {
        self.terminal_end - 1
    }
}

#[cfg(test)]
mod tests {
    use super::{Phase, Timeline};
    use crate::schema::Environment;

    fn default_timeline() -> Timeline {
        Timeline::new(&Environment::default()).expect("default timeline")
    }

    #[test]
    fn default_partition_matches_promo() {
        let timeline = default_timeline();
        assert_eq!(timeline.total_frames(), 420);
        assert_eq!(timeline.phase_at(0).unwrap(), (Phase::Terminal, 0));
        assert_eq!(timeline.phase_at(239).unwrap(), (Phase::Terminal, 239));
        assert_eq!(timeline.phase_at(240).unwrap(), (Phase::Fade, 0));
        assert_eq!(timeline.phase_at(269).unwrap(), (Phase::Fade, 29));
        assert_eq!(timeline.phase_at(270).unwrap(), (Phase::Reveal, 0));
        assert_eq!(timeline.phase_at(419).unwrap(), (Phase::Reveal, 149));
    }

    #[test]
    fn every_frame_belongs_to_exactly_one_phase() {
        let timeline = default_timeline();
        let mut counts = [0_u32; 3];
        for frame in 0..timeline.total_frames() {
            let (phase, _) = timeline.phase_at(frame).expect("in range");
            counts[match phase {
                Phase::Terminal => 0,
                Phase::Fade => 1,
                Phase::Reveal => 2,
            }] += 1;
        }
        assert_eq!(counts, [240, 30, 150]);
    }

    #[test]
    fn local_frames_start_at_zero_per_phase() {
        let timeline = default_timeline();
        let mut previous_phase = None;
        for frame in 0..timeline.total_frames() {
            let (phase, local) = timeline.phase_at(frame).expect("in range");
            if previous_phase != Some(phase) {
                assert_eq!(local, 0, "phase {phase:?} must open at local frame 0");
                previous_phase = Some(phase);
            }
        }
    }

    #[test]
    fn out_of_range_frame_rejected() {
        let timeline = default_timeline();
        assert!(timeline.phase_at(420).is_err());
    }

    #[test]
    fn too_short_clip_rejected() {
        let env = Environment {
            duration_seconds: 9,
            ..Environment::default()
        };
        assert!(Timeline::new(&env).is_err());
    }

    #[test]
    fn terminal_last_local_is_final_terminal_frame() {
        let timeline = default_timeline();
        assert_eq!(timeline.terminal_last_local(), 239);
        assert_eq!(
            timeline.phase_at(239).unwrap(),
            (Phase::Terminal, timeline.terminal_last_local())
        );
    }
}
