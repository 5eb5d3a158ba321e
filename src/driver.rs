use std::time::{Duration, Instant};

use anyhow::Result;

use crate::encoding::CaptureSink;
use crate::phases;
use crate::raster::Surface;
use crate::scene::PreparedScene;
use crate::schema::Environment;
use crate::timeline::Timeline;

/// Upper bound on catch-up work per tick. A stalled clock never triggers an
/// unbounded render burst.
pub const MAX_FRAMES_PER_TICK: u32 = 3;
/// Ticks closer together than this fraction of the frame period are dropped.
pub const DEBOUNCE_FACTOR: f64 = 0.9;
/// Grace period between the last rendered frame and sink finalization, so
/// in-flight frames drain before the container is closed.
pub const FLUSH_DELAY: Duration = Duration::from_millis(200);

pub type ProgressFn = Box<dyn FnMut(u32, u32)>;

#[derive(Debug, Clone, Copy)]
enum State {
    Idle,
    Running {
        started_at: Instant,
        last_work: Instant,
    },
    Stopping {
        stop_at: Instant,
    },
    Stopped,
}

/// What a single tick did. `Finished` is reported exactly once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running, or the clock has not reached the next frame yet.
    Idle,
    /// Tick arrived too soon after the previous one and was dropped.
    Debounced,
    /// This many frames were rendered and handed to the sink.
    Rendered(u32),
    /// The clip duration elapsed; frames are draining before finalization.
    Flushing,
    /// The sink was finalized.
    Finished,
}

/// Wall-clock-paced frame scheduler. Owns the surface and the capture sink;
/// callers drive it with an explicit clock through `tick`, or hand control to
/// `run` for real-time pacing.
///
/// The frame counter is the single source of truth for content: a late tick
/// renders the frames the clock says are due, it never re-renders or skips.
pub struct AnimationDriver<S: CaptureSink> {
    timeline: Timeline,
    scene: PreparedScene,
    surface: Surface,
    sink: Option<S>,
    progress: Option<ProgressFn>,
    state: State,
    current_frame: u32,
    duration: Duration,
    nominal_period: Duration,
}

impl<S: CaptureSink> AnimationDriver<S> {
    pub fn new(environment: &Environment, scene: PreparedScene, sink: S) -> Result<Self> {
        let timeline = Timeline::new(environment)?;
        let surface = Surface::new(environment.resolution.width, environment.resolution.height)?;
        Ok(Self {
            timeline,
            scene,
            surface,
            sink: Some(sink),
            progress: None,
            state: State::Idle,
            current_frame: 0,
            duration: environment.clip_duration(),
            nominal_period: environment.frame_interval(),
        })
    }

    /// Installs a callback invoked before each frame renders, with the frame
    /// index and the clip's total frame count.
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn current_frame(&self) -> u32 {
        self.current_frame
    }

    pub fn total_frames(&self) -> u32 {
        self.timeline.total_frames()
    }

    /// Starts the clock. The first tick's debounce window opens here, so the
    /// first frame renders one frame period after `now`.
    pub fn start(&mut self, now: Instant) {
        if let State::Idle = self.state {
            self.state = State::Running {
                started_at: now,
                last_work: now,
            };
        }
    }

    pub fn tick(&mut self, now: Instant) -> Result<TickOutcome> {
        match self.state {
            State::Idle | State::Stopped => Ok(TickOutcome::Idle),
            State::Stopping { stop_at } => {
                if now < stop_at {
                    return Ok(TickOutcome::Flushing);
                }
                if let Some(sink) = self.sink.take() {
                    sink.finish()?;
                }
                self.state = State::Stopped;
                Ok(TickOutcome::Finished)
            }
            State::Running {
                started_at,
                last_work,
            } => {
                let min_gap = self.nominal_period.mul_f64(DEBOUNCE_FACTOR);
                if now.duration_since(last_work) < min_gap {
                    return Ok(TickOutcome::Debounced);
                }
                let elapsed = now.duration_since(started_at);
                if elapsed >= self.duration {
                    self.state = State::Stopping {
                        stop_at: now + FLUSH_DELAY,
                    };
                    return Ok(TickOutcome::Flushing);
                }

                let due = (elapsed.as_secs_f64() * f64::from(self.timeline.fps())).floor() as u32;
                let due = due.min(self.timeline.total_frames() - 1);
                if self.current_frame > due {
                    return Ok(TickOutcome::Idle);
                }

                let batch_end = due.min(self.current_frame + MAX_FRAMES_PER_TICK - 1);
                let mut rendered = 0;
                while self.current_frame <= batch_end {
                    if let Some(progress) = self.progress.as_mut() {
                        progress(self.current_frame, self.timeline.total_frames());
                    }
                    phases::render_frame(
                        &mut self.surface,
                        &self.scene,
                        &self.timeline,
                        self.current_frame,
                    )?;
                    if let Some(sink) = self.sink.as_mut() {
                        sink.write_frame(self.surface.to_rgba())?;
                    }
                    self.current_frame += 1;
                    rendered += 1;
                }
                self.state = State::Running {
                    started_at,
                    last_work: now,
                };
                Ok(TickOutcome::Rendered(rendered))
            }
        }
    }

    /// Real-time loop: polls well under the frame period and lets the
    /// debounce window set the pace. Returns once the sink is finalized.
    pub fn run(mut self) -> Result<()> {
        let poll = self.nominal_period.min(Duration::from_millis(5));
        self.start(Instant::now());
        loop {
            if self.tick(Instant::now())? == TickOutcome::Finished {
                return Ok(());
            }
            std::thread::sleep(poll);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AnimationDriver, TickOutcome, FLUSH_DELAY, MAX_FRAMES_PER_TICK};
    use crate::encoding::MemorySink;
    use crate::scene::SceneData;
    use crate::schema::{Environment, Profile, Resolution};
    use std::time::{Duration, Instant};

    fn test_env() -> Environment {
        Environment {
            resolution: Resolution {
                width: 160,
                height: 162,
            },
            fps: 30,
            duration_seconds: 10,
        }
    }

    fn test_driver(sink: MemorySink) -> AnimationDriver<MemorySink> {
        let profile = Profile {
            username: "quake42".to_owned(),
            region: "PNW".to_owned(),
            magnitude: "5.2".to_owned(),
        };
        let image = image::RgbaImage::from_pixel(32, 32, image::Rgba([80, 40, 60, 255]));
        let scene = SceneData::from_image(profile, image)
            .expect("scene")
            .prepare(&test_env())
            .expect("prepare");
        AnimationDriver::new(&test_env(), scene, sink).expect("driver")
    }

    #[test]
    fn tick_before_start_is_idle() {
        let mut driver = test_driver(MemorySink::new());
        assert_eq!(driver.tick(Instant::now()).unwrap(), TickOutcome::Idle);
    }

    #[test]
    fn rapid_ticks_are_debounced() {
        let mut driver = test_driver(MemorySink::new());
        let base = Instant::now();
        driver.start(base);
        assert_eq!(
            driver.tick(base + Duration::from_millis(1)).unwrap(),
            TickOutcome::Debounced
        );
        // The dropped tick must not shift the debounce window.
        assert_eq!(
            driver.tick(base + Duration::from_millis(34)).unwrap(),
            TickOutcome::Rendered(2)
        );
    }

    #[test]
    fn late_tick_catches_up_at_most_three_frames() {
        let sink = MemorySink::new();
        let handle = sink.handle();
        let mut driver = test_driver(sink);
        let base = Instant::now();
        driver.start(base);
        // A full second late: 30 frames are due, only 3 may render.
        let outcome = driver.tick(base + Duration::from_secs(1)).unwrap();
        assert_eq!(outcome, TickOutcome::Rendered(MAX_FRAMES_PER_TICK));
        assert_eq!(handle.frames().len(), 3);
        assert_eq!(driver.current_frame(), 3);
    }

    #[test]
    fn driver_never_renders_ahead_of_the_clock() {
        let mut driver = test_driver(MemorySink::new());
        let base = Instant::now();
        driver.start(base);
        // 40ms in: frames 0 and 1 are due.
        assert_eq!(
            driver.tick(base + Duration::from_millis(40)).unwrap(),
            TickOutcome::Rendered(2)
        );
        // 73ms in: only frame 2 is due, even though the previous tick could
        // have rendered one more.
        assert_eq!(
            driver.tick(base + Duration::from_millis(73)).unwrap(),
            TickOutcome::Rendered(1)
        );
        assert_eq!(driver.current_frame(), 3);
    }

    #[test]
    fn full_clip_delivers_every_frame_then_finishes_once() {
        let sink = MemorySink::new();
        let handle = sink.handle();
        let mut driver = test_driver(sink);
        let total = driver.total_frames();

        let base = Instant::now();
        driver.start(base);
        let step = Duration::from_micros(16_667);
        let mut now = base;
        let mut finishes = 0;
        for _ in 0..2000 {
            now += step;
            match driver.tick(now).unwrap() {
                TickOutcome::Finished => {
                    finishes += 1;
                    break;
                }
                _ => {}
            }
        }
        // Flush window: further ticks report Idle, never Finished again.
        now += FLUSH_DELAY;
        assert_eq!(driver.tick(now).unwrap(), TickOutcome::Idle);

        assert_eq!(finishes, 1);
        assert_eq!(handle.frames().len() as u32, total);
        assert_eq!(handle.finish_count(), 1);
    }

    #[test]
    fn jittery_clock_still_delivers_frames_in_order() {
        let sink = MemorySink::new();
        let handle = sink.handle();
        let mut driver = test_driver(sink);
        let total = driver.total_frames();

        let base = Instant::now();
        driver.start(base);
        let mut now = base;
        // Irregular gaps, some below the debounce window, some far above.
        let gaps_ms = [1_u64, 34, 7, 50, 120, 9, 33, 31, 2, 90];
        let mut i = 0;
        loop {
            now += Duration::from_millis(gaps_ms[i % gaps_ms.len()]);
            i += 1;
            if driver.tick(now).unwrap() == TickOutcome::Finished {
                break;
            }
            assert!(i < 5000, "driver failed to finish");
        }
        // The stop check runs before the render, so a jittery clock may drop
        // frames due right at the duration boundary, but never more than one
        // catch-up deficit's worth, and never a duplicate.
        let delivered = handle.frames().len() as u32;
        assert!(delivered <= total);
        assert!(
            delivered >= total - 2 * MAX_FRAMES_PER_TICK,
            "delivered {delivered} of {total}"
        );
        assert_eq!(handle.finish_count(), 1);
    }

    #[test]
    fn finish_waits_for_the_flush_delay() {
        let mut driver = test_driver(MemorySink::new());
        let base = Instant::now();
        driver.start(base);
        let past_end = base + Duration::from_secs(11);
        assert_eq!(driver.tick(past_end).unwrap(), TickOutcome::Flushing);
        assert_eq!(
            driver.tick(past_end + Duration::from_millis(100)).unwrap(),
            TickOutcome::Flushing
        );
        assert_eq!(
            driver.tick(past_end + FLUSH_DELAY).unwrap(),
            TickOutcome::Finished
        );
    }
}
