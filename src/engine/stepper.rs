//! Stepper — the per-actor animation state machine.
//!
//! Each call to `tick` advances one actor to a wall-clock instant and reports
//! what should appear on the surface plus when the actor wants to be woken
//! again. Nothing here touches a timer or a drawing API, so a test can drive
//! it by simply choosing instants.

use std::time::Duration;

use crate::config::BoardConfig;
use crate::script::Command;
use crate::types::{Point, Stroke};

use super::source::{Moves, Pull};

const INITIAL_WIDTH: f64 = 2.0;

/// Board-wide acceleration flags, read by every stepper on each tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pace {
    /// Snap every in-flight transition to its target.
    pub accelerate: bool,
    /// Acceleration was latched on and ends when the next step lands.
    pub latched: bool,
}

/// Board state a stepper reads (and, for `pace`, writes) on each tick.
pub struct StepContext<'a> {
    pub config: &'a BoardConfig,
    /// Pixels per board step.
    pub step_size: f64,
    pub pace: &'a mut Pace,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub angle: f64,
    /// Distance covered since the current transition started.
    pub distance: f64,
}

impl Pose {
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Trail style, kept across steps until a `color` or `width` action changes it.
#[derive(Debug, Clone, PartialEq)]
pub struct TrailStyle {
    pub color: Option<String>,
    pub width: f64,
}

impl Default for TrailStyle {
    fn default() -> Self {
        TrailStyle {
            color: None,
            width: INITIAL_WIDTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Step,
    Turn,
}

/// Start and target of the motion being interpolated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepTransition {
    pub motion: Motion,
    pub start: Point,
    pub start_angle: f64,
    pub target: Point,
    pub target_angle: f64,
    pub start_time: Duration,
    pub target_time: Duration,
    pub distance: f64,
}

impl StepTransition {
    pub fn duration(&self) -> Duration {
        self.target_time.saturating_sub(self.start_time)
    }

    /// Fraction of the transition covered at `now`, in `[0, 1]`.
    pub fn progress(&self, now: Duration) -> f64 {
        let total = self.duration();
        if total.is_zero() {
            return 1.0;
        }
        let passed = now.saturating_sub(self.start_time);
        (passed.as_secs_f64() / total.as_secs_f64()).clamp(0.0, 1.0)
    }
}

/// Something the surface should show as a result of a tick. Positions are
/// relative to the actor's spawn point.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Trail {
        from: Point,
        to: Point,
        stroke: Stroke,
    },
    Say {
        at: Point,
        text: String,
    },
    Pose {
        at: Point,
        angle: f64,
        walk_frame: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// Call again on the next animation frame.
    NextFrame,
    /// The move source had nothing; call again after this long.
    After(Duration),
    /// No more actions, ever.
    Finished,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub effects: Vec<Effect>,
    pub wake: Wake,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepperState {
    Idle,
    Stepping,
    Waiting,
    Finished,
}

#[derive(Debug)]
pub struct Stepper {
    moves: Moves,
    pose: Pose,
    style: TrailStyle,
    transition: Option<StepTransition>,
    state: StepperState,
}

impl Stepper {
    pub fn new(moves: Moves) -> Self {
        Stepper {
            moves,
            pose: Pose::default(),
            style: TrailStyle::default(),
            transition: None,
            state: StepperState::Idle,
        }
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn style(&self) -> &TrailStyle {
        &self.style
    }

    pub fn state(&self) -> StepperState {
        self.state
    }

    pub fn transition(&self) -> Option<&StepTransition> {
        self.transition.as_ref()
    }

    /// Advance the actor to `now`.
    pub fn tick(&mut self, now: Duration, ctx: &mut StepContext) -> Tick {
        let mut effects = Vec::new();

        if self.state == StepperState::Finished {
            return Tick {
                effects,
                wake: Wake::Finished,
            };
        }

        let due = match &self.transition {
            None => true,
            Some(t) => t.target_time <= now,
        };

        if due || ctx.pace.accelerate {
            self.land(ctx, &mut effects);

            if let Some(wake) = self.begin_next(now, ctx, &mut effects) {
                return Tick { effects, wake };
            }
        }

        if let Some(t) = self.transition {
            self.sub_step(&t, t.progress(now), ctx, &mut effects);
        }

        Tick {
            effects,
            wake: Wake::NextFrame,
        }
    }

    /// Snap the current transition (if any) to its target.
    fn land(&mut self, ctx: &mut StepContext, effects: &mut Vec<Effect>) {
        match self.transition.take() {
            Some(t) => {
                self.sub_step(&t, 1.0, ctx, effects);
                // A latched acceleration holds until a full stride lands.
                if t.motion == Motion::Step && ctx.pace.latched {
                    ctx.pace.accelerate = false;
                    ctx.pace.latched = false;
                }
            }
            None => effects.push(self.pose_effect(0)),
        }
        self.pose.distance = 0.0;
    }

    /// Pull actions until one of them moves the actor. Returns a wake request
    /// when no transition could be started.
    fn begin_next(
        &mut self,
        now: Duration,
        ctx: &mut StepContext,
        effects: &mut Vec<Effect>,
    ) -> Option<Wake> {
        loop {
            let action = match self.moves.pull() {
                Pull::Ready(action) => action,
                Pull::Waiting => {
                    self.state = StepperState::Waiting;
                    return Some(Wake::After(ctx.config.poll_interval()));
                }
                Pull::Done => {
                    self.state = StepperState::Finished;
                    return Some(Wake::Finished);
                }
            };

            let delay = ctx.config.step_delay();
            let start = self.pose.point();
            let angle = self.pose.angle;

            let (motion, target, target_angle, duration) = match action.command {
                Command::Step(n) => {
                    let rad = (angle - 90.0).to_radians();
                    let len = ctx.step_size * n;
                    let target = Point::new(start.x + rad.cos() * len, start.y + rad.sin() * len);
                    (Motion::Step, target, angle, scaled(delay, n))
                }
                // Clockwise is positive, matching screen rotation.
                Command::TurnLeft(n) => (Motion::Turn, start, angle - n, delay),
                Command::TurnRight(n) => (Motion::Turn, start, angle + n, delay),
                Command::SetColor(color) => {
                    self.style.color = color;
                    continue;
                }
                Command::SetWidth(width) => {
                    self.style.width = width;
                    continue;
                }
                Command::Say(text) => {
                    effects.push(Effect::Say { at: start, text });
                    continue;
                }
            };

            self.transition = Some(StepTransition {
                motion,
                start,
                start_angle: angle,
                target,
                target_angle,
                start_time: now,
                target_time: now.saturating_add(duration),
                distance: start.distance(&target),
            });
            self.state = StepperState::Stepping;
            return None;
        }
    }

    fn sub_step(
        &mut self,
        t: &StepTransition,
        progress: f64,
        ctx: &StepContext,
        effects: &mut Vec<Effect>,
    ) {
        let old = self.pose.point();

        self.pose.x = (t.target.x - t.start.x) * progress + t.start.x;
        self.pose.y = (t.target.y - t.start.y) * progress + t.start.y;
        self.pose.angle = (t.target_angle - t.start_angle) * progress + t.start_angle;
        self.pose.distance = t.distance * progress;

        let new = self.pose.point();
        if let Some(color) = &self.style.color {
            if old != new {
                effects.push(Effect::Trail {
                    from: old,
                    to: new,
                    stroke: Stroke {
                        color: color.clone(),
                        width: self.style.width,
                    },
                });
            }
        }

        let frame = walk_frame(
            self.pose.distance,
            ctx.config.walk_frame_distance,
            ctx.config.walk_frames,
        );
        effects.push(self.pose_effect(frame));
    }

    fn pose_effect(&self, walk_frame: u32) -> Effect {
        Effect::Pose {
            at: self.pose.point(),
            angle: self.pose.angle,
            walk_frame,
        }
    }
}

/// `delay × n`, saturating for absurdly large step counts.
fn scaled(delay: Duration, n: f64) -> Duration {
    Duration::try_from_secs_f64(delay.as_secs_f64() * n).unwrap_or(Duration::MAX)
}

/// Sprite-sheet frame for a walker that has covered `distance` pixels.
///
/// The cycle runs back and forth over `2 × frames − 1` virtual frames rather
/// than wrapping, and is shifted so the middle (standing) frame shows at zero
/// distance.
pub fn walk_frame(distance: f64, frame_distance: f64, frames: u32) -> u32 {
    let frames = frames.max(1);
    let virtual_frames = frames * 2 - 1;
    let rotation_frame = (frames - 1) / 2;

    let steps = if frame_distance > 0.0 {
        (distance.max(0.0) / frame_distance) as u64
    } else {
        0
    };
    let frame = ((steps % virtual_frames as u64) as u32 + rotation_frame) % virtual_frames;

    if frame > frames - 1 {
        virtual_frames - frame
    } else {
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{ActionSequence, parse_str};

    const MS: fn(u64) -> Duration = Duration::from_millis;

    fn stepper(script: &str) -> Stepper {
        Stepper::new(Moves::Script(ActionSequence::new(parse_str(script))))
    }

    struct Harness {
        config: BoardConfig,
        pace: Pace,
        step_size: f64,
    }

    impl Harness {
        fn new() -> Self {
            Harness {
                config: BoardConfig::default(),
                pace: Pace::default(),
                step_size: 10.0,
            }
        }

        fn tick(&mut self, s: &mut Stepper, now: Duration) -> Tick {
            let mut ctx = StepContext {
                config: &self.config,
                step_size: self.step_size,
                pace: &mut self.pace,
            };
            s.tick(now, &mut ctx)
        }

        /// Tick every `frame` until the stepper finishes; returns all effects.
        fn run(&mut self, s: &mut Stepper, frame: Duration) -> (Vec<Effect>, Duration) {
            let mut now = Duration::ZERO;
            let mut effects = Vec::new();
            loop {
                let tick = self.tick(s, now);
                effects.extend(tick.effects);
                if tick.wake == Wake::Finished {
                    return (effects, now);
                }
                now += frame;
            }
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn end_to_end_scenario() {
        let mut h = Harness::new();
        let mut s = stepper("draw mode\ncolor red\nforward 2\nright 90\nsay hi");

        let mut effects = Vec::new();
        for now in [MS(0), MS(1000), MS(1500)] {
            let tick = h.tick(&mut s, now);
            effects.extend(tick.effects);
            if now == MS(1500) {
                assert_eq!(tick.wake, Wake::Finished);
            }
        }

        let pose = s.pose();
        assert!(close(pose.x, 0.0));
        assert!(close(pose.y, -20.0), "heading 0 points up, got {}", pose.y);
        assert!(close(pose.angle, 90.0));

        let says: Vec<_> = effects
            .iter()
            .filter(|e| matches!(e, Effect::Say { .. }))
            .collect();
        assert_eq!(says.len(), 1);

        let trails: Vec<_> = effects
            .iter()
            .filter_map(|e| match e {
                Effect::Trail { from, to, stroke } => Some((from.distance(to), stroke.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(trails.len(), 1);
        assert!(close(trails[0].0, 20.0));
        assert_eq!(trails[0].1.color, "red");
        assert_eq!(s.state(), StepperState::Finished);
    }

    #[test]
    fn trail_is_sampled_per_tick() {
        let mut h = Harness::new();
        let mut s = stepper("draw mode\ncolor blue\nforward 2");
        let (effects, _) = h.run(&mut s, MS(100));

        let total: f64 = effects
            .iter()
            .filter_map(|e| match e {
                Effect::Trail { from, to, .. } => Some(from.distance(to)),
                _ => None,
            })
            .sum();
        let segments = effects
            .iter()
            .filter(|e| matches!(e, Effect::Trail { .. }))
            .count();
        assert!(close(total, 20.0));
        assert!(segments > 1);
    }

    #[test]
    fn step_duration_scales_with_magnitude() {
        let mut h = Harness::new();
        let mut one = stepper("draw mode\nforward 1");
        let mut two = stepper("draw mode\nforward 2");
        h.tick(&mut one, Duration::ZERO);
        h.tick(&mut two, Duration::ZERO);
        let d1 = one.transition().unwrap().duration();
        let d2 = two.transition().unwrap().duration();
        assert_eq!(d1, h.config.step_delay());
        assert_eq!(d2, d1 * 2);
    }

    #[test]
    fn turn_duration_is_constant() {
        let mut h = Harness::new();
        let mut small = stepper("draw mode\nleft 10");
        let mut large = stepper("draw mode\nleft 170");
        h.tick(&mut small, Duration::ZERO);
        h.tick(&mut large, Duration::ZERO);
        assert_eq!(
            small.transition().unwrap().duration(),
            large.transition().unwrap().duration()
        );
        assert!(close(large.transition().unwrap().target_angle, -170.0));
    }

    #[test]
    fn style_actions_take_no_time_and_do_not_move() {
        let mut h = Harness::new();
        let mut s = stepper("draw mode\ncolor green\nwidth 5\nsay one\nsay two");
        let tick = h.tick(&mut s, MS(0));
        assert_eq!(tick.wake, Wake::Finished);
        assert_eq!(s.pose(), Pose::default());
        assert_eq!(s.style().color.as_deref(), Some("green"));
        assert!(close(s.style().width, 5.0));
        let says = tick
            .effects
            .iter()
            .filter(|e| matches!(e, Effect::Say { .. }))
            .count();
        assert_eq!(says, 2);
    }

    #[test]
    fn interpolates_linearly_while_in_flight() {
        let mut h = Harness::new();
        let mut s = stepper("draw mode\nright 90\nforward 4");
        h.tick(&mut s, MS(0));
        h.tick(&mut s, MS(250));
        assert!(close(s.pose().angle, 45.0));
        assert_eq!(s.state(), StepperState::Stepping);

        // Turn lands at 500ms, the 4-step walk east takes 2s from there.
        h.tick(&mut s, MS(500));
        h.tick(&mut s, MS(1500));
        assert!(close(s.pose().x, 20.0));
        assert!(close(s.pose().y, 0.0));
        assert!(close(s.pose().distance, 20.0));
    }

    #[test]
    fn color_off_stops_the_trail() {
        let mut h = Harness::new();
        let mut s = stepper("draw mode\ncolor red\ncolor off\nforward");
        let (effects, _) = h.run(&mut s, MS(50));
        assert!(!effects.iter().any(|e| matches!(e, Effect::Trail { .. })));
    }

    #[test]
    fn zero_length_step_completes_on_next_tick() {
        let mut h = Harness::new();
        let mut s = stepper("draw mode\nforward 0");
        assert_eq!(h.tick(&mut s, MS(0)).wake, Wake::NextFrame);
        assert_eq!(h.tick(&mut s, MS(0)).wake, Wake::Finished);
    }

    #[test]
    fn acceleration_snaps_every_tick() {
        let mut h = Harness::new();
        h.pace.accelerate = true;
        let mut s = stepper("draw mode\nforward 3\nleft\nforward 3");
        let (_, finished_at) = h.run(&mut s, MS(1));
        assert_eq!(finished_at, MS(3));
        assert!(close(s.pose().x, -30.0));
        assert!(close(s.pose().y, -30.0));
        assert!(h.pace.accelerate);
    }

    #[test]
    fn latched_acceleration_ends_when_a_step_lands() {
        let mut h = Harness::new();
        let mut s = stepper("draw mode\nleft\nforward 2\nright\nforward 2");

        h.tick(&mut s, MS(0));
        h.pace = Pace {
            accelerate: true,
            latched: true,
        };
        // Snaps the turn; still accelerating.
        h.tick(&mut s, MS(1));
        assert!(h.pace.accelerate);
        // Snaps the step, which releases the latch.
        h.tick(&mut s, MS(2));
        assert_eq!(h.pace, Pace::default());
        assert!(close(s.pose().x, -20.0));
        assert_eq!(s.transition().unwrap().motion, Motion::Turn);
    }

    #[test]
    fn walk_frame_oscillates_from_the_middle() {
        let frames: Vec<u32> = (0..10).map(|i| walk_frame(i as f64 * 2.0, 2.0, 5)).collect();
        assert_eq!(frames, vec![2, 3, 4, 4, 3, 2, 1, 0, 1, 2]);
    }

    #[test]
    fn finished_stepper_stays_finished() {
        let mut h = Harness::new();
        let mut s = stepper("draw mode");
        assert_eq!(h.tick(&mut s, MS(0)).wake, Wake::Finished);
        let again = h.tick(&mut s, MS(10));
        assert_eq!(again.wake, Wake::Finished);
        assert!(again.effects.is_empty());
    }
}
