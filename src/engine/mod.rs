//! Engine — the board and the actors animated on it.
//!
//! The board owns the canvas scale, the background grid and every connected
//! actor. It steps actors when they ask to be woken and forwards what they
//! produce to a `Surface`. It never deals with terminals or timers; the
//! caller supplies the current instant.

pub mod source;
pub mod stepper;

use std::collections::BTreeMap;
use std::time::Duration;

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::BoardConfig;
use crate::renderer::Surface;
use crate::types::{BubbleId, Placement, Point, Stroke};

use source::Actor;
use stepper::{Effect, Pace, StepContext, Stepper, StepperState, Wake, walk_frame};

/// Sprite colors handed out to new actors.
pub const SPRITE_COLORS: &[&str] = &[
    "original",
    "periwinkle",
    "yellow",
    "red",
    "orange",
    "lime-green",
    "forest-green",
    "purple",
    "gray",
    "brown",
    "fuschia",
    "hot-pink",
];

const GRID_LINE_WIDTH: f64 = 1.0;
const GRID_STROKE: &str = "rgba(0, 0, 0, 0.05)";
const FIFTH_STROKE: &str = "rgba(0, 0, 0, 0.09)";
const CENTER_STROKE: &str = "rgba(0, 0, 0, 0.16)";

/// Keyboard signals that change how fast every actor steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Accelerate while held.
    HoldPressed,
    HoldReleased,
    /// Accelerate until the next full step lands.
    LatchPressed,
    LatchReleased,
}

#[derive(Debug)]
pub struct ActorRecord {
    pub stepper: Stepper,
    /// Spawn point relative to the board center, in pixels.
    pub offset: Point,
    pub sprite: &'static str,
    /// When the actor next wants a tick; `None` once it has finished.
    wake_at: Option<Duration>,
}

impl ActorRecord {
    pub fn is_finished(&self) -> bool {
        self.stepper.state() == StepperState::Finished
    }
}

pub struct Board {
    config: BoardConfig,
    width: f64,
    height: f64,
    step_size: f64,
    pace: Pace,
    actors: BTreeMap<String, ActorRecord>,
    bubbles: Vec<(BubbleId, Duration)>,
    next_bubble: BubbleId,
    rng: StdRng,
}

impl Board {
    pub fn new(config: BoardConfig) -> Self {
        Self::with_rng(config, StdRng::from_rng(&mut rand::rng()))
    }

    pub fn with_rng(config: BoardConfig, rng: StdRng) -> Self {
        Board {
            config,
            width: 0.0,
            height: 0.0,
            step_size: 0.0,
            pace: Pace::default(),
            actors: BTreeMap::new(),
            bubbles: Vec::new(),
            next_bubble: 0,
            rng,
        }
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// Pixels per board step.
    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    pub fn pace(&self) -> Pace {
        self.pace
    }

    pub fn actors(&self) -> &BTreeMap<String, ActorRecord> {
        &self.actors
    }

    pub fn actor(&self, id: &str) -> Option<&ActorRecord> {
        self.actors.get(id)
    }

    /// True once every connected actor has finished and no bubble is showing.
    pub fn is_settled(&self) -> bool {
        self.bubbles.is_empty() && self.actors.values().all(ActorRecord::is_finished)
    }

    // -----------------------------------------------------------------------
    // Scale and grid
    // -----------------------------------------------------------------------

    /// Adopt a new canvas size. Recomputes the step size, redraws the grid and
    /// resets every actor visual; each actor's next tick places it again.
    pub fn resize(&mut self, width: f64, height: f64, surface: &mut dyn Surface) {
        self.width = width;
        self.height = height;
        // "+1" adds half a step of margin on each side.
        let cells = self.config.steps_in_each_direction as f64 * 2.0 + 1.0;
        self.step_size = width.min(height) / cells;

        surface.resize(width, height);
        self.render_grid(surface);
        for id in self.actors.keys() {
            surface.reset_actor(id);
        }
    }

    fn render_grid(&self, surface: &mut dyn Surface) {
        if self.step_size <= 0.0 {
            return;
        }
        let cx = self.width / 2.0;
        let cy = self.height / 2.0;
        let nx = (cx / self.step_size) as i64 + 1;
        let ny = (cy / self.step_size) as i64 + 1;

        let stroke = |i: i64| Stroke {
            color: match i {
                0 => CENTER_STROKE,
                i if i % 5 == 0 => FIFTH_STROKE,
                _ => GRID_STROKE,
            }
            .to_string(),
            width: GRID_LINE_WIDTH,
        };

        for x in -nx..=nx {
            let px = cx + x as f64 * self.step_size;
            surface.draw_line(Point::new(px, 0.0), Point::new(px, self.height), &stroke(x));
        }
        for y in -ny..=ny {
            let py = cy + y as f64 * self.step_size;
            surface.draw_line(Point::new(0.0, py), Point::new(self.width, py), &stroke(y));
        }
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    pub fn signal(&mut self, signal: Signal) {
        match signal {
            Signal::HoldPressed => self.pace.accelerate = true,
            Signal::HoldReleased => self.pace.accelerate = false,
            Signal::LatchPressed => {
                self.pace.accelerate = true;
                self.pace.latched = true;
            }
            // The latch is released by the stepper, not the key.
            Signal::LatchReleased => {}
        }
    }

    /// Flip the held-acceleration state, for terminals that never report
    /// key releases.
    pub fn toggle_hold(&mut self) {
        let signal = if self.pace.accelerate {
            Signal::HoldReleased
        } else {
            Signal::HoldPressed
        };
        self.signal(signal);
    }

    // -----------------------------------------------------------------------
    // Actors
    // -----------------------------------------------------------------------

    /// Connect every actor whose id is not on the board yet. Returns how many
    /// were added.
    pub fn connect(&mut self, actors: Vec<Actor>, now: Duration, surface: &mut dyn Surface) -> usize {
        let mut added = 0;

        for actor in actors {
            if self.actors.contains_key(&actor.id) {
                continue;
            }

            let sprite = SPRITE_COLORS[self.rng.random_range(0..SPRITE_COLORS.len())];
            let offset = Point::new(
                self.spawn_coordinate(self.width),
                self.spawn_coordinate(self.height),
            );
            info!(
                "Connected actor {} ({sprite}) at {:.0},{:.0}",
                actor.id, offset.x, offset.y
            );

            surface.spawn_actor(&actor.id, sprite);
            let at = canvas_point(self.width, self.height, offset, Point::default());
            surface.place_actor(
                &actor.id,
                Placement {
                    x: at.x,
                    y: at.y,
                    angle: 0.0,
                    sprite_offset: self.sprite_offset(0.0),
                },
            );

            self.actors.insert(
                actor.id,
                ActorRecord {
                    stepper: Stepper::new(actor.moves),
                    offset,
                    sprite,
                    wake_at: Some(now.saturating_add(self.config.first_step_delay())),
                },
            );
            added += 1;
        }

        added
    }

    fn spawn_coordinate(&mut self, extent: f64) -> f64 {
        let span = (extent * self.config.spawn_fraction) as i64;
        if span <= 0 {
            return 0.0;
        }
        (self.rng.random_range(0..span) - span / 2) as f64
    }

    fn sprite_offset(&self, distance: f64) -> i32 {
        let frame = walk_frame(
            distance,
            self.config.walk_frame_distance,
            self.config.walk_frames,
        );
        -(frame as i32) * self.config.walk_frame_size
    }

    /// Step every actor that is due at `now` and expire old bubbles.
    pub fn advance(&mut self, now: Duration, surface: &mut dyn Surface) {
        self.bubbles.retain(|&(bubble, expires_at)| {
            if expires_at <= now {
                surface.remove_bubble(bubble);
                false
            } else {
                true
            }
        });

        let (width, height) = (self.width, self.height);

        for (id, record) in self.actors.iter_mut() {
            let due = matches!(record.wake_at, Some(at) if at <= now);
            if !due {
                continue;
            }

            let mut ctx = StepContext {
                config: &self.config,
                step_size: self.step_size,
                pace: &mut self.pace,
            };
            let tick = record.stepper.tick(now, &mut ctx);

            for effect in tick.effects {
                match effect {
                    Effect::Trail { from, to, stroke } => surface.draw_line(
                        canvas_point(width, height, record.offset, from),
                        canvas_point(width, height, record.offset, to),
                        &stroke,
                    ),
                    Effect::Say { at, text } => {
                        let bubble = self.next_bubble;
                        self.next_bubble += 1;
                        surface.show_bubble(
                            bubble,
                            canvas_point(width, height, record.offset, at),
                            &text,
                        );
                        self.bubbles
                            .push((bubble, now.saturating_add(self.config.bubble_ttl())));
                    }
                    Effect::Pose {
                        at,
                        angle,
                        walk_frame,
                    } => {
                        let at = canvas_point(width, height, record.offset, at);
                        surface.place_actor(
                            id,
                            Placement {
                                x: at.x,
                                y: at.y,
                                angle,
                                sprite_offset: -(walk_frame as i32) * self.config.walk_frame_size,
                            },
                        );
                    }
                }
            }

            record.wake_at = match tick.wake {
                Wake::NextFrame => Some(now),
                Wake::After(delay) => Some(now.saturating_add(delay)),
                Wake::Finished => None,
            };
        }
    }
}

/// Actor-relative position to canvas pixels.
fn canvas_point(width: f64, height: f64, offset: Point, p: Point) -> Point {
    Point::new(width / 2.0 + offset.x + p.x, height / 2.0 + offset.y + p.y)
}
