use std::path::{Path, PathBuf};
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, ModifierKeyCode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub first_step_delay_ms: u64,
    pub step_delay_ms: u64,
    /// Should be longer than the bubble fade animation of the surface.
    pub bubble_ttl_ms: u64,
    pub poll_interval_ms: u64,
    pub frame_interval_ms: u64,
    /// Timeout for the watcher's requests. Requests run on the frame loop, so
    /// keep this well under `poll_interval_ms`.
    pub request_timeout_ms: u64,

    /// How many cells are visible in each direction from the center of the
    /// board, measured along the smallest canvas dimension.
    pub steps_in_each_direction: u32,
    /// Fraction of the board, per axis, that new actors may spawn in.
    pub spawn_fraction: f64,

    /// Distance in pixels along the path between walk animation frames.
    pub walk_frame_distance: f64,
    pub walk_frames: u32,
    /// Width in pixels of one frame in the sprite sheet.
    pub walk_frame_size: i32,

    pub key_bindings: KeyBindings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub accelerate_hold: String,
    pub accelerate_latch: String,
    pub quit: String,
}

impl Default for BoardConfig {
    fn default() -> Self {
        BoardConfig {
            first_step_delay_ms: 500,
            step_delay_ms: 500,
            bubble_ttl_ms: 5000,
            poll_interval_ms: 1000,
            frame_interval_ms: 16,
            request_timeout_ms: 250,
            steps_in_each_direction: 15,
            spawn_fraction: 0.6,
            walk_frame_distance: 2.0,
            walk_frames: 5,
            walk_frame_size: 50,
            key_bindings: KeyBindings::default(),
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        KeyBindings {
            accelerate_hold: "Shift".into(),
            accelerate_latch: "Tab".into(),
            quit: "q".into(),
        }
    }
}

impl BoardConfig {
    /// Load from the user config file, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!("invalid board config {} ({e}), using defaults", path.display());
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    fn config_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        let mut path = PathBuf::from(home);
        path.push(".config");
        path.push("drawboard");
        path.push("config.json");
        path
    }

    pub fn first_step_delay(&self) -> Duration {
        Duration::from_millis(self.first_step_delay_ms)
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn bubble_ttl(&self) -> Duration {
        Duration::from_millis(self.bubble_ttl_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }
}

/// Check whether a crossterm `KeyEvent` matches a binding string from config.
pub fn matches_binding(binding: &str, event: &KeyEvent) -> bool {
    if let Some(rest) = binding.strip_prefix("Alt-") {
        return event.modifiers.contains(KeyModifiers::ALT) && matches_plain(rest, event);
    }

    if let Some(rest) = binding.strip_prefix("Ctrl-") {
        return event.modifiers.contains(KeyModifiers::CONTROL) && matches_plain(rest, event);
    }

    // Modifier keys arrive as their own key codes when the terminal reports
    // them, and as a modifier flag on whatever else is pressed.
    if binding == "Shift" {
        return matches!(
            event.code,
            KeyCode::Modifier(ModifierKeyCode::LeftShift | ModifierKeyCode::RightShift)
        );
    }

    // Reject plain bindings while Ctrl or Alt is held, so "q" does not fire on Ctrl-q.
    if event.modifiers.contains(KeyModifiers::CONTROL)
        || event.modifiers.contains(KeyModifiers::ALT)
    {
        return false;
    }

    matches_plain(binding, event)
}

fn matches_plain(binding: &str, event: &KeyEvent) -> bool {
    match binding {
        "Right" => event.code == KeyCode::Right,
        "Left" => event.code == KeyCode::Left,
        "Up" => event.code == KeyCode::Up,
        "Down" => event.code == KeyCode::Down,
        "Enter" => event.code == KeyCode::Enter,
        "Esc" => event.code == KeyCode::Esc,
        "Space" => event.code == KeyCode::Char(' '),
        // Shift-Tab is reported as BackTab.
        "Tab" => matches!(event.code, KeyCode::Tab | KeyCode::BackTab),
        "Backspace" => event.code == KeyCode::Backspace,
        s => {
            if let Some(rest) = s.strip_prefix('F') {
                if let Ok(n) = rest.parse::<u8>() {
                    return event.code == KeyCode::F(n);
                }
            }
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => event.code == KeyCode::Char(c),
                _ => false,
            }
        }
    }
}
