//! Line grammar for turtle commands.
//!
//! One command per line, matched case-insensitively after trimming. Lines are
//! ignored until the `draw mode` sentinel is seen; after that, anything that
//! does not match a command is skipped.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Line that switches a block of text into the turtle grammar.
pub const DRAW_MODE: &str = "draw mode";

const DEFAULT_STEP: f64 = 1.0;
const DEFAULT_TURN: f64 = 90.0;

static FORWARD: LazyLock<Regex> = LazyLock::new(|| command(r"forward"));
static FORWARD_N: LazyLock<Regex> = LazyLock::new(|| command(r"forward (\d+(?:\.\d+)?)"));
static LEFT: LazyLock<Regex> = LazyLock::new(|| command(r"left"));
static LEFT_N: LazyLock<Regex> = LazyLock::new(|| command(r"left (\d+(?:\.\d+)?)"));
static RIGHT: LazyLock<Regex> = LazyLock::new(|| command(r"right"));
static RIGHT_N: LazyLock<Regex> = LazyLock::new(|| command(r"right (\d+(?:\.\d+)?)"));
static COLOR_OFF: LazyLock<Regex> = LazyLock::new(|| command(r"(?:color|colour) off"));
static COLOR: LazyLock<Regex> = LazyLock::new(|| command(r"(?:color|colour) (.+)"));
static WIDTH_N: LazyLock<Regex> = LazyLock::new(|| command(r"width (\d+(?:\.\d+)?)"));
static SAY: LazyLock<Regex> = LazyLock::new(|| command(r"say (.+)"));

fn command(pattern: &str) -> Regex {
    // Patterns are literals above; a failure here is a programming error.
    Regex::new(&format!("(?i)^{pattern}$")).expect("command pattern must compile")
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Move forward this many board steps.
    Step(f64),
    /// Rotate counter-clockwise by this many degrees.
    TurnLeft(f64),
    /// Rotate clockwise by this many degrees.
    TurnRight(f64),
    /// Set the trail color; `None` stops drawing the trail.
    SetColor(Option<String>),
    SetWidth(f64),
    Say(String),
}

/// Canonical command text. Parsing the output yields the same `Command`.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Command::Step(n) => write!(f, "forward {n}"),
            Command::TurnLeft(n) => write!(f, "left {n}"),
            Command::TurnRight(n) => write!(f, "right {n}"),
            Command::SetColor(None) => f.write_str("color off"),
            Command::SetColor(Some(c)) => write!(f, "color {c}"),
            Command::SetWidth(n) => write!(f, "width {n}"),
            Command::Say(text) => write!(f, "say {text}"),
        }
    }
}

/// One parsed instruction together with the trimmed line it came from.
#[derive(Debug, Clone)]
pub struct Action {
    pub command: Command,
    pub raw: String,
}

/// Two actions are equal when they do the same thing, regardless of how the
/// source line was spelled (`forward` and `forward 1` compare equal).
impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        self.command == other.command
    }
}

/// Parse a block of lines, honouring the `draw mode` sentinel.
pub fn parse<I, S>(lines: I) -> Vec<Action>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .skip_while(|line| !is_sentinel(line.as_ref()))
        .skip(1)
        .filter_map(|line| parse_line(line.as_ref()))
        .collect()
}

fn is_sentinel(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case(DRAW_MODE)
}

/// Parse a whole script held in one string.
pub fn parse_str(script: &str) -> Vec<Action> {
    parse(script.lines())
}

/// Parse a single command line with no sentinel gating.
///
/// Returns `None` for anything that is not a recognised command.
pub fn parse_line(line: &str) -> Option<Action> {
    let line = line.trim();

    let command = if FORWARD.is_match(line) {
        Command::Step(DEFAULT_STEP)
    } else if let Some(n) = number(&FORWARD_N, line) {
        Command::Step(n)
    } else if LEFT.is_match(line) {
        Command::TurnLeft(DEFAULT_TURN)
    } else if let Some(n) = number(&LEFT_N, line) {
        Command::TurnLeft(n)
    } else if RIGHT.is_match(line) {
        Command::TurnRight(DEFAULT_TURN)
    } else if let Some(n) = number(&RIGHT_N, line) {
        Command::TurnRight(n)
    } else if COLOR_OFF.is_match(line) {
        Command::SetColor(None)
    } else if let Some(color) = text(&COLOR, line) {
        Command::SetColor(Some(color.to_ascii_lowercase()))
    } else if let Some(n) = number(&WIDTH_N, line) {
        Command::SetWidth(n)
    } else if let Some(said) = text(&SAY, line) {
        Command::Say(said.to_string())
    } else {
        return None;
    };

    Some(Action {
        command,
        raw: line.to_string(),
    })
}

fn text<'a>(re: &Regex, line: &'a str) -> Option<&'a str> {
    re.captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

// An unparsable number means the line is skipped like any other unknown line.
fn number(re: &Regex, line: &str) -> Option<f64> {
    text(re, line).and_then(|n| n.parse().ok())
}
