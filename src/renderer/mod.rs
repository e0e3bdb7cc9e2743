//! Renderer — the drawing surface contract and a terminal rasterizer.
//!
//! The board talks to a `Surface` in canvas pixels. `TermCanvas` implements
//! it on a fixed-size cell grid: strokes are painted into a persistent
//! background layer (like a 2D canvas), while actors and bubbles are overlays
//! composed on top each frame. Successive frames are emitted as cell diffs.

use std::collections::BTreeMap;

use crate::types::{BubbleId, Cell, CellChange, Color, NamedColor, Placement, Point, Stroke, Style};

/// Rendering surface the board draws on. It is owned by the host; the board
/// never creates one.
pub trait Surface {
    /// The canvas changed size. Previously drawn strokes are gone.
    fn resize(&mut self, width: f64, height: f64);
    fn draw_line(&mut self, from: Point, to: Point, stroke: &Stroke);
    fn spawn_actor(&mut self, id: &str, sprite: &str);
    /// Translate + rotate an actor and pick its sprite-sheet offset.
    fn place_actor(&mut self, id: &str, placement: Placement);
    /// Drop an actor's transform until it is placed again.
    fn reset_actor(&mut self, id: &str);
    /// Show `text` centered on `at`.
    fn show_bubble(&mut self, bubble: BubbleId, at: Point, text: &str);
    fn remove_bubble(&mut self, bubble: BubbleId);
}

/// Horizontal canvas pixels per terminal column.
pub const PX_PER_COL: f64 = 1.0;
/// Vertical canvas pixels per terminal row; cells are about twice as tall as wide.
pub const PX_PER_ROW: f64 = 2.0;

/// Headings from 0° (up) clockwise in 45° sectors.
const HEADINGS: [char; 8] = ['↑', '↗', '→', '↘', '↓', '↙', '←', '↖'];

#[derive(Debug, Clone)]
struct Sprite {
    color: Color,
    placement: Option<Placement>,
}

#[derive(Debug, Default)]
pub struct TermCanvas {
    cols: u16,
    rows: u16,
    background: Vec<Vec<Cell>>,
    sprites: BTreeMap<String, Sprite>,
    bubbles: BTreeMap<BubbleId, (Point, String)>,
    prev: Option<Vec<Vec<Cell>>>,
    /// Sprite-sheet frame width, used to tell walk frames apart.
    walk_frame_size: i32,
}

impl TermCanvas {
    pub fn new(cols: u16, rows: u16) -> Self {
        let mut canvas = TermCanvas {
            walk_frame_size: 50,
            ..Default::default()
        };
        canvas.set_cells(cols, rows);
        canvas
    }

    pub fn with_walk_frame_size(mut self, size: i32) -> Self {
        self.walk_frame_size = size;
        self
    }

    pub fn cols(&self) -> u16 {
        self.cols
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    /// Canvas size in pixels for a grid of this many cells.
    pub fn pixel_size(cols: u16, rows: u16) -> (f64, f64) {
        (cols as f64 * PX_PER_COL, rows as f64 * PX_PER_ROW)
    }

    fn set_cells(&mut self, cols: u16, rows: u16) {
        self.cols = cols;
        self.rows = rows;
        self.background = vec![vec![Cell::default(); cols as usize]; rows as usize];
        self.prev = None;
    }

    fn cell_of(&self, p: Point) -> Option<(usize, usize)> {
        let col = (p.x / PX_PER_COL).floor();
        let row = (p.y / PX_PER_ROW).floor();
        if col < 0.0 || row < 0.0 || col >= self.cols as f64 || row >= self.rows as f64 {
            return None;
        }
        Some((col as usize, row as usize))
    }

    /// Compose background, actors and bubbles into one grid.
    pub fn compose(&self) -> Vec<Vec<Cell>> {
        let mut grid = self.background.clone();

        for sprite in self.sprites.values() {
            let Some(placement) = sprite.placement else {
                continue;
            };
            if let Some((col, row)) = self.cell_of(Point::new(placement.x, placement.y)) {
                grid[row][col] = Cell {
                    ch: heading_glyph(placement.angle),
                    style: Style {
                        fg: Some(sprite.color),
                        // Alternate weight with the walk cycle.
                        bold: (placement.sprite_offset / self.walk_frame_size.max(1)) % 2 == 0,
                        ..Default::default()
                    },
                };
            }
        }

        let bubble_style = Style {
            fg: Some(Color::Named(NamedColor::Black)),
            bg: Some(Color::Named(NamedColor::White)),
            ..Default::default()
        };
        for (at, text) in self.bubbles.values() {
            let label: Vec<char> = format!(" {text} ").chars().collect();
            let center_col = (at.x / PX_PER_COL).floor() as i64;
            let row = (at.y / PX_PER_ROW).floor() as i64;
            if row < 0 || row >= self.rows as i64 {
                continue;
            }
            let start = center_col - label.len() as i64 / 2;
            for (i, ch) in label.into_iter().enumerate() {
                let col = start + i as i64;
                if col >= 0 && col < self.cols as i64 {
                    grid[row as usize][col as usize] = Cell {
                        ch,
                        style: bubble_style.clone(),
                    };
                }
            }
        }

        grid
    }

    /// Changes since the previously returned frame. The first frame after a
    /// resize lists every cell.
    pub fn frame_changes(&mut self) -> Vec<CellChange> {
        let grid = self.compose();
        let changes = match &self.prev {
            None => full(&grid),
            Some(prev) => diff(prev, &grid),
        };
        self.prev = Some(grid);
        changes
    }

    /// Forget the last emitted frame so the next one is sent in full.
    pub fn invalidate(&mut self) {
        self.prev = None;
    }
}

impl Surface for TermCanvas {
    fn resize(&mut self, width: f64, height: f64) {
        let cols = (width / PX_PER_COL).floor().clamp(0.0, u16::MAX as f64) as u16;
        let rows = (height / PX_PER_ROW).floor().clamp(0.0, u16::MAX as f64) as u16;
        self.set_cells(cols, rows);
    }

    fn draw_line(&mut self, from: Point, to: Point, stroke: &Stroke) {
        let (color, alpha) =
            Color::parse(&stroke.color).unwrap_or((Color::Named(NamedColor::White), 1.0));
        let cell = stroke_cell(color, alpha, stroke.width);

        let (w, h) = Self::pixel_size(self.cols, self.rows);
        let Some((from, to)) = clip(from, to, w, h) else {
            return;
        };

        // Sample once per cell along the longer axis.
        let dc = (to.x - from.x) / PX_PER_COL;
        let dr = (to.y - from.y) / PX_PER_ROW;
        let steps = dc.abs().max(dr.abs()).ceil().max(1.0) as usize;

        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let p = Point::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t);
            if let Some((col, row)) = self.cell_of(p) {
                let target = &mut self.background[row][col];
                // Faint grid never paints over a trail.
                if alpha < 1.0 && target.ch != ' ' && !target.style.dim {
                    continue;
                }
                *target = cell.clone();
            }
        }
    }

    fn spawn_actor(&mut self, id: &str, sprite: &str) {
        let color = Color::parse(sprite)
            .map(|(c, _)| c)
            .unwrap_or(Color::Named(NamedColor::Cyan));
        self.sprites.insert(
            id.to_string(),
            Sprite {
                color,
                placement: None,
            },
        );
    }

    fn place_actor(&mut self, id: &str, placement: Placement) {
        if let Some(sprite) = self.sprites.get_mut(id) {
            sprite.placement = Some(placement);
        }
    }

    fn reset_actor(&mut self, id: &str) {
        if let Some(sprite) = self.sprites.get_mut(id) {
            sprite.placement = None;
        }
    }

    fn show_bubble(&mut self, bubble: BubbleId, at: Point, text: &str) {
        self.bubbles.insert(bubble, (at, text.to_string()));
    }

    fn remove_bubble(&mut self, bubble: BubbleId) {
        self.bubbles.remove(&bubble);
    }
}

/// Liang–Barsky clip of a segment to `[0, w] × [0, h]`. `None` when nothing
/// of it is visible.
fn clip(from: Point, to: Point, w: f64, h: f64) -> Option<(Point, Point)> {
    if ![from.x, from.y, to.x, to.y].iter().all(|v| v.is_finite()) {
        return None;
    }
    let (dx, dy) = (to.x - from.x, to.y - from.y);
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);

    for (p, q) in [(-dx, from.x), (dx, w - from.x), (-dy, from.y), (dy, h - from.y)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    let at = |t: f64| Point::new(from.x + dx * t, from.y + dy * t);
    Some((at(t0), at(t1)))
}

fn heading_glyph(angle: f64) -> char {
    let sector = (angle.rem_euclid(360.0) / 45.0).round() as usize % HEADINGS.len();
    HEADINGS[sector]
}

fn stroke_cell(color: Color, alpha: f64, width: f64) -> Cell {
    if alpha < 1.0 {
        // Grid lines: heavier strokes get a more visible glyph.
        let ch = if alpha >= 0.15 { '+' } else { '·' };
        return Cell {
            ch,
            style: Style {
                dim: true,
                ..Default::default()
            },
        };
    }
    let ch = if width >= 4.0 { '█' } else { '•' };
    Cell {
        ch,
        style: Style {
            fg: Some(color),
            ..Default::default()
        },
    }
}

fn full(grid: &[Vec<Cell>]) -> Vec<CellChange> {
    grid.iter()
        .enumerate()
        .flat_map(|(y, row)| {
            row.iter().enumerate().map(move |(x, cell)| CellChange {
                x: x as u16,
                y: y as u16,
                cell: cell.clone(),
            })
        })
        .collect()
}

/// Compute a cell-level diff between two grids.
fn diff(prev: &[Vec<Cell>], next: &[Vec<Cell>]) -> Vec<CellChange> {
    let mut changes = Vec::new();
    for (y, (prev_row, next_row)) in prev.iter().zip(next.iter()).enumerate() {
        for (x, (prev_cell, next_cell)) in prev_row.iter().zip(next_row.iter()).enumerate() {
            if prev_cell != next_cell {
                changes.push(CellChange {
                    x: x as u16,
                    y: y as u16,
                    cell: next_cell.clone(),
                });
            }
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red() -> Stroke {
        Stroke {
            color: "red".into(),
            width: 2.0,
        }
    }

    #[test]
    fn pixels_map_to_cells() {
        let mut canvas = TermCanvas::new(10, 5);
        let (w, h) = TermCanvas::pixel_size(10, 5);
        assert_eq!((w, h), (10.0, 10.0));
        canvas.resize(w, h);
        assert_eq!((canvas.cols(), canvas.rows()), (10, 5));
    }

    #[test]
    fn lines_paint_the_background() {
        let mut canvas = TermCanvas::new(10, 5);
        canvas.draw_line(Point::new(0.5, 1.0), Point::new(9.5, 1.0), &red());
        let grid = canvas.compose();
        assert!(grid[0].iter().all(|c| c.ch == '•'));
        assert_eq!(grid[0][3].style.fg, Some(Color::Named(NamedColor::Red)));
        assert!(grid[1].iter().all(|c| c.ch == ' '));
    }

    #[test]
    fn grid_does_not_cover_trails() {
        let mut canvas = TermCanvas::new(4, 1);
        canvas.draw_line(Point::new(0.0, 0.0), Point::new(3.5, 0.0), &red());
        canvas.draw_line(
            Point::new(0.0, 0.0),
            Point::new(3.5, 0.0),
            &Stroke {
                color: "rgba(0, 0, 0, 0.05)".into(),
                width: 1.0,
            },
        );
        assert!(canvas.compose()[0].iter().all(|c| c.ch == '•'));
    }

    #[test]
    fn actors_and_bubbles_overlay_without_touching_background() {
        let mut canvas = TermCanvas::new(20, 5);
        canvas.spawn_actor("a", "red");
        canvas.place_actor(
            "a",
            Placement {
                x: 5.0,
                y: 4.0,
                angle: 90.0,
                sprite_offset: -100,
            },
        );
        canvas.show_bubble(1, Point::new(10.0, 8.0), "hi");
        let grid = canvas.compose();
        assert_eq!(grid[2][5].ch, '→');
        let text: String = grid[4].iter().map(|c| c.ch).collect();
        assert!(text.contains(" hi "));

        canvas.remove_bubble(1);
        canvas.reset_actor("a");
        let grid = canvas.compose();
        assert!(grid.iter().flatten().all(|c| c.ch == ' '));
    }

    #[test]
    fn frames_are_full_then_diffs() {
        let mut canvas = TermCanvas::new(4, 2);
        assert_eq!(canvas.frame_changes().len(), 8);
        assert!(canvas.frame_changes().is_empty());
        canvas.draw_line(Point::new(0.0, 0.0), Point::new(0.0, 0.0), &red());
        assert_eq!(canvas.frame_changes().len(), 1);
        canvas.invalidate();
        assert_eq!(canvas.frame_changes().len(), 8);
    }

    #[test]
    fn malformed_hex_colors_fall_back_to_white() {
        assert_eq!(Color::parse("#aébbb"), None);
        let mut canvas = TermCanvas::new(4, 1);
        canvas.draw_line(
            Point::new(0.0, 0.0),
            Point::new(3.5, 0.0),
            &Stroke {
                color: "#aébbb".into(),
                width: 2.0,
            },
        );
        let grid = canvas.compose();
        assert!(grid[0].iter().all(|c| c.ch == '•'));
        assert_eq!(grid[0][0].style.fg, Some(Color::Named(NamedColor::White)));
    }

    #[test]
    fn huge_segments_are_clipped_to_the_canvas() {
        let mut canvas = TermCanvas::new(80, 40);
        canvas.draw_line(Point::new(0.0, 1.0), Point::new(1e12, 1.0), &red());
        canvas.draw_line(Point::new(-1e12, 5.0), Point::new(1e12, 5.0), &red());
        let grid = canvas.compose();
        assert!(grid[0].iter().all(|c| c.ch == '•'));
        assert!(grid[2].iter().all(|c| c.ch == '•'));
        assert!(grid[1].iter().all(|c| c.ch == ' '));
    }

    #[test]
    fn segments_off_the_canvas_paint_nothing() {
        let mut canvas = TermCanvas::new(10, 5);
        canvas.draw_line(Point::new(-50.0, -50.0), Point::new(-1e12, 3.0), &red());
        canvas.draw_line(Point::new(0.0, f64::NAN), Point::new(5.0, 5.0), &red());
        assert!(canvas.compose().iter().flatten().all(|c| c.ch == ' '));
    }

    #[test]
    fn heading_glyphs_cover_the_compass() {
        assert_eq!(heading_glyph(0.0), '↑');
        assert_eq!(heading_glyph(-90.0), '←');
        assert_eq!(heading_glyph(450.0), '→');
        assert_eq!(heading_glyph(200.0), '↓');
    }
}
