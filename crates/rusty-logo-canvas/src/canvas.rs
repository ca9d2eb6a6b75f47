//! Fixed-size drawing grid and its text rendering.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default canvas width in cells.
pub const DEFAULT_WIDTH: u16 = 31;
/// Default canvas height in cells.
pub const DEFAULT_HEIGHT: u16 = 31;

/// Marker for a drawn cell in [`RenderStyle::Plain`].
pub const DRAWN_MARKER: char = '#';
/// Marker for an empty cell in [`RenderStyle::Plain`].
pub const EMPTY_MARKER: char = '.';

/// Marker for a drawn cell in [`RenderStyle::Framed`].
pub const FRAMED_DRAWN_MARKER: char = '*';
/// Marker for an empty cell in [`RenderStyle::Framed`].
pub const FRAMED_EMPTY_MARKER: char = ' ';
const FRAME_TOP_LEFT: char = '\u{2554}';
const FRAME_TOP_RIGHT: char = '\u{2557}';
const FRAME_BOTTOM_RIGHT: char = '\u{255d}';
const FRAME_BOTTOM_LEFT: char = '\u{255a}';
const FRAME_HORIZONTAL: char = '\u{2550}';
const FRAME_VERTICAL: char = '\u{2551}';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CanvasError {
    #[error("Invalid canvas size {width}x{height}: both dimensions must be positive")]
    InvalidSize { width: u16, height: u16 },
}

/// A cell coordinate. `x` grows to the right, `y` grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: u16,
    pub y: u16,
}

impl Point {
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// Formats as `(x,y)`, the wire form of a `coord` reply.
impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// How a canvas is turned into text lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStyle {
    /// One line per row, `#` for drawn cells and `.` for empty ones.
    #[default]
    Plain,
    /// `*` on blank background inside a box-drawing frame, followed by an
    /// empty line that marks the end of the rendering.
    Framed,
}

impl RenderStyle {
    fn markers(self) -> (char, char) {
        match self {
            RenderStyle::Plain => (DRAWN_MARKER, EMPTY_MARKER),
            RenderStyle::Framed => (FRAMED_DRAWN_MARKER, FRAMED_EMPTY_MARKER),
        }
    }
}

/// Dense row-major grid of drawn/empty cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u16,
    height: u16,
    cells: Vec<bool>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl Canvas {
    /// Create an empty canvas.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero. Use [`Canvas::try_new`] for sizes
    /// that come from user configuration.
    pub fn new(width: u16, height: u16) -> Self {
        match Self::try_new(width, height) {
            Ok(canvas) => canvas,
            Err(e) => panic!("{e}"),
        }
    }

    pub fn try_new(width: u16, height: u16) -> Result<Self, CanvasError> {
        if width == 0 || height == 0 {
            return Err(CanvasError::InvalidSize { width, height });
        }
        Ok(Self {
            width,
            height,
            cells: vec![false; usize::from(width) * usize::from(height)],
        })
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Center cell, rounded toward the top-left for even dimensions.
    pub fn center(&self) -> Point {
        Point::new(self.width / 2, self.height / 2)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x < self.width && p.y < self.height
    }

    pub fn is_drawn(&self, p: Point) -> bool {
        self.contains(p) && self.cells[self.index(p)]
    }

    pub fn drawn_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Mark a single cell.
    ///
    /// # Panics
    ///
    /// Panics if `p` lies outside the canvas.
    pub fn draw_cell(&mut self, p: Point) {
        self.set_cell(p, true);
    }

    /// Clear a single cell. Same contract as [`Canvas::draw_cell`].
    pub fn erase_cell(&mut self, p: Point) {
        self.set_cell(p, false);
    }

    fn set_cell(&mut self, p: Point, value: bool) {
        self.assert_in_bounds(p);
        let i = self.index(p);
        self.cells[i] = value;
    }

    /// Mark every cell on the straight path from `from` to `to`, both ends
    /// included. Does nothing when the points are equal.
    ///
    /// # Panics
    ///
    /// Panics if either point lies outside the canvas or the segment is not
    /// horizontal or vertical. Both mean the caller failed to clamp.
    pub fn draw_segment(&mut self, from: Point, to: Point) {
        self.fill_segment(from, to, true);
    }

    /// Clear every cell on the straight path from `from` to `to`. Same
    /// contract as [`Canvas::draw_segment`].
    pub fn erase_segment(&mut self, from: Point, to: Point) {
        self.fill_segment(from, to, false);
    }

    fn fill_segment(&mut self, from: Point, to: Point, value: bool) {
        self.assert_in_bounds(from);
        self.assert_in_bounds(to);
        if from == to {
            return;
        }
        assert!(
            from.x == to.x || from.y == to.y,
            "diagonal segment {from} -> {to} cannot be drawn"
        );

        if from.x == to.x {
            let (lo, hi) = (from.y.min(to.y), from.y.max(to.y));
            for y in lo..=hi {
                let i = self.index(Point::new(from.x, y));
                self.cells[i] = value;
            }
        } else {
            let (lo, hi) = (from.x.min(to.x), from.x.max(to.x));
            for x in lo..=hi {
                let i = self.index(Point::new(x, from.y));
                self.cells[i] = value;
            }
        }
    }

    fn assert_in_bounds(&self, p: Point) {
        assert!(
            self.contains(p),
            "point {p} is outside the {}x{} canvas",
            self.width,
            self.height
        );
    }

    fn index(&self, p: Point) -> usize {
        usize::from(p.y) * usize::from(self.width) + usize::from(p.x)
    }

    /// Render in [`RenderStyle::Plain`]: `height` lines, top row first.
    pub fn render(&self) -> Render<'_> {
        self.render_with(RenderStyle::Plain)
    }

    /// Render in the given style. Each call starts a fresh pass over the
    /// current cell state.
    pub fn render_with(&self, style: RenderStyle) -> Render<'_> {
        Render {
            canvas: self,
            style,
            line: 0,
        }
    }

    fn row(&self, y: u16, style: RenderStyle) -> String {
        let (drawn, empty) = style.markers();
        let start = usize::from(y) * usize::from(self.width);
        self.cells[start..start + usize::from(self.width)]
            .iter()
            .map(|&c| if c { drawn } else { empty })
            .collect()
    }
}

/// Lazy line-by-line rendering of a [`Canvas`].
#[derive(Debug, Clone)]
pub struct Render<'a> {
    canvas: &'a Canvas,
    style: RenderStyle,
    line: usize,
}

impl Render<'_> {
    fn total_lines(&self) -> usize {
        let rows = usize::from(self.canvas.height);
        match self.style {
            RenderStyle::Plain => rows,
            // top border, rows, bottom border, terminating empty line
            RenderStyle::Framed => rows + 3,
        }
    }

    fn framed_line(&self, line: usize) -> String {
        let width = usize::from(self.canvas.width);
        let rows = usize::from(self.canvas.height);
        let border = |left: char, right: char| {
            let mut s = String::with_capacity(width + 2);
            s.push(left);
            s.extend(std::iter::repeat_n(FRAME_HORIZONTAL, width));
            s.push(right);
            s
        };

        if line == 0 {
            border(FRAME_TOP_LEFT, FRAME_TOP_RIGHT)
        } else if line <= rows {
            let y = u16::try_from(line - 1).unwrap_or(u16::MAX);
            format!(
                "{FRAME_VERTICAL}{}{FRAME_VERTICAL}",
                self.canvas.row(y, RenderStyle::Framed)
            )
        } else if line == rows + 1 {
            border(FRAME_BOTTOM_LEFT, FRAME_BOTTOM_RIGHT)
        } else {
            String::new()
        }
    }
}

impl Iterator for Render<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.line >= self.total_lines() {
            return None;
        }
        let line = self.line;
        self.line += 1;

        Some(match self.style {
            // `line < height` here, so the conversion cannot fail
            RenderStyle::Plain => self.canvas.row(line as u16, RenderStyle::Plain),
            RenderStyle::Framed => self.framed_line(line),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total_lines().saturating_sub(self.line);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Render<'_> {}
