//! Turtle cursor: position, heading and brush over a bounded canvas.

use crate::canvas::{Canvas, Point};

/// One of the four cardinal directions. North points at the top rendered row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Heading {
    #[default]
    North,
    East,
    South,
    West,
}

impl Heading {
    const CLOCKWISE: [Heading; 4] = [Heading::North, Heading::East, Heading::South, Heading::West];

    fn index(self) -> usize {
        match self {
            Heading::North => 0,
            Heading::East => 1,
            Heading::South => 2,
            Heading::West => 3,
        }
    }

    /// Rotate by `units` quarter turns in the given sense.
    pub fn rotated(self, turn: Turn, units: u32) -> Heading {
        let quarter = (units % 4) as usize;
        let idx = match turn {
            Turn::Right => (self.index() + quarter) % 4,
            Turn::Left => (self.index() + 4 - quarter) % 4,
        };
        Self::CLOCKWISE[idx]
    }

    /// Unit step `(dx, dy)` in canvas coordinates.
    pub fn delta(self) -> (i16, i16) {
        match self {
            Heading::North => (0, -1),
            Heading::East => (1, 0),
            Heading::South => (0, 1),
            Heading::West => (-1, 0),
        }
    }
}

/// Rotational sense of a turn: `Right` is clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Left,
    Right,
}

/// What the cursor does to the cells it leaves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Brush {
    #[default]
    Draw,
    /// Pen lifted: moves without touching the canvas.
    Hover,
    /// Clears the cells it would otherwise draw.
    Erase,
}

/// A cursor bound to the dimensions of one canvas.
///
/// The cursor keeps a copy of the canvas bounds rather than a reference, and
/// the canvas is lent to [`Cursor::advance`] for the duration of each move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    position: Point,
    heading: Heading,
    brush: Brush,
    width: u16,
    height: u16,
}

impl Cursor {
    /// Place a cursor at the center of `canvas`, heading north, pen down.
    pub fn new(canvas: &Canvas) -> Self {
        Self {
            position: canvas.center(),
            heading: Heading::default(),
            brush: Brush::default(),
            width: canvas.width(),
            height: canvas.height(),
        }
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn heading(&self) -> Heading {
        self.heading
    }

    pub fn brush(&self) -> Brush {
        self.brush
    }

    /// Whether moving touches the canvas (drawing or erasing).
    pub fn pen_down(&self) -> bool {
        self.brush != Brush::Hover
    }

    /// `true` selects [`Brush::Draw`], `false` lifts the pen.
    pub fn set_pen(&mut self, down: bool) {
        self.brush = if down { Brush::Draw } else { Brush::Hover };
    }

    pub fn set_brush(&mut self, brush: Brush) {
        self.brush = brush;
    }

    pub fn turn(&mut self, turn: Turn, units: u32) {
        self.heading = self.heading.rotated(turn, units);
    }

    /// Walk up to `steps` cells along the current heading, stopping at the
    /// last in-bounds cell. Every cell the cursor leaves is drawn or erased
    /// according to the brush; when the border cuts the move short, the cell
    /// it stops on is painted too. Returns the number of steps taken.
    ///
    /// # Panics
    ///
    /// Panics if `canvas` is not the size this cursor was created for.
    pub fn advance(&mut self, canvas: &mut Canvas, steps: u32) -> u32 {
        assert!(
            canvas.width() == self.width && canvas.height() == self.height,
            "cursor bound to a {}x{} canvas was moved over a {}x{} one",
            self.width,
            self.height,
            canvas.width(),
            canvas.height()
        );
        if steps == 0 {
            return 0;
        }

        let start = self.position;
        let mut last = start;
        let mut taken = 0;
        while taken < steps {
            last = self.position;
            match self.next_cell() {
                Some(next) => {
                    self.position = next;
                    taken += 1;
                }
                None => break,
            }
        }

        self.paint(canvas, start, last);
        taken
    }

    /// Apply the brush to the straight run `from..=to`.
    fn paint(&self, canvas: &mut Canvas, from: Point, to: Point) {
        match (self.brush, from == to) {
            (Brush::Hover, _) => {}
            (Brush::Draw, true) => canvas.draw_cell(from),
            (Brush::Draw, false) => canvas.draw_segment(from, to),
            (Brush::Erase, true) => canvas.erase_cell(from),
            (Brush::Erase, false) => canvas.erase_segment(from, to),
        }
    }

    fn next_cell(&self) -> Option<Point> {
        let (dx, dy) = self.heading.delta();
        let x = self.position.x.checked_add_signed(dx)?;
        let y = self.position.y.checked_add_signed(dy)?;
        (x < self.width && y < self.height).then_some(Point::new(x, y))
    }
}
