//! Drawing surface for Rusty Logo.
//!
//! A [`Canvas`] is a fixed-size grid of drawn/empty cells that renders itself
//! as text. A [`Cursor`] walks over it one cell at a time and leaves a trail
//! while its brush is down.

pub mod canvas;
pub mod cursor;

pub use canvas::{Canvas, CanvasError, Point, Render, RenderStyle};
pub use cursor::{Brush, Cursor, Heading, Turn};
