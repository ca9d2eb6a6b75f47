//! Per-connection protocol state machine.
//!
//! A [`Session`] owns one canvas and one cursor and turns protocol lines
//! into replies. It performs no I/O: the transport feeds it lines and writes
//! out whatever it returns.

use tracing::debug;

use rusty_logo_canvas::{Brush, Canvas, CanvasError, Cursor, RenderStyle, Turn};

use crate::config::CanvasConfig;
use crate::protocol::{Command, GREETING, format_coord};

/// Protocol state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, greeting not sent yet.
    Greeting,
    /// Accepting commands.
    Ready,
    /// `quit` received or the transport failed.
    Closed,
}

/// What the transport must write back after a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    None,
    Line(String),
    Lines(Vec<String>),
}

impl Reply {
    pub fn is_none(&self) -> bool {
        matches!(self, Reply::None)
    }

    pub fn into_lines(self) -> Vec<String> {
        match self {
            Reply::None => Vec::new(),
            Reply::Line(line) => vec![line],
            Reply::Lines(lines) => lines,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    canvas: Canvas,
    cursor: Cursor,
    style: RenderStyle,
    state: SessionState,
    commands_handled: u64,
}

impl Default for Session {
    fn default() -> Self {
        let canvas = Canvas::default();
        let cursor = Cursor::new(&canvas);
        Self {
            canvas,
            cursor,
            style: RenderStyle::default(),
            state: SessionState::Greeting,
            commands_handled: 0,
        }
    }
}

impl Session {
    /// Fresh session with an empty canvas of the configured size.
    pub fn new(config: &CanvasConfig) -> Result<Self, CanvasError> {
        let canvas = Canvas::try_new(config.width, config.height)?;
        let cursor = Cursor::new(&canvas);
        Ok(Self {
            canvas,
            cursor,
            style: config.style,
            state: SessionState::Greeting,
            commands_handled: 0,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Number of commands dispatched so far. Ignored lines do not count.
    pub fn commands_handled(&self) -> u64 {
        self.commands_handled
    }

    /// Move to `Ready` and return the line to send first.
    ///
    /// # Panics
    ///
    /// Panics unless the session is still in `Greeting`.
    pub fn greet(&mut self) -> &'static str {
        assert_eq!(
            self.state,
            SessionState::Greeting,
            "greeting sent twice or after close"
        );
        self.state = SessionState::Ready;
        GREETING
    }

    /// Handle one line from the client. Lines that are not a valid command
    /// are ignored and leave the session untouched.
    ///
    /// # Panics
    ///
    /// Panics unless the session is `Ready`.
    pub fn handle_line(&mut self, line: &str) -> Reply {
        assert_eq!(
            self.state,
            SessionState::Ready,
            "line handled outside the Ready state"
        );

        match Command::parse(line) {
            Ok(command) => self.execute(command),
            Err(e) => {
                debug!(line = line.trim(), reason = %e, "Ignoring line");
                Reply::None
            }
        }
    }

    /// Apply a parsed command.
    pub fn execute(&mut self, command: Command) -> Reply {
        debug!(command = ?command, "Executing command");
        self.commands_handled += 1;

        match command {
            Command::Coord => Reply::Line(format_coord(self.cursor.position())),
            Command::Steps(n) => {
                self.cursor.advance(&mut self.canvas, n);
                Reply::None
            }
            Command::Right(n) => {
                self.cursor.turn(Turn::Right, n);
                Reply::None
            }
            Command::Left(n) => {
                self.cursor.turn(Turn::Left, n);
                Reply::None
            }
            Command::Hover => {
                self.cursor.set_pen(false);
                Reply::None
            }
            Command::Draw => {
                self.cursor.set_pen(true);
                Reply::None
            }
            Command::Eraser => {
                self.cursor.set_brush(Brush::Erase);
                Reply::None
            }
            Command::Render => Reply::Lines(self.canvas.render_with(self.style).collect()),
            Command::Quit => {
                self.state = SessionState::Closed;
                Reply::None
            }
        }
    }

    /// Transport failure: close from any state.
    pub fn abort(&mut self) {
        self.state = SessionState::Closed;
    }
}
