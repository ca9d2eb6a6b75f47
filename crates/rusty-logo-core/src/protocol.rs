//! Rusty Logo line protocol.
//!
//! The server greets every connection with `hello`, then reads one command
//! per line. Lines are CRLF-terminated on the wire. Only `coord` and
//! `render` produce output; everything else, including lines that do not
//! parse, is silent.

use std::str::FromStr;

use thiserror::Error;

use rusty_logo_canvas::Point;

/// First line sent on every connection.
pub const GREETING: &str = "hello";

/// Terminator appended to every line the server writes.
pub const LINE_ENDING: &str = "\r\n";

/// A parsed client command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Reply with the cursor position as `(x,y)`.
    Coord,
    Steps(u32),
    Right(u32),
    Left(u32),
    /// Lift the pen.
    Hover,
    /// Put the pen down.
    Draw,
    /// Clear cells instead of drawing them.
    Eraser,
    /// Reply with the canvas, one line per row.
    Render,
    Quit,
}

/// Why a line was not a command. Never sent to the client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("empty line")]
    Empty,

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("invalid argument '{value}' for '{command}'")]
    InvalidArgument { command: String, value: String },

    #[error("'{0}' takes no argument")]
    UnexpectedArgument(String),

    #[error("too many arguments for '{0}'")]
    TooManyArguments(String),
}

impl Command {
    /// Parse one protocol line. Surrounding whitespace (including a stray
    /// `\r`) is ignored; the name is case-sensitive.
    pub fn parse(line: &str) -> Result<Command, ProtocolError> {
        let mut tokens = line.split_whitespace();
        let name = tokens.next().ok_or(ProtocolError::Empty)?;
        let arg = tokens.next();
        if tokens.next().is_some() {
            return Err(ProtocolError::TooManyArguments(name.to_string()));
        }

        let counted = |build: fn(u32) -> Command| -> Result<Command, ProtocolError> {
            match arg {
                None => Ok(build(1)),
                Some(value) => parse_count(value).map(build).ok_or_else(|| {
                    ProtocolError::InvalidArgument {
                        command: name.to_string(),
                        value: value.to_string(),
                    }
                }),
            }
        };
        let bare = |command: Command| -> Result<Command, ProtocolError> {
            match arg {
                None => Ok(command),
                Some(_) => Err(ProtocolError::UnexpectedArgument(name.to_string())),
            }
        };

        match name {
            "coord" => bare(Command::Coord),
            "steps" => counted(Command::Steps),
            "right" => counted(Command::Right),
            "left" => counted(Command::Left),
            "hover" => bare(Command::Hover),
            "draw" => bare(Command::Draw),
            "eraser" => bare(Command::Eraser),
            "render" => bare(Command::Render),
            "quit" => bare(Command::Quit),
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::parse(s)
    }
}

/// Plain base-10 digits only: `u32::from_str` would also accept a `+` sign.
fn parse_count(value: &str) -> Option<u32> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

/// Wire form of a `coord` reply.
pub fn format_coord(p: Point) -> String {
    p.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_commands() {
        assert_eq!(Command::parse("coord"), Ok(Command::Coord));
        assert_eq!(Command::parse("hover"), Ok(Command::Hover));
        assert_eq!(Command::parse("draw"), Ok(Command::Draw));
        assert_eq!(Command::parse("eraser"), Ok(Command::Eraser));
        assert_eq!(Command::parse("render"), Ok(Command::Render));
        assert_eq!(Command::parse("quit"), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_counted_defaults_to_one() {
        assert_eq!(Command::parse("steps"), Ok(Command::Steps(1)));
        assert_eq!(Command::parse("right"), Ok(Command::Right(1)));
        assert_eq!(Command::parse("left"), Ok(Command::Left(1)));
    }

    #[test]
    fn test_parse_counted_with_argument() {
        assert_eq!(Command::parse("steps 5"), Ok(Command::Steps(5)));
        assert_eq!(Command::parse("right 0"), Ok(Command::Right(0)));
        assert_eq!(Command::parse("left 4294967295"), Ok(Command::Left(u32::MAX)));
        assert_eq!("steps\t7".parse::<Command>(), Ok(Command::Steps(7)));
    }

    #[test]
    fn test_parse_tolerates_whitespace_and_cr() {
        assert_eq!(Command::parse("  coord \r"), Ok(Command::Coord));
        assert_eq!(Command::parse("steps   3\r"), Ok(Command::Steps(3)));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(Command::parse(""), Err(ProtocolError::Empty));
        assert_eq!(Command::parse("   "), Err(ProtocolError::Empty));
        assert_eq!(
            Command::parse("invalid"),
            Err(ProtocolError::UnknownCommand("invalid".into()))
        );
        assert_eq!(
            Command::parse("COORD"),
            Err(ProtocolError::UnknownCommand("COORD".into()))
        );
        for bad in ["steps x", "steps -1", "steps +2", "steps 1.5", "right 4294967296"] {
            assert!(
                matches!(Command::parse(bad), Err(ProtocolError::InvalidArgument { .. })),
                "{bad} should be rejected"
            );
        }
        assert_eq!(
            Command::parse("coord 3"),
            Err(ProtocolError::UnexpectedArgument("coord".into()))
        );
        assert_eq!(
            Command::parse("steps 1 2"),
            Err(ProtocolError::TooManyArguments("steps".into()))
        );
    }

    #[test]
    fn test_format_coord() {
        assert_eq!(format_coord(Point::new(15, 15)), "(15,15)");
    }
}
