use thiserror::Error;

use rusty_logo_canvas::CanvasError;

#[derive(Debug, Error)]
pub enum RustyLogoError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Canvas error: {0}")]
    Canvas(#[from] CanvasError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RustyLogoError>;
