use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("coordinate {0:?} is outside of the board")]
    OutOfBounds((usize, usize)),

    #[error("a board must have at least one row and one column, got {width}x{height}")]
    EmptyBoard { width: usize, height: usize },

    #[error("number of bombs ({bombs}) must be between 1 and {max} for a board of {area} cells")]
    InvalidBombCount { bombs: usize, max: usize, area: usize },

    #[error("unknown difficulty: {0:?}")]
    UnknownDifficulty(String),

    #[error("unknown bomb rule: {0:?}")]
    UnknownBombRule(String),

    #[error("failed to parse timestamp: {0:?}")]
    ParseTimestamp(String),

    #[error("failed to serialize store")]
    SerializeStore(#[source] serde_json::Error),

    #[error("failed to write store to {}", .0.display())]
    WriteStore(PathBuf, #[source] std::io::Error),

    #[error("failed to remove store at {}", .0.display())]
    RemoveStore(PathBuf, #[source] std::io::Error),

    #[error("failed to draw to terminal")]
    DrawToTerminal(#[source] std::io::Error),

    #[error("failed to get input event")]
    GetEvent(#[source] std::sync::mpsc::RecvError),

    #[error("failed to get ctrlc handler")]
    SetHandler(#[source] ctrlc::Error),

    #[error("failed to get stdout in raw mode")]
    GetStdoutInRawMode(#[source] std::io::Error),

    #[error("failed to get alternate screen for mouse terminal")]
    GetAlternateScreenForMouseTerminal(#[source] std::io::Error),

    #[error("failed to create terminal object")]
    CreateTerminal(#[source] std::io::Error),

    #[error("failed to convert usize to u16")]
    ConvertUsizeToU16(#[source] std::num::TryFromIntError),
}
