use std::fmt;

impl std::error::Error for ArcadeError {}

#[derive(Debug, Clone, PartialEq)]
pub enum ArcadeError {
    EmptyInput(String),
    NoValidNotes(String),
    AudioError(String),
    FileError(String),
    RecordingError(String),
    StoreError(String),
}

impl fmt::Display for ArcadeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ArcadeError::EmptyInput(msg) => write!(f, "Empty Input: {}", msg),
            ArcadeError::NoValidNotes(msg) => write!(f, "No Valid Notes: {}", msg),
            ArcadeError::AudioError(msg) => write!(f, "Audio Error: {}", msg),
            ArcadeError::FileError(msg) => write!(f, "File Error: {}", msg),
            ArcadeError::RecordingError(msg) => write!(f, "Recording Error: {}", msg),
            ArcadeError::StoreError(msg) => write!(f, "Store Error: {}", msg),
        }
    }
}
