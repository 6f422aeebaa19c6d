//! Error types for deck and configuration loading
use thiserror::Error;

/// Errors raised while building or validating decks and configuration.
///
/// The per-tick path never fails; missing audio and malformed automation
/// targets degrade to quiescent values instead.
#[derive(Error, Debug)]
pub enum PulseError {
    /// A deck must contain at least one scene
    #[error("scene deck is empty")]
    EmptyDeck,

    /// A scene definition failed validation
    #[error("invalid scene '{scene}': {reason}")]
    InvalidScene {
        /// Scene name
        scene: String,
        /// What was wrong with it
        reason: String,
    },

    /// Engine configuration failed validation
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Strict scene lookup outside the deck
    #[error("scene index {index} out of range for deck of {len}")]
    SceneIndexOutOfRange {
        /// Requested index
        index: usize,
        /// Deck length
        len: usize,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for pulsedeck operations
pub type Result<T> = std::result::Result<T, PulseError>;
