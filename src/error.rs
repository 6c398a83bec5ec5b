//! Error types for the assembly chat system.

/// Top-level error type for the chat front end and companion server.
#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    /// Chat session or streaming request error.
    #[error("chat error: {0}")]
    Chat(String),

    /// Configuration or credential error.
    #[error("config error: {0}")]
    Config(String),

    /// Local persistence error.
    ///
    /// Callers of the storage adapter swallow these and degrade to defaults;
    /// the variant exists for internal reporting and logging.
    #[error("storage error: {0}")]
    Storage(String),

    /// MuseScore bridge endpoint error.
    #[error("bridge error: {0}")]
    Bridge(String),

    /// Companion agent server error.
    #[error("server error: {0}")]
    Server(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AssemblyError>;
