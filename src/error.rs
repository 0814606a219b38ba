use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClipJoinError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid session: {0}")]
    InvalidSession(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("Command failed: {command}\n{detail}")]
    CommandFailed { command: String, detail: String },

    #[error(
        "{binary} is not installed or could not be started; run `clipjoin setup --download` or install it from {download_page}"
    )]
    ToolNotInstalled {
        binary: String,
        download_page: String,
    },

    #[error("Setup error: {0}")]
    Setup(String),
}

pub type Result<T> = std::result::Result<T, ClipJoinError>;
