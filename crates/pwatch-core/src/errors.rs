/// Core error type for the watcher.
///
/// Adapter crates map their specific errors into this type so the loop can
/// treat every upstream failure the same way (log, cool down, continue).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(String),

    #[error("{api} returned error: {code}")]
    Api { api: &'static str, code: String },

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
