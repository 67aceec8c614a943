use thiserror::Error;

/// Everything a fetch, parse or resolution step can report to its caller.
///
/// Values are `Clone` so they can sit inside resolver states and be handed to
/// per-shard handlers without tying them to the task that produced them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Connection-level failure: DNS, refused connection, timeout, broken body.
    #[error("{0}")]
    Transport(String),

    /// The server answered with anything other than 200.
    #[error("status code is {0}.")]
    Status(u16),

    /// The response arrived but is empty or lacks the expected structure.
    #[error("{0}")]
    Content(String),

    /// The pre-batch reachability probe failed; no shard was requested.
    #[error("heartbeat cannot reach to nasdaq: {0}")]
    Heartbeat(Box<FetchError>),

    /// Every symbol candidate was tried and none resolved to a quote page.
    #[error("no valid symbol among {tried} candidates{}", describe_last(.last_error))]
    ValidationExhausted {
        tried: usize,
        last_error: Option<Box<FetchError>>,
    },

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("IO error: {0}")]
    Io(String),
}

fn describe_last(last: &Option<Box<FetchError>>) -> String {
    match last {
        Some(e) => format!(" (last error: {})", e),
        None => String::new(),
    }
}

impl FetchError {
    pub fn no_content() -> Self {
        FetchError::Content("response has no content.".to_string())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(err.to_string())
    }
}

impl From<csv::Error> for FetchError {
    fn from(err: csv::Error) -> Self {
        FetchError::Csv(err.to_string())
    }
}

impl From<url::ParseError> for FetchError {
    fn from(err: url::ParseError) -> Self {
        FetchError::InvalidOptions(format!("bad url: {}", err))
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        FetchError::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
