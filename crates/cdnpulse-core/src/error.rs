use thiserror::Error;

/// Coarse failure classes, used as log and metric labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Transport,
    Decode,
    Provider,
    FieldParse,
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Transport => "transport",
            FailureKind::Decode => "decode",
            FailureKind::Provider => "provider",
            FailureKind::FieldParse => "field_parse",
            FailureKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metric source errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Provider returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Decode failure: {0}")]
    Decode(String),

    #[error("Provider reported failure: {0}")]
    Provider(String),

    #[error("Collection task failed: {0}")]
    TaskFailed(String),
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Transport(_) | FetchError::HttpStatus { .. } => FailureKind::Transport,
            FetchError::Decode(_) => FailureKind::Decode,
            FetchError::Provider(_) => FailureKind::Provider,
            FetchError::TaskFailed(_) => FailureKind::Internal,
        }
    }
}

/// A single field of an otherwise valid payload could not be used
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("Missing trailing percent sign in {raw:?}")]
    MissingPercentSign { raw: String },

    #[error("Invalid number {raw:?}: {reason}")]
    InvalidNumber { raw: String, reason: String },

    #[error("Label {label} is empty")]
    EmptyLabel { label: &'static str },

    #[error("Expected {expected} labels, got {actual}")]
    LabelCount { expected: usize, actual: usize },
}

impl FieldError {
    pub fn kind(&self) -> FailureKind {
        FailureKind::FieldParse
    }
}

/// Snapshot delivery errors
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Sink rejected snapshot: {status} - {message}")]
    Rejected { status: u16, message: String },

    #[error("Encoding failed: {0}")]
    Encode(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required settings: {}", .0.join(", "))]
    MissingSettings(Vec<&'static str>),

    #[error("Channel list is empty")]
    EmptyChannelList,

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },
}
