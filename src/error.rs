use thiserror::Error;

/// Main error type for the speed-ramp library
#[derive(Error, Debug)]
pub enum RampError {
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Computation error: {0}")]
    Computation(#[from] ComputationError),

    #[error("Tool execution error: {0}")]
    Tool(#[from] ToolExecutionError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Assembly error: {0}")]
    Assembly(#[from] AssemblyError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors about the source video itself
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Input file not found: {path}")]
    NotFound { path: String },

    #[error("Unsupported input format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Invalid video {path}: {reason}")]
    InvalidVideo { path: String, reason: String },
}

/// Degenerate numeric cases that cannot be resolved locally
#[derive(Error, Debug)]
pub enum ComputationError {
    #[error("Frame dimensions differ: {expected:?} vs {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Speed factor {speed} for segment {index} is not a positive finite number")]
    InvalidSpeed { index: usize, speed: f64 },

    #[error("Invalid curve parameters: {details}")]
    InvalidParameters { details: String },
}

/// An external motion-estimation or transcoding invocation failed
#[derive(Error, Debug)]
pub enum ToolExecutionError {
    #[error("Failed to launch {tool}: {reason}")]
    LaunchFailed { tool: String, reason: String },

    #[error("{tool} exited with {status}: {stderr}")]
    NonZeroExit {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("Could not parse {tool} output: {reason}")]
    UnparseableOutput { tool: String, reason: String },

    #[error("{tool} failed: {reason}")]
    BackendFailed { tool: String, reason: String },
}

/// Per-segment rendering failures
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Segment {index} failed to encode: {reason}")]
    EncodeFailed { index: usize, reason: String },

    #[error("Render worker pool could not start: {reason}")]
    WorkerPool { reason: String },
}

/// Concatenation of rendered segments failed
#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("No rendered segments to assemble")]
    NoSegments,

    #[error("Rendered segment {index} is missing: {path}")]
    MissingSegment { index: usize, path: String },

    #[error("Segment {index} appears more than once")]
    DuplicateSegment { index: usize },

    #[error("Concatenation failed: {reason}")]
    ConcatFailed { reason: String },

    #[error("Could not publish output to {path}: {reason}")]
    PublishFailed { path: String, reason: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using RampError
pub type Result<T> = std::result::Result<T, RampError>;

impl RampError {
    /// Short, stable name of the error kind, suitable for API responses
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Input(_) => "input",
            Self::Computation(_) => "computation",
            Self::Tool(_) => "tool",
            Self::Render(_) => "render",
            Self::Assembly(_) => "assembly",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Input(InputError::NotFound { path }) => {
                format!("Could not find '{}'. Please check the path.", path)
            }
            Self::Input(InputError::UnsupportedFormat { extension }) => {
                format!("Files of type '{}' are not supported. Use mp4, mov, avi or mkv.", extension)
            }
            Self::Tool(ToolExecutionError::LaunchFailed { tool, .. }) => {
                format!("'{}' could not be started. Please make sure FFmpeg is installed.", tool)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}
