use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Journal alias '{alias}' maps to both '{first}' and '{second}'")]
    AmbiguousJournalAlias {
        alias: String,
        first: String,
        second: String,
    },

    #[error("Sources directory '{path}' not found")]
    SourceNotFound { path: String },

    #[error("No .{extension} files found in '{dir}'")]
    NoSourceFiles { dir: String, extension: String },

    #[error("Failed to parse '{file}': {message}")]
    BibParseError { file: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Processing,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// Process exit code for a run that stopped on an error of this severity.
    pub fn exit_code(self) -> i32 {
        // 根據錯誤嚴重程度決定退出碼，任何失敗都不為 0
        match self {
            ErrorSeverity::Low | ErrorSeverity::High => 1,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::AmbiguousJournalAlias { .. } => ErrorCategory::Configuration,
            EtlError::SourceNotFound { .. }
            | EtlError::NoSourceFiles { .. }
            | EtlError::BibParseError { .. } => ErrorCategory::Input,
            EtlError::ProcessingError { .. } | EtlError::SerializationError(_) => {
                ErrorCategory::Processing
            }
            EtlError::ZipError(_) | EtlError::CsvError(_) | EtlError::IoError(_) => {
                ErrorCategory::Output
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 單一檔案解析失敗只會被跳過
            EtlError::BibParseError { .. } => ErrorSeverity::Low,
            EtlError::SourceNotFound { .. } | EtlError::NoSourceFiles { .. } => {
                ErrorSeverity::Medium
            }
            EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::AmbiguousJournalAlias { .. }
            | EtlError::ProcessingError { .. }
            | EtlError::SerializationError(_)
            | EtlError::CsvError(_) => ErrorSeverity::High,
            EtlError::ZipError(_) | EtlError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::AmbiguousJournalAlias { .. } => {
                "Remove the spelling from all but one canonical journal in [journal_aliases]"
            }
            EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => {
                "Check the configuration file and command line arguments"
            }
            EtlError::SourceNotFound { .. } => {
                "Create the sources directory or pass --sources-dir"
            }
            EtlError::NoSourceFiles { .. } => {
                "Export one BibTeX file per database into the sources directory"
            }
            EtlError::BibParseError { .. } => "Re-export the file from the database",
            EtlError::ProcessingError { .. } | EtlError::SerializationError(_) => {
                "Run again with --verbose and inspect the log"
            }
            EtlError::ZipError(_) | EtlError::CsvError(_) | EtlError::IoError(_) => {
                "Check that the output path is writable and has free space"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Input => format!("Could not read sources: {}", self),
            ErrorCategory::Processing => format!("Processing failed: {}", self),
            ErrorCategory::Output => format!("Could not write the report: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
