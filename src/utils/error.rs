use thiserror::Error;

#[derive(Error, Debug)]
pub enum SecOpsError {
    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Manifest error at line {line}: {message}")]
    ManifestError { line: u64, message: String },

    #[error("{function_name}: a KMS custom key id is required to {purpose}")]
    MissingKmsKeyError {
        function_name: String,
        purpose: String,
    },

    #[error("{operation} failed: {message}")]
    ProviderError { operation: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Cloud,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SecOpsError {
    /// 包裝雲端 SDK 呼叫的錯誤，保留操作名稱
    pub fn provider(operation: impl Into<String>, err: impl std::fmt::Display) -> Self {
        SecOpsError::ProviderError {
            operation: operation.into(),
            message: err.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        SecOpsError::ConfigError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            SecOpsError::ConfigError { .. }
            | SecOpsError::MissingConfigError { .. }
            | SecOpsError::InvalidConfigValueError { .. }
            | SecOpsError::TomlError(_) => ErrorCategory::Configuration,
            SecOpsError::CsvError(_)
            | SecOpsError::ManifestError { .. }
            | SecOpsError::MissingKmsKeyError { .. } => ErrorCategory::Input,
            SecOpsError::ProviderError { .. } => ErrorCategory::Cloud,
            SecOpsError::IoError(_) | SecOpsError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SecOpsError::MissingKmsKeyError { .. } => ErrorSeverity::Low,
            SecOpsError::ProviderError { .. } => ErrorSeverity::Medium,
            SecOpsError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the command line flags and the TOML settings file"
            }
            ErrorCategory::Input => {
                "Check the manifest: header must start with Region, flags must be true/false"
            }
            ErrorCategory::Cloud => {
                "Verify the AWS profile, region and IAM permissions, then retry"
            }
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            SecOpsError::ManifestError { line, message } => {
                format!("The manifest is invalid (line {}): {}", line, message)
            }
            SecOpsError::ProviderError { operation, .. } => {
                format!("The cloud call '{}' did not succeed", operation)
            }
            SecOpsError::IoError(e) => format!("A file could not be read or written: {}", e),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SecOpsError>;
