use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read {path}: {source}")]
    FileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse synonyms file: {0}")]
    SynonymsParse(#[from] serde_yaml::Error),

    #[error("failed to read vocabulary CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("vocabulary CSV has no `{column}` column")]
    MissingColumn { column: String },

    #[error("validation error: {0}")]
    Validation(String),
}
