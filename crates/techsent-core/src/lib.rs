//! Shared configuration and input loading for techsent.
//!
//! Holds the env-driven [`AppConfig`], the vocabulary loader that turns a
//! technology list (plus optional synonyms) into an ordered [`Vocabulary`],
//! and the document loader that normalizes filing text.

pub mod app_config;
pub mod config;
pub mod document;
pub mod error;
pub mod vocabulary;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env};
pub use document::{load_document, normalize_document};
pub use error::ConfigError;
pub use vocabulary::{load_vocabulary, parse_vocabulary, Term, Vocabulary, VocabularyFormat};
