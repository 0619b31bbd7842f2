//! Technology vocabulary loading.
//!
//! A vocabulary is an ordered list of [`Term`]s. Each term has a canonical
//! name and one or more variants; matching any variant counts as a mention
//! of the canonical term. Sources are a CSV export (a `technologies` column
//! with `;`-separated cells) or a plain list with one entry per line, plus an
//! optional YAML synonyms file whose entries take precedence.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// CSV column holding the technology names.
pub const TECHNOLOGIES_COLUMN: &str = "technologies";

static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("static regex is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    /// Canonical name reported on every mention.
    pub name: String,
    /// Surface forms searched for. The canonical name is always first.
    pub variants: Vec<String>,
}

impl Term {
    /// A term whose only variant is its own name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            variants: vec![name.clone()],
            name,
        }
    }

    /// A term with extra variants. Duplicate variants (case-insensitive) and
    /// blanks are dropped, and the canonical name is kept first.
    #[must_use]
    pub fn with_variants<I, S>(name: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut term = Self::new(name);
        for variant in variants {
            term.add_variant(variant.into());
        }
        term
    }

    fn add_variant(&mut self, variant: String) {
        let variant = variant.trim().to_string();
        if variant.is_empty() {
            return;
        }
        let lower = variant.to_lowercase();
        if !self.variants.iter().any(|v| v.to_lowercase() == lower) {
            self.variants.push(variant);
        }
    }
}

/// Ordered, deduplicated set of terms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    terms: Vec<Term>,
}

impl Vocabulary {
    /// Build a vocabulary, keeping the first term for each case-insensitive
    /// name. Later duplicates contribute their variants to the first one.
    #[must_use]
    pub fn new(terms: Vec<Term>) -> Self {
        let mut out: Vec<Term> = Vec::with_capacity(terms.len());
        for term in terms {
            let lower = term.name.to_lowercase();
            if let Some(existing) = out.iter_mut().find(|t| t.name.to_lowercase() == lower) {
                for variant in term.variants {
                    existing.add_variant(variant);
                }
            } else {
                out.push(term);
            }
        }
        Self { terms: out }
    }

    /// Shorthand for a vocabulary of single-variant terms.
    #[must_use]
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(Term::new).collect())
    }

    #[must_use]
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Shape of a vocabulary source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VocabularyFormat {
    /// Header row with a `technologies` column; cells may hold `;`-separated terms.
    Csv,
    /// One entry per line; `#` comments and blank lines are skipped.
    Lines,
}

impl VocabularyFormat {
    /// Pick the format from the file extension (`.csv` or anything else).
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::Lines,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SynonymEntry {
    pub term: String,
    #[serde(default)]
    pub variants: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SynonymsFile {
    pub synonyms: Vec<SynonymEntry>,
}

/// Normalize a raw term: drop every character that is neither a word
/// character nor whitespace (so `Edge-AI` becomes `EdgeAI`), then collapse
/// whitespace. Returns `None` if nothing is left.
#[must_use]
pub fn normalize_term(raw: &str) -> Option<String> {
    let stripped = PUNCTUATION.replace_all(raw, "");
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Parse vocabulary content into normalized term names, in source order.
///
/// Duplicates are left in; [`Vocabulary::new`] removes them.
///
/// # Errors
///
/// Returns [`ConfigError::Csv`] on malformed CSV and
/// [`ConfigError::MissingColumn`] when the header has no `technologies` column.
pub fn parse_vocabulary(content: &str, format: VocabularyFormat) -> Result<Vec<String>, ConfigError> {
    let cells: Vec<String> = match format {
        VocabularyFormat::Csv => read_csv_cells(content)?,
        VocabularyFormat::Lines => content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(ToString::to_string)
            .collect(),
    };

    Ok(cells
        .iter()
        .flat_map(|cell| cell.split(';'))
        .filter_map(normalize_term)
        .collect())
}

fn read_csv_cells(content: &str) -> Result<Vec<String>, ConfigError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    let column = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(TECHNOLOGIES_COLUMN))
        .ok_or_else(|| ConfigError::MissingColumn {
            column: TECHNOLOGIES_COLUMN.to_string(),
        })?;

    let mut cells = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(cell) = record.get(column) {
            cells.push(cell.to_string());
        }
    }
    Ok(cells)
}

/// Parse a YAML synonyms file.
///
/// # Errors
///
/// Returns [`ConfigError::SynonymsParse`] on invalid YAML and
/// [`ConfigError::Validation`] if an entry has a blank term.
pub fn parse_synonyms(content: &str) -> Result<SynonymsFile, ConfigError> {
    let file: SynonymsFile = serde_yaml::from_str(content)?;
    if let Some(entry) = file.synonyms.iter().find(|e| e.term.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "synonym entry with variants {:?} has an empty term",
            entry.variants
        )));
    }
    Ok(file)
}

/// Merge synonym entries and plain names into a vocabulary.
///
/// Synonym entries come first, in file order. Plain names that repeat a
/// synonym term are skipped so the synonym's variants win.
#[must_use]
pub fn build_vocabulary(names: Vec<String>, synonyms: Option<&SynonymsFile>) -> Vocabulary {
    let mut terms = Vec::new();
    let mut seen = HashSet::new();

    if let Some(file) = synonyms {
        for entry in &file.synonyms {
            let name = entry.term.trim().to_string();
            seen.insert(name.to_lowercase());
            terms.push(Term::with_variants(name, entry.variants.iter().cloned()));
        }
    }

    for name in names {
        if seen.insert(name.to_lowercase()) {
            terms.push(Term::new(name));
        }
    }

    Vocabulary::new(terms)
}

/// Load a vocabulary from `path`, optionally merging a synonyms file.
///
/// # Errors
///
/// Returns `ConfigError` if either file cannot be read or parsed.
pub fn load_vocabulary(path: &Path, synonyms: Option<&Path>) -> Result<Vocabulary, ConfigError> {
    let content = read_file(path)?;
    let names = parse_vocabulary(&content, VocabularyFormat::from_path(path))?;

    let synonyms = synonyms
        .map(|p| read_file(p).and_then(|c| parse_synonyms(&c)))
        .transpose()?;

    let vocabulary = build_vocabulary(names, synonyms.as_ref());
    tracing::debug!(
        path = %path.display(),
        terms = vocabulary.len(),
        "vocabulary loaded"
    );
    Ok(vocabulary)
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })
}
