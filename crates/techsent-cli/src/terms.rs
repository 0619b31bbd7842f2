//! `terms` command handler.

use std::path::Path;

use anyhow::Context;

/// Print each vocabulary term with its search variants, in match-priority order.
///
/// # Errors
///
/// Returns an error if the vocabulary or synonyms file cannot be loaded.
pub(crate) fn run_terms(vocabulary: &Path, synonyms: Option<&Path>) -> anyhow::Result<()> {
    let vocab = techsent_core::load_vocabulary(vocabulary, synonyms)
        .with_context(|| format!("failed to load vocabulary {}", vocabulary.display()))?;

    if vocab.is_empty() {
        println!("no terms found in {}", vocabulary.display());
        return Ok(());
    }

    println!("{:<40}VARIANTS", "TERM");
    for term in vocab.terms() {
        let extra: Vec<&str> = term
            .variants
            .iter()
            .skip(1)
            .map(String::as_str)
            .collect();
        println!("{:<40}{}", term.name, extra.join(", "));
    }
    println!("{} terms", vocab.len());
    Ok(())
}
