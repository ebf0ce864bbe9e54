//! Taxonomy input loading.
//!
//! The tag scraper emits a JSON object mapping first letter to a list of tag
//! names. A bare JSON array and a plain text file (one tag per line, `#`
//! comments ignored) are accepted as well, so hand-curated tag lists work
//! without conversion.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

/// Load and normalize the taxonomy file.
///
/// Tags come back lowercased, deduplicated, and in the file's order (letter
/// groups are walked alphabetically, matching the scraper's layout).
pub fn load_taxonomy(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read taxonomy file: {}", path.display()))?;

    let tags = parse_taxonomy(&text);
    if tags.is_empty() {
        bail!("No tags found in taxonomy file: {}", path.display());
    }
    Ok(tags)
}

fn parse_taxonomy(text: &str) -> Vec<String> {
    // BTreeMap walks the letter groups in sorted order.
    if let Ok(by_letter) = serde_json::from_str::<BTreeMap<String, Vec<String>>>(text) {
        return normalize(by_letter.into_values().flatten());
    }
    if let Ok(list) = serde_json::from_str::<Vec<String>>(text) {
        return normalize(list.into_iter());
    }
    normalize(
        text.lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty() && !line.starts_with('#')),
    )
}

fn normalize(tags: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() {
            continue;
        }
        if seen.insert(tag.clone()) {
            out.push(tag);
        }
    }
    out
}
