//! Region identifier normalization and the explicit alias table.
//!
//! Both sides of the geo-join (aggregated statistics and geometry features)
//! pass through [`RegionAliases::resolve`] so that `"São Paulo "`,
//! `"SAO PAULO"` and `"sao paulo"` all land on the same key.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::store::LoadError;

// ---

/// Uppercase-fold, strip diacritics and trim a region identifier.
///
/// Idempotent: `normalize_region(&normalize_region(s)) == normalize_region(s)`.
pub fn normalize_region(raw: &str) -> String {
    // ---
    // Uppercasing first: some uppercase mappings emit combining marks
    // (e.g. U+01F0), which the decomposition pass then strips.
    raw.to_uppercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Known spelling mismatches between the assessment data and the
/// municipality boundary file.
const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("MOJI MIRIM", "MOGI MIRIM"),
    ("EMBU", "EMBU DAS ARTES"),
    ("BIRITIBA-MIRIM", "BIRITIBA MIRIM"),
    ("SAO LUIS DO PARAITINGA", "SAO LUIZ DO PARAITINGA"),
    ("FLORINIA", "FLORINEA"),
    ("SANTA BARBARA D'OESTE", "SANTA BARBARA D OESTE"),
];

/// Alias table applied after normalization. Lookups are never inferred: only
/// explicitly listed identifiers are rewritten.
#[derive(Debug, Clone, Default)]
pub struct RegionAliases {
    aliases: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct AliasRow {
    #[serde(rename = "ALIAS")]
    alias: String,
    #[serde(rename = "CANONICO")]
    canonical: String,
}

impl RegionAliases {
    // ---
    /// Empty table: `resolve` reduces to plain normalization.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table pre-populated with the built-in municipality corrections.
    pub fn with_defaults() -> Self {
        // ---
        let mut table = Self::new();
        for (alias, canonical) in DEFAULT_ALIASES {
            table.insert(alias, canonical);
        }
        table
    }

    /// Register `alias -> canonical`. Both sides are normalized on insertion.
    pub fn insert(&mut self, alias: &str, canonical: &str) {
        // ---
        let alias = normalize_region(alias);
        let canonical = normalize_region(canonical);
        if alias != canonical {
            self.aliases.insert(alias, canonical);
        }
    }

    /// Add the pairs from a two-column `ALIAS,CANONICO` CSV file.
    pub fn extend_from_csv(&mut self, path: &Path) -> Result<usize, LoadError> {
        // ---
        let mut reader = csv::Reader::from_path(path).map_err(|e| LoadError::from_csv(path, e))?;
        let mut added = 0;
        for row in reader.deserialize::<AliasRow>() {
            let row = row?;
            self.insert(&row.alias, &row.canonical);
            added += 1;
        }
        tracing::debug!("Loaded {} region aliases from {}", added, path.display());
        Ok(added)
    }

    /// Normalize `raw`, then rewrite it if it is a known alias.
    pub fn resolve(&self, raw: &str) -> String {
        // ---
        let normalized = normalize_region(raw);
        match self.aliases.get(&normalized) {
            Some(canonical) => canonical.clone(),
            None => normalized,
        }
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}
