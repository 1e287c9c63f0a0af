//! Canonical ordering and colours for the four-level performance indicator.
//!
//! Display order and colour mapping are fixed here, independent of the order
//! in which levels show up in the data, so every chart paints "Básico" the
//! same way.

use serde::Serialize;

use crate::normalize::normalize_region;

// ---

/// Label used for regions with no matching statistic.
pub const NO_DATA_LABEL: &str = "Dados Ausentes";

/// Colour of the [`NO_DATA_LABEL`] sentinel.
pub const NO_DATA_COLOR: &str = "#d3d3d3";

/// Four-level ordinal performance indicator, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PerformanceLevel {
    BelowBasic,
    Basic,
    Adequate,
    Advanced,
}

impl PerformanceLevel {
    // ---
    pub const ALL: [PerformanceLevel; 4] = [
        PerformanceLevel::BelowBasic,
        PerformanceLevel::Basic,
        PerformanceLevel::Adequate,
        PerformanceLevel::Advanced,
    ];

    pub fn label(self) -> &'static str {
        // ---
        match self {
            Self::BelowBasic => "Abaixo do Básico",
            Self::Basic => "Básico",
            Self::Adequate => "Adequado",
            Self::Advanced => "Avançado",
        }
    }

    pub fn color(self) -> &'static str {
        // ---
        match self {
            Self::BelowBasic => "#d7191c",
            Self::Basic => "#fdae61",
            Self::Adequate => "#a6d96a",
            Self::Advanced => "#1a9641",
        }
    }

    /// Parse a level label, ignoring case, accents and surrounding blanks.
    pub fn parse(raw: &str) -> Option<Self> {
        // ---
        let key = normalize_region(raw);
        Self::ALL
            .into_iter()
            .find(|level| normalize_region(level.label()) == key)
    }

    /// Canonical labels in display order.
    pub fn labels() -> Vec<&'static str> {
        Self::ALL.iter().map(|level| level.label()).collect()
    }
}

/// Colour for any category label, including the no-data sentinel. Unknown
/// labels get `None` and are left to the renderer's default palette.
pub fn color_for(label: &str) -> Option<&'static str> {
    // ---
    if label == NO_DATA_LABEL {
        return Some(NO_DATA_COLOR);
    }
    PerformanceLevel::parse(label).map(PerformanceLevel::color)
}

/// One legend entry for a categorical map or chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    pub label: &'static str,
    pub color: &'static str,
}

/// Legend in canonical order, sentinel last.
pub fn legend() -> Vec<LegendEntry> {
    // ---
    PerformanceLevel::ALL
        .iter()
        .map(|level| LegendEntry {
            label: level.label(),
            color: level.color(),
        })
        .chain(std::iter::once(LegendEntry {
            label: NO_DATA_LABEL,
            color: NO_DATA_COLOR,
        }))
        .collect()
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_parse_is_accent_and_case_insensitive() {
        // ---
        assert_eq!(
            PerformanceLevel::parse("ABAIXO DO BASICO"),
            Some(PerformanceLevel::BelowBasic)
        );
        assert_eq!(PerformanceLevel::parse(" básico "), Some(PerformanceLevel::Basic));
        assert_eq!(PerformanceLevel::parse("avancado"), Some(PerformanceLevel::Advanced));
        assert_eq!(PerformanceLevel::parse("Excelente"), None);
    }

    #[test]
    fn test_canonical_order_is_fixed() {
        // ---
        assert_eq!(
            PerformanceLevel::labels(),
            vec!["Abaixo do Básico", "Básico", "Adequado", "Avançado"]
        );
        assert!(PerformanceLevel::BelowBasic < PerformanceLevel::Advanced);
    }

    #[test]
    fn test_colors_are_stable_and_distinct() {
        // ---
        let legend = legend();
        assert_eq!(legend.len(), 5);
        assert_eq!(legend.last().map(|e| e.label), Some(NO_DATA_LABEL));

        let mut colors: Vec<_> = legend.iter().map(|e| e.color).collect();
        colors.sort_unstable();
        colors.dedup();
        assert_eq!(colors.len(), 5);

        assert_eq!(color_for("Adequado"), Some("#a6d96a"));
        assert_eq!(color_for(NO_DATA_LABEL), Some(NO_DATA_COLOR));
        assert_eq!(color_for("outro"), None);
    }
}
