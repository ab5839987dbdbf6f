//! Heuristic extraction of flight tables from free-text chat replies.

pub mod parser;
pub mod formatter;
pub mod detector;
pub mod extractor;

pub use extractor::{ExtractedTable, TableExtractor};
pub use parser::{Column, LineType, ParsedTable, TableParser, TableRow};
pub use formatter::TableFormatter;
pub use detector::{SmartTableDetector, TableRegion};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub regions_found: usize,
    pub tables_parsed: usize,
    pub list_rows: usize,
    pub flights_extracted: usize,
    pub rows_dropped: usize,
}

impl ExtractionSummary {
    pub fn summary(&self) -> String {
        format!(
            "Scanned {} table regions ({} parsed) and {} list rows: {} flights extracted, {} rows dropped.",
            self.regions_found, self.tables_parsed, self.list_rows,
            self.flights_extracted, self.rows_dropped
        )
    }
}

/// Six hex digits with at least one digit (`a71288`, `780B67`).
///
/// Requiring a digit keeps words like "decade" or "facade" out.
pub fn looks_like_icao24(token: &str) -> bool {
    let token = token.trim();
    token.len() == 6
        && token.chars().all(|c| c.is_ascii_hexdigit())
        && token.chars().any(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icao24_tokens() {
        assert!(looks_like_icao24("a71288"));
        assert!(looks_like_icao24("780B67"));
        assert!(looks_like_icao24(" BCD123 "));
        assert!(!looks_like_icao24("facade"));
        assert!(!looks_like_icao24("ICAO24"));
        assert!(!looks_like_icao24("a7128"));
    }

    #[test]
    fn test_summary_line() {
        let summary = ExtractionSummary {
            regions_found: 1,
            tables_parsed: 1,
            flights_extracted: 3,
            ..Default::default()
        };
        assert!(summary.summary().contains("3 flights extracted"));
    }
}
