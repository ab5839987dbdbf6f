use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use super::detector::TableRegion;
use super::looks_like_icao24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineType {
    TableRow,
    TableSeparator,
    Header,
    Empty,
}

/// Canonical flight-record field a table column feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Icao24,
    FlightNumber,
    AircraftType,
    Status,
    MaintenanceType,
}

impl Column {
    pub fn key(&self) -> &'static str {
        match self {
            Column::Icao24 => "icao24",
            Column::FlightNumber => "flightNumber",
            Column::AircraftType => "aircraftType",
            Column::Status => "status",
            Column::MaintenanceType => "maintenanceType",
        }
    }

    /// Map a header cell ("ICAO 24", "Flight #", "Check Type") to a field
    pub fn from_header(cell: &str) -> Option<Self> {
        let name: String = cell
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();

        if name.is_empty() {
            return None;
        }

        // Order matters: "maintenance type" must not land on aircraft type
        if name.contains("icao") || name == "hex" || name.contains("transponder") || name == "modes" {
            Some(Column::Icao24)
        } else if name.contains("maint") || name.contains("check") {
            Some(Column::MaintenanceType)
        } else if name.contains("status") || name == "state" {
            Some(Column::Status)
        } else if name.contains("flight") || name.contains("callsign") {
            Some(Column::FlightNumber)
        } else if name.contains("aircraft") || name == "type" || name.contains("model") || name == "equipment" {
            Some(Column::AircraftType)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct TableRow {
    pub cells: Vec<String>,
    pub raw_line: String,
    pub line_number: usize,
}

#[derive(Debug, Clone)]
pub struct ParsedTable {
    pub header: Option<Vec<Option<Column>>>,
    pub rows: Vec<TableRow>,
    pub start_line: usize,
    pub end_line: usize,
    pub column_count: Option<usize>,
    pub has_header_separator: bool,
}

impl ParsedTable {
    /// Column index for a field, when the table carried a usable header
    pub fn column_index(&self, column: Column) -> Option<usize> {
        self.header.as_ref()?.iter().position(|c| *c == Some(column))
    }
}

/// Splits detected table regions into header and data rows.
pub struct TableParser {
    /// Header cells needed before a first row counts as a header
    min_header_matches: usize,
}

impl TableParser {
    pub fn new() -> Self {
        Self {
            min_header_matches: 1,
        }
    }

    pub fn parse_region(&self, region: &TableRegion) -> Option<ParsedTable> {
        let mut builder = TableBuilder::new(region.start_line);

        for (offset, line) in region.lines.iter().enumerate() {
            let line_number = region.start_line + offset;
            let line_type = self.classify_line(line, builder.rows.is_empty() && builder.header.is_none());

            match line_type {
                LineType::Header => builder.set_header(self.header_columns(line)),
                LineType::TableSeparator => builder.has_separator = true,
                LineType::TableRow => builder.add_row(line_number, line),
                LineType::Empty => {}
            }
        }

        builder.build()
    }

    fn classify_line(&self, line: &str, first_content_line: bool) -> LineType {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            return LineType::Empty;
        }

        if is_separator_line(trimmed) {
            return LineType::TableSeparator;
        }

        if first_content_line && self.is_header_line(line) {
            return LineType::Header;
        }

        LineType::TableRow
    }

    fn is_header_line(&self, line: &str) -> bool {
        let cells = split_cells(line);

        // A row with an address in it is data, whatever else it says
        if cells.iter().any(|c| looks_like_icao24(c)) {
            return false;
        }

        let matches = self.header_columns(line).iter().filter(|c| c.is_some()).count();
        matches >= self.min_header_matches
    }

    fn header_columns(&self, line: &str) -> Vec<Option<Column>> {
        let mut seen = HashSet::new();
        split_cells(line)
            .iter()
            .map(|cell| Column::from_header(cell).filter(|col| seen.insert(*col)))
            .collect()
    }
}

impl Default for TableParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Split one table line into trimmed cells.
///
/// Pipes win over tabs, tabs over runs of two or more spaces. Empty cells
/// inside a pipe row are kept so positions line up with the header.
pub fn split_cells(line: &str) -> Vec<String> {
    static SPACES: OnceLock<Regex> = OnceLock::new();
    let spaces = SPACES.get_or_init(|| Regex::new(r"\s{2,}").expect("valid column gap pattern"));

    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if trimmed.contains('|') {
        let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
        let inner = inner.strip_suffix('|').unwrap_or(inner);
        return inner.split('|').map(|c| c.trim().to_string()).collect();
    }

    if trimmed.contains('\t') {
        return trimmed
            .split('\t')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
    }

    spaces
        .split(trimmed)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

/// `---`, `|:---|---:|`, `===` and friends
pub fn is_separator_line(line: &str) -> bool {
    let chars: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
    if chars.is_empty() {
        return false;
    }

    let separator_chars: HashSet<char> = ['-', '=', '_', '|', ':', '+'].iter().cloned().collect();
    let dashes = chars.iter().filter(|&&c| c == '-' || c == '=').count();

    chars.iter().all(|c| separator_chars.contains(c)) && dashes >= 3
}

struct TableBuilder {
    start_line: usize,
    header: Option<Vec<Option<Column>>>,
    rows: Vec<TableRow>,
    has_separator: bool,
}

impl TableBuilder {
    fn new(start_line: usize) -> Self {
        Self {
            start_line,
            header: None,
            rows: Vec::new(),
            has_separator: false,
        }
    }

    fn set_header(&mut self, columns: Vec<Option<Column>>) {
        self.header = Some(columns);
    }

    fn add_row(&mut self, line_number: usize, line: &str) {
        let cells = split_cells(line);
        if cells.iter().all(|c| c.is_empty()) {
            return;
        }

        self.rows.push(TableRow {
            cells,
            raw_line: line.to_string(),
            line_number,
        });
    }

    fn build(self) -> Option<ParsedTable> {
        let end_line = self.rows.last()?.line_number;

        let column_count = self.rows.iter()
            .map(|row| row.cells.len())
            .max();

        Some(ParsedTable {
            header: self.header,
            rows: self.rows,
            start_line: self.start_line,
            end_line,
            column_count,
            has_header_separator: self.has_separator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(lines: &[&str]) -> TableRegion {
        TableRegion {
            start_line: 0,
            end_line: lines.len().saturating_sub(1),
            lines: lines.iter().map(|l| l.to_string()).collect(),
            confidence: 1.0,
        }
    }

    #[test]
    fn test_split_pipe_cells_keeps_empty_positions() {
        assert_eq!(split_cells("| a71288 |  | Due |"), vec!["a71288", "", "Due"]);
        assert_eq!(split_cells("a71288 | FL288"), vec!["a71288", "FL288"]);
    }

    #[test]
    fn test_split_whitespace_and_tabs() {
        assert_eq!(split_cells("a71288    Boeing 737   Due"), vec!["a71288", "Boeing 737", "Due"]);
        assert_eq!(split_cells("a71288\tFL288\t\tDue"), vec!["a71288", "FL288", "Due"]);
    }

    #[test]
    fn test_separator_lines() {
        assert!(is_separator_line("|---|---|"));
        assert!(is_separator_line("| :--- | ---: |"));
        assert!(is_separator_line("========"));
        assert!(!is_separator_line("| a71288 | --- |"));
        assert!(!is_separator_line("--"));
    }

    #[test]
    fn test_header_mapping() {
        assert_eq!(Column::from_header("ICAO24"), Some(Column::Icao24));
        assert_eq!(Column::from_header("Maintenance Type"), Some(Column::MaintenanceType));
        assert_eq!(Column::from_header("Aircraft Type"), Some(Column::AircraftType));
        assert_eq!(Column::from_header("Flight #"), Some(Column::FlightNumber));
        assert_eq!(Column::from_header("Notes"), None);
    }

    #[test]
    fn test_parse_region_with_header() {
        let parser = TableParser::new();
        let table = parser
            .parse_region(&region(&[
                "| ICAO24 | Flight | Status |",
                "|--------|--------|--------|",
                "| a71288 | FL288  | Due    |",
            ]))
            .unwrap();

        assert!(table.has_header_separator);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.column_index(Column::Status), Some(2));
        assert_eq!(table.rows[0].cells[1], "FL288");
    }

    #[test]
    fn test_parse_region_without_header() {
        let table = TableParser::new()
            .parse_region(&region(&["| a71288 | FL288 |", "| ac21e4 | FL1e4 |"]))
            .unwrap();
        assert!(table.header.is_none());
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn test_header_only_region_builds_nothing() {
        let parser = TableParser::new();
        assert!(parser.parse_region(&region(&["| ICAO24 | Flight |", "|---|---|"])).is_none());
    }
}
