use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::debug;

use super::detector::SmartTableDetector;
use super::parser::{Column, ParsedTable, TableParser};
use super::{looks_like_icao24, ExtractionSummary};
use crate::flight::{normalize_record, FlightRecord, MaintenanceType};

const STATUS_WORDS: &[&str] = &[
    "needs maintenance", "in progress", "overdue", "due", "scheduled", "pending",
    "completed", "cancelled", "canceled", "grounded", "serviceable", "ok",
];

/// Result of scanning one reply
#[derive(Debug, Clone, Default)]
pub struct ExtractedTable {
    pub flights: Vec<FlightRecord>,
    /// Reply text with the lines that produced flights removed
    pub leftover_text: String,
    pub summary: ExtractionSummary,
}

impl ExtractedTable {
    pub fn has_flights(&self) -> bool {
        !self.flights.is_empty()
    }
}

/// Finds flight rows in a chat reply without any network call.
///
/// Two passes: delimited tables found by the detector, then bulleted or
/// delimited list lines where at least two lines carry an ICAO24 address as
/// a cell of its own. Prose sentences never become rows. Rows without an
/// address are dropped; nothing here fails.
pub struct TableExtractor {
    parser: TableParser,
    detector: SmartTableDetector,
    min_list_rows: usize,
}

impl TableExtractor {
    pub fn new() -> Self {
        Self {
            parser: TableParser::new(),
            detector: SmartTableDetector::new(),
            min_list_rows: 2,
        }
    }

    pub fn extract(&self, content: &str) -> ExtractedTable {
        let lines: Vec<&str> = content.lines().collect();
        let mut consumed: HashSet<usize> = HashSet::new();
        let mut flights = Vec::new();
        let mut summary = ExtractionSummary::default();

        // Pass 1: delimited tables
        let regions = self.detector.detect_tables_smart(content);
        summary.regions_found = regions.len();

        for region in &regions {
            let Some(table) = self.parser.parse_region(region) else {
                continue;
            };
            summary.tables_parsed += 1;

            let rows = self.table_to_flights(&table, &mut summary);
            if !rows.is_empty() {
                consumed.extend(region.start_line..=region.end_line);
                flights.extend(rows);
            }
        }

        // Pass 2: list rows outside the tables
        let candidates: Vec<(usize, Vec<String>)> = lines
            .iter()
            .enumerate()
            .filter(|(i, line)| !consumed.contains(i) && line_has_icao24(line))
            .filter_map(|(i, line)| list_row_cells(line).map(|cells| (i, cells)))
            .collect();

        if candidates.len() >= self.min_list_rows {
            for (i, cells) in candidates {
                summary.list_rows += 1;
                match normalize_record(&Value::Object(infer_fields(&cells))) {
                    Some(record) => {
                        consumed.insert(i);
                        flights.push(record);
                    }
                    None => summary.rows_dropped += 1,
                }
            }
        }

        summary.flights_extracted = flights.len();

        let leftover_text = lines
            .iter()
            .enumerate()
            .filter(|(i, _)| !consumed.contains(i))
            .map(|(_, line)| *line)
            .collect::<Vec<_>>()
            .join("\n");

        debug!("{}", summary.summary());

        ExtractedTable {
            flights,
            leftover_text,
            summary,
        }
    }

    fn table_to_flights(&self, table: &ParsedTable, summary: &mut ExtractionSummary) -> Vec<FlightRecord> {
        let mut flights = Vec::new();

        for row in &table.rows {
            let raw = match &table.header {
                Some(header) if table.column_index(Column::Icao24).is_some() => map_by_header(header, &row.cells),
                Some(header) => {
                    // Header without an address column: take the address from the cells
                    let mut mapped = map_by_header(header, &row.cells);
                    if let Some(icao) = infer_fields(&row.cells).remove(Column::Icao24.key()) {
                        mapped.insert(Column::Icao24.key().to_string(), icao);
                    }
                    mapped
                }
                None => infer_fields(&row.cells),
            };

            match normalize_record(&Value::Object(raw)) {
                Some(record) => flights.push(record),
                None => summary.rows_dropped += 1,
            }
        }

        flights
    }
}

impl Default for TableExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn map_by_header(header: &[Option<Column>], cells: &[String]) -> Map<String, Value> {
    let mut map = Map::new();

    for (column, cell) in header.iter().zip(cells.iter()) {
        let Some(column) = column else { continue };
        if cell.is_empty() {
            continue;
        }
        let value = match column {
            Column::MaintenanceType => canonical_maintenance(cell),
            _ => cell.clone(),
        };
        map.insert(column.key().to_string(), Value::String(value));
    }

    map
}

/// Guess which cell is which from its shape alone
fn infer_fields(cells: &[String]) -> Map<String, Value> {
    let mut map = Map::new();

    let icao_cell = cells.iter().position(|c| looks_like_icao24(c));
    let icao = match icao_cell {
        Some(i) => Some(cells[i].trim().to_string()),
        None => cells.iter().flat_map(|c| tokens(c)).find(|t| looks_like_icao24(t)).map(str::to_string),
    };

    if let Some(ref icao) = icao {
        map.insert(Column::Icao24.key().to_string(), Value::String(icao.clone()));
    }

    for (i, cell) in cells.iter().enumerate() {
        if Some(i) == icao_cell || cell.is_empty() {
            continue;
        }
        // A cell quoting the address is a sentence, not a field
        let holds_icao = icao.as_deref().map_or(false, |code| cell.contains(code));

        let column = if cell.parse::<MaintenanceType>().is_ok() {
            Column::MaintenanceType
        } else if holds_icao {
            continue;
        } else if looks_like_status(cell) {
            Column::Status
        } else if looks_like_flight_number(cell) {
            Column::FlightNumber
        } else if cell.chars().any(|c| c.is_alphabetic()) {
            Column::AircraftType
        } else {
            continue;
        };

        if map.contains_key(column.key()) {
            continue;
        }

        let value = match column {
            Column::MaintenanceType => canonical_maintenance(cell),
            _ => cell.clone(),
        };
        map.insert(column.key().to_string(), Value::String(value));
    }

    // "due for a C-Check" inside a longer cell still names the check
    if !map.contains_key(Column::MaintenanceType.key()) {
        if let Some(kind) = cells.iter().find_map(|c| MaintenanceType::detect_in_text(c)) {
            map.insert(Column::MaintenanceType.key().to_string(), Value::String(kind.as_str().to_string()));
        }
    }

    map
}

fn canonical_maintenance(cell: &str) -> String {
    cell.parse::<MaintenanceType>()
        .map(|t| t.as_str().to_string())
        .unwrap_or_else(|_| cell.to_string())
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_ascii_alphanumeric()).filter(|t| !t.is_empty())
}

fn line_has_icao24(line: &str) -> bool {
    tokens(line).any(looks_like_icao24)
}

fn looks_like_status(cell: &str) -> bool {
    let lower = cell.to_lowercase();
    let words: Vec<&str> = lower.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()).collect();

    STATUS_WORDS.iter().any(|status| {
        if status.contains(' ') {
            lower.contains(status)
        } else {
            words.contains(status)
        }
    })
}

fn looks_like_flight_number(cell: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z]{2,3}[0-9][0-9A-Za-z]{0,4}$").expect("valid flight number pattern")
    });
    pattern.is_match(cell.trim())
}

fn bullet_pattern() -> &'static Regex {
    static BULLET: OnceLock<Regex> = OnceLock::new();
    BULLET.get_or_init(|| Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s+").expect("valid bullet pattern"))
}

/// Cells of a line shaped like a list row, or `None` for prose.
///
/// The line must be bulleted or split into at least two cells, and one
/// cell must be an ICAO24 address on its own.
fn list_row_cells(line: &str) -> Option<Vec<String>> {
    let cells = split_list_line(line);
    let shaped = bullet_pattern().is_match(line) || cells.len() >= 2;
    (shaped && cells.iter().any(|c| looks_like_icao24(c))).then_some(cells)
}

/// Split "1. a71288 - FL288 - Boeing 737 - Due" into cells
fn split_list_line(line: &str) -> Vec<String> {
    static DELIMS: OnceLock<Regex> = OnceLock::new();
    let bullet = bullet_pattern();
    let delims = DELIMS.get_or_init(|| {
        Regex::new(r"\s*(?:\||\t|,|;|\s[-–—:]\s|\s{2,})\s*").expect("valid list delimiter pattern")
    });

    let body = bullet.replace(line, "");
    let body = body.replace("**", "");

    delims
        .split(body.trim())
        .map(|c| c.trim().trim_end_matches(':').trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipe_table_with_header() {
        let reply = "Here is the maintenance table:\n\n\
            | ICAO24 | Flight | Aircraft | Status | Maintenance Type |\n\
            |--------|--------|----------|--------|------------------|\n\
            | 780B67 | FLB67 | Boeing 737 | Due | C Check |\n\
            | A67B89 | FLB89 | Airbus A320 | Overdue | C-Check |\n\n\
            Let me know if you want to schedule them.";

        let extracted = TableExtractor::new().extract(reply);
        assert_eq!(extracted.flights.len(), 2);

        let first = &extracted.flights[0];
        assert_eq!(first.icao24, "780B67");
        assert_eq!(first.flight_number.as_deref(), Some("FLB67"));
        assert_eq!(first.aircraft_type.as_deref(), Some("Boeing 737"));
        assert_eq!(first.status, "Due");
        assert_eq!(first.maintenance_type, "C-Check");

        assert!(!extracted.leftover_text.contains("780B67"));
        assert!(extracted.leftover_text.contains("Let me know"));
    }

    #[test]
    fn test_missing_fields_get_defaults() {
        let reply = "| ICAO24 | Flight |\n|---|---|\n| a71288 | FL288 |\n| ac21e4 |  |";
        let extracted = TableExtractor::new().extract(reply);
        assert_eq!(extracted.flights.len(), 2);
        assert_eq!(extracted.flights[1].flight_number, None);
        assert_eq!(extracted.flights[1].status, "Needs Maintenance");
        assert_eq!(extracted.flights[1].maintenance_type, "A-Check");
    }

    #[test]
    fn test_rows_without_identifier_are_dropped() {
        let reply = "| ICAO24 | Flight | Status |\n|---|---|---|\n| a71288 | FL288 | Due |\n|  | FL999 | Due |";
        let extracted = TableExtractor::new().extract(reply);
        assert_eq!(extracted.flights.len(), 1);
        assert_eq!(extracted.summary.rows_dropped, 1);
    }

    #[test]
    fn test_headerless_table_infers_columns() {
        let reply = "a71288    FL288    Boeing 737    Due    A-Check\nac21e4    FL1e4    Airbus A320   Overdue    B-Check";
        let extracted = TableExtractor::new().extract(reply);
        assert_eq!(extracted.flights.len(), 2);
        assert_eq!(extracted.flights[1].icao24, "ac21e4");
        assert_eq!(extracted.flights[1].status, "Overdue");
        assert_eq!(extracted.flights[1].maintenance_type, "B-Check");
        assert_eq!(extracted.flights[1].aircraft_type.as_deref(), Some("Airbus A320"));
    }

    #[test]
    fn test_numbered_list_rows() {
        let reply = "Aircraft needing checks:\n1. a71288 - FL288 - Boeing 737 - Due\n2. ac21e4 - FL1e4 - Airbus A320 - Overdue\nThat's all.";
        let extracted = TableExtractor::new().extract(reply);
        assert_eq!(extracted.flights.len(), 2);
        assert_eq!(extracted.flights[0].flight_number.as_deref(), Some("FL288"));
        assert_eq!(extracted.leftover_text, "Aircraft needing checks:\nThat's all.");
    }

    #[test]
    fn test_single_mention_is_not_a_list() {
        let reply = "Aircraft a71288 is due for inspection next week.";
        let extracted = TableExtractor::new().extract(reply);
        assert!(extracted.flights.is_empty());
        assert_eq!(extracted.leftover_text, reply);
    }

    #[test]
    fn test_prose_sentences_are_not_rows() {
        let reply = "Aircraft 780B67 is due for a C-Check next week.\nAircraft A67B89 is overdue and grounded until parts arrive.";
        let extracted = TableExtractor::new().extract(reply);
        assert!(extracted.flights.is_empty());
        assert_eq!(extracted.leftover_text, reply);
    }

    #[test]
    fn test_numbers_in_prose_are_not_addresses() {
        let reply = "The fleet logged 125000 hours this year.\nThe maintenance budget is 250000 dollars.";
        let extracted = TableExtractor::new().extract(reply);
        assert!(extracted.flights.is_empty());
        assert_eq!(extracted.leftover_text, reply);
    }

    #[test]
    fn test_sentence_cells_never_fill_fields() {
        let reply = "- 780B67 - Aircraft 780B67 is due for a C-Check next week\n- A67B89 - Overdue";
        let extracted = TableExtractor::new().extract(reply);
        assert_eq!(extracted.flights.len(), 2);

        let first = &extracted.flights[0];
        assert_eq!(first.icao24, "780B67");
        assert_eq!(first.status, "Needs Maintenance");
        assert_eq!(first.aircraft_type, None);
        assert_eq!(first.maintenance_type, "C-Check");
        assert_eq!(extracted.flights[1].status, "Overdue");
    }

    #[test]
    fn test_no_table_content() {
        let reply = "I can help you track maintenance. Ask me about A-Check or C-Check flights.";
        let extracted = TableExtractor::new().extract(reply);
        assert!(!extracted.has_flights());
        assert_eq!(extracted.summary.flights_extracted, 0);
    }

    #[test]
    fn test_garbage_input_never_panics() {
        for input in ["", "|", "||||", "| | |\n| | |", "\t\t\t", "---\n---", "a71288"] {
            let extracted = TableExtractor::new().extract(input);
            assert!(extracted.flights.iter().all(|f| !f.icao24.is_empty()));
        }
    }
}
