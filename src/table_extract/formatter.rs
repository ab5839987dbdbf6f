use crate::flight::FlightRecord;

const HEADERS: [&str; 5] = ["ICAO24", "Flight", "Aircraft", "Status", "Maintenance"];

/// Renders flight records as an aligned pipe table for the terminal.
pub struct TableFormatter {
    padding: usize,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self { padding: 1 }
    }

    /// Title line the chat view puts above a flight table
    pub fn title_for(flights: &[FlightRecord]) -> String {
        let maintenance_type = flights
            .first()
            .map(|f| f.maintenance_type.as_str())
            .unwrap_or(crate::flight::DEFAULT_MAINTENANCE_TYPE);
        format!("{} Aircraft ({} flights)", maintenance_type, flights.len())
    }

    pub fn format_flights(&self, flights: &[FlightRecord]) -> String {
        if flights.is_empty() {
            return String::new();
        }

        let rows: Vec<[String; 5]> = flights.iter().map(row_cells).collect();
        let column_widths = self.calculate_column_widths(&rows);

        let mut formatted = Vec::with_capacity(rows.len() + 2);
        let header = HEADERS.map(str::to_string);
        formatted.push(self.format_row(&header, &column_widths));
        formatted.push(self.create_separator(&column_widths));

        for row in &rows {
            formatted.push(self.format_row(row, &column_widths));
        }

        formatted.join("\n")
    }

    fn calculate_column_widths(&self, rows: &[[String; 5]]) -> Vec<usize> {
        let mut widths: Vec<usize> = HEADERS.iter().map(|h| h.chars().count()).collect();

        for row in rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        // Add padding
        widths.iter_mut().for_each(|w| *w += self.padding * 2);

        widths
    }

    fn format_row(&self, cells: &[String; 5], widths: &[usize]) -> String {
        let formatted_cells: Vec<String> = cells
            .iter()
            .zip(widths)
            .map(|(content, &width)| self.pad_content(content, width))
            .collect();

        format!("|{}|", formatted_cells.join("|"))
    }

    fn pad_content(&self, content: &str, width: usize) -> String {
        let inner = width.saturating_sub(self.padding * 2);
        let pad = " ".repeat(self.padding);
        format!("{}{:<width$}{}", pad, content, pad, width = inner)
    }

    fn create_separator(&self, widths: &[usize]) -> String {
        let separators: Vec<String> = widths.iter()
            .map(|&w| "-".repeat(w))
            .collect();

        format!("|{}|", separators.join("|"))
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn row_cells(flight: &FlightRecord) -> [String; 5] {
    [
        flight.icao24.clone(),
        flight.flight_number.clone().unwrap_or_else(|| "-".to_string()),
        flight.aircraft_type.clone().unwrap_or_else(|| "-".to_string()),
        flight.status.clone(),
        flight.maintenance_type.clone(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<FlightRecord> {
        let mut first = FlightRecord::new("a71288");
        first.flight_number = Some("FL288".to_string());
        let mut second = FlightRecord::new("780B67");
        second.status = "Due".to_string();
        second.maintenance_type = "C-Check".to_string();
        vec![first, second]
    }

    #[test]
    fn test_title() {
        assert_eq!(TableFormatter::title_for(&sample()), "A-Check Aircraft (2 flights)");
        assert_eq!(TableFormatter::title_for(&[]), "A-Check Aircraft (0 flights)");
    }

    #[test]
    fn test_rows_are_aligned() {
        let rendered = TableFormatter::new().format_flights(&sample());
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("| ICAO24 |"));
        assert!(lines[1].chars().all(|c| c == '|' || c == '-'));
        let width = lines[0].chars().count();
        assert!(lines.iter().all(|l| l.chars().count() == width));
        assert!(lines[3].contains("| -"));
    }

    #[test]
    fn test_empty_renders_nothing() {
        assert_eq!(TableFormatter::new().format_flights(&[]), "");
    }
}
