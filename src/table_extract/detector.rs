use super::parser::split_cells;

/// Scores each line of a reply and groups runs of table-like lines.
pub struct SmartTableDetector {
    confidence_threshold: f32,
}

impl SmartTableDetector {
    pub fn new() -> Self {
        Self {
            confidence_threshold: 0.5,
        }
    }

    pub fn detect_tables_smart(&self, content: &str) -> Vec<TableRegion> {
        let lines: Vec<&str> = content.lines().collect();
        let mut regions = Vec::new();
        let mut current_region: Option<TableRegionBuilder> = None;

        for (i, line) in lines.iter().enumerate() {
            let confidence = self.calculate_table_confidence(line, i, &lines);

            if confidence > self.confidence_threshold {
                let region = current_region.get_or_insert_with(|| TableRegionBuilder::new(i));
                region.add_line(line, confidence);
            } else if let Some(region) = current_region.take() {
                if let Some(table) = region.build() {
                    regions.push(table);
                }
            }
        }

        // Don't forget last region
        if let Some(region) = current_region {
            if let Some(table) = region.build() {
                regions.push(table);
            }
        }

        regions
    }

    fn calculate_table_confidence(&self, line: &str, index: usize, all_lines: &[&str]) -> f32 {
        // Lines without any column delimiter are prose, whatever their neighbours look like
        let delimiter_score = self.score_delimiters(line);
        if delimiter_score == 0.0 {
            return 0.0;
        }

        let mut score = delimiter_score * 0.3;

        // Structural consistency with nearby lines
        score += self.score_consistency(line, index, all_lines) * 0.4;

        // Content pattern (looks like data)
        score += self.score_content_pattern(line) * 0.3;

        score
    }

    fn score_delimiters(&self, line: &str) -> f32 {
        let pipe_count = line.chars().filter(|&c| c == '|').count();
        let tab_count = line.chars().filter(|&c| c == '\t').count();
        let multi_space_count = self.count_multi_spaces(line.trim());

        let delimiter_total = pipe_count + tab_count + multi_space_count;

        if delimiter_total < 2 {
            // A single delimiter is a sentence with a stray pipe, not a table
            0.0
        } else if delimiter_total < 4 {
            0.7
        } else {
            1.0
        }
    }

    fn count_multi_spaces(&self, line: &str) -> usize {
        let mut count = 0;
        let mut run = 0;

        for c in line.chars() {
            if c == ' ' {
                run += 1;
            } else {
                if run >= 2 {
                    count += 1;
                }
                run = 0;
            }
        }

        count
    }

    fn score_consistency(&self, line: &str, index: usize, all_lines: &[&str]) -> f32 {
        let window: i64 = 2; // Look at 2 lines above and below
        let mut similar_lines = 0;
        let mut total_compared = 0;

        for offset in -window..=window {
            if offset == 0 {
                continue;
            }

            let check_index = index as i64 + offset;
            if check_index >= 0 && (check_index as usize) < all_lines.len() {
                total_compared += 1;

                if self.structurally_similar(line, all_lines[check_index as usize]) {
                    similar_lines += 1;
                }
            }
        }

        if total_compared == 0 {
            0.5 // Neutral score if no comparison possible
        } else {
            similar_lines as f32 / total_compared as f32
        }
    }

    fn structurally_similar(&self, line1: &str, line2: &str) -> bool {
        if line2.trim().is_empty() {
            return false;
        }

        let piped = line1.contains('|');
        if piped != line2.contains('|') {
            return false;
        }

        let segments1 = split_cells(line1);
        let segments2 = split_cells(line2);

        if segments1.len() < 2 || segments2.len() < 2 {
            return false;
        }

        // Similar number of segments
        if (segments1.len() as i64 - segments2.len() as i64).abs() > 1 {
            return false;
        }

        // Pipe tables do not need aligned columns; whitespace tables do
        piped || self.positions_similar(&column_starts(line1), &column_starts(line2))
    }

    fn positions_similar(&self, pos1: &[usize], pos2: &[usize]) -> bool {
        if pos1.len() != pos2.len() {
            return false;
        }

        let max_deviation = 5;
        pos1.iter()
            .zip(pos2.iter())
            .all(|(p1, p2)| (*p1 as i64 - *p2 as i64).abs() <= max_deviation)
    }

    fn score_content_pattern(&self, line: &str) -> f32 {
        let segments = split_cells(line);
        let segments: Vec<&String> = segments.iter().filter(|s| !s.is_empty()).collect();

        if segments.is_empty() {
            return 0.0;
        }

        let mut pattern_score = 0.0;

        // Short segments (typical of table cells)
        let avg_length = segments.iter().map(|s| s.chars().count()).sum::<usize>() / segments.len();
        if avg_length < 20 {
            pattern_score += 0.3;
        }

        // Identifiers and numbers
        let numeric_segments = segments.iter().filter(|s| self.looks_numeric(s)).count();
        pattern_score += (numeric_segments as f32 / segments.len() as f32) * 0.3;

        // A transponder address is the strongest hint we get
        if segments.iter().any(|s| super::looks_like_icao24(s)) {
            pattern_score += 0.4;
        } else if segments.len() >= 2 {
            pattern_score += 0.2;
        }

        pattern_score.min(1.0)
    }

    fn looks_numeric(&self, segment: &str) -> bool {
        let digits = segment.chars().filter(|c| c.is_ascii_digit()).count();
        digits > 0 && digits > segment.chars().count() / 3
    }
}

impl Default for SmartTableDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Byte offsets where whitespace-separated columns begin
fn column_starts(line: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut run = 0;
    let mut in_text = false;

    for (i, c) in line.char_indices() {
        if c == ' ' || c == '\t' {
            run += if c == '\t' { 2 } else { 1 };
            in_text = false;
        } else {
            if !in_text && (starts.is_empty() || run >= 2) {
                starts.push(i);
            }
            in_text = true;
            run = 0;
        }
    }

    starts
}

#[derive(Debug, Clone)]
pub struct TableRegion {
    pub start_line: usize,
    pub end_line: usize,
    pub lines: Vec<String>,
    pub confidence: f32,
}

struct TableRegionBuilder {
    start_line: usize,
    lines: Vec<(String, f32)>,
}

impl TableRegionBuilder {
    fn new(start_line: usize) -> Self {
        Self {
            start_line,
            lines: Vec::new(),
        }
    }

    fn add_line(&mut self, line: &str, confidence: f32) {
        self.lines.push((line.to_string(), confidence));
    }

    fn build(self) -> Option<TableRegion> {
        if self.lines.is_empty() {
            return None;
        }

        let avg_confidence = self.lines.iter()
            .map(|(_, conf)| conf)
            .sum::<f32>() / self.lines.len() as f32;

        Some(TableRegion {
            start_line: self.start_line,
            end_line: self.start_line + self.lines.len() - 1,
            lines: self.lines.into_iter().map(|(line, _)| line).collect(),
            confidence: avg_confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIPE_REPLY: &str = "The following aircraft are due:\n\n| ICAO24 | Flight | Status |\n|---|---|---|\n| a71288 | FL288 | Due |\n| ac21e4 | FL1e4 | Overdue |\n\nAnything else?";

    #[test]
    fn test_detects_pipe_table_region() {
        let detector = SmartTableDetector::new();
        let regions = detector.detect_tables_smart(PIPE_REPLY);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].start_line, 2);
        assert_eq!(regions[0].end_line, 5);
        assert_eq!(regions[0].lines.len(), 4);
    }

    #[test]
    fn test_detects_whitespace_aligned_table() {
        let text = "a71288    FL288    Boeing 737    Due\nac21e4    FL1e4    Airbus A320   Overdue\na737c7    FL7c7    Boeing 777    Due";
        let regions = SmartTableDetector::new().detect_tables_smart(text);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].lines.len(), 3);
    }

    #[test]
    fn test_prose_is_not_a_table() {
        let text = "Your fleet looks healthy today.\nNo aircraft are overdue for checks.\nAsk me about a specific tail.";
        assert!(SmartTableDetector::new().detect_tables_smart(text).is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(SmartTableDetector::new().detect_tables_smart("").is_empty());
    }
}
