//! Cell text for report rows. Absent, empty and zero values all show the
//! placeholder.

use crate::models::{AggregateTotals, MonthMetric, RowRecord};
use crate::schema::{ColumnSchema, FixedColumn, MetricColumn, TARGET_DISPLAY};

pub const PLACEHOLDER: &str = "-";
pub const MEETS_EXPECTATION: &str = "Meets Expectation";
pub const BELOW_EXPECTATION: &str = "Below Expectation";

/// Display lines of one cell; the table stacks them, CSV joins them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    lines: Vec<String>,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell {
            lines: vec![value.into()],
        }
    }

    pub fn blank() -> Self {
        Cell { lines: Vec::new() }
    }

    pub fn placeholder() -> Self {
        Cell::text(PLACEHOLDER)
    }

    pub fn stacked(first: impl Into<String>, second: impl Into<String>) -> Self {
        Cell {
            lines: vec![first.into(), second.into()],
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Single-cell form for CSV: `95% (Below Expectation)`.
    pub fn collapse(&self) -> String {
        match self.lines.as_slice() {
            [] => String::new(),
            [only] => only.clone(),
            lines if lines.iter().all(|line| line == PLACEHOLDER) => PLACEHOLDER.to_string(),
            [first, rest @ ..] => format!("{first} ({})", rest.join(", ")),
        }
    }
}

pub fn present_number(value: Option<f64>) -> Option<f64> {
    value.filter(|n| n.is_finite() && *n != 0.0)
}

pub fn present_text(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Two decimals at most, trailing zeros dropped: `38`, `3.2`, `87.55`.
pub fn format_number(value: f64) -> String {
    let formatted = format!("{value:.2}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

fn number_or_placeholder(value: Option<f64>) -> String {
    present_number(value)
        .map(format_number)
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

fn text_or_placeholder(value: Option<&str>) -> String {
    present_text(value)
        .map(str::to_string)
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

pub fn expectation_label(rate: f64) -> &'static str {
    if rate == 100.0 {
        MEETS_EXPECTATION
    } else {
        BELOW_EXPECTATION
    }
}

pub fn metric_cell(metric: MetricColumn, data: Option<&MonthMetric>) -> Cell {
    let Some(data) = data else {
        return match metric {
            MetricColumn::Epgf => Cell::stacked(PLACEHOLDER, PLACEHOLDER),
            _ => Cell::placeholder(),
        };
    };

    match metric {
        MetricColumn::Submitted => Cell::text(number_or_placeholder(data.submitted)),
        MetricColumn::CompletionRate => match present_number(data.completion_rate) {
            Some(rate) => Cell::stacked(format!("{}%", format_number(rate)), expectation_label(rate)),
            None => Cell::placeholder(),
        },
        MetricColumn::Epgf => Cell::stacked(
            number_or_placeholder(data.epgf_average),
            text_or_placeholder(data.proficiency_level.as_deref()),
        ),
        MetricColumn::Champion => Cell::text(text_or_placeholder(data.champion.as_deref())),
        MetricColumn::ChampionEpgf => match present_number(data.champion_epgf_average) {
            Some(average) => Cell::stacked(
                format_number(average),
                text_or_placeholder(data.champion_proficiency_level.as_deref()),
            ),
            None => Cell::placeholder(),
        },
    }
}

fn fixed_cell(column: FixedColumn, year_level: &str, row: &RowRecord) -> Cell {
    match column {
        FixedColumn::YearLevel => Cell::text(year_level),
        FixedColumn::Program => Cell::text(text_or_placeholder(row.program.as_deref())),
        FixedColumn::Expected => Cell::text(number_or_placeholder(row.enrolled_students)),
        FixedColumn::Target => Cell::text(TARGET_DISPLAY),
        FixedColumn::CourseTitle => Cell::text(text_or_placeholder(row.course_title.as_deref())),
        FixedColumn::Faculty => Cell::text(text_or_placeholder(row.faculty.as_deref())),
    }
}

pub fn data_row(schema: &ColumnSchema, months: &[&str], year_level: &str, row: &RowRecord) -> Vec<Cell> {
    let mut cells: Vec<Cell> = schema
        .fixed()
        .iter()
        .map(|column| fixed_cell(*column, year_level, row))
        .collect();

    for month in months {
        let data = row.month(month);
        cells.extend(schema.metrics().iter().map(|metric| metric_cell(*metric, data)));
    }

    cells
}

/// Label in the first fixed column, expected count under its header, the
/// other fixed cells blank.
pub fn totals_row(schema: &ColumnSchema, months: &[&str], label: &str, totals: &AggregateTotals) -> Vec<Cell> {
    let mut cells: Vec<Cell> = schema
        .fixed()
        .iter()
        .enumerate()
        .map(|(index, column)| match (index, column) {
            (0, _) => Cell::text(label),
            (_, FixedColumn::Expected) => Cell::text(number_or_placeholder(totals.expected_submissions)),
            _ => Cell::blank(),
        })
        .collect();

    for month in months {
        let data = totals.month(month);
        cells.extend(schema.metrics().iter().map(|metric| metric_cell(*metric, Some(&data))));
    }

    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    fn august() -> MonthMetric {
        MonthMetric {
            submitted: Some(38.0),
            completion_rate: Some(95.0),
            epgf_average: Some(3.2),
            proficiency_level: Some("Proficient".to_string()),
            ..MonthMetric::default()
        }
    }

    #[test]
    fn expectation_label_requires_exactly_one_hundred() {
        assert_eq!(expectation_label(100.0), MEETS_EXPECTATION);
        assert_eq!(expectation_label(99.99), BELOW_EXPECTATION);
        assert_eq!(expectation_label(100.5), BELOW_EXPECTATION);
    }

    #[test]
    fn completion_rate_shows_label_only_when_present() {
        let cell = metric_cell(MetricColumn::CompletionRate, Some(&august()));
        assert_eq!(cell.lines(), ["95%", BELOW_EXPECTATION]);

        let zero = MonthMetric {
            completion_rate: Some(0.0),
            ..MonthMetric::default()
        };
        assert_eq!(metric_cell(MetricColumn::CompletionRate, Some(&zero)).lines(), [PLACEHOLDER]);
    }

    #[test]
    fn zero_and_absent_both_render_placeholder() {
        let zero = MonthMetric {
            submitted: Some(0.0),
            ..MonthMetric::default()
        };
        assert_eq!(metric_cell(MetricColumn::Submitted, Some(&zero)).collapse(), PLACEHOLDER);
        assert_eq!(metric_cell(MetricColumn::Submitted, None).collapse(), PLACEHOLDER);
        assert_eq!(metric_cell(MetricColumn::Epgf, None).collapse(), PLACEHOLDER);
    }

    #[test]
    fn champion_pair_requires_champion_average() {
        let without_average = MonthMetric {
            champion: Some("Ana Reyes".to_string()),
            champion_proficiency_level: Some("Advanced".to_string()),
            ..MonthMetric::default()
        };
        assert_eq!(
            metric_cell(MetricColumn::ChampionEpgf, Some(&without_average)).lines(),
            [PLACEHOLDER]
        );

        let with_average = MonthMetric {
            champion_epgf_average: Some(3.85),
            ..without_average
        };
        assert_eq!(
            metric_cell(MetricColumn::ChampionEpgf, Some(&with_average)).collapse(),
            "3.85 (Advanced)"
        );
    }

    #[test]
    fn collapse_joins_stacked_lines() {
        assert_eq!(metric_cell(MetricColumn::Epgf, Some(&august())).collapse(), "3.2 (Proficient)");
        assert_eq!(
            metric_cell(MetricColumn::CompletionRate, Some(&august())).collapse(),
            "95% (Below Expectation)"
        );
        assert_eq!(Cell::blank().collapse(), "");
    }

    #[test]
    fn numbers_drop_trailing_zeros() {
        assert_eq!(format_number(38.0), "38");
        assert_eq!(format_number(3.2), "3.2");
        assert_eq!(format_number(87.556), "87.56");
        assert_eq!(format_number(100.0), "100");
    }

    #[test]
    fn totals_row_places_label_and_expected() {
        let schema = ColumnSchema::with_faculty();
        let totals = AggregateTotals {
            expected_submissions: Some(120.0),
            ..AggregateTotals::default()
        };
        let row = totals_row(&schema, &["August"], "Grand Total", &totals);

        assert_eq!(row.len(), schema.column_count(1));
        assert_eq!(row[0].collapse(), "Grand Total");
        assert_eq!(row[2].collapse(), "120");
        assert_eq!(row[3].collapse(), "");
        assert_eq!(row[6].collapse(), PLACEHOLDER);
    }
}
