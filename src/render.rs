use std::fmt::Write;

use crate::cells::{self, Cell};
use crate::models::{has_data_rows, AggregateTotals, ReportMatrix};
use crate::schema::ColumnSchema;

pub const NO_DATA: &str = "No data available";
pub const YEAR_TOTAL: &str = "Year Total";
pub const GRAND_TOTAL: &str = "Grand Total";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCell {
    pub text: String,
    pub colspan: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyRow {
    /// Year-level label over the fixed columns; `trailing` pads the months.
    Group { label: String, span: usize, trailing: usize },
    Data(Vec<Cell>),
    YearTotal(Vec<Cell>),
    GrandTotal(Vec<Cell>),
    Empty { span: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub head: Vec<Vec<HeaderCell>>,
    pub body: Vec<BodyRow>,
}

impl Table {
    pub fn data_rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.body.iter().filter_map(|row| match row {
            BodyRow::Data(cells) => Some(cells.as_slice()),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.body.as_slice(), [BodyRow::Empty { .. }])
    }

    pub fn to_html(&self) -> String {
        let mut output = String::new();

        let _ = writeln!(output, "<table class=\"eie-report\">");
        let _ = writeln!(output, "<thead>");
        for row in &self.head {
            let _ = write!(output, "<tr>");
            for cell in row {
                let _ = write!(output, "<th{}>{}</th>", colspan(cell.colspan), html_escape(&cell.text));
            }
            let _ = writeln!(output, "</tr>");
        }
        let _ = writeln!(output, "</thead>");
        let _ = writeln!(output, "<tbody>");

        for row in &self.body {
            match row {
                BodyRow::Group { label, span, trailing } => {
                    let _ = write!(
                        output,
                        "<tr class=\"year-level\"><td{}>{}</td>",
                        colspan(*span),
                        html_escape(label)
                    );
                    if *trailing > 0 {
                        let _ = write!(output, "<td{}></td>", colspan(*trailing));
                    }
                    let _ = writeln!(output, "</tr>");
                }
                BodyRow::Data(cells) => write_cells(&mut output, None, cells),
                BodyRow::YearTotal(cells) => write_cells(&mut output, Some("year-total"), cells),
                BodyRow::GrandTotal(cells) => write_cells(&mut output, Some("grand-total"), cells),
                BodyRow::Empty { span } => {
                    let _ = writeln!(
                        output,
                        "<tr class=\"empty\"><td{}>{}</td></tr>",
                        colspan(*span),
                        NO_DATA
                    );
                }
            }
        }

        let _ = writeln!(output, "</tbody>");
        let _ = writeln!(output, "</table>");
        output
    }
}

fn colspan(span: usize) -> String {
    if span > 1 {
        format!(" colspan=\"{span}\"")
    } else {
        String::new()
    }
}

fn write_cells(output: &mut String, class: Option<&str>, cells: &[Cell]) {
    match class {
        Some(class) => {
            let _ = write!(output, "<tr class=\"{class}\">");
        }
        None => {
            let _ = write!(output, "<tr>");
        }
    }
    for cell in cells {
        let lines: Vec<String> = cell.lines().iter().map(|line| html_escape(line)).collect();
        let _ = write!(output, "<td>{}</td>", lines.join("<br>"));
    }
    let _ = writeln!(output, "</tr>");
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

pub fn header_rows(schema: &ColumnSchema, months: &[&str]) -> Vec<Vec<HeaderCell>> {
    let metric_span = schema.metrics().len();

    let mut top = vec![HeaderCell {
        text: String::new(),
        colspan: schema.fixed().len(),
    }];
    top.extend(months.iter().map(|month| HeaderCell {
        text: month.to_string(),
        colspan: metric_span,
    }));

    let mut bottom: Vec<HeaderCell> = schema
        .fixed()
        .iter()
        .map(|column| HeaderCell {
            text: column.label().to_string(),
            colspan: 1,
        })
        .collect();
    for _ in months {
        bottom.extend(schema.metrics().iter().map(|metric| HeaderCell {
            text: metric.label().to_string(),
            colspan: 1,
        }));
    }

    vec![top, bottom]
}

/// Builds the report table. `year_level` limits output to one group; it is
/// applied to the data already fetched.
pub fn render_table(
    schema: &ColumnSchema,
    months: &[&str],
    matrix: &ReportMatrix,
    grand_totals: Option<&AggregateTotals>,
    year_level: Option<&str>,
) -> Table {
    let fixed_span = schema.fixed().len();
    let total_span = schema.column_count(months.len());
    let head = header_rows(schema, months);

    if !has_data_rows(matrix, year_level) {
        return Table {
            head,
            body: vec![BodyRow::Empty { span: total_span }],
        };
    }

    let mut body = Vec::new();

    for (label, level) in matrix {
        if year_level.is_some_and(|wanted| wanted != label.as_str()) {
            continue;
        }

        body.push(BodyRow::Group {
            label: label.clone(),
            span: fixed_span,
            trailing: total_span - fixed_span,
        });
        for row in level.rows.values() {
            body.push(BodyRow::Data(cells::data_row(schema, months, label, row)));
        }
        if let Some(totals) = &level.totals {
            body.push(BodyRow::YearTotal(cells::totals_row(
                schema,
                months,
                YEAR_TOTAL,
                totals,
            )));
        }
    }

    if let Some(totals) = grand_totals {
        body.push(BodyRow::GrandTotal(cells::totals_row(
            schema,
            months,
            GRAND_TOTAL,
            totals,
        )));
    }

    Table { head, body }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cells::{BELOW_EXPECTATION, PLACEHOLDER};
    use crate::filter::FilterState;
    use crate::models::{ReportResponse, Semester};
    use crate::schema::MetricColumn;

    fn scenario() -> ReportResponse {
        serde_json::from_str(
            r#"{"success": true, "data": {"1st Year": {"r1": {
                "program": "BSA", "enrolledStudents": 40, "courseTitle": "Eng101",
                "monthData": {"August": {"submitted": 38, "completionRate": 95,
                    "epgfAverage": 3.2, "proficiencyLevel": "Proficient"}}
            }}}}"#,
        )
        .unwrap()
    }

    #[test]
    fn header_spans_months_and_repeats_metric_labels() {
        let schema = ColumnSchema::standard();
        let months = Semester::First.months();
        let head = header_rows(&schema, months);

        assert_eq!(head[0].len(), 1 + 5);
        assert_eq!(head[0][1].text, "August");
        assert_eq!(head[0][1].colspan, 5);
        assert_eq!(head[0][5].text, "December");
        assert_eq!(head[1].len(), 5 + 25);
        assert_eq!(head[1][5].text, "Submitted");
        assert_eq!(head[1][10].text, "Submitted");
    }

    #[test]
    fn scenario_row_shows_august_values_and_placeholders() {
        let schema = ColumnSchema::standard();
        let months = Semester::First.months();
        let table = render_table(&schema, months, &scenario().data, None, None);

        assert!(matches!(&table.body[0], BodyRow::Group { label, .. } if label == "1st Year"));
        let rows: Vec<&[Cell]> = table.data_rows().collect();
        assert_eq!(rows.len(), 1);
        let row = rows[0];
        assert_eq!(row.len(), 30);

        let submitted = schema.metric_index(0, MetricColumn::Submitted).unwrap();
        let rate = schema.metric_index(0, MetricColumn::CompletionRate).unwrap();
        assert_eq!(row[submitted].lines(), ["38"]);
        assert_eq!(row[rate].lines(), ["95%", BELOW_EXPECTATION]);

        for month in 1..5 {
            for metric in MetricColumn::ALL {
                let index = schema.metric_index(month, metric).unwrap();
                assert!(row[index].lines().iter().all(|line| line == PLACEHOLDER));
            }
        }
    }

    #[test]
    fn empty_matrix_renders_no_data_row() {
        let schema = ColumnSchema::standard();
        let table = render_table(&schema, Semester::First.months(), &ReportMatrix::new(), None, None);

        assert!(table.is_empty());
        assert!(table.to_html().contains(NO_DATA));
    }

    #[test]
    fn year_level_filter_hides_other_groups() {
        let response: ReportResponse = serde_json::from_str(
            r#"{"success": true, "data": {
                "1st Year": {"a": {"program": "BSA"}},
                "2nd Year": {"b": {"program": "BSN"}}
            }}"#,
        )
        .unwrap();
        let schema = ColumnSchema::standard();
        let months = Semester::Second.months();

        let all = render_table(&schema, months, &response.data, None, None);
        assert_eq!(all.data_rows().count(), 2);

        let second = render_table(&schema, months, &response.data, None, Some("2nd Year"));
        let rows: Vec<&[Cell]> = second.data_rows().collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][1].lines(), ["BSN"]);

        let missing = render_table(&schema, months, &response.data, None, Some("4th Year"));
        assert!(missing.is_empty());
    }

    #[test]
    fn totals_rows_follow_their_groups() {
        let response: ReportResponse = serde_json::from_str(
            r#"{"success": true,
                "data": {"1st Year": {"a": {"program": "BSA"}, "totals": {"expectedSubmissions": 40}}},
                "grandTotals": {"expectedSubmissions": 40, "completionRate": {"August": 100}}}"#,
        )
        .unwrap();
        let schema = ColumnSchema::with_faculty();
        let months = Semester::First.months();
        let table = render_table(
            &schema,
            months,
            &response.data,
            response.grand_totals.as_ref(),
            None,
        );

        assert_eq!(table.body.len(), 4);
        assert!(matches!(table.body[2], BodyRow::YearTotal(_)));
        let BodyRow::GrandTotal(cells) = &table.body[3] else {
            panic!("expected grand total row last");
        };
        let rate = schema.metric_index(0, MetricColumn::CompletionRate).unwrap();
        assert_eq!(cells[rate].lines(), ["100%", "Meets Expectation"]);
    }

    #[test]
    fn refined_matrix_without_rows_shows_no_data() {
        let matrix: ReportMatrix =
            serde_json::from_str(r#"{"1st Year": {"a": {"program": "BSA"}}}"#).unwrap();
        let refined = FilterState {
            search: "zzz".to_string(),
            ..FilterState::default()
        }
        .refine(&matrix);
        let schema = ColumnSchema::standard();
        let grand = AggregateTotals {
            expected_submissions: Some(40.0),
            ..AggregateTotals::default()
        };

        let table = render_table(&schema, Semester::First.months(), &refined, Some(&grand), None);
        assert!(table.is_empty());
        assert!(table.to_html().contains(NO_DATA));
        assert!(!table.to_html().contains(GRAND_TOTAL));
    }

    #[test]
    fn year_levels_without_rows_show_no_data() {
        let matrix: ReportMatrix = serde_json::from_str(r#"{"1st Year": {}}"#).unwrap();
        let table = render_table(&ColumnSchema::standard(), Semester::First.months(), &matrix, None, None);
        assert_eq!(table.body, vec![BodyRow::Empty { span: 30 }]);
    }

    #[test]
    fn html_is_stable_and_escaped() {
        let response: ReportResponse = serde_json::from_str(
            r#"{"success": true, "data": {"1st Year": {"a": {"program": "BS <Acct> & Fin"}}}}"#,
        )
        .unwrap();
        let schema = ColumnSchema::standard();
        let months = Semester::First.months();

        let first = render_table(&schema, months, &response.data, None, None).to_html();
        let second = render_table(&schema, months, &response.data, None, None).to_html();
        assert_eq!(first, second);
        assert!(first.contains("BS &lt;Acct&gt; &amp; Fin"));
        assert!(first.contains("<th colspan=\"5\">August</th>"));
    }
}
