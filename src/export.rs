use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::cells;
use crate::fetch::ReportKey;
use crate::models::{has_data_rows, AggregateTotals, ReportMatrix};
use crate::render::{GRAND_TOTAL, YEAR_TOTAL};
use crate::schema::{ColumnSchema, FixedColumn};

pub fn header_row(schema: &ColumnSchema, months: &[&str]) -> Vec<String> {
    let mut header: Vec<String> = schema
        .fixed()
        .iter()
        .map(|column| column.label().to_string())
        .collect();
    for month in months {
        header.extend(
            schema
                .metrics()
                .iter()
                .map(|metric| format!("{month} {}", metric.csv_suffix())),
        );
    }
    header
}

/// Header plus one row per record, then the totals rows. Same column order
/// as the rendered table, with stacked cells joined. Without any data rows
/// only the header is emitted, matching the table's empty state.
pub fn build_rows(
    schema: &ColumnSchema,
    months: &[&str],
    matrix: &ReportMatrix,
    grand_totals: Option<&AggregateTotals>,
) -> Vec<Vec<String>> {
    let collapse = |row: Vec<cells::Cell>| row.iter().map(cells::Cell::collapse).collect::<Vec<_>>();
    let mut rows = vec![header_row(schema, months)];
    if !has_data_rows(matrix, None) {
        return rows;
    }

    for (label, level) in matrix {
        for row in level.rows.values() {
            rows.push(collapse(cells::data_row(schema, months, label, row)));
        }
        if let Some(totals) = &level.totals {
            let mut year_total = collapse(cells::totals_row(schema, months, YEAR_TOTAL, totals));
            label_year_total(schema, &mut year_total, label);
            rows.push(year_total);
        }
    }

    if let Some(totals) = grand_totals {
        rows.push(collapse(cells::totals_row(schema, months, GRAND_TOTAL, totals)));
    }

    rows
}

/// CSV has no group rows, so the year total names its year level.
fn label_year_total(schema: &ColumnSchema, row: &mut [String], year_level: &str) {
    if schema.fixed().first() == Some(&FixedColumn::YearLevel) {
        if let Some(first) = row.first_mut() {
            *first = format!("{year_level} {YEAR_TOTAL}");
        }
    }
}

pub fn to_csv(rows: &[Vec<String>]) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.write_record(row).context("failed to write CSV row")?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("failed to flush CSV buffer: {}", err.error()))?;
    String::from_utf8(bytes).context("CSV output was not valid UTF-8")
}

/// Keeps spaces; path separators become `-`, other unsafe characters `_`.
pub fn sanitize_component(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' => '-',
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

pub fn file_name(report_name: &str, key: &ReportKey) -> String {
    format!(
        "EIE_{}_{}_{}_{}.csv",
        sanitize_component(report_name),
        sanitize_component(&key.department),
        sanitize_component(&key.school_year),
        sanitize_component(&key.semester)
    )
}

pub fn write_export(
    out_dir: &Path,
    report_name: &str,
    key: &ReportKey,
    rows: &[Vec<String>],
) -> anyhow::Result<PathBuf> {
    let csv = to_csv(rows)?;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    let path = out_dir.join(file_name(report_name, key));
    std::fs::write(&path, csv).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), rows = rows.len(), "CSV export written");
    Ok(path)
}
