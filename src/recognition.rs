use std::fmt::Write;

use chrono::NaiveDate;

use crate::cells::{format_number, present_number, present_text};
use crate::export::sanitize_component;
use crate::fetch::ReportKey;
use crate::models::{ReportMatrix, Semester};

#[derive(Debug, Clone, PartialEq)]
pub struct ChampionEntry {
    pub name: String,
    pub year_level: String,
    pub program: Option<String>,
    pub course_title: Option<String>,
    pub month: String,
    pub epgf_average: Option<f64>,
    pub proficiency_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthSummary {
    pub month: String,
    pub count: usize,
    pub avg_epgf: Option<f64>,
}

/// Champions in month order, then backend year-level and row order.
pub fn collect_champions(matrix: &ReportMatrix, semester: Semester) -> Vec<ChampionEntry> {
    let mut champions = Vec::new();

    for month in semester.months() {
        for (year_level, level) in matrix {
            for row in level.rows.values() {
                let Some(metric) = row.month(month) else {
                    continue;
                };
                let Some(name) = present_text(metric.champion.as_deref()) else {
                    continue;
                };
                champions.push(ChampionEntry {
                    name: name.to_string(),
                    year_level: year_level.clone(),
                    program: row.program.clone(),
                    course_title: row.course_title.clone(),
                    month: month.to_string(),
                    epgf_average: present_number(metric.champion_epgf_average),
                    proficiency_level: metric.champion_proficiency_level.clone(),
                });
            }
        }
    }

    champions
}

pub fn summarize_by_month(champions: &[ChampionEntry], semester: Semester) -> Vec<MonthSummary> {
    semester
        .months()
        .iter()
        .map(|month| {
            let in_month: Vec<&ChampionEntry> = champions.iter().filter(|c| c.month == *month).collect();
            let scores: Vec<f64> = in_month.iter().filter_map(|c| c.epgf_average).collect();
            MonthSummary {
                month: month.to_string(),
                count: in_month.len(),
                avg_epgf: if scores.is_empty() {
                    None
                } else {
                    Some(scores.iter().sum::<f64>() / scores.len() as f64)
                },
            }
        })
        .collect()
}

fn describe(entry: &ChampionEntry) -> String {
    let mut detail = entry.year_level.clone();
    if let Some(program) = present_text(entry.program.as_deref()) {
        let _ = write!(detail, ", {program}");
    }
    if let Some(average) = entry.epgf_average {
        let _ = write!(detail, ", EPGF {}", format_number(average));
    }
    if let Some(level) = present_text(entry.proficiency_level.as_deref()) {
        let _ = write!(detail, " ({level})");
    }
    detail
}

pub fn build_summary(key: &ReportKey, champions: &[ChampionEntry]) -> String {
    let semester = key.semester();
    let summaries = summarize_by_month(champions, semester);
    let mut output = String::new();

    let _ = writeln!(output, "# EIE Champion Recognition");
    let _ = writeln!(
        output,
        "Generated for {} ({}, {})",
        key.department, key.school_year, key.semester
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Champions by Month");

    if champions.is_empty() {
        let _ = writeln!(output, "No champions recorded for this period.");
        return output;
    }

    for summary in &summaries {
        let _ = writeln!(output);
        match summary.avg_epgf {
            Some(avg) => {
                let _ = writeln!(
                    output,
                    "### {} ({} champions, avg EPGF {:.2})",
                    summary.month, summary.count, avg
                );
            }
            None => {
                let _ = writeln!(output, "### {} ({} champions)", summary.month, summary.count);
            }
        }
        for entry in champions.iter().filter(|c| c.month == summary.month) {
            let _ = writeln!(output, "- {} ({})", entry.name, describe(entry));
        }
    }

    output
}

pub fn certificate_text(entry: &ChampionEntry, key: &ReportKey, issued: NaiveDate) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "CERTIFICATE OF RECOGNITION");
    let _ = writeln!(output);
    let _ = writeln!(output, "This certifies that");
    let _ = writeln!(output);
    let _ = writeln!(output, "    {}", entry.name);
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "was named EIE Champion for {} of the {}, School Year {},",
        entry.month, key.semester, key.school_year
    );
    let _ = writeln!(output, "{} - {}.", key.department, describe(entry));
    if let Some(course) = present_text(entry.course_title.as_deref()) {
        let _ = writeln!(output, "Course: {course}");
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "Issued {}", issued.format("%B %-d, %Y"));

    output
}

pub fn certificate_file_name(entry: &ChampionEntry, key: &ReportKey) -> String {
    format!(
        "EIE_Certificate_{}_{}_{}_{}.txt",
        sanitize_component(&key.department),
        sanitize_component(&key.school_year),
        sanitize_component(&entry.month),
        sanitize_component(&entry.name)
    )
}
