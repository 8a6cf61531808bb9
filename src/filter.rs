use chrono::{Datelike, NaiveDate};

use crate::fetch::{ReportClient, ReportKey};
use crate::models::{ReportMatrix, RowRecord, Semester, Student, YearLevel};

/// Option lists behind each selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub departments: Vec<String>,
    pub school_years: Vec<String>,
    pub semesters: Vec<String>,
    pub programs: Vec<String>,
    pub year_levels: Vec<String>,
}

impl FilterOptions {
    /// Lists without a backend: fixed semesters and the current school year.
    pub fn offline(today: NaiveDate) -> Self {
        FilterOptions {
            school_years: vec![school_year_for(today)],
            semesters: Semester::LABELS.iter().map(|s| s.to_string()).collect(),
            ..FilterOptions::default()
        }
    }

    /// Failed list requests leave that list empty.
    pub async fn load(client: &ReportClient, department: Option<&str>, today: NaiveDate) -> Self {
        let mut options = FilterOptions::offline(today);

        options.departments = load_list(client, "departments", &[]).await;

        let school_years = load_list(client, "school-years", &[]).await;
        if !school_years.is_empty() {
            options.school_years = school_years;
        }

        let department = department
            .map(str::to_string)
            .or_else(|| options.departments.first().cloned());
        if let Some(department) = department {
            options.programs = load_list(client, "programs", &[("department", department)]).await;
        }

        options
    }

    pub fn with_year_levels(mut self, matrix: &ReportMatrix) -> Self {
        self.year_levels = matrix.keys().cloned().collect();
        self
    }
}

async fn load_list(client: &ReportClient, path: &str, query: &[(&str, String)]) -> Vec<String> {
    match client.get_json::<Vec<String>>(path, query).await {
        Ok(list) => list,
        Err(err) => {
            tracing::warn!(path, error = %format!("{err:#}"), "failed to load filter options");
            Vec::new()
        }
    }
}

/// `2024/2025` from August onward, `2023/2024` before it.
pub fn school_year_for(today: NaiveDate) -> String {
    let start = if today.month() >= 8 {
        today.year()
    } else {
        today.year() - 1
    };
    format!("{}/{}", start, start + 1)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub department: Option<String>,
    pub school_year: Option<String>,
    pub semester: Option<String>,
    pub program: Option<String>,
    pub year_level: Option<String>,
    pub search: String,
}

impl FilterState {
    /// Fills only the server-side key selectors that are still unset.
    pub fn apply_defaults(&mut self, options: &FilterOptions) {
        fill_default(&mut self.department, &options.departments);
        fill_default(&mut self.school_year, &options.school_years);
        fill_default(&mut self.semester, &options.semesters);
    }

    /// Clears refinements; the fetched matrix is left to the caller.
    pub fn reset(&mut self, options: &FilterOptions) {
        self.program = None;
        self.year_level = None;
        self.department = options.departments.first().cloned();
    }

    pub fn report_key(&self) -> Option<ReportKey> {
        ReportKey::new(
            self.department.as_deref()?,
            self.school_year.as_deref()?,
            self.semester.as_deref()?,
        )
    }

    /// Copy of `matrix` narrowed by program and search; year-level
    /// selection is left to the renderer.
    pub fn refine(&self, matrix: &ReportMatrix) -> ReportMatrix {
        matrix
            .iter()
            .map(|(label, level)| {
                let rows = level
                    .rows
                    .iter()
                    .filter(|(_, row)| self.matches_program(row) && matches_search(*row, &self.search))
                    .map(|(key, row)| (key.clone(), row.clone()))
                    .collect();
                (
                    label.clone(),
                    YearLevel {
                        rows,
                        totals: level.totals.clone(),
                    },
                )
            })
            .collect()
    }

    fn matches_program(&self, row: &RowRecord) -> bool {
        match self.program.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            Some(program) => row
                .program
                .as_deref()
                .is_some_and(|value| value.trim().eq_ignore_ascii_case(program)),
            None => true,
        }
    }
}

fn fill_default(slot: &mut Option<String>, options: &[String]) {
    let unset = slot.as_deref().map_or(true, |value| value.trim().is_empty());
    if unset {
        *slot = options.first().cloned();
    }
}

/// Fields a free-text search looks at for a record type.
pub trait Searchable {
    fn search_fields(&self) -> Vec<Option<&str>>;
}

impl Searchable for Student {
    fn search_fields(&self) -> Vec<Option<&str>> {
        vec![
            self.first_name.as_deref(),
            self.middle_name.as_deref(),
            self.last_name.as_deref(),
            self.student_id.as_deref(),
            self.email.as_deref(),
            self.department.as_deref(),
            self.program.as_deref(),
            self.year_level.as_deref(),
        ]
    }
}

impl Searchable for RowRecord {
    fn search_fields(&self) -> Vec<Option<&str>> {
        vec![
            self.program.as_deref(),
            self.course_title.as_deref(),
            self.faculty.as_deref(),
        ]
    }
}

pub fn matches_search<T: Searchable + ?Sized>(record: &T, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    record
        .search_fields()
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
}

pub fn search<'a, T: Searchable>(records: &'a [T], query: &str) -> Vec<&'a T> {
    records
        .iter()
        .filter(|record| matches_search(*record, query))
        .collect()
}
