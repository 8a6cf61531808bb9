//! Declared column layout shared by the table renderer and the CSV exporter.

use clap::ValueEnum;

pub const TARGET_DISPLAY: &str = "100%";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedColumn {
    YearLevel,
    Program,
    Expected,
    Target,
    CourseTitle,
    Faculty,
}

impl FixedColumn {
    pub fn label(self) -> &'static str {
        match self {
            FixedColumn::YearLevel => "Year Level",
            FixedColumn::Program => "Program",
            FixedColumn::Expected => "Expected Submissions",
            FixedColumn::Target => "Target",
            FixedColumn::CourseTitle => "Course Title",
            FixedColumn::Faculty => "Faculty",
        }
    }
}

/// One of the cells repeated for every month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricColumn {
    Submitted,
    CompletionRate,
    Epgf,
    Champion,
    ChampionEpgf,
}

impl MetricColumn {
    pub const ALL: [MetricColumn; 5] = [
        MetricColumn::Submitted,
        MetricColumn::CompletionRate,
        MetricColumn::Epgf,
        MetricColumn::Champion,
        MetricColumn::ChampionEpgf,
    ];

    /// Label in the table's second header row.
    pub fn label(self) -> &'static str {
        match self {
            MetricColumn::Submitted => "Submitted",
            MetricColumn::CompletionRate => "% Rate",
            MetricColumn::Epgf => "EPGF Avg / Level",
            MetricColumn::Champion => "Champion",
            MetricColumn::ChampionEpgf => "Champion EPGF / Level",
        }
    }

    /// Suffix after the month name in CSV headers.
    pub fn csv_suffix(self) -> &'static str {
        match self {
            MetricColumn::Submitted => "Submitted",
            MetricColumn::CompletionRate => "Completion Rate",
            MetricColumn::Epgf => "EPGF Average",
            MetricColumn::Champion => "Champion",
            MetricColumn::ChampionEpgf => "Champion EPGF Average",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    fixed: Vec<FixedColumn>,
    metrics: Vec<MetricColumn>,
}

impl ColumnSchema {
    pub fn standard() -> Self {
        ColumnSchema {
            fixed: vec![
                FixedColumn::YearLevel,
                FixedColumn::Program,
                FixedColumn::Expected,
                FixedColumn::Target,
                FixedColumn::CourseTitle,
            ],
            metrics: MetricColumn::ALL.to_vec(),
        }
    }

    pub fn with_faculty() -> Self {
        let mut schema = Self::standard();
        schema.fixed.push(FixedColumn::Faculty);
        schema
    }

    pub fn fixed(&self) -> &[FixedColumn] {
        &self.fixed
    }

    pub fn metrics(&self) -> &[MetricColumn] {
        &self.metrics
    }

    pub fn column_count(&self, month_count: usize) -> usize {
        self.fixed.len() + month_count * self.metrics.len()
    }

    /// Column index of a metric cell within a full row.
    pub fn metric_index(&self, month_position: usize, metric: MetricColumn) -> Option<usize> {
        let offset = self.metrics.iter().position(|m| *m == metric)?;
        Some(self.fixed.len() + month_position * self.metrics.len() + offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportVariant {
    /// Per-college EIE report
    College,
    /// Head dashboard with per-year totals
    Dashboard,
    /// Report scoped to the signed-in employee's assignments
    Assigned,
}

impl ReportVariant {
    pub fn endpoint(self) -> &'static str {
        match self {
            ReportVariant::College => "eie-report",
            ReportVariant::Dashboard => "dashboard-report",
            ReportVariant::Assigned => "eie-assigned-report",
        }
    }

    pub fn report_name(self) -> &'static str {
        match self {
            ReportVariant::College => "College",
            ReportVariant::Dashboard => "Dashboard",
            ReportVariant::Assigned => "Assigned",
        }
    }

    pub fn schema(self) -> ColumnSchema {
        match self {
            ReportVariant::College => ColumnSchema::standard(),
            ReportVariant::Dashboard | ReportVariant::Assigned => ColumnSchema::with_faculty(),
        }
    }

    pub fn requires_employee_id(self) -> bool {
        matches!(self, ReportVariant::Assigned)
    }
}
