use indexmap::IndexMap;
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Reserved key under which the dashboard variant embeds per-year totals.
pub const TOTALS_KEY: &str = "totals";

/// Year-level label -> year level, in backend order.
pub type ReportMatrix = IndexMap<String, YearLevel>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Semester {
    First,
    Second,
}

impl Semester {
    pub const LABELS: [&'static str; 2] = ["1st Semester", "2nd Semester"];

    const FIRST_MONTHS: [&'static str; 5] = ["August", "September", "October", "November", "December"];
    const SECOND_MONTHS: [&'static str; 5] = ["January", "February", "March", "April", "May"];

    /// Anything other than the first-semester label selects the second semester.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "1st Semester" => Semester::First,
            _ => Semester::Second,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Semester::First => Self::LABELS[0],
            Semester::Second => Self::LABELS[1],
        }
    }

    pub fn months(self) -> &'static [&'static str; 5] {
        match self {
            Semester::First => &Self::FIRST_MONTHS,
            Semester::Second => &Self::SECOND_MONTHS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct YearLevel {
    pub rows: IndexMap<String, RowRecord>,
    pub totals: Option<AggregateTotals>,
}

impl<'de> Deserialize<'de> for YearLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<IndexMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
        let mut level = YearLevel::default();

        for (key, value) in raw {
            if key == TOTALS_KEY {
                level.totals = from_value::<Option<AggregateTotals>, D::Error>(value)?;
            } else if let Some(row) = from_value::<Option<RowRecord>, D::Error>(value)? {
                level.rows.insert(key, row);
            }
        }

        Ok(level)
    }
}

/// True when some year level (limited to `year_level` if given) holds a row.
pub fn has_data_rows(matrix: &ReportMatrix, year_level: Option<&str>) -> bool {
    matrix
        .iter()
        .filter(|(label, _)| year_level.map_or(true, |wanted| wanted == label.as_str()))
        .any(|(_, level)| !level.rows.is_empty())
}

fn from_value<T: DeserializeOwned, E: de::Error>(value: Value) -> Result<T, E> {
    serde_json::from_value(value).map_err(E::custom)
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "RawRowRecord")]
pub struct RowRecord {
    pub program: Option<String>,
    pub enrolled_students: Option<f64>,
    pub course_title: Option<String>,
    pub faculty: Option<String>,
    pub month_data: IndexMap<String, MonthMetric>,
}

/// Wire form of a row. Both spellings of expected count and faculty may
/// appear together; the primary key wins.
#[derive(Deserialize)]
struct RawRowRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    program: Option<String>,
    #[serde(default, rename = "enrolledStudents", deserialize_with = "lenient_number")]
    enrolled_students: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    expected: Option<f64>,
    #[serde(default, rename = "courseTitle", deserialize_with = "lenient_text")]
    course_title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    faculty: Option<String>,
    #[serde(default, rename = "assignedPOC", deserialize_with = "lenient_text")]
    assigned_poc: Option<String>,
    #[serde(default, rename = "monthData", deserialize_with = "null_as_default")]
    month_data: IndexMap<String, MonthMetric>,
}

impl From<RawRowRecord> for RowRecord {
    fn from(raw: RawRowRecord) -> Self {
        RowRecord {
            program: raw.program,
            enrolled_students: raw.enrolled_students.or(raw.expected),
            course_title: raw.course_title,
            faculty: raw.faculty.or(raw.assigned_poc),
            month_data: raw.month_data,
        }
    }
}

impl RowRecord {
    pub fn month(&self, month: &str) -> Option<&MonthMetric> {
        self.month_data.get(month)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MonthMetric {
    #[serde(default, deserialize_with = "lenient_number")]
    pub submitted: Option<f64>,
    #[serde(default, rename = "completionRate", deserialize_with = "lenient_number")]
    pub completion_rate: Option<f64>,
    #[serde(default, rename = "epgfAverage", deserialize_with = "lenient_number")]
    pub epgf_average: Option<f64>,
    #[serde(default, rename = "proficiencyLevel", deserialize_with = "lenient_text")]
    pub proficiency_level: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub champion: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub champion_epgf_average: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub champion_proficiency_level: Option<String>,
}

/// Month-indexed aggregates, shared by grand totals and per-year totals.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AggregateTotals {
    #[serde(default, rename = "expectedSubmissions", deserialize_with = "lenient_number")]
    pub expected_submissions: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number_map")]
    pub submitted: IndexMap<String, Option<f64>>,
    #[serde(default, rename = "completionRate", deserialize_with = "lenient_number_map")]
    pub completion_rate: IndexMap<String, Option<f64>>,
    #[serde(default, rename = "epgfAverage", deserialize_with = "lenient_number_map")]
    pub epgf_average: IndexMap<String, Option<f64>>,
    #[serde(default, rename = "proficiencyLevel", deserialize_with = "lenient_text_map")]
    pub proficiency_level: IndexMap<String, Option<String>>,
    #[serde(default, deserialize_with = "lenient_text_map")]
    pub champion: IndexMap<String, Option<String>>,
    #[serde(default, deserialize_with = "lenient_number_map")]
    pub champion_epgf_average: IndexMap<String, Option<f64>>,
    #[serde(default, deserialize_with = "lenient_text_map")]
    pub champion_proficiency_level: IndexMap<String, Option<String>>,
}

impl AggregateTotals {
    /// Projects one month's slice so totals rows share the per-row cell logic.
    pub fn month(&self, month: &str) -> MonthMetric {
        MonthMetric {
            submitted: self.submitted.get(month).copied().flatten(),
            completion_rate: self.completion_rate.get(month).copied().flatten(),
            epgf_average: self.epgf_average.get(month).copied().flatten(),
            proficiency_level: self.proficiency_level.get(month).cloned().flatten(),
            champion: self.champion.get(month).cloned().flatten(),
            champion_epgf_average: self.champion_epgf_average.get(month).copied().flatten(),
            champion_proficiency_level: self
                .champion_proficiency_level
                .get(month)
                .cloned()
                .flatten(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: ReportMatrix,
    #[serde(default, rename = "grandTotals")]
    pub grand_totals: Option<AggregateTotals>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Student {
    #[serde(default, deserialize_with = "lenient_text")]
    pub student_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub middle_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub department: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub program: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub year_level: Option<String>,
}

fn number_from(value: Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn text_from(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(number_from))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(text_from))
}

fn lenient_number_map<'de, D>(deserializer: D) -> Result<IndexMap<String, Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<IndexMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw.into_iter().map(|(k, v)| (k, number_from(v))).collect())
}

fn lenient_text_map<'de, D>(deserializer: D) -> Result<IndexMap<String, Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<IndexMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw.into_iter().map(|(k, v)| (k, text_from(v))).collect())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
