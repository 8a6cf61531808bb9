use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{bail, Context};
use clap::ValueEnum;
use regex::Regex;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::fetch::ReportClient;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImportKind {
    Students,
    Faculty,
}

impl ImportKind {
    pub fn endpoint(self) -> &'static str {
        match self {
            ImportKind::Students => "import-students",
            ImportKind::Faculty => "import-faculty",
        }
    }

    /// Multipart field the endpoint reads the file from.
    pub fn field_name(self) -> &'static str {
        match self {
            ImportKind::Students => "csv_file",
            ImportKind::Faculty => "file",
        }
    }

    pub fn required_headers(self) -> &'static [&'static str] {
        match self {
            ImportKind::Students => &[
                "student_id",
                "first_name",
                "last_name",
                "email",
                "department",
                "program",
                "year_level",
            ],
            ImportKind::Faculty => &["employee_id", "first_name", "last_name", "email", "department"],
        }
    }
}

/// Header and email checks only; the server owns real validation.
/// Returns the number of data rows.
pub fn validate_csv(kind: ImportKind, input: impl Read) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_reader(input);
    let headers = reader.headers().context("failed to read CSV header row")?.clone();

    let missing: Vec<&str> = kind
        .required_headers()
        .iter()
        .copied()
        .filter(|required| !headers.iter().any(|h| h.trim() == *required))
        .collect();
    if !missing.is_empty() {
        bail!("CSV is missing required columns: {}", missing.join(", "));
    }
    let email_index = headers.iter().position(|h| h.trim() == "email");

    let mut problems = Vec::new();
    let mut rows = 0usize;
    for (index, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("failed to parse CSV row {}", index + 2))?;
        rows += 1;
        if let Some(email) = email_index.and_then(|i| record.get(i)) {
            if !EMAIL.is_match(email.trim()) {
                problems.push(format!("row {}: invalid email {:?}", index + 2, email));
            }
        }
    }

    if rows == 0 {
        bail!("CSV has a header row but no data rows");
    }
    if !problems.is_empty() {
        bail!("CSV failed validation:\n{}", problems.join("\n"));
    }
    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

/// Turns the upload reply into the server's message or an error carrying it.
fn interpret_upload(status: reqwest::StatusCode, body: &str) -> anyhow::Result<String> {
    let response: Option<UploadResponse> = serde_json::from_str(body).ok();
    match response {
        Some(UploadResponse {
            success: true,
            message,
        }) if status.is_success() => Ok(message.unwrap_or_else(|| "Import completed".to_string())),
        Some(UploadResponse {
            message: Some(message),
            ..
        }) => bail!("import rejected: {message}"),
        _ => bail!("import failed with status {status}"),
    }
}

pub async fn upload(client: &ReportClient, kind: ImportKind, csv_path: &Path) -> anyhow::Result<String> {
    let bytes = std::fs::read(csv_path).with_context(|| format!("failed to read {}", csv_path.display()))?;
    let rows = validate_csv(kind, bytes.as_slice())?;

    let file_name = csv_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("import.csv")
        .to_string();
    let part = Part::bytes(bytes)
        .file_name(file_name)
        .mime_str("text/csv")
        .context("failed to build multipart body")?;
    let form = Form::new().part(kind.field_name(), part);

    tracing::info!(kind = ?kind, rows, "uploading import CSV");
    let (status, body) = client.post_multipart(kind.endpoint(), form).await?;
    interpret_upload(status, &body)
}
