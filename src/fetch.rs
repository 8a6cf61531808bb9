use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Context;
use reqwest::multipart::Form;
use serde::de::DeserializeOwned;

use crate::models::{AggregateTotals, ReportMatrix, ReportResponse, Semester};
use crate::schema::ReportVariant;
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportKey {
    pub department: String,
    pub school_year: String,
    pub semester: String,
}

impl ReportKey {
    /// `None` unless all three parts are non-blank.
    pub fn new(department: &str, school_year: &str, semester: &str) -> Option<Self> {
        let parts = [department.trim(), school_year.trim(), semester.trim()];
        if parts.iter().any(|part| part.is_empty()) {
            return None;
        }
        Some(ReportKey {
            department: parts[0].to_string(),
            school_year: parts[1].to_string(),
            semester: parts[2].to_string(),
        })
    }

    pub fn semester(&self) -> Semester {
        Semester::from_label(&self.semester)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchIssue {
    /// The backend answered with `success: false`.
    Declined { message: Option<String> },
    Transport(String),
}

impl fmt::Display for FetchIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchIssue::Declined { message: Some(message) } => write!(f, "report unavailable: {message}"),
            FetchIssue::Declined { message: None } => write!(f, "report unavailable"),
            FetchIssue::Transport(detail) => write!(f, "failed to load report: {detail}"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReportSnapshot {
    pub key: Option<ReportKey>,
    pub matrix: ReportMatrix,
    pub grand_totals: Option<AggregateTotals>,
    pub issue: Option<FetchIssue>,
}

/// Turns any fetch outcome into a snapshot. Failures never keep old data.
pub fn normalize(key: ReportKey, outcome: anyhow::Result<ReportResponse>) -> ReportSnapshot {
    match outcome {
        Ok(response) if response.success => ReportSnapshot {
            key: Some(key),
            matrix: response.data,
            grand_totals: response.grand_totals,
            issue: None,
        },
        Ok(response) => {
            tracing::warn!(
                department = %key.department,
                school_year = %key.school_year,
                semester = %key.semester,
                reason = response.message.as_deref().unwrap_or(""),
                "backend declined report request"
            );
            ReportSnapshot {
                key: Some(key),
                issue: Some(FetchIssue::Declined {
                    message: response.message,
                }),
                ..ReportSnapshot::default()
            }
        }
        Err(err) => {
            tracing::warn!(
                department = %key.department,
                school_year = %key.school_year,
                semester = %key.semester,
                error = %format!("{err:#}"),
                "report request failed"
            );
            ReportSnapshot {
                key: Some(key),
                issue: Some(FetchIssue::Transport(format!("{err:#}"))),
                ..ReportSnapshot::default()
            }
        }
    }
}

pub fn report_query(
    variant: ReportVariant,
    key: &ReportKey,
    session: &Session,
) -> Option<Vec<(&'static str, String)>> {
    let mut query = vec![
        ("department", key.department.clone()),
        ("semester", key.semester.clone()),
        ("schoolYear", key.school_year.clone()),
    ];
    if variant.requires_employee_id() {
        query.push(("employee_id", session.employee_id()?.to_string()));
    }
    Some(query)
}

#[derive(Debug, Clone)]
pub struct ReportClient {
    http: reqwest::Client,
    base_url: String,
    session: Session,
}

impl ReportClient {
    pub fn new(base_url: &str, session: Session, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("failed to build HTTP client")?;

        Ok(ReportClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> anyhow::Result<T> {
        let url = self.url(path);
        tracing::debug!(%url, "GET");
        let response = self
            .session
            .decorate(self.http.get(&url).query(query))
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?
            .error_for_status()
            .with_context(|| format!("{url} returned an error status"))?;

        response
            .json::<T>()
            .await
            .with_context(|| format!("failed to decode response from {url}"))
    }

    /// Returns the HTTP status and raw body; upload endpoints report
    /// validation failures in the body of non-2xx responses.
    pub async fn post_multipart(&self, path: &str, form: Form) -> anyhow::Result<(reqwest::StatusCode, String)> {
        let url = self.url(path);
        tracing::debug!(%url, "POST multipart");
        let response = self
            .session
            .decorate(self.http.post(&url).multipart(form))
            .send()
            .await
            .with_context(|| format!("upload to {url} failed"))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("failed to read upload response from {url}"))?;
        Ok((status, body))
    }

    pub async fn fetch_report(
        &self,
        variant: ReportVariant,
        query: &[(&str, String)],
    ) -> anyhow::Result<ReportResponse> {
        self.get_json(variant.endpoint(), query).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Latest applied snapshot plus the generation counter that decides which
/// in-flight request is allowed to write.
#[derive(Debug, Default)]
pub struct ReportState {
    generation: AtomicU64,
    snapshot: Mutex<Arc<ReportSnapshot>>,
}

impl ReportState {
    pub fn begin(&self) -> Ticket {
        Ticket(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Applies `snapshot` only if no newer request has started since `ticket`.
    pub fn apply(&self, ticket: Ticket, snapshot: ReportSnapshot) -> bool {
        let mut current = self.snapshot.lock().unwrap_or_else(PoisonError::into_inner);
        if self.generation.load(Ordering::SeqCst) != ticket.0 {
            tracing::debug!(ticket = ticket.0, "discarding superseded report response");
            return false;
        }
        *current = Arc::new(snapshot);
        true
    }

    pub fn snapshot(&self) -> Arc<ReportSnapshot> {
        self.snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

pub struct ReportFetcher {
    client: ReportClient,
    state: ReportState,
}

impl ReportFetcher {
    pub fn new(client: ReportClient) -> Self {
        ReportFetcher {
            client,
            state: ReportState::default(),
        }
    }

    pub fn client(&self) -> &ReportClient {
        &self.client
    }

    pub fn state(&self) -> &ReportState {
        &self.state
    }

    /// One request per call, no retries. A missing key skips the request and
    /// leaves the current snapshot alone.
    pub async fn refresh(&self, variant: ReportVariant, key: Option<ReportKey>) -> Arc<ReportSnapshot> {
        let Some(key) = key else {
            tracing::debug!("report key incomplete, skipping fetch");
            return self.state.snapshot();
        };
        let Some(query) = report_query(variant, &key, self.client.session()) else {
            tracing::warn!(variant = ?variant, "no employee_id in session, skipping assigned report fetch");
            return self.state.snapshot();
        };

        let ticket = self.state.begin();
        let outcome = self.client.fetch_report(variant, &query).await;
        let applied = self.state.apply(ticket, normalize(key, outcome));
        if applied {
            tracing::info!(variant = ?variant, "report snapshot updated");
        }
        self.state.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::YearLevel;

    fn key() -> ReportKey {
        ReportKey::new("CBA", "2024/2025", "1st Semester").unwrap()
    }

    fn populated() -> ReportSnapshot {
        let mut matrix = ReportMatrix::new();
        matrix.insert("1st Year".to_string(), YearLevel::default());
        ReportSnapshot {
            key: Some(key()),
            matrix,
            ..ReportSnapshot::default()
        }
    }

    #[test]
    fn key_requires_every_part() {
        assert!(ReportKey::new("", "2024/2025", "1st Semester").is_none());
        assert!(ReportKey::new("CBA", "  ", "1st Semester").is_none());
        assert_eq!(key().semester(), Semester::First);
    }

    #[test]
    fn declared_failure_resets_to_empty() {
        let response: ReportResponse =
            serde_json::from_str(r#"{"success": false, "message": "No records"}"#).unwrap();
        let snapshot = normalize(key(), Ok(response));

        assert!(snapshot.matrix.is_empty());
        assert!(snapshot.grand_totals.is_none());
        assert_eq!(
            snapshot.issue,
            Some(FetchIssue::Declined {
                message: Some("No records".to_string())
            })
        );
    }

    #[test]
    fn transport_error_resets_to_empty() {
        let snapshot = normalize(key(), Err(anyhow::anyhow!("connection refused")));
        assert!(snapshot.matrix.is_empty());
        assert!(matches!(snapshot.issue, Some(FetchIssue::Transport(_))));
    }

    #[test]
    fn success_keeps_data_and_grand_totals() {
        let response: ReportResponse = serde_json::from_str(
            r#"{"success": true, "data": {"1st Year": {"r1": {"program": "BSA"}}},
                "grandTotals": {"expectedSubmissions": 40}}"#,
        )
        .unwrap();
        let snapshot = normalize(key(), Ok(response));

        assert_eq!(snapshot.matrix["1st Year"].rows["r1"].program.as_deref(), Some("BSA"));
        assert_eq!(snapshot.grand_totals.unwrap().expected_submissions, Some(40.0));
        assert!(snapshot.issue.is_none());
    }

    #[test]
    fn superseded_response_is_discarded() {
        let state = ReportState::default();
        let first = state.begin();
        let second = state.begin();

        assert!(state.apply(second, populated()));
        assert!(!state.apply(first, ReportSnapshot::default()));
        assert_eq!(state.snapshot().matrix.len(), 1);
    }

    #[test]
    fn assigned_query_needs_employee_id() {
        let anonymous = Session::default();
        assert!(report_query(ReportVariant::Assigned, &key(), &anonymous).is_none());

        let session = Session {
            employee_id: Some("E-42".to_string()),
            ..Session::default()
        };
        let query = report_query(ReportVariant::Assigned, &key(), &session).unwrap();
        assert!(query.contains(&("employee_id", "E-42".to_string())));
        assert!(query.contains(&("schoolYear", "2024/2025".to_string())));
    }

    #[tokio::test]
    async fn incomplete_key_skips_request() {
        let client = ReportClient::new("http://127.0.0.1:9", Session::default(), None).unwrap();
        let fetcher = ReportFetcher::new(client);
        let ticket = fetcher.state().begin();
        fetcher.state().apply(ticket, populated());

        let snapshot = fetcher
            .refresh(ReportVariant::College, ReportKey::new("", "2024/2025", "1st Semester"))
            .await;
        assert_eq!(snapshot.matrix.len(), 1);
    }

    #[tokio::test]
    async fn failed_refetch_clears_stale_matrix() {
        let client = ReportClient::new(
            "http://127.0.0.1:9",
            Session::default(),
            Some(Duration::from_secs(2)),
        )
        .unwrap();
        let fetcher = ReportFetcher::new(client);
        let ticket = fetcher.state().begin();
        fetcher.state().apply(ticket, populated());

        let snapshot = fetcher.refresh(ReportVariant::College, Some(key())).await;
        assert!(snapshot.matrix.is_empty());
        assert!(matches!(snapshot.issue, Some(FetchIssue::Transport(_))));
    }
}
