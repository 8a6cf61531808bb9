use std::time::Duration;

use anyhow::Context;

use crate::session::Session;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub api_url: Option<String>,
    pub session: Session,
    pub timeout: Option<Duration>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let timeout = match lookup("EIE_HTTP_TIMEOUT_SECS") {
            Some(raw) => Some(Duration::from_secs(
                raw.trim()
                    .parse()
                    .with_context(|| format!("EIE_HTTP_TIMEOUT_SECS must be whole seconds, got {raw:?}"))?,
            )),
            None => None,
        };

        Ok(Config {
            api_url: lookup("EIE_API_URL").filter(|url| !url.trim().is_empty()),
            session: Session {
                employee_id: lookup("EIE_EMPLOYEE_ID"),
                user_type: lookup("EIE_USER_TYPE"),
                selected_user_type: lookup("EIE_SELECTED_USER_TYPE"),
                auth_token: lookup("EIE_AUTH_TOKEN"),
            },
            timeout,
        })
    }

    pub fn api_url(&self) -> anyhow::Result<&str> {
        self.api_url
            .as_deref()
            .context("EIE_API_URL must be set to the report backend (or pass --input)")
    }
}
