use reqwest::header::AUTHORIZATION;
use reqwest::RequestBuilder;

pub const USER_TYPE_HEADER: &str = "X-User-Type";

/// Identity attached to every backend request. Built once and handed to the
/// client; nothing reads identity ambiently.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub employee_id: Option<String>,
    pub user_type: Option<String>,
    pub selected_user_type: Option<String>,
    pub auth_token: Option<String>,
}

impl Session {
    pub fn employee_id(&self) -> Option<&str> {
        present(&self.employee_id)
    }

    /// The selected role wins over the account's own type.
    pub fn effective_user_type(&self) -> Option<&str> {
        present(&self.selected_user_type).or_else(|| present(&self.user_type))
    }

    pub fn auth_token(&self) -> Option<&str> {
        present(&self.auth_token)
    }

    pub fn decorate(&self, mut request: RequestBuilder) -> RequestBuilder {
        if let Some(token) = self.auth_token() {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(user_type) = self.effective_user_type() {
            request = request.header(USER_TYPE_HEADER, user_type);
        }
        request
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_count_as_unset() {
        let session = Session {
            employee_id: Some("  ".to_string()),
            user_type: Some("".to_string()),
            ..Session::default()
        };
        assert_eq!(session.employee_id(), None);
        assert_eq!(session.effective_user_type(), None);
    }

    #[test]
    fn decorate_adds_identity_headers() {
        let session = Session {
            employee_id: Some("E-1001".to_string()),
            user_type: Some("faculty".to_string()),
            selected_user_type: Some("head".to_string()),
            auth_token: Some("abc123".to_string()),
        };
        let client = reqwest::Client::new();
        let request = session
            .decorate(client.get("http://localhost/eie-report"))
            .build()
            .unwrap();

        assert_eq!(request.headers()[AUTHORIZATION], "Bearer abc123");
        assert_eq!(request.headers()[USER_TYPE_HEADER], "head");
    }

    #[test]
    fn decorate_without_identity_leaves_request_bare() {
        let client = reqwest::Client::new();
        let request = Session::default()
            .decorate(client.get("http://localhost/eie-report"))
            .build()
            .unwrap();
        assert!(request.headers().get(AUTHORIZATION).is_none());
        assert!(request.headers().get(USER_TYPE_HEADER).is_none());
    }
}
