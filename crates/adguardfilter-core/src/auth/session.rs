use std::fmt;

use chrono::{DateTime, Utc};

/// Login material for the upstream appliance.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub base_url: String,
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// All three fields are required before a silent re-login is attempted.
    pub fn is_complete(&self) -> bool {
        !self.base_url.is_empty() && !self.username.is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
}

impl SessionCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Session {
    credentials: Option<Credentials>,
    cookies: Vec<SessionCookie>,
    authenticated_at: Option<DateTime<Utc>>,
    /// Bumped on every successful login so concurrent re-logins can coalesce.
    generation: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session that knows where and how to log in but holds no cookies yet.
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials: Some(credentials),
            ..Self::default()
        }
    }

    /// Replace credentials and cookies together after a successful login.
    pub fn update(&mut self, credentials: Credentials, cookies: Vec<SessionCookie>) {
        self.credentials = Some(credentials);
        self.cookies = cookies;
        self.authenticated_at = Some(Utc::now());
        self.generation += 1;
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Stored credentials usable for a silent re-login
    pub fn reauth_credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref().filter(|c| c.is_complete())
    }

    pub fn base_url(&self) -> Option<&str> {
        self.credentials
            .as_ref()
            .map(|c| c.base_url.as_str())
            .filter(|url| !url.is_empty())
    }

    pub fn cookies(&self) -> &[SessionCookie] {
        &self.cookies
    }

    /// Value for the `Cookie` request header, if any cookies are held
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    pub fn is_authenticated(&self) -> bool {
        !self.cookies.is_empty()
    }

    pub fn authenticated_at(&self) -> Option<DateTime<Utc>> {
        self.authenticated_at
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
