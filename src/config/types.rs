use crate::auth::LoginForm;
use crate::crawler::{
    AuditRequest, PageSet, PageTarget, DEFAULT_MAX_CONCURRENT_FETCHES, DEFAULT_TIMEOUT_MS,
};
use crate::css::CssSource;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Main configuration structure for Stylesweep
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Stylesheets: URLs, file paths or inline CSS
    #[serde(default)]
    pub css: Vec<String>,

    /// Rule texts never matched against HTML
    #[serde(default)]
    pub whitelist: Vec<String>,

    #[serde(default)]
    pub pages: PagesConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub auth: Option<AuthConfig>,
}

/// Page lists
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PagesConfig {
    /// Seeds whose same-host links are followed
    #[serde(default)]
    pub crawl: Vec<PageEntry>,

    /// Pages visited as given, links not followed
    #[serde(default)]
    pub include: Vec<PageEntry>,

    /// Exact locators, `prefix*` wildcards or `regex:<pattern>`
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// A page entry, either a plain string or an explicit table
///
/// ```toml
/// crawl = [
///     "http://localhost:8000/",
///     { file = "build/index.html" },
///     { html = "<p class='foo'></p>" },
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PageEntry {
    /// Kind decided from the text
    Plain(String),
    Url { url: String },
    File { file: String },
    Html { html: String },
}

impl PageEntry {
    /// Resolves the entry into a typed page target
    pub fn to_target(&self) -> PageTarget {
        match self {
            Self::Plain(entry) => PageTarget::sniff(entry),
            Self::Url { url } => PageTarget::url(url.as_str()),
            Self::File { file } => PageTarget::file(file.as_str()),
            Self::Html { html } => PageTarget::html(html.as_str()),
        }
    }
}

/// HTTP behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout (milliseconds)
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Maximum number of concurrent page fetches
    #[serde(rename = "max-concurrent-fetches", default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    #[serde(rename = "user-agent", default)]
    pub user_agent: Option<String>,

    /// Headers sent with every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_max_concurrent_fetches() -> usize {
    DEFAULT_MAX_CONCURRENT_FETCHES
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            user_agent: None,
            headers: BTreeMap::new(),
        }
    }
}

/// Authentication configuration
///
/// Either a ready-made `cookie`, or the three form-login keys.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub cookie: Option<String>,

    #[serde(rename = "login-url", default)]
    pub login_url: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

impl Config {
    /// One page against one stylesheet, as given on the command line
    pub fn single(page: &str, css: &str) -> Self {
        Self {
            css: vec![css.to_string()],
            pages: PagesConfig {
                crawl: vec![PageEntry::Plain(page.to_string())],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Typed page lists
    pub fn page_set(&self) -> PageSet {
        PageSet {
            crawl: self.pages.crawl.iter().map(PageEntry::to_target).collect(),
            include: self.pages.include.iter().map(PageEntry::to_target).collect(),
            exclude: self.pages.exclude.clone(),
        }
    }

    /// Typed stylesheet sources
    pub fn css_sources(&self) -> Vec<CssSource> {
        self.css.iter().map(|entry| CssSource::sniff(entry)).collect()
    }

    /// Static cookie from `[auth]`, if any
    pub fn static_cookie(&self) -> Option<&str> {
        self.auth
            .as_ref()
            .and_then(|auth| auth.cookie.as_deref())
            .filter(|cookie| !cookie.is_empty())
    }

    /// Form-login credentials, when no static cookie is configured
    pub fn login_form(&self) -> Option<LoginForm> {
        if self.static_cookie().is_some() {
            return None;
        }

        let auth = self.auth.as_ref()?;
        Some(LoginForm {
            login_url: auth.login_url.clone()?,
            username: auth.username.clone()?,
            password: auth.password.clone()?,
        })
    }

    /// Builds the audit request, with the session cookie obtained by the caller
    pub fn to_request(&self, cookie: Option<String>) -> AuditRequest {
        AuditRequest {
            pages: self.page_set(),
            css: self.css_sources(),
            whitelist: self.whitelist.clone(),
            headers: self
                .http
                .headers
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
            timeout: Duration::from_millis(self.http.timeout),
            max_concurrent_fetches: self.http.max_concurrent_fetches,
            cookie,
            observer: None,
            user_agent: self.http.user_agent.clone(),
        }
    }
}
