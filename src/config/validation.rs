use crate::config::types::{AuthConfig, Config, HttpConfig, PagesConfig};
use crate::crawler::PageKind;
use crate::scope::ScopePolicy;
use crate::ConfigError;
use reqwest::header::{HeaderName, HeaderValue};
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_css(&config.css)?;
    validate_pages(config)?;
    validate_http_config(&config.http)?;
    if let Some(auth) = &config.auth {
        validate_auth_config(auth)?;
    }
    Ok(())
}

/// Validates the stylesheet list
fn validate_css(css: &[String]) -> Result<(), ConfigError> {
    if css.iter().all(|entry| entry.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "at least one CSS source is required".to_string(),
        ));
    }

    for entry in css.iter().filter(|entry| entry.starts_with("http")) {
        Url::parse(entry)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid CSS URL '{}': {}", entry, e)))?;
    }

    Ok(())
}

/// Validates page lists and exclude rules
fn validate_pages(config: &Config) -> Result<(), ConfigError> {
    let PagesConfig {
        crawl,
        include,
        exclude,
    } = &config.pages;

    if crawl.is_empty() && include.is_empty() {
        return Err(ConfigError::Validation(
            "at least one crawl or include page is required".to_string(),
        ));
    }

    let pages = config.page_set();
    for target in pages.crawl.iter().chain(pages.include.iter()) {
        if target.locator.trim().is_empty() {
            return Err(ConfigError::Validation("page entries cannot be empty".to_string()));
        }

        if target.kind == PageKind::Url {
            let url = Url::parse(&target.locator).map_err(|e| {
                ConfigError::InvalidUrl(format!("Invalid page URL '{}': {}", target.locator, e))
            })?;

            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(ConfigError::InvalidUrl(format!(
                    "Page URL '{}' must use http or https",
                    target.locator
                )));
            }
        }
    }

    // Compiles regex excludes
    ScopePolicy::new(exclude)?;

    Ok(())
}

/// Validates HTTP configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.timeout < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout must be >= 1ms, got {}ms",
            config.timeout
        )));
    }

    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-fetches must be between 1 and 100, got {}",
            config.max_concurrent_fetches
        )));
    }

    if let Some(user_agent) = &config.user_agent {
        if user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "user-agent cannot be empty".to_string(),
            ));
        }
    }

    for (name, value) in &config.headers {
        HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            ConfigError::Validation(format!("Invalid header name '{}'", name))
        })?;
        HeaderValue::from_str(value).map_err(|_| {
            ConfigError::Validation(format!("Invalid value for header '{}'", name))
        })?;
    }

    Ok(())
}

/// Validates authentication configuration
fn validate_auth_config(config: &AuthConfig) -> Result<(), ConfigError> {
    if config.cookie.as_deref().is_some_and(|c| !c.trim().is_empty()) {
        return Ok(());
    }

    let missing: Vec<&str> = [
        ("login-url", &config.login_url),
        ("username", &config.username),
        ("password", &config.password),
    ]
    .iter()
    .filter(|(_, value)| value.is_none())
    .map(|(key, _)| *key)
    .collect();

    if !missing.is_empty() {
        return Err(ConfigError::Validation(format!(
            "[auth] needs either 'cookie' or login-url, username and password (missing: {})",
            missing.join(", ")
        )));
    }

    if let Some(login_url) = &config.login_url {
        Url::parse(login_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid login-url: {}", e)))?;
    }

    Ok(())
}
