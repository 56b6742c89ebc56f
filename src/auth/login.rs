use crate::{Result, SweepError};
use reqwest::header::{HeaderMap, COOKIE, REFERER, SET_COOKIE};
use reqwest::{redirect::Policy, Client};
use scraper::{Html, Selector};
use std::time::Duration;

/// Name of the hidden CSRF input and of the CSRF cookie
const CSRF_INPUT: &str = "csrfmiddlewaretoken";
const CSRF_COOKIE: &str = "csrftoken";
const SESSION_COOKIE: &str = "sessionid";

/// Credentials for a form login
#[derive(Debug, Clone)]
pub struct LoginForm {
    pub login_url: String,
    pub username: String,
    pub password: String,
}

/// Builds the client used for logging in
///
/// Redirects are not followed: the session cookie arrives on the redirect
/// response that ends a successful login.
pub fn build_login_client(user_agent: &str) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .redirect(Policy::none())
        .build()
}

/// Logs in and returns the session cookie string
///
/// # Login Flow
///
/// 1. GET the login page, read the `csrfmiddlewaretoken` hidden input and the
///    `csrftoken` cookie
/// 2. POST `username`, `password` and the token, with `Cookie`, `X-CSRFToken`
///    and `Referer` headers
/// 3. Build `sessionid=<id>[;csrftoken=<token>]` from the response cookies
///
/// # Returns
///
/// * `Ok(String)` - Cookie string to send on authenticated visits
/// * `Err(SweepError::Login)` - No CSRF token on the page or no session cookie
///   in the response
/// * `Err(SweepError::Reqwest)` - The login server could not be reached
pub async fn form_login(client: &Client, form: &LoginForm) -> Result<String> {
    tracing::info!("Logging in at {} as {}", form.login_url, form.username);

    let response = client.get(&form.login_url).send().await?;
    let csrf_cookie = cookie_value(response.headers(), CSRF_COOKIE);
    let body = response.text().await?;

    let token = extract_csrf_token(&body).ok_or_else(|| SweepError::Login {
        url: form.login_url.clone(),
        message: format!("no '{}' input on the login page", CSRF_INPUT),
    })?;

    let mut request = client
        .post(&form.login_url)
        .header("X-CSRFToken", token.as_str())
        .header(REFERER, form.login_url.as_str())
        .form(&[
            ("username", form.username.as_str()),
            ("password", form.password.as_str()),
            (CSRF_INPUT, token.as_str()),
        ]);
    if let Some(csrf) = &csrf_cookie {
        request = request.header(COOKIE, format!("{}={}", CSRF_COOKIE, csrf));
    }

    let response = request.send().await?;
    let status = response.status();
    let headers = response.headers();

    let session = cookie_value(headers, SESSION_COOKIE).ok_or_else(|| SweepError::Login {
        url: form.login_url.clone(),
        message: format!("no session cookie in the login response (HTTP {})", status),
    })?;

    let mut cookie = format!("{}={}", SESSION_COOKIE, session);
    if let Some(csrf) = cookie_value(headers, CSRF_COOKIE).or(csrf_cookie) {
        cookie.push_str(&format!(";{}={}", CSRF_COOKIE, csrf));
    }

    tracing::info!("Logged in at {}", form.login_url);
    Ok(cookie)
}

/// Reads the CSRF token from the login form
fn extract_csrf_token(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(&format!("input[name='{}']", CSRF_INPUT)).ok()?;

    document
        .select(&selector)
        .next()
        .and_then(|input| input.value().attr("value"))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Value of a named cookie in the `Set-Cookie` headers
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|cookie| cookie.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().to_string())
}
