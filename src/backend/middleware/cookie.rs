/**
 * Cookie Helpers
 *
 * Reading and writing the `coredevs` auth cookie.
 */

use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::HeaderMap;

use crate::shared::Environment;

pub const AUTH_COOKIE: &str = "coredevs";
const THIRTY_DAYS_SECS: u64 = 30 * 24 * 60 * 60;

/// Value of the named cookie across all `Cookie` headers
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

/// Auth token from the cookie, or in development from `Authorization: Bearer`
pub fn auth_token(headers: &HeaderMap, environment: Environment) -> Option<String> {
    if let Some(token) = get_cookie(headers, AUTH_COOKIE) {
        return Some(token);
    }
    if !environment.is_development() {
        return None;
    }
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(|h| h.replace("Bearer ", ""))
        .filter(|token| !token.is_empty())
}

/// `Set-Cookie` value carrying a fresh token
pub fn auth_cookie(token: &str, environment: Environment) -> String {
    let secure = if environment.is_development() { "" } else { "; Secure" };
    format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}{}",
        AUTH_COOKIE, token, THIRTY_DAYS_SECS, secure
    )
}

/// `Set-Cookie` value that expires the auth cookie
pub fn clear_auth_cookie() -> String {
    format!("{}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0", AUTH_COOKIE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_get_cookie() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark; coredevs=abc.def"));
        headers.append(COOKIE, HeaderValue::from_static("other=1"));
        assert_eq!(get_cookie(&headers, "coredevs").as_deref(), Some("abc.def"));
        assert_eq!(get_cookie(&headers, "other").as_deref(), Some("1"));
        assert_eq!(get_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_bearer_only_in_development() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert_eq!(auth_token(&headers, Environment::Development).as_deref(), Some("tok"));
        assert_eq!(auth_token(&headers, Environment::Production), None);

        headers.insert(COOKIE, HeaderValue::from_static("coredevs=cookie-tok"));
        assert_eq!(auth_token(&headers, Environment::Production).as_deref(), Some("cookie-tok"));
    }

    #[test]
    fn test_set_cookie_values() {
        assert!(auth_cookie("t", Environment::Production).ends_with("; Secure"));
        assert!(auth_cookie("t", Environment::Development).starts_with("coredevs=t; HttpOnly"));
        assert!(clear_auth_cookie().contains("Max-Age=0"));
    }
}
