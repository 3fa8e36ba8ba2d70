//! Small utility helpers used across modules.

use axum::http::{header::AUTHORIZATION, HeaderMap};

/// Pull the opaque bearer token out of an `Authorization` header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
  let raw = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
  let token = match raw.split_once(' ') {
    Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
    _ if raw.eq_ignore_ascii_case("bearer") => "",
    _ => raw,
  };
  if token.is_empty() { None } else { Some(token.to_string()) }
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}
