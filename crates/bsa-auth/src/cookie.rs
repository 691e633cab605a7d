//! Cookie helpers.

use crate::{Error, Result};

/// SameSite attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    /// SameSite=Strict
    Strict,
    /// SameSite=Lax
    Lax,
    /// SameSite=None
    None,
}

impl SameSite {
    fn as_str(self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Options used to build a session cookie.
#[derive(Debug, Clone)]
pub struct CookieOptions {
    /// Cookie name.
    pub name: String,

    /// Cookie path.
    pub path: String,

    /// Send on HTTPS only.
    pub secure: bool,

    /// Not accessible to page scripts.
    pub http_only: bool,

    /// SameSite attribute.
    pub same_site: SameSite,

    /// Max-Age in seconds.
    pub max_age_seconds: Option<u64>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            name: crate::SESSION_COOKIE.to_string(),
            path: "/".to_string(),
            secure: true,
            http_only: true,
            same_site: SameSite::Strict,
            max_age_seconds: None,
        }
    }
}

/// Cookie names and token values are restricted to RFC 6265 token characters.
fn check_token(kind: &str, s: &str) -> Result<()> {
    let bad = s
        .bytes()
        .any(|b| !b.is_ascii_graphic() || matches!(b, b';' | b',' | b'"' | b'\\' | b'='));
    if bad {
        return Err(Error::InvalidCookie(format!("{kind} contains a reserved character")));
    }
    Ok(())
}

fn attributes(parts: &mut Vec<String>, opts: &CookieOptions) {
    parts.push(format!("Path={}", opts.path));
    if opts.http_only {
        parts.push("HttpOnly".to_string());
    }
    parts.push(format!("SameSite={}", opts.same_site.as_str()));
    if opts.secure {
        parts.push("Secure".to_string());
    }
}

/// Build a `Set-Cookie` header value.
pub fn build_set_cookie(value: &str, opts: &CookieOptions) -> Result<String> {
    check_token("cookie name", &opts.name)?;
    check_token("cookie value", value)?;

    let mut parts: Vec<String> = vec![format!("{}={value}", opts.name)];
    attributes(&mut parts, opts);
    if let Some(max_age) = opts.max_age_seconds {
        parts.push(format!("Max-Age={max_age}"));
    }

    Ok(parts.join("; "))
}

/// Build a `Set-Cookie` header value that clears the cookie.
pub fn build_clear_cookie(opts: &CookieOptions) -> Result<String> {
    check_token("cookie name", &opts.name)?;

    let mut parts: Vec<String> = vec![format!("{}=", opts.name)];
    attributes(&mut parts, opts);
    parts.push("Max-Age=0".to_string());

    Ok(parts.join("; "))
}

/// Value of the first cookie called exactly `name` in a `Cookie` request header.
///
/// Empty values count as absent.
pub fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
}
