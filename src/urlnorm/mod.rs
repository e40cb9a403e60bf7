//! URL canonicalization and classification.
//!
//! The canonical form produced here is the sole key used for deduplication
//! across the crawl queue, the visited set and the persisted graph. Two URLs
//! are the same page iff their canonical strings match byte-for-byte.
//!
//! Canonicalization:
//! - lowercase scheme, host and path
//! - fold `127.0.0.1`, `host.docker.internal` and `localhost` to one host
//! - strip a leading `www.`
//! - omit default ports (80/443)
//! - strip trailing slashes (except root) and index documents
//! - delete tracking/session query parameters, sort the rest
//! - discard the fragment

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

/// Query parameters that never change page identity (analytics, click ids,
/// server session tokens). Compared case-insensitively; `utm_` matches as a
/// prefix.
const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "dclid", "msclkid", "mc_cid", "mc_eid", "_ga", "_gl", "igshid", "ttclid",
    "phpsessid", "jsessionid", "sessionid", "session_id", "sid",
];

/// File extensions that identify non-HTML resources.
const RESOURCE_EXTENSIONS: &[&str] = &[
    // images
    "png", "jpg", "jpeg", "gif", "svg", "webp", "ico", "bmp", "tiff", "avif",
    // documents
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "csv", "rtf",
    // archives
    "zip", "tar", "gz", "rar", "7z", "bz2",
    // media
    "mp3", "mp4", "wav", "avi", "mov", "mkv", "webm", "ogg", "flac",
    // code/styles/data
    "css", "js", "mjs", "map", "json", "xml", "wasm",
    // fonts
    "woff", "woff2", "ttf", "otf", "eot",
];

/// Index documents that collapse into their parent directory.
const INDEX_FILES: &[&str] = &[
    "index.html", "index.htm", "index.php", "index.asp", "index.aspx",
    "default.asp", "default.aspx", "default.htm", "default.html",
];

/// Paths that identify a login page when a navigation unexpectedly lands on
/// them.
const LOGIN_PATHS: &[&str] = &[
    "/login", "/signin", "/sign-in", "/auth", "/authenticate", "/sso", "/cas/login",
];

lazy_static! {
    static ref PRIVATE_V4: Regex =
        Regex::new(r"^(10\.|192\.168\.|172\.(1[6-9]|2\d|3[01])\.)").expect("static regex");
}

/// Collapse equivalent development hosts and strip `www.`.
fn fold_host(host: &str) -> String {
    let host = host.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    match host.as_str() {
        "127.0.0.1" | "host.docker.internal" => "localhost".to_string(),
        _ => host,
    }
}

/// True for loopback, RFC1918 and docker-internal hosts. Sitemap probing is
/// skipped for these and the prober relaxes TLS verification.
#[must_use]
pub fn is_local_host(host: &str) -> bool {
    let folded = fold_host(host);
    folded == "localhost" || folded == "::1" || PRIVATE_V4.is_match(&folded)
}

/// Canonicalize a URL string for deduplication.
///
/// Unparseable input falls back to the lowercased original so callers never
/// lose a key (the lenient contract the graph store relies on).
#[must_use]
pub fn canonicalize(url: &str) -> String {
    let parsed = match Url::parse(url.trim()) {
        Ok(u) => u,
        Err(_) => return url.trim().to_lowercase(),
    };

    let Some(host) = parsed.host_str() else {
        return url.trim().to_lowercase();
    };

    let mut out = String::with_capacity(url.len());
    out.push_str(&parsed.scheme().to_lowercase());
    out.push_str("://");
    out.push_str(&fold_host(host));

    if let Some(port) = parsed.port() {
        let default_port = match parsed.scheme() {
            "http" => 80,
            "https" => 443,
            _ => 0,
        };
        if port != default_port {
            out.push(':');
            out.push_str(&port.to_string());
        }
    }

    out.push_str(&canonical_path(parsed.path()));

    if let Some(query) = parsed.query() {
        let filtered = filter_and_sort_query(query);
        if !filtered.is_empty() {
            out.push('?');
            out.push_str(&filtered);
        }
    }

    // Fragment is always discarded.
    out
}

/// Lowercase the path, drop index documents and trailing slashes.
fn canonical_path(path: &str) -> String {
    let mut path = path.to_lowercase();

    if let Some(last) = path.rsplit('/').next()
        && INDEX_FILES.contains(&last)
    {
        path.truncate(path.len() - last.len());
    }

    while path.len() > 1 && path.ends_with('/') {
        path.pop();
    }

    if path.is_empty() {
        path.push('/');
    }
    path
}

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

/// Remove tracking parameters and sort the remainder lexicographically so
/// parameter order never splits a page into two keys.
fn filter_and_sort_query(query: &str) -> String {
    let mut pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    pairs.sort();

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (k, v) in &pairs {
        serializer.append_pair(k, v);
    }
    serializer.finish()
}

/// True when the URL plausibly addresses an HTML page rather than a static
/// resource (image, stylesheet, archive, ...).
#[must_use]
pub fn is_page_url(url: &str) -> bool {
    let path = match Url::parse(url) {
        Ok(u) => u.path().to_lowercase(),
        Err(_) => url.to_lowercase(),
    };

    match path.rsplit('/').next().and_then(|seg| seg.rsplit_once('.')) {
        Some((_, ext)) => !RESOURCE_EXTENSIONS.contains(&ext),
        None => true,
    }
}

/// Extract the folded host of a URL, if it has one.
#[must_use]
pub fn folded_host(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(fold_host))
}

/// Same-site test: equal folded hosts, or `url` is a subdomain of `base`.
#[must_use]
pub fn same_site(url: &str, base: &str) -> bool {
    match (folded_host(url), folded_host(base)) {
        (Some(h), Some(b)) => h == b || h.ends_with(&format!(".{b}")),
        _ => false,
    }
}

/// Did a navigation requested at `requested` end on a login page?
///
/// When the recipe's login URL is known, canonical equality with the final
/// URL decides. Otherwise the final path must match a well-known login path
/// while differing from the requested path (so crawling the login page
/// itself is not misread as a redirect).
#[must_use]
pub fn is_login_redirect(requested: &str, final_url: &str, recipe_login_url: Option<&str>) -> bool {
    if let Some(login) = recipe_login_url
        && canonicalize(final_url) == canonicalize(login)
        && canonicalize(requested) != canonicalize(login)
    {
        return true;
    }

    let final_path = match Url::parse(final_url) {
        Ok(u) => u.path().trim_end_matches('/').to_lowercase(),
        Err(_) => return false,
    };
    let requested_path = Url::parse(requested)
        .map(|u| u.path().trim_end_matches('/').to_lowercase())
        .unwrap_or_default();

    LOGIN_PATHS.contains(&final_path.as_str()) && final_path != requested_path
}

/// Rewrite loopback hosts to `host.docker.internal` for navigation from
/// inside a container. Canonicalization still folds all three hosts, so the
/// rewrite never changes page identity.
#[must_use]
pub fn rewrite_for_container(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    match parsed.host_str() {
        Some("localhost") | Some("127.0.0.1") => {
            if parsed.set_host(Some("host.docker.internal")).is_ok() {
                parsed.to_string()
            } else {
                url.to_string()
            }
        }
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_basics() {
        assert_eq!(
            canonicalize("HTTPS://Example.COM/Path/"),
            "https://example.com/path"
        );
        assert_eq!(
            canonicalize("https://example.com:443/a"),
            "https://example.com/a"
        );
        assert_eq!(
            canonicalize("http://example.com:8080/a"),
            "http://example.com:8080/a"
        );
        assert_eq!(canonicalize("https://example.com"), "https://example.com/");
        assert_eq!(
            canonicalize("https://example.com/a#section"),
            "https://example.com/a"
        );
    }

    #[test]
    fn host_folding() {
        let a = canonicalize("http://127.0.0.1:3000/x");
        let b = canonicalize("http://localhost:3000/x");
        let c = canonicalize("http://host.docker.internal:3000/x");
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a, "http://localhost:3000/x");
    }

    #[test]
    fn www_stripped() {
        assert_eq!(
            canonicalize("https://www.example.com/a"),
            canonicalize("https://example.com/a")
        );
    }

    #[test]
    fn index_files_collapse() {
        assert_eq!(
            canonicalize("https://example.com/docs/index.html"),
            "https://example.com/docs"
        );
        assert_eq!(
            canonicalize("https://example.com/Default.aspx"),
            "https://example.com/"
        );
    }

    #[test]
    fn tracking_params_removed_and_sorted() {
        assert_eq!(
            canonicalize("https://example.com/p?utm_source=x&id=7&fbclid=abc"),
            "https://example.com/p?id=7"
        );
        assert_eq!(
            canonicalize("https://example.com/p?b=2&a=1"),
            canonicalize("https://example.com/p?a=1&b=2")
        );
        // All-tracking query disappears entirely.
        assert_eq!(
            canonicalize("https://example.com/p?utm_campaign=x&gclid=1"),
            "https://example.com/p"
        );
    }

    #[test]
    fn idempotent() {
        for u in [
            "https://Example.com/A/?utm_source=x&z=1&a=2#frag",
            "http://127.0.0.1:3000/index.html",
            "not a url at all",
        ] {
            let once = canonicalize(u);
            assert_eq!(canonicalize(&once), once);
        }
    }

    #[test]
    fn lenient_fallback() {
        assert_eq!(canonicalize("Not A URL"), "not a url");
    }

    #[test]
    fn page_url_classification() {
        assert!(is_page_url("https://example.com/about"));
        assert!(is_page_url("https://example.com/products.html"));
        assert!(is_page_url("https://example.com/v1.2/docs"));
        assert!(!is_page_url("https://example.com/logo.png"));
        assert!(!is_page_url("https://example.com/report.pdf"));
        assert!(!is_page_url("https://example.com/app.js?v=3"));
    }

    #[test]
    fn same_site_rules() {
        assert!(same_site("https://example.com/a", "https://example.com"));
        assert!(same_site("https://docs.example.com/a", "https://example.com"));
        assert!(same_site("https://www.example.com/a", "https://example.com"));
        assert!(!same_site("https://other.com/a", "https://example.com"));
        assert!(!same_site(
            "https://notexample.com/a",
            "https://example.com"
        ));
        assert!(same_site("http://127.0.0.1:3000/a", "http://localhost:3000"));
    }

    #[test]
    fn login_redirect_detection() {
        // Recipe URL match
        assert!(is_login_redirect(
            "https://app.example.com/dashboard",
            "https://app.example.com/session/new",
            Some("https://app.example.com/session/new"),
        ));
        // Known login path without a recipe
        assert!(is_login_redirect(
            "https://example.com/account",
            "https://example.com/login",
            None,
        ));
        // Requesting the login page itself is not a redirect
        assert!(!is_login_redirect(
            "https://example.com/login",
            "https://example.com/login",
            None,
        ));
        assert!(!is_login_redirect(
            "https://example.com/a",
            "https://example.com/b",
            None,
        ));
    }

    #[test]
    fn local_host_detection() {
        assert!(is_local_host("localhost"));
        assert!(is_local_host("127.0.0.1"));
        assert!(is_local_host("host.docker.internal"));
        assert!(is_local_host("192.168.1.10"));
        assert!(is_local_host("172.20.0.2"));
        assert!(!is_local_host("172.32.0.1"));
        assert!(!is_local_host("example.com"));
    }

    #[test]
    fn container_rewrite() {
        assert_eq!(
            rewrite_for_container("http://localhost:3000/a"),
            "http://host.docker.internal:3000/a"
        );
        assert_eq!(
            rewrite_for_container("https://example.com/a"),
            "https://example.com/a"
        );
    }
}
