//! Pure page classification: titles, page kinds, auth requirements.
//!
//! Everything here operates on data already pulled out of the browser so it
//! stays unit-testable without a page handle.

use serde::{Deserialize, Serialize};

/// What the page appears to be, judged from its URL path and DOM census.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    Home,
    Product,
    Category,
    Cart,
    Checkout,
    Account,
    Contact,
    About,
    Content,
    Help,
    Search,
    Form,
    Login,
}

impl PageKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Product => "product",
            Self::Category => "category",
            Self::Cart => "cart",
            Self::Checkout => "checkout",
            Self::Account => "account",
            Self::Contact => "contact",
            Self::About => "about",
            Self::Content => "content",
            Self::Help => "help",
            Self::Search => "search",
            Self::Form => "form",
            Self::Login => "login",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "home" => Self::Home,
            "product" => Self::Product,
            "category" => Self::Category,
            "cart" => Self::Cart,
            "checkout" => Self::Checkout,
            "account" => Self::Account,
            "contact" => Self::Contact,
            "about" => Self::About,
            "help" => Self::Help,
            "search" => Self::Search,
            "form" => Self::Form,
            "login" => Self::Login,
            _ => Self::Content,
        }
    }
}

/// DOM census returned by `PAGE_SUMMARY_SCRIPT`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageSummary {
    pub native_title: Option<String>,
    pub og_title: Option<String>,
    pub twitter_title: Option<String>,
    pub h1: Option<String>,
    pub h2: Option<String>,
    pub main_heading: Option<String>,
    pub form_count: usize,
    pub has_password_input: bool,
    pub has_login_form_action: bool,
    pub has_login_markers: bool,
    pub has_login_button: bool,
}

/// URL path token → page kind rules, first match wins.
const PATH_RULES: &[(&[&str], PageKind)] = &[
    (&["/login", "/signin", "/sign-in", "/auth"], PageKind::Login),
    (&["/cart", "/basket"], PageKind::Cart),
    (&["/checkout", "/payment"], PageKind::Checkout),
    (
        &["/account", "/profile", "/dashboard", "/settings"],
        PageKind::Account,
    ),
    (&["/product", "/item", "/p/"], PageKind::Product),
    (
        &["/category", "/categories", "/collection", "/shop"],
        PageKind::Category,
    ),
    (&["/contact"], PageKind::Contact),
    (&["/about", "/team", "/company"], PageKind::About),
    (&["/help", "/support", "/faq", "/docs"], PageKind::Help),
    (&["/search", "/results"], PageKind::Search),
    (&["/blog", "/article", "/news", "/post"], PageKind::Content),
];

/// Classify a page by its canonical URL; a form-bearing page with no other
/// match becomes `Form`, everything else defaults to `Content`.
#[must_use]
pub fn classify_page(canonical_url: &str, summary: &PageSummary) -> PageKind {
    let path = url::Url::parse(canonical_url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| canonical_url.to_string());

    if path == "/" || path.is_empty() {
        return PageKind::Home;
    }

    for (tokens, kind) in PATH_RULES {
        if tokens.iter().any(|t| path.contains(t)) {
            return *kind;
        }
    }

    if summary.form_count > 0 {
        return PageKind::Form;
    }

    PageKind::Content
}

/// Does the page demand authentication? Union of DOM markers and URL/title
/// tokens.
#[must_use]
pub fn requires_auth(summary: &PageSummary, canonical_url: &str, title: &str) -> bool {
    if summary.has_password_input
        || summary.has_login_form_action
        || summary.has_login_markers
        || summary.has_login_button
    {
        return true;
    }

    let url = canonical_url.to_lowercase();
    let title = title.to_lowercase();
    ["login", "signin", "auth"]
        .iter()
        .any(|t| url.contains(t) || title.contains(t))
}

/// Titles that mean "the page had no real title yet".
fn is_junk_title(title: &str) -> bool {
    let t = title.trim().to_lowercase();
    t.is_empty() || t == "undefined" || t == "null" || t.contains("loading")
}

/// Strip literal "undefined" tokens that leak out of half-rendered SPAs.
fn scrub(title: &str) -> String {
    title
        .replace("undefined", "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Pick the best available title, walking the recovery ladder and ending at
/// a URL-derived readable name.
#[must_use]
pub fn recover_title(summary: &PageSummary, canonical_url: &str) -> String {
    let candidates = [
        summary.native_title.as_deref(),
        summary.og_title.as_deref(),
        summary.twitter_title.as_deref(),
        summary.h1.as_deref(),
        summary.h2.as_deref(),
        summary.main_heading.as_deref(),
    ];

    for candidate in candidates.into_iter().flatten() {
        if !is_junk_title(candidate) {
            let cleaned = scrub(candidate);
            if !cleaned.is_empty() {
                return cleaned;
            }
        }
    }

    readable_name(canonical_url)
}

/// Derive a human-readable name from the URL's last path segment.
#[must_use]
pub fn readable_name(url: &str) -> String {
    let path = url::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string());

    let segment = path
        .trim_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("")
        .to_string();

    if segment.is_empty() {
        return "Home".to_string();
    }

    segment
        .replace(['-', '_'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_classification() {
        let s = PageSummary::default();
        assert_eq!(classify_page("https://x.com/", &s), PageKind::Home);
        assert_eq!(
            classify_page("https://x.com/products/red-shoe", &s),
            PageKind::Product
        );
        assert_eq!(classify_page("https://x.com/cart", &s), PageKind::Cart);
        assert_eq!(
            classify_page("https://x.com/checkout/step-2", &s),
            PageKind::Checkout
        );
        assert_eq!(
            classify_page("https://x.com/dashboard", &s),
            PageKind::Account
        );
        assert_eq!(
            classify_page("https://x.com/blog/hello-world", &s),
            PageKind::Content
        );
        assert_eq!(classify_page("https://x.com/login", &s), PageKind::Login);
        assert_eq!(
            classify_page("https://x.com/random-page", &s),
            PageKind::Content
        );
    }

    #[test]
    fn form_fallback_only_without_other_match() {
        let formful = PageSummary {
            form_count: 2,
            ..Default::default()
        };
        assert_eq!(
            classify_page("https://x.com/random-page", &formful),
            PageKind::Form
        );
        // Path rules still win over the form fallback.
        assert_eq!(classify_page("https://x.com/cart", &formful), PageKind::Cart);
    }

    #[test]
    fn auth_detection_from_dom_and_url() {
        let with_password = PageSummary {
            has_password_input: true,
            ..Default::default()
        };
        assert!(requires_auth(&with_password, "https://x.com/p", "Page"));

        let plain = PageSummary::default();
        assert!(requires_auth(&plain, "https://x.com/login", "Anything"));
        assert!(requires_auth(&plain, "https://x.com/p", "Please auth to continue"));
        assert!(!requires_auth(&plain, "https://x.com/p", "Products"));
    }

    #[test]
    fn title_recovery_ladder() {
        let summary = PageSummary {
            native_title: Some("loading...".into()),
            og_title: Some("Product Catalog".into()),
            ..Default::default()
        };
        assert_eq!(
            recover_title(&summary, "https://x.com/catalog"),
            "Product Catalog"
        );

        let summary = PageSummary {
            native_title: Some("undefined".into()),
            h1: Some("Welcome undefined Back".into()),
            ..Default::default()
        };
        assert_eq!(
            recover_title(&summary, "https://x.com/welcome"),
            "Welcome Back"
        );

        let empty = PageSummary::default();
        assert_eq!(
            recover_title(&empty, "https://x.com/pricing-plans"),
            "Pricing Plans"
        );
        assert_eq!(recover_title(&empty, "https://x.com/"), "Home");
    }

    #[test]
    fn page_kind_round_trip() {
        for kind in [
            PageKind::Home,
            PageKind::Product,
            PageKind::Login,
            PageKind::Form,
            PageKind::Content,
        ] {
            assert_eq!(PageKind::parse(kind.as_str()), kind);
        }
        assert_eq!(PageKind::parse("garbage"), PageKind::Content);
    }
}
