//! Property tests for URL canonicalization.
//!
//! Canonicalization is the deduplication key for the whole graph, so the
//! laws here are load-bearing: idempotence, tracking-parameter irrelevance
//! and development-host folding.

use proptest::prelude::*;
use sitescout::urlnorm::canonicalize;

const TRACKING_KEYS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "fbclid",
    "gclid",
    "mc_cid",
    "_ga",
    "sessionid",
];

fn path_segment() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_-]{1,12}"
}

fn host() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("example.com".to_string()),
        Just("Example.COM".to_string()),
        Just("www.example.com".to_string()),
        Just("shop.example.org".to_string()),
    ]
}

fn query_pairs() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(("[a-z]{1,8}", "[a-zA-Z0-9]{0,8}"), 0..4).prop_map(|pairs| {
        pairs
            .into_iter()
            .map(|(k, v)| (k, v))
            .filter(|(k, _)| !TRACKING_KEYS.contains(&k.as_str()) && !k.starts_with("utm_"))
            .collect()
    })
}

fn plain_url() -> impl Strategy<Value = String> {
    (
        prop_oneof![Just("http"), Just("https")],
        host(),
        prop::collection::vec(path_segment(), 0..4),
        query_pairs(),
    )
        .prop_map(|(scheme, host, segments, query)| {
            let mut url = format!("{scheme}://{host}/{}", segments.join("/"));
            if !query.is_empty() {
                let qs: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
                url.push('?');
                url.push_str(&qs.join("&"));
            }
            url
        })
}

proptest! {
    /// P1: canonicalization is idempotent, for URLs and for garbage.
    #[test]
    fn idempotent_on_urls(url in plain_url()) {
        let once = canonicalize(&url);
        prop_assert_eq!(canonicalize(&once), once);
    }

    #[test]
    fn idempotent_on_arbitrary_strings(input in ".{0,60}") {
        let once = canonicalize(&input);
        prop_assert_eq!(canonicalize(&once), once);
    }

    /// P2: any subset of tracking parameters, inserted anywhere in the
    /// query, never changes the canonical form.
    #[test]
    fn tracking_params_are_irrelevant(
        url in plain_url(),
        tracked in prop::collection::vec((0..TRACKING_KEYS.len(), "[a-zA-Z0-9]{1,8}"), 1..4),
    ) {
        let mut polluted = url.clone();
        for (idx, value) in &tracked {
            let sep = if polluted.contains('?') { '&' } else { '?' };
            polluted.push(sep);
            polluted.push_str(TRACKING_KEYS[*idx]);
            polluted.push('=');
            polluted.push_str(value);
        }
        prop_assert_eq!(canonicalize(&polluted), canonicalize(&url));
    }

    /// P3: loopback, docker-internal and literal localhost fold together.
    #[test]
    fn localhost_variants_fold(
        segments in prop::collection::vec(path_segment(), 0..3),
        port in 1024u16..9999,
    ) {
        let path = segments.join("/");
        let a = canonicalize(&format!("http://127.0.0.1:{port}/{path}"));
        let b = canonicalize(&format!("http://localhost:{port}/{path}"));
        let c = canonicalize(&format!("http://host.docker.internal:{port}/{path}"));
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(&b, &c);
    }

    /// Query parameter order never splits a page into two keys.
    #[test]
    fn query_order_is_irrelevant(
        url_base in plain_url(),
        a_val in "[a-z0-9]{1,6}",
        b_val in "[a-z0-9]{1,6}",
    ) {
        let base = url_base.split('?').next().unwrap_or(&url_base).to_string();
        let one = format!("{base}?alpha={a_val}&beta={b_val}");
        let two = format!("{base}?beta={b_val}&alpha={a_val}");
        prop_assert_eq!(canonicalize(&one), canonicalize(&two));
    }
}
