//! JavaScript evaluation scripts for page inspection.
//!
//! Everything the fetcher wants to know about a rendered page is collected
//! in as few evaluation round-trips as possible; each script returns a JSON
//! object deserialized on the Rust side.

/// Readiness and framework probe.
///
/// `responseStatus` comes from `PerformanceNavigationTiming` (0 when the
/// browser does not expose it); `spa` is true when any well-known
/// client-side-framework marker is present.
pub const PAGE_STATE_SCRIPT: &str = r#"
    (() => {
        const nav = performance.getEntriesByType('navigation')[0] || {};
        const spa =
            !!window.__NEXT_DATA__ ||
            !!document.querySelector('#__next') ||
            !!window.__NUXT__ ||
            !!window.__VUE__ ||
            !!document.querySelector('[data-reactroot]') ||
            !!document.querySelector('[ng-version]');

        return {
            ready_state: document.readyState,
            anchor_count: document.querySelectorAll('a[href]').length,
            response_status: nav.responseStatus || 0,
            spa: spa
        };
    })()
"#;

/// Resource-count sampler used for bounded network-idle waits on SPAs.
pub const RESOURCE_COUNT_SCRIPT: &str = r"
    (() => performance.getEntriesByType('resource').length)()
";

/// Title candidates, auth markers and form census in one pass.
pub const PAGE_SUMMARY_SCRIPT: &str = r#"
    (() => {
        const meta = (sel) => document.querySelector(sel)?.content || null;
        const text = (sel) => document.querySelector(sel)?.textContent?.trim() || null;

        const loginVerbs = [
            'log in', 'login', 'sign in', 'signin', 'anmelden', 'einloggen',
            'iniciar sesión', 'entrar', 'connexion', 'se connecter', 'accedi',
            'войти', '登录', 'ログイン'
        ];
        let hasLoginButton = false;
        for (const el of document.querySelectorAll("button, input[type='submit'], [role='button']")) {
            const t = (el.textContent || el.value || '').trim().toLowerCase();
            if (t && t.length <= 40 && loginVerbs.some(v => t === v || t.includes(v))) {
                hasLoginButton = true;
                break;
            }
        }

        let hasLoginFormAction = false;
        for (const form of document.querySelectorAll('form[action]')) {
            const action = (form.getAttribute('action') || '').toLowerCase();
            if (action.includes('login') || action.includes('signin')) {
                hasLoginFormAction = true;
                break;
            }
        }

        const hasLoginMarkers = !!document.querySelector(
            "[class*='login' i], [class*='signin' i], [id*='login' i], [id*='signin' i]"
        );

        return {
            native_title: document.title || null,
            og_title: meta("meta[property='og:title']"),
            twitter_title: meta("meta[name='twitter:title']"),
            h1: text('h1'),
            h2: text('h2'),
            main_heading: text("main h1, main h2, article h1, article h2, [role='main'] h1, [role='main'] h2"),
            form_count: document.querySelectorAll('form').length,
            has_password_input: !!document.querySelector("input[type='password']"),
            has_login_form_action: hasLoginFormAction,
            has_login_markers: hasLoginMarkers,
            has_login_button: hasLoginButton
        };
    })()
"#;
