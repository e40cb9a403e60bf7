//! JavaScript evaluation scripts for link and menu discovery.

/// Enumerate visible anchors with location classification.
///
/// Location is decided by the nearest classifying ancestor:
/// nav/header/[role=navigation|banner] → navigation,
/// footer/[role=contentinfo] → footer, aside → sidebar, else content.
/// Buttons wired to `location.href` become `button` pseudo-links. URLs are
/// resolved in-page, non-navigable schemes skipped, duplicates (by URL)
/// keep the first occurrence.
pub const LINKS_SCRIPT: &str = r#"
    (() => {
        const isVisible = (el) => {
            const style = window.getComputedStyle(el);
            if (style.display === 'none' || style.visibility === 'hidden') return false;
            if (parseFloat(style.opacity) === 0) return false;
            const rect = el.getBoundingClientRect();
            return rect.width > 0 && rect.height > 0 && el.offsetParent !== null;
        };

        const locationOf = (el) => {
            if (el.closest("nav, [role='navigation'], [role='menubar']")) return 'navigation';
            if (el.closest("footer, [role='contentinfo']")) return 'footer';
            if (el.closest('header, [role="banner"]')) return 'navigation';
            if (el.closest('aside')) return 'sidebar';
            return 'content';
        };

        const badScheme = (href) =>
            /^(javascript|mailto|tel|data|blob|file|ftp):/i.test(href) || href.startsWith('#');

        const links = [];
        const seen = new Set();

        for (const a of document.querySelectorAll('a[href]')) {
            const href = a.getAttribute('href');
            if (!href || badScheme(href)) continue;
            if (!isVisible(a)) continue;
            let resolved;
            try { resolved = new URL(href, window.location.href); } catch (e) { continue; }
            if (!['http:', 'https:'].includes(resolved.protocol)) continue;
            if (seen.has(resolved.href)) continue;
            seen.add(resolved.href);
            links.push({
                url: resolved.href,
                text: (a.textContent || '').trim().slice(0, 200),
                location: locationOf(a),
                host: resolved.host
            });
        }

        // Buttons that navigate through an inline handler.
        for (const b of document.querySelectorAll('button[onclick]')) {
            const handler = b.getAttribute('onclick') || '';
            const match = handler.match(/location\.href\s*=\s*['"]([^'"]+)['"]/);
            if (!match) continue;
            if (!isVisible(b)) continue;
            let resolved;
            try { resolved = new URL(match[1], window.location.href); } catch (e) { continue; }
            if (!['http:', 'https:'].includes(resolved.protocol)) continue;
            if (seen.has(resolved.href)) continue;
            seen.add(resolved.href);
            links.push({
                url: resolved.href,
                text: (b.textContent || '').trim().slice(0, 200),
                location: 'button',
                host: resolved.host
            });
        }

        return links;
    })()
"#;

/// Just the visible anchor URLs, for before/after menu-interaction diffs.
pub const VISIBLE_URLS_SCRIPT: &str = r#"
    (() => {
        const isVisible = (el) => {
            const style = window.getComputedStyle(el);
            if (style.display === 'none' || style.visibility === 'hidden') return false;
            if (parseFloat(style.opacity) === 0) return false;
            const rect = el.getBoundingClientRect();
            return rect.width > 0 && rect.height > 0 && el.offsetParent !== null;
        };
        const urls = [];
        for (const a of document.querySelectorAll('a[href]')) {
            if (!isVisible(a)) continue;
            try {
                const resolved = new URL(a.getAttribute('href'), window.location.href);
                if (['http:', 'https:'].includes(resolved.protocol)) urls.push(resolved.href);
            } catch (e) {}
        }
        return urls;
    })()
"#;

/// Enumerate plausible menu triggers inside nav-like containers.
///
/// Each candidate is tagged in the DOM with `data-scout-menu="<idx>"` so the
/// driver can address it; the returned metadata feeds the hover/click
/// safety decisions. Candidates are deduplicated by trimmed text.
pub const MENU_CANDIDATES_SCRIPT: &str = r#"
    (() => {
        const CONTAINERS =
            "nav, [role='navigation'], [role='menubar'], header, " +
            ".navbar, .nav-menu, .main-nav, .menu, [data-testid*='nav']";
        const ITEMS =
            "a, button, [role='menuitem'], [role='button'], [role='link'], " +
            "[aria-haspopup], [aria-expanded], [aria-controls], " +
            ".menu-item, .nav-item, .dropdown-toggle, .has-dropdown";

        const isVisible = (el) => {
            const style = window.getComputedStyle(el);
            if (style.display === 'none' || style.visibility === 'hidden') return false;
            if (parseFloat(style.opacity) === 0) return false;
            const rect = el.getBoundingClientRect();
            return rect.width > 0 && rect.height > 0 && el.offsetParent !== null;
        };

        const subIndicator = (el) => {
            const popup = (el.getAttribute('aria-haspopup') || '').toLowerCase();
            if (popup === 'true' || popup === 'menu') return true;
            if (el.hasAttribute('aria-expanded') || el.hasAttribute('aria-controls')) return true;
            const parent = el.parentElement;
            if (parent && parent.querySelector(':scope > ul, :scope > .submenu, :scope > .dropdown-menu')) return true;
            if (el.querySelector('svg, .caret, [class*="chevron"], [class*="arrow-down"], i[class*="fa-angle"]')) return true;
            const text = (el.textContent || '').trim();
            return /[▾▼›+]$/.test(text);
        };

        document.querySelectorAll('[data-scout-menu]')
            .forEach(el => el.removeAttribute('data-scout-menu'));

        const candidates = [];
        const seenText = new Set();
        let idx = 0;

        for (const container of document.querySelectorAll(CONTAINERS)) {
            for (const el of container.querySelectorAll(ITEMS)) {
                if (candidates.length >= 40) break;
                if (!isVisible(el)) continue;
                const text = (el.textContent || '').trim().slice(0, 80);
                if (!text || seenText.has(text)) continue;
                seenText.add(text);

                const tag = el.tagName.toLowerCase();
                const href = tag === 'a' ? (el.getAttribute('href') || '') : '';
                const hasRealHref = !!href && href !== '#' && !href.toLowerCase().startsWith('javascript:');
                const popup = (el.getAttribute('aria-haspopup') || '').toLowerCase();
                const classes = (el.className && el.className.toString) ? el.className.toString() : '';

                el.setAttribute('data-scout-menu', String(idx));
                candidates.push({
                    idx: idx,
                    text: text,
                    tag: tag,
                    has_sub_indicator: subIndicator(el),
                    has_real_href: hasRealHref,
                    has_popup_aria: popup === 'true' || popup === 'menu'
                        || el.hasAttribute('aria-expanded') || el.hasAttribute('aria-controls'),
                    has_toggle_class: /toggle|dropdown|expand/i.test(classes),
                    has_click_handler: el.hasAttribute('onclick') || el.hasAttribute('ng-click')
                        || el.hasAttribute('@click') || el.hasAttribute('v-on:click')
                });
                idx += 1;
            }
        }

        return candidates;
    })()
"#;
