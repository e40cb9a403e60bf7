//! Smart login form detection.
//!
//! When an auto-mode recipe's selector misses, the executor falls back to a
//! confidence-ranked ladder of heuristics. Each strategy runs inside the
//! page: it finds the first *visible* matching element, tags it with a
//! `data-scout-field` attribute, and the executor addresses it through that
//! tag. Visibility is checked in every strategy; an invisible match is no
//! match.

use anyhow::{Context, Result};
use chromiumoxide::Page;
use log::debug;
use serde::Deserialize;

/// Attribute used to hand a detected element back to Rust.
pub const FIELD_TAG: &str = "data-scout-field";

/// CSS selector addressing whatever the last detection tagged.
pub const TAGGED_SELECTOR: &str = "[data-scout-field]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Username,
    Password,
    Submit,
}

impl FieldKind {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Username => "username field",
            Self::Password => "password field",
            Self::Submit => "submit control",
        }
    }
}

/// Confidence band of the strategy that produced a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

enum StrategyKind {
    /// Try plain CSS selectors in order.
    Selectors(&'static [&'static str]),
    /// Match `<label>` text against a multilingual list, resolve the
    /// labelled control via `for=` or nesting.
    LabelText(&'static [&'static str]),
    /// Match clickable-element text against a multilingual verb list.
    ButtonText(&'static [&'static str]),
    /// Last visible text-like input inside a form.
    LastTextInputInForm,
    /// Last visible button inside a form.
    LastButtonInForm,
}

struct Strategy {
    name: &'static str,
    confidence: Confidence,
    kind: StrategyKind,
}

/// Outcome of a successful detection.
#[derive(Debug, Clone)]
pub struct Detection {
    pub strategy: &'static str,
    pub confidence: Confidence,
}

const USERNAME_EXACT: &[&str] = &[
    "input[type='email']",
    "input[autocomplete='email']",
    "input[autocomplete='username']",
    "input[name='email']",
    "input[name='username']",
    "input#email",
    "input#username",
];

const USERNAME_FUZZY: &[&str] = &[
    "input[name*='email' i]",
    "input[name*='user' i]",
    "input[name*='login' i]",
    "input[id*='email' i]",
    "input[id*='user' i]",
    "input[id*='login' i]",
    "input[placeholder*='email' i]",
    "input[placeholder*='user' i]",
    "input[placeholder*='e-mail' i]",
    "input[placeholder*='correo' i]",
    "input[placeholder*='benutzer' i]",
    "input[placeholder*='courriel' i]",
    "input[aria-label*='email' i]",
    "input[aria-label*='user' i]",
    "input[formcontrolname*='email' i]",
    "input[formcontrolname*='user' i]",
    "input[v-model*='email' i]",
    "input[v-model*='user' i]",
    "input[data-reactid*='email' i]",
    "input[data-testid*='email' i]",
    "input[data-testid*='user' i]",
];

const USERNAME_LABELS: &[&str] = &[
    "email", "e-mail", "username", "user name", "login", "benutzername", "correo", "usuario",
    "courriel", "identifiant", "邮箱", "用户名", "メールアドレス",
];

const PASSWORD_EXACT: &[&str] = &[
    "input[type='password']",
    "input[autocomplete='current-password']",
    "input[autocomplete='new-password']",
];

const PASSWORD_FUZZY: &[&str] = &[
    "input[name*='pass' i]",
    "input[id*='pass' i]",
    "input[class*='pass' i]",
    "input[placeholder*='pass' i]",
    "input[placeholder*='contraseña' i]",
    "input[placeholder*='passwort' i]",
    "input[placeholder*='mot de passe' i]",
    "input[aria-label*='pass' i]",
];

const SUBMIT_EXACT: &[&str] = &[
    "button[type='submit']",
    "input[type='submit']",
    "form button:not([type='button'])",
];

/// Multilingual login verbs for text-based submit matching.
const SUBMIT_VERBS: &[&str] = &[
    "log in", "login", "sign in", "signin", "submit", "continue", "anmelden", "einloggen",
    "iniciar sesión", "entrar", "connexion", "se connecter", "accedi", "войти", "登录", "ログイン",
];

const USERNAME_STRATEGIES: &[Strategy] = &[
    Strategy {
        name: "exact-attributes",
        confidence: Confidence::High,
        kind: StrategyKind::Selectors(USERNAME_EXACT),
    },
    Strategy {
        name: "fuzzy-attributes",
        confidence: Confidence::Medium,
        kind: StrategyKind::Selectors(USERNAME_FUZZY),
    },
    Strategy {
        name: "label-text",
        confidence: Confidence::Medium,
        kind: StrategyKind::LabelText(USERNAME_LABELS),
    },
    Strategy {
        name: "last-text-input",
        confidence: Confidence::Low,
        kind: StrategyKind::LastTextInputInForm,
    },
];

const PASSWORD_STRATEGIES: &[Strategy] = &[
    Strategy {
        name: "exact-attributes",
        confidence: Confidence::High,
        kind: StrategyKind::Selectors(PASSWORD_EXACT),
    },
    Strategy {
        name: "fuzzy-attributes",
        confidence: Confidence::Medium,
        kind: StrategyKind::Selectors(PASSWORD_FUZZY),
    },
];

const SUBMIT_STRATEGIES: &[Strategy] = &[
    Strategy {
        name: "exact-attributes",
        confidence: Confidence::High,
        kind: StrategyKind::Selectors(SUBMIT_EXACT),
    },
    Strategy {
        name: "button-text",
        confidence: Confidence::Medium,
        kind: StrategyKind::ButtonText(SUBMIT_VERBS),
    },
    Strategy {
        name: "last-form-button",
        confidence: Confidence::Low,
        kind: StrategyKind::LastButtonInForm,
    },
];

/// Shared JS visibility predicate; inlined into every snippet.
const JS_IS_VISIBLE: &str = r"
    const isVisible = (el) => {
        if (!el) return false;
        const style = window.getComputedStyle(el);
        if (style.display === 'none' || style.visibility === 'hidden') return false;
        if (parseFloat(style.opacity) === 0) return false;
        const rect = el.getBoundingClientRect();
        return rect.width > 0 && rect.height > 0 && el.offsetParent !== null;
    };
    const clearTag = () => {
        document.querySelectorAll('[data-scout-field]')
            .forEach(el => el.removeAttribute('data-scout-field'));
    };
";

#[derive(Debug, Deserialize)]
struct TagResult {
    tagged: bool,
}

/// Run the detection ladder for `kind`. On success the winning element is
/// tagged in the DOM and addressable via [`TAGGED_SELECTOR`].
pub async fn detect_field(page: &Page, kind: FieldKind) -> Result<Option<Detection>> {
    let strategies = match kind {
        FieldKind::Username => USERNAME_STRATEGIES,
        FieldKind::Password => PASSWORD_STRATEGIES,
        FieldKind::Submit => SUBMIT_STRATEGIES,
    };

    for strategy in strategies {
        let script = match &strategy.kind {
            StrategyKind::Selectors(selectors) => tag_by_selectors_script(selectors)?,
            StrategyKind::LabelText(labels) => tag_by_label_script(labels)?,
            StrategyKind::ButtonText(verbs) => tag_by_button_text_script(verbs)?,
            StrategyKind::LastTextInputInForm => LAST_TEXT_INPUT_SCRIPT.to_string(),
            StrategyKind::LastButtonInForm => LAST_FORM_BUTTON_SCRIPT.to_string(),
        };

        let result: TagResult = page
            .evaluate(script.as_str())
            .await
            .with_context(|| format!("detection script '{}' failed", strategy.name))?
            .into_value()
            .context("detection script returned a non-JSON value")?;

        if result.tagged {
            debug!(
                target: "sitescout::login",
                "{} located via strategy '{}' ({:?})",
                kind.label(),
                strategy.name,
                strategy.confidence
            );
            return Ok(Some(Detection {
                strategy: strategy.name,
                confidence: strategy.confidence,
            }));
        }
    }

    Ok(None)
}

fn tag_by_selectors_script(selectors: &[&str]) -> Result<String> {
    let selectors_json = serde_json::to_string(selectors)?;
    Ok(format!(
        r"(() => {{
            {JS_IS_VISIBLE}
            clearTag();
            const selectors = {selectors_json};
            for (const sel of selectors) {{
                let matches;
                try {{ matches = document.querySelectorAll(sel); }} catch (e) {{ continue; }}
                for (const el of matches) {{
                    if (isVisible(el)) {{
                        el.setAttribute('data-scout-field', '1');
                        return {{ tagged: true }};
                    }}
                }}
            }}
            return {{ tagged: false }};
        }})()"
    ))
}

fn tag_by_label_script(labels: &[&str]) -> Result<String> {
    let labels_json = serde_json::to_string(labels)?;
    Ok(format!(
        r"(() => {{
            {JS_IS_VISIBLE}
            clearTag();
            const wanted = {labels_json};
            for (const label of document.querySelectorAll('label')) {{
                const text = (label.textContent || '').trim().toLowerCase();
                if (!wanted.some(w => text.includes(w))) continue;
                let control = null;
                const forId = label.getAttribute('for');
                if (forId) control = document.getElementById(forId);
                if (!control) control = label.querySelector('input');
                if (control && control.tagName === 'INPUT' && isVisible(control)) {{
                    control.setAttribute('data-scout-field', '1');
                    return {{ tagged: true }};
                }}
            }}
            return {{ tagged: false }};
        }})()"
    ))
}

fn tag_by_button_text_script(verbs: &[&str]) -> Result<String> {
    let verbs_json = serde_json::to_string(verbs)?;
    Ok(format!(
        r#"(() => {{
            {JS_IS_VISIBLE}
            clearTag();
            const verbs = {verbs_json};
            const candidates = document.querySelectorAll(
                "button, input[type='submit'], input[type='button'], [role='button'], a"
            );
            for (const el of candidates) {{
                const text = (el.textContent || el.value || '').trim().toLowerCase();
                if (!text || text.length > 40) continue;
                if (verbs.some(v => text === v || text.includes(v)) && isVisible(el)) {{
                    el.setAttribute('data-scout-field', '1');
                    return {{ tagged: true }};
                }}
            }}
            return {{ tagged: false }};
        }})()"#
    ))
}

const LAST_TEXT_INPUT_SCRIPT: &str = r#"(() => {
    const isVisible = (el) => {
        if (!el) return false;
        const style = window.getComputedStyle(el);
        if (style.display === 'none' || style.visibility === 'hidden') return false;
        if (parseFloat(style.opacity) === 0) return false;
        const rect = el.getBoundingClientRect();
        return rect.width > 0 && rect.height > 0 && el.offsetParent !== null;
    };
    document.querySelectorAll('[data-scout-field]')
        .forEach(el => el.removeAttribute('data-scout-field'));
    const inputs = Array.from(document.querySelectorAll(
        "form input[type='text'], form input[type='email'], form input:not([type])"
    )).filter(isVisible);
    if (inputs.length === 0) return { tagged: false };
    inputs[inputs.length - 1].setAttribute('data-scout-field', '1');
    return { tagged: true };
})()"#;

const LAST_FORM_BUTTON_SCRIPT: &str = r#"(() => {
    const isVisible = (el) => {
        if (!el) return false;
        const style = window.getComputedStyle(el);
        if (style.display === 'none' || style.visibility === 'hidden') return false;
        if (parseFloat(style.opacity) === 0) return false;
        const rect = el.getBoundingClientRect();
        return rect.width > 0 && rect.height > 0 && el.offsetParent !== null;
    };
    document.querySelectorAll('[data-scout-field]')
        .forEach(el => el.removeAttribute('data-scout-field'));
    const buttons = Array.from(document.querySelectorAll(
        "form button, form input[type='submit']"
    )).filter(isVisible);
    if (buttons.length === 0) return { tagged: false };
    buttons[buttons.length - 1].setAttribute('data-scout-field', '1');
    return { tagged: true };
})()"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_tables_are_confidence_ordered() {
        for table in [USERNAME_STRATEGIES, PASSWORD_STRATEGIES, SUBMIT_STRATEGIES] {
            let confidences: Vec<Confidence> = table.iter().map(|s| s.confidence).collect();
            let mut sorted = confidences.clone();
            sorted.sort_by(|a, b| b.cmp(a));
            assert_eq!(confidences, sorted, "strategies must run high-to-low");
        }
    }

    #[test]
    fn generated_scripts_embed_selector_lists() {
        let script = tag_by_selectors_script(USERNAME_EXACT).expect("script");
        assert!(script.contains("input[type='email']"));
        assert!(script.contains("data-scout-field"));

        let script = tag_by_button_text_script(SUBMIT_VERBS).expect("script");
        assert!(script.contains("anmelden"));
    }

    #[test]
    fn snippets_always_clear_previous_tags() {
        for script in [
            tag_by_selectors_script(PASSWORD_EXACT).expect("script"),
            tag_by_label_script(USERNAME_LABELS).expect("script"),
            LAST_TEXT_INPUT_SCRIPT.to_string(),
            LAST_FORM_BUTTON_SCRIPT.to_string(),
        ] {
            assert!(script.contains("removeAttribute('data-scout-field')"));
        }
    }
}
