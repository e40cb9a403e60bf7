//! Login recipe types.
//!
//! A recipe is a declarative, ordered list of type/click/wait steps plus
//! credentials, enough to authenticate one browser tab. Recipes come from
//! an external credential store and are opaque to everything but the
//! executor.

use serde::{Deserialize, Serialize};

/// How field/submit selectors are resolved during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecipeMode {
    /// Try the step's selector, fall back to smart detection.
    #[default]
    Auto,
    /// Use only `manual_selectors`; no fallback of any kind.
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Type,
    Click,
    Wait,
}

/// One step of a login recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginStep {
    pub kind: StepKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// For `type` steps the text to enter (placeholders substituted); for
    /// `wait` steps the duration in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Explicit selectors for manual-mode recipes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualSelectors {
    pub username_selector: String,
    pub password_selector: String,
    pub submit_selector: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRecipe {
    pub login_url: String,
    pub credentials: Credentials,
    pub steps: Vec<LoginStep>,
    #[serde(default)]
    pub mode: RecipeMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_selectors: Option<ManualSelectors>,
}

impl LoginRecipe {
    /// Substitute `{username}` / `{password}` placeholders in a step value.
    #[must_use]
    pub fn substitute(&self, value: &str) -> String {
        value
            .replace("{username}", &self.credentials.username)
            .replace("{password}", &self.credentials.password)
    }

    /// Whether a substituted value is the password (drives log redaction).
    #[must_use]
    pub fn is_secret(&self, raw_value: &str) -> bool {
        raw_value.contains("{password}")
    }
}
