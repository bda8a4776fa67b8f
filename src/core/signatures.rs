//! Content signatures: substrings that should only appear in copies of a body.
//!
//! A signature is the value of an attribute like `module_id="..."` or
//! `module_class="..."`. Each rule contributes a bounded number of values so
//! boilerplate-heavy bodies do not explode into dozens of corpus searches.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static MODULE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"module_id="([^"]+)""#).expect("valid regex"));
static MODULE_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"module_class="([^"]+)""#).expect("valid regex"));
static ADMIN_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"admin_label="([^"]+)""#).expect("valid regex"));
static ANY_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"_id="([^"]+)""#).expect("valid regex"));

/// Per-rule caps and the length filter for class/label values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureLimits {
    /// `module_id` values kept (default: 3)
    #[serde(default = "default_module_ids")]
    pub module_ids: usize,

    /// `module_class` values kept (default: 3)
    #[serde(default = "default_module_classes")]
    pub module_classes: usize,

    /// `admin_label` values kept (default: 2)
    #[serde(default = "default_admin_labels")]
    pub admin_labels: usize,

    /// Generic `*_id` values kept (default: 3)
    #[serde(default = "default_generic_ids")]
    pub generic_ids: usize,

    /// Class and label values must be longer than this (default: 10)
    #[serde(default = "default_min_label_length")]
    pub min_label_length: usize,
}

fn default_module_ids() -> usize {
    3
}
fn default_module_classes() -> usize {
    3
}
fn default_admin_labels() -> usize {
    2
}
fn default_generic_ids() -> usize {
    3
}
fn default_min_label_length() -> usize {
    10
}

impl Default for SignatureLimits {
    fn default() -> Self {
        Self {
            module_ids: default_module_ids(),
            module_classes: default_module_classes(),
            admin_labels: default_admin_labels(),
            generic_ids: default_generic_ids(),
            min_label_length: default_min_label_length(),
        }
    }
}

/// What kind of value a rule extracts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleKind {
    /// Generated identifiers: the first few are distinctive enough
    Identifier,

    /// Classes and labels: short values are too common to count
    Label,
}

struct Rule {
    pattern: &'static LazyLock<Regex>,
    kind: RuleKind,
    cap: usize,
}

/// Ordered, de-duplicated signatures of one content body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signatures(Vec<String>);

impl Signatures {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Number of signatures contained in `body`
    pub fn matches_in(&self, body: &str) -> usize {
        self.0.iter().filter(|sig| body.contains(sig.as_str())).count()
    }

    fn push_unique(&mut self, value: &str) {
        if !value.is_empty() && !self.0.iter().any(|s| s == value) {
            self.0.push(value.to_string());
        }
    }
}

/// Extracts signatures from content bodies
#[derive(Debug, Clone, Default)]
pub struct SignatureExtractor {
    limits: SignatureLimits,
}

impl SignatureExtractor {
    pub fn new(limits: SignatureLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &SignatureLimits {
        &self.limits
    }

    fn rules(&self) -> [Rule; 4] {
        [
            Rule {
                pattern: &MODULE_ID,
                kind: RuleKind::Identifier,
                cap: self.limits.module_ids,
            },
            Rule {
                pattern: &MODULE_CLASS,
                kind: RuleKind::Label,
                cap: self.limits.module_classes,
            },
            Rule {
                pattern: &ADMIN_LABEL,
                kind: RuleKind::Label,
                cap: self.limits.admin_labels,
            },
            Rule {
                pattern: &ANY_ID,
                kind: RuleKind::Identifier,
                cap: self.limits.generic_ids,
            },
        ]
    }

    /// Extract the signatures of a content body.
    ///
    /// Rules run in a fixed order and the result keeps the first occurrence of
    /// each value, so the same body always yields the same signatures.
    pub fn extract(&self, content: &str) -> Signatures {
        let mut signatures = Signatures::default();

        for rule in self.rules() {
            let min_len = self.limits.min_label_length;
            rule.pattern
                .captures_iter(content)
                .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
                .filter(|value| rule.kind == RuleKind::Identifier || value.len() > min_len)
                .take(rule.cap)
                .for_each(|value| signatures.push_unique(value));
        }

        signatures
    }
}
