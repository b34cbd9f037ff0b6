//! Naming convention templates
//!
//! Index and key naming rules are configured with a format such as
//! `idx_{{table}}_{{column_list}}`. The tokens allowed in a format depend on
//! the rule type and are checked when the rule is built; the format is then
//! compiled per identifier, with the tokens replaced by the concrete table
//! and column names, into a fully anchored regex.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{NamingError, ReviewError};
use crate::rule::payload::NamingPayload;
use crate::rule::RuleType;

/// Identifier length limit used when a rule does not configure one.
pub const DEFAULT_NAME_LENGTH_LIMIT: usize = 63;

pub const TABLE_TOKEN: &str = "{{table}}";
pub const COLUMN_LIST_TOKEN: &str = "{{column_list}}";
pub const REFERENCING_TABLE_TOKEN: &str = "{{referencing_table}}";
pub const REFERENCING_COLUMN_TOKEN: &str = "{{referencing_column}}";
pub const REFERENCED_TABLE_TOKEN: &str = "{{referenced_table}}";
pub const REFERENCED_COLUMN_TOKEN: &str = "{{referenced_column}}";

static TOKEN_RE: OnceLock<Regex> = OnceLock::new();

fn token_regex() -> &'static Regex {
    TOKEN_RE.get_or_init(|| Regex::new(r"\{\{[^{}]+\}\}").expect("valid regex"))
}

/// Tokens a format may use for the given rule type.
pub fn allowed_tokens(rule_type: RuleType) -> &'static [&'static str] {
    match rule_type {
        RuleType::NamingIndexIdx | RuleType::NamingIndexUk => &[TABLE_TOKEN, COLUMN_LIST_TOKEN],
        RuleType::NamingIndexFk => &[
            REFERENCING_TABLE_TOKEN,
            REFERENCING_COLUMN_TOKEN,
            REFERENCED_TABLE_TOKEN,
            REFERENCED_COLUMN_TOKEN,
        ],
        _ => &[],
    }
}

/// Every `{{...}}` token of `format`, in order of appearance.
pub fn template_tokens(format: &str) -> Vec<String> {
    token_regex()
        .find_iter(format)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// A validated naming format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingTemplate {
    format: String,
    tokens: Vec<String>,
    max_length: usize,
}

impl NamingTemplate {
    pub fn parse(rule_type: RuleType, payload: &NamingPayload) -> Result<Self, ReviewError> {
        let tokens = template_tokens(&payload.format);
        let allowed = allowed_tokens(rule_type);
        if let Some(unknown) = tokens.iter().find(|t| !allowed.contains(&t.as_str())) {
            return Err(ReviewError::InvalidTemplateToken {
                template: unknown.clone(),
                rule: rule_type.as_str().to_string(),
            });
        }

        Ok(Self {
            format: payload.format.clone(),
            tokens,
            max_length: effective_max_length(payload.max_length),
        })
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn exceeds_length(&self, name: &str) -> bool {
        name.chars().count() > self.max_length
    }

    /// Compile the format with the given token values.
    pub fn compile(&self, values: &HashMap<&str, String>) -> Result<Regex, NamingError> {
        compile(&self.format, values)
    }
}

/// Limit to enforce for a configured `maxLength`.
pub fn effective_max_length(configured: usize) -> usize {
    if configured == 0 {
        DEFAULT_NAME_LENGTH_LIMIT
    } else {
        configured
    }
}

/// Build an anchored regex from `format`.
///
/// Literal text and substituted values are matched verbatim. A leading `^`
/// and trailing `$` in the format are accepted and ignored since the result
/// is always anchored.
pub fn compile(format: &str, values: &HashMap<&str, String>) -> Result<Regex, NamingError> {
    let body = format.strip_prefix('^').unwrap_or(format);
    let body = body.strip_suffix('$').unwrap_or(body);

    let mut pattern = String::with_capacity(body.len() + 2);
    pattern.push('^');
    let mut last = 0;
    for m in token_regex().find_iter(body) {
        pattern.push_str(&regex::escape(&body[last..m.start()]));
        let value = values
            .get(m.as_str())
            .ok_or_else(|| NamingError::MissingValue(m.as_str().to_string()))?;
        pattern.push_str(&regex::escape(value));
        last = m.end();
    }
    pattern.push_str(&regex::escape(&body[last..]));
    pattern.push('$');

    Ok(Regex::new(&pattern)?)
}

/// Anchor a user-supplied regex so it has to match the whole identifier.
pub fn anchored_regex(rule_type: RuleType, format: &str) -> Result<Regex, ReviewError> {
    Regex::new(&format!("^(?:{})$", format)).map_err(|source| ReviewError::InvalidRegex {
        rule: rule_type.as_str().to_string(),
        format: format.to_string(),
        source,
    })
}
