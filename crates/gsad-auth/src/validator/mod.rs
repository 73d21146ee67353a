//! Named-rule parameter validation.
//!
//! A rule is a compiled regex (or no pattern at all for binary fields). An
//! alias copies its target's rule at creation time, so targets must be
//! registered first. The table is built once at startup and shared
//! read-only afterwards.

pub mod rules;

use std::collections::HashMap;

use regex::Regex;

use crate::error::ValidationError;

pub use rules::default_validator;

/// A single validation rule.
#[derive(Debug, Clone)]
struct Rule {
    /// `None` accepts any bytes without a UTF-8 check.
    pattern: Option<Regex>,
    /// Numeric rules match against, and yield, the whitespace-trimmed value.
    numeric: bool,
}

/// Table of named rules.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    rules: HashMap<String, Rule>,
}

impl Validator {
    /// Creates an empty validator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a rule. `None` registers a binary rule.
    pub fn add_rule(&mut self, name: &str, pattern: Option<&str>) -> Result<(), ValidationError> {
        self.insert(name, pattern, false)
    }

    /// Registers a rule whose values are trimmed before matching.
    pub fn add_numeric_rule(&mut self, name: &str, pattern: &str) -> Result<(), ValidationError> {
        self.insert(name, Some(pattern), true)
    }

    /// Registers `alias` as a copy of the existing rule `target`.
    pub fn add_alias(&mut self, alias: &str, target: &str) -> Result<(), ValidationError> {
        let rule = self
            .rules
            .get(target)
            .cloned()
            .ok_or_else(|| ValidationError::UnknownName(target.to_string()))?;
        self.rules.insert(alias.to_string(), rule);
        Ok(())
    }

    /// Whether a rule or alias exists under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Validates `value` against the rule `name`.
    ///
    /// An absent value is accepted only by binary rules.
    pub fn validate(&self, name: &str, value: Option<&[u8]>) -> Result<(), ValidationError> {
        let rule = self.rule(name)?;
        match (value, &rule.pattern) {
            (None, None) => Ok(()),
            (None, Some(_)) => Err(ValidationError::NoMatch(name.to_string())),
            (Some(_), None) => Ok(()),
            (Some(bytes), Some(pattern)) => {
                let text = std::str::from_utf8(bytes)
                    .map_err(|_| ValidationError::InvalidUtf8(name.to_string()))?;
                let subject = if rule.numeric { text.trim() } else { text };
                if pattern.is_match(subject) {
                    Ok(())
                } else {
                    Err(ValidationError::NoMatch(name.to_string()))
                }
            }
        }
    }

    /// Validates and returns the value as it should be stored.
    ///
    /// Numeric rules return the trimmed value. Binary rules return the
    /// value lossily decoded, since their consumers read raw bytes.
    pub fn normalize(&self, name: &str, value: &[u8]) -> Result<String, ValidationError> {
        self.validate(name, Some(value))?;
        let rule = self.rule(name)?;
        if rule.pattern.is_none() {
            return Ok(String::from_utf8_lossy(value).into_owned());
        }
        let text = std::str::from_utf8(value)
            .map_err(|_| ValidationError::InvalidUtf8(name.to_string()))?;
        Ok(if rule.numeric {
            text.trim().to_string()
        } else {
            text.to_string()
        })
    }

    /// Resolves the rule name for a parameter.
    ///
    /// `chart_preference:abc` falls back to the `chart_preference:` rule
    /// when no exact rule exists.
    pub fn rule_name_for<'a>(&self, param: &'a str) -> Option<&'a str> {
        if self.rules.contains_key(param) {
            return Some(param);
        }
        let colon = param.find(':')?;
        let prefix = &param[..=colon];
        self.rules.contains_key(prefix).then_some(prefix)
    }

    fn rule(&self, name: &str) -> Result<&Rule, ValidationError> {
        self.rules
            .get(name)
            .ok_or_else(|| ValidationError::UnknownName(name.to_string()))
    }

    fn insert(
        &mut self,
        name: &str,
        pattern: Option<&str>,
        numeric: bool,
    ) -> Result<(), ValidationError> {
        let pattern = pattern
            .map(Regex::new)
            .transpose()
            .map_err(|e| ValidationError::InvalidPattern {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        self.rules
            .insert(name.to_string(), Rule { pattern, numeric });
        Ok(())
    }
}
