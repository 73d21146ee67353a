//! The daemon's parameter rule table.

use crate::error::ValidationError;

use super::Validator;

const RULES: &[(&str, &str)] = &[
    ("boolean", "^(0|1)$"),
    ("cmd", "^[_a-z0-9]{1,80}$"),
    ("token", "^(guest|[-a-f0-9]{36})$"),
    ("login", r"^[-_.@[:alnum:]]{1,80}$"),
    ("password", r"^\P{Cc}*$"),
    ("text", r"^\P{Cc}*$"),
    ("name", r"^\P{Cc}+$"),
    ("comment", r"^\P{Cc}*$"),
    ("filter", r"^\P{Cc}*$"),
    ("id", "^[-_a-zA-Z0-9]{1,80}$"),
    ("timezone", r"^[-_[:alnum:], ./+]{1,1000}$"),
    ("severity", r"^(-1|-2|(10|[0-9])(\.[0-9])?)$"),
    ("severity_class", "^(nist|bsi|pci-dss)$"),
    ("lang", "^(Browser Language|[a-z]{2,3}(_[A-Z]{2})?)$"),
    ("sort_field", "^[_[:alnum:] ]{1,40}$"),
    ("sort_order", "^(ascending|descending)$"),
    ("format", "^(xml|json)$"),
    ("slave_id", "^[-_a-zA-Z0-9]{0,80}$"),
    ("page", "^[-_a-z0-9]{1,80}$"),
    ("chart_preference:", r"^\P{Cc}*$"),
    ("chart_preference_value", r"^\P{Cc}*$"),
    ("setting_value", r"^\P{Cc}*$"),
];

const NUMERIC_RULES: &[(&str, &str)] = &[("number", r"^-?[0-9]+$")];

const BINARY_RULES: &[&str] = &["file", "xml_file"];

const ALIASES: &[(&str, &str)] = &[
    ("next", "cmd"),
    ("old_password", "password"),
    ("task_id", "id"),
    ("target_id", "id"),
    ("report_id", "id"),
    ("result_id", "id"),
    ("config_id", "id"),
    ("scanner_id", "id"),
    ("report_format_id", "id"),
    ("filt_id", "id"),
    ("setting_id", "id"),
    ("chart_preference_id", "id"),
    ("hosts", "text"),
    ("port_list_id", "id"),
    ("autorefresh", "number"),
    ("first", "number"),
    ("max", "number"),
    ("rows", "number"),
    ("duration", "number"),
    ("delta_report_id", "id"),
    ("charts", "boolean"),
    ("overrides", "boolean"),
    ("details", "boolean"),
    ("ignore_pagination", "boolean"),
    ("xml", "boolean"),
];

/// Builds the validator used for every request parameter.
pub fn default_validator() -> Result<Validator, ValidationError> {
    let mut validator = Validator::new();

    for (name, pattern) in RULES {
        validator.add_rule(name, Some(pattern))?;
    }
    for (name, pattern) in NUMERIC_RULES {
        validator.add_numeric_rule(name, pattern)?;
    }
    for name in BINARY_RULES {
        validator.add_rule(name, None)?;
    }
    // Aliases copy their target, so they go last.
    for (alias, target) in ALIASES {
        validator.add_alias(alias, target)?;
    }

    Ok(validator)
}
