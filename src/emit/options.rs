//! Field formatting and sanitisation for bulk-load files.

use serde::{Deserialize, Serialize};

use crate::model::AttrValue;
use crate::types::{BuildError, Result};

/// Formatting options shared by every stream of a build.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    /// Field separator; a single ASCII punctuation or whitespace character
    /// that cannot occur in a number, a quote or a newline.
    pub separator: char,
    /// Replaces separator occurrences inside values.
    pub substitute: char,
    /// Written for absent or empty values.
    pub missing_value: String,
    /// Joins list elements inside one field.
    pub list_separator: char,
    /// Prefix marking attribute (free-text) columns in headers.
    pub attribute_prefix: String,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            separator: '\t',
            substitute: ' ',
            missing_value: "-".to_owned(),
            list_separator: ';',
            attribute_prefix: "attr_".to_owned(),
        }
    }
}

impl CsvOptions {
    /// Comma-separated variant; commas inside values become semicolons.
    pub fn comma() -> Self {
        Self {
            separator: ',',
            substitute: ';',
            ..Self::default()
        }
    }

    /// Rejects option combinations that would make lines ambiguous.
    pub fn validate(&self) -> Result<()> {
        if !self.separator.is_ascii() || matches!(self.separator, '"' | '\n' | '\r') {
            return Err(BuildError::resource(format!(
                "separator {:?} must be a single ASCII character other than a quote or newline",
                self.separator
            )));
        }
        if self.separator.is_ascii_alphanumeric() || matches!(self.separator, '.' | '-' | '+') {
            return Err(BuildError::resource(format!(
                "separator {:?} can occur inside identities or numeric values",
                self.separator
            )));
        }
        if self.substitute == self.separator {
            return Err(BuildError::resource(
                "substitute character must differ from the separator",
            ));
        }
        if self.list_separator == self.separator {
            return Err(BuildError::resource(
                "list separator must differ from the field separator",
            ));
        }
        if self.missing_value.contains(self.separator) {
            return Err(BuildError::resource(
                "missing-value placeholder must not contain the separator",
            ));
        }
        Ok(())
    }

    /// Separator as the byte handed to the CSV writer.
    pub fn separator_byte(&self) -> u8 {
        self.separator as u8
    }

    /// Replaces separators, strips quotes and flattens newlines. Empty input
    /// becomes the missing-value placeholder.
    pub fn sanitize(&self, raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        for c in raw.chars() {
            match c {
                '"' => {}
                '\n' | '\r' => out.push(' '),
                c if c == self.separator => out.push(self.substitute),
                c => out.push(c),
            }
        }
        if out.trim().is_empty() {
            self.missing_value.clone()
        } else {
            out
        }
    }

    /// Renders one attribute field.
    pub fn format_value(&self, value: Option<&AttrValue>) -> String {
        match value {
            None => self.missing_value.clone(),
            Some(value) if value.is_empty() => self.missing_value.clone(),
            Some(AttrValue::Str(s)) | Some(AttrValue::Other(s)) => self.sanitize(s),
            Some(AttrValue::Int(v)) => v.to_string(),
            Some(AttrValue::Float(v)) => v.to_string(),
            Some(AttrValue::Bool(v)) => v.to_string(),
            Some(AttrValue::List(items)) => {
                let sep = self.list_separator.to_string();
                items
                    .iter()
                    .filter(|item| !item.is_empty())
                    .map(|item| self.sanitize(&item.replace(self.list_separator, " ")))
                    .collect::<Vec<_>>()
                    .join(&sep)
            }
        }
    }

    /// Prefixed header name for an attribute column.
    pub fn attribute_header(&self, column: &str) -> String {
        format!("{}{}", self.attribute_prefix, column)
    }

    /// Strips the attribute prefix from a header, if present.
    pub fn strip_attribute_prefix<'a>(&self, header: &'a str) -> Option<&'a str> {
        header.strip_prefix(self.attribute_prefix.as_str())
    }

    /// Parses a field written with these options back into a value.
    pub fn parse_field(&self, raw: &str) -> Option<AttrValue> {
        if raw.is_empty() || raw == self.missing_value {
            return None;
        }
        if let Ok(v) = raw.parse::<i64>() {
            return Some(AttrValue::Int(v));
        }
        if raw.contains(self.list_separator) {
            return Some(AttrValue::List(
                raw.split(self.list_separator).map(str::to_owned).collect(),
            ));
        }
        if let Ok(v) = raw.parse::<f64>() {
            if v.is_finite() {
                return Some(AttrValue::Float(v));
            }
        }
        match raw {
            "true" => Some(AttrValue::Bool(true)),
            "false" => Some(AttrValue::Bool(false)),
            _ => Some(AttrValue::Str(raw.to_owned())),
        }
    }
}
