//! Field binding: merges submitted form data into record content.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use solo_storage::RecordContent;

/// Submitted field name → value mapping.
pub type FieldData = BTreeMap<String, serde_json::Value>;

/// Name of the always-bindable title field.
pub const TITLE_FIELD: &str = "Title";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Html,
    Boolean,
    Integer,
}

/// Declared editable field of a record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub max_length: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// All problems found in one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn for_field(&self, field: &str) -> Option<&FieldError> {
        self.0.iter().find(|e| e.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// Writes submitted data into record content.
///
/// Implementations must leave `content` untouched when they return an error.
pub trait FieldBinder: Send + Sync {
    fn save_into(&self, content: &mut RecordContent, data: &FieldData)
        -> Result<(), ValidationErrors>;
}

/// Binder driven by the declared [`FieldSpec`]s of a section.
#[derive(Debug, Clone, Default)]
pub struct SchemaBinder {
    fields: Vec<FieldSpec>,
}

impl SchemaBinder {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    fn spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

fn check_value(spec: &FieldSpec, value: &serde_json::Value, errors: &mut ValidationErrors) {
    if value.is_null() {
        return;
    }
    match spec.kind {
        FieldKind::Text | FieldKind::Html => match value.as_str() {
            Some(s) => {
                if let Some(max) = spec.max_length {
                    if s.chars().count() > max {
                        errors.push(&spec.name, format!("must be at most {max} characters"));
                    }
                }
                if spec.kind == FieldKind::Text && s.contains('\n') {
                    errors.push(&spec.name, "must be a single line");
                }
            }
            None => errors.push(&spec.name, "must be a string"),
        },
        FieldKind::Boolean => {
            if !value.is_boolean() {
                errors.push(&spec.name, "must be true or false");
            }
        }
        FieldKind::Integer => {
            if value.as_i64().is_none() {
                errors.push(&spec.name, "must be an integer");
            }
        }
    }
}

fn is_blank(value: Option<&serde_json::Value>) -> bool {
    match value {
        None | Some(serde_json::Value::Null) => true,
        Some(serde_json::Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

impl FieldBinder for SchemaBinder {
    fn save_into(
        &self,
        content: &mut RecordContent,
        data: &FieldData,
    ) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let mut next = content.clone();

        for (name, value) in data {
            if name == TITLE_FIELD {
                match value.as_str() {
                    Some(title) if !title.trim().is_empty() => next.title = title.to_string(),
                    _ => errors.push(TITLE_FIELD, "is required"),
                }
                continue;
            }
            match self.spec(name) {
                Some(spec) => {
                    check_value(spec, value, &mut errors);
                    next.fields.insert(name.clone(), value.clone());
                }
                None => errors.push(name, "is not an editable field"),
            }
        }

        for spec in self.fields.iter().filter(|f| f.required) {
            if errors.for_field(&spec.name).is_none() && is_blank(next.fields.get(&spec.name)) {
                errors.push(&spec.name, "is required");
            }
        }

        if errors.is_empty() {
            *content = next;
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn binder() -> SchemaBinder {
        SchemaBinder::new(vec![
            FieldSpec {
                name: "Content".into(),
                kind: FieldKind::Html,
                required: false,
                max_length: None,
            },
            FieldSpec {
                name: "Tagline".into(),
                kind: FieldKind::Text,
                required: true,
                max_length: Some(10),
            },
            FieldSpec {
                name: "ShowBanner".into(),
                kind: FieldKind::Boolean,
                required: false,
                max_length: None,
            },
        ])
    }

    fn data(pairs: &[(&str, serde_json::Value)]) -> FieldData {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn binds_title_and_declared_fields() {
        let mut content = RecordContent::titled("HomePage");
        binder()
            .save_into(
                &mut content,
                &data(&[
                    ("Title", json!("Welcome")),
                    ("Tagline", json!("Hi there")),
                    ("Content", json!("<p>Body</p>")),
                ]),
            )
            .unwrap();
        assert_eq!(content.title, "Welcome");
        assert_eq!(content.fields["Content"], json!("<p>Body</p>"));
    }

    #[test]
    fn rejects_and_leaves_content_untouched() {
        let mut content = RecordContent::titled("HomePage");
        content.fields.insert("Tagline".into(), json!("Hello"));
        let before = content.clone();

        let errors = binder()
            .save_into(
                &mut content,
                &data(&[
                    ("Tagline", json!("far too long for this")),
                    ("ShowBanner", json!("yes")),
                    ("Secret", json!(1)),
                ]),
            )
            .unwrap_err();

        assert_eq!(content, before);
        assert!(errors.for_field("Tagline").is_some());
        assert!(errors.for_field("ShowBanner").is_some());
        assert_eq!(
            errors.for_field("Secret").map(|e| e.message.as_str()),
            Some("is not an editable field")
        );
    }

    #[test]
    fn required_field_satisfied_by_existing_content() {
        let mut content = RecordContent::titled("HomePage");
        content.fields.insert("Tagline".into(), json!("Hello"));
        binder()
            .save_into(&mut content, &data(&[("ShowBanner", json!(true))]))
            .unwrap();
        assert_eq!(content.fields["ShowBanner"], json!(true));
    }

    #[test]
    fn blank_title_and_missing_required_field_fail() {
        let mut content = RecordContent::titled("HomePage");
        let errors = binder()
            .save_into(&mut content, &data(&[("Title", json!("  "))]))
            .unwrap_err();
        assert!(errors.for_field("Title").is_some());
        assert!(errors.for_field("Tagline").is_some());
        assert_eq!(errors.to_string(), "Title: is required; Tagline: is required");
    }
}
