//! Custom fields a category defines for its assets.

use serde::{Deserialize, Serialize};

use crate::domain::GridError;
use crate::value::Value;

/// Field type together with the constraints that only make sense for that type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    Text {
        #[serde(default)]
        placeholder: Option<String>,
    },
    Number {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
        #[serde(default)]
        placeholder: Option<String>,
    },
    Select {
        #[serde(default)]
        options: Vec<String>,
    },
    Checkbox,
    Textarea {
        #[serde(default)]
        placeholder: Option<String>,
    },
    Date,
}

impl FieldKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Text { .. } => "text",
            FieldKind::Number { .. } => "number",
            FieldKind::Select { .. } => "select",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Textarea { .. } => "textarea",
            FieldKind::Date => "date",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicField {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl DynamicField {
    /// Parses the json list stored in a category's `dynamic_fields` column.
    pub fn parse_list(json: &str) -> Result<Vec<DynamicField>, GridError> {
        if json.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(json)?)
    }

    /// Checks the definition itself.
    pub fn check(&self) -> Result<(), GridError> {
        if self.name.trim().is_empty() {
            return Err(GridError::InvalidField("field without a name".into()));
        }
        match &self.kind {
            FieldKind::Select { options } if options.is_empty() => Err(GridError::InvalidField(
                format!("{}: select needs at least one option", self.name),
            )),
            FieldKind::Number {
                min: Some(min),
                max: Some(max),
                ..
            } if min > max => Err(GridError::InvalidField(format!(
                "{}: min {min} is larger than max {max}",
                self.name
            ))),
            _ => Ok(()),
        }
    }

    /// Checks a value entered for this field.
    pub fn validate(&self, value: &Value) -> Result<(), GridError> {
        let blank = match value {
            Value::Null => true,
            Value::Text(s) => s.trim().is_empty(),
            _ => false,
        };
        if blank {
            return if self.required {
                Err(self.invalid("is required"))
            } else {
                Ok(())
            };
        }

        match (&self.kind, value) {
            (FieldKind::Text { .. } | FieldKind::Textarea { .. }, Value::Text(_)) => Ok(()),
            (FieldKind::Number { min, max, .. }, Value::Number(n)) => {
                if min.is_some_and(|m| *n < m) {
                    Err(self.invalid(&format!("must be at least {}", min.unwrap_or_default())))
                } else if max.is_some_and(|m| *n > m) {
                    Err(self.invalid(&format!("must be at most {}", max.unwrap_or_default())))
                } else {
                    Ok(())
                }
            }
            (FieldKind::Select { options }, Value::Text(s)) => {
                if options.iter().any(|o| o == s) {
                    Ok(())
                } else {
                    Err(self.invalid(&format!("{s} is not one of {}", options.join(", "))))
                }
            }
            (FieldKind::Checkbox, Value::Bool(_)) => Ok(()),
            (FieldKind::Date, Value::Text(s)) if is_iso_date(s) => Ok(()),
            (kind, _) => Err(self.invalid(&format!("expects a {} value", kind.type_name()))),
        }
    }

    fn invalid(&self, msg: &str) -> GridError {
        GridError::InvalidField(format!("{} {msg}", self.label))
    }
}

/// One-line summary of a field list, e.g. `3 fields: text, number, select`.
pub fn summarize(fields: &[DynamicField]) -> String {
    match fields.len() {
        0 => "No fields".to_string(),
        n => {
            let kinds = fields
                .iter()
                .map(|f| f.kind.type_name())
                .collect::<Vec<_>>()
                .join(", ");
            let invalid = fields.iter().filter(|f| f.check().is_err()).count();
            let noun = if n == 1 { "field" } else { "fields" };
            if invalid > 0 {
                format!("{n} {noun}: {kinds} ({invalid} invalid)")
            } else {
                format!("{n} {noun}: {kinds}")
            }
        }
    }
}

// YYYY-MM-DD, as produced by date inputs
fn is_iso_date(s: &str) -> bool {
    let parts: Vec<&str> = s.split('-').collect();
    let [year, month, day] = parts.as_slice() else {
        return false;
    };
    let digits = |p: &str, len: usize| p.len() == len && p.chars().all(|c| c.is_ascii_digit());
    if !(digits(year, 4) && digits(month, 2) && digits(day, 2)) {
        return false;
    }
    let month: u32 = month.parse().unwrap_or(0);
    let day: u32 = day.parse().unwrap_or(0);
    (1..=12).contains(&month) && (1..=31).contains(&day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const FIELDS: &str = r#"[
        {"name": "bedrooms", "label": "Bedrooms", "type": "number", "required": true, "min": 0, "max": 20},
        {"name": "zoning", "label": "Zoning", "type": "select", "required": false, "options": ["R1", "R2"]},
        {"name": "pool", "label": "Pool", "type": "checkbox", "required": false},
        {"name": "built", "label": "Built", "type": "date", "required": false},
        {"name": "notes", "label": "Notes", "type": "textarea", "placeholder": "Anything else"}
    ]"#;

    fn fields() -> Vec<DynamicField> {
        DynamicField::parse_list(FIELDS).expect("valid json")
    }

    #[test]
    fn parses_tagged_kinds() {
        let fields = fields();
        assert_eq!(fields.len(), 5);
        assert_eq!(
            fields[0].kind,
            FieldKind::Number {
                min: Some(0.0),
                max: Some(20.0),
                placeholder: None
            }
        );
        assert!(matches!(&fields[1].kind, FieldKind::Select { options } if options.len() == 2));
        assert_eq!(fields[2].kind, FieldKind::Checkbox);
        assert!(!fields[4].required);
    }

    #[test]
    fn empty_cell_means_no_fields() {
        assert!(DynamicField::parse_list("  ").expect("empty").is_empty());
        assert!(DynamicField::parse_list("not json").is_err());
    }

    #[rstest]
    #[case(0, Value::from(3), true)]
    #[case(0, Value::from(21), false)]
    #[case(0, Value::Null, false)]
    #[case(0, Value::from("three"), false)]
    #[case(1, Value::from("R2"), true)]
    #[case(1, Value::from("R9"), false)]
    #[case(1, Value::Null, true)]
    #[case(2, Value::from(true), true)]
    #[case(2, Value::from("yes"), false)]
    #[case(3, Value::from("2024-02-29"), true)]
    #[case(3, Value::from("29/02/2024"), false)]
    #[case(4, Value::from("free text"), true)]
    fn validates_values(#[case] field: usize, #[case] value: Value, #[case] ok: bool) {
        assert_eq!(fields()[field].validate(&value).is_ok(), ok);
    }

    #[test]
    fn definition_checks() {
        let mut broken = fields();
        broken[1].kind = FieldKind::Select { options: vec![] };
        broken[0].kind = FieldKind::Number {
            min: Some(5.0),
            max: Some(1.0),
            placeholder: None,
        };
        assert!(broken[0].check().is_err());
        assert!(broken[1].check().is_err());
        assert!(broken[2].check().is_ok());
        assert_eq!(
            summarize(&broken),
            "5 fields: number, select, checkbox, date, textarea (2 invalid)"
        );
        assert_eq!(summarize(&[]), "No fields");
    }
}
