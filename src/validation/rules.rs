//! Per-schema rule sets

use super::error::{json_type, ValidationError};
use super::exclusive::ExclusiveGroup;
use super::tagged::{CrossoverTable, TaggedUnion};
use serde_json::{Map, Value};

/// What to do with top-level fields a schema does not declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtraFieldsPolicy {
    /// Reject the payload
    Strict,
    /// Drop the fields silently
    #[default]
    IgnoreExtra,
    /// Pass them through untouched
    PreserveExtra,
}

/// Static validation rules for one schema (e.g. "address create").
#[derive(Debug, Clone, Copy)]
pub struct SchemaRules {
    pub name: &'static str,
    /// Declared top-level fields; consulted by the extra-field policy
    pub fields: &'static [&'static str],
    pub required: &'static [&'static str],
    pub extra: ExtraFieldsPolicy,
    pub exclusive: &'static [ExclusiveGroup],
    pub unions: &'static [TaggedUnion],
    pub crossovers: &'static [CrossoverTable],
}

impl SchemaRules {
    /// Rules that accept any object untouched
    pub const fn permissive(name: &'static str) -> Self {
        Self {
            name,
            fields: &[],
            required: &[],
            extra: ExtraFieldsPolicy::PreserveExtra,
            exclusive: &[],
            unions: &[],
            crossovers: &[],
        }
    }

    /// Validate `payload` and return it with the extra-field policy applied.
    pub fn apply(&self, payload: Value) -> Result<Value, ValidationError> {
        let Value::Object(mut map) = payload else {
            return Err(ValidationError::NotAnObject {
                schema: self.name.to_string(),
                actual: json_type(&payload),
            });
        };

        self.apply_extra(&mut map)?;

        let payload = Value::Object(map);
        self.check(&payload)?;
        Ok(payload)
    }

    /// Run every constraint without touching the payload
    pub fn check(&self, payload: &Value) -> Result<(), ValidationError> {
        for field in self.required {
            if payload.get(*field).map_or(true, Value::is_null) {
                return Err(ValidationError::MissingField {
                    path: field.to_string(),
                });
            }
        }

        for group in self.exclusive {
            group.check(payload)?;
        }

        for union in self.unions {
            union.check(payload)?;
        }

        for table in self.crossovers {
            table.check(payload)?;
        }

        Ok(())
    }

    fn apply_extra(&self, map: &mut Map<String, Value>) -> Result<(), ValidationError> {
        match self.extra {
            ExtraFieldsPolicy::PreserveExtra => Ok(()),
            ExtraFieldsPolicy::IgnoreExtra => {
                map.retain(|key, _| self.fields.contains(&key.as_str()));
                Ok(())
            }
            ExtraFieldsPolicy::Strict => {
                match map.keys().find(|key| !self.fields.contains(&key.as_str())) {
                    Some(field) => Err(ValidationError::UnknownField {
                        schema: self.name.to_string(),
                        field: field.clone(),
                    }),
                    None => Ok(()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const RULES: SchemaRules = SchemaRules {
        name: "widget update",
        fields: &["id", "name", "folder", "snippet", "device"],
        required: &["id"],
        extra: ExtraFieldsPolicy::Strict,
        exclusive: &[ExclusiveGroup::exactly_one(
            "container",
            &["folder", "snippet", "device"],
        )],
        unions: &[],
        crossovers: &[],
    };

    #[test]
    fn test_strict_rejects_unknown_field() {
        let err = RULES
            .apply(json!({"id": "x", "folder": "a", "colour": "red"}))
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownField {
                schema: "widget update".into(),
                field: "colour".into()
            }
        );
    }

    #[test]
    fn test_ignore_extra_strips_unknown_fields() {
        let rules = SchemaRules {
            extra: ExtraFieldsPolicy::IgnoreExtra,
            ..RULES
        };
        let out = rules
            .apply(json!({"id": "x", "folder": "a", "colour": "red"}))
            .unwrap();
        assert_eq!(out, json!({"id": "x", "folder": "a"}));
    }

    #[test]
    fn test_preserve_extra_keeps_fields() {
        let rules = SchemaRules {
            extra: ExtraFieldsPolicy::PreserveExtra,
            ..RULES
        };
        let out = rules
            .apply(json!({"id": "x", "folder": "a", "colour": "red"}))
            .unwrap();
        assert_eq!(out["colour"], "red");
    }

    #[test]
    fn test_required_field_missing() {
        let err = RULES.apply(json!({"folder": "a"})).unwrap_err();
        assert_eq!(err, ValidationError::MissingField { path: "id".into() });
    }

    #[test]
    fn test_container_rule_applies() {
        let err = RULES
            .apply(json!({"id": "x", "folder": "a", "device": "b"}))
            .unwrap_err();
        assert!(matches!(err, ValidationError::Exclusive { .. }));
    }

    #[test]
    fn test_non_object_rejected() {
        let err = RULES.apply(json!([1, 2])).unwrap_err();
        assert!(matches!(err, ValidationError::NotAnObject { ref actual, .. } if actual == "array"));
    }

    #[test]
    fn test_permissive_accepts_anything_shaped_like_an_object() {
        let rules = SchemaRules::permissive("raw");
        let payload = json!({"anything": [1, 2, 3]});
        assert_eq!(rules.apply(payload.clone()).unwrap(), payload);
    }
}
