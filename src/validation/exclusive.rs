//! "Exactly one of" / "at most one of" field groups

use super::error::ValidationError;
use super::path::resolve;
use serde_json::Value;

/// A named group of mutually exclusive fields.
///
/// The same group is applied identically wherever it is listed, which is how the
/// container rule stays the same on the create and update paths.
#[derive(Debug, Clone, Copy)]
pub struct ExclusiveGroup {
    /// Human name used in messages ("container", "address type")
    pub label: &'static str,
    /// Path of the object(s) holding the fields; empty for the payload root
    pub parent: &'static str,
    pub fields: &'static [&'static str],
    /// `true` for exactly one, `false` for at most one
    pub required: bool,
}

impl ExclusiveGroup {
    pub const fn exactly_one(label: &'static str, fields: &'static [&'static str]) -> Self {
        Self {
            label,
            parent: "",
            fields,
            required: true,
        }
    }

    pub const fn at_most_one(label: &'static str, fields: &'static [&'static str]) -> Self {
        Self {
            label,
            parent: "",
            fields,
            required: false,
        }
    }

    /// Apply the group to objects found at `parent` instead of the root
    pub const fn within(mut self, parent: &'static str) -> Self {
        self.parent = parent;
        self
    }

    /// Names of the group's members that are set (non-null) in `object`
    pub fn members_set(&self, object: &Value) -> Vec<String> {
        self.fields
            .iter()
            .filter(|field| object.get(**field).is_some_and(|v| !v.is_null()))
            .map(|field| field.to_string())
            .collect()
    }

    pub fn check(&self, payload: &Value) -> Result<(), ValidationError> {
        for located in resolve(payload, self.parent) {
            let Some(object) = located.value.filter(|v| v.is_object()) else {
                continue;
            };

            let set = self.members_set(object);
            let ok = if self.required {
                set.len() == 1
            } else {
                set.len() <= 1
            };

            if !ok {
                return Err(ValidationError::Exclusive {
                    label: self.label.to_string(),
                    path: located.path,
                    fields: self.fields.iter().map(|f| f.to_string()).collect(),
                    set,
                    required: self.required,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CONTAINER: ExclusiveGroup =
        ExclusiveGroup::exactly_one("container", &["folder", "snippet", "device"]);

    #[test]
    fn test_exactly_one_set_passes() {
        assert!(CONTAINER.check(&json!({"name": "a", "folder": "Texas"})).is_ok());
        assert!(CONTAINER.check(&json!({"device": "fw-01", "folder": null})).is_ok());
    }

    #[test]
    fn test_none_set_fails() {
        let err = CONTAINER.check(&json!({"name": "a"})).unwrap_err();
        match err {
            ValidationError::Exclusive { label, set, required, .. } => {
                assert_eq!(label, "container");
                assert!(set.is_empty());
                assert!(required);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_two_set_fails_and_names_them() {
        let err = CONTAINER
            .check(&json!({"folder": "A", "device": "B"}))
            .unwrap_err();
        match err {
            ValidationError::Exclusive { set, fields, .. } => {
                assert_eq!(set, vec!["folder".to_string(), "device".to_string()]);
                assert_eq!(fields.len(), 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_at_most_one_allows_none() {
        let group = ExclusiveGroup::at_most_one("container", &["folder", "snippet", "device"]);
        assert!(group.check(&json!({})).is_ok());
        assert!(group.check(&json!({"folder": "a", "snippet": "b"})).is_err());
    }

    #[test]
    fn test_nested_group_reports_element_path() {
        let group = ExclusiveGroup::exactly_one("match", &["tcp", "udp"]).within("entries[]");
        let payload = json!({"entries": [{"tcp": {}}, {"tcp": {}, "udp": {}}]});
        let err = group.check(&payload).unwrap_err();
        assert_eq!(err.path(), Some("entries[1]"));
    }
}
