//! Discriminated fields expressed as single-key maps
//!
//! `{"alert": {}}` selects the `alert` variant. A crossover table adds a second
//! level: the outer key picks a protocol pair and the map under it must carry
//! exactly one inner key drawn from the subset legal for that pair.

use super::error::{json_type, ValidationError};
use super::path::{join, resolve};
use serde_json::Value;

/// One discriminated field and its recognized tags
#[derive(Debug, Clone, Copy)]
pub struct TaggedUnion {
    /// Human name used in messages ("action")
    pub label: &'static str,
    pub path: &'static str,
    pub tags: &'static [&'static str],
    pub required: bool,
}

impl TaggedUnion {
    pub const fn new(
        label: &'static str,
        path: &'static str,
        tags: &'static [&'static str],
    ) -> Self {
        Self {
            label,
            path,
            tags,
            required: false,
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn check(&self, payload: &Value) -> Result<(), ValidationError> {
        for located in resolve(payload, self.path) {
            match located.value {
                Some(value) => {
                    select_tag(self.label, &located.path, value, self.tags)?;
                }
                None if self.required => {
                    return Err(ValidationError::MissingField { path: located.path });
                }
                None => {}
            }
        }
        Ok(())
    }
}

/// Static compatibility table for two-level discrimination.
///
/// Each entry is an outer tag with the inner tags legal beneath it. Pairs not
/// listed are rejected; there is no fallback.
#[derive(Debug, Clone, Copy)]
pub struct CrossoverTable {
    pub path: &'static str,
    pub outer_label: &'static str,
    pub inner_label: &'static str,
    pub pairs: &'static [(&'static str, &'static [&'static str])],
    pub required: bool,
}

impl CrossoverTable {
    pub fn outer_tags(&self) -> Vec<&'static str> {
        self.pairs.iter().map(|(outer, _)| *outer).collect()
    }

    /// Inner tags legal for `outer`, if `outer` is known
    pub fn inner_tags(&self, outer: &str) -> Option<&'static [&'static str]> {
        self.pairs
            .iter()
            .find(|(tag, _)| *tag == outer)
            .map(|(_, inner)| *inner)
    }

    pub fn is_legal(&self, outer: &str, inner: &str) -> bool {
        self.inner_tags(outer)
            .is_some_and(|allowed| allowed.contains(&inner))
    }

    pub fn check(&self, payload: &Value) -> Result<(), ValidationError> {
        let outer_tags = self.outer_tags();

        for located in resolve(payload, self.path) {
            let Some(value) = located.value else {
                if self.required {
                    return Err(ValidationError::MissingField { path: located.path });
                }
                continue;
            };

            let (outer, body) = select_tag(self.outer_label, &located.path, value, &outer_tags)?;
            let allowed = self.inner_tags(outer).unwrap_or_default();
            let inner_path = join(&located.path, outer);

            let Some(map) = body.as_object() else {
                return Err(ValidationError::NotATaggedMap {
                    label: self.inner_label.to_string(),
                    path: inner_path,
                    actual: json_type(body),
                });
            };

            if map.len() != 1 {
                return Err(ValidationError::Exclusive {
                    label: self.inner_label.to_string(),
                    path: inner_path,
                    fields: to_strings(allowed),
                    set: map.keys().cloned().collect(),
                    required: true,
                });
            }

            if let Some(inner) = map.keys().next() {
                if !allowed.contains(&inner.as_str()) {
                    return Err(ValidationError::IllegalCombination {
                        outer_label: self.outer_label.to_string(),
                        inner_label: self.inner_label.to_string(),
                        path: inner_path,
                        outer: outer.to_string(),
                        inner: inner.clone(),
                        allowed: to_strings(allowed),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Require `value` to be a map with exactly one key drawn from `allowed`;
/// returns the key and the value under it.
pub fn select_tag<'a>(
    label: &str,
    path: &str,
    value: &'a Value,
    allowed: &[&str],
) -> Result<(&'a str, &'a Value), ValidationError> {
    let Some(map) = value.as_object() else {
        return Err(ValidationError::NotATaggedMap {
            label: label.to_string(),
            path: path.to_string(),
            actual: json_type(value),
        });
    };

    let mut entries = map.iter();
    match (entries.next(), entries.next()) {
        (Some((tag, body)), None) => {
            if allowed.contains(&tag.as_str()) {
                Ok((tag.as_str(), body))
            } else {
                Err(ValidationError::UnknownTag {
                    label: label.to_string(),
                    path: path.to_string(),
                    tag: tag.clone(),
                    allowed: to_strings(allowed),
                })
            }
        }
        _ => Err(ValidationError::Exclusive {
            label: label.to_string(),
            path: path.to_string(),
            fields: to_strings(allowed),
            set: map.keys().cloned().collect(),
            required: true,
        }),
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
