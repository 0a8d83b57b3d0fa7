//! Field path resolution
//!
//! Paths are dot-separated field names. A segment ending in `[]` fans out over
//! every element of an array, so `rules[].action` visits `rules[0].action`,
//! `rules[1].action`, and so on. The empty path is the payload root.

use serde_json::Value;

/// A concrete location reached while resolving a path
#[derive(Debug)]
pub(crate) struct Located<'a> {
    pub path: String,
    /// `None` when the parent exists but the field is absent or null
    pub value: Option<&'a Value>,
}

pub(crate) fn resolve<'a>(root: &'a Value, path: &str) -> Vec<Located<'a>> {
    let mut frontier = vec![Located {
        path: String::new(),
        value: Some(root),
    }];

    if path.is_empty() {
        return frontier;
    }

    for segment in path.split('.') {
        let (name, fan_out) = match segment.strip_suffix("[]") {
            Some(name) => (name, true),
            None => (segment, false),
        };

        let mut next = Vec::new();
        for located in frontier {
            // Absent parents have nothing below them to validate
            let Some(parent) = located.value else {
                continue;
            };
            let child = parent.get(name).filter(|v| !v.is_null());
            let child_path = join(&located.path, name);

            if fan_out {
                if let Some(Value::Array(items)) = child {
                    for (index, item) in items.iter().enumerate() {
                        next.push(Located {
                            path: format!("{}[{}]", child_path, index),
                            value: Some(item),
                        });
                    }
                }
            } else {
                next.push(Located {
                    path: child_path,
                    value: child,
                });
            }
        }
        frontier = next;
    }

    frontier
}

pub(crate) fn join(parent: &str, field: &str) -> String {
    if parent.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", parent, field)
    }
}
