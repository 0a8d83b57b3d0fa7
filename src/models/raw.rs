//! Untyped access to any registered resource
//!
//! Payloads stay `serde_json::Value`. These rules only enforce the container
//! (and the id on update); keys with a typed schema get that schema's rules
//! through [`rules_for`](super::rules_for) when opened with
//! [`ResourceService::for_key`](crate::resource::ResourceService::for_key).

use super::common::{CONTAINER_GROUP, RESPONSE_CONTAINER_GROUP};
use crate::resource::ResourceKind;
use crate::validation::{ExtraFieldsPolicy, SchemaRules};
use serde_json::Value;

pub struct RawResource;

impl ResourceKind for RawResource {
    type Create = Value;
    type Update = Value;
    type Response = Value;

    const CREATE_RULES: SchemaRules = SchemaRules {
        name: "object create",
        fields: &[],
        required: &["name"],
        extra: ExtraFieldsPolicy::PreserveExtra,
        exclusive: &[CONTAINER_GROUP],
        unions: &[],
        crossovers: &[],
    };

    const UPDATE_RULES: SchemaRules = SchemaRules {
        name: "object update",
        fields: &[],
        required: &["id"],
        extra: ExtraFieldsPolicy::PreserveExtra,
        exclusive: &[CONTAINER_GROUP],
        unions: &[],
        crossovers: &[],
    };

    const RESPONSE_RULES: SchemaRules = SchemaRules {
        exclusive: &[RESPONSE_CONTAINER_GROUP],
        ..SchemaRules::permissive("object")
    };
}
