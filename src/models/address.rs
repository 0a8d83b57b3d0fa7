//! Address objects

use super::common::{ContainerFields, ScopedObject, CONTAINER_GROUP, RESPONSE_CONTAINER_GROUP};
use crate::resource::{RegisteredKind, ResourceKind};
use crate::validation::{ExclusiveGroup, ExtraFieldsPolicy, SchemaRules};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ADDRESS_TYPE_GROUP: ExclusiveGroup = ExclusiveGroup::exactly_one(
    "address type",
    &["ip_netmask", "ip_range", "ip_wildcard", "fqdn"],
);

const CREATE_FIELDS: &[&str] = &[
    "name",
    "description",
    "tag",
    "ip_netmask",
    "ip_range",
    "ip_wildcard",
    "fqdn",
    "folder",
    "snippet",
    "device",
];

const UPDATE_FIELDS: &[&str] = &[
    "id",
    "name",
    "description",
    "tag",
    "ip_netmask",
    "ip_range",
    "ip_wildcard",
    "fqdn",
    "folder",
    "snippet",
    "device",
];

/// Fields common to create, update and response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressFields {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_netmask: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_wildcard: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
}

impl AddressFields {
    pub fn ip_netmask(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ip_netmask: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn fqdn(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fqdn: Some(value.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressCreate {
    #[serde(flatten)]
    pub fields: AddressFields,
    #[serde(flatten)]
    pub container: ContainerFields,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressUpdate {
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: AddressFields,
    #[serde(flatten)]
    pub container: ContainerFields,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: AddressFields,
    #[serde(flatten)]
    pub container: ContainerFields,
}

impl Address {
    /// Turn a fetched object into an update payload
    pub fn into_update(self) -> AddressUpdate {
        AddressUpdate {
            id: self.id,
            fields: self.fields,
            container: self.container,
        }
    }
}

impl ScopedObject for Address {
    fn container_fields(&self) -> ContainerFields {
        self.container.clone()
    }

    fn name(&self) -> Option<&str> {
        Some(&self.fields.name)
    }
}

/// Address resource binding
pub struct Addresses;

impl RegisteredKind for Addresses {
    const KEY: &'static str = "addresses";
}

impl ResourceKind for Addresses {
    type Create = AddressCreate;
    type Update = AddressUpdate;
    type Response = Address;

    const CREATE_RULES: SchemaRules = SchemaRules {
        name: "address create",
        fields: CREATE_FIELDS,
        required: &["name"],
        extra: ExtraFieldsPolicy::Strict,
        exclusive: &[CONTAINER_GROUP, ADDRESS_TYPE_GROUP],
        unions: &[],
        crossovers: &[],
    };

    const UPDATE_RULES: SchemaRules = SchemaRules {
        name: "address update",
        fields: UPDATE_FIELDS,
        required: &["id", "name"],
        extra: ExtraFieldsPolicy::Strict,
        exclusive: &[CONTAINER_GROUP, ADDRESS_TYPE_GROUP],
        unions: &[],
        crossovers: &[],
    };

    const RESPONSE_RULES: SchemaRules = SchemaRules {
        name: "address",
        fields: UPDATE_FIELDS,
        required: &["id", "name"],
        extra: ExtraFieldsPolicy::IgnoreExtra,
        exclusive: &[RESPONSE_CONTAINER_GROUP, ADDRESS_TYPE_GROUP],
        unions: &[],
        crossovers: &[],
    };
}
