//! Route redistribution profiles
//!
//! `protocol` is two-level: the outer key picks the source/target protocol pair
//! and the map under it names what gets redistributed, e.g.
//! `{"bgp_to_ospf": {"redistribute_bgp": {"metric": 20}}}`. Only the pairs in
//! [`PROTOCOL_TABLE`] are legal.

use super::common::{ContainerFields, ScopedObject, CONTAINER_GROUP, RESPONSE_CONTAINER_GROUP};
use crate::resource::{RegisteredKind, ResourceKind};
use crate::validation::{CrossoverTable, ExtraFieldsPolicy, SchemaRules};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const PROTOCOL_TABLE: CrossoverTable = CrossoverTable {
    path: "protocol",
    outer_label: "protocol pair",
    inner_label: "redistribution",
    pairs: &[
        ("bgp_to_ospf", &["redistribute_bgp", "redistribute_default_route"]),
        ("ospf_to_bgp", &["redistribute_ospf", "redistribute_default_route"]),
        ("connected_static_to_bgp", &["redistribute_connected", "redistribute_static"]),
        (
            "connected_static_to_ospf",
            &["redistribute_connected", "redistribute_static", "redistribute_default_route"],
        ),
        ("connected_static_to_rib", &["redistribute_connected", "redistribute_static"]),
    ],
    required: true,
};

const CREATE_FIELDS: &[&str] = &["name", "description", "protocol", "folder", "snippet", "device"];

const UPDATE_FIELDS: &[&str] = &[
    "id",
    "name",
    "description",
    "protocol",
    "folder",
    "snippet",
    "device",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedistributeRule {
    #[serde(default)]
    pub enable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_map: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BgpToOspf {
    RedistributeBgp(RedistributeRule),
    RedistributeDefaultRoute(RedistributeRule),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OspfToBgp {
    RedistributeOspf(RedistributeRule),
    RedistributeDefaultRoute(RedistributeRule),
}

/// Connected/static sources into BGP or the RIB
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectedStatic {
    RedistributeConnected(RedistributeRule),
    RedistributeStatic(RedistributeRule),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectedStaticToOspf {
    RedistributeConnected(RedistributeRule),
    RedistributeStatic(RedistributeRule),
    RedistributeDefaultRoute(RedistributeRule),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedistributionProtocol {
    BgpToOspf(BgpToOspf),
    OspfToBgp(OspfToBgp),
    ConnectedStaticToBgp(ConnectedStatic),
    ConnectedStaticToOspf(ConnectedStaticToOspf),
    ConnectedStaticToRib(ConnectedStatic),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedistributionFields {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub protocol: RedistributionProtocol,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedistributionProfileCreate {
    #[serde(flatten)]
    pub fields: RedistributionFields,
    #[serde(flatten)]
    pub container: ContainerFields,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedistributionProfileUpdate {
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: RedistributionFields,
    #[serde(flatten)]
    pub container: ContainerFields,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedistributionProfile {
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: RedistributionFields,
    #[serde(flatten)]
    pub container: ContainerFields,
}

impl ScopedObject for RedistributionProfile {
    fn container_fields(&self) -> ContainerFields {
        self.container.clone()
    }

    fn name(&self) -> Option<&str> {
        Some(&self.fields.name)
    }
}

pub struct RedistributionProfiles;

impl RegisteredKind for RedistributionProfiles {
    const KEY: &'static str = "route-redistribution-profiles";
}

impl ResourceKind for RedistributionProfiles {
    type Create = RedistributionProfileCreate;
    type Update = RedistributionProfileUpdate;
    type Response = RedistributionProfile;

    const CREATE_RULES: SchemaRules = SchemaRules {
        name: "redistribution profile create",
        fields: CREATE_FIELDS,
        required: &["name"],
        extra: ExtraFieldsPolicy::Strict,
        exclusive: &[CONTAINER_GROUP],
        unions: &[],
        crossovers: &[PROTOCOL_TABLE],
    };

    const UPDATE_RULES: SchemaRules = SchemaRules {
        name: "redistribution profile update",
        fields: UPDATE_FIELDS,
        required: &["id", "name"],
        extra: ExtraFieldsPolicy::Strict,
        exclusive: &[CONTAINER_GROUP],
        unions: &[],
        crossovers: &[PROTOCOL_TABLE],
    };

    const RESPONSE_RULES: SchemaRules = SchemaRules {
        name: "redistribution profile",
        fields: UPDATE_FIELDS,
        required: &["id", "name"],
        extra: ExtraFieldsPolicy::IgnoreExtra,
        exclusive: &[RESPONSE_CONTAINER_GROUP],
        unions: &[],
        crossovers: &[PROTOCOL_TABLE],
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationError;
    use serde_json::{json, Value};

    #[test]
    fn test_every_table_pair_decodes_into_typed_enum() {
        for (outer, inners) in PROTOCOL_TABLE.pairs {
            for inner in *inners {
                let value = json!({ *outer: { *inner: {"enable": true} } });
                let decoded: Result<RedistributionProtocol, _> = serde_json::from_value(value);
                assert!(decoded.is_ok(), "{outer}/{inner} should decode");
            }
        }
    }

    #[test]
    fn test_typed_enum_rejects_illegal_pair() {
        let value = json!({"bgp_to_ospf": {"redistribute_static": {}}});
        assert!(serde_json::from_value::<RedistributionProtocol>(value).is_err());
    }

    #[test]
    fn test_illegal_pair_fails_validation() {
        let payload = json!({
            "name": "to-ospf",
            "folder": "Texas",
            "protocol": {"bgp_to_ospf": {"redistribute_static": {}}}
        });
        let err = RedistributionProfiles::CREATE_RULES.apply(payload).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::IllegalCombination { ref outer, ref inner, .. }
                if outer == "bgp_to_ospf" && inner == "redistribute_static"
        ));
    }

    #[test]
    fn test_missing_protocol_fails() {
        let payload = json!({"name": "empty", "folder": "Texas"});
        let err = RedistributionProfiles::CREATE_RULES.apply(payload).unwrap_err();
        assert_eq!(err, ValidationError::MissingField { path: "protocol".into() });
    }

    #[test]
    fn test_create_serializes_nested_tags() {
        let create = RedistributionProfileCreate {
            fields: RedistributionFields {
                name: "static-to-rib".into(),
                description: None,
                protocol: RedistributionProtocol::ConnectedStaticToRib(
                    ConnectedStatic::RedistributeStatic(RedistributeRule {
                        enable: true,
                        ..Default::default()
                    }),
                ),
            },
            container: ContainerFields::folder("Texas"),
        };
        let value: Value = serde_json::to_value(&create).unwrap();
        assert_eq!(
            value["protocol"],
            json!({"connected_static_to_rib": {"redistribute_static": {"enable": true}}})
        );
        assert!(RedistributionProfiles::CREATE_RULES.apply(value).is_ok());
    }
}
