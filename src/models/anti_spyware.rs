//! Anti-spyware profiles
//!
//! Rule and exception actions are single-key maps: `{"alert": {}}`,
//! `{"block_ip": {"track_by": "source", "duration": 300}}`.

use super::common::{ContainerFields, ScopedObject, CONTAINER_GROUP, RESPONSE_CONTAINER_GROUP};
use crate::resource::{RegisteredKind, ResourceKind};
use crate::validation::{select_tag, ExtraFieldsPolicy, SchemaRules, TaggedUnion, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub const ACTION_TAGS: &[&str] = &[
    "default",
    "allow",
    "alert",
    "drop",
    "reset_client",
    "reset_server",
    "reset_both",
    "block_ip",
];

const RULE_ACTION: TaggedUnion = TaggedUnion::new("action", "rules[].action", ACTION_TAGS);
const EXCEPTION_ACTION: TaggedUnion =
    TaggedUnion::new("action", "threat_exceptions[].action", ACTION_TAGS);

const CREATE_FIELDS: &[&str] = &[
    "name",
    "description",
    "cloud_inline_analysis",
    "rules",
    "threat_exceptions",
    "folder",
    "snippet",
    "device",
];

const UPDATE_FIELDS: &[&str] = &[
    "id",
    "name",
    "description",
    "cloud_inline_analysis",
    "rules",
    "threat_exceptions",
    "folder",
    "snippet",
    "device",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackBy {
    Source,
    SourceAndDestination,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockIp {
    pub track_by: TrackBy,
    /// Seconds, 1-3600
    pub duration: u32,
}

/// What to do when a rule or exception matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatAction {
    Default {},
    Allow {},
    Alert {},
    Drop {},
    ResetClient {},
    ResetServer {},
    ResetBoth {},
    BlockIp(BlockIp),
}

impl ThreatAction {
    pub fn tag(&self) -> &'static str {
        match self {
            ThreatAction::Default {} => "default",
            ThreatAction::Allow {} => "allow",
            ThreatAction::Alert {} => "alert",
            ThreatAction::Drop {} => "drop",
            ThreatAction::ResetClient {} => "reset_client",
            ThreatAction::ResetServer {} => "reset_server",
            ThreatAction::ResetBoth {} => "reset_both",
            ThreatAction::BlockIp(_) => "block_ip",
        }
    }
}

impl TryFrom<&Value> for ThreatAction {
    type Error = ValidationError;

    /// Accepts only a map with exactly one recognized action key
    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        select_tag("action", "action", value, ACTION_TAGS)?;
        serde_json::from_value(value.clone()).map_err(|e| ValidationError::Decode {
            schema: "action".to_string(),
            message: e.to_string(),
        })
    }
}

fn default_category() -> String {
    "any".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpywareRule {
    pub name: String,
    #[serde(default)]
    pub severity: Vec<String>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threat_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet_capture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ThreatAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatException {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet_capture: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exempt_ip: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ThreatAction>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AntiSpywareFields {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_inline_analysis: Option<bool>,
    #[serde(default)]
    pub rules: Vec<SpywareRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub threat_exceptions: Vec<ThreatException>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AntiSpywareProfileCreate {
    #[serde(flatten)]
    pub fields: AntiSpywareFields,
    #[serde(flatten)]
    pub container: ContainerFields,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AntiSpywareProfileUpdate {
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: AntiSpywareFields,
    #[serde(flatten)]
    pub container: ContainerFields,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AntiSpywareProfile {
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: AntiSpywareFields,
    #[serde(flatten)]
    pub container: ContainerFields,
}

impl ScopedObject for AntiSpywareProfile {
    fn container_fields(&self) -> ContainerFields {
        self.container.clone()
    }

    fn name(&self) -> Option<&str> {
        Some(&self.fields.name)
    }
}

pub struct AntiSpywareProfiles;

impl RegisteredKind for AntiSpywareProfiles {
    const KEY: &'static str = "anti-spyware-profiles";
}

impl ResourceKind for AntiSpywareProfiles {
    type Create = AntiSpywareProfileCreate;
    type Update = AntiSpywareProfileUpdate;
    type Response = AntiSpywareProfile;

    const CREATE_RULES: SchemaRules = SchemaRules {
        name: "anti-spyware profile create",
        fields: CREATE_FIELDS,
        required: &["name"],
        extra: ExtraFieldsPolicy::Strict,
        exclusive: &[CONTAINER_GROUP],
        unions: &[RULE_ACTION, EXCEPTION_ACTION],
        crossovers: &[],
    };

    const UPDATE_RULES: SchemaRules = SchemaRules {
        name: "anti-spyware profile update",
        fields: UPDATE_FIELDS,
        required: &["id", "name"],
        extra: ExtraFieldsPolicy::Strict,
        exclusive: &[CONTAINER_GROUP],
        unions: &[RULE_ACTION, EXCEPTION_ACTION],
        crossovers: &[],
    };

    const RESPONSE_RULES: SchemaRules = SchemaRules {
        name: "anti-spyware profile",
        fields: UPDATE_FIELDS,
        required: &["id", "name"],
        extra: ExtraFieldsPolicy::IgnoreExtra,
        exclusive: &[RESPONSE_CONTAINER_GROUP],
        unions: &[RULE_ACTION, EXCEPTION_ACTION],
        crossovers: &[],
    };
}
