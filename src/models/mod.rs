//! Resource schemas
//!
//! Each schema embeds the shared [`common::ContainerFields`] record and comes in
//! Create / Update / Response shapes. The per-resource [`ResourceKind`] binding
//! carries the static validation rules for each shape.
//!
//! [`ResourceKind`]: crate::resource::ResourceKind

pub mod address;
pub mod anti_spyware;
pub mod common;
pub mod raw;
pub mod redistribution;

use crate::resource::{KindRules, RegisteredKind};

pub use address::{Address, AddressCreate, AddressFields, AddressUpdate, Addresses};
pub use anti_spyware::{AntiSpywareProfile, AntiSpywareProfiles, ThreatAction};
pub use common::{Container, ContainerFields, ScopedObject};
pub use raw::RawResource;
pub use redistribution::{RedistributionProfile, RedistributionProfiles, RedistributionProtocol};

/// Rules of the typed schema registered under `key`, if there is one
pub fn rules_for(key: &str) -> Option<KindRules> {
    let typed = [
        (Addresses::KEY, KindRules::of::<Addresses>()),
        (AntiSpywareProfiles::KEY, KindRules::of::<AntiSpywareProfiles>()),
        (RedistributionProfiles::KEY, KindRules::of::<RedistributionProfiles>()),
    ];
    typed
        .into_iter()
        .find(|(typed_key, _)| *typed_key == key)
        .map(|(_, rules)| rules)
}
