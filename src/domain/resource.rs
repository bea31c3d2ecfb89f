//! Resource and grantee identity types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Every kind of thing a grant can apply to.
///
/// Hierarchical kinds (`Site`, `Plan`, `Sensor`, `Broker`, `Alarm`, `Alert`) sit in
/// the fixed tree walked by [`crate::hierarchy`]; standalone kinds have no parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Group,
    User,
    Site,
    Plan,
    Sensor,
    Broker,
    Alarm,
    Alert,
    Dashboard,
    Hardware,
    Datatype,
    Protocol,
    Parser,
    Manufacturer,
    CommunicationMode,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Group => "group",
            ResourceKind::User => "user",
            ResourceKind::Site => "site",
            ResourceKind::Plan => "plan",
            ResourceKind::Sensor => "sensor",
            ResourceKind::Broker => "broker",
            ResourceKind::Alarm => "alarm",
            ResourceKind::Alert => "alert",
            ResourceKind::Dashboard => "dashboard",
            ResourceKind::Hardware => "hardware",
            ResourceKind::Datatype => "datatype",
            ResourceKind::Protocol => "protocol",
            ResourceKind::Parser => "parser",
            ResourceKind::Manufacturer => "manufacturer",
            ResourceKind::CommunicationMode => "communication_mode",
        }
    }

    /// Root of the hierarchical tree; plan/sensor/broker/alarm/alert chain up to this.
    pub fn is_hierarchical(&self) -> bool {
        matches!(
            self,
            ResourceKind::Site
                | ResourceKind::Plan
                | ResourceKind::Sensor
                | ResourceKind::Broker
                | ResourceKind::Alarm
                | ResourceKind::Alert
        )
    }

    /// Catalog kinds default to read-for-everyone, superuser-for-mutation (§4.4 Finalize).
    pub fn is_catalog(&self) -> bool {
        matches!(
            self,
            ResourceKind::Hardware
                | ResourceKind::Datatype
                | ResourceKind::Protocol
                | ResourceKind::Parser
                | ResourceKind::Manufacturer
                | ResourceKind::CommunicationMode
        )
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "group" => ResourceKind::Group,
            "user" => ResourceKind::User,
            "site" => ResourceKind::Site,
            "plan" => ResourceKind::Plan,
            "sensor" => ResourceKind::Sensor,
            "broker" => ResourceKind::Broker,
            "alarm" => ResourceKind::Alarm,
            "alert" => ResourceKind::Alert,
            "dashboard" => ResourceKind::Dashboard,
            "hardware" => ResourceKind::Hardware,
            "datatype" => ResourceKind::Datatype,
            "protocol" => ResourceKind::Protocol,
            "parser" => ResourceKind::Parser,
            "manufacturer" => ResourceKind::Manufacturer,
            "communication_mode" => ResourceKind::CommunicationMode,
            _ => return None,
        })
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resource identified by kind and id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub id: String,
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Who a grant is issued to: a user or a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GranteeKind {
    User,
    Group,
}

impl GranteeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GranteeKind::User => "user",
            GranteeKind::Group => "group",
        }
    }
}

impl fmt::Display for GranteeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A grantee identified by kind and id: `{user:id}` or `{group:id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GranteeRef {
    pub kind: GranteeKind,
    pub id: String,
}

impl GranteeRef {
    pub fn user(id: impl Into<String>) -> Self {
        Self { kind: GranteeKind::User, id: id.into() }
    }

    pub fn group(id: impl Into<String>) -> Self {
        Self { kind: GranteeKind::Group, id: id.into() }
    }
}

impl fmt::Display for GranteeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
