//! Authentication context models.
//!
//! The [`AuthContext`] is the mutable payload a processing chain carries from
//! step to step. When a step suspends, the context is serialized into the
//! state store under its [`StateId`] and a later request deserializes a fresh
//! copy to continue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

/// Attribute name to the set of its values.
pub type Attributes = BTreeMap<String, BTreeSet<String>>;

/// Errors raised when parsing identifiers received from the outside world.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("malformed state identifier: {0:?}")]
    MalformedStateId(String),
    #[error("malformed chain identifier: {0:?}")]
    MalformedChainId(String),
}

/// Opaque identifier of a chain instance.
///
/// The textual form is `_` followed by 32 lowercase hex digits.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, TS)]
#[serde(try_from = "String", into = "String")]
#[ts(type = "string")]
pub struct StateId(String);

impl StateId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(format!("_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for StateId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = s.len() == 33
            && s.starts_with('_')
            && s[1..]
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(IdError::MalformedStateId(s.to_string()))
        }
    }
}

impl TryFrom<String> for StateId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StateId> for String {
    fn from(id: StateId) -> Self {
        id.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of a chain definition.
///
/// Allowed characters are ASCII alphanumerics and `_ . : -`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, TS)]
#[serde(try_from = "String", into = "String")]
#[ts(type = "string")]
pub struct ChainId(String);

impl ChainId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ChainId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = !s.is_empty()
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-'));
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(IdError::MalformedChainId(s.to_string()))
        }
    }
}

impl TryFrom<String> for ChainId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ChainId> for String {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of a chain instance.
///
/// Created -> Running -> {Suspended <-> Resumed} -> {Terminated | Rejected}
///
/// Terminated and Rejected are absorbing.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChainStatus {
    /// Context built, no step has run yet.
    #[default]
    Created,

    /// Steps are executing within the initiating request.
    Running,

    /// A step paused the chain; the context lives in the state store.
    Suspended,

    /// A later request reloaded the context and is executing steps.
    Resumed,

    /// The chain ended successfully.
    Terminated,

    /// The chain ended in failure.
    Rejected,
}

impl ChainStatus {
    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, ChainStatus::Terminated | ChainStatus::Rejected)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: ChainStatus) -> bool {
        use ChainStatus::*;
        matches!(
            (self, next),
            (Created, Running)
                | (Running, Suspended)
                | (Suspended, Resumed)
                | (Resumed, Suspended)
                | (Running, Terminated)
                | (Resumed, Terminated)
                | (Running, Rejected)
                | (Resumed, Rejected)
                | (Suspended, Rejected)
        )
    }
}

/// A SAML entity participating in the flow.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(deny_unknown_fields)]
pub struct EntityRef {
    /// Entity identifier from metadata.
    pub entity_id: String,

    /// Local authentication source name, when the entity is our own SP side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_source: Option<String>,
}

impl EntityRef {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            auth_source: None,
        }
    }

    pub fn with_auth_source(mut self, auth_source: impl Into<String>) -> Self {
        self.auth_source = Some(auth_source.into());
        self
    }
}

/// Typed metadata carried alongside the attributes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[serde(deny_unknown_fields)]
pub struct ContextMetadata {
    #[serde(default)]
    pub source: Option<EntityRef>,

    #[serde(default)]
    pub destination: Option<EntityRef>,

    /// Upstream identity provider entity id.
    #[serde(default)]
    pub idp: Option<String>,

    /// Session track identifier shown to users for support requests.
    pub track_id: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// When this session last completed SSO towards the same destination.
    #[serde(default)]
    pub previous_sso: Option<DateTime<Utc>>,

    /// Kind of the step that last suspended the chain.
    #[serde(default)]
    pub stage: Option<String>,

    /// Per-step entry markers, `"<index>:<kind>"`.
    #[serde(default)]
    pub entered: BTreeSet<String>,

    #[serde(default)]
    pub status: ChainStatus,

    /// Step-private data.
    #[serde(default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// The payload carried through a processing chain.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[serde(deny_unknown_fields)]
pub struct AuthContext {
    pub identifier: StateId,
    pub chain_id: ChainId,

    /// Offset of the next step to run, `0 <= step_index <= steps.len()`.
    pub step_index: usize,

    pub attributes: Attributes,
    pub metadata: ContextMetadata,
}

impl AuthContext {
    /// Build a fresh context for `chain_id` with a new identifier.
    pub fn new(chain_id: ChainId) -> Self {
        let now = Utc::now();
        let track = Uuid::new_v4().simple().to_string();
        Self {
            identifier: StateId::generate(),
            chain_id,
            step_index: 0,
            attributes: Attributes::new(),
            metadata: ContextMetadata {
                source: None,
                destination: None,
                idp: None,
                track_id: track[..10].to_string(),
                created_at: now,
                updated_at: now,
                previous_sso: None,
                stage: None,
                entered: BTreeSet::new(),
                status: ChainStatus::Created,
                extra: BTreeMap::new(),
            },
        }
    }

    /// Replace all values of `name`.
    pub fn set_attribute<I, S>(&mut self, name: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes
            .insert(name.into(), values.into_iter().map(Into::into).collect());
    }

    /// Add a single value to `name`.
    pub fn add_attribute_value(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes
            .entry(name.into())
            .or_default()
            .insert(value.into());
    }

    /// Number of values for `name`; absent attributes count as zero.
    pub fn value_count(&self, name: &str) -> usize {
        self.attributes.get(name).map_or(0, BTreeSet::len)
    }

    /// Record that the step at `index` has been entered.
    ///
    /// Returns `true` only the first time, so callers can guard
    /// irreversible side effects.
    pub fn mark_entered(&mut self, index: usize, kind: &str) -> bool {
        self.metadata.entered.insert(format!("{index}:{kind}"))
    }

    pub fn has_entered(&self, index: usize, kind: &str) -> bool {
        self.metadata.entered.contains(&format!("{index}:{kind}"))
    }

    pub fn touch(&mut self) {
        self.metadata.updated_at = Utc::now();
    }
}
