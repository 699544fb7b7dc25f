//! Chain definition models for `.authchain/chains/*.yaml`.
//!
//! A chain definition names an ordered list of steps. The steps run strictly
//! in declaration order; any step may suspend the chain across requests.

use crate::context_models::{Attributes, ChainId, EntityRef, StateId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

/// Whether a stored state entry survives a finished resumption.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "kebab-case")]
pub enum ResumePolicy {
    /// The entry is deleted once a resumed chain terminates or is rejected.
    #[default]
    SingleUse,

    /// The entry stays until its TTL; only the resume lease is released.
    Reusable,
}

/// Allowed number of values for one attribute.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
pub struct CardinalityBound {
    #[serde(default)]
    pub min: usize,

    /// No upper bound when absent.
    #[serde(default)]
    pub max: Option<usize>,
}

impl CardinalityBound {
    pub fn allows(&self, count: usize) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }
}

fn default_min_interval_secs() -> u64 {
    10
}

/// One step of a chain as written in YAML.
///
/// ```yaml
/// steps:
///   - type: cardinality
///     attributes:
///       eduPersonPrincipalName: { min: 1, max: 1 }
///   - type: short-sso-interval
///     min-interval-secs: 10
///   - type: finish
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StepSpec {
    /// Reject the chain when an attribute has too few or too many values.
    Cardinality {
        attributes: BTreeMap<String, CardinalityBound>,
    },

    /// Warn the user when SSO towards the same destination repeats too fast.
    ShortSsoInterval {
        #[serde(rename = "min-interval-secs", default = "default_min_interval_secs")]
        min_interval_secs: u64,
    },

    /// Release only the listed attributes.
    AttributeLimit { allowed: Vec<String> },

    /// Reject unless every listed attribute has at least one value.
    AttributeRequire { required: Vec<String> },

    /// End the chain successfully.
    Finish,
}

impl StepSpec {
    /// Stable kind name, also used as the suspension stage.
    pub fn kind(&self) -> &'static str {
        match self {
            StepSpec::Cardinality { .. } => "cardinality",
            StepSpec::ShortSsoInterval { .. } => "short-sso-interval",
            StepSpec::AttributeLimit { .. } => "attribute-limit",
            StepSpec::AttributeRequire { .. } => "attribute-require",
            StepSpec::Finish => "finish",
        }
    }
}

/// A full chain definition.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(rename_all = "kebab-case")]
pub struct ChainDefinition {
    /// Unique chain identifier, validated on resumption.
    pub id: ChainId,

    #[serde(default)]
    pub resume_policy: ResumePolicy,

    /// Overrides the global default TTL for suspended state.
    #[serde(default)]
    pub state_ttl_secs: Option<u64>,

    pub steps: Vec<StepSpec>,
}

/// Why a chain ended in failure.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RejectReason {
    /// Attributes with an unexpected number of values, with the values seen.
    Cardinality {
        attributes: BTreeMap<String, Vec<String>>,
    },

    /// Required attributes that were absent or empty.
    MissingAttributes { names: Vec<String> },

    /// Administrative abort of a suspended chain.
    Aborted,

    /// Generic refusal carrying a user-facing message.
    Denied { message: String },
}

impl RejectReason {
    pub fn kind(&self) -> &'static str {
        match self {
            RejectReason::Cardinality { .. } => "cardinality",
            RejectReason::MissingAttributes { .. } => "missing-attributes",
            RejectReason::Aborted => "aborted",
            RejectReason::Denied { .. } => "denied",
        }
    }
}

/// Result handed back to the initiator of a successfully terminated chain.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct AuthResult {
    pub state_id: StateId,
    pub chain_id: ChainId,
    pub destination: Option<EntityRef>,
    pub attributes: Attributes,
}
