//! Views handed to an external renderer.
//!
//! The core never produces HTML. It names a template, supplies the template
//! variables and picks an HTTP status code.

use crate::context_models::StateId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

/// A named template plus its variables.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct View {
    pub template: String,
    pub status: u16,
    pub data: BTreeMap<String, serde_json::Value>,
}

impl View {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            status: 200,
            data: BTreeMap::new(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_data(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// Where a later request resumes a suspended chain.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct Continuation {
    pub state_id: StateId,

    /// Absolute URL carrying `StateId` as a query parameter.
    pub url: String,
}
