//! Request handlers at the rendering boundary.
//!
//! Handlers take a route's query parameters and answer with either a named
//! template plus its variables, or a redirect. Nothing here produces HTML;
//! rendering belongs to whoever serves the [`View`].

use crate::engine::{
    parse_state_id, ChainError, ChainOutcome, ChainRegistry, ChainResult, ErrorClass,
    ProcessingChain,
};
use crate::steps::short_interval;
use crate::urls::{sp_login_url, UrlPolicy, STATE_ID_PARAM};
use ac_protocol::{AuthContext, EntityRef, RejectReason, StateId, View};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

pub const CARDINALITY_TEMPLATE: &str = "core:cardinality_error.twig";
pub const NO_COOKIE_TEMPLATE: &str = "core:no_cookie.twig";
pub const SHORT_SSO_INTERVAL_TEMPLATE: &str = "core:short_sso_interval.twig";
pub const COMPLETED_TEMPLATE: &str = "core:completed.twig";
pub const REJECTED_TEMPLATE: &str = "core:rejected.twig";
pub const ERROR_TEMPLATE: &str = "core:error.twig";
pub const STATE_EXPIRED_TEMPLATE: &str = "core:state_expired.twig";

/// Query flag acknowledging a warning page.
pub const CONTINUE_PARAM: &str = "continue";

/// What the caller should send back to the user agent.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    View(View),
    Redirect(String),
}

impl Response {
    pub fn status(&self) -> u16 {
        match self {
            Response::View(view) => view.status,
            Response::Redirect(_) => 302,
        }
    }
}

pub struct FlowController {
    registry: ChainRegistry,
    urls: UrlPolicy,
    retry_delay: Duration,
}

impl FlowController {
    pub fn new(registry: ChainRegistry, urls: UrlPolicy) -> Self {
        Self {
            registry,
            urls,
            retry_delay: Duration::from_millis(50),
        }
    }

    /// Delay before the single retry of a resumption that lost a race.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    /// Start `chain_id` with `context` and render the outcome.
    pub async fn start(&self, chain_id: &str, context: AuthContext) -> ChainResult<Response> {
        let chain = self.registry.get(chain_id)?;
        let outcome = chain.start(context).await?;
        Ok(self.render_outcome(outcome))
    }

    /// Attribute cardinality conflict page.
    pub fn cardinality(
        &self,
        attributes: &BTreeMap<String, Vec<String>>,
        source: Option<&EntityRef>,
    ) -> View {
        let mut view = View::new(CARDINALITY_TEMPLATE)
            .with_status(403)
            .with_data("cardinalityErrorAttributes", json!(attributes));
        if let Some(auth_source) = source.and_then(|source| source.auth_source.as_deref()) {
            view = view.with_data("LogoutURL", sp_login_url(self.urls.base_url(), auth_source));
        }
        view
    }

    /// Page shown when the session cookie did not survive a redirect.
    ///
    /// The retry link is only offered when it passes the URL allow-list.
    pub fn nocookie(&self, query: &HashMap<String, String>) -> View {
        let retry = query
            .get("retryURL")
            .and_then(|candidate| self.urls.check_url_allowed(candidate));
        if retry.is_none() && query.contains_key("retryURL") {
            tracing::warn!("Dropping retry URL that failed the allow-list check");
        }
        View::new(NO_COOKIE_TEMPLATE).with_data("retryURL", retry)
    }

    /// Warning page for a repeated SSO within a short interval.
    ///
    /// With `continue` present the chain resumes; otherwise the warning is
    /// rendered and the state stays untouched.
    pub async fn short_sso_interval(
        &self,
        chain_id: &str,
        query: &HashMap<String, String>,
    ) -> ChainResult<Response> {
        let id = parse_state_id(query.get(STATE_ID_PARAM).map(String::as_str))?;
        let chain = self.registry.get(chain_id)?;
        let context = chain.inspect(&id).await?;

        if context.metadata.stage.as_deref() != Some(short_interval::KIND) {
            return Err(ChainError::StageMismatch {
                expected: short_interval::KIND.to_string(),
                found: context.metadata.stage,
            });
        }

        if query.contains_key(CONTINUE_PARAM) {
            let outcome = self.resume_with_retry(&chain, &id).await?;
            return Ok(self.render_outcome(outcome));
        }

        Ok(Response::View(
            View::new(SHORT_SSO_INTERVAL_TEMPLATE)
                .with_data("params", json!({ STATE_ID_PARAM: id.as_str() }))
                .with_data("trackId", context.metadata.track_id)
                .with_data("autofocus", "contbutton"),
        ))
    }

    /// Administratively end a suspended chain.
    pub async fn abort(&self, chain_id: &str, id: &StateId) -> ChainResult<()> {
        self.registry.get(chain_id)?.abort(id).await
    }

    async fn resume_with_retry(
        &self,
        chain: &ProcessingChain,
        id: &StateId,
    ) -> ChainResult<ChainOutcome> {
        match chain.resume(id).await {
            Err(ChainError::ConcurrentResumption(_)) => {
                tracing::warn!(state_id = %id, "Lost resumption race, retrying once");
                tokio::time::sleep(self.retry_delay).await;
                chain.resume(id).await
            }
            other => other,
        }
    }

    pub fn render_outcome(&self, outcome: ChainOutcome) -> Response {
        match outcome {
            ChainOutcome::Suspended(continuation) => Response::Redirect(continuation.url),
            ChainOutcome::Terminated(result) => Response::View(
                View::new(COMPLETED_TEMPLATE)
                    .with_data("destination", result.destination.map(|d| d.entity_id))
                    .with_data("attributes", json!(result.attributes)),
            ),
            ChainOutcome::Rejected {
                reason: RejectReason::Cardinality { attributes },
                source,
                ..
            } => Response::View(self.cardinality(&attributes, source.as_ref())),
            ChainOutcome::Rejected { reason, .. } => {
                let mut view = View::new(REJECTED_TEMPLATE)
                    .with_status(403)
                    .with_data("reason", reason.kind());
                match reason {
                    RejectReason::MissingAttributes { names } => {
                        view = view.with_data("missingAttributes", names);
                    }
                    RejectReason::Denied { message } => {
                        view = view.with_data("message", message);
                    }
                    RejectReason::Cardinality { .. } | RejectReason::Aborted => {}
                }
                Response::View(view)
            }
        }
    }

    /// Render a failure without exposing internal state.
    pub fn render_error(&self, error: &ChainError) -> View {
        let class = error.class();
        let status = class.status_code();
        match class {
            ErrorClass::BadRequest => {
                tracing::info!(error = %error, "Bad request");
                View::new(ERROR_TEMPLATE)
                    .with_status(status)
                    .with_data("message", error.to_string())
            }
            ErrorClass::Expired => {
                tracing::info!(error = %error, "State expired");
                View::new(STATE_EXPIRED_TEMPLATE).with_status(status)
            }
            ErrorClass::Transient => {
                tracing::warn!(error = %error, "Concurrent resumption");
                View::new(ERROR_TEMPLATE)
                    .with_status(status)
                    .with_data("message", "This request is already being processed.")
            }
            ErrorClass::Configuration | ErrorClass::Internal => {
                tracing::error!(error = %error, "Chain processing failed");
                View::new(ERROR_TEMPLATE)
                    .with_status(status)
                    .with_data("message", "An internal error occurred.")
            }
        }
    }

    /// Collapse a handler result into a response.
    pub fn respond(&self, result: ChainResult<Response>) -> Response {
        result.unwrap_or_else(|e| Response::View(self.render_error(&e)))
    }
}
