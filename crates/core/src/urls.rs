//! URL construction and the redirect allow-list.

use ac_protocol::{ChainId, StateId};
use url::Url;

/// Query parameter carrying the state identifier in continuation URLs.
pub const STATE_ID_PARAM: &str = "StateId";

/// Build `<base>/<chain>/<route>?StateId=<id>`.
pub fn continuation_url(
    base_url: &str,
    chain_id: &ChainId,
    route: &str,
    id: &StateId,
) -> Result<String, url::ParseError> {
    let mut url = Url::parse(base_url)?;
    url.path_segments_mut()
        .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .push(chain_id.as_str())
        .push(route);
    url.query_pairs_mut().append_pair(STATE_ID_PARAM, id.as_str());
    Ok(url.into())
}

/// Login URL of a local SP auth source, used as the "log out and retry" link.
pub fn sp_login_url(base_url: &str, auth_source: &str) -> String {
    format!(
        "{}/saml/sp/login/{}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(auth_source)
    )
}

/// Decides which URLs may be used as redirect targets.
///
/// A URL is allowed when it is http(s), carries no credentials, and its host
/// is the base URL's host or one of the trusted domains. Relative URLs are
/// resolved against the base URL first.
#[derive(Debug, Clone)]
pub struct UrlPolicy {
    base: Url,
    trusted: Vec<String>,
}

impl UrlPolicy {
    pub fn new(base_url: &str, trusted_domains: &[String]) -> Result<Self, url::ParseError> {
        Ok(Self {
            base: Url::parse(base_url)?,
            trusted: trusted_domains
                .iter()
                .map(|domain| domain.to_ascii_lowercase())
                .collect(),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    /// The normalized URL if it may be used, `None` otherwise.
    pub fn check_url_allowed(&self, candidate: &str) -> Option<String> {
        let url = match Url::parse(candidate) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => self.base.join(candidate).ok()?,
            Err(_) => return None,
        };

        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        if !url.username().is_empty() || url.password().is_some() {
            return None;
        }

        let host = url.host_str()?.to_ascii_lowercase();
        let own_host = self.base.host_str().map(str::to_ascii_lowercase);
        let allowed = own_host.as_deref() == Some(host.as_str())
            || self.trusted.iter().any(|domain| *domain == host);

        if allowed {
            Some(url.into())
        } else {
            tracing::warn!(url = candidate, "URL not allowed by trusted domains");
            None
        }
    }
}
