//! Pairing-token delivery to the real-time channel.
//!
//! The end user waits on a separate real-time channel (identified by a
//! connection id from the [`ChannelRegistry`](wagate_store::ChannelRegistry));
//! pairing tokens are POSTed to the channel's management endpoint at
//! `{endpoint}/@connections/{connection_id}`.

use tracing::{debug, instrument};
use url::Url;

use crate::error::{SessionError, SessionResult};

/// Client for the real-time channel management endpoint.
#[derive(Clone)]
pub struct PushChannel {
    http: reqwest::Client,
    endpoint: Url,
}

impl PushChannel {
    /// Create a push channel for a management endpoint base URL.
    pub fn new(endpoint: &str) -> SessionResult<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| SessionError::PushDelivery(format!("bad endpoint `{endpoint}`: {e}")))?;
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
        })
    }

    /// Deliver `data` to one live channel connection.
    #[instrument(skip(self, data))]
    pub async fn post(&self, connection_id: &str, data: &str) -> SessionResult<()> {
        let url = self
            .endpoint
            .join(&format!("@connections/{connection_id}"))
            .map_err(|e| SessionError::PushDelivery(format!("bad connection id: {e}")))?;

        let response = self
            .http
            .post(url)
            .body(data.to_string())
            .send()
            .await
            .map_err(|e| SessionError::PushDelivery(e.to_string()))?;

        response
            .error_for_status()
            .map_err(|e| SessionError::PushDelivery(e.to_string()))?;

        debug!(connection_id, "pairing token delivered");
        Ok(())
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_endpoint_is_rejected() {
        assert!(matches!(
            PushChannel::new("not a url"),
            Err(SessionError::PushDelivery(_))
        ));
    }

    #[test]
    fn valid_endpoint_is_accepted() {
        assert!(PushChannel::new("https://channel.example.com/production/").is_ok());
    }
}
