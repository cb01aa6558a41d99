use super::build_client;
use crate::{
    errors::*,
    traits::TrackerRegistrar,
    wire::{AliasReceipt, AliasRegistrationMessage},
};
use async_trait::async_trait;
use melange_crypto::{hash_for_log, Identity};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

/// Claims aliases on tracker services over HTTP
#[derive(Clone)]
pub struct HttpTrackerRegistrar {
    client: Client,
}

impl HttpTrackerRegistrar {
    /// Client whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
        })
    }

    async fn register_one(
        &self,
        message: &AliasRegistrationMessage,
        tracker: &str,
    ) -> std::result::Result<(), TrackerRejection> {
        let response = self
            .client
            .post(format!("{}/v1/aliases", tracker.trim_end_matches('/')))
            .json(message)
            .send()
            .await
            .map_err(|e| TrackerRejection::Transport(e.to_string()))?;

        let status = response.status();
        match status {
            StatusCode::CONFLICT => return Err(TrackerRejection::AliasTaken),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(TrackerRejection::Signature)
            }
            _ if !status.is_success() => {
                let message = response.text().await.unwrap_or_default();
                return Err(TrackerRejection::Rejected {
                    status: status.as_u16(),
                    message,
                });
            }
            _ => {}
        }

        let receipt: AliasReceipt = response.json().await.map_err(|e| TrackerRejection::Rejected {
            status: status.as_u16(),
            message: format!("malformed receipt: {}", e),
        })?;

        if receipt.alias != message.alias || receipt.address != message.address {
            return Err(TrackerRejection::Rejected {
                status: status.as_u16(),
                message: "receipt does not match request".to_string(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl TrackerRegistrar for HttpTrackerRegistrar {
    async fn register_alias(
        &self,
        identity: &Identity,
        trackers: &[String],
        alias: &str,
    ) -> Result<()> {
        let message = AliasRegistrationMessage::build(identity, alias);

        for tracker in trackers {
            if let Err(reason) = self.register_one(&message, tracker).await {
                warn!(%tracker, alias = %hash_for_log(alias), %reason, "Tracker refused alias");
                return Err(ProvisioningError::TrackerRegistration {
                    tracker: tracker.clone(),
                    reason,
                });
            }
            debug!(%tracker, alias = %hash_for_log(alias), "Alias registered");
        }

        Ok(())
    }
}
