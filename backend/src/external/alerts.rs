//! Outbound price-alert delivery.
//!
//! Fire-and-forget: a failed delivery must never abort the mutation
//! pipeline that produced the alert, so the dispatcher logs failures and
//! swallows them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

use shared::models::Establishment;

use crate::config::AlertingConfig;
use crate::events::DomainEvent;

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("alert gateway rejected the message: {0}")]
    Gateway(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Fire-and-forget alert delivery collaborator
#[async_trait]
pub trait AlertSender: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), AlertError>;
}

/// HTTP SMS gateway client
#[derive(Clone)]
pub struct SmsGateway {
    gateway_url: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl SmsGateway {
    /// Build a client when the gateway is configured
    pub fn from_config(config: &AlertingConfig) -> Option<Self> {
        let gateway_url = config.gateway_url.clone()?;
        let api_key = config.api_key.clone().unwrap_or_default();
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .ok()?;
        Some(Self {
            gateway_url,
            api_key,
            http_client,
        })
    }
}

#[async_trait]
impl AlertSender for SmsGateway {
    async fn send(&self, message: &str) -> Result<(), AlertError> {
        let response = self
            .http_client
            .post(&self.gateway_url)
            .bearer_auth(&self.api_key)
            .json(&json!({ "message": message }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AlertError::Gateway(format!(
                "status {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Sender used when alerting is unconfigured; logs and drops the message
#[derive(Debug, Clone, Default)]
pub struct NoopAlerts;

#[async_trait]
impl AlertSender for NoopAlerts {
    async fn send(&self, message: &str) -> Result<(), AlertError> {
        tracing::debug!(message, "alerting disabled, dropping alert");
        Ok(())
    }
}

/// Applies an establishment's alert configuration to domain events and
/// forwards the ones that pass through the configured sender.
#[derive(Clone)]
pub struct AlertDispatcher {
    sender: Arc<dyn AlertSender>,
}

impl AlertDispatcher {
    pub fn new(sender: Arc<dyn AlertSender>) -> Self {
        Self { sender }
    }

    pub fn noop() -> Self {
        Self::new(Arc::new(NoopAlerts))
    }

    /// Deliver an event if the establishment's configuration asks for it.
    /// Returns whether a delivery was attempted.
    pub async fn dispatch(&self, establishment: &Establishment, event: &DomainEvent) -> bool {
        let DomainEvent::PriceVariationDetected {
            article_name,
            supplier_label,
            old_unit_price,
            new_unit_price,
            percentage,
            ..
        } = event;

        if !establishment.active_sms {
            return false;
        }
        if !establishment.sms_scope.covers(*supplier_label) {
            return false;
        }
        if !establishment
            .sms_variation_trigger
            .triggers_on(*percentage)
        {
            return false;
        }

        let direction = if percentage.is_sign_positive() { "+" } else { "" };
        let message = format!(
            "Price variation on {}: {} -> {} ({}{}%)",
            article_name,
            old_unit_price.round_dp(2),
            new_unit_price.round_dp(2),
            direction,
            percentage.round_dp(1),
        );

        if let Err(err) = self.sender.send(&message).await {
            tracing::warn!(error = %err, article = %article_name, "alert delivery failed");
        }
        true
    }
}
