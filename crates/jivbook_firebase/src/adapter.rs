//! [`PushDelivery`] backed by Firebase Cloud Messaging
//!
//! FCM v1 has no multicast endpoint, so a multicast is one request per token,
//! run with bounded concurrency. Responses keep the order of the input tokens.

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use jivbook_common::models::Notification;
use jivbook_common::services::{
    BoxFuture, DeliveryFailure, MulticastResult, PushDelivery, SendResult, TokenSendResponse,
    TopicManagementResult,
};
use jivbook_config::FirebaseConfig;
use jivbook_db::{DeviceTokenRepository, NotificationRepository};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::client::{normalize_topic, FirebaseClient, FirebaseError};
use crate::message::{build_message, Target};

/// Largest token list one multicast accepts. Callers chunk beyond this.
pub const MAX_MULTICAST_TOKENS: usize = 500;

const NO_TOKENS: &str = "No device tokens provided";

/// Firebase implementation of the push delivery capability
///
/// Writes back to the device registry only to deactivate tokens FCM reports as
/// unregistered or invalid. Reads the record store only for the iOS badge.
pub struct FirebasePushAdapter<D, N> {
    client: Arc<FirebaseClient>,
    devices: D,
    notifications: N,
    concurrency: usize,
    web_icon: String,
}

impl<D, N> FirebasePushAdapter<D, N>
where
    D: DeviceTokenRepository + Send + Sync,
    N: NotificationRepository + Send + Sync,
{
    pub fn new(
        client: Arc<FirebaseClient>,
        devices: D,
        notifications: N,
        config: &FirebaseConfig,
    ) -> Self {
        Self {
            client,
            devices,
            notifications,
            concurrency: config.send_concurrency.max(1),
            web_icon: config.web_icon.clone(),
        }
    }

    pub fn client(&self) -> &FirebaseClient {
        &self.client
    }

    async fn multicast(
        &self,
        tokens: &[String],
        notification: &Notification,
        extra_data: &Map<String, Value>,
    ) -> Result<MulticastResult, FirebaseError> {
        if tokens.is_empty() {
            return Ok(MulticastResult::rejected(NO_TOKENS));
        }
        if tokens.len() > MAX_MULTICAST_TOKENS {
            return Err(FirebaseError::BatchTooLarge(tokens.len()));
        }

        debug!(
            "Sending notification {} to {} token(s)",
            notification.id,
            tokens.len()
        );

        let access_token = self.client.access_token().await?;
        let template = build_message(
            Target::Token(""),
            notification,
            extra_data,
            None,
            &self.web_icon,
        );

        let client = self.client.as_ref();
        let access_token = access_token.as_str();
        let template = &template;
        let responses: Vec<TokenSendResponse> = stream::iter(tokens.iter().cloned())
            .map(move |token: String| {
                let mut message = template.clone();
                message.message.token = Some(token.clone());
                async move {
                    match client.send_message_with_token(access_token, &message).await {
                        Ok(name) => TokenSendResponse::delivered(token, name),
                        Err(err) => TokenSendResponse::failed(token, failure_of(&err)),
                    }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let result = MulticastResult::from_responses(responses);
        info!(
            "Notification {} delivered to {}/{} token(s)",
            notification.id,
            result.success_count,
            tokens.len()
        );

        self.deactivate(&result.invalid_tokens()).await;
        Ok(result)
    }

    async fn single(
        &self,
        token: &str,
        notification: &Notification,
        extra_data: &Map<String, Value>,
    ) -> Result<SendResult, FirebaseError> {
        let badge = match notification.recipient.as_deref() {
            Some(recipient) => self.badge_for(recipient).await,
            None => None,
        };
        let message = build_message(
            Target::Token(token),
            notification,
            extra_data,
            badge,
            &self.web_icon,
        );

        match self.client.send_message(&message).await {
            Ok(name) => Ok(SendResult::sent(name)),
            Err(err) if is_delivery_failure(&err) => {
                warn!("Failed to send notification {} to device: {}", notification.id, err);
                if err.is_invalid_token() {
                    self.deactivate(&[token.to_string()]).await;
                }
                Ok(SendResult::failed(err.to_string()))
            }
            Err(err) => Err(err),
        }
    }

    async fn topic(
        &self,
        topic: &str,
        notification: &Notification,
        extra_data: &Map<String, Value>,
    ) -> Result<SendResult, FirebaseError> {
        let topic = normalize_topic(topic)?;
        let message = build_message(
            Target::Topic(topic),
            notification,
            extra_data,
            None,
            &self.web_icon,
        );

        match self.client.send_message(&message).await {
            Ok(name) => {
                info!("Notification {} sent to topic '{}'", notification.id, topic);
                Ok(SendResult::sent(name))
            }
            Err(err) if is_delivery_failure(&err) => {
                warn!(
                    "Failed to send notification {} to topic '{}': {}",
                    notification.id, topic, err
                );
                Ok(SendResult::failed(err.to_string()))
            }
            Err(err) => Err(err),
        }
    }

    /// Unread count of `recipient`; a lookup failure only drops the badge.
    async fn badge_for(&self, recipient: &str) -> Option<i64> {
        match self.notifications.unread_count(recipient, Utc::now()).await {
            Ok(count) => Some(count),
            Err(err) => {
                warn!("Could not compute badge for user {}: {}", recipient, err);
                None
            }
        }
    }

    async fn deactivate(&self, tokens: &[String]) {
        if tokens.is_empty() {
            return;
        }
        match self.devices.deactivate_tokens(tokens).await {
            Ok(count) => debug!("{} of {} reported token(s) deactivated", count, tokens.len()),
            Err(err) => error!("Failed to deactivate invalid device tokens: {}", err),
        }
    }
}

/// Failures of one send that are reported as data rather than returned as `Err`.
fn is_delivery_failure(err: &FirebaseError) -> bool {
    matches!(
        err,
        FirebaseError::Fcm { .. } | FirebaseError::RequestError(_) | FirebaseError::ApiError(_)
    )
}

fn failure_of(err: &FirebaseError) -> DeliveryFailure {
    DeliveryFailure {
        code: err.code().to_string(),
        message: err.to_string(),
        invalid_token: err.is_invalid_token(),
    }
}

impl<D, N> PushDelivery for FirebasePushAdapter<D, N>
where
    D: DeviceTokenRepository + Send + Sync,
    N: NotificationRepository + Send + Sync,
{
    type Error = FirebaseError;

    fn send_to_multiple_devices<'a>(
        &'a self,
        tokens: &'a [String],
        notification: &'a Notification,
        extra_data: &'a Map<String, Value>,
    ) -> BoxFuture<'a, MulticastResult, Self::Error> {
        Box::pin(self.multicast(tokens, notification, extra_data))
    }

    fn send_to_device<'a>(
        &'a self,
        token: &'a str,
        notification: &'a Notification,
        extra_data: &'a Map<String, Value>,
    ) -> BoxFuture<'a, SendResult, Self::Error> {
        Box::pin(self.single(token, notification, extra_data))
    }

    fn send_to_topic<'a>(
        &'a self,
        topic: &'a str,
        notification: &'a Notification,
        extra_data: &'a Map<String, Value>,
    ) -> BoxFuture<'a, SendResult, Self::Error> {
        Box::pin(self.topic(topic, notification, extra_data))
    }

    fn subscribe_to_topic<'a>(
        &'a self,
        tokens: &'a [String],
        topic: &'a str,
    ) -> BoxFuture<'a, TopicManagementResult, Self::Error> {
        Box::pin(self.client.subscribe_to_topic(tokens, topic))
    }

    fn unsubscribe_from_topic<'a>(
        &'a self,
        tokens: &'a [String],
        topic: &'a str,
    ) -> BoxFuture<'a, TopicManagementResult, Self::Error> {
        Box::pin(self.client.unsubscribe_from_topic(tokens, topic))
    }
}
