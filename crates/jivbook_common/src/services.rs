//! Service abstractions for external providers.
//!
//! The notification service only knows the [`PushDelivery`] capability: "send to N
//! tokens and report per-token outcomes, send to a topic, manage topic
//! membership". Firebase is one implementation; tests use in-memory fakes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::models::Notification;

/// Type alias for a boxed future that returns a Result
pub type BoxFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// A wrapper error type that implements std::error::Error for Box<dyn std::error::Error + Send + Sync>
#[derive(Debug)]
pub struct BoxedError(pub Box<dyn StdError + Send + Sync>);

impl fmt::Display for BoxedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StdError for BoxedError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

impl From<Box<dyn StdError + Send + Sync>> for BoxedError {
    fn from(err: Box<dyn StdError + Send + Sync>) -> Self {
        BoxedError(err)
    }
}

/// Why one token could not be reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DeliveryFailure {
    /// Provider error code, e.g. `UNREGISTERED`.
    pub code: String,
    pub message: String,
    /// The token is dead and must not be used again.
    pub invalid_token: bool,
}

/// Outcome for a single token of a multicast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TokenSendResponse {
    pub token: String,
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<DeliveryFailure>,
}

impl TokenSendResponse {
    pub fn delivered(token: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            success: true,
            message_id: Some(message_id.into()),
            error: None,
        }
    }

    pub fn failed(token: impl Into<String>, failure: DeliveryFailure) -> Self {
        Self {
            token: token.into(),
            success: false,
            message_id: None,
            error: Some(failure),
        }
    }
}

/// Normalized result of sending one notification to a list of tokens.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MulticastResult {
    pub success: bool,
    pub success_count: usize,
    pub failure_count: usize,
    /// In the same order as the tokens that were passed in.
    pub responses: Vec<TokenSendResponse>,
    /// Set when the whole call was refused before any token was tried.
    pub error: Option<String>,
}

impl MulticastResult {
    pub fn from_responses(responses: Vec<TokenSendResponse>) -> Self {
        let success_count = responses.iter().filter(|r| r.success).count();
        let failure_count = responses.len() - success_count;
        Self {
            success: success_count > 0,
            success_count,
            failure_count,
            responses,
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Tokens the provider reported as unregistered or malformed.
    pub fn invalid_tokens(&self) -> Vec<String> {
        self.responses
            .iter()
            .filter(|r| r.error.as_ref().is_some_and(|e| e.invalid_token))
            .map(|r| r.token.clone())
            .collect()
    }
}

/// Result of a single-target send (one device or one topic).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SendResult {
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl SendResult {
    pub fn sent(message_id: impl Into<String>) -> Self {
        Self {
            success: true,
            message_id: Some(message_id.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TopicManagementError {
    /// Position of the token in the request.
    pub index: usize,
    pub reason: String,
}

/// Result of a topic (un)subscription for a list of tokens.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TopicManagementResult {
    pub success_count: usize,
    pub failure_count: usize,
    pub errors: Vec<TopicManagementError>,
}

/// A push-messaging provider.
///
/// Infrastructure faults (credentials, configuration, oversized batches) are
/// returned as `Err`. Per-token outcomes are data inside the `Ok` value, so a
/// call where every token failed is still `Ok`.
pub trait PushDelivery: Send + Sync {
    /// Error type returned by push delivery operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Send one notification to at most 500 device tokens.
    fn send_to_multiple_devices<'a>(
        &'a self,
        tokens: &'a [String],
        notification: &'a Notification,
        extra_data: &'a Map<String, Value>,
    ) -> BoxFuture<'a, MulticastResult, Self::Error>;

    /// Send one notification to a single device token.
    fn send_to_device<'a>(
        &'a self,
        token: &'a str,
        notification: &'a Notification,
        extra_data: &'a Map<String, Value>,
    ) -> BoxFuture<'a, SendResult, Self::Error>;

    /// Send one notification to every device subscribed to `topic`.
    fn send_to_topic<'a>(
        &'a self,
        topic: &'a str,
        notification: &'a Notification,
        extra_data: &'a Map<String, Value>,
    ) -> BoxFuture<'a, SendResult, Self::Error>;

    fn subscribe_to_topic<'a>(
        &'a self,
        tokens: &'a [String],
        topic: &'a str,
    ) -> BoxFuture<'a, TopicManagementResult, Self::Error>;

    fn unsubscribe_from_topic<'a>(
        &'a self,
        tokens: &'a [String],
        topic: &'a str,
    ) -> BoxFuture<'a, TopicManagementResult, Self::Error>;
}

/// Shared handle the notification service holds on to.
pub type DynPushDelivery = std::sync::Arc<dyn PushDelivery<Error = BoxedError>>;

/// Adapts any [`PushDelivery`] to the boxed error type so it can live behind
/// [`DynPushDelivery`].
pub struct BoxedPushDelivery<P>(pub P);

fn boxed<E: StdError + Send + Sync + 'static>(err: E) -> BoxedError {
    BoxedError(Box::new(err))
}

impl<P: PushDelivery> PushDelivery for BoxedPushDelivery<P> {
    type Error = BoxedError;

    fn send_to_multiple_devices<'a>(
        &'a self,
        tokens: &'a [String],
        notification: &'a Notification,
        extra_data: &'a Map<String, Value>,
    ) -> BoxFuture<'a, MulticastResult, Self::Error> {
        Box::pin(async move {
            self.0
                .send_to_multiple_devices(tokens, notification, extra_data)
                .await
                .map_err(boxed)
        })
    }

    fn send_to_device<'a>(
        &'a self,
        token: &'a str,
        notification: &'a Notification,
        extra_data: &'a Map<String, Value>,
    ) -> BoxFuture<'a, SendResult, Self::Error> {
        Box::pin(async move {
            self.0
                .send_to_device(token, notification, extra_data)
                .await
                .map_err(boxed)
        })
    }

    fn send_to_topic<'a>(
        &'a self,
        topic: &'a str,
        notification: &'a Notification,
        extra_data: &'a Map<String, Value>,
    ) -> BoxFuture<'a, SendResult, Self::Error> {
        Box::pin(async move {
            self.0
                .send_to_topic(topic, notification, extra_data)
                .await
                .map_err(boxed)
        })
    }

    fn subscribe_to_topic<'a>(
        &'a self,
        tokens: &'a [String],
        topic: &'a str,
    ) -> BoxFuture<'a, TopicManagementResult, Self::Error> {
        Box::pin(async move {
            self.0
                .subscribe_to_topic(tokens, topic)
                .await
                .map_err(boxed)
        })
    }

    fn unsubscribe_from_topic<'a>(
        &'a self,
        tokens: &'a [String],
        topic: &'a str,
    ) -> BoxFuture<'a, TopicManagementResult, Self::Error> {
        Box::pin(async move {
            self.0
                .unsubscribe_from_topic(tokens, topic)
                .await
                .map_err(boxed)
        })
    }
}

const DISABLED: &str = "Push delivery is disabled";

/// Stand-in used when no push provider is configured. Every send reports an
/// unsuccessful outcome, so records end up `failed` instead of stuck in `sending`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledPushDelivery;

impl PushDelivery for DisabledPushDelivery {
    type Error = BoxedError;

    fn send_to_multiple_devices<'a>(
        &'a self,
        tokens: &'a [String],
        _notification: &'a Notification,
        _extra_data: &'a Map<String, Value>,
    ) -> BoxFuture<'a, MulticastResult, Self::Error> {
        Box::pin(async move {
            Ok(MulticastResult {
                failure_count: tokens.len(),
                ..MulticastResult::rejected(DISABLED)
            })
        })
    }

    fn send_to_device<'a>(
        &'a self,
        _token: &'a str,
        _notification: &'a Notification,
        _extra_data: &'a Map<String, Value>,
    ) -> BoxFuture<'a, SendResult, Self::Error> {
        Box::pin(async move { Ok(SendResult::failed(DISABLED)) })
    }

    fn send_to_topic<'a>(
        &'a self,
        _topic: &'a str,
        _notification: &'a Notification,
        _extra_data: &'a Map<String, Value>,
    ) -> BoxFuture<'a, SendResult, Self::Error> {
        Box::pin(async move { Ok(SendResult::failed(DISABLED)) })
    }

    fn subscribe_to_topic<'a>(
        &'a self,
        tokens: &'a [String],
        _topic: &'a str,
    ) -> BoxFuture<'a, TopicManagementResult, Self::Error> {
        Box::pin(async move { Ok(all_rejected(tokens)) })
    }

    fn unsubscribe_from_topic<'a>(
        &'a self,
        tokens: &'a [String],
        _topic: &'a str,
    ) -> BoxFuture<'a, TopicManagementResult, Self::Error> {
        Box::pin(async move { Ok(all_rejected(tokens)) })
    }
}

fn all_rejected(tokens: &[String]) -> TopicManagementResult {
    TopicManagementResult {
        success_count: 0,
        failure_count: tokens.len(),
        errors: (0..tokens.len())
            .map(|index| TopicManagementError {
                index,
                reason: DISABLED.to_string(),
            })
            .collect(),
    }
}
