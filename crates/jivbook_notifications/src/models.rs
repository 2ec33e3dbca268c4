//! Results and settings of the notification service

use jivbook_common::models::{
    DailyStats, DeliveryStats, Notification, Pagination, TargetFilters, TypeStatusStats,
};
use jivbook_common::services::MulticastResult;
use jivbook_config::NotificationsConfig;
use serde::Serialize;

/// Provider limit for one multicast call.
pub const MAX_BATCH_SIZE: usize = 500;

/// Tunables of [`crate::NotificationService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Tokens per multicast call, always within `1..=500`.
    pub batch_size: usize,
    pub default_page_size: u32,
    /// Device tokens unused for this many days are purged.
    pub token_retention_days: i64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            batch_size: MAX_BATCH_SIZE,
            default_page_size: 20,
            token_retention_days: 30,
        }
    }
}

impl From<&NotificationsConfig> for ServiceSettings {
    fn from(config: &NotificationsConfig) -> Self {
        Self {
            batch_size: config.batch_size.clamp(1, MAX_BATCH_SIZE),
            default_page_size: config.default_page_size.max(1),
            token_retention_days: config.token_retention_days.max(1),
        }
    }
}

/// Who a scheduled notification is replayed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    User(String),
    Broadcast(TargetFilters),
}

/// Outcome of a send operation.
///
/// `success` mirrors the final status of `notification`: `true` iff it ended `sent`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SendReport {
    pub success: bool,
    pub message: String,
    pub notification: Notification,
    pub delivery_stats: DeliveryStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

/// Counters of one scheduled-notification pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ProcessReport {
    /// Due records picked up.
    pub processed: usize,
    /// Replays that ended with at least one delivery.
    pub delivered: usize,
    /// Replays that completed without a delivery (no devices, every token failed).
    pub undelivered: usize,
    /// Replays that errored; those records are marked `failed`.
    pub errors: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UserNotifications {
    pub notifications: Vec<Notification>,
    pub pagination: Pagination,
    pub unread_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NotificationListing {
    pub notifications: Vec<Notification>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NotificationAnalytics {
    pub analytics: Vec<TypeStatusStats>,
    pub daily_stats: Vec<DailyStats>,
    /// Window length in days.
    pub date_range: i64,
}

/// Running totals across the batches of one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryTally {
    pub batches: usize,
    pub successful: i64,
    pub failed: i64,
    pub first_message_id: Option<String>,
    pub last_error: Option<String>,
}

impl DeliveryTally {
    /// Adds one batch of `batch_len` tokens.
    ///
    /// An `Err` counts the whole batch as failed. Every batch adds exactly
    /// `batch_len` to `successful + failed`.
    pub fn record(&mut self, batch_len: usize, outcome: Result<&MulticastResult, String>) {
        self.batches += 1;
        match outcome {
            Ok(result) => {
                let delivered = result.success_count.min(batch_len);
                self.successful += delivered as i64;
                self.failed += (batch_len - delivered) as i64;
                if self.first_message_id.is_none() {
                    self.first_message_id = result
                        .responses
                        .iter()
                        .find_map(|response| response.message_id.clone());
                }
                if let Some(error) = &result.error {
                    self.last_error = Some(error.clone());
                }
            }
            Err(error) => {
                self.failed += batch_len as i64;
                self.last_error = Some(error);
            }
        }
    }

    pub fn delivered(&self) -> bool {
        self.successful > 0
    }

    pub fn stats(&self) -> DeliveryStats {
        DeliveryStats {
            total_targeted: self.successful + self.failed,
            successful_deliveries: self.successful,
            failed_deliveries: self.failed,
            ..DeliveryStats::default()
        }
    }

    pub fn summary(&self) -> String {
        let total = self.successful + self.failed;
        match (&self.last_error, self.delivered()) {
            (_, true) => format!("Delivered to {} of {} device(s)", self.successful, total),
            (Some(error), false) => format!("Delivery failed: {}", error),
            (None, false) => format!("Delivery failed for all {} device(s)", total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jivbook_common::services::{DeliveryFailure, TokenSendResponse};

    #[test]
    fn test_settings_clamp_batch_size() {
        let large = NotificationsConfig {
            batch_size: 10_000,
            ..NotificationsConfig::default()
        };
        assert_eq!(ServiceSettings::from(&large).batch_size, MAX_BATCH_SIZE);

        let zero = NotificationsConfig {
            batch_size: 0,
            ..NotificationsConfig::default()
        };
        assert_eq!(ServiceSettings::from(&zero).batch_size, 1);
    }

    #[test]
    fn test_tally_keeps_first_message_id_and_last_error() {
        let mut tally = DeliveryTally::default();
        let first = MulticastResult::from_responses(vec![
            TokenSendResponse::failed(
                "a",
                DeliveryFailure {
                    code: "UNAVAILABLE".into(),
                    message: "try later".into(),
                    invalid_token: false,
                },
            ),
            TokenSendResponse::delivered("b", "projects/p/messages/1"),
        ]);
        tally.record(2, Ok(&first));
        tally.record(3, Err("connection reset".into()));

        assert_eq!(tally.batches, 2);
        assert_eq!(tally.successful, 1);
        assert_eq!(tally.failed, 4);
        assert_eq!(tally.first_message_id.as_deref(), Some("projects/p/messages/1"));
        assert_eq!(tally.last_error.as_deref(), Some("connection reset"));
        assert_eq!(tally.stats().total_targeted, 5);
        assert_eq!(tally.summary(), "Delivered to 1 of 5 device(s)");
    }

    #[test]
    fn test_tally_summary_without_deliveries() {
        let mut tally = DeliveryTally::default();
        tally.record(4, Ok(&MulticastResult::rejected("Push delivery is disabled")));
        assert!(!tally.delivered());
        assert_eq!(tally.failed, 4);
        assert_eq!(tally.summary(), "Delivery failed: Push delivery is disabled");
    }
}
