//! Builds FCM messages from notification records

use std::collections::HashMap;

use jivbook_common::models::{Notification, NotificationPriority, NotificationType};
use serde_json::{Map, Value};

use crate::models::{
    AndroidConfig, AndroidMessagePriority, AndroidNotification, AndroidNotificationPriority,
    ApnsConfig, ApnsFcmOptions, ApnsPayload, Aps, ApsAlert, FcmMessage, Message,
    Notification as FcmNotification, WebpushAction, WebpushConfig, WebpushFcmOptions,
    WebpushNotification,
};

const DEFAULT_SOUND: &str = "default";

/// Who a message is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    Token(&'a str),
    Topic(&'a str),
}

pub fn android_priority(priority: NotificationPriority) -> AndroidMessagePriority {
    match priority {
        NotificationPriority::Low | NotificationPriority::Normal => AndroidMessagePriority::Normal,
        NotificationPriority::High | NotificationPriority::Critical => AndroidMessagePriority::High,
    }
}

pub fn android_notification_priority(
    priority: NotificationPriority,
) -> AndroidNotificationPriority {
    match priority {
        NotificationPriority::Low => AndroidNotificationPriority::PriorityLow,
        NotificationPriority::Normal => AndroidNotificationPriority::PriorityDefault,
        NotificationPriority::High => AndroidNotificationPriority::PriorityHigh,
        NotificationPriority::Critical => AndroidNotificationPriority::PriorityMax,
    }
}

/// Android notification channel the clients register per business type.
pub fn channel_id(notification_type: NotificationType) -> &'static str {
    match notification_type {
        NotificationType::Chat => "chat_channel",
        NotificationType::PetInquiry => "pet_channel",
        NotificationType::Follow | NotificationType::Post => "social_channel",
        NotificationType::Promotion => "marketing_channel",
        NotificationType::Admin | NotificationType::System => "system_channel",
        NotificationType::Custom => "default_channel",
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The string data map delivered to the client app.
///
/// Payload entries come first, then `extra_data`, then the reserved keys
/// `notificationId`, `type` and `actionUrl`, so later entries win on collision.
pub fn data_payload(
    notification: &Notification,
    extra_data: &Map<String, Value>,
) -> HashMap<String, String> {
    let mut data: HashMap<String, String> = notification
        .data
        .iter()
        .chain(extra_data.iter())
        .map(|(key, value)| (key.clone(), stringify(value)))
        .collect();

    data.insert("notificationId".to_string(), notification.id.clone());
    data.insert(
        "type".to_string(),
        notification.notification_type.as_str().to_string(),
    );
    if let Some(action_url) = &notification.action_url {
        data.insert("actionUrl".to_string(), action_url.clone());
    }
    data
}

/// Builds the complete v1 message for `target`
///
/// `badge` is the recipient's unread count and only makes sense for
/// single-device sends.
pub fn build_message(
    target: Target<'_>,
    notification: &Notification,
    extra_data: &Map<String, Value>,
    badge: Option<i64>,
    web_icon: &str,
) -> FcmMessage {
    let (token, topic) = match target {
        Target::Token(token) => (Some(token.to_string()), None),
        Target::Topic(topic) => (None, Some(topic.to_string())),
    };

    let android = AndroidConfig {
        priority: android_priority(notification.priority),
        notification: AndroidNotification {
            channel_id: channel_id(notification.notification_type).to_string(),
            notification_priority: android_notification_priority(notification.priority),
            sound: DEFAULT_SOUND.to_string(),
            default_vibrate_timings: true,
            image: notification.image.clone(),
        },
    };

    let apns = ApnsConfig {
        payload: ApnsPayload {
            aps: Aps {
                alert: ApsAlert {
                    title: notification.title.clone(),
                    body: notification.body.clone(),
                },
                sound: DEFAULT_SOUND.to_string(),
                badge,
            },
        },
        fcm_options: notification
            .image
            .clone()
            .map(|image| ApnsFcmOptions { image }),
    };

    let actions = match notification.action_url {
        Some(_) => vec![WebpushAction {
            action: "open".to_string(),
            title: "Open".to_string(),
        }],
        None => Vec::new(),
    };
    let webpush = WebpushConfig {
        notification: WebpushNotification {
            title: notification.title.clone(),
            body: notification.body.clone(),
            icon: web_icon.to_string(),
            image: notification.image.clone(),
            require_interaction: notification.priority.is_urgent(),
            actions,
        },
        fcm_options: notification
            .action_url
            .as_deref()
            .filter(|url| url.starts_with("https://"))
            .map(|link| WebpushFcmOptions {
                link: link.to_string(),
            }),
    };

    FcmMessage {
        message: Message {
            token,
            topic,
            notification: Some(FcmNotification {
                title: notification.title.clone(),
                body: notification.body.clone(),
                image: notification.image.clone(),
            }),
            data: data_payload(notification, extra_data),
            android: Some(android),
            apns: Some(apns),
            webpush: Some(webpush),
        },
    }
}
