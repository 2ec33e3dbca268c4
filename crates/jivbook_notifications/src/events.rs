//! Domain events that produce a notification for one user

use jivbook_common::models::{
    NotificationCategory, NotificationContent, NotificationPriority, NotificationType,
};
use serde::{Deserialize, Serialize};

/// An application event, as posted by the other backend modules.
///
/// Serialized as `{"eventType": "new_message", "eventData": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "eventType", content = "eventData", rename_all = "snake_case")]
pub enum NotificationEvent {
    #[serde(rename_all = "camelCase")]
    NewMessage {
        recipient_id: String,
        sender_id: String,
        sender_name: String,
        chat_id: String,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    PetInquiry {
        owner_id: String,
        inquirer_id: String,
        inquirer_name: String,
        pet_id: String,
        pet_title: String,
    },
    #[serde(rename_all = "camelCase")]
    NewFollower {
        followed_user_id: String,
        follower_id: String,
        follower_name: String,
    },
    #[serde(rename_all = "camelCase")]
    PostLiked {
        post_owner_id: String,
        post_id: String,
        liker_id: String,
        liker_name: String,
    },
}

impl NotificationEvent {
    pub fn name(&self) -> &'static str {
        match self {
            NotificationEvent::NewMessage { .. } => "new_message",
            NotificationEvent::PetInquiry { .. } => "pet_inquiry",
            NotificationEvent::NewFollower { .. } => "new_follower",
            NotificationEvent::PostLiked { .. } => "post_liked",
        }
    }

    /// The user the notification goes to.
    pub fn recipient(&self) -> &str {
        match self {
            NotificationEvent::NewMessage { recipient_id, .. } => recipient_id,
            NotificationEvent::PetInquiry { owner_id, .. } => owner_id,
            NotificationEvent::NewFollower {
                followed_user_id, ..
            } => followed_user_id,
            NotificationEvent::PostLiked { post_owner_id, .. } => post_owner_id,
        }
    }

    pub fn content(&self) -> NotificationContent {
        match self {
            NotificationEvent::NewMessage {
                sender_id,
                sender_name,
                chat_id,
                message,
                ..
            } => NotificationContent::new(
                format!("New message from {}", sender_name),
                message.clone(),
                NotificationType::Chat,
            )
            .with_data("chatId", chat_id.as_str())
            .with_data("senderId", sender_id.as_str())
            .with_action_url(format!("/chat/{}", chat_id)),

            NotificationEvent::PetInquiry {
                inquirer_id,
                inquirer_name,
                pet_id,
                pet_title,
                ..
            } => NotificationContent::new(
                "New Pet Inquiry",
                format!("{} is interested in your {}", inquirer_name, pet_title),
                NotificationType::PetInquiry,
            )
            .with_data("petId", pet_id.as_str())
            .with_data("inquirerId", inquirer_id.as_str())
            .with_action_url(format!("/pets/{}", pet_id)),

            NotificationEvent::NewFollower {
                follower_id,
                follower_name,
                ..
            } => NotificationContent::new(
                "New Follower",
                format!("{} started following you", follower_name),
                NotificationType::Follow,
            )
            .with_category(NotificationCategory::Success)
            .with_priority(NotificationPriority::Low)
            .with_data("followerId", follower_id.as_str())
            .with_action_url(format!("/profile/{}", follower_id)),

            NotificationEvent::PostLiked {
                post_id,
                liker_id,
                liker_name,
                ..
            } => NotificationContent::new(
                "Post Liked",
                format!("{} liked your post", liker_name),
                NotificationType::Post,
            )
            .with_priority(NotificationPriority::Low)
            .with_data("postId", post_id.as_str())
            .with_data("likerId", liker_id.as_str())
            .with_action_url(format!("/posts/{}", post_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_message_event() {
        let event: NotificationEvent = serde_json::from_value(json!({
            "eventType": "new_message",
            "eventData": {
                "recipientId": "u2",
                "senderId": "u1",
                "senderName": "Asha",
                "chatId": "c-42",
                "message": "Is the puppy still available?"
            }
        }))
        .unwrap();

        assert_eq!(event.name(), "new_message");
        assert_eq!(event.recipient(), "u2");
        let content = event.content();
        assert_eq!(content.title, "New message from Asha");
        assert_eq!(content.body, "Is the puppy still available?");
        assert_eq!(content.notification_type, NotificationType::Chat);
        assert_eq!(content.priority, NotificationPriority::Normal);
        assert_eq!(content.action_url.as_deref(), Some("/chat/c-42"));
        assert_eq!(content.data["senderId"], json!("u1"));
    }

    #[test]
    fn test_social_events_are_low_priority() {
        let follow = NotificationEvent::NewFollower {
            followed_user_id: "u2".into(),
            follower_id: "u9".into(),
            follower_name: "Ravi".into(),
        };
        let content = follow.content();
        assert_eq!(content.body, "Ravi started following you");
        assert_eq!(content.category, NotificationCategory::Success);
        assert_eq!(content.priority, NotificationPriority::Low);
        assert_eq!(content.action_url.as_deref(), Some("/profile/u9"));

        let like = NotificationEvent::PostLiked {
            post_owner_id: "u2".into(),
            post_id: "p-1".into(),
            liker_id: "u9".into(),
            liker_name: "Ravi".into(),
        };
        assert_eq!(like.recipient(), "u2");
        assert_eq!(like.content().notification_type, NotificationType::Post);
        assert_eq!(like.content().priority, NotificationPriority::Low);
    }

    #[test]
    fn test_pet_inquiry_text() {
        let event = NotificationEvent::PetInquiry {
            owner_id: "u2".into(),
            inquirer_id: "u3".into(),
            inquirer_name: "Meera".into(),
            pet_id: "p-7".into(),
            pet_title: "Golden Retriever puppy".into(),
        };
        let content = event.content();
        assert_eq!(content.title, "New Pet Inquiry");
        assert_eq!(content.body, "Meera is interested in your Golden Retriever puppy");
        assert_eq!(content.action_url.as_deref(), Some("/pets/p-7"));
        assert!(content.validate().is_ok());
    }

    #[test]
    fn test_unknown_event_type_is_rejected() {
        let parsed = serde_json::from_value::<NotificationEvent>(json!({
            "eventType": "pet_adopted",
            "eventData": {}
        }));
        assert!(parsed.is_err());
    }
}
