use jivbook_common::models::NotificationSettings;

use crate::repositories::{SqlUserDirectory, UserDirectory, UserFilter, UserProfile, UserRole};
use crate::DbClient;

async fn directory() -> SqlUserDirectory {
    let client = DbClient::from_url("sqlite::memory:").await.unwrap();
    let directory = SqlUserDirectory::new(client);
    directory.init_schema().await.unwrap();

    for (id, is_admin, is_premium, categories) in [
        ("u1", true, false, vec!["dogs"]),
        ("u2", false, true, vec!["cats", "birds"]),
        ("u3", false, true, vec![]),
        ("u4", false, false, vec!["dogs", "fish"]),
    ] {
        directory
            .upsert_user(UserProfile {
                id: id.to_string(),
                is_admin,
                is_premium,
                preferred_pet_categories: categories.into_iter().map(str::to_string).collect(),
            })
            .await
            .unwrap();
    }
    directory
}

#[tokio::test]
async fn test_default_filter_matches_everyone() {
    let directory = directory().await;
    let ids = directory.find_user_ids(&UserFilter::default()).await.unwrap();
    assert_eq!(ids, vec!["u1", "u2", "u3", "u4"]);
}

#[tokio::test]
async fn test_role_and_category_filters_combine() {
    let directory = directory().await;

    let admins = directory
        .find_user_ids(&UserFilter {
            role: Some(UserRole::Admin),
            pet_categories: vec![],
        })
        .await
        .unwrap();
    assert_eq!(admins, vec!["u1"]);

    let dog_people = directory
        .find_user_ids(&UserFilter {
            role: None,
            pet_categories: vec!["dogs".to_string(), "birds".to_string()],
        })
        .await
        .unwrap();
    assert_eq!(dog_people, vec!["u1", "u2", "u4"]);

    let premium_cat_people = directory
        .find_user_ids(&UserFilter {
            role: Some(UserRole::Premium),
            pet_categories: vec!["cats".to_string()],
        })
        .await
        .unwrap();
    assert_eq!(premium_cat_people, vec!["u2"]);
}

#[tokio::test]
async fn test_upsert_replaces_categories() {
    let directory = directory().await;
    directory
        .upsert_user(UserProfile {
            id: "u4".to_string(),
            is_admin: false,
            is_premium: false,
            preferred_pet_categories: vec!["reptiles".to_string()],
        })
        .await
        .unwrap();

    let dogs = directory
        .find_user_ids(&UserFilter {
            role: None,
            pet_categories: vec!["dogs".to_string()],
        })
        .await
        .unwrap();
    assert_eq!(dogs, vec!["u1"]);
}

#[tokio::test]
async fn test_notification_settings_are_stored_per_user() {
    let directory = directory().await;
    assert_eq!(directory.find_notification_settings("u1").await.unwrap(), None);

    let mut settings = NotificationSettings {
        enable_email_notifications: false,
        ..NotificationSettings::default()
    };
    settings.notification_types.promotion = true;
    directory.save_notification_settings("u1", &settings).await.unwrap();
    assert_eq!(
        directory.find_notification_settings("u1").await.unwrap(),
        Some(settings.clone())
    );

    settings.enable_push_notifications = false;
    directory.save_notification_settings("u1", &settings).await.unwrap();
    let stored = directory.find_notification_settings("u1").await.unwrap().unwrap();
    assert!(!stored.enable_push_notifications);
    assert!(stored.notification_types.promotion);

    assert_eq!(directory.find_notification_settings("u2").await.unwrap(), None);
}
