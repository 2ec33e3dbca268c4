use chrono::{Duration, Utc};

use crate::repositories::device_token::{DeviceInfo, DeviceRegistration, DeviceToken, Platform};
use crate::repositories::{DeviceTokenRepository, SqlDeviceTokenRepository};
use crate::DbClient;

async fn repository() -> SqlDeviceTokenRepository {
    let client = DbClient::from_url("sqlite::memory:").await.unwrap();
    let repository = SqlDeviceTokenRepository::new(client);
    repository.init_schema().await.unwrap();
    repository
}

fn registration(
    user_id: &str,
    token: &str,
    device_id: &str,
    platform: Platform,
) -> DeviceRegistration {
    DeviceRegistration {
        user_id: user_id.to_string(),
        token: token.to_string(),
        platform,
        device_id: device_id.to_string(),
        device_info: DeviceInfo {
            model: Some("Pixel 8".to_string()),
            os_version: Some("14".to_string()),
            ..DeviceInfo::default()
        },
    }
}

/// Token values in sorted order; records created in the same millisecond have no stable order.
fn tokens_of(devices: &[DeviceToken]) -> Vec<&str> {
    let mut tokens: Vec<&str> = devices.iter().map(|d| d.token.as_str()).collect();
    tokens.sort_unstable();
    tokens
}

#[tokio::test]
async fn test_new_token_for_same_device_replaces_old_one() {
    let repo = repository().await;

    let first = repo
        .register_device(registration("U", "tok-A", "D1", Platform::Android))
        .await
        .unwrap();
    assert!(first.is_active);

    repo.register_device(registration("U", "tok-B", "D1", Platform::Android))
        .await
        .unwrap();

    let old = repo.find_by_token("tok-A").await.unwrap().unwrap();
    assert!(!old.is_active);
    let active = repo.find_active_by_user("U").await.unwrap();
    assert_eq!(tokens_of(&active), vec!["tok-B"]);
}

#[tokio::test]
async fn test_only_latest_of_many_registrations_is_active() {
    let repo = repository().await;

    for i in 0..6 {
        repo.register_device(registration("U", &format!("tok-{}", i), "D1", Platform::Ios))
            .await
            .unwrap();
    }
    // A second device keeps its own token
    repo.register_device(registration("U", "tablet", "D2", Platform::Ios))
        .await
        .unwrap();

    let active = repo.find_active_by_user("U").await.unwrap();
    assert_eq!(tokens_of(&active), vec!["tablet", "tok-5"]);
}

#[tokio::test]
async fn test_reregistering_known_token_moves_and_reactivates_it() {
    let repo = repository().await;

    let original = repo
        .register_device(registration("U1", "shared", "D1", Platform::Android))
        .await
        .unwrap();
    repo.unregister_device("U1", "shared").await.unwrap();

    let moved = repo
        .register_device(registration("U2", "shared", "D9", Platform::Web))
        .await
        .unwrap();

    assert_eq!(moved.id, original.id);
    let stored = repo.find_by_token("shared").await.unwrap().unwrap();
    assert!(stored.is_active);
    assert_eq!(stored.user_id, "U2");
    assert_eq!(stored.platform, Platform::Web);
    assert_eq!(stored.device_info.model.as_deref(), Some("Pixel 8"));
    assert!(repo.find_active_by_user("U1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unregister_is_scoped_and_quiet_when_missing() {
    let repo = repository().await;
    repo.register_device(registration("U", "tok", "D1", Platform::Android))
        .await
        .unwrap();

    assert!(!repo.unregister_device("someone-else", "tok").await.unwrap());
    assert!(!repo.unregister_device("U", "unknown").await.unwrap());
    assert!(repo.find_by_token("tok").await.unwrap().unwrap().is_active);

    assert!(repo.unregister_device("U", "tok").await.unwrap());
    let stored = repo.find_by_token("tok").await.unwrap().unwrap();
    assert!(!stored.is_active);
}

#[tokio::test]
async fn test_find_active_by_users_with_platform_filter() {
    let repo = repository().await;
    repo.register_device(registration("U1", "u1-android", "D1", Platform::Android))
        .await
        .unwrap();
    repo.register_device(registration("U1", "u1-web", "D2", Platform::Web))
        .await
        .unwrap();
    repo.register_device(registration("U2", "u2-ios", "D1", Platform::Ios))
        .await
        .unwrap();
    repo.register_device(registration("U3", "u3-android", "D1", Platform::Android))
        .await
        .unwrap();

    let users = vec!["U1".to_string(), "U2".to_string()];

    let all = repo.find_active_by_users(&users, &[]).await.unwrap();
    assert_eq!(tokens_of(&all), vec!["u1-android", "u1-web", "u2-ios"]);

    let mobile = repo
        .find_active_by_users(&users, &[Platform::Android, Platform::Ios])
        .await
        .unwrap();
    assert_eq!(tokens_of(&mobile), vec!["u1-android", "u2-ios"]);

    assert!(repo.find_active_by_users(&[], &[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_deactivate_tokens_only_touches_listed_tokens() {
    let repo = repository().await;
    for (token, device) in [("a", "D1"), ("b", "D2"), ("c", "D3")] {
        repo.register_device(registration("U", token, device, Platform::Android))
            .await
            .unwrap();
    }

    let changed = repo
        .deactivate_tokens(&["a".to_string(), "c".to_string(), "missing".to_string()])
        .await
        .unwrap();

    assert_eq!(changed, 2);
    let active = repo.find_active_by_user("U").await.unwrap();
    assert_eq!(tokens_of(&active), vec!["b"]);
}

#[tokio::test]
async fn test_delete_stale_removes_inactive_and_unused_tokens() {
    let repo = repository().await;
    repo.register_device(registration("U", "fresh", "D1", Platform::Android))
        .await
        .unwrap();
    repo.register_device(registration("U", "retired", "D2", Platform::Android))
        .await
        .unwrap();
    repo.unregister_device("U", "retired").await.unwrap();

    let deleted = repo
        .delete_stale(Utc::now() - Duration::days(30))
        .await
        .unwrap();
    assert_eq!(deleted, 1);
    assert!(repo.find_by_token("retired").await.unwrap().is_none());
    assert!(repo.find_by_token("fresh").await.unwrap().is_some());

    // Once the cutoff passes its last use, an active token goes too
    let deleted = repo
        .delete_stale(Utc::now() + Duration::minutes(1))
        .await
        .unwrap();
    assert_eq!(deleted, 1);
    assert!(repo.find_by_token("fresh").await.unwrap().is_none());
}
