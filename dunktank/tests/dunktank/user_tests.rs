use crate::support::*;
use dunktank::{BALLS_PER_TOP_UP, USERS};

#[tokio::test]
async fn username_exists_only_after_registration() {
    let harness = Harness::new();
    assert!(!harness.users.username_exists("peter").await.unwrap());

    let user = harness.users.register("peter", "peter@example.com").await.unwrap();
    assert_eq!(user.balls, 0);
    assert_eq!(user.avatar, None);

    assert!(harness.users.username_exists("peter").await.unwrap());
    assert!(!harness.users.username_exists("Peter").await.unwrap());
    assert!(!harness.users.username_exists("pete").await.unwrap());
}

#[tokio::test]
async fn taken_username_is_refused() {
    let harness = Harness::new();
    harness.users.register("peter", "peter@example.com").await.unwrap();

    let err = harness.users.register("peter", "other@example.com").await.unwrap_err();
    assert!(matches!(err, RepoError::UsernameTaken { ref username } if username == "peter"));
    assert_eq!(harness.store.len(USERS), 1);
}

#[tokio::test]
async fn invalid_registration_reports_every_field() {
    let harness = Harness::new();
    let err = harness.users.register("a!", "not-an-email").await.unwrap_err();
    let RepoError::Validation(validation) = err else {
        panic!("expected validation error, got {err:?}");
    };
    let fields: Vec<_> = validation.issues.iter().map(|issue| issue.field.as_str()).collect();
    assert!(fields.contains(&"username"));
    assert!(fields.contains(&"email"));
    assert!(harness.store.is_empty(USERS));
}

#[tokio::test]
async fn registered_user_round_trips() {
    let harness = Harness::new();
    let user = harness.users.register("dunk_master", "dm@example.com").await.unwrap();

    assert_eq!(harness.users.get_user(&user.id).await.unwrap(), Some(user.clone()));
    assert_eq!(harness.users.get_user("nobody").await.unwrap(), None);
    assert!(harness.users.require_user("nobody").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn add_balls_tops_up_by_five() {
    let harness = Harness::new();
    let user = harness.users.register("thrower", "t@example.com").await.unwrap();

    let once = harness.users.add_balls(&user.id).await.unwrap();
    assert_eq!(once.balls, BALLS_PER_TOP_UP as u64);
    let twice = harness.users.add_balls(&user.id).await.unwrap();
    assert_eq!(twice.balls, 10);

    assert!(harness.users.add_balls("nobody").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn avatar_must_be_a_url() {
    let harness = Harness::new();
    let user = harness.users.register("pictured", "p@example.com").await.unwrap();

    let err = harness.users.update_avatar(&user.id, "not a url").await.unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert_eq!(harness.users.require_user(&user.id).await.unwrap().avatar, None);

    let updated = harness
        .users
        .update_avatar(&user.id, "https://cdn.example.com/a.png")
        .await
        .unwrap();
    assert_eq!(updated.avatar.as_deref(), Some("https://cdn.example.com/a.png"));
}

#[tokio::test]
async fn username_lookup_fails_when_store_is_down() {
    let harness = Harness::new();
    harness.store.set_offline(true);
    assert!(matches!(
        harness.users.username_exists("peter").await,
        Err(RepoError::Redis(_))
    ));
    assert!(harness.users.register("peter", "peter@example.com").await.is_err());
}
