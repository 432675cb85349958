use crate::support::*;
use dunktank::ProfileView;

#[tokio::test]
async fn profile_lists_only_dunked_posts_of_the_user() {
    let harness = Harness::new();
    let alice = harness.users.register("alice", "alice@example.com").await.unwrap();
    harness.users.add_balls(&alice.id).await.unwrap();

    harness.seed_post("old", &alice.id, 1_000, true).await;
    harness.seed_post("hidden", &alice.id, 2_000, false).await;
    harness.seed_post("new", &alice.id, 3_000, true).await;
    harness.seed_post("someone-else", "bob", 4_000, true).await;

    let view = ProfileView::load(&harness.users, &harness.posts, &alice.id, Some(alice.id.as_str()))
        .await
        .unwrap();
    assert_eq!(view.user.username, "alice");
    assert_eq!(view.user.balls, 5);
    assert_eq!(ids(&view.dunked_posts), vec!["new", "old"]);
    assert_eq!(view.dunked_count(), 2);
    assert_eq!(view.avatar_link, format!("/protected/profile/{}", alice.id));
    assert!(view.can_edit);
    assert_ne!(view.joined, "unknown");
}

#[tokio::test]
async fn visitors_cannot_edit() {
    let harness = Harness::new();
    let alice = harness.users.register("alice", "alice@example.com").await.unwrap();

    let visitor = ProfileView::load(&harness.users, &harness.posts, &alice.id, Some("bob"))
        .await
        .unwrap();
    assert!(!visitor.can_edit);
    assert!(visitor.dunked_posts.is_empty());
}

#[tokio::test]
async fn missing_profile_is_not_found() {
    let harness = Harness::new();
    let err = ProfileView::load(&harness.users, &harness.posts, "ghost", None)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}
