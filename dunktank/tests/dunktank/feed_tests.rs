use crate::support::*;
use rand::Rng;

#[tokio::test]
async fn created_post_appears_in_feed_anonymous_and_unliked() {
    let harness = Harness::new();
    let post = harness.posts.create_post("hello tank", "u1").await.unwrap();

    let feed = harness.posts.list_posts(&PostFilter::All).await.unwrap();
    assert_eq!(feed.len(), 1);
    let listed = &feed[0];
    assert_eq!(listed.id, post.id);
    assert_eq!(listed.content, "hello tank");
    assert_eq!(listed.uid, "u1");
    assert!(listed.likes.is_empty());
    assert!(!listed.is_dunked);
    assert_eq!(listed.revealed_author(), None);

    assert_eq!(harness.log.titles(), vec!["Your post was successfully added"]);
}

#[tokio::test]
async fn post_ids_are_unique_uuids() {
    let harness = Harness::new();
    let first = harness.posts.create_post("one", "u1").await.unwrap();
    let second = harness.posts.create_post("two", "u1").await.unwrap();
    assert_ne!(first.id, second.id);
    assert!(dunktank::validators::is_valid_uuid(&first.id));
}

#[tokio::test]
async fn empty_content_is_accepted() {
    let harness = Harness::new();
    let post = harness.posts.create_post("", "u1").await.unwrap();
    assert_eq!(harness.posts.get_post(&post.id).await.unwrap().unwrap().content, "");
}

#[tokio::test]
async fn feed_is_newest_first() {
    let harness = Harness::new();
    harness.seed_post("old", "u1", 1_000, false).await;
    harness.seed_post("new", "u2", 3_000, true).await;
    harness.seed_post("mid", "u1", 2_000, false).await;

    let feed = harness.posts.list_posts(&PostFilter::All).await.unwrap();
    assert_eq!(ids(&feed), vec!["new", "mid", "old"]);
}

#[tokio::test]
async fn dunked_by_returns_only_that_authors_dunked_posts() {
    let harness = Harness::new();
    harness.seed_post("a-old", "alice", 1_000, true).await;
    harness.seed_post("a-hidden", "alice", 2_000, false).await;
    harness.seed_post("b-dunked", "bob", 3_000, true).await;
    harness.seed_post("a-new", "alice", 4_000, true).await;

    let dunked = harness.posts.list_posts(&PostFilter::dunked_by("alice")).await.unwrap();
    assert_eq!(ids(&dunked), vec!["a-new", "a-old"]);
    assert!(dunked.iter().all(|post| post.uid == "alice" && post.is_dunked));

    let nobody = harness.posts.list_posts(&PostFilter::dunked_by("carol")).await.unwrap();
    assert!(nobody.is_empty());
}

#[tokio::test]
async fn toggle_like_adds_then_removes() {
    let harness = Harness::new();
    let post = harness.posts.create_post("like me", "u1").await.unwrap();

    let liked = harness.posts.toggle_like(&post.id, "u2", false).await.unwrap();
    assert!(liked);
    let after_like = harness.posts.get_post(&post.id).await.unwrap().unwrap();
    assert_eq!(after_like.likes, vec!["u2"]);

    let liked = harness.posts.toggle_like(&post.id, "u2", true).await.unwrap();
    assert!(!liked);
    let after_unlike = harness.posts.get_post(&post.id).await.unwrap().unwrap();
    assert!(after_unlike.likes.is_empty());
}

#[tokio::test]
async fn liking_twice_keeps_one_entry() {
    let harness = Harness::new();
    let post = harness.posts.create_post("like me", "u1").await.unwrap();

    harness.posts.toggle_like(&post.id, "u2", false).await.unwrap();
    harness.posts.toggle_like(&post.id, "u2", false).await.unwrap();
    harness.posts.toggle_like(&post.id, "u3", false).await.unwrap();

    let post = harness.posts.get_post(&post.id).await.unwrap().unwrap();
    assert_eq!(post.likes, vec!["u2", "u3"]);
    assert_eq!(post.like_count(), 2);
}

#[tokio::test]
async fn unliking_a_post_never_liked_leaves_likes_alone() {
    let harness = Harness::new();
    let post = harness.posts.create_post("like me", "u1").await.unwrap();
    harness.posts.toggle_like(&post.id, "u2", false).await.unwrap();

    // A stale client can claim a like that is not there.
    let liked = harness.posts.toggle_like(&post.id, "u3", true).await.unwrap();
    assert!(!liked);
    let post = harness.posts.get_post(&post.id).await.unwrap().unwrap();
    assert_eq!(post.likes, vec!["u2"]);
}

#[tokio::test]
async fn toggle_like_on_missing_post_is_not_found() {
    let harness = Harness::new();
    let err = harness.posts.toggle_like("ghost", "u2", false).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(harness.store.is_empty(POSTS));
}

#[tokio::test]
async fn dunk_on_missing_post_is_not_found() {
    let harness = Harness::new();
    let mut rng = StdRng::seed_from_u64(7);
    let err = harness.posts.attempt_dunk_with("ghost", &mut rng).await.unwrap_err();
    assert!(matches!(err, RepoError::NotFound { ref entity_id, .. } if entity_id == "ghost"));
    assert!(harness.log.titles().is_empty());
}

#[tokio::test]
async fn dunk_eventually_lands_and_reveals_author() {
    let harness = Harness::new();
    let post = harness.posts.create_post("who wrote this", "secret-author").await.unwrap();
    harness.log.take();

    let mut rng = StdRng::seed_from_u64(2024);
    let attempts = harness.dunk_until_success(&post.id, &mut rng).await;

    let dunked = harness.posts.get_post(&post.id).await.unwrap().unwrap();
    assert!(dunked.is_dunked);
    assert_eq!(dunked.revealed_author(), Some("secret-author"));

    let titles = harness.log.titles();
    assert_eq!(titles.len(), attempts);
    assert_eq!(titles.last().map(String::as_str), Some("Your dunk attempt was successful"));
    assert!(
        titles[..attempts - 1]
            .iter()
            .all(|title| title == "Your dunk attempt was not successful (you have a 1 in 5 chance)")
    );
}

#[tokio::test]
async fn dunked_post_stays_dunked() {
    let harness = Harness::new();
    harness.seed_post("p1", "u1", 1_000, true).await;

    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..50 {
        let outcome = harness.posts.attempt_dunk_with("p1", &mut rng).await.unwrap();
        assert_eq!(outcome, DunkOutcome::AlreadyDunked);
    }
    assert!(harness.posts.get_post("p1").await.unwrap().unwrap().is_dunked);
    assert!(harness.log.titles().is_empty());
}

#[tokio::test]
async fn missed_dunk_reports_draw_and_leaves_post_hidden() {
    let harness = Harness::new();
    harness.seed_post("p1", "u1", 1_000, false).await;

    let mut rng = StdRng::seed_from_u64(3);
    loop {
        match harness.posts.attempt_dunk_with("p1", &mut rng).await.unwrap() {
            DunkOutcome::Missed { draw, odds } => {
                assert_eq!(odds, 5);
                assert!(draw < 5 && draw != 1);
                assert!(!harness.posts.get_post("p1").await.unwrap().unwrap().is_dunked);
                break;
            }
            DunkOutcome::Dunked => {
                // Reset and keep looking for a miss.
                harness.seed_post("p1", "u1", 1_000, false).await;
            }
            DunkOutcome::AlreadyDunked => panic!("post was reset before this attempt"),
        }
    }
}

#[test]
fn winning_draw_frequency_is_one_in_five() {
    let mut rng = StdRng::seed_from_u64(42);
    let trials = 1_000;
    let wins = (0..trials).filter(|_| rng.gen_range(0..5u32) == 1).count();
    let fraction = wins as f64 / trials as f64;
    assert!((fraction - 0.2).abs() <= 0.05, "win fraction {fraction}");
}

#[tokio::test]
async fn first_attempts_dunk_about_one_post_in_five() {
    let harness = Harness::new();
    let total = 400;
    for index in 0..total {
        harness.seed_post(&format!("p{index}"), "u1", index, false).await;
    }

    let mut rng = StdRng::seed_from_u64(5);
    let mut dunked = 0;
    for index in 0..total {
        if harness.posts.attempt_dunk_with(&format!("p{index}"), &mut rng).await.unwrap() == DunkOutcome::Dunked {
            dunked += 1;
        }
    }
    let fraction = dunked as f64 / total as f64;
    assert!((0.12..=0.28).contains(&fraction), "dunk fraction {fraction}");
}

#[tokio::test]
async fn custom_odds_are_reported_in_miss_message() {
    let store = MemoryStore::new();
    let log = NotificationLog::new();
    let posts = PostRepository::new(store.clone(), log.clone()).with_odds(1_000).unwrap();
    let post = posts.create_post("long odds", "u1").await.unwrap();
    log.take();

    let mut rng = StdRng::seed_from_u64(11);
    if let DunkOutcome::Missed { odds, .. } = posts.attempt_dunk_with(&post.id, &mut rng).await.unwrap() {
        assert_eq!(odds, 1_000);
        assert_eq!(
            log.titles(),
            vec!["Your dunk attempt was not successful (you have a 1 in 1000 chance)"]
        );
    }
}

#[test]
fn odds_must_leave_room_for_a_win() {
    let posts = PostRepository::new(MemoryStore::new(), NotificationLog::new());
    assert!(matches!(posts.with_odds(1), Err(RepoError::InvalidRequest { .. })));
}

#[tokio::test]
async fn declined_delete_changes_nothing() {
    let harness = Harness::new();
    let post = harness.posts.create_post("keep me", "u1").await.unwrap();
    harness.log.take();

    let decline = |_: &str| false;
    let outcome = harness.posts.delete_post(&post.id, &decline).await.unwrap();
    assert_eq!(outcome, dunktank::DeleteOutcome::Declined);
    assert_eq!(harness.posts.get_post(&post.id).await.unwrap(), Some(post));
    assert!(harness.log.titles().is_empty());
}

#[tokio::test]
async fn confirmed_delete_removes_post_and_notifies() {
    let harness = Harness::new();
    let post = harness.posts.create_post("delete me", "u1").await.unwrap();
    harness.log.take();

    let prompts = std::sync::Mutex::new(Vec::new());
    let accept = |prompt: &str| {
        prompts.lock().unwrap().push(prompt.to_string());
        true
    };
    let outcome = harness.posts.delete_post(&post.id, &accept).await.unwrap();

    assert_eq!(outcome, dunktank::DeleteOutcome::Deleted);
    assert_eq!(harness.posts.get_post(&post.id).await.unwrap(), None);
    assert!(harness.posts.list_posts(&PostFilter::All).await.unwrap().is_empty());
    assert_eq!(*prompts.lock().unwrap(), vec![dunktank::posts::DELETE_PROMPT]);

    let notifications = harness.log.take();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].title, "Post deleted!");
    assert_eq!(notifications[0].status, dunktank::NotificationStatus::Info);
}

#[tokio::test]
async fn store_failures_propagate_without_notifications() {
    let harness = Harness::new();
    let post = harness.posts.create_post("before outage", "u1").await.unwrap();
    harness.log.take();
    harness.store.set_offline(true);

    assert!(matches!(
        harness.posts.create_post("during outage", "u1").await,
        Err(RepoError::Redis(_))
    ));
    assert!(harness.posts.list_posts(&PostFilter::All).await.is_err());
    assert!(harness.posts.toggle_like(&post.id, "u2", false).await.is_err());
    let mut rng = StdRng::seed_from_u64(1);
    assert!(harness.posts.attempt_dunk_with(&post.id, &mut rng).await.is_err());
    assert!(harness.posts.delete_post(&post.id, &|_: &str| true).await.is_err());
    assert!(harness.log.titles().is_empty());

    harness.store.set_offline(false);
    assert_eq!(harness.posts.list_posts(&PostFilter::All).await.unwrap().len(), 1);
}
