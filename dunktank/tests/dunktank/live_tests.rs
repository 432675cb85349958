use crate::support::*;
use std::time::Duration;
use tokio::time::timeout;

const QUIET_PERIOD: Duration = Duration::from_millis(50);
const UPDATE_DEADLINE: Duration = Duration::from_secs(2);

#[tokio::test]
async fn feed_follows_create_like_and_delete() {
    let harness = Harness::new();
    harness.seed_post("old", "u1", 1_000, false).await;

    let mut feed = harness.posts.watch_posts(&PostFilter::All);
    let initial = feed.next().await.unwrap().unwrap();
    assert_eq!(ids(&initial), vec!["old"]);

    let created = harness.posts.create_post("fresh", "u2").await.unwrap();
    let after_create = timeout(UPDATE_DEADLINE, feed.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(ids(&after_create), vec![created.id.as_str(), "old"]);

    harness.posts.toggle_like("old", "u2", false).await.unwrap();
    let after_like = timeout(UPDATE_DEADLINE, feed.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(after_like[1].likes, vec!["u2"]);

    harness.posts.delete_post(&created.id, &|_: &str| true).await.unwrap();
    let after_delete = timeout(UPDATE_DEADLINE, feed.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(ids(&after_delete), vec!["old"]);
}

#[tokio::test]
async fn burst_of_writes_is_coalesced() {
    let harness = Harness::new();
    let mut feed = harness.posts.watch_posts(&PostFilter::All);
    assert!(feed.next().await.unwrap().unwrap().is_empty());

    for index in 0..10 {
        harness.seed_post(&format!("p{index}"), "u1", index, false).await;
    }
    let update = timeout(UPDATE_DEADLINE, feed.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(update.len(), 10);
    assert_eq!(update[0].id, "p9");

    // Nothing left queued once the burst has been folded into one result.
    assert!(timeout(QUIET_PERIOD, feed.next()).await.is_err());
}

#[tokio::test]
async fn profile_feed_only_moves_when_a_post_is_dunked() {
    let harness = Harness::new();
    harness.seed_post("p1", "alice", 1_000, false).await;
    let mut dunked = harness.posts.watch_posts(&PostFilter::dunked_by("alice"));
    assert!(dunked.next().await.unwrap().unwrap().is_empty());

    harness.posts.toggle_like("p1", "bob", false).await.unwrap();
    harness.seed_post("p2", "bob", 2_000, true).await;
    harness.users.register("carol", "carol@example.com").await.unwrap();
    assert!(timeout(QUIET_PERIOD, dunked.next()).await.is_err());

    let mut rng = StdRng::seed_from_u64(17);
    harness.dunk_until_success("p1", &mut rng).await;
    let update = timeout(UPDATE_DEADLINE, dunked.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(ids(&update), vec!["p1"]);
    assert_eq!(update[0].likes, vec!["bob"]);
}

#[tokio::test]
async fn outage_surfaces_as_error_and_feed_recovers() {
    let harness = Harness::new();
    let mut feed = harness.posts.watch_posts(&PostFilter::All);
    assert!(feed.next().await.unwrap().unwrap().is_empty());

    harness.seed_post("p1", "u1", 1_000, false).await;
    harness.store.set_offline(true);
    let failed = timeout(UPDATE_DEADLINE, feed.next()).await.unwrap().unwrap();
    assert!(matches!(failed, Err(RepoError::Redis(_))));

    harness.store.set_offline(false);
    harness.seed_post("p2", "u1", 2_000, false).await;
    let recovered = timeout(UPDATE_DEADLINE, feed.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(ids(&recovered), vec!["p2", "p1"]);
}

#[tokio::test]
async fn recovery_is_reported_even_when_the_result_is_unchanged() {
    let harness = Harness::new();
    let mut dunked = harness.posts.watch_posts(&PostFilter::dunked_by("alice"));
    assert!(dunked.next().await.unwrap().unwrap().is_empty());

    harness.seed_post("b1", "bob", 1_000, true).await;
    harness.store.set_offline(true);
    let failed = timeout(UPDATE_DEADLINE, dunked.next()).await.unwrap().unwrap();
    assert!(failed.is_err());

    harness.store.set_offline(false);
    harness.seed_post("b2", "bob", 2_000, true).await;
    let recovered = timeout(UPDATE_DEADLINE, dunked.next()).await.unwrap().unwrap().unwrap();
    assert!(recovered.is_empty());

    // Back to normal: unrelated writes are skipped again.
    harness.seed_post("b3", "bob", 3_000, true).await;
    assert!(timeout(QUIET_PERIOD, dunked.next()).await.is_err());
}
