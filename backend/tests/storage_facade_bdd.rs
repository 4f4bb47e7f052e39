//! Behavioural tests for the storage facade over the in-memory fakes.
//!
//! Steps are synchronous and share one Tokio runtime held by the world, the
//! same way the PostgreSQL suites drive their adapters. Every scenario wires a
//! fresh [`InMemorySocialStore`], so state never leaks between tests.
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use rstest::{fixture, rstest};
use rstest_bdd_macros::{given, then, when};
use social_backend::domain::ports::{AccountCache, StoreError};
use social_backend::domain::{
    Account, AccountId, AccountParts, CallContext, Email, FeedFilter, FeedFilterError, FeedItem,
    InvitationToken, NewAccount, NewPost, PasswordCredential, Role, RoleName, SortDirection,
    Storage, Username,
};
use social_backend::test_support::{InMemoryAccountCache, InMemorySocialStore};
use tokio::runtime::Runtime;

const FIXTURE_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaGhhc2hoYXNoaGFzaA";
const INVITE_TTL: Duration = Duration::from_secs(72 * 60 * 60);

// -----------------------------------------------------------------------------
// World
// -----------------------------------------------------------------------------

struct FacadeWorld {
    runtime: Runtime,
    store: InMemorySocialStore,
    storage: Storage,
    cache: InMemoryAccountCache,
    accounts: HashMap<String, AccountId>,
    last_invite: Option<Result<Account, StoreError>>,
    last_activation: Option<Result<AccountId, StoreError>>,
    last_lookup: Option<Result<Account, StoreError>>,
    last_follow: Option<Result<(), StoreError>>,
    feed: Option<Result<Vec<FeedItem>, StoreError>>,
}

type SharedContext = Arc<Mutex<FacadeWorld>>;

#[fixture]
fn facade_world() -> SharedContext {
    let store = InMemorySocialStore::new();
    Arc::new(Mutex::new(FacadeWorld {
        runtime: Runtime::new().expect("tokio runtime"),
        storage: store.storage(),
        store,
        cache: InMemoryAccountCache::new(Duration::from_secs(60)),
        accounts: HashMap::new(),
        last_invite: None,
        last_activation: None,
        last_lookup: None,
        last_follow: None,
        feed: None,
    }))
}

/// Run an async storage call on the world's runtime without holding the lock.
fn with_storage<T, Fut>(world: &SharedContext, operation: impl FnOnce(Storage) -> Fut) -> T
where
    Fut: Future<Output = T>,
{
    let (storage, handle) = {
        let ctx = world.lock().expect("world lock");
        (ctx.storage.clone(), ctx.runtime.handle().clone())
    };
    handle.block_on(operation(storage))
}

fn store(world: &SharedContext) -> InMemorySocialStore {
    world.lock().expect("world lock").store.clone()
}

fn account_id(world: &SharedContext, username: &str) -> AccountId {
    *world
        .lock()
        .expect("world lock")
        .accounts
        .get(username)
        .unwrap_or_else(|| panic!("{username} was never created"))
}

fn new_account(username: &str) -> NewAccount {
    NewAccount::new(
        Username::new(username).expect("valid username"),
        Email::new(format!("{username}@x.com")).expect("valid email"),
        PasswordCredential::from_hash(FIXTURE_HASH),
    )
}

fn invite(world: &SharedContext, username: &str, raw_token: &str, ttl: Duration) {
    let account = new_account(username);
    let token = InvitationToken::new(raw_token);
    let result = with_storage(world, |storage| async move {
        storage
            .identity()
            .create_and_invite(&CallContext::background(), &account, &token, ttl)
            .await
    });
    let mut ctx = world.lock().expect("world lock");
    if let Ok(created) = &result {
        ctx.accounts.insert(username.to_owned(), created.id());
    }
    ctx.last_invite = Some(result);
}

fn create_active(world: &SharedContext, username: &str) {
    let account = new_account(username).activated();
    let created = with_storage(world, |storage| async move {
        storage
            .identity()
            .create(&CallContext::background(), &account)
            .await
    })
    .expect("account created");
    world
        .lock()
        .expect("world lock")
        .accounts
        .insert(username.to_owned(), created.id());
}

fn follow(world: &SharedContext, follower: &str, target: &str) {
    let follower = account_id(world, follower);
    let target = account_id(world, target);
    let result = with_storage(world, |storage| async move {
        storage
            .follows()
            .follow(&CallContext::background(), follower, target)
            .await
    });
    world.lock().expect("world lock").last_follow = Some(result);
}

fn publish(world: &SharedContext, author: &str, title: &str, tags: &[&str]) {
    let post = NewPost {
        author_id: account_id(world, author),
        title: title.to_owned(),
        content: format!("{title} body"),
        tags: tags.iter().map(|tag| (*tag).to_owned()).collect(),
    };
    with_storage(world, |storage| async move {
        storage
            .posts()
            .create(&CallContext::background(), &post)
            .await
    })
    .expect("post created");
    store(world).advance_clock(Duration::from_secs(1));
}

fn request_feed(world: &SharedContext, viewer: &str, filter: FeedFilter) {
    let viewer = account_id(world, viewer);
    let result = with_storage(world, |storage| async move {
        storage
            .feed()
            .user_feed(&CallContext::background(), viewer, &filter)
            .await
    });
    world.lock().expect("world lock").feed = Some(result);
}

fn feed_titles(world: &SharedContext) -> Vec<String> {
    let ctx = world.lock().expect("world lock");
    ctx.feed
        .as_ref()
        .expect("feed requested")
        .as_ref()
        .expect("feed loads")
        .iter()
        .map(|item| item.post.title.clone())
        .collect()
}

// -----------------------------------------------------------------------------
// BDD Step Definitions
// -----------------------------------------------------------------------------

#[given("an in-memory storage facade")]
fn an_in_memory_storage_facade(_facade_world: SharedContext) {}

#[given("mona is invited with token T1 for 72 hours")]
fn mona_is_invited(facade_world: SharedContext) {
    invite(&facade_world, "mona", "T1", INVITE_TTL);
}

#[given("the next invitation insert will fail")]
fn the_next_invitation_insert_will_fail(facade_world: SharedContext) {
    store(&facade_world).fail_next_invitation_insert();
}

#[when("token T1 is redeemed")]
fn token_t1_is_redeemed(facade_world: SharedContext) {
    let token = InvitationToken::new("T1");
    let result = with_storage(&facade_world, |storage| async move {
        storage
            .identity()
            .activate(&CallContext::background(), &token)
            .await
    });
    facade_world.lock().expect("world lock").last_activation = Some(result);
}

#[when("the clock moves past the invitation expiry")]
fn the_clock_moves_past_the_invitation_expiry(facade_world: SharedContext) {
    store(&facade_world).advance_clock(INVITE_TTL + Duration::from_secs(1));
}

#[when("mona is looked up by email")]
fn mona_is_looked_up_by_email(facade_world: SharedContext) {
    let email = Email::new("mona@x.com").expect("valid email");
    let result = with_storage(&facade_world, |storage| async move {
        storage
            .identity()
            .get_by_email(&CallContext::background(), &email)
            .await
    });
    facade_world.lock().expect("world lock").last_lookup = Some(result);
}

#[when("mona is deleted")]
fn mona_is_deleted(facade_world: SharedContext) {
    let id = account_id(&facade_world, "mona");
    with_storage(&facade_world, |storage| async move {
        storage
            .identity()
            .delete(&CallContext::background(), id)
            .await
    })
    .expect("delete succeeds");
}

#[then("the invitation is accepted inactive")]
fn the_invitation_is_accepted_inactive(facade_world: SharedContext) {
    let ctx = facade_world.lock().expect("world lock");
    let account = ctx
        .last_invite
        .as_ref()
        .expect("invite attempted")
        .as_ref()
        .expect("invite succeeds");
    assert!(!account.is_active());
    assert_eq!(account.username().as_str(), "mona");
}

#[then("the invitation is rejected")]
fn the_invitation_is_rejected(facade_world: SharedContext) {
    let ctx = facade_world.lock().expect("world lock");
    assert!(matches!(
        ctx.last_invite,
        Some(Err(StoreError::Internal { .. }))
    ));
}

#[then("neither mona nor an invitation exists")]
fn neither_mona_nor_an_invitation_exists(facade_world: SharedContext) {
    let store = store(&facade_world);
    assert!(store.account_by_username("mona").is_none());
    assert_eq!(store.total_invitations(), 0);
}

#[then("the lookup finds no account")]
fn the_lookup_finds_no_account(facade_world: SharedContext) {
    let ctx = facade_world.lock().expect("world lock");
    assert_eq!(ctx.last_lookup, Some(Err(StoreError::NotFound)));
}

#[then("the lookup returns active mona")]
fn the_lookup_returns_active_mona(facade_world: SharedContext) {
    let ctx = facade_world.lock().expect("world lock");
    let account = ctx
        .last_lookup
        .as_ref()
        .expect("lookup attempted")
        .as_ref()
        .expect("lookup succeeds");
    assert!(account.is_active());
    assert_eq!(account.email().as_str(), "mona@x.com");
    assert!(account.credential().is_some());
}

#[then("the activation names mona")]
fn the_activation_names_mona(facade_world: SharedContext) {
    let expected = account_id(&facade_world, "mona");
    let ctx = facade_world.lock().expect("world lock");
    assert_eq!(ctx.last_activation, Some(Ok(expected)));
}

#[then("the activation fails as not found or expired")]
fn the_activation_fails_as_not_found_or_expired(facade_world: SharedContext) {
    let ctx = facade_world.lock().expect("world lock");
    assert_eq!(
        ctx.last_activation,
        Some(Err(StoreError::TokenNotFoundOrExpired))
    );
}

#[then("mona has no outstanding invitations")]
fn mona_has_no_outstanding_invitations(facade_world: SharedContext) {
    let id = account_id(&facade_world, "mona");
    assert_eq!(store(&facade_world).invitation_count(id), 0);
}

#[then("mona is active")]
fn mona_is_active(facade_world: SharedContext) {
    let account = store(&facade_world)
        .account_by_username("mona")
        .expect("mona exists");
    assert!(account.is_active());
}

#[then("mona is still inactive")]
fn mona_is_still_inactive(facade_world: SharedContext) {
    let account = store(&facade_world)
        .account_by_username("mona")
        .expect("mona exists");
    assert!(!account.is_active());
}

#[then("the follow is rejected as a conflict")]
fn the_follow_is_rejected_as_a_conflict(facade_world: SharedContext) {
    let ctx = facade_world.lock().expect("world lock");
    let err = ctx
        .last_follow
        .clone()
        .expect("follow attempted")
        .expect_err("second follow conflicts");
    assert!(matches!(err, StoreError::Conflict { .. }));
}

#[then("exactly one follow edge exists")]
fn exactly_one_follow_edge_exists(facade_world: SharedContext) {
    assert_eq!(store(&facade_world).follow_count(), 1);
}

// -----------------------------------------------------------------------------
// Account lifecycle
// -----------------------------------------------------------------------------

#[rstest]
fn invited_account_activates_once(facade_world: SharedContext) {
    an_in_memory_storage_facade(facade_world.clone());
    mona_is_invited(facade_world.clone());
    the_invitation_is_accepted_inactive(facade_world.clone());
    token_t1_is_redeemed(facade_world.clone());
    the_activation_names_mona(facade_world.clone());
    mona_is_active(facade_world.clone());
    mona_has_no_outstanding_invitations(facade_world.clone());
    token_t1_is_redeemed(facade_world.clone());
    the_activation_fails_as_not_found_or_expired(facade_world.clone());
    mona_is_active(facade_world);
}

#[rstest]
fn invited_account_is_hidden_until_activation(facade_world: SharedContext) {
    mona_is_invited(facade_world.clone());
    mona_is_looked_up_by_email(facade_world.clone());
    the_lookup_finds_no_account(facade_world.clone());
    token_t1_is_redeemed(facade_world.clone());
    mona_is_looked_up_by_email(facade_world.clone());
    the_lookup_returns_active_mona(facade_world);
}

#[rstest]
fn expired_invitation_cannot_be_redeemed(facade_world: SharedContext) {
    mona_is_invited(facade_world.clone());
    the_clock_moves_past_the_invitation_expiry(facade_world.clone());
    token_t1_is_redeemed(facade_world.clone());
    the_activation_fails_as_not_found_or_expired(facade_world.clone());
    mona_is_still_inactive(facade_world);
}

#[rstest]
fn failed_invitation_leaves_no_trace(facade_world: SharedContext) {
    the_next_invitation_insert_will_fail(facade_world.clone());
    mona_is_invited(facade_world.clone());
    the_invitation_is_rejected(facade_world.clone());
    neither_mona_nor_an_invitation_exists(facade_world.clone());

    mona_is_invited(facade_world.clone());
    the_invitation_is_accepted_inactive(facade_world);
}

#[rstest]
fn deleted_account_takes_its_invitations_along(facade_world: SharedContext) {
    mona_is_invited(facade_world.clone());
    mona_is_deleted(facade_world.clone());
    neither_mona_nor_an_invitation_exists(facade_world.clone());
    token_t1_is_redeemed(facade_world.clone());
    the_activation_fails_as_not_found_or_expired(facade_world.clone());

    mona_is_deleted(facade_world);
}

#[rstest]
#[case::email("mona2", "mona@x.com", StoreError::DuplicateEmail)]
#[case::username("mona", "other@x.com", StoreError::DuplicateUsername)]
fn duplicate_identity_is_rejected(
    facade_world: SharedContext,
    #[case] username: &str,
    #[case] email: &str,
    #[case] expected: StoreError,
) {
    mona_is_invited(facade_world.clone());
    let account = NewAccount::new(
        Username::new(username).expect("valid username"),
        Email::new(email).expect("valid email"),
        PasswordCredential::from_hash(FIXTURE_HASH),
    );
    let token = InvitationToken::new("T2");
    let result = with_storage(&facade_world, |storage| async move {
        storage
            .identity()
            .create_and_invite(&CallContext::background(), &account, &token, INVITE_TTL)
            .await
    });
    assert_eq!(result.expect_err("duplicate rejected"), expected);
    assert_eq!(store(&facade_world).total_invitations(), 1);
}

#[rstest]
fn reused_invitation_token_conflicts_without_a_second_account(facade_world: SharedContext) {
    mona_is_invited(facade_world.clone());
    invite(&facade_world, "bob", "T1", INVITE_TTL);

    let store = store(&facade_world);
    let ctx = facade_world.lock().expect("world lock");
    assert_eq!(
        ctx.last_invite,
        Some(Err(StoreError::conflict("invitation token already issued")))
    );
    assert!(store.account_by_username("bob").is_none());
    assert_eq!(store.account_count(), 1);
    assert_eq!(store.total_invitations(), 1);
}

#[rstest]
fn unknown_role_is_an_invalid_entity(facade_world: SharedContext) {
    let account = new_account("mona").with_role(RoleName::new("overlord").expect("role name"));
    let result = with_storage(&facade_world, |storage| async move {
        storage
            .identity()
            .create(&CallContext::background(), &account)
            .await
    });
    assert!(matches!(result, Err(StoreError::InvalidEntity { .. })));
}

#[rstest]
fn expired_context_times_out_before_touching_state(facade_world: SharedContext) {
    let account = new_account("mona");
    let token = InvitationToken::new("T1");
    let result = with_storage(&facade_world, |storage| async move {
        storage
            .identity()
            .create_and_invite(&CallContext::expired(), &account, &token, INVITE_TTL)
            .await
    });
    assert_eq!(result.expect_err("deadline elapsed"), StoreError::Timeout);
    assert_eq!(store(&facade_world).account_count(), 0);
}

// -----------------------------------------------------------------------------
// Follow graph
// -----------------------------------------------------------------------------

#[rstest]
fn following_twice_conflicts_and_keeps_one_edge(facade_world: SharedContext) {
    create_active(&facade_world, "ann");
    create_active(&facade_world, "ben");
    follow(&facade_world, "ann", "ben");
    follow(&facade_world, "ann", "ben");
    the_follow_is_rejected_as_a_conflict(facade_world.clone());
    exactly_one_follow_edge_exists(facade_world);
}

#[rstest]
fn unfollowing_a_missing_edge_is_a_no_op(facade_world: SharedContext) {
    create_active(&facade_world, "ann");
    create_active(&facade_world, "ben");
    let ann = account_id(&facade_world, "ann");
    let ben = account_id(&facade_world, "ben");
    with_storage(&facade_world, |storage| async move {
        let ctx = CallContext::background();
        storage.follows().unfollow(&ctx, ann, ben).await?;
        storage.follows().follow(&ctx, ann, ben).await?;
        storage.follows().unfollow(&ctx, ann, ben).await?;
        storage.follows().unfollow(&ctx, ann, ben).await
    })
    .expect("unfollow never fails for a missing edge");
    assert_eq!(store(&facade_world).follow_count(), 0);
}

#[rstest]
fn self_follow_is_recorded_without_duplicating_own_posts(facade_world: SharedContext) {
    create_active(&facade_world, "ann");
    follow(&facade_world, "ann", "ann");
    assert_eq!(facade_world.lock().expect("world lock").last_follow, Some(Ok(())));
    assert_eq!(store(&facade_world).follow_count(), 1);

    publish(&facade_world, "ann", "note to self", &[]);
    request_feed(&facade_world, "ann", FeedFilter::default());
    assert_eq!(feed_titles(&facade_world), vec!["note to self"]);
}

#[rstest]
fn following_an_unknown_account_is_not_found(facade_world: SharedContext) {
    create_active(&facade_world, "ann");
    let ann = account_id(&facade_world, "ann");
    let result = with_storage(&facade_world, |storage| async move {
        storage
            .follows()
            .follow(&CallContext::background(), ann, AccountId::new(999))
            .await
    });
    assert_eq!(result, Err(StoreError::NotFound));
}

// -----------------------------------------------------------------------------
// Feed
// -----------------------------------------------------------------------------

/// Viewer follows bob and carol but not dave.
fn seed_feed_graph(world: &SharedContext) {
    for name in ["bob", "carol", "dave", "viewer"] {
        create_active(world, name);
    }
    follow(world, "viewer", "bob");
    follow(world, "viewer", "carol");
}

#[rstest]
fn tag_filter_requires_every_requested_tag(facade_world: SharedContext) {
    seed_feed_graph(&facade_world);
    publish(&facade_world, "bob", "tagged x and y", &["x", "y"]);
    publish(&facade_world, "carol", "tagged y", &["y"]);
    publish(&facade_world, "dave", "unfollowed x", &["x"]);

    let filter = FeedFilter::builder()
        .limit(20)
        .offset(0)
        .sort(SortDirection::Asc)
        .tags(["x"])
        .build()
        .expect("valid filter");
    request_feed(&facade_world, "viewer", filter);
    assert_eq!(feed_titles(&facade_world), vec!["tagged x and y"]);

    let filter = FeedFilter::builder()
        .tags(["x", "z"])
        .build()
        .expect("valid filter");
    request_feed(&facade_world, "viewer", filter);
    assert!(feed_titles(&facade_world).is_empty());
}

#[rstest]
fn feed_merges_own_and_followed_posts_in_order(facade_world: SharedContext) {
    seed_feed_graph(&facade_world);
    publish(&facade_world, "bob", "first", &[]);
    publish(&facade_world, "viewer", "second", &[]);
    publish(&facade_world, "dave", "hidden", &[]);
    publish(&facade_world, "carol", "third", &[]);

    request_feed(
        &facade_world,
        "viewer",
        FeedFilter::builder()
            .sort(SortDirection::Asc)
            .build()
            .expect("valid filter"),
    );
    assert_eq!(feed_titles(&facade_world), vec!["first", "second", "third"]);

    request_feed(&facade_world, "viewer", FeedFilter::default());
    assert_eq!(feed_titles(&facade_world), vec!["third", "second", "first"]);

    let ctx = facade_world.lock().expect("world lock");
    let items = ctx.feed.as_ref().and_then(|feed| feed.as_ref().ok());
    let authors: Vec<&str> = items
        .into_iter()
        .flatten()
        .map(|item| item.author_username.as_str())
        .collect();
    assert_eq!(authors, vec!["carol", "viewer", "bob"]);
}

#[rstest]
fn unfollowed_author_leaves_the_feed(facade_world: SharedContext) {
    seed_feed_graph(&facade_world);
    publish(&facade_world, "bob", "from bob", &[]);
    let viewer = account_id(&facade_world, "viewer");
    let bob = account_id(&facade_world, "bob");
    with_storage(&facade_world, |storage| async move {
        storage
            .follows()
            .unfollow(&CallContext::background(), viewer, bob)
            .await
    })
    .expect("unfollow succeeds");

    request_feed(&facade_world, "viewer", FeedFilter::default());
    assert!(feed_titles(&facade_world).is_empty());
}

#[rstest]
fn search_and_date_window_narrow_the_feed(facade_world: SharedContext) {
    seed_feed_graph(&facade_world);
    publish(&facade_world, "bob", "Async Rust notes", &[]);
    publish(&facade_world, "carol", "Gardening", &[]);

    let filter = FeedFilter::builder()
        .search("rust")
        .build()
        .expect("valid filter");
    request_feed(&facade_world, "viewer", filter);
    assert_eq!(feed_titles(&facade_world), vec!["Async Rust notes"]);

    let since = NaiveDate::from_ymd_opt(2100, 1, 1).expect("valid date");
    let future = FeedFilter::builder()
        .since(since)
        .build()
        .expect("valid filter");
    request_feed(&facade_world, "viewer", future);
    assert!(feed_titles(&facade_world).is_empty());
}

fn window(since: NaiveDate, until: NaiveDate) -> FeedFilter {
    FeedFilter::builder()
        .since(since)
        .until(until)
        .build()
        .expect("any window is legal")
}

#[rstest]
fn inverted_date_window_yields_an_empty_page(facade_world: SharedContext) {
    seed_feed_graph(&facade_world);
    publish(&facade_world, "bob", "dated", &[]);
    request_feed(&facade_world, "viewer", FeedFilter::default());
    let day = {
        let ctx = facade_world.lock().expect("world lock");
        let items = ctx
            .feed
            .as_ref()
            .and_then(|feed| feed.as_ref().ok())
            .expect("feed loads");
        items.first().expect("one post").post.created_at.date_naive()
    };
    let day_before = day.pred_opt().expect("representable date");

    request_feed(&facade_world, "viewer", window(day, day));
    assert_eq!(feed_titles(&facade_world), vec!["dated"]);

    request_feed(&facade_world, "viewer", window(day, day_before));
    let ctx = facade_world.lock().expect("world lock");
    assert_eq!(ctx.feed, Some(Ok(Vec::new())));
}

#[rstest]
fn pages_never_exceed_the_limit(facade_world: SharedContext) {
    create_active(&facade_world, "viewer");
    for n in 0..25 {
        publish(&facade_world, "viewer", &format!("post {n}"), &[]);
    }

    request_feed(&facade_world, "viewer", FeedFilter::default());
    assert_eq!(feed_titles(&facade_world).len(), 20);

    let second_page = FeedFilter::builder()
        .offset(20)
        .build()
        .expect("valid filter");
    request_feed(&facade_world, "viewer", second_page);
    assert_eq!(
        feed_titles(&facade_world),
        vec!["post 4", "post 3", "post 2", "post 1", "post 0"]
    );
}

#[rstest]
#[case(0)]
#[case(21)]
fn out_of_range_limit_fails_before_querying(#[case] limit: i64) {
    let err = FeedFilter::builder()
        .limit(limit)
        .build()
        .expect_err("limit rejected");
    assert!(matches!(err, FeedFilterError::LimitOutOfRange { .. }));
}

#[rstest]
fn feed_for_a_viewer_without_posts_is_empty(facade_world: SharedContext) {
    create_active(&facade_world, "viewer");
    request_feed(&facade_world, "viewer", FeedFilter::default());
    assert!(feed_titles(&facade_world).is_empty());
}

// -----------------------------------------------------------------------------
// Account cache
// -----------------------------------------------------------------------------

fn unsaved_account() -> Account {
    Account::from_parts(AccountParts {
        id: AccountId::default(),
        username: Username::new("ghost").expect("valid username"),
        email: Email::new("ghost@x.com").expect("valid email"),
        created_at: chrono::Utc::now(),
        is_active: true,
        role: Role {
            id: 1,
            name: RoleName::new("user").expect("role name"),
            description: String::new(),
            level: 1,
        },
    })
}

#[rstest]
#[tokio::test]
async fn cache_rejects_unset_ids_and_misses_quietly() {
    let cache = InMemoryAccountCache::new(Duration::from_secs(60));
    let ctx = CallContext::background();

    let err = cache
        .set(&ctx, &unsaved_account())
        .await
        .expect_err("unset id rejected");
    assert!(matches!(err, StoreError::InvalidEntity { .. }));
    assert!(cache.is_empty());

    let miss = cache
        .get(&ctx, AccountId::new(42))
        .await
        .expect("miss is not an error");
    assert!(miss.is_none());
}

#[rstest]
fn cached_facade_fills_on_first_lookup(facade_world: SharedContext) {
    create_active(&facade_world, "ann");
    let ann = account_id(&facade_world, "ann");
    let cache = {
        let mut ctx = facade_world.lock().expect("world lock");
        let cache = ctx.cache.clone();
        ctx.storage = ctx.storage.clone().with_account_cache(Arc::new(cache.clone()));
        cache
    };

    let (first, second) = with_storage(&facade_world, |storage| async move {
        let ctx = CallContext::background();
        let first = storage.identity().get_by_id(&ctx, ann).await;
        let second = storage.identity().get_by_id(&ctx, ann).await;
        (first, second)
    });

    let first = first.expect("first lookup succeeds");
    let second = second.expect("cached lookup succeeds");
    assert_eq!(first.id(), second.id());
    assert_eq!(second.username().as_str(), "ann");
    assert!(second.credential().is_none());
    assert_eq!(cache.len(), 1);
}

#[rstest]
fn corrupt_cache_entry_surfaces_as_internal(facade_world: SharedContext) {
    create_active(&facade_world, "ann");
    let ann = account_id(&facade_world, "ann");
    {
        let mut ctx = facade_world.lock().expect("world lock");
        ctx.cache.insert_raw(ann, "{not json");
        let cache = ctx.cache.clone();
        ctx.storage = ctx.storage.clone().with_account_cache(Arc::new(cache));
    }

    let result = with_storage(&facade_world, |storage| async move {
        storage
            .identity()
            .get_by_id(&CallContext::background(), ann)
            .await
    });
    assert!(matches!(result, Err(StoreError::Internal { .. })));
}
