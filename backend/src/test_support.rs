//! In-memory fakes for every storage port.
//!
//! [`InMemorySocialStore`] mirrors the relational schema's constraints
//! (unique username, email, and follow edge; cascading deletes; role
//! resolution) behind one mutex, so each workflow applies all of its writes
//! or none. [`InMemoryAccountCache`] stores the same JSON snapshots as the
//! Redis adapter.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::domain::ports::{
    AccountCache, CommentStore, FeedQuery, FollowerGraph, IdentityStore, PostStore, RoleStore,
    StoreError,
};
use crate::domain::{
    Account, AccountId, AccountParts, CallContext, Comment, CommentId, CommentWithAuthor,
    DEFAULT_ROLE, Email, FeedFilter, FeedItem, InvitationToken, NewAccount, NewComment, NewPost,
    PasswordCredential, Post, PostId, Role, RoleName, SortDirection, Storage, StoragePorts,
    TokenHash,
};
use crate::outbound::cache::snapshot::{decode, encode};

#[derive(Debug, Clone)]
struct StoredAccount {
    parts: AccountParts,
    credential: PasswordCredential,
}

impl StoredAccount {
    fn to_account(&self, with_credential: bool) -> Account {
        let account = Account::from_parts(self.parts.clone());
        if with_credential {
            account.with_credential(self.credential.clone())
        } else {
            account
        }
    }
}

#[derive(Debug, Clone)]
struct StoredInvitation {
    hash: TokenHash,
    account_id: AccountId,
    expiry: DateTime<Utc>,
}

#[derive(Debug)]
struct State {
    next_account_id: i64,
    next_post_id: i64,
    next_comment_id: i64,
    roles: Vec<Role>,
    accounts: BTreeMap<AccountId, StoredAccount>,
    invitations: Vec<StoredInvitation>,
    posts: BTreeMap<PostId, Post>,
    comments: Vec<Comment>,
    follows: BTreeSet<(AccountId, AccountId)>,
    fail_next_invitation_insert: bool,
    clock_offset: chrono::Duration,
}

impl State {
    fn seeded() -> Self {
        let role = |id: i64, name: &str, description: &str, level: i32| {
            RoleName::new(name).ok().map(|name| Role {
                id,
                name,
                description: description.to_owned(),
                level,
            })
        };
        Self {
            next_account_id: 1,
            next_post_id: 1,
            next_comment_id: 1,
            roles: [
                role(1, DEFAULT_ROLE, "A user can create posts and comments", 1),
                role(2, "moderator", "A moderator can update other users posts", 2),
                role(3, "admin", "An admin can update and delete other users posts", 3),
            ]
            .into_iter()
            .flatten()
            .collect(),
            accounts: BTreeMap::new(),
            invitations: Vec::new(),
            posts: BTreeMap::new(),
            comments: Vec::new(),
            follows: BTreeSet::new(),
            fail_next_invitation_insert: false,
            clock_offset: chrono::Duration::zero(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now() + self.clock_offset
    }

    /// Validate an insert and return the row it would create.
    fn prepare_account(
        &self,
        account: &NewAccount,
        active: bool,
    ) -> Result<StoredAccount, StoreError> {
        let role = self
            .roles
            .iter()
            .find(|role| &role.name == account.role())
            .cloned()
            .ok_or_else(|| {
                StoreError::invalid_entity(format!("unknown role `{}`", account.role()))
            })?;
        let existing = self.accounts.values().map(|stored| &stored.parts);
        for parts in existing {
            if &parts.username == account.username() {
                return Err(StoreError::duplicate_username());
            }
            if &parts.email == account.email() {
                return Err(StoreError::duplicate_email());
            }
        }
        Ok(StoredAccount {
            parts: AccountParts {
                id: AccountId::new(self.next_account_id),
                username: account.username().clone(),
                email: account.email().clone(),
                created_at: self.now(),
                is_active: active,
                role,
            },
            credential: account.credential().clone(),
        })
    }

    fn commit_account(&mut self, stored: StoredAccount) -> Account {
        self.next_account_id += 1;
        let account = stored.to_account(false);
        self.accounts.insert(stored.parts.id, stored);
        account
    }

    fn active_account(&self, id: AccountId) -> Option<&StoredAccount> {
        self.accounts.get(&id).filter(|stored| stored.parts.is_active)
    }

    fn remove_account(&mut self, id: AccountId) {
        self.accounts.remove(&id);
        self.invitations.retain(|invite| invite.account_id != id);
        self.follows
            .retain(|(follower, followed)| *follower != id && *followed != id);
        let removed_posts: Vec<PostId> = self
            .posts
            .values()
            .filter(|post| post.author_id == id)
            .map(|post| post.id)
            .collect();
        self.posts.retain(|_, post| post.author_id != id);
        self.comments.retain(|comment| {
            comment.author_id != id && !removed_posts.contains(&comment.post_id)
        });
    }

    fn username_of(&self, id: AccountId) -> Option<String> {
        self.accounts
            .get(&id)
            .map(|stored| stored.parts.username.as_str().to_owned())
    }
}

fn check_deadline(ctx: &CallContext) -> Result<(), StoreError> {
    if ctx.is_expired() {
        Err(StoreError::timeout())
    } else {
        Ok(())
    }
}

fn invitation_expiry(now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>, StoreError> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| StoreError::invalid_entity("invitation ttl out of range"))
}

/// Plain-text approximation of `plainto_tsquery`: every word must appear.
fn matches_search(post: &Post, phrase: &str) -> bool {
    let haystack = format!("{} {}", post.title, post.content).to_lowercase();
    phrase
        .split_whitespace()
        .all(|word| haystack.contains(&word.to_lowercase()))
}

fn matches_filter(post: &Post, filter: &FeedFilter) -> bool {
    let tags_ok = filter.tags().iter().all(|tag| post.tags.contains(tag));
    let search_ok = filter
        .search()
        .is_none_or(|phrase| matches_search(post, phrase));
    let since_ok = filter
        .since_bound()
        .is_none_or(|since| post.created_at >= since);
    let until_ok = filter
        .until_bound()
        .is_none_or(|until| post.created_at < until);
    tags_ok && search_ok && since_ok && until_ok
}

/// In-memory implementation of every storage port except the cache.
#[derive(Clone)]
pub struct InMemorySocialStore {
    state: Arc<Mutex<State>>,
}

impl Default for InMemorySocialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySocialStore {
    /// Empty store with the `user`, `moderator`, and `admin` roles seeded.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::seeded())),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Facade over this store with every port wired to it.
    #[must_use]
    pub fn storage(&self) -> Storage {
        Storage::new(StoragePorts {
            identity: Arc::new(self.clone()),
            feed: Arc::new(self.clone()),
            follows: Arc::new(self.clone()),
            posts: Arc::new(self.clone()),
            comments: Arc::new(self.clone()),
            roles: Arc::new(self.clone()),
        })
    }

    /// Make the next invitation insert fail after the account insert.
    pub fn fail_next_invitation_insert(&self) {
        self.state().fail_next_invitation_insert = true;
    }

    /// Shift the store's clock forward, e.g. past an invitation's expiry.
    pub fn advance_clock(&self, by: Duration) {
        let mut state = self.state();
        if let Ok(by) = chrono::Duration::from_std(by) {
            state.clock_offset += by;
        }
    }

    /// Look up an account regardless of its active flag.
    #[must_use]
    pub fn account_by_username(&self, username: &str) -> Option<Account> {
        self.state()
            .accounts
            .values()
            .find(|stored| stored.parts.username.as_str() == username)
            .map(|stored| stored.to_account(false))
    }

    #[must_use]
    pub fn account_count(&self) -> usize {
        self.state().accounts.len()
    }

    /// Outstanding invitations for `id`.
    #[must_use]
    pub fn invitation_count(&self, id: AccountId) -> usize {
        self.state()
            .invitations
            .iter()
            .filter(|invite| invite.account_id == id)
            .count()
    }

    #[must_use]
    pub fn total_invitations(&self) -> usize {
        self.state().invitations.len()
    }

    #[must_use]
    pub fn follow_count(&self) -> usize {
        self.state().follows.len()
    }
}

#[async_trait]
impl IdentityStore for InMemorySocialStore {
    async fn create(
        &self,
        ctx: &CallContext,
        account: &NewAccount,
    ) -> Result<Account, StoreError> {
        check_deadline(ctx)?;
        let mut state = self.state();
        let stored = state.prepare_account(account, account.is_active())?;
        Ok(state.commit_account(stored))
    }

    async fn create_and_invite(
        &self,
        ctx: &CallContext,
        account: &NewAccount,
        token: &InvitationToken,
        ttl: Duration,
    ) -> Result<Account, StoreError> {
        check_deadline(ctx)?;
        let mut state = self.state();
        let expiry = invitation_expiry(state.now(), ttl)?;
        let stored = state.prepare_account(account, false)?;
        if std::mem::take(&mut state.fail_next_invitation_insert) {
            return Err(StoreError::internal("injected invitation insert failure"));
        }
        let hash = token.hash();
        if state.invitations.iter().any(|invite| invite.hash == hash) {
            return Err(StoreError::conflict("invitation token already issued"));
        }
        let created = state.commit_account(stored);
        state.invitations.push(StoredInvitation {
            hash,
            account_id: created.id(),
            expiry,
        });
        Ok(created)
    }

    async fn activate(
        &self,
        ctx: &CallContext,
        token: &InvitationToken,
    ) -> Result<AccountId, StoreError> {
        check_deadline(ctx)?;
        let mut state = self.state();
        let hash = token.hash();
        let now = state.now();
        let account_id = state
            .invitations
            .iter()
            .find(|invite| invite.hash == hash && invite.expiry > now)
            .map(|invite| invite.account_id)
            .ok_or(StoreError::TokenNotFoundOrExpired)?;
        if let Some(stored) = state.accounts.get_mut(&account_id) {
            stored.parts.is_active = true;
        }
        state
            .invitations
            .retain(|invite| invite.account_id != account_id);
        Ok(account_id)
    }

    async fn delete(&self, ctx: &CallContext, id: AccountId) -> Result<(), StoreError> {
        check_deadline(ctx)?;
        self.state().remove_account(id);
        Ok(())
    }

    async fn get_by_id(&self, ctx: &CallContext, id: AccountId) -> Result<Account, StoreError> {
        check_deadline(ctx)?;
        self.state()
            .active_account(id)
            .map(|stored| stored.to_account(false))
            .ok_or_else(StoreError::not_found)
    }

    async fn get_by_email(
        &self,
        ctx: &CallContext,
        email: &Email,
    ) -> Result<Account, StoreError> {
        check_deadline(ctx)?;
        self.state()
            .accounts
            .values()
            .find(|stored| stored.parts.is_active && &stored.parts.email == email)
            .map(|stored| stored.to_account(true))
            .ok_or_else(StoreError::not_found)
    }
}

#[async_trait]
impl FeedQuery for InMemorySocialStore {
    async fn user_feed(
        &self,
        ctx: &CallContext,
        viewer: AccountId,
        filter: &FeedFilter,
    ) -> Result<Vec<FeedItem>, StoreError> {
        check_deadline(ctx)?;
        let state = self.state();
        let mut visible: Vec<&Post> = state
            .posts
            .values()
            .filter(|post| {
                post.author_id == viewer || state.follows.contains(&(viewer, post.author_id))
            })
            .filter(|post| matches_filter(post, filter))
            .collect();
        visible.sort_by_key(|post| (post.created_at, post.id));
        if filter.sort() == SortDirection::Desc {
            visible.reverse();
        }

        let skip = usize::try_from(filter.offset()).unwrap_or(usize::MAX);
        let take = usize::try_from(filter.limit()).unwrap_or(0);
        Ok(visible
            .into_iter()
            .skip(skip)
            .take(take)
            .filter_map(|post| {
                let author_username = state.username_of(post.author_id)?;
                let comment_count = state
                    .comments
                    .iter()
                    .filter(|comment| comment.post_id == post.id)
                    .count();
                Some(FeedItem {
                    post: post.clone(),
                    author_username,
                    comment_count: i64::try_from(comment_count).unwrap_or(i64::MAX),
                })
            })
            .collect())
    }
}

#[async_trait]
impl FollowerGraph for InMemorySocialStore {
    async fn follow(
        &self,
        ctx: &CallContext,
        follower: AccountId,
        target: AccountId,
    ) -> Result<(), StoreError> {
        check_deadline(ctx)?;
        let mut state = self.state();
        if !state.accounts.contains_key(&follower) || !state.accounts.contains_key(&target) {
            return Err(StoreError::not_found());
        }
        if !state.follows.insert((follower, target)) {
            return Err(StoreError::conflict("follow edge already exists"));
        }
        Ok(())
    }

    async fn unfollow(
        &self,
        ctx: &CallContext,
        follower: AccountId,
        target: AccountId,
    ) -> Result<(), StoreError> {
        check_deadline(ctx)?;
        self.state().follows.remove(&(follower, target));
        Ok(())
    }
}

#[async_trait]
impl PostStore for InMemorySocialStore {
    async fn create(&self, ctx: &CallContext, post: &NewPost) -> Result<Post, StoreError> {
        check_deadline(ctx)?;
        let mut state = self.state();
        if !state.accounts.contains_key(&post.author_id) {
            return Err(StoreError::not_found());
        }
        let now = state.now();
        let created = Post {
            id: PostId::new(state.next_post_id),
            author_id: post.author_id,
            title: post.title.clone(),
            content: post.content.clone(),
            tags: post.tags.clone(),
            created_at: now,
            updated_at: now,
            version: 0,
        };
        state.next_post_id += 1;
        state.posts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, ctx: &CallContext, id: PostId) -> Result<Post, StoreError> {
        check_deadline(ctx)?;
        self.state()
            .posts
            .get(&id)
            .cloned()
            .ok_or_else(StoreError::not_found)
    }

    async fn update(&self, ctx: &CallContext, post: &Post) -> Result<Post, StoreError> {
        check_deadline(ctx)?;
        let mut state = self.state();
        let now = state.now();
        let stored = state.posts.get_mut(&post.id).ok_or_else(StoreError::not_found)?;
        if stored.version != post.version {
            return Err(StoreError::conflict(format!(
                "post version is {}, update expected {}",
                stored.version, post.version
            )));
        }
        stored.title.clone_from(&post.title);
        stored.content.clone_from(&post.content);
        stored.tags.clone_from(&post.tags);
        stored.updated_at = now;
        stored.version += 1;
        Ok(stored.clone())
    }

    async fn delete(&self, ctx: &CallContext, id: PostId) -> Result<(), StoreError> {
        check_deadline(ctx)?;
        let mut state = self.state();
        if state.posts.remove(&id).is_none() {
            return Err(StoreError::not_found());
        }
        state.comments.retain(|comment| comment.post_id != id);
        Ok(())
    }
}

#[async_trait]
impl CommentStore for InMemorySocialStore {
    async fn create(
        &self,
        ctx: &CallContext,
        comment: &NewComment,
    ) -> Result<Comment, StoreError> {
        check_deadline(ctx)?;
        let mut state = self.state();
        if !state.posts.contains_key(&comment.post_id)
            || !state.accounts.contains_key(&comment.author_id)
        {
            return Err(StoreError::not_found());
        }
        let created = Comment {
            id: CommentId::new(state.next_comment_id),
            post_id: comment.post_id,
            author_id: comment.author_id,
            content: comment.content.clone(),
            created_at: state.now(),
        };
        state.next_comment_id += 1;
        state.comments.push(created.clone());
        Ok(created)
    }

    async fn list_by_post(
        &self,
        ctx: &CallContext,
        post: PostId,
    ) -> Result<Vec<CommentWithAuthor>, StoreError> {
        check_deadline(ctx)?;
        let state = self.state();
        let mut thread: Vec<CommentWithAuthor> = state
            .comments
            .iter()
            .filter(|comment| comment.post_id == post)
            .filter_map(|comment| {
                Some(CommentWithAuthor {
                    comment: comment.clone(),
                    author_username: state.username_of(comment.author_id)?,
                })
            })
            .collect();
        thread.sort_by_key(|entry| (entry.comment.created_at, entry.comment.id));
        thread.reverse();
        Ok(thread)
    }
}

#[async_trait]
impl RoleStore for InMemorySocialStore {
    async fn get_by_name(&self, ctx: &CallContext, name: &RoleName) -> Result<Role, StoreError> {
        check_deadline(ctx)?;
        self.state()
            .roles
            .iter()
            .find(|role| &role.name == name)
            .cloned()
            .ok_or_else(StoreError::not_found)
    }
}

/// In-memory [`AccountCache`] with a fixed TTL.
#[derive(Clone)]
pub struct InMemoryAccountCache {
    entries: Arc<Mutex<HashMap<AccountId, (String, Instant)>>>,
    ttl: Duration,
}

impl InMemoryAccountCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<AccountId, (String, Instant)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a raw payload, bypassing encoding.
    pub fn insert_raw(&self, id: AccountId, raw: impl Into<String>) {
        let expiry = Instant::now() + self.ttl;
        self.entries().insert(id, (raw.into(), expiry));
    }

    /// Live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries()
            .values()
            .filter(|(_, expiry)| *expiry > now)
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AccountCache for InMemoryAccountCache {
    async fn get(&self, ctx: &CallContext, id: AccountId) -> Result<Option<Account>, StoreError> {
        check_deadline(ctx)?;
        let raw = {
            let mut entries = self.entries();
            match entries.get(&id) {
                Some((_, expiry)) if *expiry <= Instant::now() => {
                    entries.remove(&id);
                    None
                }
                Some((raw, _)) => Some(raw.clone()),
                None => None,
            }
        };
        raw.as_deref().map(decode).transpose()
    }

    async fn set(&self, ctx: &CallContext, account: &Account) -> Result<(), StoreError> {
        if account.id().is_unset() {
            return Err(StoreError::invalid_entity("account id must be set"));
        }
        check_deadline(ctx)?;
        let payload = encode(account)?;
        self.insert_raw(account.id(), payload);
        Ok(())
    }
}
