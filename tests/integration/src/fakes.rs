//! In-memory collaborators
//!
//! Each fake keeps its state behind a `parking_lot::Mutex`, so every trait
//! method is atomic with respect to the others, like the conditional writes
//! of the real stores.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::time::Instant;
use ums_core::entities::{
    AuditEntry, CardKey, CardStatus, ExpiryWarning, MediaUser, User, VipLevel,
};
use ums_core::traits::{
    AccessRecordRepository, AuditLogRepository, CardKeyCounts, CardKeyFilter, CardKeyRepository,
    LoginAttemptStore, MediaUserDirectory, Notifier, PageRequest, Redemption, RepoResult,
    UserRepository,
};
use ums_core::value_objects::{CardKeyId, UserId};
use ums_core::DomainError;

fn paginate<T>(items: impl Iterator<Item = T>, page: PageRequest) -> Vec<T> {
    items
        .skip(usize::try_from(page.offset).unwrap_or(0))
        .take(usize::try_from(page.limit).unwrap_or(0))
        .collect()
}

// ============================================================================
// Entitlement store
// ============================================================================

#[derive(Default)]
struct StoreState {
    next_id: i64,
    users: BTreeMap<UserId, (User, String)>,
    card_keys: BTreeMap<CardKeyId, CardKey>,
    audit_logs: Vec<AuditEntry>,
    access_records: Vec<DateTime<Utc>>,
}

impl StoreState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Users, card keys, audit logs and access records in one map set
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
    fail_demotion: AtomicBool,
    pending_redemption: Mutex<Option<Redemption>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `bulk_demote_expired` fail until reset
    pub fn set_fail_demotion(&self, fail: bool) {
        self.fail_demotion.store(fail, Ordering::SeqCst);
    }

    /// Commit `redemption` right after the next username lookup returns,
    /// so the caller holds a user row that is already stale
    pub fn redeem_after_next_lookup(&self, redemption: Redemption) {
        *self.pending_redemption.lock() = Some(redemption);
    }

    /// Overwrite a stored user directly, bypassing the repository API
    pub fn put_user(&self, user: User) {
        let mut state = self.state.lock();
        if let Some(entry) = state.users.get_mut(&user.id) {
            entry.0 = user;
        }
    }

    pub fn user(&self, id: UserId) -> Option<User> {
        self.state.lock().users.get(&id).map(|(u, _)| u.clone())
    }

    pub fn card_key(&self, id: CardKeyId) -> Option<CardKey> {
        self.state.lock().card_keys.get(&id).cloned()
    }

    pub fn card_key_count(&self) -> usize {
        self.state.lock().card_keys.len()
    }

    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.state.lock().audit_logs.clone()
    }

    pub fn add_audit_entry(&self, entry: AuditEntry) {
        self.state.lock().audit_logs.push(entry);
    }

    pub fn add_access_record(&self, at: DateTime<Utc>) {
        self.state.lock().access_records.push(at);
    }

    pub fn access_record_count(&self) -> usize {
        self.state.lock().access_records.len()
    }
}

#[async_trait]
impl CardKeyRepository for MemoryStore {
    async fn find_by_id(&self, id: CardKeyId) -> RepoResult<Option<CardKey>> {
        Ok(self.card_key(id))
    }

    async fn find_by_code(&self, code: &str) -> RepoResult<Option<CardKey>> {
        Ok(self
            .state
            .lock()
            .card_keys
            .values()
            .find(|k| k.code == code)
            .cloned())
    }

    async fn create(&self, card_key: &CardKey) -> RepoResult<CardKey> {
        let mut created = self.create_batch(std::slice::from_ref(card_key)).await?;
        created
            .pop()
            .ok_or_else(|| DomainError::InternalError("nothing inserted".to_string()))
    }

    async fn create_batch(&self, card_keys: &[CardKey]) -> RepoResult<Vec<CardKey>> {
        let mut state = self.state.lock();

        let mut codes: HashSet<&str> = state.card_keys.values().map(|k| k.code.as_str()).collect();
        for key in card_keys {
            if !codes.insert(key.code.as_str()) {
                return Err(DomainError::CardCodeExists);
            }
        }

        let mut created = Vec::with_capacity(card_keys.len());
        for key in card_keys {
            let mut key = key.clone();
            key.id = CardKeyId::new(state.next_id());
            state.card_keys.insert(key.id, key.clone());
            created.push(key);
        }
        Ok(created)
    }

    async fn update_status(&self, id: CardKeyId, status: CardStatus) -> RepoResult<bool> {
        let mut state = self.state.lock();
        match state.card_keys.get_mut(&id) {
            Some(key) if !key.is_used() => {
                key.status = status;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_unused(&self, id: CardKeyId) -> RepoResult<bool> {
        let mut state = self.state.lock();
        let removable = state.card_keys.get(&id).is_some_and(|k| !k.is_used());
        if removable {
            state.card_keys.remove(&id);
        }
        Ok(removable)
    }

    async fn count_by_status(&self) -> RepoResult<CardKeyCounts> {
        let state = self.state.lock();
        let mut counts = CardKeyCounts::default();
        for key in state.card_keys.values() {
            match key.status {
                CardStatus::Disabled => counts.disabled += 1,
                CardStatus::Unused => counts.unused += 1,
                CardStatus::Used => counts.used += 1,
            }
        }
        Ok(counts)
    }

    async fn list(&self, filter: &CardKeyFilter) -> RepoResult<(Vec<CardKey>, i64)> {
        let state = self.state.lock();
        let mut matching: Vec<&CardKey> = state
            .card_keys
            .values()
            .filter(|k| filter.status.map_or(true, |s| k.status == s))
            .filter(|k| filter.card_type.map_or(true, |t| k.card_type == t))
            .filter(|k| {
                filter
                    .keyword
                    .as_deref()
                    .map_or(true, |kw| k.code.contains(kw) || k.remark.contains(kw))
            })
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as i64;
        let items = paginate(matching.into_iter().cloned(), filter.page);
        Ok((items, total))
    }

    async fn redeem(&self, redemption: &Redemption) -> RepoResult<()> {
        let mut state = self.state.lock();

        let key_ok = state
            .card_keys
            .get(&redemption.card_key_id)
            .is_some_and(|k| k.status == CardStatus::Unused);
        let user_ok = state
            .users
            .get(&redemption.user_id)
            .is_some_and(|(u, _)| u.vip_expire_at == redemption.previous_vip_expire_at);
        if !key_ok || !user_ok {
            return Err(DomainError::RedemptionConflict);
        }

        if let Some(key) = state.card_keys.get_mut(&redemption.card_key_id) {
            key.mark_used(redemption.user_id, redemption.redeemed_at)?;
        }
        if let Some((user, _)) = state.users.get_mut(&redemption.user_id) {
            user.grant_vip(redemption.new_vip_expire_at, redemption.redeemed_at);
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: UserId) -> RepoResult<Option<User>> {
        Ok(self.user(id))
    }

    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let found = self
            .state
            .lock()
            .users
            .values()
            .find(|(u, _)| u.username == username)
            .map(|(u, _)| u.clone());

        let pending = self.pending_redemption.lock().take();
        if let Some(redemption) = pending {
            CardKeyRepository::redeem(self, &redemption).await?;
        }
        Ok(found)
    }

    async fn find_by_media_user_id(&self, media_user_id: &str) -> RepoResult<Option<User>> {
        Ok(self
            .state
            .lock()
            .users
            .values()
            .find(|(u, _)| u.media_user_id.as_deref() == Some(media_user_id))
            .map(|(u, _)| u.clone()))
    }

    async fn create(&self, user: &User, password_hash: &str) -> RepoResult<User> {
        let mut state = self.state.lock();
        if state.users.values().any(|(u, _)| u.username == user.username) {
            return Err(DomainError::UsernameExists);
        }
        let mut user = user.clone();
        user.id = UserId::new(state.next_id());
        state
            .users
            .insert(user.id, (user.clone(), password_hash.to_string()));
        Ok(user)
    }

    async fn update(&self, user: &User) -> RepoResult<()> {
        let mut state = self.state.lock();
        let entry = state
            .users
            .get_mut(&user.id)
            .ok_or(DomainError::UserNotFound(user.id))?;
        entry.0 = user.clone();
        Ok(())
    }

    async fn link_media_user(&self, id: UserId, media_user_id: &str) -> RepoResult<bool> {
        let mut state = self.state.lock();
        match state.users.get_mut(&id) {
            Some((user, _)) if user.media_user_id.is_none() => {
                user.media_user_id = Some(media_user_id.to_string());
                user.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get_password_hash(&self, id: UserId) -> RepoResult<Option<String>> {
        Ok(self.state.lock().users.get(&id).map(|(_, h)| h.clone()))
    }

    async fn bulk_demote_expired(&self, now: DateTime<Utc>) -> RepoResult<u64> {
        if self.fail_demotion.load(Ordering::SeqCst) {
            return Err(DomainError::DatabaseError("connection reset".to_string()));
        }
        let mut state = self.state.lock();
        let mut demoted = 0;
        for (user, _) in state.users.values_mut() {
            if user.vip_level == VipLevel::Vip && user.vip_expire_at.is_some_and(|at| at < now) {
                user.demote(now);
                demoted += 1;
            }
        }
        Ok(demoted)
    }

    async fn count_expiring_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepoResult<i64> {
        Ok(self.expiring_between(from, to).len() as i64)
    }

    async fn list_expiring_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        page: PageRequest,
    ) -> RepoResult<Vec<User>> {
        Ok(paginate(self.expiring_between(from, to).into_iter(), page))
    }

    async fn list_expired_ids(
        &self,
        now: DateTime<Utc>,
        page: PageRequest,
    ) -> RepoResult<Vec<UserId>> {
        let state = self.state.lock();
        let ids = state
            .users
            .values()
            .filter(|(u, _)| {
                u.vip_level == VipLevel::Vip && u.vip_expire_at.is_some_and(|at| at < now)
            })
            .map(|(u, _)| u.id);
        Ok(paginate(ids, page))
    }

    async fn count_active_vip(&self, now: DateTime<Utc>) -> RepoResult<i64> {
        let state = self.state.lock();
        Ok(state
            .users
            .values()
            .filter(|(u, _)| {
                u.vip_level == VipLevel::Vip && u.vip_expire_at.is_some_and(|at| at > now)
            })
            .count() as i64)
    }
}

impl MemoryStore {
    /// VIPs with expiry in `(from, to]`, soonest first
    fn expiring_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<User> {
        let state = self.state.lock();
        let mut users: Vec<User> = state
            .users
            .values()
            .map(|(u, _)| u)
            .filter(|u| {
                u.vip_level == VipLevel::Vip
                    && u.vip_expire_at.is_some_and(|at| at > from && at <= to)
            })
            .cloned()
            .collect();
        users.sort_by(|a, b| a.vip_expire_at.cmp(&b.vip_expire_at).then(a.id.cmp(&b.id)));
        users
    }
}

#[async_trait]
impl AuditLogRepository for MemoryStore {
    async fn create(&self, entry: &AuditEntry) -> RepoResult<()> {
        self.add_audit_entry(entry.clone());
        Ok(())
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> RepoResult<u64> {
        let mut state = self.state.lock();
        let before = state.audit_logs.len();
        state.audit_logs.retain(|e| e.created_at >= cutoff);
        Ok((before - state.audit_logs.len()) as u64)
    }
}

#[async_trait]
impl AccessRecordRepository for MemoryStore {
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> RepoResult<u64> {
        let mut state = self.state.lock();
        let before = state.access_records.len();
        state.access_records.retain(|at| *at >= cutoff);
        Ok((before - state.access_records.len()) as u64)
    }
}

// ============================================================================
// Login attempts
// ============================================================================

#[derive(Default)]
struct AttemptState {
    counters: HashMap<String, (u32, Instant)>,
    locks: HashMap<String, Instant>,
}

/// TTL-aware attempt store on tokio's clock (works with paused time)
#[derive(Default)]
pub struct MemoryAttemptStore {
    state: Mutex<AttemptState>,
}

impl MemoryAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LoginAttemptStore for MemoryAttemptStore {
    async fn lock_ttl(&self, username: &str) -> RepoResult<Option<Duration>> {
        let now = Instant::now();
        let mut state = self.state.lock();
        match state.locks.get(username) {
            Some(until) if *until > now => Ok(Some(*until - now)),
            Some(_) => {
                state.locks.remove(username);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn attempts(&self, username: &str) -> RepoResult<u32> {
        let now = Instant::now();
        Ok(self
            .state
            .lock()
            .counters
            .get(username)
            .filter(|(_, until)| *until > now)
            .map_or(0, |(count, _)| *count))
    }

    async fn increment(&self, username: &str, window: Duration) -> RepoResult<u32> {
        let now = Instant::now();
        let mut state = self.state.lock();
        let entry = state
            .counters
            .entry(username.to_string())
            .or_insert((0, now));
        if entry.1 <= now {
            entry.0 = 0;
        }
        entry.0 += 1;
        entry.1 = now + window;
        Ok(entry.0)
    }

    async fn lock(&self, username: &str, duration: Duration) -> RepoResult<()> {
        let mut state = self.state.lock();
        state
            .locks
            .insert(username.to_string(), Instant::now() + duration);
        state.counters.remove(username);
        Ok(())
    }

    async fn clear(&self, username: &str) -> RepoResult<()> {
        self.state.lock().counters.remove(username);
        Ok(())
    }
}

// ============================================================================
// Notifications and media server
// ============================================================================

/// Records every warning; addresses marked as failing get an error instead
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<ExpiryWarning>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, address: &str) {
        self.failing.lock().insert(address.to_string());
    }

    pub fn sent(&self) -> Vec<ExpiryWarning> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_expiry_warning(&self, warning: &ExpiryWarning) -> RepoResult<()> {
        if self.failing.lock().contains(&warning.address) {
            return Err(DomainError::NotificationError(format!(
                "mailbox {} unavailable",
                warning.address
            )));
        }
        self.sent.lock().push(warning.clone());
        Ok(())
    }
}

/// Media server with a fixed account list, or a failing one
pub struct StaticDirectory {
    users: Option<Vec<MediaUser>>,
}

impl StaticDirectory {
    pub fn new(users: Vec<MediaUser>) -> Self {
        Self { users: Some(users) }
    }

    pub fn unreachable() -> Self {
        Self { users: None }
    }
}

#[async_trait]
impl MediaUserDirectory for StaticDirectory {
    async fn list_users(&self) -> RepoResult<Vec<MediaUser>> {
        self.users
            .clone()
            .ok_or_else(|| DomainError::ExternalServiceError("connection refused".to_string()))
    }
}
