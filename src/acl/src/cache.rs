//! Multi-tier resolution cache
//!
//! Five independently sized, independently evictable LRU caches that
//! memoize the identity, policy, parsed-policy, authorizer and role legs of
//! a token resolution chain. The cache records entry age but never makes a
//! freshness decision itself; callers read [`CacheEntry::age`] and apply
//! their own staleness policy. Eviction is by capacity or explicit
//! removal only.
//!
//! Each cache kind holds its own lock, so a write to the policy cache never
//! blocks a read of the role cache. There is no cross-cache atomicity: a
//! concurrent reader may observe a refreshed identity next to a still-stale
//! policy, which the surrounding resolver accepts as eventual refresh.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{AclError, Result};
use crate::types::{Identity, Policy, Role};

/// Key prefix for identity entries keyed by accessor ID
const KEY_PREFIX_TOKEN_ID: &str = "token-id:";

/// Key prefix for identity entries keyed by secret token
const KEY_PREFIX_TOKEN_SECRET: &str = "token-secret:";

/// Capacity for each cache kind.
///
/// A capacity of `0` disables that kind; every operation on a disabled
/// cache is a safe no-op. A capacity of `1` is rejected at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AclCachesConfig {
    /// Identity entries (shared between accessor-ID and secret-token keys)
    pub identities: usize,
    /// Raw policy entries keyed by policy ID
    pub policies: usize,
    /// Parsed policy entries keyed by rules content hash
    pub parsed_policies: usize,
    /// Compiled authorizer entries keyed by policy-set hash
    pub authorizers: usize,
    /// Role entries keyed by role ID
    pub roles: usize,
}

/// A cached value plus its insertion time
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// The cached value
    pub value: T,
    cached_at: Instant,
}

impl<T> CacheEntry<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            cached_at: Instant::now(),
        }
    }

    /// Time since this entry was inserted. Callers use this to decide
    /// whether a hit is still fresh enough for their purposes.
    pub fn age(&self) -> Duration {
        self.cached_at.elapsed()
    }
}

/// Cache entry holding a resolved identity
pub type IdentityCacheEntry = CacheEntry<Arc<Identity>>;
/// Cache entry holding a raw policy
pub type PolicyCacheEntry = CacheEntry<Arc<Policy>>;
/// Cache entry holding a role
pub type RoleCacheEntry = CacheEntry<Arc<Role>>;

type Shard<T> = Option<Mutex<LruCache<String, CacheEntry<Arc<T>>>>>;

/// The five resolution caches.
///
/// `P` is the parsed-policy type and `A` the compiled-authorizer type; both
/// are produced and consumed by the external rules engine, this crate only
/// stores them. Callers that may run without any caching at all hold an
/// `Option<AclCaches<..>>`; a present cache with zero capacities behaves
/// identically to an absent one.
pub struct AclCaches<P = (), A = ()> {
    identities: Shard<Identity>,
    policies: Shard<Policy>,
    parsed_policies: Shard<P>,
    authorizers: Shard<A>,
    roles: Shard<Role>,
}

fn build_shard<T>(kind: &str, capacity: usize) -> Result<Shard<T>> {
    match capacity {
        0 => Ok(None),
        1 => Err(AclError::Configuration(format!(
            "{kind} cache capacity 1 is not supported; use 0 to disable or 2 and above"
        ))),
        n => {
            let cap = NonZeroUsize::new(n).ok_or_else(|| {
                AclError::Configuration(format!("{kind} cache capacity {n} is invalid"))
            })?;
            Ok(Some(Mutex::new(LruCache::new(cap))))
        }
    }
}

impl<P, A> AclCaches<P, A> {
    /// Build the caches from `config`. `None`, like a zeroed config,
    /// disables every kind.
    ///
    /// # Errors
    ///
    /// Returns [`AclError::Configuration`] when any kind is given a
    /// capacity of exactly `1`, which the eviction policy cannot support.
    pub fn new(config: Option<&AclCachesConfig>) -> Result<Self> {
        let config = config.copied().unwrap_or_default();
        Ok(Self {
            identities: build_shard("identities", config.identities)?,
            policies: build_shard("policies", config.policies)?,
            parsed_policies: build_shard("parsed-policies", config.parsed_policies)?,
            authorizers: build_shard("authorizers", config.authorizers)?,
            roles: build_shard("roles", config.roles)?,
        })
    }

    fn get<T>(shard: &Shard<T>, key: &str) -> Option<CacheEntry<Arc<T>>> {
        shard.as_ref()?.lock().get(key).cloned()
    }

    fn put<T>(shard: &Shard<T>, key: String, value: Arc<T>) {
        if let Some(cache) = shard {
            cache.lock().put(key, CacheEntry::new(value));
        }
    }

    fn remove<T>(shard: &Shard<T>, key: &str) {
        if let Some(cache) = shard {
            cache.lock().pop(key);
        }
    }

    /// Look up an identity by accessor ID
    pub fn get_identity(&self, id: &str) -> Option<IdentityCacheEntry> {
        Self::get(&self.identities, &format!("{KEY_PREFIX_TOKEN_ID}{id}"))
    }

    /// Insert an identity keyed by accessor ID
    pub fn put_identity(&self, id: &str, identity: Arc<Identity>) {
        Self::put(&self.identities, format!("{KEY_PREFIX_TOKEN_ID}{id}"), identity);
    }

    /// Remove the identity entry for an accessor ID
    pub fn remove_identity(&self, id: &str) {
        Self::remove(&self.identities, &format!("{KEY_PREFIX_TOKEN_ID}{id}"));
    }

    /// Look up an identity by the secret token it was resolved from.
    ///
    /// Secret-token entries live in the same map as accessor-ID entries
    /// under a distinct key prefix, so the two keyspaces cannot collide.
    pub fn get_identity_with_secret_token(&self, token: &str) -> Option<IdentityCacheEntry> {
        Self::get(&self.identities, &format!("{KEY_PREFIX_TOKEN_SECRET}{token}"))
    }

    /// Insert an identity keyed by secret token
    pub fn put_identity_with_secret_token(&self, token: &str, identity: Arc<Identity>) {
        Self::put(
            &self.identities,
            format!("{KEY_PREFIX_TOKEN_SECRET}{token}"),
            identity,
        );
    }

    /// Remove the identity entry for a secret token
    pub fn remove_identity_with_secret_token(&self, token: &str) {
        Self::remove(&self.identities, &format!("{KEY_PREFIX_TOKEN_SECRET}{token}"));
    }

    /// Look up a raw policy by ID
    pub fn get_policy(&self, id: &str) -> Option<PolicyCacheEntry> {
        Self::get(&self.policies, id)
    }

    /// Insert a raw policy keyed by ID
    pub fn put_policy(&self, id: &str, policy: Arc<Policy>) {
        Self::put(&self.policies, id.to_string(), policy);
    }

    /// Remove the policy entry for an ID
    pub fn remove_policy(&self, id: &str) {
        Self::remove(&self.policies, id);
    }

    /// Look up a parsed policy by rules content hash
    pub fn get_parsed_policy(&self, hash: &str) -> Option<CacheEntry<Arc<P>>> {
        Self::get(&self.parsed_policies, hash)
    }

    /// Insert a parsed policy keyed by rules content hash
    pub fn put_parsed_policy(&self, hash: &str, parsed: Arc<P>) {
        Self::put(&self.parsed_policies, hash.to_string(), parsed);
    }

    /// Remove the parsed-policy entry for a content hash
    pub fn remove_parsed_policy(&self, hash: &str) {
        Self::remove(&self.parsed_policies, hash);
    }

    /// Look up a compiled authorizer by policy-set hash
    pub fn get_authorizer(&self, key: &str) -> Option<CacheEntry<Arc<A>>> {
        Self::get(&self.authorizers, key)
    }

    /// Insert a compiled authorizer keyed by policy-set hash
    pub fn put_authorizer(&self, key: &str, authorizer: Arc<A>) {
        Self::put(&self.authorizers, key.to_string(), authorizer);
    }

    /// Remove the authorizer entry for a policy-set hash
    pub fn remove_authorizer(&self, key: &str) {
        Self::remove(&self.authorizers, key);
    }

    /// Look up a role by ID
    pub fn get_role(&self, id: &str) -> Option<RoleCacheEntry> {
        Self::get(&self.roles, id)
    }

    /// Insert a role keyed by ID
    pub fn put_role(&self, id: &str, role: Arc<Role>) {
        Self::put(&self.roles, id.to_string(), role);
    }

    /// Remove the role entry for an ID
    pub fn remove_role(&self, id: &str) {
        Self::remove(&self.roles, id);
    }

    /// Flush every entry from all five caches.
    ///
    /// Used when the underlying ACL data is replaced in bulk, e.g. after a
    /// snapshot restore, and every cached resolution may be stale.
    pub fn purge(&self) {
        fn clear<T>(shard: &Shard<T>) {
            if let Some(cache) = shard {
                cache.lock().clear();
            }
        }
        clear(&self.identities);
        clear(&self.policies);
        clear(&self.parsed_policies);
        clear(&self.authorizers);
        clear(&self.roles);
        debug!("purged all acl resolution caches");
    }
}
