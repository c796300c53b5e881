//! End-to-end resolution flow tests
//!
//! Exercises the cache, synthesizer and store boundary together the way the
//! surrounding resolver uses them: probe the cache by secret token, fall
//! back to the store on a miss, synthesize policies for templated matches
//! and push everything back into the cache.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use meshgate_acl::{
    deduplicate, AclCaches, AclCachesConfig, AclError, AclStore, Identity, IdentityKind, Policy,
    Result, Role, TemplatedPolicy, TemplatedPolicyVariables, TEMPLATE_DNS, TEMPLATE_SERVICE,
};

/// Install a subscriber so cache and normalization events show up under
/// `RUST_LOG`. Safe to call from every test; only the first call wins.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory store standing in for the durable ACL backend
#[derive(Default)]
struct FakeStore {
    identities_by_secret: Mutex<HashMap<String, Identity>>,
    policies: Mutex<HashMap<String, Policy>>,
    roles: Mutex<HashMap<String, Role>>,
    fetches: Mutex<usize>,
    unavailable: Mutex<bool>,
}

impl FakeStore {
    fn add_identity(&self, identity: Identity) {
        self.identities_by_secret
            .lock()
            .insert(identity.secret_id.clone(), identity);
    }

    fn fetch_count(&self) -> usize {
        *self.fetches.lock()
    }

    /// Make every subsequent fetch fail, as if the backend went down.
    fn set_unavailable(&self) {
        *self.unavailable.lock() = true;
    }

    fn check_available(&self) -> Result<()> {
        if *self.unavailable.lock() {
            return Err(AclError::Store("acl backend unavailable".to_string()));
        }
        Ok(())
    }
}

impl AclStore for FakeStore {
    fn fetch_identity(&self, secret_token: &str) -> Result<Option<Identity>> {
        self.check_available()?;
        *self.fetches.lock() += 1;
        Ok(self.identities_by_secret.lock().get(secret_token).cloned())
    }

    fn fetch_policy(&self, id: &str) -> Result<Option<Policy>> {
        self.check_available()?;
        *self.fetches.lock() += 1;
        Ok(self.policies.lock().get(id).cloned())
    }

    fn fetch_role(&self, id: &str) -> Result<Option<Role>> {
        self.check_available()?;
        *self.fetches.lock() += 1;
        Ok(self.roles.lock().get(id).cloned())
    }
}

fn caches() -> AclCaches {
    let config = AclCachesConfig {
        identities: 32,
        policies: 32,
        parsed_policies: 32,
        authorizers: 32,
        roles: 32,
    };
    AclCaches::new(Some(&config)).unwrap()
}

fn service_template(name: &str) -> TemplatedPolicy {
    TemplatedPolicy {
        template_name: TEMPLATE_SERVICE.to_string(),
        template_variables: Some(TemplatedPolicyVariables {
            name: name.to_string(),
        }),
        ..Default::default()
    }
}

/// Resolve a secret token through the cache, hitting the store on a miss
/// the way the surrounding resolver does.
fn resolve_identity(
    caches: &AclCaches,
    store: &dyn AclStore,
    secret_token: &str,
) -> Result<Option<Arc<Identity>>> {
    if let Some(entry) = caches.get_identity_with_secret_token(secret_token) {
        return Ok(Some(entry.value));
    }
    match store.fetch_identity(secret_token)? {
        Some(identity) => {
            let identity = Arc::new(identity);
            caches.put_identity_with_secret_token(secret_token, Arc::clone(&identity));
            caches.put_identity(&identity.id, Arc::clone(&identity));
            Ok(Some(identity))
        }
        None => Ok(None),
    }
}

#[test]
fn test_miss_then_hit_avoids_store() {
    init_tracing();
    let store = FakeStore::default();
    store.add_identity(Identity {
        id: "accessor-1".to_string(),
        secret_id: "secret-1".to_string(),
        kind: IdentityKind::Token,
        policy_ids: vec![],
        role_ids: vec![],
    });
    let caches = caches();

    let first = resolve_identity(&caches, &store, "secret-1").unwrap().unwrap();
    assert_eq!(first.id, "accessor-1");
    assert_eq!(store.fetch_count(), 1);

    // Second resolution is served from the cache.
    let second = resolve_identity(&caches, &store, "secret-1").unwrap().unwrap();
    assert_eq!(second.id, "accessor-1");
    assert_eq!(store.fetch_count(), 1);

    // The by-ID access path was populated as a side effect.
    assert!(caches.get_identity("accessor-1").is_some());
}

#[test]
fn test_unknown_token_is_a_miss_not_an_error() {
    init_tracing();
    let store = FakeStore::default();
    let caches = caches();
    assert!(resolve_identity(&caches, &store, "no-such-token").unwrap().is_none());
}

#[test]
fn test_purge_forces_refetch() {
    init_tracing();
    let store = FakeStore::default();
    store.add_identity(Identity {
        id: "accessor-1".to_string(),
        secret_id: "secret-1".to_string(),
        kind: IdentityKind::Token,
        policy_ids: vec![],
        role_ids: vec![],
    });
    let caches = caches();

    resolve_identity(&caches, &store, "secret-1").unwrap();
    caches.purge();
    resolve_identity(&caches, &store, "secret-1").unwrap();
    assert_eq!(store.fetch_count(), 2);
}

#[test]
fn test_store_failure_propagates() {
    init_tracing();
    let store = FakeStore::default();
    store.add_identity(Identity {
        id: "accessor-1".to_string(),
        secret_id: "secret-1".to_string(),
        kind: IdentityKind::Token,
        policy_ids: vec![],
        role_ids: vec![],
    });
    let caches = caches();

    resolve_identity(&caches, &store, "secret-1").unwrap();
    store.set_unavailable();

    // A cached token still resolves while the backend is down.
    assert!(resolve_identity(&caches, &store, "secret-1").unwrap().is_some());

    // An uncached token surfaces the store failure, not a miss.
    match resolve_identity(&caches, &store, "secret-2") {
        Err(AclError::Store(msg)) => assert!(msg.contains("unavailable")),
        other => panic!("expected store error, got {other:?}"),
    }
}

#[test]
fn test_templated_resolution_end_to_end() {
    init_tracing();
    // A token carrying duplicated templated policies: dedup first, then
    // synthesize each survivor and cache it by its content-addressed ID.
    let templated = vec![
        service_template("api"),
        service_template("api"),
        TemplatedPolicy {
            template_name: TEMPLATE_DNS.to_string(),
            ..Default::default()
        },
        TemplatedPolicy {
            template_name: TEMPLATE_DNS.to_string(),
            ..Default::default()
        },
    ];

    let deduped = deduplicate(&templated);
    assert_eq!(deduped.len(), 2);

    let caches = caches();
    for tp in &deduped {
        let policy = tp.synthetic_policy(None).unwrap();
        let id = policy.id.clone();
        caches.put_policy(&id, Arc::new(policy));
    }

    // Re-synthesizing yields the same IDs, so lookups hit the same entries.
    for tp in &deduped {
        let policy = tp.synthetic_policy(None).unwrap();
        let cached = caches.get_policy(&policy.id).expect("cache hit");
        assert_eq!(cached.value.rules, policy.rules);
    }

    let api = deduped[0].synthetic_policy(None).unwrap();
    assert!(api.rules.contains(r#"service "api" {"#));
    assert!(api.rules.contains(r#"policy = "write""#));
}

#[test]
fn test_entry_age_supports_staleness_policies() {
    init_tracing();
    let caches = caches();
    caches.put_policy(
        "p1",
        Arc::new(Policy {
            id: "p1".to_string(),
            name: "ops".to_string(),
            rules: String::new(),
            ..Default::default()
        }),
    );

    let entry = caches.get_policy("p1").unwrap();
    // The caller decides freshness; the cache only reports age.
    let fresh_enough = entry.age() < std::time::Duration::from_secs(30);
    assert!(fresh_enough);
}
