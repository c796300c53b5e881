//! # Meshgate ACL Resolution Engine
//!
//! The subsystem that turns a caller's secret token and a requested action
//! into an allow/deny decision, while keeping repeated resolutions fast and
//! multi-rule authorization deterministic.
//!
//! ## Components
//!
//! - **Policy model** ([`types`]): identities, policies, roles and
//!   templated policies as plain value types.
//! - **Resolution cache** ([`cache`]): five independently sized LRU caches
//!   memoizing the identity, policy, parsed-policy, authorizer and role
//!   legs of a resolution chain.
//! - **Templated policy synthesis** ([`templated_policy`]): deterministic,
//!   schema-validated rendering of a reusable template plus variables into
//!   a concrete policy, content-addressed by BLAKE3 hash.
//! - **Intention precedence** ([`intention`]): the rule-specificity
//!   algorithm that orders wildcarded service-pair rules so exactly one
//!   outcome controls any concrete pair.
//!
//! Rule text is opaque here; parsing and enforcement belong to the external
//! authorizer layer, and durable storage belongs to the external store
//! reached through [`store::AclStore`]. The engine is a pure synchronous
//! library: it never blocks on I/O and leaves concurrency management to its
//! callers, while the cache itself is safe for concurrent use.
//!
//! ## Example
//!
//! ```rust
//! use meshgate_acl::{deduplicate, TemplatedPolicy, TemplatedPolicyVariables, TEMPLATE_SERVICE};
//!
//! let tp = TemplatedPolicy {
//!     template_name: TEMPLATE_SERVICE.to_string(),
//!     template_variables: Some(TemplatedPolicyVariables { name: "api".to_string() }),
//!     ..Default::default()
//! };
//!
//! let policy = tp.synthetic_policy(None).unwrap();
//! assert!(policy.name.starts_with("synthetic-policy-"));
//! assert_eq!(deduplicate(&[tp.clone(), tp]).len(), 1);
//! ```

pub mod cache;
pub mod error;
pub mod intention;
pub mod store;
pub mod templated_policy;
pub mod types;

// Re-export commonly used types
pub use cache::{AclCaches, AclCachesConfig, CacheEntry, IdentityCacheEntry, PolicyCacheEntry, RoleCacheEntry};
pub use error::{AclError, Result};
pub use intention::{
    IntentionAction, IntentionSourceType, ServiceIntentions, SourceIntention, WILDCARD_SPECIFIER,
};
pub use store::AclStore;
pub use templated_policy::{
    deduplicate, get_templated_policy_base, list_templated_policies, TemplatedPolicyBase,
    TEMPLATE_API_GATEWAY, TEMPLATE_DNS, TEMPLATE_NODE, TEMPLATE_NOMAD_CLIENT,
    TEMPLATE_NOMAD_SERVER, TEMPLATE_SERVICE, TEMPLATE_WORKLOAD_IDENTITY,
};
pub use types::{
    EnterpriseMeta, Identity, IdentityKind, Policy, PolicyLink, Role, TemplatedPolicy,
    TemplatedPolicyVariables,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
