//! External ACL store boundary
//!
//! The durable store that owns ACL records lives outside this crate; the
//! resolver surrounding the engine fetches through this trait only on a
//! cache miss and pushes the result back into [`crate::cache::AclCaches`].

use crate::error::Result;
use crate::types::{Identity, Policy, Role};

/// Read access to persisted ACL records.
///
/// Implementations may block on I/O internally; this crate never calls the
/// store itself, it only defines the seam for the surrounding resolver.
pub trait AclStore: Send + Sync {
    /// Resolve a secret token to the identity it belongs to, or `None`
    /// when no such token exists.
    fn fetch_identity(&self, secret_token: &str) -> Result<Option<Identity>>;

    /// Fetch a policy by ID, or `None` when it was deleted.
    fn fetch_policy(&self, id: &str) -> Result<Option<Policy>>;

    /// Fetch a role by ID, or `None` when it was deleted.
    fn fetch_role(&self, id: &str) -> Result<Option<Role>>;
}
