//! Core ACL data model
//!
//! Plain value types shared by the resolution cache, the templated policy
//! synthesizer and the intention resolver. These carry no behavior beyond
//! equality, cloning and content-hash bookkeeping; every "mutation" after
//! resolution replaces the whole value.

use serde::{Deserialize, Serialize};

/// Default namespace for values that do not carry one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Default partition for values that do not carry one
pub const DEFAULT_PARTITION: &str = "default";

/// Kind of principal an [`Identity`] was resolved from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityKind {
    /// A regular secret token
    Token,
    /// A service identity attached to a token
    ServiceIdentity,
    /// A node identity attached to a token
    NodeIdentity,
}

/// A resolved caller principal derived from a secret token.
///
/// Identities are immutable once resolved; a cache refresh stores a new
/// value rather than mutating the old one in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Accessor ID assigned by the external store
    #[serde(rename = "ID")]
    pub id: String,

    /// The secret token this identity was resolved from
    #[serde(rename = "SecretID")]
    pub secret_id: String,

    /// What kind of principal this is
    #[serde(rename = "Kind")]
    pub kind: IdentityKind,

    /// Policies linked directly to this identity
    #[serde(rename = "PolicyIDs", default)]
    pub policy_ids: Vec<String>,

    /// Roles linked to this identity, each expanding to more policies
    #[serde(rename = "RoleIDs", default)]
    pub role_ids: Vec<String>,
}

/// A named or synthetic set of authorization rules.
///
/// `rules` is opaque text; parsing and enforcement belong to the external
/// authorizer layer. For synthetic policies `id` is derived from `rules`
/// by content hash, so identical rule text always collapses to one ID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Store-assigned ID, or `hex(blake3(rules))` for synthetic policies
    #[serde(rename = "ID")]
    pub id: String,

    /// Human-readable policy name
    #[serde(rename = "Name")]
    pub name: String,

    /// Operator-facing description
    #[serde(rename = "Description", default)]
    pub description: String,

    /// Opaque rule text handed to the external authorizer
    #[serde(rename = "Rules")]
    pub rules: String,

    /// Datacenters the policy is valid in; empty means all
    #[serde(rename = "Datacenters", default)]
    pub datacenters: Vec<String>,

    /// Content hash over the hash-relevant fields, see [`Policy::set_content_hash`]
    #[serde(rename = "ContentHash", default)]
    pub content_hash: String,
}

impl Policy {
    /// Recompute `content_hash` from the name, rule text and datacenters.
    ///
    /// The hash algorithm is frozen at BLAKE3; changing it would silently
    /// invalidate every cached resolution keyed by content hash.
    pub fn set_content_hash(&mut self) {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.name.as_bytes());
        hasher.update(self.rules.as_bytes());
        for dc in &self.datacenters {
            hasher.update(dc.as_bytes());
        }
        self.content_hash = hasher.finalize().to_hex().to_string();
    }
}

/// Reference from a role to a policy, by ID and display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyLink {
    /// ID of the linked policy
    #[serde(rename = "ID")]
    pub id: String,

    /// Name of the linked policy at link time
    #[serde(rename = "Name", default)]
    pub name: String,
}

/// A named, indirect bundle of policy references.
///
/// Roles never embed policy bodies; resolution expands `policy_links`
/// through the store (or the cache in front of it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Store-assigned role ID
    #[serde(rename = "ID")]
    pub id: String,

    /// Human-readable role name
    #[serde(rename = "Name")]
    pub name: String,

    /// Policies this role grants
    #[serde(rename = "Policies", default)]
    pub policy_links: Vec<PolicyLink>,
}

/// Declarative intent to synthesize a policy from a named template.
///
/// Two templated policies with equal `(template_name, template_variables)`
/// are duplicates regardless of `datacenters`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplatedPolicy {
    /// Registry ID of the template; hidden from displays
    #[serde(rename = "TemplateID", default)]
    pub template_id: String,

    /// Registry name of the template, e.g. `builtin/service`
    #[serde(rename = "TemplateName")]
    pub template_name: String,

    /// Input variables the template renders against
    #[serde(rename = "TemplateVariables", default, skip_serializing_if = "Option::is_none")]
    pub template_variables: Option<TemplatedPolicyVariables>,

    /// Datacenters the synthetic policy will be valid in; empty means all
    #[serde(rename = "Datacenters", default)]
    pub datacenters: Vec<String>,
}

/// Input variables required to render templated policies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplatedPolicyVariables {
    /// Service or node name the rendered rules are scoped to
    #[serde(rename = "name", default)]
    pub name: String,
}

/// Namespace/partition scope attached to policies and intentions.
///
/// `None` means "not specified"; [`EnterpriseMeta::normalize`] fills in the
/// process-wide defaults. Accessors never return an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnterpriseMeta {
    /// Namespace, or `None` for the default namespace
    #[serde(rename = "Namespace", default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Partition, or `None` for the default partition
    #[serde(rename = "Partition", default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<String>,
}

impl EnterpriseMeta {
    /// Scope with an explicit namespace, default partition
    pub fn in_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            partition: None,
        }
    }

    /// The namespace, or `"default"` when unspecified
    pub fn namespace_or_default(&self) -> &str {
        self.namespace.as_deref().filter(|ns| !ns.is_empty()).unwrap_or(DEFAULT_NAMESPACE)
    }

    /// The partition, or `"default"` when unspecified
    pub fn partition_or_default(&self) -> &str {
        self.partition.as_deref().filter(|p| !p.is_empty()).unwrap_or(DEFAULT_PARTITION)
    }

    /// Fill unspecified fields with the process-wide defaults
    pub fn normalize(&mut self) {
        if self.namespace.as_deref().unwrap_or("").is_empty() {
            self.namespace = Some(DEFAULT_NAMESPACE.to_string());
        }
        if self.partition.as_deref().unwrap_or("").is_empty() {
            self.partition = Some(DEFAULT_PARTITION.to_string());
        }
    }

    /// Inherit unspecified fields from `other`.
    ///
    /// Wildcard values in `other` are not inherited: an intention source
    /// under a wildcard destination namespace falls back to the default
    /// namespace instead of becoming wildcarded itself.
    pub fn merge_no_wildcard(&mut self, other: &EnterpriseMeta) {
        if self.namespace.as_deref().unwrap_or("").is_empty() {
            let ns = other.namespace_or_default();
            if ns != crate::intention::WILDCARD_SPECIFIER {
                self.namespace = Some(ns.to_string());
            }
        }
        if self.partition.as_deref().unwrap_or("").is_empty() {
            let p = other.partition_or_default();
            if p != crate::intention::WILDCARD_SPECIFIER {
                self.partition = Some(p.to_string());
            }
        }
    }
}
