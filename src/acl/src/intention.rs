//! Intention precedence resolution
//!
//! Service-mesh intentions authorize traffic between a source and a
//! destination service, where each side of the pair is an exact name or
//! the wildcard specifier. When several rules could match a concrete pair,
//! the rule with the highest precedence controls enforcement; precedence is
//! derived from how specific each side of the rule is and is recomputed on
//! every normalization pass, never authored directly.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AclError, Result};
use crate::types::EnterpriseMeta;

/// The reserved token meaning "match any value". Valid only as the entire
/// field, never as part of a larger string.
pub const WILDCARD_SPECIFIER: &str = "*";

/// Longest accepted source description
pub const DESCRIPTION_MAX_LENGTH: usize = 512;

/// What an intention does with matched traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentionAction {
    /// Permit the connection
    Allow,
    /// Reject the connection
    Deny,
}

/// Where an intention source was authored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentionSourceType {
    /// A mesh service registered in the catalog
    #[default]
    Mesh,
}

/// A single source rule under a destination's intention entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceIntention {
    /// Source service name, exact or the wildcard specifier
    #[serde(rename = "Name")]
    pub name: String,

    /// Source namespace/partition scope
    #[serde(rename = "EnterpriseMeta", default)]
    pub enterprise_meta: EnterpriseMeta,

    /// What to do with traffic from this source; required
    #[serde(rename = "Action", default, skip_serializing_if = "Option::is_none")]
    pub action: Option<IntentionAction>,

    /// Derived specificity rank; recomputed by [`ServiceIntentions::normalize`],
    /// never authored
    #[serde(rename = "Precedence", default)]
    pub precedence: i32,

    /// Operator-facing description
    #[serde(rename = "Description", default)]
    pub description: String,

    /// Where this source was authored
    #[serde(rename = "Type", default)]
    pub source_type: IntentionSourceType,
}

/// The set of intention rules targeting one destination service.
///
/// `name` and `enterprise_meta` describe the destination side; every entry
/// in `sources` shares that destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceIntentions {
    /// Destination service name, exact or the wildcard specifier
    #[serde(rename = "Name")]
    pub name: String,

    /// Destination namespace/partition scope
    #[serde(rename = "EnterpriseMeta", default)]
    pub enterprise_meta: EnterpriseMeta,

    /// Source rules, highest precedence first after normalization
    #[serde(rename = "Sources", default)]
    pub sources: Vec<SourceIntention>,
}

impl ServiceIntentions {
    /// Fill defaults, recompute precedence and order sources by descending
    /// precedence.
    ///
    /// Must stay deterministic so that replicated copies of the same entry
    /// normalize identically: no clocks, no ID assignment. Namespaces are
    /// defaulted before precedence is computed, since they factor into the
    /// count of exact fields. The sort is stable, so equal-precedence
    /// sources keep their relative input order.
    pub fn normalize(&mut self) {
        self.enterprise_meta.normalize();

        for src in &mut self.sources {
            // A source under a wildcard destination namespace falls back to
            // the default namespace rather than inheriting the wildcard.
            src.enterprise_meta.merge_no_wildcard(&self.enterprise_meta);
            src.enterprise_meta.normalize();

            src.precedence = compute_intention_precedence(&self.name, &self.enterprise_meta, src);
        }

        self.sources.sort_by(|a, b| b.precedence.cmp(&a.precedence));
        debug!(destination = %self.name, sources = self.sources.len(), "normalized intentions");
    }

    /// Whether the destination side matches any service
    pub fn has_wildcard_destination(&self) -> bool {
        self.enterprise_meta.namespace_or_default() == WILDCARD_SPECIFIER
            || self.name == WILDCARD_SPECIFIER
    }

    /// Check wildcard placement, required fields and duplicate sources.
    ///
    /// # Errors
    ///
    /// Returns [`AclError::Validation`] carrying every violation found
    /// across the destination and all sources, so a single round trip is
    /// enough to fix them all.
    pub fn validate(&self) -> Result<()> {
        let mut violations = Vec::new();

        if self.name.is_empty() {
            violations.push("Name is required".to_string());
        }
        violations.extend(validate_intention_wildcards(&self.name, &self.enterprise_meta));

        if self.sources.is_empty() {
            violations.push("At least one source is required".to_string());
        }

        let mut seen_sources: HashSet<(String, String, String)> = HashSet::new();
        for (i, src) in self.sources.iter().enumerate() {
            if src.name.is_empty() {
                violations.push(format!("Sources[{i}].Name is required"));
            }
            for problem in validate_intention_wildcards(&src.name, &src.enterprise_meta) {
                violations.push(format!("Sources[{i}].{problem}"));
            }

            if src.action.is_none() {
                violations.push(format!("Sources[{i}].Action must be set to 'allow' or 'deny'"));
            }

            if src.description.len() > DESCRIPTION_MAX_LENGTH {
                violations.push(format!(
                    "Sources[{i}].Description exceeds maximum length {DESCRIPTION_MAX_LENGTH}"
                ));
            }

            let qualified = (
                src.enterprise_meta.partition_or_default().to_string(),
                src.enterprise_meta.namespace_or_default().to_string(),
                src.name.clone(),
            );
            if !seen_sources.insert(qualified.clone()) {
                violations.push(format!(
                    "Sources[{i}] defines \"{}/{}/{}\" more than once",
                    qualified.0, qualified.1, qualified.2
                ));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(AclError::Validation(violations))
        }
    }
}

/// Number of exact (non-wildcard) fields in a namespace/name pair.
///
/// A wildcard namespace forces the whole pair to count as zero: an exact
/// name is meaningless once its namespace already matches anything, and
/// validation rejects that shape outright.
fn count_exact(name: &str, meta: &EnterpriseMeta) -> i32 {
    if meta.namespace_or_default() == WILDCARD_SPECIFIER {
        return 0;
    }
    if name == WILDCARD_SPECIFIER {
        return 1;
    }
    2
}

/// Specificity rank of one source rule under the given destination.
///
/// Assumes namespaces are already normalized. The destination picks the
/// band (9, 6 or 3 for two, one or zero exact fields) and the source picks
/// the position within it, yielding the full most-to-least-specific
/// ordering from `(exact,exact,exact,exact)=9` down to `(*,*,*,*)=1`.
fn compute_intention_precedence(
    dest_name: &str,
    dest_meta: &EnterpriseMeta,
    src: &SourceIntention,
) -> i32 {
    let max = match count_exact(dest_name, dest_meta) {
        2 => 9,
        1 => 6,
        _ => 3,
    };
    max - (2 - count_exact(&src.name, &src.enterprise_meta))
}

/// Wildcard placement problems for one namespace/name pair, empty when valid
fn validate_intention_wildcards(name: &str, meta: &EnterpriseMeta) -> Vec<String> {
    let mut problems = Vec::new();

    let ns = meta.namespace_or_default();
    if ns != WILDCARD_SPECIFIER && ns.contains(WILDCARD_SPECIFIER) {
        problems.push("Namespace: wildcard character '*' cannot be used with partial values".to_string());
    }

    if name != WILDCARD_SPECIFIER {
        if name.contains(WILDCARD_SPECIFIER) {
            problems.push("Name: wildcard character '*' cannot be used with partial values".to_string());
        }
        if ns == WILDCARD_SPECIFIER {
            problems.push("Name: exact value cannot follow wildcard namespace".to_string());
        }
    }

    if meta.partition_or_default().contains(WILDCARD_SPECIFIER) {
        problems.push("Partition: cannot use wildcard '*' in partition".to_string());
    }

    problems
}
