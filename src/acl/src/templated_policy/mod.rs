//! Templated policy synthesis
//!
//! Turns a `(template name, variables)` pair into a concrete,
//! content-addressed [`Policy`]. Rendering is deterministic: the same
//! inputs always produce byte-identical rules, and the policy ID is the
//! BLAKE3 hash of the rendered rule text, so identical templated policies
//! collapse to the same synthetic policy. Nothing here memoizes; callers
//! that want caching put the result in the resolution cache.

mod registry;

pub use registry::{
    get_templated_policy_base, list_templated_policies, TemplatedPolicyBase,
    NO_REQUIRED_VARIABLES_SCHEMA, TEMPLATE_API_GATEWAY, TEMPLATE_DNS, TEMPLATE_NODE,
    TEMPLATE_NOMAD_CLIENT, TEMPLATE_NOMAD_SERVER, TEMPLATE_SERVICE, TEMPLATE_WORKLOAD_IDENTITY,
};

use std::collections::HashMap;
use std::sync::LazyLock;

use minijinja::{context, Environment, UndefinedBehavior};
use regex::Regex;
use tracing::trace;

use crate::error::{AclError, Result};
use crate::types::{EnterpriseMeta, Policy, TemplatedPolicy, TemplatedPolicyVariables};

/// Longest accepted service or node identity name
pub const IDENTITY_NAME_MAX_LENGTH: usize = 256;

static VALID_IDENTITY_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([a-z0-9\-_]*[a-z0-9])?$").expect("identity name pattern is valid")
});

/// Whether `name` is acceptable as a service or node identity name:
/// lowercase alphanumeric characters, `-` and `_` only, neither leading
/// nor trailing punctuation.
pub fn is_valid_identity_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= IDENTITY_NAME_MAX_LENGTH && VALID_IDENTITY_NAME.is_match(name)
}

impl TemplatedPolicy {
    /// Validate the template variables against `schema`.
    ///
    /// An empty schema means the template needs no variables and always
    /// passes. The `builtin/service` and `builtin/node` templates
    /// additionally enforce the identity name format, independently of the
    /// schema check; passing one does not imply passing the other.
    ///
    /// # Errors
    ///
    /// Returns [`AclError::Validation`] listing every schema violation and
    /// name-format problem found, or [`AclError::Configuration`] when
    /// `schema` itself cannot be loaded.
    pub fn validate(&self, schema: &str) -> Result<()> {
        if schema.is_empty() {
            return Ok(());
        }

        let schema_json: serde_json::Value = serde_json::from_str(schema).map_err(|e| {
            AclError::Configuration(format!("failed to load json schema for validation: {e}"))
        })?;
        let validator = jsonschema::validator_for(&schema_json).map_err(|e| {
            AclError::Configuration(format!("failed to load json schema for validation: {e}"))
        })?;

        // None serializes to null, which object-typed schemas reject with a
        // regular violation rather than a hard error.
        let variables = serde_json::to_value(&self.template_variables).map_err(|e| {
            AclError::Configuration(format!("failed to encode template variables: {e}"))
        })?;

        let mut violations: Vec<String> =
            validator.iter_errors(&variables).map(|e| e.to_string()).collect();

        if let Some(vars) = &self.template_variables {
            if self.template_name == TEMPLATE_SERVICE && !is_valid_identity_name(&vars.name) {
                violations.push(format!(
                    "service identity {:?} has an invalid name. Only lowercase alphanumeric \
                     characters, '-' and '_' are allowed",
                    vars.name
                ));
            }
            if self.template_name == TEMPLATE_NODE && !is_valid_identity_name(&vars.name) {
                violations.push(format!(
                    "node identity {:?} has an invalid name. Only lowercase alphanumeric \
                     characters, '-' and '_' are allowed",
                    vars.name
                ));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(AclError::Validation(violations))
        }
    }

    /// Render this templated policy into a concrete, content-addressed
    /// synthetic [`Policy`].
    ///
    /// The rendered rules are hashed with BLAKE3 and the hex digest becomes
    /// both the policy ID and the `synthetic-policy-<id>` name, making the
    /// operation idempotent. The namespace and partition of `ent_meta`
    /// (defaults when `None`) are available to the template body alongside
    /// the variables.
    ///
    /// # Errors
    ///
    /// Returns [`AclError::Configuration`] for an unregistered template
    /// name and [`AclError::TemplateRender`] when the template body fails
    /// to render, which for built-ins indicates corrupted registry state.
    pub fn synthetic_policy(&self, ent_meta: Option<&EnterpriseMeta>) -> Result<Policy> {
        let rules = self.render_rules(ent_meta)?;
        let id = blake3::hash(rules.as_bytes()).to_hex().to_string();
        trace!(template = %self.template_name, policy_id = %id, "synthesized policy");

        let mut policy = Policy {
            name: format!("synthetic-policy-{id}"),
            description: format!(
                "synthetic policy generated from templated policy: {}",
                self.template_name
            ),
            id,
            rules,
            datacenters: self.datacenters.clone(),
            content_hash: String::new(),
        };
        policy.set_content_hash();
        Ok(policy)
    }

    fn render_rules(&self, ent_meta: Option<&EnterpriseMeta>) -> Result<String> {
        let default_meta = EnterpriseMeta::default();
        let ent_meta = ent_meta.unwrap_or(&default_meta);

        let base = get_templated_policy_base(&self.template_name).ok_or_else(|| {
            AclError::Configuration(format!(
                "templated policy does not exist: {}",
                self.template_name
            ))
        })?;

        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        let template = env
            .template_from_named_str(base.template_name, base.template)
            .map_err(|e| AclError::TemplateRender {
                template: self.template_name.clone(),
                message: e.to_string(),
            })?;

        template
            .render(context! {
                name => self.template_variables.as_ref().map(|v| v.name.as_str()).unwrap_or(""),
                namespace => ent_meta.namespace_or_default(),
                partition => ent_meta.partition_or_default(),
            })
            .map_err(|e| AclError::TemplateRender {
                template: self.template_name.clone(),
                message: e.to_string(),
            })
    }
}

/// Remove duplicate `(template name, variables)` pairs, preserving
/// first-seen order.
///
/// Templates whose schema requires no variables are deduplicated by name
/// alone, since their variables cannot change the rendered output.
pub fn deduplicate(templated_policies: &[TemplatedPolicy]) -> Vec<TemplatedPolicy> {
    let mut seen: HashMap<String, Vec<TemplatedPolicyVariables>> = HashMap::new();
    let mut out = Vec::new();

    for tp in templated_policies {
        let name_seen = seen.contains_key(&tp.template_name);
        let seen_variables = seen.entry(tp.template_name.clone()).or_default();

        let schema_is_empty = get_templated_policy_base(&tp.template_name)
            .map(|base| base.schema.is_empty())
            .unwrap_or(false);
        if schema_is_empty {
            if !name_seen {
                out.push(tp.clone());
            }
            continue;
        }

        let variables = tp.template_variables.clone().unwrap_or_default();
        if !seen_variables.contains(&variables) {
            seen_variables.push(variables);
            out.push(tp.clone());
        }
    }

    out
}
