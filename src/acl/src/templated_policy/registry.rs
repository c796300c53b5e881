//! Built-in templated policy registry
//!
//! A fixed, read-only table mapping template name to template body, variable
//! schema and description. Initialized once at first use and never mutated
//! afterward; accessors hand out copies, never the live map.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Serialize;

/// Template granting a service and its sidecar proxy mesh registration rights
pub const TEMPLATE_SERVICE: &str = "builtin/service";
/// Template granting an agent/node catalog registration rights
pub const TEMPLATE_NODE: &str = "builtin/node";
/// Template granting read access for DNS queries across the catalog
pub const TEMPLATE_DNS: &str = "builtin/dns";
/// Template granting a workload identity write access to itself
pub const TEMPLATE_WORKLOAD_IDENTITY: &str = "builtin/workload-identity";
/// Template granting an API gateway its mesh and catalog permissions
pub const TEMPLATE_API_GATEWAY: &str = "builtin/api-gateway";
/// Template granting a Nomad server its catalog and ACL integration rights
pub const TEMPLATE_NOMAD_SERVER: &str = "builtin/nomad-server";
/// Template granting a Nomad client its catalog integration rights
pub const TEMPLATE_NOMAD_CLIENT: &str = "builtin/nomad-client";

/// Catch-all schema for templates that require no variables
pub const NO_REQUIRED_VARIABLES_SCHEMA: &str = "";

/// Variable schema shared by every template whose single input is a name
const NAME_REQUIRED_SCHEMA: &str = r#"{
    "type": "object",
    "properties": {
        "name": { "type": "string", "minLength": 1, "maxLength": 256 }
    },
    "required": ["name"]
}"#;

const SERVICE_TEMPLATE: &str = r#"service "{{ name }}" {
	policy = "write"
}
service "{{ name }}-sidecar-proxy" {
	policy = "write"
}
service_prefix "" {
	policy = "read"
}
node_prefix "" {
	policy = "read"
}"#;

const NODE_TEMPLATE: &str = r#"node "{{ name }}" {
	policy = "write"
}
service_prefix "" {
	policy = "read"
}"#;

const DNS_TEMPLATE: &str = r#"node_prefix "" {
	policy = "read"
}
service_prefix "" {
	policy = "read"
}
query_prefix "" {
	policy = "read"
}"#;

const WORKLOAD_IDENTITY_TEMPLATE: &str = r#"identity "{{ name }}" {
	policy = "write"
}"#;

const NOMAD_SERVER_TEMPLATE: &str = r#"acl = "write"
agent_prefix "" {
	policy = "read"
}
node_prefix "" {
	policy = "read"
}
service_prefix "" {
	policy = "write"
}"#;

const NOMAD_CLIENT_TEMPLATE: &str = r#"agent_prefix "" {
	policy = "read"
}
node_prefix "" {
	policy = "read"
}
service_prefix "" {
	policy = "write"
}"#;

const API_GATEWAY_TEMPLATE: &str = r#"mesh = "read"
node_prefix "" {
	policy = "read"
}
service_prefix "" {
	policy = "read"
}
service "{{ name }}" {
	policy = "write"
}"#;

/// Registry entry for a built-in templated policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplatedPolicyBase {
    /// Registry name, e.g. `builtin/service`
    pub template_name: &'static str,
    /// Stable registry ID; hidden from user-facing displays
    pub template_id: &'static str,
    /// JSON schema the template variables must satisfy; empty when the
    /// template takes no variables
    pub schema: &'static str,
    /// Template body rendered by the synthesizer
    pub template: &'static str,
    /// Human-readable description of what the rendered policy grants
    pub description: &'static str,
}

static TEMPLATED_POLICIES: LazyLock<HashMap<&'static str, TemplatedPolicyBase>> =
    LazyLock::new(|| {
        let bases = [
            TemplatedPolicyBase {
                template_name: TEMPLATE_SERVICE,
                template_id: "00000000-0000-0000-0000-000000000003",
                schema: NAME_REQUIRED_SCHEMA,
                template: SERVICE_TEMPLATE,
                description: "Gives the token or role permissions to register a service and \
                              discover services in the catalog. It also gives the specified \
                              service's sidecar proxy the permission to discover and route \
                              traffic to other services.",
            },
            TemplatedPolicyBase {
                template_name: TEMPLATE_NODE,
                template_id: "00000000-0000-0000-0000-000000000004",
                schema: NAME_REQUIRED_SCHEMA,
                template: NODE_TEMPLATE,
                description: "Gives the token or role permissions to register an agent/node \
                              into the catalog. A node is typically an agent but can also be \
                              a physical server, cloud instance or a container.",
            },
            TemplatedPolicyBase {
                template_name: TEMPLATE_DNS,
                template_id: "00000000-0000-0000-0000-000000000005",
                schema: NO_REQUIRED_VARIABLES_SCHEMA,
                template: DNS_TEMPLATE,
                description: "Gives the token or role permissions for the DNS layer to query \
                              services in the network.",
            },
            TemplatedPolicyBase {
                template_name: TEMPLATE_NOMAD_SERVER,
                template_id: "00000000-0000-0000-0000-000000000006",
                schema: NO_REQUIRED_VARIABLES_SCHEMA,
                template: NOMAD_SERVER_TEMPLATE,
                description: "Gives the token or role permissions required for integration \
                              with a nomad server.",
            },
            TemplatedPolicyBase {
                template_name: TEMPLATE_WORKLOAD_IDENTITY,
                template_id: "00000000-0000-0000-0000-000000000007",
                schema: NAME_REQUIRED_SCHEMA,
                template: WORKLOAD_IDENTITY_TEMPLATE,
                description: "Gives the token or role permissions for a specific workload \
                              identity.",
            },
            TemplatedPolicyBase {
                template_name: TEMPLATE_API_GATEWAY,
                template_id: "00000000-0000-0000-0000-000000000008",
                schema: NAME_REQUIRED_SCHEMA,
                template: API_GATEWAY_TEMPLATE,
                description: "Gives the token or role permissions for an api gateway.",
            },
            TemplatedPolicyBase {
                template_name: TEMPLATE_NOMAD_CLIENT,
                template_id: "00000000-0000-0000-0000-000000000009",
                schema: NO_REQUIRED_VARIABLES_SCHEMA,
                template: NOMAD_CLIENT_TEMPLATE,
                description: "Gives the token or role permissions required for integration \
                              with a nomad client.",
            },
        ];
        bases.into_iter().map(|b| (b.template_name, b)).collect()
    });

/// Look up a built-in template by name, returning a copy of its entry
pub fn get_templated_policy_base(template_name: &str) -> Option<TemplatedPolicyBase> {
    TEMPLATED_POLICIES.get(template_name).cloned()
}

/// A copy of the full registry, keyed by template name.
///
/// Never exposes the live map, so callers cannot perturb the registry.
pub fn list_templated_policies() -> HashMap<&'static str, TemplatedPolicyBase> {
    TEMPLATED_POLICIES.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_template() {
        let base = get_templated_policy_base(TEMPLATE_SERVICE).expect("registered");
        assert_eq!(base.template_name, TEMPLATE_SERVICE);
        assert!(!base.schema.is_empty());
        assert!(base.template.contains(r#"service "{{ name }}""#));
    }

    #[test]
    fn test_lookup_unknown_template() {
        assert!(get_templated_policy_base("builtin/nope").is_none());
    }

    #[test]
    fn test_dns_template_requires_no_variables() {
        let base = get_templated_policy_base(TEMPLATE_DNS).expect("registered");
        assert_eq!(base.schema, NO_REQUIRED_VARIABLES_SCHEMA);
        assert!(!base.template.contains("{{"));
    }

    #[test]
    fn test_list_returns_defensive_copy() {
        let mut listed = list_templated_policies();
        assert_eq!(listed.len(), 7);
        listed.clear();
        // The registry itself is untouched.
        assert_eq!(list_templated_policies().len(), 7);
    }

    #[test]
    fn test_nomad_templates_require_no_variables() {
        for name in [TEMPLATE_NOMAD_SERVER, TEMPLATE_NOMAD_CLIENT] {
            let base = get_templated_policy_base(name).expect("registered");
            assert_eq!(base.schema, NO_REQUIRED_VARIABLES_SCHEMA);
            assert!(base.template.contains(r#"service_prefix "" {"#));
            assert!(!base.template.contains("{{"));
        }
        // Only the server template grants ACL write.
        let server = get_templated_policy_base(TEMPLATE_NOMAD_SERVER).unwrap();
        assert!(server.template.contains(r#"acl = "write""#));
        let client = get_templated_policy_base(TEMPLATE_NOMAD_CLIENT).unwrap();
        assert!(!client.template.contains("acl"));
    }

    #[test]
    fn test_every_schema_is_valid_json_or_empty() {
        for base in list_templated_policies().values() {
            if !base.schema.is_empty() {
                serde_json::from_str::<serde_json::Value>(base.schema).expect("valid JSON schema");
            }
        }
    }
}
