//! Environment configuration
//!
//! An environment is one rung of the promotion chain. Its position in the
//! chain comes from its index in [`crate::PromotionConfig::environments`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// A deployment environment in the promotion chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    /// Unique environment name (e.g. `staging`)
    pub name: String,

    /// Compliance checks run before promoting into this environment
    #[serde(default)]
    pub gates: Vec<GateConfig>,

    /// Who may promote into this environment; `None` permits anyone
    #[serde(default)]
    pub authorization: Option<AuthorizationConfig>,

    /// Signature verification settings
    #[serde(default)]
    pub signature: SignatureConfig,
}

impl Environment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            gates: Vec::new(),
            authorization: None,
            signature: SignatureConfig::default(),
        }
    }

    /// Add a required gate
    pub fn with_gate(mut self, name: impl Into<String>) -> Self {
        self.gates.push(GateConfig::required(name));
        self
    }

    /// Add an optional gate (failure is recorded but never blocks)
    pub fn with_optional_gate(mut self, name: impl Into<String>) -> Self {
        self.gates.push(GateConfig::optional(name));
        self
    }

    pub fn with_authorization(mut self, authorization: AuthorizationConfig) -> Self {
        self.authorization = Some(authorization);
        self
    }

    pub fn with_enforcement(mut self, enforcement: EnforcementMode) -> Self {
        self.signature.enforcement = enforcement;
        self
    }

    pub fn with_signature_policy(mut self, policy: VerificationPolicy) -> Self {
        self.signature.policy = policy;
        self
    }

    /// Look up a configured gate by name
    pub fn gate(&self, name: &str) -> Option<&GateConfig> {
        self.gates.iter().find(|g| g.name == name)
    }

    /// Whether the named gate blocks promotion when it fails
    pub fn is_required(&self, gate: &str) -> bool {
        self.gate(gate).map(|g| g.required).unwrap_or(false)
    }
}

/// A named compliance check attached to an environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Gate name, resolved against the gate handler table
    pub name: String,

    /// Required gates block real promotions when they fail
    #[serde(default = "default_true")]
    pub required: bool,

    /// Per-gate time budget in seconds; exceeding it counts as a failure
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl GateConfig {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
            timeout_seconds: None,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            timeout_seconds: None,
        }
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }
}

/// Per-environment authorization rules
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationConfig {
    /// Groups whose members may promote into the environment
    #[serde(default)]
    pub allowed_groups: Vec<String>,

    /// Operators explicitly allowed to promote into the environment
    #[serde(default)]
    pub allowed_operators: Vec<String>,

    /// Reject an operator who performed the previous promotion of the same
    /// tag into the source environment
    #[serde(default)]
    pub separation_of_duties: bool,
}

impl AuthorizationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_operator(mut self, operator: impl Into<String>) -> Self {
        self.allowed_operators.push(operator.into());
        self
    }

    pub fn allow_group(mut self, group: impl Into<String>) -> Self {
        self.allowed_groups.push(group.into());
        self
    }

    pub fn with_separation_of_duties(mut self) -> Self {
        self.separation_of_duties = true;
        self
    }

    /// True when neither operators nor groups are listed
    pub fn has_allow_list(&self) -> bool {
        !self.allowed_operators.is_empty() || !self.allowed_groups.is_empty()
    }
}

/// Signature verification settings for an environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureConfig {
    /// How verification failures are treated
    #[serde(default)]
    pub enforcement: EnforcementMode,

    /// Policy handed to the verifier backend
    #[serde(default)]
    pub policy: VerificationPolicy,
}

/// Signature enforcement mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementMode {
    /// Verification failure aborts the promotion
    Enforce,

    /// Verification failure is logged and recorded as `invalid`
    #[default]
    Warn,

    /// Verification is never invoked
    Off,
}

impl fmt::Display for EnforcementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enforce => f.write_str("enforce"),
            Self::Warn => f.write_str("warn"),
            Self::Off => f.write_str("off"),
        }
    }
}

/// Policy the verifier backend checks signatures against
///
/// Keyless verification uses `identity`/`issuer`; key-based verification
/// uses `key_ref`. The engine passes the policy through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerificationPolicy {
    /// Expected signer identity (e.g. a CI workflow URI)
    #[serde(default)]
    pub identity: Option<String>,

    /// Expected OIDC issuer for keyless signatures
    #[serde(default)]
    pub issuer: Option<String>,

    /// Reference to a public key for key-based verification
    #[serde(default)]
    pub key_ref: Option<String>,

    /// Require a transparency log inclusion proof
    #[serde(default)]
    pub require_rekor: bool,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_required_defaults_to_true() {
        let gate: GateConfig = serde_json::from_str(r#"{"name": "tests"}"#).unwrap();
        assert!(gate.required);
        assert!(gate.timeout_seconds.is_none());
    }

    #[test]
    fn test_enforcement_mode_parsing() {
        let mode: EnforcementMode = serde_json::from_str("\"enforce\"").unwrap();
        assert_eq!(mode, EnforcementMode::Enforce);
        assert_eq!(EnforcementMode::default(), EnforcementMode::Warn);
        assert_eq!(EnforcementMode::Off.to_string(), "off");
    }

    #[test]
    fn test_environment_required_lookup() {
        let env = Environment::new("staging")
            .with_gate("tests")
            .with_optional_gate("security_scan");

        assert!(env.is_required("tests"));
        assert!(!env.is_required("security_scan"));
        assert!(!env.is_required("missing"));
    }

    #[test]
    fn test_authorization_allow_list() {
        assert!(!AuthorizationConfig::new().has_allow_list());
        assert!(AuthorizationConfig::new().allow_group("release").has_allow_list());
    }
}
