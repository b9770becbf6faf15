//! Authorization decisions and the policy document returned to the gateway.
//!
//! A decision is bound to exactly the resource the gateway asked about; it is
//! never widened to a wildcard. The rendered response follows the API
//! gateway authorizer format:
//!
//! ```json
//! {
//!   "principalId": "user",
//!   "policyDocument": {
//!     "Version": "2012-10-17",
//!     "Statement": [
//!       { "Action": "execute-api:Invoke", "Effect": "Allow", "Resource": "arn:..." }
//!     ]
//!   }
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Principal reported in every decision.
///
/// This is a fixed placeholder: the verified subject is deliberately not
/// used here. Gateways that need the caller identity cannot get it from the
/// decision.
pub const PLACEHOLDER_PRINCIPAL_ID: &str = "user";

/// IAM policy language version.
pub const POLICY_VERSION: &str = "2012-10-17";

/// Action granted or denied by the statement.
pub const INVOKE_ACTION: &str = "execute-api:Invoke";

// =============================================================================
// Decision
// =============================================================================

/// Policy effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    /// The request may proceed.
    Allow,
    /// The request is refused.
    Deny,
}

impl Effect {
    /// Returns the effect as used in policy statements.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "Allow",
            Self::Deny => "Deny",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The verdict for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationDecision {
    /// Principal the decision is issued for.
    pub principal_id: String,
    /// Allow or deny.
    pub effect: Effect,
    /// The resource identifier supplied by the gateway.
    pub resource: String,
}

impl AuthorizationDecision {
    /// Returns `true` if access was granted.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.effect == Effect::Allow
    }

    /// Renders the decision as an authorizer response.
    #[must_use]
    pub fn to_response(&self) -> AuthorizerResponse {
        AuthorizerResponse::from(self)
    }
}

/// Builds the decision for a verification outcome.
#[must_use]
pub fn generate_decision(
    principal_id: impl Into<String>,
    verification_succeeded: bool,
    resource: impl Into<String>,
) -> AuthorizationDecision {
    let effect = if verification_succeeded {
        Effect::Allow
    } else {
        Effect::Deny
    };

    AuthorizationDecision {
        principal_id: principal_id.into(),
        effect,
        resource: resource.into(),
    }
}

// =============================================================================
// Response document
// =============================================================================

/// Response returned to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerResponse {
    /// Principal the policy applies to.
    pub principal_id: String,

    /// Omitted when no resource was supplied, which the gateway treats as a
    /// denial.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_document: Option<PolicyDocument>,
}

/// IAM-style policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    /// Policy language version.
    pub version: String,
    /// Policy statements.
    pub statement: Vec<Statement>,
}

/// A single policy statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    /// Action covered by the statement.
    pub action: String,
    /// Effect of the statement.
    pub effect: Effect,
    /// Resource covered by the statement.
    pub resource: String,
}

impl From<&AuthorizationDecision> for AuthorizerResponse {
    fn from(decision: &AuthorizationDecision) -> Self {
        let policy_document = (!decision.resource.is_empty()).then(|| PolicyDocument {
            version: POLICY_VERSION.to_string(),
            statement: vec![Statement {
                action: INVOKE_ACTION.to_string(),
                effect: decision.effect,
                resource: decision.resource.clone(),
            }],
        });

        Self {
            principal_id: decision.principal_id.clone(),
            policy_document,
        }
    }
}

impl AuthorizerResponse {
    /// The effect of the first statement, if there is one.
    #[must_use]
    pub fn effect(&self) -> Option<Effect> {
        self.policy_document
            .as_ref()
            .and_then(|doc| doc.statement.first())
            .map(|statement| statement.effect)
    }
}
