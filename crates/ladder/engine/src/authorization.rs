//! Operator authorization
//!
//! Authorization is opt-in per environment: an environment without an
//! `authorization` block admits any operator.

use crate::error::{PromotionError, Result};
use ladder_audit::AuditStore;
use ladder_types::{AuthorizationConfig, Environment, Operator};
use std::sync::Arc;
use tracing::debug;

/// Checks operators against allow-lists and separation of duties
pub struct AuthorizationGuard {
    audit: Arc<dyn AuditStore>,
}

impl AuthorizationGuard {
    pub fn new(audit: Arc<dyn AuditStore>) -> Self {
        Self { audit }
    }

    /// Authorize `operator` to move `tag` from `from_env` into `to_env`
    pub async fn authorize(
        &self,
        operator: &Operator,
        tag: &str,
        from_env: &str,
        to_env: &Environment,
    ) -> Result<()> {
        let Some(auth) = &to_env.authorization else {
            return Ok(());
        };

        if auth.has_allow_list() && !is_allowed(auth, operator) {
            return Err(denied(
                operator,
                to_env,
                "not in allowed operators or groups".to_string(),
            ));
        }

        if auth.separation_of_duties {
            if let Some(previous) = self.audit.latest_into(tag, from_env).await? {
                if previous.operator == operator.name {
                    return Err(denied(
                        operator,
                        to_env,
                        format!(
                            "separation of duties: also promoted {} into {}",
                            tag, from_env
                        ),
                    ));
                }
            }
        }

        debug!(operator = %operator, environment = %to_env.name, "Operator authorized");
        Ok(())
    }
}

fn is_allowed(auth: &AuthorizationConfig, operator: &Operator) -> bool {
    auth.allowed_operators.iter().any(|o| *o == operator.name)
        || auth.allowed_groups.iter().any(|g| operator.in_group(g))
}

fn denied(operator: &Operator, environment: &Environment, reason: String) -> PromotionError {
    PromotionError::Authorization {
        operator: operator.name.clone(),
        environment: environment.name.clone(),
        reason,
    }
}
