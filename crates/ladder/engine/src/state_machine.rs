//! Environment transition rules
//!
//! The configured environment list is the only source of legal moves: an
//! artifact may advance exactly one position at a time. There is no
//! operational flag that bypasses this check.

use crate::error::{PromotionError, Result};
use ladder_types::PromotionConfig;
use std::sync::Arc;

/// Validates `from -> to` moves against the ordered environment chain
#[derive(Debug, Clone)]
pub struct PromotionStateMachine {
    config: Arc<PromotionConfig>,
}

impl PromotionStateMachine {
    pub fn new(config: Arc<PromotionConfig>) -> Self {
        Self { config }
    }

    /// Validate that `to_env` sits directly after `from_env`
    ///
    /// Returns the positions of both environments on success.
    pub fn validate_transition(&self, from_env: &str, to_env: &str) -> Result<(usize, usize)> {
        let from = self.position(from_env, from_env, to_env)?;
        let to = self.position(to_env, from_env, to_env)?;

        if to == from + 1 {
            return Ok((from, to));
        }

        let reason = if to == from {
            "source and target are the same environment"
        } else if to > from {
            "cannot skip environments"
        } else {
            "cannot promote backwards"
        };

        Err(invalid(from_env, to_env, reason))
    }

    /// Environment names in promotion order
    pub fn chain(&self) -> Vec<&str> {
        self.config.environment_names().collect()
    }

    fn position(&self, name: &str, from_env: &str, to_env: &str) -> Result<usize> {
        self.config
            .position(name)
            .ok_or_else(|| invalid(from_env, to_env, &format!("unknown environment '{}'", name)))
    }
}

fn invalid(from: &str, to: &str, reason: &str) -> PromotionError {
    PromotionError::InvalidTransition {
        from: from.to_string(),
        to: to.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ladder_types::Environment;
    use proptest::prelude::*;

    fn machine(len: usize) -> PromotionStateMachine {
        let envs = (0..len).map(|i| Environment::new(format!("env{}", i))).collect();
        PromotionStateMachine::new(Arc::new(PromotionConfig::new(envs)))
    }

    #[test]
    fn test_forward_adjacent_transition() {
        let sm = machine(3);
        assert_eq!(sm.validate_transition("env0", "env1").unwrap(), (0, 1));
        assert_eq!(sm.chain(), vec!["env0", "env1", "env2"]);
    }

    #[test]
    fn test_rejected_transitions() {
        let sm = machine(3);

        for (from, to, reason) in [
            ("env0", "env2", "skip"),
            ("env2", "env1", "backwards"),
            ("env1", "env1", "same"),
            ("env0", "qa", "unknown"),
            ("qa", "env0", "unknown"),
        ] {
            match sm.validate_transition(from, to) {
                Err(PromotionError::InvalidTransition { reason: r, .. }) => {
                    assert!(r.contains(reason), "{} -> {}: {}", from, to, r)
                }
                other => panic!("{} -> {} should be rejected, got {:?}", from, to, other),
            }
        }
    }

    proptest! {
        #[test]
        fn prop_only_next_position_is_legal(len in 1usize..8, i in 0usize..8, j in 0usize..8) {
            let sm = machine(len);
            let from = format!("env{}", i);
            let to = format!("env{}", j);
            let legal = i < len && j < len && j == i + 1;

            match sm.validate_transition(&from, &to) {
                Ok(positions) => {
                    prop_assert!(legal);
                    prop_assert_eq!(positions, (i, j));
                }
                Err(e) => {
                    prop_assert!(!legal);
                    let invalid = matches!(e, PromotionError::InvalidTransition { .. });
                    prop_assert!(invalid);
                }
            }
        }
    }
}
