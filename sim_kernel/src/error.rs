//! Kernel error types.

use thiserror::Error;

/// Error raised by a rule implementation. Carried through the kernel unmodified.
pub type RuleError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which half of a rule was running when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleStage {
    Match,
    Apply,
}

impl std::fmt::Display for RuleStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleStage::Match => f.write_str("match"),
            RuleStage::Apply => f.write_str("apply"),
        }
    }
}

#[derive(Error, Debug)]
pub enum KernelError {
    #[error("construction failed: {0}")]
    Construction(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A rule failed mid-pass; the whole settlement pass is discarded.
    #[error("rule '{rule_name}' (priority {priority}) failed during {stage}")]
    RuleFailure {
        rule_name: String,
        priority: i32,
        stage: RuleStage,
        #[source]
        source: RuleError,
    },

    /// An interrupt rule failed; no signals from the call are returned.
    #[error("interrupt rule '{rule_name}' (#{index}) failed")]
    InterruptRuleFailure {
        rule_name: String,
        index: usize,
        #[source]
        source: RuleError,
    },
}

impl KernelError {
    /// The rule's own error, for failures raised by a rule.
    pub fn rule_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            KernelError::RuleFailure { source, .. }
            | KernelError::InterruptRuleFailure { source, .. } => Some(&**source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, KernelError>;
