use crate::catalog::{ResourceId, Transaction};
use crate::lock::LockMode;
use crate::operation::Operation;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// What makes two operations on the same variable conflict.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ConflictRule {
    /// At least one of the two operations writes.
    AccessMode,
    /// Any shared variable, reads included.
    SharedVariable,
}

impl Default for ConflictRule {
    fn default() -> Self {
        ConflictRule::AccessMode
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown conflict rule {0:?}, expected access-mode or shared-variable")]
pub struct UnknownConflictRule(String);

impl FromStr for ConflictRule {
    type Err = UnknownConflictRule;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
            "access-mode" => Ok(ConflictRule::AccessMode),
            "shared-variable" => Ok(ConflictRule::SharedVariable),
            _ => Err(UnknownConflictRule(s.to_string())),
        }
    }
}

impl fmt::Display for ConflictRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictRule::AccessMode => write!(f, "access-mode"),
            ConflictRule::SharedVariable => write!(f, "shared-variable"),
        }
    }
}

impl ConflictRule {
    pub fn conflicts(&self, left: &Operation, right: &Operation) -> bool {
        if left.resource != right.resource {
            return false;
        }
        match self {
            ConflictRule::SharedVariable => true,
            ConflictRule::AccessMode => {
                !LockMode::for_op(left.op_type).compatible(LockMode::for_op(right.op_type))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct ConflictDetector {
    rule: ConflictRule,
}

impl ConflictDetector {
    pub fn new(rule: ConflictRule) -> Self {
        Self { rule }
    }

    pub fn rule(&self) -> ConflictRule {
        self.rule
    }

    /// Variables on which the first two transactions conflict, in the order
    /// the first transaction touches them. Empty with fewer than two.
    pub fn conflicting_resources(&self, selected: &[&Transaction]) -> Vec<ResourceId> {
        let (first, second) = match selected {
            [first, second, ..] => (first, second),
            _ => return vec![],
        };
        let mut resources: Vec<ResourceId> = vec![];
        for left in first.operations.iter() {
            for right in second.operations.iter() {
                if self.rule.conflicts(left, right) && !resources.contains(&left.resource) {
                    resources.push(left.resource.clone());
                }
            }
        }
        resources
    }

    pub fn has_conflict(&self, selected: &[&Transaction]) -> bool {
        !self.conflicting_resources(selected).is_empty()
    }
}
