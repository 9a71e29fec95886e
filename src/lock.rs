use crate::catalog::ResourceId;
use crate::operation::OpType;
use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    pub static ref OP_LOCK_MAPPING: HashMap<OpType, LockMode> = {
        let mut op_lock_mapping = HashMap::new();
        op_lock_mapping.insert(OpType::Read, LockMode::Shared);
        op_lock_mapping.insert(OpType::Write, LockMode::Exclusive);
        op_lock_mapping
    };
}

#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub enum LockMode {
    Shared,
    Exclusive,
    NoLock,
}

impl LockMode {
    pub fn for_op(op_type: OpType) -> LockMode {
        OP_LOCK_MAPPING
            .get(&op_type)
            .copied()
            .unwrap_or(LockMode::NoLock)
    }

    /// `self` is the mode already held by someone else.
    pub fn compatible(&self, require_lock: LockMode) -> bool {
        use LockMode::*;
        match *self {
            Shared => matches!(require_lock, Shared | NoLock),
            Exclusive => require_lock == NoLock,
            NoLock => true,
        }
    }

    /// Only meaningful when the holder and the requester are the same owner.
    pub fn upgradable(&self, require_lock: LockMode) -> bool {
        use LockMode::*;
        match *self {
            Shared => require_lock == Exclusive,
            _ => false,
        }
    }

    /// Whether holding `self` already covers a request for `require_lock`.
    pub fn covers(&self, require_lock: LockMode) -> bool {
        use LockMode::*;
        match *self {
            Exclusive => true,
            Shared => require_lock != Exclusive,
            NoLock => require_lock == NoLock,
        }
    }
}

impl Default for LockMode {
    fn default() -> Self {
        LockMode::NoLock
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub struct Lock {
    pub txn: String,
    pub lock_mode: LockMode,
    pub rid: ResourceId,
}

impl Lock {
    pub fn new(lock_mode: LockMode, txn: impl Into<String>, rid: impl Into<ResourceId>) -> Self {
        Self {
            txn: txn.into(),
            lock_mode,
            rid: rid.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::lock::LockMode::*;
    use crate::lock::LockMode;
    use crate::operation::OpType;

    #[test]
    pub fn test_op_lock_mapping() {
        assert_eq!(LockMode::for_op(OpType::Read), Shared);
        assert_eq!(LockMode::for_op(OpType::Write), Exclusive);
    }

    #[test]
    pub fn test_compatibility_matrix() {
        assert!(Shared.compatible(Shared));
        assert!(!Shared.compatible(Exclusive));
        assert!(!Exclusive.compatible(Shared));
        assert!(!Exclusive.compatible(Exclusive));
        assert!(NoLock.compatible(Exclusive));
    }

    #[test]
    pub fn test_upgrade_and_cover() {
        assert!(Shared.upgradable(Exclusive));
        assert!(!Exclusive.upgradable(Shared));
        assert!(Exclusive.covers(Shared));
        assert!(Shared.covers(Shared));
        assert!(!Shared.covers(Exclusive));
    }
}
