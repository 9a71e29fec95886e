#![allow(clippy::map_entry)]

use crate::catalog::ResourceId;
use crate::declare_locks_table;
use crate::lock::{Lock, LockMode};
use crate::lock_mgr::LockErrorCode::*;
use crate::operation::Operation;
use anyhow::{anyhow, Result};
use log::debug;
use std::collections::HashMap;
use thiserror::Error;

declare_locks_table!(TransactionLockTable; String);
declare_locks_table!(ResourceLockTable; ResourceId);

/// Lock bookkeeping for one simulated schedule. Nothing here blocks: a
/// conflicting request is reported back to the caller, which decides
/// whether the requester waits.
#[derive(Debug, Default, Clone)]
pub struct LockTable {
    resource_table: HashMap<ResourceId, ResourceLockTable>,
    txn_table: HashMap<String, TransactionLockTable>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockErrorCode {
    #[error("No lock held by TXN {0}")]
    NoLockHeld(String),
    #[error("Acquire lock conflicts TXN {txn} RES_ID {resource} held by {holder}")]
    LockConflicts {
        txn: String,
        resource: ResourceId,
        holder: String,
    },
}

impl LockTable {
    pub fn new() -> Self {
        Self {
            resource_table: HashMap::new(),
            txn_table: HashMap::new(),
        }
    }

    pub fn acquire(&mut self, txn: &str, operation: &Operation) -> Result<Lock> {
        let rid = operation.resource.clone();
        let require_lock = LockMode::for_op(operation.op_type);
        let txn_table = self
            .txn_table
            .entry(txn.to_string())
            .or_insert_with(|| TransactionLockTable::new(txn.to_string()));

        let lock = if self.resource_table.contains_key(&rid) {
            let res_table = &self.resource_table[&rid];
            if let Some(blocking) = res_table.conflicting_lock(txn, require_lock) {
                debug!("{} blocked on {} by {}", txn, rid, blocking.txn);
                if txn_table.lock_size() == 0 {
                    self.txn_table.remove(txn);
                }
                return Err(anyhow!(LockConflicts {
                    txn: txn.to_string(),
                    resource: rid,
                    holder: blocking.txn,
                }));
            }
            let held = res_table.get_lock_mode(txn, &rid);
            if held.covers(require_lock) {
                Lock::new(held, txn, rid)
            } else if held.upgradable(require_lock) {
                let new_lock = Lock::new(require_lock, txn, rid);
                debug!("lock promote {:?} -> {:?}", held, new_lock);
                res_table.update_lock(new_lock.clone());
                txn_table.update_lock(new_lock.clone());
                new_lock
            } else {
                let new_lock = Lock::new(require_lock, txn, rid);
                res_table.add_lock(new_lock.clone());
                txn_table.add_lock(new_lock.clone());
                new_lock
            }
        } else {
            let new_lock = Lock::new(require_lock, txn, rid.clone());
            let res_table = ResourceLockTable::new(rid.clone());
            res_table.add_lock(new_lock.clone());
            txn_table.add_lock(new_lock.clone());
            self.resource_table.insert(rid, res_table);
            new_lock
        };
        debug!("{} acquired {:?} on {}", txn, lock.lock_mode, lock.rid);
        Ok(lock)
    }

    /// Drops every lock `txn` owns and returns the freed resources in the
    /// order they were first locked.
    pub fn release_all(&mut self, txn: &str) -> Result<Vec<ResourceId>> {
        let txn_table = match self.txn_table.remove(txn) {
            Some(table) if table.lock_size() > 0 => table,
            _ => return Err(anyhow!(NoLockHeld(txn.to_string()))),
        };
        let mut released = vec![];
        for lock in txn_table.locks() {
            if let Some(res_table) = self.resource_table.get(&lock.rid) {
                res_table.remove_locks_of(txn);
                if res_table.lock_size() == 0_usize {
                    let key = res_table.table_key().clone();
                    self.resource_table.remove(&key);
                }
            }
            released.push(lock.rid);
        }
        debug!("{} released {:?}", txn, released);
        Ok(released)
    }

    pub fn held_by(&self, txn: &str) -> Vec<Lock> {
        self.txn_table
            .get(txn)
            .map(|table| table.locks())
            .unwrap_or_default()
    }
}
