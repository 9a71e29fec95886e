use crate::catalog::{ResourceId, Transaction};
use crate::dead_lock_detector::{DeadLockDetector, WaitEdge};
use crate::lock::{Lock, LockMode};
use crate::lock_mgr::{LockErrorCode, LockTable};
use crate::operation::Operation;
use anyhow::Result;
use log::{debug, info};

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum StepEvent {
    Granted(LockMode),
    Blocked { holder: String },
    Committed { released: Vec<ResourceId> },
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ScheduleStep {
    pub txn: String,
    /// `None` for the commit step.
    pub operation: Option<Operation>,
    pub event: StepEvent,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ScheduleOutcome {
    Serialized { commit_order: Vec<String> },
    Deadlock {
        cycle: Vec<WaitEdge>,
        /// Locks each side still holds when the cycle closes.
        held: Vec<Lock>,
    },
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Schedule {
    pub steps: Vec<ScheduleStep>,
    pub outcome: ScheduleOutcome,
}

impl Schedule {
    pub fn is_deadlock(&self) -> bool {
        matches!(self.outcome, ScheduleOutcome::Deadlock { .. })
    }

    /// One line for the message pane.
    pub fn summary(&self) -> String {
        match &self.outcome {
            ScheduleOutcome::Deadlock { cycle, .. } => format!(
                "Deadlock under interleaved 2PL: {}",
                cycle
                    .iter()
                    .map(|edge| edge.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            ScheduleOutcome::Serialized { commit_order } => format!(
                "No deadlock under interleaved 2PL, commit order: {}",
                commit_order.join(", ")
            ),
        }
    }

    /// Locks held when the schedule deadlocked, e.g.
    /// `Locks held: Transaction 1 Shared on x, Transaction 2 Shared on y`.
    pub fn held_locks(&self) -> Option<String> {
        match &self.outcome {
            ScheduleOutcome::Deadlock { held, .. } => Some(format!(
                "Locks held: {}",
                held.iter()
                    .map(|lock| format!("{} {:?} on {}", lock.txn, lock.lock_mode, lock.rid))
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            ScheduleOutcome::Serialized { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct OperationScheduler;

impl OperationScheduler {
    /// Runs the pair one operation per turn, `first` going first, under
    /// strict two-phase locking: every lock is held until the owner's last
    /// operation is granted. Stops at the first waits-for cycle.
    pub fn interleave(first: &Transaction, second: &Transaction) -> Result<Schedule> {
        let txns = [first, second];
        let mut cursor = [0_usize; 2];
        let mut done = [false; 2];
        let mut lock_table = LockTable::new();
        let mut detector = DeadLockDetector::new();
        let mut steps = vec![];
        let mut commit_order = vec![];

        let mut turn = 0_usize;
        while !(done[0] && done[1]) {
            let idx = turn % 2;
            turn += 1;
            if done[idx] {
                continue;
            }
            let txn = txns[idx];
            if let Some(operation) = txn.operations.get(cursor[idx]) {
                match lock_table.acquire(&txn.name, operation) {
                    Ok(lock) => {
                        detector.unlink(&txn.name);
                        cursor[idx] += 1;
                        steps.push(ScheduleStep {
                            txn: txn.name.clone(),
                            operation: Some(operation.clone()),
                            event: StepEvent::Granted(lock.lock_mode),
                        });
                    }
                    Err(err) => match err.downcast_ref::<LockErrorCode>() {
                        Some(LockErrorCode::LockConflicts { resource, .. }) => {
                            let holder = txns[1 - idx];
                            detector.link_node(&txn.name, &holder.name, resource.clone());
                            steps.push(ScheduleStep {
                                txn: txn.name.clone(),
                                operation: Some(operation.clone()),
                                event: StepEvent::Blocked {
                                    holder: holder.name.clone(),
                                },
                            });
                            if let Some(cycle) = detector.find_cycle() {
                                info!("deadlock between {} and {}", first.name, second.name);
                                let mut held = lock_table.held_by(&first.name);
                                held.extend(lock_table.held_by(&second.name));
                                return Ok(Schedule {
                                    steps,
                                    outcome: ScheduleOutcome::Deadlock { cycle, held },
                                });
                            }
                            continue;
                        }
                        _ => return Err(err),
                    },
                }
            }
            if cursor[idx] == txn.operations.len() {
                let released = lock_table.release_all(&txn.name).unwrap_or_default();
                debug!("{} committed, released {:?}", txn.name, released);
                done[idx] = true;
                commit_order.push(txn.name.clone());
                steps.push(ScheduleStep {
                    txn: txn.name.clone(),
                    operation: None,
                    event: StepEvent::Committed { released },
                });
            }
        }
        Ok(Schedule {
            steps,
            outcome: ScheduleOutcome::Serialized { commit_order },
        })
    }
}
