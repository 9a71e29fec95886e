use crate::catalog::Transaction;
use log::info;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Selection stamp. Smaller is older.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Timestamp(pub u64);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Protocol {
    WaitDie,
    WoundWait,
}

impl Default for Protocol {
    fn default() -> Self {
        Protocol::WaitDie
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown protocol {0:?}, expected Wait-Die or Wound-Wait")]
pub struct UnknownProtocol(String);

impl FromStr for Protocol {
    type Err = UnknownProtocol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
            "wait-die" | "waitdie" => Ok(Protocol::WaitDie),
            "wound-wait" | "woundwait" => Ok(Protocol::WoundWait),
            _ => Err(UnknownProtocol(s.to_string())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::WaitDie => write!(f, "Wait-Die"),
            Protocol::WoundWait => write!(f, "Wound-Wait"),
        }
    }
}

#[derive(Debug, Copy, Clone)]
pub struct Participant<'a> {
    pub transaction: &'a Transaction,
    pub ts: Timestamp,
}

impl<'a> Participant<'a> {
    pub fn new(transaction: &'a Transaction, ts: Timestamp) -> Self {
        Self { transaction, ts }
    }

    fn name(&self) -> &'a str {
        &self.transaction.name
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Resolution {
    pub message: String,
    pub behavior: Vec<String>,
    /// Transactions still selected afterwards, in selection order.
    pub survivors: Vec<String>,
    pub aborted: Option<String>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Replay {
    Plain,
    AcquireWrites,
    ContinueAfterFirst,
}

fn replay(txn: &Transaction, mode: Replay, out: &mut Vec<String>) {
    for (idx, op) in txn.operations.iter().enumerate() {
        if mode == Replay::AcquireWrites && op.is_write() {
            out.push(format!("{} writing {} (lock acquired)", txn.name, op.resource));
        } else {
            out.push(format!(
                "{} {} {}",
                txn.name,
                op.op_type.participle(),
                op.resource
            ));
        }
        if mode == Replay::ContinueAfterFirst && idx == 0 {
            out.push(format!(
                "{} continues after lock on {} is released",
                txn.name, op.resource
            ));
        }
    }
}

impl Protocol {
    /// Narrates how the protocol settles a conflict between two selected
    /// transactions. Age comes from the timestamps, not argument order.
    pub fn resolve(&self, first: Participant<'_>, second: Participant<'_>) -> Resolution {
        let (older, younger) = if first.ts <= second.ts {
            (first, second)
        } else {
            (second, first)
        };
        let mut behavior = vec![];
        match self {
            Protocol::WaitDie => {
                info!("{}: aborting {} (younger)", self, younger.name());
                behavior.push(format!(
                    "{} aborted and rolled back (younger)",
                    younger.name()
                ));
                for op in younger.transaction.operations.iter() {
                    behavior.push(format!(
                        "Releasing lock on {} by {}",
                        op.resource,
                        younger.name()
                    ));
                }
                behavior.push(format!("{} continues (older)", older.name()));
                replay(older.transaction, Replay::AcquireWrites, &mut behavior);
                Resolution {
                    message: format!("{} protocol selected", self),
                    behavior,
                    survivors: vec![older.name().to_string()],
                    aborted: Some(younger.name().to_string()),
                }
            }
            Protocol::WoundWait => {
                info!("{}: {} waits for {}", self, older.name(), younger.name());
                behavior.push(format!("{} waits (older)", older.name()));
                behavior.push(format!("{} continues (younger)", younger.name()));
                replay(younger.transaction, Replay::Plain, &mut behavior);
                replay(older.transaction, Replay::ContinueAfterFirst, &mut behavior);
                Resolution {
                    message: format!("{} protocol selected", self),
                    behavior,
                    survivors: vec![first.name().to_string(), second.name().to_string()],
                    aborted: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::DEFAULT_CATALOG;
    use crate::protocol::{Participant, Protocol, Timestamp};

    fn participant(name: &str, ts: u64) -> Participant<'static> {
        Participant::new(DEFAULT_CATALOG.get(name).unwrap(), Timestamp(ts))
    }

    #[test]
    pub fn test_wait_die_aborts_younger() {
        let resolution = Protocol::WaitDie.resolve(
            participant("Transaction 1", 1),
            participant("Transaction 2", 2),
        );
        assert_eq!(resolution.message, "Wait-Die protocol selected");
        assert_eq!(
            resolution.behavior,
            vec![
                "Transaction 2 aborted and rolled back (younger)",
                "Releasing lock on y by Transaction 2",
                "Releasing lock on x by Transaction 2",
                "Transaction 1 continues (older)",
                "Transaction 1 reading x",
                "Transaction 1 writing y (lock acquired)",
            ]
        );
        assert_eq!(resolution.survivors, vec!["Transaction 1"]);
        assert_eq!(resolution.aborted.as_deref(), Some("Transaction 2"));
    }

    #[test]
    pub fn test_wound_wait_narrates_both() {
        let resolution = Protocol::WoundWait.resolve(
            participant("Transaction 4", 1),
            participant("Transaction 5", 2),
        );
        assert_eq!(resolution.message, "Wound-Wait protocol selected");
        assert_eq!(
            resolution.behavior,
            vec![
                "Transaction 4 waits (older)",
                "Transaction 5 continues (younger)",
                "Transaction 5 reading y",
                "Transaction 5 reading z",
                "Transaction 5 writing x",
                "Transaction 4 reading x",
                "Transaction 4 continues after lock on x is released",
                "Transaction 4 reading y",
                "Transaction 4 writing z",
            ]
        );
        assert_eq!(resolution.survivors, vec!["Transaction 4", "Transaction 5"]);
        assert!(resolution.aborted.is_none());
    }

    #[test]
    pub fn test_age_follows_timestamp() {
        let resolution = Protocol::WaitDie.resolve(
            participant("Transaction 1", 7),
            participant("Transaction 2", 3),
        );
        assert_eq!(resolution.aborted.as_deref(), Some("Transaction 1"));
        assert_eq!(resolution.survivors, vec!["Transaction 2"]);
    }

    #[test]
    pub fn test_parse_protocol() {
        assert_eq!("Wait-Die".parse::<Protocol>(), Ok(Protocol::WaitDie));
        assert_eq!("wound_wait".parse::<Protocol>(), Ok(Protocol::WoundWait));
        assert!("two-phase".parse::<Protocol>().is_err());
        assert_eq!(Protocol::WoundWait.to_string(), "Wound-Wait");
    }
}
