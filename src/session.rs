use crate::catalog::{Transaction, TransactionCatalog};
use crate::config::SimulatorConfig;
use crate::conflict::ConflictDetector;
use crate::operation_scheduler::OperationScheduler;
use crate::protocol::{Participant, Protocol, Resolution, Timestamp};
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;
use thiserror::Error;

pub const SELECTION_LIMIT: usize = 2;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Unknown transaction {0:?}")]
    UnknownTransaction(String),
    #[error("Every transaction is already selected")]
    NothingToSelect,
    #[error(transparent)]
    Schedule(#[from] anyhow::Error),
}

/// A text buffer shown to the user, one entry per line.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Pane {
    lines: Vec<String>,
}

impl Pane {
    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn replace<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lines = lines.into_iter().map(Into::into).collect();
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl fmt::Display for Pane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines.iter() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Panes {
    pub message: Pane,
    pub memory_log: Pane,
    pub disk_log: Pane,
    pub protocol_behavior: Pane,
}

impl Panes {
    pub fn is_empty(&self) -> bool {
        self.message.is_empty()
            && self.memory_log.is_empty()
            && self.disk_log.is_empty()
            && self.protocol_behavior.is_empty()
    }

    fn clear(&mut self) {
        self.message.clear();
        self.memory_log.clear();
        self.disk_log.clear();
        self.protocol_behavior.clear();
    }
}

impl fmt::Display for Panes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sections = [
            ("Message Display", &self.message),
            ("Log Memory", &self.memory_log),
            ("Log of Disk", &self.disk_log),
            ("Protocol Behavior Display", &self.protocol_behavior),
        ];
        for (title, pane) in sections {
            writeln!(f, "== {} ==", title)?;
            write!(f, "{}", pane)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Selection {
    pub name: String,
    pub ts: Timestamp,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SelectOutcome {
    Added,
    AlreadySelected,
    Rejected,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum CommitOutcome {
    /// No conflict, the names written to the disk log.
    Committed(Vec<String>),
    Resolved(Resolution),
}

fn lookup<'a>(catalog: &'a TransactionCatalog, selection: &[Selection]) -> Vec<&'a Transaction> {
    selection
        .iter()
        .filter_map(|s| catalog.get(&s.name))
        .collect()
}

fn push_listing(pane: &mut Pane, txn: &Transaction) {
    pane.push(format!("{}:", txn.name));
    for line in txn.listing() {
        pane.push(line);
    }
    pane.push("");
}

/// The interactive state behind the three commands: select, commit, clear.
#[derive(Debug, Clone)]
pub struct Session {
    catalog: TransactionCatalog,
    protocol: Protocol,
    detector: ConflictDetector,
    selection: Vec<Selection>,
    next_ts: u64,
    panes: Panes,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SimulatorConfig::default())
    }
}

impl Session {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            catalog: config.catalog,
            protocol: config.protocol,
            detector: ConflictDetector::new(config.conflict_rule),
            selection: vec![],
            next_ts: 0,
            panes: Panes::default(),
        }
    }

    pub fn catalog(&self) -> &TransactionCatalog {
        &self.catalog
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn set_protocol(&mut self, protocol: Protocol) {
        debug!("protocol set to {}", protocol);
        self.protocol = protocol;
    }

    pub fn selection(&self) -> Vec<&str> {
        self.selection.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn panes(&self) -> &Panes {
        &self.panes
    }

    fn resolve_name(&self, input: &str) -> Result<&Transaction, SessionError> {
        self.catalog
            .resolve(input)
            .ok_or_else(|| SessionError::UnknownTransaction(input.to_string()))
    }

    /// Lists a transaction's operations in the message pane.
    pub fn show(&mut self, name: &str) -> Result<(), SessionError> {
        let txn = self.resolve_name(name)?;
        let mut lines = vec![format!("{}:", txn.name)];
        lines.extend(txn.listing());
        self.panes.message.replace(lines);
        Ok(())
    }

    pub fn select(&mut self, name: &str) -> Result<SelectOutcome, SessionError> {
        let name = self.resolve_name(name)?.name.clone();
        if self.selection.len() >= SELECTION_LIMIT {
            warn!("rejected {}, selection is full", name);
            self.panes
                .message
                .replace(["Only two transactions can be selected"]);
            return Ok(SelectOutcome::Rejected);
        }
        if self.selection.iter().any(|s| s.name == name) {
            return Ok(SelectOutcome::AlreadySelected);
        }
        self.next_ts += 1;
        let ts = Timestamp(self.next_ts);
        debug!("selected {} at {:?}", name, ts);
        self.selection.push(Selection { name, ts });
        self.render_memory_log();
        Ok(SelectOutcome::Added)
    }

    /// Picks one of the transactions not selected yet.
    pub fn select_random<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<SelectOutcome, SessionError> {
        let candidates: Vec<String> = self
            .catalog
            .iter()
            .filter(|t| !self.selection.iter().any(|s| s.name == t.name))
            .map(|t| t.name.clone())
            .collect();
        let name = candidates
            .choose(rng)
            .cloned()
            .ok_or(SessionError::NothingToSelect)?;
        self.select(&name)
    }

    pub fn commit(&mut self) -> Result<CommitOutcome, SessionError> {
        let selected = lookup(&self.catalog, &self.selection);
        self.panes.message.clear();
        self.panes.protocol_behavior.clear();

        let conflicts = self.detector.conflicting_resources(&selected);
        if conflicts.is_empty() {
            let names: Vec<String> = selected.iter().map(|t| t.name.clone()).collect();
            info!("committing {:?}", names);
            self.panes.disk_log.push("Committed Transactions:");
            for txn in selected {
                push_listing(&mut self.panes.disk_log, txn);
            }
            return Ok(CommitOutcome::Committed(names));
        }

        let (first, second) = (selected[0], selected[1]);
        let resolution = self.protocol.resolve(
            Participant::new(first, self.selection[0].ts),
            Participant::new(second, self.selection[1].ts),
        );
        let schedule = OperationScheduler::interleave(first, second)?;

        self.panes.message.push(resolution.message.clone());
        self.panes
            .message
            .push(format!("Conflicting variables: {}", conflicts.join(", ")));
        self.panes.message.push(schedule.summary());
        if let Some(held) = schedule.held_locks() {
            self.panes.message.push(held);
        }
        for line in resolution.behavior.iter() {
            self.panes.protocol_behavior.push(line.clone());
        }
        self.selection
            .retain(|s| resolution.survivors.contains(&s.name));
        Ok(CommitOutcome::Resolved(resolution))
    }

    pub fn clear(&mut self) {
        debug!("clearing panes and selection");
        self.panes.clear();
        self.selection.clear();
    }

    fn render_memory_log(&mut self) {
        let selected = lookup(&self.catalog, &self.selection);
        self.panes.memory_log.clear();
        for txn in selected {
            push_listing(&mut self.panes.memory_log, txn);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::SimulatorConfig;
    use crate::conflict::ConflictRule;
    use crate::protocol::Protocol;
    use crate::session::{CommitOutcome, SelectOutcome, Session, SessionError};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn session(protocol: Protocol) -> Session {
        Session::new(SimulatorConfig::new(protocol, ConflictRule::AccessMode))
    }

    #[test]
    pub fn test_show_lists_operations() {
        let mut session = Session::default();
        session.show("Transaction 4").unwrap();
        assert_eq!(
            session.panes().message.lines(),
            ["Transaction 4:", " - Read x", " - Read y", " - Write z"]
        );
        assert!(session.selection().is_empty());
    }

    #[test]
    pub fn test_never_selects_a_third() {
        let mut session = Session::default();
        assert_eq!(session.select("Transaction 1").unwrap(), SelectOutcome::Added);
        assert_eq!(
            session.select("Transaction 1").unwrap(),
            SelectOutcome::AlreadySelected
        );
        assert_eq!(session.select("2").unwrap(), SelectOutcome::Added);
        assert_eq!(session.select("Transaction 3").unwrap(), SelectOutcome::Rejected);
        assert_eq!(session.selection(), vec!["Transaction 1", "Transaction 2"]);
        assert_eq!(
            session.panes().message.lines(),
            ["Only two transactions can be selected"]
        );
        assert_eq!(
            session.panes().memory_log.lines(),
            [
                "Transaction 1:",
                " - Read x",
                " - Write y",
                "",
                "Transaction 2:",
                " - Read y",
                " - Write x",
                "",
            ]
        );
    }

    #[test]
    pub fn test_unknown_transaction() {
        let mut session = Session::default();
        assert!(matches!(
            session.select("Transaction 9"),
            Err(SessionError::UnknownTransaction(_))
        ));
        assert!(session.show("nope").is_err());
    }

    #[test]
    pub fn test_wait_die_keeps_first_selected() {
        let mut session = session(Protocol::WaitDie);
        session.select("Transaction 2").unwrap();
        session.select("Transaction 1").unwrap();
        let outcome = session.commit().unwrap();
        match outcome {
            CommitOutcome::Resolved(resolution) => {
                assert_eq!(resolution.aborted.as_deref(), Some("Transaction 1"))
            }
            other => panic!("expected a resolution, got {:?}", other),
        }
        assert_eq!(session.selection(), vec!["Transaction 2"]);
        let message = session.panes().message.lines();
        assert_eq!(message[0], "Wait-Die protocol selected");
        assert_eq!(message[1], "Conflicting variables: y, x");
        assert!(message[2].starts_with("Deadlock under interleaved 2PL"));
        assert_eq!(
            message[3],
            "Locks held: Transaction 2 Shared on y, Transaction 1 Shared on x"
        );
        assert_eq!(
            session.panes().protocol_behavior.lines()[0],
            "Transaction 1 aborted and rolled back (younger)"
        );
        assert!(session.panes().disk_log.is_empty());
    }

    #[test]
    pub fn test_wound_wait_keeps_both() {
        let mut session = session(Protocol::WoundWait);
        session.select("Transaction 3").unwrap();
        session.select("Transaction 5").unwrap();
        assert!(matches!(session.commit().unwrap(), CommitOutcome::Resolved(_)));
        assert_eq!(session.selection(), vec!["Transaction 3", "Transaction 5"]);
        let behavior = session.panes().protocol_behavior.lines().to_vec();
        assert_eq!(behavior[0], "Transaction 3 waits (older)");
        assert_eq!(behavior[1], "Transaction 5 continues (younger)");
        // committing again replaces the behaviour pane rather than appending
        session.commit().unwrap();
        assert_eq!(session.panes().protocol_behavior.lines(), behavior.as_slice());
    }

    #[test]
    pub fn test_commit_without_conflict() {
        let mut session = Session::default();
        session.select("Transaction 1").unwrap();
        session.select("Transaction 3").unwrap();
        let outcome = session.commit().unwrap();
        assert_eq!(
            outcome,
            CommitOutcome::Committed(vec![
                "Transaction 1".to_string(),
                "Transaction 3".to_string()
            ])
        );
        assert_eq!(
            session.panes().disk_log.lines(),
            [
                "Committed Transactions:",
                "Transaction 1:",
                " - Read x",
                " - Write y",
                "",
                "Transaction 3:",
                " - Read z",
                " - Write z",
                "",
            ]
        );
        assert!(session.panes().protocol_behavior.is_empty());
        assert_eq!(session.selection().len(), 2);
    }

    #[test]
    pub fn test_disk_log_accumulates() {
        let mut session = Session::default();
        session.select("Transaction 1").unwrap();
        session.select("Transaction 3").unwrap();
        session.commit().unwrap();
        session.commit().unwrap();
        let disk_log = session.panes().disk_log.lines();
        assert_eq!(disk_log.len(), 18);
        assert_eq!(
            disk_log
                .iter()
                .filter(|line| line.as_str() == "Committed Transactions:")
                .count(),
            2
        );
        assert_eq!(disk_log[..9], disk_log[9..]);
        session.clear();
        assert!(session.panes().disk_log.is_empty());
    }

    #[test]
    pub fn test_full_selection_rejects_before_duplicate_check() {
        let mut session = Session::default();
        session.select("Transaction 1").unwrap();
        session.select("Transaction 2").unwrap();
        assert_eq!(session.select("Transaction 1").unwrap(), SelectOutcome::Rejected);
        assert_eq!(
            session.panes().message.lines(),
            ["Only two transactions can be selected"]
        );
        assert_eq!(session.selection(), vec!["Transaction 1", "Transaction 2"]);
    }

    #[test]
    pub fn test_single_selection_commits() {
        let mut session = Session::default();
        session.select("Transaction 5").unwrap();
        assert_eq!(
            session.commit().unwrap(),
            CommitOutcome::Committed(vec!["Transaction 5".to_string()])
        );
    }

    #[test]
    pub fn test_read_read_rule_changes_outcome() {
        let catalog = crate::catalog::TransactionCatalog::from_yaml(
            "transactions:\n  - name: A\n    operations: [\"Read x\"]\n  - name: B\n    operations: [\"Read x\", \"Write y\"]",
        )
        .unwrap();
        let mut strict = Session::new(
            SimulatorConfig::new(Protocol::WaitDie, ConflictRule::SharedVariable)
                .with_catalog(catalog.clone()),
        );
        let mut relaxed = Session::new(SimulatorConfig::default().with_catalog(catalog));
        for session in [&mut strict, &mut relaxed] {
            session.select("A").unwrap();
            session.select("B").unwrap();
        }
        assert!(matches!(strict.commit().unwrap(), CommitOutcome::Resolved(_)));
        assert!(matches!(relaxed.commit().unwrap(), CommitOutcome::Committed(_)));
    }

    #[test]
    pub fn test_clear_resets_everything() {
        let mut session = Session::default();
        session.select("Transaction 1").unwrap();
        session.select("Transaction 3").unwrap();
        session.commit().unwrap();
        session.select("Transaction 4").unwrap();
        session.clear();
        assert!(session.panes().is_empty());
        assert!(session.selection().is_empty());
        assert_eq!(session.select("Transaction 4").unwrap(), SelectOutcome::Added);
    }

    #[test]
    pub fn test_random_selection_respects_limit() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut session = Session::default();
        for _ in 0..10 {
            session.select_random(&mut rng).unwrap();
            assert!(session.selection().len() <= 2);
        }
        let selection = session.selection();
        assert_eq!(selection.len(), 2);
        assert_ne!(selection[0], selection[1]);
    }

    #[test]
    pub fn test_random_selection_exhausted() {
        let catalog = crate::catalog::TransactionCatalog::from_yaml(
            "transactions:\n  - name: Only\n    operations: [\"Read x\"]",
        )
        .unwrap();
        let mut session = Session::new(SimulatorConfig::default().with_catalog(catalog));
        let mut rng = StdRng::seed_from_u64(1);
        session.select_random(&mut rng).unwrap();
        assert!(matches!(
            session.select_random(&mut rng),
            Err(SessionError::NothingToSelect)
        ));
    }
}
