use crate::catalog::ResourceId;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Eq, PartialEq, Hash, Debug, Clone, Copy)]
pub enum OpType {
    Read,
    Write,
}

impl OpType {
    pub fn verb(&self) -> &'static str {
        match self {
            OpType::Read => "Read",
            OpType::Write => "Write",
        }
    }

    /// Narration form, e.g. "reading".
    pub fn participle(&self) -> &'static str {
        match self {
            OpType::Read => "reading",
            OpType::Write => "writing",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationParseError {
    #[error("Empty operation")]
    Empty,
    #[error("Unknown verb {0:?}, expected Read or Write")]
    UnknownVerb(String),
    #[error("Operation {0:?} must look like \"<Verb> <var>\"")]
    Malformed(String),
}

#[derive(Debug, Hash, Eq, PartialEq, Clone)]
pub struct Operation {
    pub op_type: OpType,
    pub resource: ResourceId,
}

impl Operation {
    pub fn new(op_type: OpType, rid: impl Into<ResourceId>) -> Self {
        Self {
            op_type,
            resource: rid.into(),
        }
    }

    pub fn read(rid: impl Into<ResourceId>) -> Self {
        Self::new(OpType::Read, rid)
    }

    pub fn write(rid: impl Into<ResourceId>) -> Self {
        Self::new(OpType::Write, rid)
    }

    pub fn is_write(&self) -> bool {
        self.op_type == OpType::Write
    }
}

impl FromStr for OpType {
    type Err = OperationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "read" => Ok(OpType::Read),
            "write" => Ok(OpType::Write),
            _ => Err(OperationParseError::UnknownVerb(s.to_string())),
        }
    }
}

impl FromStr for Operation {
    type Err = OperationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let verb = parts.next().ok_or(OperationParseError::Empty)?;
        let rid = parts
            .next()
            .ok_or_else(|| OperationParseError::Malformed(s.to_string()))?;
        if parts.next().is_some() {
            return Err(OperationParseError::Malformed(s.to_string()));
        }
        Ok(Operation::new(verb.parse()?, rid))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op_type.verb(), self.resource)
    }
}
