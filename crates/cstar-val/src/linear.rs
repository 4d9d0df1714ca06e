//! Usage-linearity state machine
//!
//! Every non-free variable moves through provide/consume alternation:
//! a value must be provided before it is consumed and must not be
//! consumed twice without being re-provided. The transition functions
//! here are total; a rejected transition names the exact fault so the
//! caller can report it and apply the documented recovery state.

use std::fmt;
use thiserror::Error;

/// Usage state of one variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Declared, never given a value.
    Uninitialized,
    /// Holds a live value that has not been consumed yet.
    Provided,
    /// The value was consumed; a new provide is required before reading.
    Consumed,
    /// Reserved. No transition produces or accepts this state.
    Borrowed,
}

impl Status {
    pub fn is_provided(&self) -> bool {
        matches!(self, Self::Provided)
    }

    pub fn is_consumed(&self) -> bool {
        matches!(self, Self::Consumed)
    }

    pub fn is_uninitialized(&self) -> bool {
        matches!(self, Self::Uninitialized)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Provided => write!(f, "provided"),
            Self::Consumed => write!(f, "consumed"),
            Self::Borrowed => write!(f, "borrowed"),
        }
    }
}

/// The declaration flags that shape a variable's legal transitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Perms {
    pub is_const: bool,
    pub is_mut: bool,
    pub is_static: bool,
    /// Atomic (free) values may be read repeatedly and re-provided
    /// without strict alternation.
    pub is_free: bool,
}

/// A rejected transition. `recovery()` gives the state the variable is
/// left in after the fault is reported, `None` meaning unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LinearFault {
    #[error("value was never consumed")]
    NeverConsumed { free: bool },
    #[error("cannot provide a constant")]
    SetConstant,
    #[error("cannot provide an immutable")]
    SetImmutable,
    #[error("value used before initialization")]
    UseBeforeInit,
    #[error("value already consumed")]
    ConsumedAgain,
    #[error("borrowed state is reserved")]
    Unsupported,
}

impl LinearFault {
    /// Faults on `provide` still leave the variable provided so one bad
    /// write does not cascade; faults on `consume` leave it unchanged.
    pub fn recovery(&self) -> Option<Status> {
        match self {
            LinearFault::NeverConsumed { .. } => Some(Status::Provided),
            LinearFault::SetConstant => Some(Status::Provided),
            LinearFault::SetImmutable => Some(Status::Provided),
            LinearFault::UseBeforeInit => None,
            LinearFault::ConsumedAgain => None,
            LinearFault::Unsupported => None,
        }
    }

    /// A fault that only warns instead of erroring.
    pub fn is_warning(&self) -> bool {
        matches!(self, LinearFault::NeverConsumed { free: true })
    }
}

/// Transition for a variable about to receive a value.
pub fn provide(status: Status, perms: Perms) -> Result<Status, LinearFault> {
    if status == Status::Borrowed {
        return Err(LinearFault::Unsupported);
    }
    if perms.is_const {
        return Err(LinearFault::SetConstant);
    }
    if !perms.is_mut && status != Status::Uninitialized {
        return Err(LinearFault::SetImmutable);
    }
    if status == Status::Provided {
        return Err(LinearFault::NeverConsumed {
            free: perms.is_free,
        });
    }
    Ok(Status::Provided)
}

/// Transition for a variable about to be read.
pub fn consume(status: Status, perms: Perms) -> Result<Status, LinearFault> {
    match status {
        Status::Borrowed => Err(LinearFault::Unsupported),
        Status::Uninitialized => Err(LinearFault::UseBeforeInit),
        Status::Consumed if !perms.is_free && !perms.is_static => {
            Err(LinearFault::ConsumedAgain)
        }
        _ => Ok(Status::Consumed),
    }
}
