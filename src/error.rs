use core::fmt;

use axerrno::AxError;

/// Field that failed a range check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    State,
    Priority,
    PhysicalId,
    VirtualId,
    SlotIndex,
    IrqNumber,
    BinaryPoint,
    SubGroup,
    SubPriority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GicError {
    /// A value does not fit the register field it is destined for.
    ValueOutOfRange { field: Field, value: u32 },
    /// The IRQ descriptor list has no `-1` terminator.
    MissingTerminator,
    /// Every implemented list register holds an interrupt.
    NoFreeSlot,
    /// The controller has no virtualization extension.
    Unsupported,
}

pub type GicResult<T> = Result<T, GicError>;

impl GicError {
    pub(crate) const fn out_of_range(field: Field, value: u32) -> Self {
        GicError::ValueOutOfRange { field, value }
    }

    /// True for errors caused by an invalid test rather than by the
    /// controller's current state. These should fail the calling test.
    pub fn is_programming_error(&self) -> bool {
        matches!(
            self,
            GicError::ValueOutOfRange { .. } | GicError::MissingTerminator
        )
    }
}

impl fmt::Display for GicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GicError::ValueOutOfRange { field, value } => {
                write!(f, "{field:?} value {value:#x} out of range")
            }
            GicError::MissingTerminator => f.write_str("IRQ list has no terminator"),
            GicError::NoFreeSlot => f.write_str("no free list register"),
            GicError::Unsupported => f.write_str("virtualization extension not present"),
        }
    }
}

impl From<GicError> for AxError {
    fn from(err: GicError) -> Self {
        match err {
            GicError::ValueOutOfRange { .. } | GicError::MissingTerminator => AxError::InvalidInput,
            GicError::NoFreeSlot => AxError::NoMemory,
            GicError::Unsupported => AxError::Unsupported,
        }
    }
}
