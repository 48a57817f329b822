//! Bit-level encoding of GICv2 register values. Nothing here touches hardware.

use bitflags::bitflags;

use crate::error::{Field, GicError, GicResult};

const LR_HW_SHIFT: u32 = 31;
const LR_GRP1_SHIFT: u32 = 30;
const LR_STATE_SHIFT: u32 = 28;
const LR_PRIORITY_SHIFT: u32 = 23;
const LR_PHYS_ID_SHIFT: u32 = 10;

const LR_STATE_MASK: u32 = 0b11;
const LR_PRIORITY_MASK: u32 = 0x1f;
/// PhysicalID occupies bits 22:10; the upper three bits are reserved.
const LR_PHYS_ID_MASK: u32 = 0x1fff;
const LR_VIRT_ID_MASK: u32 = 0x3ff;

const LR_PRIORITY_LIMIT: u8 = 32;
const LR_ID_LIMIT: u16 = 1024;

/// List register state field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LrState {
    Invalid = 0b00,
    Pending = 0b01,
    Active = 0b10,
    PendingAndActive = 0b11,
}

impl LrState {
    const fn from_bits(bits: u32) -> Self {
        match bits & LR_STATE_MASK {
            0b00 => LrState::Invalid,
            0b01 => LrState::Pending,
            0b10 => LrState::Active,
            _ => LrState::PendingAndActive,
        }
    }
}

impl TryFrom<u8> for LrState {
    type Error = GicError;

    fn try_from(value: u8) -> GicResult<Self> {
        if value as u32 > LR_STATE_MASK {
            return Err(GicError::out_of_range(Field::State, value as u32));
        }
        Ok(Self::from_bits(value as u32))
    }
}

/// Contents of one GICH_LR slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListRegister {
    /// Virtual interrupt is backed by a physical one.
    pub hw: bool,
    pub group1: bool,
    pub state: LrState,
    /// 5-bit priority, 0 is highest.
    pub priority: u8,
    pub physical_id: u16,
    pub virtual_id: u16,
}

impl ListRegister {
    pub const fn empty() -> Self {
        Self {
            hw: false,
            group1: false,
            state: LrState::Invalid,
            priority: 0,
            physical_id: 0,
            virtual_id: 0,
        }
    }

    /// Checks every field against its width. Out-of-range values are
    /// rejected, never truncated.
    pub fn validate(&self) -> GicResult<()> {
        if self.priority >= LR_PRIORITY_LIMIT {
            return Err(GicError::out_of_range(Field::Priority, self.priority as u32));
        }
        if self.physical_id >= LR_ID_LIMIT {
            return Err(GicError::out_of_range(Field::PhysicalId, self.physical_id as u32));
        }
        if self.virtual_id >= LR_ID_LIMIT {
            return Err(GicError::out_of_range(Field::VirtualId, self.virtual_id as u32));
        }
        Ok(())
    }

    pub fn encode(&self) -> GicResult<u32> {
        self.validate()?;
        Ok(((self.hw as u32) << LR_HW_SHIFT)
            | ((self.group1 as u32) << LR_GRP1_SHIFT)
            | ((self.state as u32) << LR_STATE_SHIFT)
            | ((self.priority as u32) << LR_PRIORITY_SHIFT)
            | ((self.physical_id as u32) << LR_PHYS_ID_SHIFT)
            | self.virtual_id as u32)
    }

    /// Inverse of [`encode`](Self::encode). A raw hardware value may carry a
    /// physical ID above 1023 (reserved bits, or the EOI/CPUID overlay of
    /// software entries); it is reported as read.
    pub const fn decode(raw: u32) -> Self {
        Self {
            hw: (raw >> LR_HW_SHIFT) & 1 != 0,
            group1: (raw >> LR_GRP1_SHIFT) & 1 != 0,
            state: LrState::from_bits(raw >> LR_STATE_SHIFT),
            priority: ((raw >> LR_PRIORITY_SHIFT) & LR_PRIORITY_MASK) as u8,
            physical_id: ((raw >> LR_PHYS_ID_SHIFT) & LR_PHYS_ID_MASK) as u16,
            virtual_id: (raw & LR_VIRT_ID_MASK) as u16,
        }
    }
}

bitflags! {
    /// GICH_HCR enable bits. EOICount (bits 31:27) is not a flag and is
    /// preserved by every update.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HcrFlags: u32 {
        const EN = 1 << 0;
        const UIE = 1 << 1;
        const LRENPIE = 1 << 2;
        const NPIE = 1 << 3;
        const VGRP0EIE = 1 << 4;
        const VGRP0DIE = 1 << 5;
        const VGRP1EIE = 1 << 6;
        const VGRP1DIE = 1 << 7;
    }
}

pub const HCR_EOICOUNT_SHIFT: u32 = 27;

bitflags! {
    /// GICH_MISR maintenance causes. `EOI` and `LRENP` are reported for
    /// information; the remaining causes each have an HCR enable.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MaintenanceStatus: u32 {
        const EOI = 1 << 0;
        const U = 1 << 1;
        const LRENP = 1 << 2;
        const NP = 1 << 3;
        const VGRP0E = 1 << 4;
        const VGRP0D = 1 << 5;
        const VGRP1E = 1 << 6;
        const VGRP1D = 1 << 7;
    }
}

bitflags! {
    /// GICC_CTLR / GICV_CTLR control bits. The GICV layout shares bit
    /// positions with the secure GICC view.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CtlrFlags: u32 {
        const ENABLE_GRP0 = 1 << 0;
        const ENABLE_GRP1 = 1 << 1;
        const FIQ_EN = 1 << 3;
        const CBPR = 1 << 4;
        const EOI_MODE = 1 << 9;
    }
}

bitflags! {
    /// GICD_CTLR.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GicdCtlr: u32 {
        const ENABLE_GRP0 = 1 << 0;
        const ENABLE_GRP1 = 1 << 1;
    }
}

/// Value read from GICC_IAR, written back unchanged to GICC_EOIR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Iar(pub u32);

impl Iar {
    pub const fn interrupt_id(&self) -> u32 {
        self.0 & 0x3ff
    }

    /// Requesting core for SGIs, zero otherwise.
    pub const fn cpu_id(&self) -> u32 {
        (self.0 >> 10) & 0x7
    }

    pub const fn is_spurious(&self) -> bool {
        self.interrupt_id() >= 1020
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot() -> ListRegister {
        ListRegister {
            hw: true,
            group1: true,
            state: LrState::Pending,
            priority: 31,
            physical_id: 1023,
            virtual_id: 1023,
        }
    }

    #[test]
    fn encode_field_positions() {
        let raw = ListRegister {
            hw: true,
            group1: false,
            state: LrState::Active,
            priority: 0b10101,
            physical_id: 0x2a,
            virtual_id: 0x155,
        }
        .encode()
        .unwrap();
        assert_eq!(raw >> 31, 1);
        assert_eq!((raw >> 30) & 1, 0);
        assert_eq!((raw >> 28) & 0b11, 0b10);
        assert_eq!((raw >> 23) & 0x1f, 0b10101);
        assert_eq!((raw >> 10) & 0x1fff, 0x2a);
        assert_eq!(raw & 0x3ff, 0x155);
    }

    #[test]
    fn decode_inverts_encode() {
        let states = [
            LrState::Invalid,
            LrState::Pending,
            LrState::Active,
            LrState::PendingAndActive,
        ];
        for (i, state) in states.into_iter().enumerate() {
            for priority in 0..32u8 {
                for id in (0..1024u16).step_by(7).chain([1023]) {
                    let slot = ListRegister {
                        hw: i % 2 == 0,
                        group1: (priority + i as u8) % 2 == 0,
                        state,
                        priority,
                        physical_id: 1023 - id,
                        virtual_id: id,
                    };
                    assert_eq!(ListRegister::decode(slot.encode().unwrap()), slot);
                }
            }
        }
    }

    #[test]
    fn each_field_rejected_just_above_limit() {
        let mut s = slot();
        s.priority = 32;
        assert_eq!(
            s.encode(),
            Err(GicError::ValueOutOfRange {
                field: Field::Priority,
                value: 32,
            })
        );

        let mut s = slot();
        s.physical_id = 1024;
        assert_eq!(
            s.encode(),
            Err(GicError::ValueOutOfRange {
                field: Field::PhysicalId,
                value: 1024,
            })
        );

        let mut s = slot();
        s.virtual_id = 1024;
        assert_eq!(
            s.encode(),
            Err(GicError::ValueOutOfRange {
                field: Field::VirtualId,
                value: 1024,
            })
        );

        assert_eq!(
            LrState::try_from(4u8),
            Err(GicError::ValueOutOfRange {
                field: Field::State,
                value: 4,
            })
        );
        assert_eq!(LrState::try_from(3u8), Ok(LrState::PendingAndActive));
        assert!(slot().encode().is_ok());
    }

    #[test]
    fn iar_fields() {
        let iar = Iar((3 << 10) | 27);
        assert_eq!(iar.interrupt_id(), 27);
        assert_eq!(iar.cpu_id(), 3);
        assert!(!iar.is_spurious());
        assert!(Iar(1023).is_spurious());
    }
}
