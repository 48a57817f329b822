//! Declarative description of the controller state a test wants.

use crate::consts::GIC_MAX_IRQS;
use crate::error::{Field, GicError, GicResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqGroup {
    Group0,
    Group1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EoiMode {
    /// GICC_EOIR drops priority and deactivates.
    #[default]
    Combined,
    /// GICC_EOIR only drops priority; GICC_DIR deactivates.
    Split,
}

/// One interrupt under test. A list of these ends with [`IrqInfo::END`].
///
/// `subgroup` and `subprio` must fit the binary point of the CPU interface
/// they are configured with: with GICC_BPR 0 a group 0 IRQ has a single
/// subpriority bit. See [`IrqInfo::priority`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrqInfo {
    pub irq: i32,
    pub cpu_target: u8,
    pub group: IrqGroup,
    /// Group priority field of the priority byte.
    pub subgroup: u8,
    /// Subpriority field of the priority byte.
    pub subprio: u8,
}

impl IrqInfo {
    pub const END: Self = Self {
        irq: -1,
        cpu_target: 0,
        group: IrqGroup::Group0,
        subgroup: 0,
        subprio: 0,
    };

    pub const fn new(irq: i32, cpu_target: u8, group: IrqGroup, subgroup: u8, subprio: u8) -> Self {
        Self {
            irq,
            cpu_target,
            group,
            subgroup,
            subprio,
        }
    }

    pub const fn is_end(&self) -> bool {
        self.irq == -1
    }

    /// Priority byte for this IRQ under `cpu`'s binary point settings.
    ///
    /// Group 0 interrupts, and group 1 interrupts when CBPR is set, split the
    /// byte at GICC_BPR: group priority in bits [7:bpr+1], subpriority below.
    /// Other group 1 interrupts split at GICC_ABPR: bits [7:abpr] and below.
    pub fn priority(&self, cpu: &CpuInfo) -> GicResult<u8> {
        cpu.validate()?;
        let split = match self.group {
            IrqGroup::Group1 if !cpu.cbpr => cpu.abpr as u32,
            _ => cpu.bpr as u32 + 1,
        };
        if (self.subprio as u32) >> split != 0 {
            return Err(GicError::out_of_range(Field::SubPriority, self.subprio as u32));
        }
        let group_bits = 8 - split;
        if (self.subgroup as u32) >> group_bits != 0 {
            return Err(GicError::out_of_range(Field::SubGroup, self.subgroup as u32));
        }
        Ok((((self.subgroup as u32) << split) | self.subprio as u32) as u8)
    }

    pub(crate) fn irq_number(&self) -> GicResult<usize> {
        if self.irq < 0 || self.irq as usize >= GIC_MAX_IRQS {
            return Err(GicError::out_of_range(Field::IrqNumber, self.irq as u32));
        }
        Ok(self.irq as usize)
    }
}

/// CPU interface settings, for either the physical or the virtual interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuInfo {
    pub en_grp0: bool,
    pub en_grp1: bool,
    pub grp0_to_fiq: bool,
    pub eoi_mode: EoiMode,
    /// Group 1 uses GICC_BPR instead of GICC_ABPR.
    pub cbpr: bool,
    pub bpr: u8,
    pub abpr: u8,
}

impl CpuInfo {
    pub fn validate(&self) -> GicResult<()> {
        for bp in [self.bpr, self.abpr] {
            if bp > 7 {
                return Err(GicError::out_of_range(Field::BinaryPoint, bp as u32));
            }
        }
        Ok(())
    }
}

/// Hypervisor control settings; every maintenance flag maps to one GICH_HCR bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VirtInfo {
    pub en: bool,
    pub vgrp1die: bool,
    pub vgrp1eie: bool,
    pub vgrp0die: bool,
    pub vgrp0eie: bool,
    pub npie: bool,
    pub lrenpie: bool,
    pub uie: bool,
}

impl VirtInfo {
    pub const DISABLED: Self = Self {
        en: false,
        vgrp1die: false,
        vgrp1eie: false,
        vgrp0die: false,
        vgrp0eie: false,
        npie: false,
        lrenpie: false,
        uie: false,
    };
}

/// Everything [`configure`](crate::configure) needs for one test. The IRQ
/// list is borrowed and must contain [`IrqInfo::END`].
#[derive(Debug, Clone, Copy)]
pub struct GicInfo<'a> {
    pub irqs: &'a [IrqInfo],
    pub cpu: CpuInfo,
    pub virt: VirtInfo,
    pub vcpu: CpuInfo,
}

impl<'a> GicInfo<'a> {
    /// Descriptor with every interface disabled and binary points at 0.
    pub fn new(irqs: &'a [IrqInfo]) -> Self {
        Self {
            irqs,
            cpu: CpuInfo::default(),
            virt: VirtInfo::default(),
            vcpu: CpuInfo::default(),
        }
    }

    /// Entries before the terminator.
    pub fn active_irqs(&self) -> GicResult<&'a [IrqInfo]> {
        let end = self
            .irqs
            .iter()
            .position(IrqInfo::is_end)
            .ok_or(GicError::MissingTerminator)?;
        Ok(&self.irqs[..end])
    }

    /// Checks the whole descriptor without touching hardware.
    pub fn validate(&self) -> GicResult<()> {
        self.cpu.validate()?;
        self.vcpu.validate()?;
        for info in self.active_irqs()? {
            info.irq_number()?;
            info.priority(&self.cpu)?;
        }
        Ok(())
    }
}
