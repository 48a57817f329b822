use crate::codec::GicdCtlr;
use crate::consts::*;
use crate::descriptor::IrqGroup;
use crate::error::{Field, GicError, GicResult};
use crate::utils::{bit_position, byte_position, modify, RegisterWindow};

/// Per-IRQ distributor state as read back from the registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrqSnapshot {
    pub enabled: bool,
    pub pending: bool,
    pub active: bool,
    pub group: IrqGroup,
    pub priority: u8,
    pub target: u8,
}

impl IrqSnapshot {
    /// State of an IRQ that is disabled, idle, group 0, priority 0 and
    /// targets no core.
    pub const MASKED: Self = Self {
        enabled: false,
        pending: false,
        active: false,
        group: IrqGroup::Group0,
        priority: 0,
        target: 0,
    };
}

/// Accessors over the GICD frame shared by all cores.
#[derive(Clone, Copy)]
pub struct Distributor<'a> {
    regs: &'a dyn RegisterWindow,
}

impl<'a> Distributor<'a> {
    pub fn new(regs: &'a dyn RegisterWindow) -> Self {
        Self { regs }
    }

    fn check(irq: usize) -> GicResult<()> {
        if irq >= GIC_MAX_IRQS {
            return Err(GicError::out_of_range(Field::IrqNumber, irq as u32));
        }
        Ok(())
    }

    /// Number of implemented interrupt lines, from GICD_TYPER.ITLinesNumber.
    pub fn it_lines(&self) -> usize {
        let lines = (self.regs.read(GICD_TYPER) & 0x1f) as usize;
        ((lines + 1) * 32).min(GIC_MAX_IRQS)
    }

    pub fn set_enabled_groups(&self, groups: GicdCtlr) {
        self.regs.write(GICD_CTLR, groups.bits());
    }

    pub fn enabled_groups(&self) -> GicdCtlr {
        GicdCtlr::from_bits_truncate(self.regs.read(GICD_CTLR))
    }

    pub fn set_group(&self, irq: usize, group: IrqGroup) -> GicResult<()> {
        Self::check(irq)?;
        let (offset, bit) = bit_position(GICD_IGROUPR, irq);
        modify(self.regs, offset, |v| match group {
            IrqGroup::Group0 => v & !bit,
            IrqGroup::Group1 => v | bit,
        });
        Ok(())
    }

    pub fn set_priority(&self, irq: usize, priority: u8) -> GicResult<()> {
        Self::check(irq)?;
        let (offset, shift) = byte_position(GICD_IPRIORITYR, irq);
        modify(self.regs, offset, |v| {
            (v & !(0xff << shift)) | ((priority as u32) << shift)
        });
        Ok(())
    }

    /// Targets of SGIs and PPIs are fixed by hardware, so writes for
    /// IRQs below 32 are skipped.
    pub fn set_target(&self, irq: usize, cpu_mask: u8) -> GicResult<()> {
        Self::check(irq)?;
        if irq < GIC_PRIVATE_IRQS {
            return Ok(());
        }
        let (offset, shift) = byte_position(GICD_ITARGETSR, irq);
        modify(self.regs, offset, |v| {
            (v & !(0xff << shift)) | ((cpu_mask as u32) << shift)
        });
        Ok(())
    }

    fn write_bit(&self, bank: usize, irq: usize) -> GicResult<()> {
        Self::check(irq)?;
        let (offset, bit) = bit_position(bank, irq);
        self.regs.write(offset, bit);
        Ok(())
    }

    pub fn enable(&self, irq: usize) -> GicResult<()> {
        self.write_bit(GICD_ISENABLER, irq)
    }

    pub fn disable(&self, irq: usize) -> GicResult<()> {
        self.write_bit(GICD_ICENABLER, irq)
    }

    /// Raises `irq` from software. Tests use this to trigger interrupts.
    pub fn set_pending(&self, irq: usize) -> GicResult<()> {
        self.write_bit(GICD_ISPENDR, irq)
    }

    pub fn clear_pending(&self, irq: usize) -> GicResult<()> {
        self.write_bit(GICD_ICPENDR, irq)
    }

    pub fn clear_active(&self, irq: usize) -> GicResult<()> {
        self.write_bit(GICD_ICACTIVER, irq)
    }

    pub fn irq_state(&self, irq: usize) -> GicResult<IrqSnapshot> {
        Self::check(irq)?;
        let bit = |bank: usize| {
            let (offset, bit) = bit_position(bank, irq);
            self.regs.read(offset) & bit != 0
        };
        let byte = |bank: usize| {
            let (offset, shift) = byte_position(bank, irq);
            (self.regs.read(offset) >> shift) as u8
        };
        Ok(IrqSnapshot {
            enabled: bit(GICD_ISENABLER),
            pending: bit(GICD_ISPENDR),
            active: bit(GICD_ISACTIVER),
            group: if bit(GICD_IGROUPR) {
                IrqGroup::Group1
            } else {
                IrqGroup::Group0
            },
            priority: byte(GICD_IPRIORITYR),
            target: byte(GICD_ITARGETSR),
        })
    }

    /// Returns `irq` to [`IrqSnapshot::MASKED`]: disabled first so it cannot
    /// be signalled while the rest is cleared.
    pub fn mask(&self, irq: usize) -> GicResult<()> {
        self.disable(irq)?;
        self.clear_pending(irq)?;
        self.clear_active(irq)?;
        self.set_priority(irq, 0)?;
        self.set_group(irq, IrqGroup::Group0)?;
        self.set_target(irq, 0)
    }
}
