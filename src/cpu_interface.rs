use crate::codec::{CtlrFlags, Iar};
use crate::consts::*;
use crate::descriptor::{CpuInfo, EoiMode};
use crate::utils::{write_ordered, RegisterWindow};

/// Accessors over one core's CPU interface frame.
///
/// The physical (GICC) and virtual (GICV) frames share a layout, so the
/// same type drives both. Each core owns its own instance; nothing here is
/// shared between cores.
#[derive(Clone, Copy)]
pub struct CpuInterface<'a> {
    regs: &'a dyn RegisterWindow,
}

impl<'a> CpuInterface<'a> {
    pub fn new(regs: &'a dyn RegisterWindow) -> Self {
        Self { regs }
    }

    /// Reads GICC_IAR. The returned interrupt moves from pending to active,
    /// so every call must be paired with one [`end_of_interrupt`](Self::end_of_interrupt).
    pub fn acknowledge(&self) -> Iar {
        Iar(self.regs.read(GICC_IAR))
    }

    pub fn end_of_interrupt(&self, iar: Iar) {
        write_ordered(self.regs, GICC_EOIR, iar.0);
    }

    /// Aliased acknowledge for group 1 interrupts (GICC_AIAR).
    pub fn acknowledge_group1(&self) -> Iar {
        Iar(self.regs.read(GICC_AIAR))
    }

    pub fn end_of_interrupt_group1(&self, iar: Iar) {
        write_ordered(self.regs, GICC_AEOIR, iar.0);
    }

    /// Deactivates an interrupt whose priority was already dropped in
    /// [`EoiMode::Split`].
    pub fn deactivate(&self, iar: Iar) {
        write_ordered(self.regs, GICC_DIR, iar.0);
    }

    pub fn running_priority(&self) -> u8 {
        self.regs.read(GICC_RPR) as u8
    }

    pub fn highest_pending(&self) -> Iar {
        Iar(self.regs.read(GICC_HPPIR))
    }

    pub fn set_priority_mask(&self, mask: u8) {
        self.regs.write(GICC_PMR, mask as u32);
    }

    pub fn priority_mask(&self) -> u8 {
        self.regs.read(GICC_PMR) as u8
    }

    /// Programs binary points first and GICC_CTLR last, so the interface is
    /// only enabled once the rest of its state is in place.
    pub fn apply(&self, info: &CpuInfo) {
        self.regs.write(GICC_BPR, info.bpr as u32);
        self.regs.write(GICC_ABPR, info.abpr as u32);
        self.set_priority_mask(0xff);

        let mut ctlr = CtlrFlags::empty();
        ctlr.set(CtlrFlags::ENABLE_GRP0, info.en_grp0);
        ctlr.set(CtlrFlags::ENABLE_GRP1, info.en_grp1);
        ctlr.set(CtlrFlags::FIQ_EN, info.grp0_to_fiq);
        ctlr.set(CtlrFlags::CBPR, info.cbpr);
        ctlr.set(CtlrFlags::EOI_MODE, info.eoi_mode == EoiMode::Split);
        write_ordered(self.regs, GICC_CTLR, ctlr.bits());
    }

    /// Clears every control bit and masks all priorities.
    pub fn disable(&self) {
        write_ordered(self.regs, GICC_CTLR, CtlrFlags::empty().bits());
        self.set_priority_mask(0);
    }

    /// Settings currently in effect, as read back from the frame.
    pub fn state(&self) -> CpuInfo {
        let ctlr = CtlrFlags::from_bits_truncate(self.regs.read(GICC_CTLR));
        CpuInfo {
            en_grp0: ctlr.contains(CtlrFlags::ENABLE_GRP0),
            en_grp1: ctlr.contains(CtlrFlags::ENABLE_GRP1),
            grp0_to_fiq: ctlr.contains(CtlrFlags::FIQ_EN),
            eoi_mode: if ctlr.contains(CtlrFlags::EOI_MODE) {
                EoiMode::Split
            } else {
                EoiMode::Combined
            },
            cbpr: ctlr.contains(CtlrFlags::CBPR),
            bpr: (self.regs.read(GICC_BPR) & 0x7) as u8,
            abpr: (self.regs.read(GICC_ABPR) & 0x7) as u8,
        }
    }
}
