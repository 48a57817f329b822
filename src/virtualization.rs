// GICv2 virtual interface control (GICH): list register allocation,
// maintenance status and the hypervisor control register.
use bitmaps::Bitmap;

use crate::codec::{HcrFlags, ListRegister, MaintenanceStatus, HCR_EOICOUNT_SHIFT};
use crate::consts::*;
use crate::descriptor::VirtInfo;
use crate::error::{Field, GicError, GicResult};
use crate::utils::{write_ordered, RegisterWindow};

/// Called with the slot index and its previous contents when
/// [`VirtualInterface::program_slot`] replaces a slot that was not empty.
pub type OverwriteHook = fn(index: usize, previous: ListRegister);

impl From<&VirtInfo> for HcrFlags {
    fn from(info: &VirtInfo) -> Self {
        let mut hcr = HcrFlags::empty();
        hcr.set(HcrFlags::EN, info.en);
        hcr.set(HcrFlags::UIE, info.uie);
        hcr.set(HcrFlags::LRENPIE, info.lrenpie);
        hcr.set(HcrFlags::NPIE, info.npie);
        hcr.set(HcrFlags::VGRP0EIE, info.vgrp0eie);
        hcr.set(HcrFlags::VGRP0DIE, info.vgrp0die);
        hcr.set(HcrFlags::VGRP1EIE, info.vgrp1eie);
        hcr.set(HcrFlags::VGRP1DIE, info.vgrp1die);
        hcr
    }
}

impl From<HcrFlags> for VirtInfo {
    fn from(hcr: HcrFlags) -> Self {
        VirtInfo {
            en: hcr.contains(HcrFlags::EN),
            vgrp1die: hcr.contains(HcrFlags::VGRP1DIE),
            vgrp1eie: hcr.contains(HcrFlags::VGRP1EIE),
            vgrp0die: hcr.contains(HcrFlags::VGRP0DIE),
            vgrp0eie: hcr.contains(HcrFlags::VGRP0EIE),
            npie: hcr.contains(HcrFlags::NPIE),
            lrenpie: hcr.contains(HcrFlags::LRENPIE),
            uie: hcr.contains(HcrFlags::UIE),
        }
    }
}

/// One core's view of the hypervisor control frame.
///
/// Slot allocation is not atomic: [`find_free_slot`](Self::find_free_slot)
/// followed by [`program_slot`](Self::program_slot) relies on this core
/// being the only writer of its banked GICH frame.
#[derive(Clone, Copy)]
pub struct VirtualInterface<'a> {
    regs: &'a dyn RegisterWindow,
    lr_count: usize,
    on_overwrite: Option<OverwriteHook>,
}

impl<'a> VirtualInterface<'a> {
    pub fn new(regs: &'a dyn RegisterWindow) -> Self {
        let lr_count = (regs.read(GICH_VTR) & 0x3f) as usize + 1;
        Self {
            regs,
            lr_count,
            on_overwrite: None,
        }
    }

    pub fn with_overwrite_hook(mut self, hook: OverwriteHook) -> Self {
        self.on_overwrite = Some(hook);
        self
    }

    /// Implemented list registers, GICH_VTR.ListRegs + 1.
    pub fn list_register_count(&self) -> usize {
        self.lr_count
    }

    fn lr_mask(&self) -> u64 {
        if self.lr_count == GIC_MAX_LIST_REGS {
            u64::MAX
        } else {
            (1u64 << self.lr_count) - 1
        }
    }

    fn read_banks(&self, bank0: usize, bank1: usize) -> Bitmap<64> {
        let value = self.regs.read(bank0) as u64 | (self.regs.read(bank1) as u64) << 32;
        Bitmap::from_value(value & self.lr_mask())
    }

    /// GICH_ELRSR0/1: set bits are slots holding no interrupt.
    pub fn empty_slots(&self) -> Bitmap<64> {
        self.read_banks(GICH_ELRSR0, GICH_ELRSR1)
    }

    /// GICH_EISR0/1: set bits are slots whose EOI maintenance is pending.
    pub fn eoi_slots(&self) -> Bitmap<64> {
        self.read_banks(GICH_EISR0, GICH_EISR1)
    }

    /// Lowest empty slot. [`GicError::NoFreeSlot`] when all are in use.
    pub fn find_free_slot(&self) -> GicResult<usize> {
        self.empty_slots().first_index().ok_or(GicError::NoFreeSlot)
    }

    fn check_index(&self, index: usize) -> GicResult<()> {
        if index >= self.lr_count {
            return Err(GicError::out_of_range(Field::SlotIndex, index as u32));
        }
        Ok(())
    }

    /// Encodes `slot` into list register `index`.
    ///
    /// Replacing a slot that is not empty discards the interrupt it holds.
    /// That is allowed, but reported through `warn!` and the overwrite hook.
    pub fn program_slot(&self, index: usize, slot: &ListRegister) -> GicResult<()> {
        self.check_index(index)?;
        let raw = slot.encode()?;
        let offset = GICH_LR + 4 * index;
        let previous = self.regs.read(offset);
        trace!("GICH_LR{index}: {previous:#010x} -> {raw:#010x}");
        if !self.empty_slots().get(index) {
            let previous = ListRegister::decode(previous);
            warn!("overwriting occupied list register {index}: {previous:?}");
            if let Some(hook) = self.on_overwrite {
                hook(index, previous);
            }
        }
        write_ordered(self.regs, offset, raw);
        Ok(())
    }

    pub fn read_slot(&self, index: usize) -> GicResult<ListRegister> {
        self.check_index(index)?;
        Ok(ListRegister::decode(self.regs.read(GICH_LR + 4 * index)))
    }

    /// Writes zero to every implemented list register.
    pub fn reset_slots(&self) {
        for index in 0..self.lr_count {
            let offset = GICH_LR + 4 * index;
            trace!("GICH_LR{index}: {:#010x} -> 0", self.regs.read(offset));
            self.regs.write(offset, 0);
        }
        self.regs.dsb();
        self.regs.isb();
    }

    pub fn read_maintenance_status(&self) -> MaintenanceStatus {
        MaintenanceStatus::from_bits_truncate(self.regs.read(GICH_MISR))
    }

    /// Updates the enable and maintenance-interrupt-enable bits of GICH_HCR.
    /// All other bits, EOICount included, keep the value read back.
    pub fn set_control(&self, info: &VirtInfo) {
        let hcr = self.regs.read(GICH_HCR);
        let val = (hcr & !HcrFlags::all().bits()) | HcrFlags::from(info).bits();
        write_ordered(self.regs, GICH_HCR, val);
    }

    pub fn get_control(&self) -> VirtInfo {
        VirtInfo::from(HcrFlags::from_bits_truncate(self.regs.read(GICH_HCR)))
    }

    /// GICH_HCR.EOICount: EOIs that found no matching list register.
    pub fn eoi_count(&self) -> u8 {
        (self.regs.read(GICH_HCR) >> HCR_EOICOUNT_SHIFT) as u8
    }

    pub fn read_active_priorities(&self) -> u32 {
        self.regs.read(GICH_APR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::LrState;
    use crate::mock::{Event, FakeWindow};
    use core::sync::atomic::{AtomicUsize, Ordering};

    fn pending(virtual_id: u16) -> ListRegister {
        ListRegister {
            hw: false,
            group1: true,
            state: LrState::Pending,
            priority: 4,
            physical_id: 0,
            virtual_id,
        }
    }

    #[test]
    fn lowest_free_slot_wins() {
        let fake = FakeWindow::hypervisor(64);
        fake.poke(GICH_ELRSR0, (1 << 2) | (1 << 5));
        fake.poke(GICH_ELRSR1, 0);
        assert_eq!(VirtualInterface::new(&fake).find_free_slot(), Ok(2));
    }

    #[test]
    fn all_slots_busy() {
        let fake = FakeWindow::hypervisor(4);
        fake.poke(GICH_ELRSR0, 0);
        assert_eq!(VirtualInterface::new(&fake).find_free_slot(), Err(GicError::NoFreeSlot));
    }

    #[test]
    fn second_bank_and_unimplemented_bits() {
        let fake = FakeWindow::hypervisor(40);
        fake.poke(GICH_ELRSR0, 0);
        fake.poke(GICH_ELRSR1, 1 << 3);
        let vif = VirtualInterface::new(&fake);
        assert_eq!(vif.list_register_count(), 40);
        assert_eq!(vif.find_free_slot(), Ok(35));

        // Status bits beyond the implemented count are ignored.
        fake.poke(GICH_ELRSR1, 1 << 10);
        assert_eq!(vif.find_free_slot(), Err(GicError::NoFreeSlot));
    }

    #[test]
    fn slots_fill_up() {
        let fake = FakeWindow::hypervisor(4);
        let vif = VirtualInterface::new(&fake);
        for expected in 0..4 {
            let slot = vif.find_free_slot().unwrap();
            assert_eq!(slot, expected);
            vif.program_slot(slot, &pending(32 + slot as u16)).unwrap();
        }
        assert_eq!(vif.find_free_slot(), Err(GicError::NoFreeSlot));
        assert_eq!(vif.read_slot(3).unwrap(), pending(35));

        vif.reset_slots();
        assert_eq!(vif.empty_slots().len(), 4);
        assert_eq!(vif.read_slot(3).unwrap(), ListRegister::empty());
        assert_eq!(fake.writes_to(GICH_LR + 12), 2);
        assert_eq!(fake.last_event(0), Some(Event::Isb));
    }

    #[test]
    fn program_slot_is_fenced() {
        let fake = FakeWindow::hypervisor(4);
        let vif = VirtualInterface::new(&fake);
        let slot = pending(40);
        vif.program_slot(1, &slot).unwrap();
        assert_eq!(
            fake.last_event(2),
            Some(Event::Write {
                offset: GICH_LR + 4,
                val: slot.encode().unwrap(),
            })
        );
        assert_eq!(fake.last_event(1), Some(Event::Dsb));
        assert_eq!(fake.last_event(0), Some(Event::Isb));
    }

    #[test]
    fn invalid_slot_not_written() {
        let fake = FakeWindow::hypervisor(4);
        let vif = VirtualInterface::new(&fake);
        let mut slot = pending(40);
        slot.priority = 32;
        assert_eq!(
            vif.program_slot(0, &slot),
            Err(GicError::ValueOutOfRange {
                field: Field::Priority,
                value: 32,
            })
        );
        assert_eq!(
            vif.program_slot(4, &pending(40)),
            Err(GicError::ValueOutOfRange {
                field: Field::SlotIndex,
                value: 4,
            })
        );
        assert_eq!(fake.event_count(), 0);
    }

    static OVERWRITES: AtomicUsize = AtomicUsize::new(0);

    fn count_overwrite(index: usize, previous: ListRegister) {
        assert_eq!(index, 0);
        assert_eq!(previous.virtual_id, 50);
        OVERWRITES.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn overwrite_reported() {
        let fake = FakeWindow::hypervisor(4);
        let vif = VirtualInterface::new(&fake).with_overwrite_hook(count_overwrite);
        vif.program_slot(0, &pending(50)).unwrap();
        assert_eq!(OVERWRITES.load(Ordering::SeqCst), 0);
        vif.program_slot(0, &pending(51)).unwrap();
        assert_eq!(OVERWRITES.load(Ordering::SeqCst), 1);
        assert_eq!(vif.read_slot(0).unwrap().virtual_id, 51);
    }

    #[test]
    fn control_update_keeps_other_bits() {
        let fake = FakeWindow::hypervisor(4);
        fake.poke(GICH_HCR, (3 << HCR_EOICOUNT_SHIFT) | (1 << 12));
        let vif = VirtualInterface::new(&fake);

        let all = VirtInfo {
            en: true,
            vgrp1die: true,
            vgrp1eie: true,
            vgrp0die: true,
            vgrp0eie: true,
            npie: true,
            lrenpie: true,
            uie: true,
        };
        vif.set_control(&all);
        assert_eq!(vif.get_control(), all);

        let no_underflow = VirtInfo { uie: false, ..all };
        vif.set_control(&no_underflow);
        assert_eq!(vif.get_control(), no_underflow);
        assert_eq!(fake.peek(GICH_HCR) & 0xff, 0xfd);
        assert_eq!(vif.eoi_count(), 3);
        assert_ne!(fake.peek(GICH_HCR) & (1 << 12), 0);
        assert_eq!(fake.last_event(0), Some(Event::Isb));
    }

    #[test]
    fn maintenance_status_bits() {
        let fake = FakeWindow::hypervisor(4);
        fake.poke(GICH_MISR, 0b1000_0010);
        let status = VirtualInterface::new(&fake).read_maintenance_status();
        assert_eq!(status, MaintenanceStatus::U | MaintenanceStatus::VGRP1D);
    }
}
