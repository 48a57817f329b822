//! In-memory register frames for exercising the driver without hardware.

use spin::Mutex;

use crate::consts::*;
use crate::utils::RegisterWindow;

const WORDS: usize = GIC_FRAME_SIZE / 4;
const JOURNAL_LEN: usize = 64;

/// Side effect observed by a [`FakeWindow`]. Reads are not recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Write { offset: usize, val: u32 },
    Dsb,
    Isb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Model {
    Plain,
    Distributor,
    Hypervisor { lr_count: usize },
}

struct Journal {
    events: [Event; JOURNAL_LEN],
    total: usize,
    dsb: usize,
    isb: usize,
}

impl Journal {
    const fn new() -> Self {
        Self {
            events: [Event::Dsb; JOURNAL_LEN],
            total: 0,
            dsb: 0,
            isb: 0,
        }
    }

    fn push(&mut self, event: Event) {
        match event {
            Event::Dsb => self.dsb += 1,
            Event::Isb => self.isb += 1,
            Event::Write { .. } => {}
        }
        self.events[self.total % JOURNAL_LEN] = event;
        self.total += 1;
    }
}

/// A register frame backed by memory.
///
/// The distributor model folds each set/clear register pair (ISENABLER and
/// ICENABLER, and so on) onto one bank. The hypervisor model keeps
/// GICH_ELRSR and GICH_EISR in step with list register writes and treats the
/// status registers as read-only.
pub struct FakeWindow {
    model: Model,
    regs: Mutex<[u32; WORDS]>,
    journal: Mutex<Journal>,
}

impl FakeWindow {
    /// Plain storage, suitable for a CPU interface frame.
    pub const fn new() -> Self {
        Self::with_model(Model::Plain)
    }

    pub const fn distributor() -> Self {
        Self::with_model(Model::Distributor)
    }

    /// Hypervisor control frame with `lr_count` implemented list registers,
    /// all empty.
    pub fn hypervisor(lr_count: usize) -> Self {
        assert!((1..=GIC_MAX_LIST_REGS).contains(&lr_count));
        let window = Self::with_model(Model::Hypervisor { lr_count });
        window.poke(GICH_VTR, (lr_count - 1) as u32);
        let empty = if lr_count == 64 {
            u64::MAX
        } else {
            (1u64 << lr_count) - 1
        };
        window.poke(GICH_ELRSR0, empty as u32);
        window.poke(GICH_ELRSR1, (empty >> 32) as u32);
        window
    }

    const fn with_model(model: Model) -> Self {
        Self {
            model,
            regs: Mutex::new([0; WORDS]),
            journal: Mutex::new(Journal::new()),
        }
    }

    /// Sets a register as the hardware would, bypassing the model and the journal.
    pub fn poke(&self, offset: usize, val: u32) {
        self.regs.lock()[offset / 4] = val;
    }

    /// Reads raw storage, bypassing the model.
    pub fn peek(&self, offset: usize) -> u32 {
        self.regs.lock()[offset / 4]
    }

    /// `back == 0` is the most recent event.
    pub fn last_event(&self, back: usize) -> Option<Event> {
        let journal = self.journal.lock();
        if back >= journal.total || back >= JOURNAL_LEN {
            return None;
        }
        Some(journal.events[(journal.total - 1 - back) % JOURNAL_LEN])
    }

    pub fn event_count(&self) -> usize {
        self.journal.lock().total
    }

    /// Number of (dsb, isb) barriers issued so far.
    pub fn barrier_counts(&self) -> (usize, usize) {
        let journal = self.journal.lock();
        (journal.dsb, journal.isb)
    }

    /// Number of writes recorded at `offset`, limited to the journal window.
    pub fn writes_to(&self, offset: usize) -> usize {
        let journal = self.journal.lock();
        let len = journal.total.min(JOURNAL_LEN);
        journal.events[..len]
            .iter()
            .filter(|e| matches!(e, Event::Write { offset: o, .. } if *o == offset))
            .count()
    }

    fn distributor_bank(offset: usize) -> Option<(usize, bool)> {
        const PAIRS: [(usize, usize); 3] = [
            (GICD_ISENABLER, GICD_ICENABLER),
            (GICD_ISPENDR, GICD_ICPENDR),
            (GICD_ISACTIVER, GICD_ICACTIVER),
        ];
        for (set, clear) in PAIRS {
            if (set..set + 0x80).contains(&offset) {
                return Some((offset, true));
            }
            if (clear..clear + 0x80).contains(&offset) {
                return Some((offset - (clear - set), false));
            }
        }
        None
    }

    fn write_list_register(regs: &mut [u32; WORDS], index: usize, val: u32) {
        regs[(GICH_LR / 4) + index] = val;
        let invalid = (val >> 28) & 0b11 == 0;
        let hw = val >> 31 != 0;
        let eoi = (val >> 19) & 1 != 0;
        let (elrsr, eisr) = if index < 32 {
            (GICH_ELRSR0, GICH_EISR0)
        } else {
            (GICH_ELRSR1, GICH_EISR1)
        };
        let bit = 1u32 << (index % 32);
        let set = |regs: &mut [u32; WORDS], offset: usize, on: bool| {
            if on {
                regs[offset / 4] |= bit;
            } else {
                regs[offset / 4] &= !bit;
            }
        };
        set(regs, elrsr, invalid && (hw || !eoi));
        set(regs, eisr, invalid && !hw && eoi);
    }
}

impl Default for FakeWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterWindow for FakeWindow {
    fn read(&self, offset: usize) -> u32 {
        let regs = self.regs.lock();
        match self.model {
            Model::Distributor => match Self::distributor_bank(offset) {
                Some((bank, _)) => regs[bank / 4],
                None => regs[offset / 4],
            },
            _ => regs[offset / 4],
        }
    }

    fn write(&self, offset: usize, val: u32) {
        self.journal.lock().push(Event::Write { offset, val });
        let mut regs = self.regs.lock();
        match self.model {
            Model::Plain => regs[offset / 4] = val,
            Model::Distributor => match Self::distributor_bank(offset) {
                Some((bank, true)) => regs[bank / 4] |= val,
                Some((bank, false)) => regs[bank / 4] &= !val,
                None => regs[offset / 4] = val,
            },
            Model::Hypervisor { lr_count } => match offset {
                GICH_VTR | GICH_MISR | GICH_EISR0 | GICH_EISR1 | GICH_ELRSR0 | GICH_ELRSR1 => {}
                o if o >= GICH_LR && o < GICH_LR + 4 * GIC_MAX_LIST_REGS => {
                    let index = (o - GICH_LR) / 4;
                    if index < lr_count {
                        Self::write_list_register(&mut regs, index, val);
                    }
                }
                _ => regs[offset / 4] = val,
            },
        }
    }

    fn dsb(&self) {
        self.journal.lock().push(Event::Dsb);
    }

    fn isb(&self) {
        self.journal.lock().push(Event::Isb);
    }
}
