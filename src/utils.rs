/// A 32-bit register frame of the interrupt controller.
///
/// Offsets are byte offsets from the frame base. Implementations must not
/// reorder `write` past a following `dsb`.
pub trait RegisterWindow {
    fn read(&self, offset: usize) -> u32;

    fn write(&self, offset: usize, val: u32);

    /// Data synchronization barrier: prior writes have reached the device.
    fn dsb(&self);

    /// Instruction synchronization barrier: later instructions observe the new state.
    fn isb(&self);
}

/// MMIO frame at a fixed address.
#[derive(Debug, Clone, Copy)]
pub struct DeviceWindow {
    base: usize,
}

impl DeviceWindow {
    /// # Safety
    ///
    /// `base` must be the virtual address of a mapped GIC register frame
    /// (device memory) that stays mapped for as long as the window is used.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    pub fn base(&self) -> usize {
        self.base
    }
}

impl RegisterWindow for DeviceWindow {
    fn read(&self, offset: usize) -> u32 {
        let addr = (self.base + offset) as *const u32;
        unsafe { addr.read_volatile() }
    }

    fn write(&self, offset: usize, val: u32) {
        let addr = (self.base + offset) as *mut u32;
        unsafe { addr.write_volatile(val) }
    }

    fn dsb(&self) {
        dsb_sy();
    }

    fn isb(&self) {
        isb();
    }
}

#[cfg(target_arch = "aarch64")]
fn dsb_sy() {
    unsafe { core::arch::asm!("dsb sy") };
}

#[cfg(target_arch = "aarch64")]
fn isb() {
    unsafe { core::arch::asm!("isb") };
}

#[cfg(not(target_arch = "aarch64"))]
fn dsb_sy() {
    core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
}

#[cfg(not(target_arch = "aarch64"))]
fn isb() {
    core::sync::atomic::compiler_fence(core::sync::atomic::Ordering::SeqCst);
}

/// Write followed by the dsb/isb pair, for writes whose effect on the
/// controller must be visible before control returns.
pub(crate) fn write_ordered(regs: &dyn RegisterWindow, offset: usize, val: u32) {
    regs.write(offset, val);
    regs.dsb();
    regs.isb();
}

pub(crate) fn modify(regs: &dyn RegisterWindow, offset: usize, f: impl FnOnce(u32) -> u32) {
    let old = regs.read(offset);
    regs.write(offset, f(old));
}

/// Word offset and bit mask of `irq` in a one-bit-per-IRQ register bank.
pub(crate) fn bit_position(bank: usize, irq: usize) -> (usize, u32) {
    (bank + (irq / 32) * 4, 1 << (irq % 32))
}

/// Word offset and bit shift of `irq` in a one-byte-per-IRQ register bank.
pub(crate) fn byte_position(bank: usize, irq: usize) -> (usize, u32) {
    (bank + (irq & !3), ((irq % 4) * 8) as u32)
}
