// Register offsets follow the GICv2 architecture specification (ARM IHI 0048B).

/// Number of interrupt IDs addressable by a GICv2 distributor.
/// IDs 1020-1023 are special, so valid interrupt numbers stop at 1019.
pub const GIC_MAX_IRQS: usize = 1020;

/// IRQs below this number are banked per core (SGIs and PPIs).
pub const GIC_PRIVATE_IRQS: usize = 32;

/// Upper bound on implemented list registers (GICH_VTR.ListRegs is 6 bits).
pub const GIC_MAX_LIST_REGS: usize = 64;

// --- Distributor (GICD) ---

pub const GICD_CTLR: usize = 0x000;
pub const GICD_TYPER: usize = 0x004;
/// One bit per IRQ.
pub const GICD_IGROUPR: usize = 0x080;
pub const GICD_ISENABLER: usize = 0x100;
pub const GICD_ICENABLER: usize = 0x180;
pub const GICD_ISPENDR: usize = 0x200;
pub const GICD_ICPENDR: usize = 0x280;
pub const GICD_ISACTIVER: usize = 0x300;
pub const GICD_ICACTIVER: usize = 0x380;
/// One byte per IRQ.
pub const GICD_IPRIORITYR: usize = 0x400;
/// One byte per IRQ, read-only for IRQs 0-31.
pub const GICD_ITARGETSR: usize = 0x800;

// --- CPU interface (GICC), also the layout of the virtual CPU interface (GICV) ---

pub const GICC_CTLR: usize = 0x0000;
pub const GICC_PMR: usize = 0x0004;
pub const GICC_BPR: usize = 0x0008;
pub const GICC_IAR: usize = 0x000C;
pub const GICC_EOIR: usize = 0x0010;
pub const GICC_RPR: usize = 0x0014;
pub const GICC_HPPIR: usize = 0x0018;
pub const GICC_ABPR: usize = 0x001C;
pub const GICC_AIAR: usize = 0x0020;
pub const GICC_AEOIR: usize = 0x0024;
/// Deactivate Interrupt Register, second 4KB page of the frame.
pub const GICC_DIR: usize = 0x1000;

// --- Virtual interface control (GICH) ---

pub const GICH_HCR: usize = 0x000;
pub const GICH_VTR: usize = 0x004;
pub const GICH_MISR: usize = 0x010;
pub const GICH_EISR0: usize = 0x020;
pub const GICH_EISR1: usize = 0x024;
pub const GICH_ELRSR0: usize = 0x030;
pub const GICH_ELRSR1: usize = 0x034;
pub const GICH_APR: usize = 0x0F0;
/// List register n lives at GICH_LR + 4 * n.
pub const GICH_LR: usize = 0x100;

/// Size of the largest register frame (GICC/GICV span two 4KB pages).
pub const GIC_FRAME_SIZE: usize = 0x2000;
