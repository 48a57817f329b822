use crate::codec::{Iar, ListRegister, MaintenanceStatus};
use crate::cpu_interface::CpuInterface;
use crate::distributor::Distributor;
use crate::error::{GicError, GicResult};
use crate::utils::{DeviceWindow, RegisterWindow};
use crate::virtualization::VirtualInterface;

/// The hypervisor control frame together with the guest-visible virtual
/// CPU interface it drives.
#[derive(Clone, Copy)]
pub struct Virtualization<'a> {
    pub interface: VirtualInterface<'a>,
    pub vcpu: CpuInterface<'a>,
}

/// Operations every GICv2 controller offers, with or without the
/// virtualization extension.
pub trait GicController {
    fn distributor(&self) -> Distributor<'_>;

    fn cpu_interface(&self) -> CpuInterface<'_>;

    /// `None` on controllers without a GICH frame.
    fn virtualization(&self) -> Option<Virtualization<'_>>;

    fn supports_virtualization(&self) -> bool {
        self.virtualization().is_some()
    }

    fn acknowledge(&self) -> Iar {
        self.cpu_interface().acknowledge()
    }

    fn end_of_interrupt(&self, iar: Iar) {
        self.cpu_interface().end_of_interrupt(iar)
    }

    fn running_priority(&self) -> u8 {
        self.cpu_interface().running_priority()
    }

    fn virtual_interface(&self) -> GicResult<VirtualInterface<'_>> {
        self.virtualization()
            .map(|virt| virt.interface)
            .ok_or(GicError::Unsupported)
    }

    fn find_free_slot(&self) -> GicResult<usize> {
        self.virtual_interface()?.find_free_slot()
    }

    fn program_slot(&self, index: usize, slot: &ListRegister) -> GicResult<()> {
        self.virtual_interface()?.program_slot(index, slot)
    }

    fn read_maintenance_status(&self) -> GicResult<MaintenanceStatus> {
        Ok(self.virtual_interface()?.read_maintenance_status())
    }
}

/// Distributor and CPU interface only.
#[derive(Clone, Copy)]
pub struct PhysicalOnlyGic<'a> {
    gicd: Distributor<'a>,
    gicc: CpuInterface<'a>,
}

impl<'a> PhysicalOnlyGic<'a> {
    pub fn new(gicd: &'a dyn RegisterWindow, gicc: &'a dyn RegisterWindow) -> Self {
        Self {
            gicd: Distributor::new(gicd),
            gicc: CpuInterface::new(gicc),
        }
    }
}

impl GicController for PhysicalOnlyGic<'_> {
    fn distributor(&self) -> Distributor<'_> {
        self.gicd
    }

    fn cpu_interface(&self) -> CpuInterface<'_> {
        self.gicc
    }

    fn virtualization(&self) -> Option<Virtualization<'_>> {
        None
    }
}

/// Controller with the virtualization extension (GICH and GICV frames).
#[derive(Clone, Copy)]
pub struct VirtualizationGic<'a> {
    gicd: Distributor<'a>,
    gicc: CpuInterface<'a>,
    virt: Virtualization<'a>,
}

impl<'a> VirtualizationGic<'a> {
    pub fn new(
        gicd: &'a dyn RegisterWindow,
        gicc: &'a dyn RegisterWindow,
        gich: &'a dyn RegisterWindow,
        gicv: &'a dyn RegisterWindow,
    ) -> Self {
        Self {
            gicd: Distributor::new(gicd),
            gicc: CpuInterface::new(gicc),
            virt: Virtualization {
                interface: VirtualInterface::new(gich),
                vcpu: CpuInterface::new(gicv),
            },
        }
    }

    /// Replaces the virtual interface, e.g. to attach an overwrite hook.
    pub fn with_interface(mut self, interface: VirtualInterface<'a>) -> Self {
        self.virt.interface = interface;
        self
    }

    pub fn interface(&self) -> VirtualInterface<'a> {
        self.virt.interface
    }
}

impl GicController for VirtualizationGic<'_> {
    fn distributor(&self) -> Distributor<'_> {
        self.gicd
    }

    fn cpu_interface(&self) -> CpuInterface<'_> {
        self.gicc
    }

    fn virtualization(&self) -> Option<Virtualization<'_>> {
        Some(self.virt)
    }
}

/// A controller whose capabilities were chosen from the frames the
/// platform provides.
#[derive(Clone, Copy)]
pub enum Gic<'a> {
    PhysicalOnly(PhysicalOnlyGic<'a>),
    Virtualization(VirtualizationGic<'a>),
}

impl<'a> Gic<'a> {
    /// Picks [`Gic::Virtualization`] when both the GICH and GICV frames are given.
    pub fn discover(
        gicd: &'a dyn RegisterWindow,
        gicc: &'a dyn RegisterWindow,
        virt: Option<(&'a dyn RegisterWindow, &'a dyn RegisterWindow)>,
    ) -> Self {
        match virt {
            Some((gich, gicv)) => {
                let gic = VirtualizationGic::new(gicd, gicc, gich, gicv);
                debug!(
                    "GICv2 with virtualization, {} list registers",
                    gic.interface().list_register_count()
                );
                Gic::Virtualization(gic)
            }
            None => {
                debug!("GICv2 without virtualization");
                Gic::PhysicalOnly(PhysicalOnlyGic::new(gicd, gicc))
            }
        }
    }

    fn inner(&self) -> &dyn GicController {
        match self {
            Gic::PhysicalOnly(gic) => gic,
            Gic::Virtualization(gic) => gic,
        }
    }
}

impl GicController for Gic<'_> {
    fn distributor(&self) -> Distributor<'_> {
        self.inner().distributor()
    }

    fn cpu_interface(&self) -> CpuInterface<'_> {
        self.inner().cpu_interface()
    }

    fn virtualization(&self) -> Option<Virtualization<'_>> {
        self.inner().virtualization()
    }
}

/// Physical base addresses of the GICv2 frames on a platform. The
/// hypervisor frames are absent on parts without the virtualization
/// extension.
#[derive(Debug, Clone, Copy)]
pub struct GicPlatform {
    pub gicd: usize,
    pub gicc: usize,
    pub gich: Option<usize>,
    pub gicv: Option<usize>,
}

/// MMIO windows for every frame of a [`GicPlatform`].
#[derive(Debug, Clone, Copy)]
pub struct GicWindows {
    gicd: DeviceWindow,
    gicc: DeviceWindow,
    virt: Option<(DeviceWindow, DeviceWindow)>,
}

impl GicWindows {
    /// # Safety
    ///
    /// Every address in `platform` must be mapped as device memory at the
    /// same virtual address, and the frames must belong to the calling core.
    pub unsafe fn map(platform: &GicPlatform) -> Self {
        let window = |base| unsafe { DeviceWindow::new(base) };
        let virt = match (platform.gich, platform.gicv) {
            (Some(gich), Some(gicv)) => Some((window(gich), window(gicv))),
            (None, None) => None,
            (gich, gicv) => {
                warn!(
                    "incomplete virtualization frames (GICH {gich:x?}, GICV {gicv:x?}), \
                     ignoring both"
                );
                None
            }
        };
        Self {
            gicd: window(platform.gicd),
            gicc: window(platform.gicc),
            virt,
        }
    }

    pub fn gic(&self) -> Gic<'_> {
        Gic::discover(
            &self.gicd,
            &self.gicc,
            self.virt
                .as_ref()
                .map(|(gich, gicv)| (gich as &dyn RegisterWindow, gicv as &dyn RegisterWindow)),
        )
    }
}
