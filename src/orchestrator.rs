// Applies a GicInfo descriptor to the controller and takes it back down.
//
// Ordering: distributor entries first, CPU interface enables last, so no
// interrupt is presented to an interface that is not yet set up for it.
use crate::codec::GicdCtlr;
use crate::controller::GicController;
use crate::descriptor::{GicInfo, VirtInfo};
use crate::error::GicResult;

/// Programs distributor, CPU interface and, when requested and present,
/// the virtualization extension from `info`.
///
/// The descriptor is validated before any register is written. Running it
/// twice leaves the controller in the same state as running it once.
pub fn configure<G: GicController + ?Sized>(gic: &G, info: &GicInfo<'_>) -> GicResult<()> {
    info.validate()?;

    let gicd = gic.distributor();
    for irq in info.active_irqs()? {
        let n = irq.irq_number()?;
        debug!("configure IRQ {n}: {irq:?}");
        gicd.disable(n)?;
        gicd.clear_pending(n)?;
        gicd.set_group(n, irq.group)?;
        gicd.set_priority(n, irq.priority(&info.cpu)?)?;
        gicd.set_target(n, irq.cpu_target)?;
        gicd.enable(n)?;
    }

    let mut groups = GicdCtlr::empty();
    groups.set(GicdCtlr::ENABLE_GRP0, info.cpu.en_grp0);
    groups.set(GicdCtlr::ENABLE_GRP1, info.cpu.en_grp1);
    gicd.set_enabled_groups(groups);

    gic.cpu_interface().apply(&info.cpu);

    if info.virt.en {
        match gic.virtualization() {
            Some(virt) => {
                virt.interface.set_control(&info.virt);
                virt.vcpu.apply(&info.vcpu);
            }
            None => warn!("virtualization requested but the controller has no GICH frame"),
        }
    }
    Ok(())
}

/// Undoes [`configure`]: interfaces disabled, virtualization and every
/// maintenance interrupt turned off, list registers emptied, and the listed
/// IRQs returned to the masked default.
///
/// Assumes nothing about how far a previous `configure` got. The
/// interfaces are disabled before the descriptor is checked, so even a
/// malformed descriptor leaves them off.
pub fn teardown<G: GicController + ?Sized>(gic: &G, info: &GicInfo<'_>) -> GicResult<()> {
    gic.cpu_interface().disable();
    if let Some(virt) = gic.virtualization() {
        virt.interface.set_control(&VirtInfo::DISABLED);
        virt.interface.reset_slots();
        virt.vcpu.disable();
    }

    let gicd = gic.distributor();
    gicd.set_enabled_groups(GicdCtlr::empty());

    let irqs = info.active_irqs()?;
    for irq in irqs {
        irq.irq_number()?;
    }
    for irq in irqs {
        let n = irq.irq_number()?;
        debug!("teardown IRQ {n}");
        gicd.mask(n)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CtlrFlags;
    use crate::consts::*;
    use crate::controller::{Gic, PhysicalOnlyGic};
    use crate::descriptor::{CpuInfo, IrqGroup, IrqInfo};
    use crate::distributor::IrqSnapshot;
    use crate::error::GicError;
    use crate::mock::FakeWindow;
    use crate::utils::RegisterWindow;

    const IRQS: [IrqInfo; 3] = [
        IrqInfo::new(16, 1, IrqGroup::Group0, 0, 3),
        IrqInfo::new(40, 2, IrqGroup::Group1, 1, 0),
        IrqInfo::END,
    ];

    fn info() -> GicInfo<'static> {
        GicInfo {
            irqs: &IRQS,
            cpu: CpuInfo {
                en_grp0: true,
                en_grp1: true,
                bpr: 2,
                abpr: 3,
                ..Default::default()
            },
            virt: VirtInfo {
                en: true,
                uie: true,
                npie: true,
                ..Default::default()
            },
            vcpu: CpuInfo {
                en_grp1: true,
                ..Default::default()
            },
        }
    }

    #[test]
    fn configure_programs_distributor_then_interface() {
        let (gicd, gicc) = (FakeWindow::distributor(), FakeWindow::new());
        let gic = PhysicalOnlyGic::new(&gicd, &gicc);
        configure(&gic, &info()).unwrap();

        let s16 = gic.distributor().irq_state(16).unwrap();
        assert!(s16.enabled);
        assert_eq!(s16.priority, 3);
        let s40 = gic.distributor().irq_state(40).unwrap();
        assert_eq!(s40.group, IrqGroup::Group1);
        assert_eq!(s40.priority, 1 << 3);
        assert_eq!(s40.target, 2);

        let ctlr = CtlrFlags::from_bits_truncate(gicc.read(GICC_CTLR));
        assert!(ctlr.contains(CtlrFlags::ENABLE_GRP0 | CtlrFlags::ENABLE_GRP1));
        assert_eq!(gicd.read(GICD_CTLR), 0b11);
    }

    #[test]
    fn invalid_descriptor_writes_nothing() {
        let (gicd, gicc) = (FakeWindow::distributor(), FakeWindow::new());
        let gic = PhysicalOnlyGic::new(&gicd, &gicc);
        let irqs = [IrqInfo::new(16, 1, IrqGroup::Group0, 0, 3)];
        assert_eq!(configure(&gic, &GicInfo::new(&irqs)), Err(GicError::MissingTerminator));
        assert_eq!(gicd.event_count(), 0);
        assert_eq!(gicc.event_count(), 0);
    }

    #[test]
    fn teardown_restores_masked_state() {
        let (gicd, gicc) = (FakeWindow::distributor(), FakeWindow::new());
        let (gich, gicv) = (FakeWindow::hypervisor(4), FakeWindow::new());
        let virt: (&dyn RegisterWindow, &dyn RegisterWindow) = (&gich, &gicv);
        let gic = Gic::discover(&gicd, &gicc, Some(virt));

        configure(&gic, &info()).unwrap();
        assert!(gic.virtual_interface().unwrap().get_control().en);
        assert!(gic.virtualization().unwrap().vcpu.state().en_grp1);

        teardown(&gic, &info()).unwrap();
        for irq in [16, 40] {
            assert_eq!(gic.distributor().irq_state(irq).unwrap(), IrqSnapshot::MASKED);
        }
        assert_eq!(gic.virtual_interface().unwrap().get_control(), VirtInfo::DISABLED);
        assert!(!gic.virtualization().unwrap().vcpu.state().en_grp1);
    }

    #[test]
    fn teardown_with_bad_descriptor_still_disables() {
        let (gicd, gicc) = (FakeWindow::distributor(), FakeWindow::new());
        let gic = PhysicalOnlyGic::new(&gicd, &gicc);
        configure(&gic, &info()).unwrap();

        let irqs = [IrqInfo::new(16, 1, IrqGroup::Group0, 0, 3)];
        assert_eq!(teardown(&gic, &GicInfo::new(&irqs)), Err(GicError::MissingTerminator));
        let cpu = gic.cpu_interface().state();
        assert!(!cpu.en_grp0 && !cpu.en_grp1);
        // Distributor entries are left for a later teardown with a valid list.
        assert!(gic.distributor().irq_state(16).unwrap().enabled);
    }

    #[test]
    fn virtualization_skipped_when_absent() {
        let (gicd, gicc) = (FakeWindow::distributor(), FakeWindow::new());
        let gic = PhysicalOnlyGic::new(&gicd, &gicc);
        assert_eq!(configure(&gic, &info()), Ok(()));
        assert_eq!(teardown(&gic, &info()), Ok(()));
    }
}
