//! ARM GICv2 driver for interrupt-controller validation.
//!
//! Programs distributor, CPU interface and hypervisor control state from a
//! declarative [`GicInfo`], and gives tests direct access to acknowledge,
//! EOI and list register injection.
#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate log;

mod consts;
mod utils;

pub mod codec;
pub mod controller;
pub mod cpu_interface;
pub mod descriptor;
pub mod distributor;
pub mod error;
pub mod mock;
pub mod orchestrator;
pub mod virtualization;

pub use consts::*;
pub use utils::{DeviceWindow, RegisterWindow};

pub use codec::{CtlrFlags, GicdCtlr, HcrFlags, Iar, ListRegister, LrState, MaintenanceStatus};
pub use controller::{
    Gic, GicController, GicPlatform, GicWindows, PhysicalOnlyGic, Virtualization,
    VirtualizationGic,
};
pub use cpu_interface::CpuInterface;
pub use descriptor::{CpuInfo, EoiMode, GicInfo, IrqGroup, IrqInfo, VirtInfo};
pub use distributor::{Distributor, IrqSnapshot};
pub use error::{Field, GicError, GicResult};
pub use orchestrator::{configure, teardown};
pub use virtualization::{OverwriteHook, VirtualInterface};
