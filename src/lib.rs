#![cfg_attr(not(feature = "std"), no_std)]

//! Network bring-up for constrained devices with a single interface.
//!
//! - [`wire`]: byte cursors, the option-trailer codec and the link collaborator trait
//! - [`lease`]: the DHCP lease engine
//! - [`bringup`]: the orchestrator taking the device from "link up" to "time synchronized"

pub use edge_bringup as bringup;
pub use edge_lease as lease;
pub use edge_wire as wire;
