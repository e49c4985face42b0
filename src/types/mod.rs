//! Data types for console entities.
//!
//! This module contains the core data structures used throughout the library:
//! - Device addresses and identities
//! - Device status and radio block state
//! - Media player state

pub mod device;
pub mod player;

pub use device::{
    ADDRESS_LEN, Address, BATTERY_UNKNOWN, DeviceIdentity, DeviceStatus, RadioBlockState,
};
pub use player::{PlayerState, PlayerStatus, PlayerUpdate};
