//! SX1276 LoRa receiver for the Raspberry Pi.
//!
//! A small register level driver on top of `rppal`, the typed modulation parameters
//! it is configured with, and the receive loop used by the `lora-receiver` and
//! `lora-sample` binaries.

#[macro_use]
extern crate bitflags;

pub mod config;
pub mod error;
pub mod modulation;
pub mod packet;
pub mod receiver;
pub mod sx1276;

pub use config::{PinConfig, RadioConfig};
pub use error::{RadioError, Result};
pub use modulation::{Bandwidth, CodingRate, HeaderMode, LoraModulation, LoraPacketParams, SpreadingFactor};
pub use packet::{bytes_to_text, to_hex, PacketStatus, ReceivedPacket};
pub use receiver::{InterruptFlag, PacketReport, PacketSource, Receiver};
pub use sx1276::{RxMode, SX1276};
