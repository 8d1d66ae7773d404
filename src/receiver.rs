//! Receive loop: pull packets from a radio, number them and render them for the console.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error};

use crate::error::Result;
use crate::packet::{PacketStatus, ReceivedPacket};
use crate::sx1276::SX1276;

/// Anything that blocks until the next packet is available
pub trait PacketSource {
	fn receive(&mut self) -> Result<ReceivedPacket>;
}

/// Upper bound on one blocking receive, so the loop can notice a stop request
pub const RECEIVE_TIMEOUT: Duration = Duration::from_millis(500);

impl PacketSource for SX1276 {
	/// Returns an empty packet when nothing arrived within `RECEIVE_TIMEOUT`
	fn receive(&mut self) -> Result<ReceivedPacket> {
		self.receive_packet(Some(RECEIVE_TIMEOUT))
	}
}

/// A received packet together with its display number
#[derive(Clone, Debug, PartialEq)]
pub struct PacketReport {
	pub number: u64,
	pub packet: ReceivedPacket,
}

impl fmt::Display for PacketReport {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		writeln!(f, "[Packet #{}]", self.number)?;
		writeln!(f, "  Time: {}", self.packet.received_at.format("%H:%M:%S%.3f"))?;
		writeln!(f, "  Length: {} bytes", self.packet.payload.len())?;
		writeln!(f, "  Data: {}", self.packet.text())?;
		writeln!(f, "  Hex: {}", self.packet.hex())?;
		write!(f, "  RSSI: {:.2} dBm | SNR: {:.2} dB", self.packet.rssi, self.packet.snr)?;
		match self.packet.status {
			PacketStatus::Ok => Ok(()),
			PacketStatus::CrcError => write!(f, "\n  CRC error"),
			PacketStatus::HeaderError => write!(f, "\n  Packet header error"),
		}
	}
}

pub struct Receiver<S: PacketSource> {
	source: S,
	packet_count: u64,
}

impl<S: PacketSource> Receiver<S> {
	pub fn new(source: S) -> Receiver<S> {
		Receiver { source, packet_count: 0 }
	}

	/// Number of non-empty packets seen so far
	pub fn packet_count(&self) -> u64 {
		self.packet_count
	}

	pub fn source_mut(&mut self) -> &mut S {
		&mut self.source
	}

	/// Receive one packet. Empty payloads and receive errors yield `None` and the loop goes on.
	pub fn poll(&mut self) -> Option<PacketReport> {
		match self.source.receive() {
			Ok(packet) => self.accept(packet),
			Err(e) => {
				error!("Error receiving message: {}", e);
				None
			}
		}
	}

	/// Poll until `stop` is raised, handing every report to `on_report`
	pub fn run_until<F>(&mut self, stop: &InterruptFlag, mut on_report: F)
	where
		F: FnMut(&PacketReport),
	{
		while !stop.is_raised() {
			if let Some(report) = self.poll() {
				on_report(&report);
			}
		}
	}

	/// Number a packet obtained outside `poll`, e.g. after an interrupt callback fired
	pub fn accept(&mut self, packet: ReceivedPacket) -> Option<PacketReport> {
		if packet.is_empty() {
			debug!("Receive finished without payload");
			return None;
		}
		self.packet_count += 1;
		Some(PacketReport {
			number: self.packet_count,
			packet,
		})
	}
}

/// Flag raised from another thread (the DIO0 callback or a Ctrl-C handler) and read by the main loop
#[derive(Clone, Debug, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
	pub fn new() -> InterruptFlag {
		InterruptFlag::default()
	}

	pub fn raise(&self) {
		self.0.store(true, Ordering::SeqCst);
	}

	pub fn is_raised(&self) -> bool {
		self.0.load(Ordering::SeqCst)
	}

	/// Returns whether the flag was raised, and lowers it
	pub fn take(&self) -> bool {
		self.0.swap(false, Ordering::SeqCst)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::RadioError;
	use chrono::{TimeZone, Utc};
	use std::collections::VecDeque;

	struct ScriptedSource {
		script: VecDeque<Result<ReceivedPacket>>,
	}

	impl PacketSource for ScriptedSource {
		fn receive(&mut self) -> Result<ReceivedPacket> {
			self.script.pop_front().unwrap_or(Err(RadioError::NotListening))
		}
	}

	fn packet(payload: &[u8]) -> ReceivedPacket {
		ReceivedPacket {
			payload: payload.to_vec(),
			rssi: -97.5,
			snr: 9.25,
			status: PacketStatus::Ok,
			received_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 15).unwrap(),
		}
	}

	#[test]
	fn counts_only_non_empty_packets() {
		let mut receiver = Receiver::new(ScriptedSource {
			script: VecDeque::from(vec![
				Ok(packet(b"one")),
				Ok(packet(b"")),
				Err(RadioError::InvalidParameter(String::from("spi glitch"))),
				Ok(packet(b"two")),
			]),
		});

		assert_eq!(receiver.poll().map(|r| r.number), Some(1));
		assert!(receiver.poll().is_none());
		assert!(receiver.poll().is_none());
		let report = receiver.poll().unwrap();
		assert_eq!(report.number, 2);
		assert_eq!(report.packet.payload, b"two");
		assert_eq!(receiver.packet_count(), 2);
	}

	#[test]
	fn report_layout() {
		let report = PacketReport {
			number: 3,
			packet: packet(b"Hi\0"),
		};
		assert_eq!(
			report.to_string(),
			"[Packet #3]\n  Time: 12:30:15.000\n  Length: 3 bytes\n  Data: Hi\n  Hex: 486900\n  RSSI: -97.50 dBm | SNR: 9.25 dB"
		);
	}

	#[test]
	fn report_flags_crc_error() {
		let mut bad = packet(&[0xff, 0x00]);
		bad.status = PacketStatus::CrcError;
		let text = PacketReport { number: 1, packet: bad }.to_string();
		assert!(text.contains("  Data: <hex: ff00>"));
		assert!(text.ends_with("\n  CRC error"));
	}

	#[test]
	fn report_flags_header_error() {
		let mut bad = packet(b"x");
		bad.status = PacketStatus::HeaderError;
		let text = PacketReport { number: 4, packet: bad }.to_string();
		assert!(text.ends_with("SNR: 9.25 dB\n  Packet header error"));
		assert!(!text.contains("CRC error"));
	}

	/// Raises the stop flag once its script runs dry
	struct StoppingSource {
		script: VecDeque<ReceivedPacket>,
		stop: InterruptFlag,
	}

	impl PacketSource for StoppingSource {
		fn receive(&mut self) -> Result<ReceivedPacket> {
			match self.script.pop_front() {
				Some(next) => Ok(next),
				None => {
					self.stop.raise();
					Ok(packet(b""))
				}
			}
		}
	}

	#[test]
	fn run_until_returns_once_stopped() {
		let stop = InterruptFlag::new();
		let mut receiver = Receiver::new(StoppingSource {
			script: VecDeque::from(vec![packet(b"a"), packet(b""), packet(b"b")]),
			stop: stop.clone(),
		});

		let mut seen = Vec::new();
		receiver.run_until(&stop, |report| seen.push(report.number));

		assert_eq!(seen, vec![1, 2]);
		assert!(stop.is_raised());
		assert_eq!(receiver.packet_count(), 2);
	}

	#[test]
	fn run_until_skips_polling_when_already_stopped() {
		let stop = InterruptFlag::new();
		stop.raise();
		let mut receiver = Receiver::new(ScriptedSource {
			script: VecDeque::from(vec![Ok(packet(b"never"))]),
		});
		receiver.run_until(&stop, |_| panic!("no report expected"));
		assert_eq!(receiver.packet_count(), 0);
	}

	#[test]
	fn interrupt_flag_is_consumed_once() {
		let flag = InterruptFlag::new();
		let callback_side = flag.clone();
		assert!(!flag.take());
		callback_side.raise();
		assert!(flag.take());
		assert!(!flag.take());
	}
}
