use std::fmt::Write;

use chrono::{DateTime, Utc};

/// Outcome of a reception as reported by the IRQ flags
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PacketStatus {
	Ok,
	CrcError,
	/// RxDone fired without a valid explicit header
	HeaderError,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReceivedPacket {
	pub payload: Vec<u8>,
	/// Packet RSSI in dBm
	pub rssi: f32,
	/// Packet SNR in dB
	pub snr: f32,
	pub status: PacketStatus,
	pub received_at: DateTime<Utc>,
}

impl ReceivedPacket {
	pub fn is_empty(&self) -> bool {
		self.payload.is_empty()
	}

	pub fn text(&self) -> String {
		bytes_to_text(&self.payload)
	}

	pub fn hex(&self) -> String {
		to_hex(&self.payload)
	}
}

/// Render a payload for the console: UTF-8 text with trailing NUL padding
/// removed, or `<hex: ...>` when the bytes are not text.
pub fn bytes_to_text(data: &[u8]) -> String {
	if data.is_empty() {
		return String::new();
	}
	match std::str::from_utf8(data) {
		Ok(text) => text.trim_end_matches('\0').to_string(),
		Err(_) => format!("<hex: {}>", to_hex(data)),
	}
}

/// Lowercase hex without separators
pub fn to_hex(data: &[u8]) -> String {
	let mut out = String::with_capacity(data.len() * 2);
	for byte in data {
		let _ = write!(out, "{:02x}", byte);
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn text_payload() {
		assert_eq!(bytes_to_text(b"Hello from Pico"), "Hello from Pico");
		assert_eq!(bytes_to_text("temp=21.5°C".as_bytes()), "temp=21.5°C");
	}

	#[test]
	fn trailing_nul_padding_is_stripped() {
		assert_eq!(bytes_to_text(b"ping\0\0\0"), "ping");
		assert_eq!(bytes_to_text(b"\0\0"), "");
	}

	#[test]
	fn invalid_utf8_falls_back_to_hex() {
		assert_eq!(bytes_to_text(&[0xde, 0xad, 0xbe, 0xef]), "<hex: deadbeef>");
		assert_eq!(bytes_to_text(&[b'o', b'k', 0xff]), "<hex: 6f6bff>");
	}

	#[test]
	fn empty_payload() {
		assert_eq!(bytes_to_text(&[]), "");
		assert_eq!(to_hex(&[]), "");
	}

	#[test]
	fn packet_without_payload_is_empty() {
		let mut packet = ReceivedPacket {
			payload: Vec::new(),
			rssi: -120.0,
			snr: 0.0,
			status: PacketStatus::Ok,
			received_at: Utc::now(),
		};
		assert!(packet.is_empty());
		assert_eq!(packet.text(), "");

		packet.payload = b"\0".to_vec();
		assert!(!packet.is_empty());
		assert_eq!(packet.hex(), "00");
	}

	#[test]
	fn hex_is_lowercase_and_padded() {
		assert_eq!(to_hex(&[0x00, 0x0a, 0xAB]), "000aab");
	}
}
