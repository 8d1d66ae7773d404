//! Radio error types

use thiserror::Error;

/// Result type for radio operations
pub type Result<T> = std::result::Result<T, RadioError>;

/// Errors raised while configuring the SX1276 or receiving from it
#[derive(Error, Debug)]
pub enum RadioError {
	#[error("GPIO error: {0}")]
	Gpio(#[from] rppal::gpio::Error),

	#[error("SPI error: {0}")]
	Spi(#[from] rppal::spi::Error),

	/// RegVersion did not read back the SX1276 silicon revision
	#[error("invalid version: expected 0x{expected:02x}, found 0x{found:02x}")]
	InvalidVersion { expected: u8, found: u8 },

	#[error("mode change failed: 0x{old:02x} -> 0x{requested:02x}, chip reports 0x{found:02x}")]
	ModeChangeFailed { old: u8, requested: u8, found: u8 },

	#[error("invalid parameter: {0}")]
	InvalidParameter(String),

	/// A packet was read before `request()` put the chip into receive mode
	#[error("radio is not in receive mode")]
	NotListening,

	#[error("no DIO0 interrupt pin configured")]
	MissingIrqPin,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn messages_include_register_values() {
		let err = RadioError::InvalidVersion { expected: 0x12, found: 0x00 };
		assert_eq!(err.to_string(), "invalid version: expected 0x12, found 0x00");

		let err = RadioError::ModeChangeFailed { old: 0x09, requested: 0x81, found: 0x80 };
		assert_eq!(err.to_string(), "mode change failed: 0x09 -> 0x81, chip reports 0x80");
	}
}
