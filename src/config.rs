//! Radio and wiring configuration shared by the binaries.
//!
//! The modulation values form the link contract with the transmitter: frequency,
//! spreading factor, bandwidth, coding rate, sync word and preamble length must match
//! the sender exactly. The defaults match a RadioLib sender started with
//! `radio.begin(915.0, 125.0, 9, 7, RADIOLIB_SX127X_SYNC_WORD, 10, 8, 0)`.

use clap::Args;
use log::info;
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};

use crate::error::{RadioError, Result};
use crate::modulation::{
	Bandwidth, CodingRate, LnaGain, LoraModulation, LoraPacketParams, PaOutput, RxGainMode, SpreadingFactor,
};
use crate::sx1276::{SX1276, DEFAULT_SYNC_WORD};

pub const DEFAULT_FREQUENCY_HZ: u32 = 915_000_000;
pub const DEFAULT_SPREADING_FACTOR: u8 = 9;
pub const DEFAULT_BANDWIDTH_HZ: u32 = 125_000;
pub const DEFAULT_CODING_RATE: u8 = 7;
pub const DEFAULT_PREAMBLE_LENGTH: u16 = 10;
pub const DEFAULT_TX_POWER_DBM: i8 = 14;
pub const DEFAULT_RESET_PIN: u8 = 22;
pub const DEFAULT_SPI_CLOCK_HZ: u32 = 4_000_000;

#[derive(Args, Clone, Debug, PartialEq)]
pub struct RadioConfig {
	/// Carrier frequency in Hz
	#[arg(long, default_value_t = DEFAULT_FREQUENCY_HZ)]
	pub frequency: u32,

	/// Spreading factor 6-12
	#[arg(long, default_value_t = DEFAULT_SPREADING_FACTOR)]
	pub spreading_factor: u8,

	/// Bandwidth in Hz
	#[arg(long, default_value_t = DEFAULT_BANDWIDTH_HZ)]
	pub bandwidth: u32,

	/// Coding rate denominator 5-8, where 7 means 4/7
	#[arg(long, default_value_t = DEFAULT_CODING_RATE)]
	pub coding_rate: u8,

	/// Sync word, decimal or 0x-prefixed hex
	#[arg(long, default_value = "0x12", value_parser = parse_byte)]
	pub sync_word: u8,

	/// Preamble length in symbols
	#[arg(long, default_value_t = DEFAULT_PREAMBLE_LENGTH)]
	pub preamble_length: u16,

	/// Transmit power in dBm on PA_BOOST. Unused while receiving but programmed anyway.
	#[arg(long, default_value_t = DEFAULT_TX_POWER_DBM)]
	pub tx_power: i8,

	/// Use the LNA boost instead of power saving gain
	#[arg(long)]
	pub boosted_gain: bool,
}

impl Default for RadioConfig {
	fn default() -> Self {
		RadioConfig {
			frequency: DEFAULT_FREQUENCY_HZ,
			spreading_factor: DEFAULT_SPREADING_FACTOR,
			bandwidth: DEFAULT_BANDWIDTH_HZ,
			coding_rate: DEFAULT_CODING_RATE,
			sync_word: DEFAULT_SYNC_WORD,
			preamble_length: DEFAULT_PREAMBLE_LENGTH,
			tx_power: DEFAULT_TX_POWER_DBM,
			boosted_gain: false,
		}
	}
}

impl RadioConfig {
	pub fn modulation(&self) -> Result<LoraModulation> {
		Ok(LoraModulation::new(
			SpreadingFactor::try_from(self.spreading_factor)?,
			Bandwidth::try_from(self.bandwidth)?,
			CodingRate::try_from(self.coding_rate)?,
		))
	}

	/// Explicit header, CRC on, up to 255 bytes
	pub fn packet_params(&self) -> LoraPacketParams {
		LoraPacketParams {
			preamble_length: self.preamble_length,
			..LoraPacketParams::default()
		}
	}

	pub fn rx_gain_mode(&self) -> RxGainMode {
		if self.boosted_gain {
			RxGainMode::Boosted
		} else {
			RxGainMode::PowerSaving
		}
	}

	/// Check every value before touching the hardware
	pub fn validate(&self) -> Result<()> {
		self.modulation()?;
		crate::modulation::frequency_to_frf(self.frequency)?;
		crate::modulation::pa_config(self.tx_power, PaOutput::Boost)?;
		if self.preamble_length < 6 {
			return Err(RadioError::InvalidParameter(format!(
				"preamble length {} below the 6 symbol minimum",
				self.preamble_length
			)));
		}
		Ok(())
	}

	/// Program a freshly begun radio with this configuration
	pub fn apply(&self, radio: &mut SX1276) -> Result<()> {
		self.validate()?;
		radio.set_frequency(self.frequency)?;
		radio.set_tx_power(self.tx_power, PaOutput::Boost)?;
		radio.set_rx_gain(self.rx_gain_mode(), LnaGain::Auto)?;
		radio.set_lora_packet(&self.packet_params())?;
		radio.set_lora_modulation(&self.modulation()?)?;
		radio.set_sync_word(self.sync_word)?;
		info!("Radio configured: {:?}", self);
		Ok(())
	}

	/// Startup summary printed once the radio is configured
	pub fn banner(&self) -> String {
		format!(
			"  Frequency: {:.1} MHz\n  Spreading Factor: {}\n  Bandwidth: {} Hz\n  Coding Rate: {} (4/{})\n  Sync Word: 0x{:02X}\n  Preamble Length: {} symbols",
			self.frequency as f64 / 1e6,
			self.spreading_factor,
			self.bandwidth,
			self.coding_rate,
			self.coding_rate,
			self.sync_word,
			self.preamble_length
		)
	}
}

/// How the module is wired to the Pi. Pin numbers are BCM.
#[derive(Args, Clone, Debug, PartialEq)]
pub struct PinConfig {
	/// RESET pin
	#[arg(long, default_value_t = DEFAULT_RESET_PIN)]
	pub reset_pin: u8,

	/// DIO0 interrupt pin. Without it the IRQ register is polled over SPI.
	#[arg(long)]
	pub irq_pin: Option<u8>,

	/// Chip select driven as GPIO, when not using the SPI controller's CE lines
	#[arg(long)]
	pub cs_pin: Option<u8>,

	/// SPI bus number
	#[arg(long, default_value_t = 0)]
	pub spi_bus: u8,

	/// Hardware chip enable line (CE0/CE1/CE2)
	#[arg(long, default_value_t = 0)]
	pub slave_select: u8,

	/// SPI clock in Hz
	#[arg(long, default_value_t = DEFAULT_SPI_CLOCK_HZ)]
	pub spi_clock: u32,
}

impl Default for PinConfig {
	fn default() -> Self {
		PinConfig {
			reset_pin: DEFAULT_RESET_PIN,
			irq_pin: None,
			cs_pin: None,
			spi_bus: 0,
			slave_select: 0,
			spi_clock: DEFAULT_SPI_CLOCK_HZ,
		}
	}
}

impl PinConfig {
	fn bus(&self) -> Result<Bus> {
		Ok(match self.spi_bus {
			0 => Bus::Spi0,
			1 => Bus::Spi1,
			2 => Bus::Spi2,
			n => return Err(RadioError::InvalidParameter(format!("unsupported SPI bus {}", n))),
		})
	}

	fn chip_enable(&self) -> Result<SlaveSelect> {
		Ok(match self.slave_select {
			0 => SlaveSelect::Ss0,
			1 => SlaveSelect::Ss1,
			2 => SlaveSelect::Ss2,
			n => return Err(RadioError::InvalidParameter(format!("unsupported slave select {}", n))),
		})
	}

	/// Open the SPI device and GPIO pins. The radio still needs `begin()`.
	pub fn open(&self) -> Result<SX1276> {
		let spi = Spi::new(self.bus()?, self.chip_enable()?, self.spi_clock, Mode::Mode0)?;
		SX1276::new(spi, self.reset_pin, self.irq_pin, self.cs_pin)
	}
}

/// Parse `18`, `0x12` or `0X12`
pub fn parse_byte(s: &str) -> std::result::Result<u8, String> {
	let s = s.trim();
	let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
		Some(hex) => u8::from_str_radix(hex, 16),
		None => s.parse::<u8>(),
	};
	parsed.map_err(|e| format!("invalid byte '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::Parser;

	#[derive(Parser)]
	struct TestCli {
		#[command(flatten)]
		radio: RadioConfig,
		#[command(flatten)]
		pins: PinConfig,
	}

	#[test]
	fn cli_defaults_match_default_impls() {
		let cli = TestCli::parse_from(["test"]);
		assert_eq!(cli.radio, RadioConfig::default());
		assert_eq!(cli.pins, PinConfig::default());
	}

	#[test]
	fn cli_overrides() {
		let cli = TestCli::parse_from([
			"test",
			"--frequency",
			"868100000",
			"--spreading-factor",
			"12",
			"--sync-word",
			"0x34",
			"--irq-pin",
			"25",
			"--boosted-gain",
		]);
		assert_eq!(cli.radio.frequency, 868_100_000);
		assert_eq!(cli.radio.spreading_factor, 12);
		assert_eq!(cli.radio.sync_word, 0x34);
		assert_eq!(cli.radio.rx_gain_mode(), RxGainMode::Boosted);
		assert_eq!(cli.pins.irq_pin, Some(25));
		assert!(cli.radio.modulation().unwrap().low_data_rate_optimize());
	}

	#[test]
	fn sync_word_parsing() {
		assert_eq!(parse_byte("0x12"), Ok(0x12));
		assert_eq!(parse_byte("0X34"), Ok(0x34));
		assert_eq!(parse_byte("18"), Ok(18));
		assert!(parse_byte("0x1234").is_err());
		assert!(parse_byte("sync").is_err());
	}

	#[test]
	fn validation_rejects_mismatched_values() {
		assert!(RadioConfig::default().validate().is_ok());
		assert!(RadioConfig { spreading_factor: 13, ..RadioConfig::default() }.validate().is_err());
		assert!(RadioConfig { bandwidth: 100_000, ..RadioConfig::default() }.validate().is_err());
		assert!(RadioConfig { coding_rate: 9, ..RadioConfig::default() }.validate().is_err());
		assert!(RadioConfig { preamble_length: 4, ..RadioConfig::default() }.validate().is_err());
	}

	#[test]
	fn default_modulation_and_packet() {
		let config = RadioConfig::default();
		let modulation = config.modulation().unwrap();
		assert_eq!(modulation.spreading_factor, SpreadingFactor::SF9);
		assert_eq!(modulation.coding_rate, CodingRate::CR4_7);
		assert!(!modulation.low_data_rate_optimize());
		assert_eq!(config.packet_params().preamble_length, 10);
		assert!(config.packet_params().crc);
	}

	#[test]
	fn banner_text() {
		assert_eq!(
			RadioConfig::default().banner(),
			"  Frequency: 915.0 MHz\n  Spreading Factor: 9\n  Bandwidth: 125000 Hz\n  Coding Rate: 7 (4/7)\n  Sync Word: 0x12\n  Preamble Length: 10 symbols"
		);
	}
}
