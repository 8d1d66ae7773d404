//! LoRa modulation and packet parameters, with their SX1276 register encodings.
//!
//! Both ends of a link must agree on frequency, spreading factor, bandwidth,
//! coding rate, sync word and preamble length, so every value here is typed and
//! range checked before it reaches a register.

use std::fmt;
use std::time::Duration;

use crate::error::{RadioError, Result};

/// Crystal oscillator frequency of the SX1276 reference design
pub const XTAL_HZ: u64 = 32_000_000;

/// Symbols longer than this need low data rate optimisation (datasheet 4.1.1.6)
const LDRO_SYMBOL_THRESHOLD: Duration = Duration::from_millis(16);

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SpreadingFactor {
	SF6 = 6,
	SF7 = 7,
	SF8 = 8,
	SF9 = 9,
	SF10 = 10,
	SF11 = 11,
	SF12 = 12,
}

impl SpreadingFactor {
	pub fn value(&self) -> u8 {
		*self as u8
	}

	/// SpreadingFactor field of RegModemConfig2 (bits 7..4)
	pub(crate) fn modem_config_2_bits(&self) -> u8 {
		self.value() << 4
	}
}

impl TryFrom<u8> for SpreadingFactor {
	type Error = RadioError;

	fn try_from(sf: u8) -> Result<Self> {
		Ok(match sf {
			6 => SpreadingFactor::SF6,
			7 => SpreadingFactor::SF7,
			8 => SpreadingFactor::SF8,
			9 => SpreadingFactor::SF9,
			10 => SpreadingFactor::SF10,
			11 => SpreadingFactor::SF11,
			12 => SpreadingFactor::SF12,
			_ => return Err(RadioError::InvalidParameter(format!("spreading factor {} not in 6..=12", sf))),
		})
	}
}

#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Bandwidth {
	BW7_8,
	BW10_4,
	BW15_6,
	BW20_8,
	BW31_25,
	BW41_7,
	BW62_5,
	BW125,
	BW250,
	BW500,
}

impl Bandwidth {
	pub fn hz(&self) -> u32 {
		match self {
			Bandwidth::BW7_8 => 7_800,
			Bandwidth::BW10_4 => 10_400,
			Bandwidth::BW15_6 => 15_600,
			Bandwidth::BW20_8 => 20_800,
			Bandwidth::BW31_25 => 31_250,
			Bandwidth::BW41_7 => 41_700,
			Bandwidth::BW62_5 => 62_500,
			Bandwidth::BW125 => 125_000,
			Bandwidth::BW250 => 250_000,
			Bandwidth::BW500 => 500_000,
		}
	}

	/// Bw field of RegModemConfig1 (bits 7..4), see p. 106 of the data sheet
	pub(crate) fn modem_config_1_bits(&self) -> u8 {
		let index: u8 = match self {
			Bandwidth::BW7_8 => 0,
			Bandwidth::BW10_4 => 1,
			Bandwidth::BW15_6 => 2,
			Bandwidth::BW20_8 => 3,
			Bandwidth::BW31_25 => 4,
			Bandwidth::BW41_7 => 5,
			Bandwidth::BW62_5 => 6,
			Bandwidth::BW125 => 7,
			Bandwidth::BW250 => 8,
			Bandwidth::BW500 => 9,
		};
		index << 4
	}
}

impl TryFrom<u32> for Bandwidth {
	type Error = RadioError;

	fn try_from(hz: u32) -> Result<Self> {
		Ok(match hz {
			7_800 => Bandwidth::BW7_8,
			10_400 => Bandwidth::BW10_4,
			15_600 => Bandwidth::BW15_6,
			20_800 => Bandwidth::BW20_8,
			31_250 => Bandwidth::BW31_25,
			41_700 => Bandwidth::BW41_7,
			62_500 => Bandwidth::BW62_5,
			125_000 => Bandwidth::BW125,
			250_000 => Bandwidth::BW250,
			500_000 => Bandwidth::BW500,
			_ => return Err(RadioError::InvalidParameter(format!("unsupported bandwidth {} Hz", hz))),
		})
	}
}

/// Forward error correction rate 4/5 .. 4/8
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CodingRate {
	CR4_5,
	CR4_6,
	CR4_7,
	CR4_8,
}

impl CodingRate {
	/// Denominator of the 4/x ratio
	pub fn denominator(&self) -> u8 {
		match self {
			CodingRate::CR4_5 => 5,
			CodingRate::CR4_6 => 6,
			CodingRate::CR4_7 => 7,
			CodingRate::CR4_8 => 8,
		}
	}

	/// CodingRate field of RegModemConfig1 (bits 3..1)
	pub(crate) fn modem_config_1_bits(&self) -> u8 {
		(self.denominator() - 4) << 1
	}
}

impl TryFrom<u8> for CodingRate {
	type Error = RadioError;

	fn try_from(denominator: u8) -> Result<Self> {
		Ok(match denominator {
			5 => CodingRate::CR4_5,
			6 => CodingRate::CR4_6,
			7 => CodingRate::CR4_7,
			8 => CodingRate::CR4_8,
			_ => return Err(RadioError::InvalidParameter(format!("coding rate 4/{} not in 4/5..=4/8", denominator))),
		})
	}
}

impl fmt::Display for CodingRate {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "4/{}", self.denominator())
	}
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HeaderMode {
	/// Length, coding rate and CRC presence travel in the packet header
	Explicit,
	Implicit,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LoraModulation {
	pub spreading_factor: SpreadingFactor,
	pub bandwidth: Bandwidth,
	pub coding_rate: CodingRate,
	/// `None` picks the setting from the symbol duration
	pub low_data_rate_optimize: Option<bool>,
}

impl LoraModulation {
	pub fn new(spreading_factor: SpreadingFactor, bandwidth: Bandwidth, coding_rate: CodingRate) -> LoraModulation {
		LoraModulation {
			spreading_factor,
			bandwidth,
			coding_rate,
			low_data_rate_optimize: None,
		}
	}

	/// Time on air of a single chirp: 2^SF / BW
	pub fn symbol_duration(&self) -> Duration {
		let chips = (1u64 << self.spreading_factor.value()) as f64;
		Duration::from_secs_f64(chips / self.bandwidth.hz() as f64)
	}

	pub fn low_data_rate_optimize(&self) -> bool {
		self.low_data_rate_optimize
			.unwrap_or_else(|| self.symbol_duration() > LDRO_SYMBOL_THRESHOLD)
	}
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LoraPacketParams {
	pub header: HeaderMode,
	pub preamble_length: u16,
	/// Expected length in implicit mode, upper bound in explicit mode
	pub payload_length: u8,
	pub crc: bool,
	pub invert_iq: bool,
}

impl Default for LoraPacketParams {
	fn default() -> Self {
		LoraPacketParams {
			header: HeaderMode::Explicit,
			preamble_length: 10,
			payload_length: 255,
			crc: true,
			invert_iq: false,
		}
	}
}

/// Which PA output pin drives the antenna
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PaOutput {
	/// RFO pin, 0..=14 dBm
	Rfo,
	/// PA_BOOST pin, 2..=17 dBm. HopeRF/Adafruit modules only wire this one.
	Boost,
}

/// RegPaConfig value for the requested output power
pub fn pa_config(power_dbm: i8, output: PaOutput) -> Result<u8> {
	match output {
		PaOutput::Boost if (2..=17).contains(&power_dbm) => Ok(0x80 | 0x70 | (power_dbm - 2) as u8),
		// MaxPower = 7 gives Pmax = 15 dBm, so OutputPower maps 1:1 to dBm
		PaOutput::Rfo if (0..=14).contains(&power_dbm) => Ok(0x70 | power_dbm as u8),
		_ => Err(RadioError::InvalidParameter(format!("tx power {} dBm out of range for {:?}", power_dbm, output))),
	}
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LnaGain {
	/// Gain picked by the AGC loop
	Auto,
	G1,
	G2,
	G3,
	G4,
	G5,
	G6,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RxGainMode {
	PowerSaving,
	/// LNA boost on the HF port (150% LNA current)
	Boosted,
}

/// RegLna value. AGC itself is switched in RegModemConfig3.
pub(crate) fn lna_config(gain: LnaGain, mode: RxGainMode) -> u8 {
	let gain_bits: u8 = match gain {
		LnaGain::Auto | LnaGain::G1 => 1,
		LnaGain::G2 => 2,
		LnaGain::G3 => 3,
		LnaGain::G4 => 4,
		LnaGain::G5 => 5,
		LnaGain::G6 => 6,
	};
	let boost_bits = match mode {
		RxGainMode::PowerSaving => 0b00,
		RxGainMode::Boosted => 0b11,
	};
	(gain_bits << 5) | boost_bits
}

/// Carrier frequency as the 24 bit FRF register value: Frf = F * 2^19 / Fxosc
pub fn frequency_to_frf(frequency_hz: u32) -> Result<[u8; 3]> {
	if !(137_000_000..=1_020_000_000).contains(&frequency_hz) {
		return Err(RadioError::InvalidParameter(format!("frequency {} Hz outside 137..1020 MHz", frequency_hz)));
	}
	let frf = ((frequency_hz as u64) << 19) / XTAL_HZ;
	Ok([(frf >> 16) as u8, (frf >> 8) as u8, frf as u8])
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn frf_matches_datasheet_step() {
		assert_eq!(frequency_to_frf(915_000_000).unwrap(), [0xE4, 0xC0, 0x00]);
		assert_eq!(frequency_to_frf(868_100_000).unwrap(), [0xD9, 0x06, 0x66]);
		assert_eq!(frequency_to_frf(433_000_000).unwrap(), [0x6C, 0x40, 0x00]);
	}

	#[test]
	fn frf_rejects_out_of_band() {
		assert!(frequency_to_frf(100_000_000).is_err());
		assert!(frequency_to_frf(2_400_000_000).is_err());
	}

	#[test]
	fn parameters_parse_from_plain_numbers() {
		assert_eq!(SpreadingFactor::try_from(9).unwrap(), SpreadingFactor::SF9);
		assert!(SpreadingFactor::try_from(5).is_err());
		assert_eq!(Bandwidth::try_from(125_000).unwrap(), Bandwidth::BW125);
		assert!(Bandwidth::try_from(125_001).is_err());
		assert_eq!(CodingRate::try_from(7).unwrap(), CodingRate::CR4_7);
		assert!(CodingRate::try_from(4).is_err());
		assert_eq!(CodingRate::CR4_7.to_string(), "4/7");
	}

	#[test]
	fn register_fields() {
		assert_eq!(SpreadingFactor::SF9.modem_config_2_bits(), 0x90);
		assert_eq!(Bandwidth::BW125.modem_config_1_bits(), 0x70);
		assert_eq!(Bandwidth::BW500.modem_config_1_bits(), 0x90);
		assert_eq!(CodingRate::CR4_5.modem_config_1_bits(), 0b0010);
		assert_eq!(CodingRate::CR4_7.modem_config_1_bits(), 0b0110);
		assert_eq!(CodingRate::CR4_8.modem_config_1_bits(), 0b1000);
	}

	#[test]
	fn ldro_follows_symbol_duration() {
		let sf9 = LoraModulation::new(SpreadingFactor::SF9, Bandwidth::BW125, CodingRate::CR4_7);
		assert!(!sf9.low_data_rate_optimize());

		let sf11 = LoraModulation::new(SpreadingFactor::SF11, Bandwidth::BW125, CodingRate::CR4_7);
		assert!(sf11.low_data_rate_optimize());

		// SF12 at 500 kHz is 8 ms per symbol
		let fast = LoraModulation::new(SpreadingFactor::SF12, Bandwidth::BW500, CodingRate::CR4_5);
		assert!(!fast.low_data_rate_optimize());

		let forced = LoraModulation { low_data_rate_optimize: Some(true), ..sf9 };
		assert!(forced.low_data_rate_optimize());
	}

	#[test]
	fn pa_and_lna_values() {
		assert_eq!(pa_config(14, PaOutput::Boost).unwrap(), 0xFC);
		assert_eq!(pa_config(17, PaOutput::Boost).unwrap(), 0xFF);
		assert_eq!(pa_config(14, PaOutput::Rfo).unwrap(), 0x7E);
		assert!(pa_config(20, PaOutput::Boost).is_err());
		assert_eq!(lna_config(LnaGain::Auto, RxGainMode::PowerSaving), 0x20);
		assert_eq!(lna_config(LnaGain::G1, RxGainMode::Boosted), 0x23);
	}
}
