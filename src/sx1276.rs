use chrono::Utc;
use log::{debug, info, warn};
use rppal::gpio::{Gpio, InputPin, OutputPin, Trigger};
use rppal::spi::{Segment, Spi};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{RadioError, Result};
use crate::modulation::{
	frequency_to_frf, lna_config, pa_config, HeaderMode, LnaGain, LoraModulation, LoraPacketParams, PaOutput,
	RxGainMode, SpreadingFactor,
};
use crate::packet::{PacketStatus, ReceivedPacket};

#[allow(dead_code)]
#[derive(Copy, Clone, Debug)]
#[repr(u8)]
enum Register {
	/** Taken from the LoRa register map (6.4, p. 102) in the SX1276 data sheet. Only accessible in LoRa mode */
	FIFO = 0x00,
	OpMode = 0x01,
	/* 0x02 - 0x05 FSK only */
	FRFMSB = 0x06,
	FRFMID = 0x07,
	FRFLSB = 0x08,
	PAConfig = 0x09,
	PARamp = 0x0A,
	OverCurrentProtection = 0x0B,
	LNA = 0x0C,
	FIFOAddressPointer = 0x0D,
	FIFOTXBaseAddress = 0x0E,
	FIFORXBaseAddress = 0x0F,
	FIFORXCurrent = 0x10,
	IRQFlagsMask = 0x11,
	IRQFlags = 0x12,
	ReceiveNumberOfBytes = 0x13, // Number of payload bytes of latest packet received
	ReceiveValidHeaderCountMSB = 0x14,
	ReceiveValidHeaderCountLSB = 0x15,
	ReceiveValidPacketCountMSB = 0x16,
	ReceiveValidPacketCountLSB = 0x17,
	ModemStatus = 0x18,
	LastSNRValue = 0x19, // Estimation of SNR on last packet received. In two's complement format multiplied by 4.
	LastRSSIValue = 0x1A, // RSSI of the latest packet received
	RSSIValue = 0x1B, // Current RSSI value
	HopChannel = 0x1C,
	ModemConfig1 = 0x1D,
	ModemConfig2 = 0x1E,
	SymbolTimeoutLSB = 0x1F,
	PreambleLengthMSB = 0x20,
	PreambleLengthLSB = 0x21,
	PayloadLength = 0x22, // Needs to be set in implicit header mode for the expected packet length. A 0 value is not permitted
	MaxPayloadLength = 0x23, // If header payload length exceeds value a header CRC error is generated
	HopPeriod = 0x24,
	FIFOReceiveAddress = 0x25,
	ModemConfig3 = 0x26,
	DetectionOptimize = 0x31,
	InvertIQ = 0x33,
	DetectionThreshold = 0x37,
	SyncWord = 0x39,
	InvertIQ2 = 0x3B,

	/** Taken from Table 85, available in either mode */
	DIOMapping1 = 0x40,
	DIOMapping2 = 0x41,
	Version = 0x42,
}

bitflags! {
	#[derive(Copy, Clone, Debug, PartialEq, Eq)]
	struct Mode: u8 {
		// See p. 102, RegOpMode
		const SLEEP = 0b000;
		const STANDBY = 0b001;
		const FREQUENCY_SYNTHESIS_TRANSMIT = 0b010;
		const TRANSMIT = 0b011;
		const FREQUENCY_SYNTHESIS_RECEIVE = 0b100;
		const RECEIVE_CONTINUOUS = 0b101;
		const RECEIVE_SINGLE = 0b110;
		const CHANNEL_ACTIVITY_DETECTION = 0b111;

		const LORA = 0b1000_0000;
		const ACCESS_SHARED_REGISTERS = 0b0100_0000;
		const RESERVED_5 = 0b0010_0000;
		const RESERVED_4 = 0b0001_0000;
		const LOW_FREQUENCY_MODE = 0b0000_1000;
	}
}

bitflags! {
	#[derive(Copy, Clone, Debug, PartialEq, Eq)]
	struct ModemConfig1Flags: u8 {
		const IMPLICIT_HEADER_MODE_ON = 0b0000_0001;
	}
}

bitflags! {
	#[derive(Copy, Clone, Debug, PartialEq, Eq)]
	struct ModemConfig2Flags: u8 {
		const TX_CONTINOUS_MODE_ON = 0b0000_1000;
		const RX_PAYLOAD_CRC_ON = 0b0000_0100;
	}
}

bitflags! {
	#[derive(Copy, Clone, Debug, PartialEq, Eq)]
	struct ModemConfig3Flags: u8 {
		const LOW_DATA_RATE_OPTIMIZE = 0b0000_1000;
		const AUTO_AGC_ON = 0b0000_0100;
	}
}

bitflags! {
	#[derive(Copy, Clone, Debug, PartialEq, Eq)]
	struct IRQFlags: u8 {
		const CHANNEL_ACTIVITY_DETECTED = 0b0000_0001;
		const FHSS_CHANGE_CHANNEL = 0b0000_0010;
		const CHANNEL_ACTIVITY_DETECTION_DONE = 0b0000_0100;
		const TRANSMIT_DONE = 0b0000_1000;
		const VALID_HEADER_RECEIVED = 0b0001_0000;
		const PAYLOAD_CRC_ERROR = 0b0010_0000;
		const RECEIVE_DONE = 0b0100_0000;
		const RECEIVE_TIMEOUT = 0b1000_0000;
	}
}

/// Silicon revision reported by RegVersion on the SX1276/77/78/79 and RFM95/96/98
pub const SX1276_VERSION: u8 = 0x12;

/// Default LoRa sync word used by RadioLib and LoRaRF (0x34 is reserved for LoRaWAN)
pub const DEFAULT_SYNC_WORD: u8 = 0x12;

/// Below this the LF port is in use (bands 2 and 3)
const LOW_FREQUENCY_LIMIT_HZ: u32 = 525_000_000;
const RSSI_OFFSET_HF: f32 = -157.0;
const RSSI_OFFSET_LF: f32 = -164.0;

/// Longest time `wait` sleeps between two reads of RegIrqFlags
const IRQ_POLL_INTERVAL: Duration = Duration::from_millis(100);
const NO_IRQ_POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RxMode {
	/// Stay in receive mode after each packet
	Continuous,
	/// Return to standby after one packet or a symbol timeout
	Single,
}

pub struct SX1276 {
	spi: Spi,
	irq_pin: Option<InputPin>,
	cs_pin: Option<OutputPin>,
	reset_bcm_pin: u8,
	reset_pin: Option<InputPin>,
	frequency_hz: u32,
	header: HeaderMode,
	listening: Option<RxMode>,
}

struct ChipSelected<'a> {
	cs_pin: Option<&'a mut OutputPin>,
}

impl SX1276 {
	/// `irq_bcm_pin` is the pin wired to DIO0. Without it, `wait` polls RegIrqFlags over SPI.
	/// `cs_bcm_pin` is only needed when chip select is not driven by the SPI controller.
	pub fn new(spi: Spi, reset_bcm_pin: u8, irq_bcm_pin: Option<u8>, cs_bcm_pin: Option<u8>) -> Result<SX1276> {
		let gpio = Gpio::new()?;
		let irq_pin = match irq_bcm_pin {
			Some(pin) => {
				let mut irq_pin = gpio.get(pin)?.into_input();
				irq_pin.set_interrupt(Trigger::RisingEdge)?;
				Some(irq_pin)
			}
			None => None,
		};
		let cs_pin = match cs_bcm_pin {
			Some(pin) => {
				let mut p = gpio.get(pin)?.into_output();
				p.set_high();
				Some(p)
			}
			None => None,
		};
		Ok(SX1276 {
			spi,
			irq_pin,
			cs_pin,
			reset_bcm_pin,
			reset_pin: None,
			frequency_hz: 0,
			header: HeaderMode::Explicit,
			listening: None,
		})
	}

	/** Set mode of the SX1276 chip and verify it was set correctly */
	fn set_mode(&mut self, mode: Mode) -> Result<()> {
		let mode = if self.frequency_hz != 0 && self.frequency_hz < LOW_FREQUENCY_LIMIT_HZ {
			mode | Mode::LOW_FREQUENCY_MODE
		} else {
			mode
		};
		let old_mode = self.read_register(Register::OpMode)?;

		// No need to change modes if the last mode is equal to the current one
		if old_mode == mode.bits() {
			return Ok(());
		}
		debug!("Set mode {:?} => {:?}", Mode::from_bits_retain(old_mode), mode);
		self.write_register(Register::OpMode, mode.bits())?;
		thread::sleep(Duration::from_millis(10));

		// Check the correct mode was set
		let set_mode = self.read_register(Register::OpMode)?;
		if set_mode != mode.bits() {
			return Err(RadioError::ModeChangeFailed {
				old: old_mode,
				requested: mode.bits(),
				found: set_mode,
			});
		}
		Ok(())
	}

	/// Pulse the reset line. The pin is driven low and then released as a pull-up input, which the
	/// module's own pull-up expects.
	pub fn reset(&mut self) -> Result<()> {
		self.reset_pin = None;
		self.listening = None;
		{
			let mut pin = Gpio::new()?.get(self.reset_bcm_pin)?.into_output();
			pin.set_low();
			thread::sleep(Duration::from_millis(1));
		}
		let in_pin = Gpio::new()?.get(self.reset_bcm_pin)?.into_input_pullup();
		thread::sleep(Duration::from_millis(10));
		self.reset_pin = Some(in_pin);
		Ok(())
	}

	/// Reset the chip, check it is an SX1276 and put it in LoRa standby mode
	pub fn begin(&mut self) -> Result<()> {
		self.reset()?;

		let version = self.version()?;
		if version != SX1276_VERSION {
			return Err(RadioError::InvalidVersion {
				expected: SX1276_VERSION,
				found: version,
			});
		}

		self.set_mode(Mode::SLEEP)?;

		// LongRangeMode can only be changed in sleep
		self.set_mode(Mode::SLEEP | Mode::LORA)?;

		// Whole FIFO for reception
		self.write_register(Register::FIFOTXBaseAddress, 0x80)?;
		self.write_register(Register::FIFORXBaseAddress, 0x00)?;

		self.set_mode(Mode::LORA | Mode::STANDBY)?;
		info!("SX1276 version 0x{:02x} ready in LoRa mode", version);
		Ok(())
	}

	pub fn sleep(&mut self) -> Result<()> {
		self.listening = None;
		self.set_mode(Mode::LORA | Mode::SLEEP)
	}

	pub fn standby(&mut self) -> Result<()> {
		self.listening = None;
		self.set_mode(Mode::LORA | Mode::STANDBY)
	}

	fn read_register(&mut self, register: Register) -> Result<u8> {
		let cmd = (register as u8) & 0x7F;
		let mut buffer = [0u8; 1];
		let _cs = ChipSelected::new(self.cs_pin.as_mut());
		self.spi
			.transfer_segments(&[Segment::with_write(&[cmd]), Segment::with_read(&mut buffer)])?;
		Ok(buffer[0])
	}

	fn write_register(&mut self, register: Register, value: u8) -> Result<()> {
		let cmd = (register as u8) | 0x80;
		let _cs = ChipSelected::new(self.cs_pin.as_mut());
		self.spi.transfer_segments(&[Segment::with_write(&[cmd, value])])?;
		Ok(())
	}

	/// Burst read from RegFifo starting at the current FIFO address pointer
	fn read_fifo(&mut self, len: usize) -> Result<Vec<u8>> {
		let cmd = (Register::FIFO as u8) & 0x7F;
		let mut buffer = vec![0u8; len];
		if len == 0 {
			return Ok(buffer);
		}
		let _cs = ChipSelected::new(self.cs_pin.as_mut());
		self.spi
			.transfer_segments(&[Segment::with_write(&[cmd]), Segment::with_read(&mut buffer)])?;
		Ok(buffer)
	}

	fn irq_flags(&mut self) -> Result<IRQFlags> {
		Ok(IRQFlags::from_bits_retain(self.read_register(Register::IRQFlags)?))
	}

	fn clear_irq_flags(&mut self) -> Result<()> {
		self.write_register(Register::IRQFlags, 0xFF)
	}

	pub fn set_frequency(&mut self, frequency_hz: u32) -> Result<()> {
		let frf = frequency_to_frf(frequency_hz)?;
		self.write_register(Register::FRFMSB, frf[0])?;
		self.write_register(Register::FRFMID, frf[1])?;
		self.write_register(Register::FRFLSB, frf[2])?;
		self.frequency_hz = frequency_hz;
		debug!("Frequency set to {} Hz {:02x?}", frequency_hz, frf);
		Ok(())
	}

	pub fn set_tx_power(&mut self, power_dbm: i8, output: PaOutput) -> Result<()> {
		let value = pa_config(power_dbm, output)?;
		self.write_register(Register::PAConfig, value)?;
		debug!("PA config 0x{:02x} ({} dBm on {:?})", value, power_dbm, output);
		Ok(())
	}

	pub fn set_rx_gain(&mut self, mode: RxGainMode, gain: LnaGain) -> Result<()> {
		self.write_register(Register::LNA, lna_config(gain, mode))?;
		let mut modem_config_3 = ModemConfig3Flags::from_bits_retain(self.read_register(Register::ModemConfig3)?);
		modem_config_3.set(ModemConfig3Flags::AUTO_AGC_ON, gain == LnaGain::Auto);
		self.write_register(Register::ModemConfig3, modem_config_3.bits())?;
		Ok(())
	}

	pub fn set_lora_modulation(&mut self, modulation: &LoraModulation) -> Result<()> {
		let sf = modulation.spreading_factor;
		if sf == SpreadingFactor::SF6 && self.header == HeaderMode::Explicit {
			return Err(RadioError::InvalidParameter(String::from("SF6 requires implicit header mode")));
		}

		// Keep the header mode bit, replace bandwidth and coding rate
		let old = self.read_register(Register::ModemConfig1)?;
		let modem_config_1 = (old & ModemConfig1Flags::IMPLICIT_HEADER_MODE_ON.bits())
			| modulation.bandwidth.modem_config_1_bits()
			| modulation.coding_rate.modem_config_1_bits();
		self.write_register(Register::ModemConfig1, modem_config_1)?;

		// Keep TxContinuousMode, RxPayloadCrcOn and SymbTimeout(9:8)
		let old = self.read_register(Register::ModemConfig2)?;
		self.write_register(Register::ModemConfig2, (old & 0x0F) | sf.modem_config_2_bits())?;

		let mut modem_config_3 = ModemConfig3Flags::from_bits_retain(self.read_register(Register::ModemConfig3)?);
		modem_config_3.set(ModemConfig3Flags::LOW_DATA_RATE_OPTIMIZE, modulation.low_data_rate_optimize());
		self.write_register(Register::ModemConfig3, modem_config_3.bits())?;

		// Errata 2.3 / table 42: SF6 has its own detection settings
		let old = self.read_register(Register::DetectionOptimize)?;
		if sf == SpreadingFactor::SF6 {
			self.write_register(Register::DetectionOptimize, (old & 0xF8) | 0x05)?;
			self.write_register(Register::DetectionThreshold, 0x0C)?;
		} else {
			self.write_register(Register::DetectionOptimize, (old & 0xF8) | 0x03)?;
			self.write_register(Register::DetectionThreshold, 0x0A)?;
		}
		debug!(
			"Modulation {:?} {} Hz CR {} LDRO {}",
			sf,
			modulation.bandwidth.hz(),
			modulation.coding_rate,
			modulation.low_data_rate_optimize()
		);
		Ok(())
	}

	pub fn set_lora_packet(&mut self, params: &LoraPacketParams) -> Result<()> {
		if params.payload_length == 0 {
			return Err(RadioError::InvalidParameter(String::from("payload length must be at least 1")));
		}

		let mut modem_config_1 = ModemConfig1Flags::from_bits_retain(self.read_register(Register::ModemConfig1)?);
		modem_config_1.set(ModemConfig1Flags::IMPLICIT_HEADER_MODE_ON, params.header == HeaderMode::Implicit);
		self.write_register(Register::ModemConfig1, modem_config_1.bits())?;
		self.header = params.header;

		self.write_register(Register::PreambleLengthMSB, (params.preamble_length >> 8) as u8)?;
		self.write_register(Register::PreambleLengthLSB, params.preamble_length as u8)?;

		match params.header {
			HeaderMode::Implicit => self.write_register(Register::PayloadLength, params.payload_length)?,
			HeaderMode::Explicit => self.write_register(Register::MaxPayloadLength, params.payload_length)?,
		}

		let mut modem_config_2 = ModemConfig2Flags::from_bits_retain(self.read_register(Register::ModemConfig2)?);
		modem_config_2.set(ModemConfig2Flags::RX_PAYLOAD_CRC_ON, params.crc);
		self.write_register(Register::ModemConfig2, modem_config_2.bits())?;

		let old = self.read_register(Register::InvertIQ)?;
		if params.invert_iq {
			self.write_register(Register::InvertIQ, (old & 0xBE) | 0x40)?;
			self.write_register(Register::InvertIQ2, 0x19)?;
		} else {
			self.write_register(Register::InvertIQ, (old & 0xBE) | 0x01)?;
			self.write_register(Register::InvertIQ2, 0x1D)?;
		}
		Ok(())
	}

	pub fn set_sync_word(&mut self, sync_word: u8) -> Result<()> {
		self.write_register(Register::SyncWord, sync_word)
	}

	/// Start listening. DIO0 is mapped to RxDone.
	pub fn request(&mut self, mode: RxMode) -> Result<()> {
		self.set_mode(Mode::LORA | Mode::STANDBY)?;
		self.write_register(Register::DIOMapping1, 0x00)?;
		self.write_register(Register::FIFOAddressPointer, 0x00)?;
		self.clear_irq_flags()?;

		match mode {
			RxMode::Continuous => self.set_mode(Mode::LORA | Mode::RECEIVE_CONTINUOUS)?,
			RxMode::Single => self.set_mode(Mode::LORA | Mode::RECEIVE_SINGLE)?,
		}
		self.listening = Some(mode);
		Ok(())
	}

	/// Block until a packet has been received. Returns false on timeout, either the `timeout` given
	/// here or the chip's symbol timeout in single mode.
	pub fn wait(&mut self, timeout: Option<Duration>) -> Result<bool> {
		if self.listening.is_none() {
			return Err(RadioError::NotListening);
		}
		let deadline = timeout.map(|t| Instant::now() + t);

		loop {
			let flags = self.irq_flags()?;
			if flags.contains(IRQFlags::RECEIVE_DONE) {
				debug!("IRQ status: flags={:?}", flags);
				return Ok(true);
			}
			if flags.contains(IRQFlags::RECEIVE_TIMEOUT) {
				debug!("IRQ status: receive timeout");
				self.clear_irq_flags()?;
				self.listening = None;
				return Ok(false);
			}

			let remaining = match deadline {
				Some(deadline) => {
					let now = Instant::now();
					if now >= deadline {
						return Ok(false);
					}
					Some(deadline - now)
				}
				None => None,
			};

			match self.irq_pin.as_mut() {
				Some(pin) => {
					let interval = remaining.map_or(IRQ_POLL_INTERVAL, |r| r.min(IRQ_POLL_INTERVAL));
					pin.poll_interrupt(false, Some(interval))?;
				}
				None => {
					let interval = remaining.map_or(NO_IRQ_POLL_INTERVAL, |r| r.min(NO_IRQ_POLL_INTERVAL));
					thread::sleep(interval);
				}
			}
		}
	}

	/// Copy the last received packet out of the FIFO. The payload is empty when RxDone is not set.
	/// The IRQ flags are cleared even when the read fails, so DIO0 can rise again for the next packet.
	pub fn read_packet(&mut self) -> Result<ReceivedPacket> {
		let result = self.read_packet_registers();
		clear_flags_on_error(result, || self.clear_irq_flags())
	}

	fn read_packet_registers(&mut self) -> Result<ReceivedPacket> {
		let flags = self.irq_flags()?;
		if !flags.contains(IRQFlags::RECEIVE_DONE) {
			return Ok(ReceivedPacket {
				payload: Vec::new(),
				rssi: self.current_rssi()?,
				snr: 0.0,
				status: PacketStatus::Ok,
				received_at: Utc::now(),
			});
		}
		let status = packet_status(flags, self.header);

		let size = self.read_register(Register::ReceiveNumberOfBytes)?;
		let fifo_addr = self.read_register(Register::FIFORXCurrent)?;
		self.write_register(Register::FIFOAddressPointer, fifo_addr)?;
		let payload = self.read_fifo(size as usize)?;

		let snr = self.snr()?;
		let rssi = self.packet_rssi()?;
		self.clear_irq_flags()?;

		// Single mode falls back to standby by itself
		if self.listening == Some(RxMode::Single) {
			self.listening = None;
		}
		debug!("RX: {} bytes, RSSI={} SNR={} {:?}", size, rssi, snr, status);

		Ok(ReceivedPacket {
			payload,
			rssi,
			snr,
			status,
			received_at: Utc::now(),
		})
	}

	/// Listen continuously and block until the next packet arrives or `timeout` passes.
	/// Returns an empty packet on timeout.
	pub fn receive_packet(&mut self, timeout: Option<Duration>) -> Result<ReceivedPacket> {
		if self.listening != Some(RxMode::Continuous) {
			self.request(RxMode::Continuous)?;
		}
		self.wait(timeout)?;
		self.read_packet()
	}

	/// Call `callback` from rppal's interrupt thread on every DIO0 rising edge
	pub fn set_receive_callback<C>(&mut self, mut callback: C) -> Result<()>
	where
		C: FnMut() + Send + 'static,
	{
		let pin = self.irq_pin.as_mut().ok_or(RadioError::MissingIrqPin)?;
		pin.set_async_interrupt(Trigger::RisingEdge, move |_level| callback())?;
		Ok(())
	}

	/// Stop the callback and go back to blocking `wait` on DIO0
	pub fn clear_receive_callback(&mut self) -> Result<()> {
		let pin = self.irq_pin.as_mut().ok_or(RadioError::MissingIrqPin)?;
		pin.clear_async_interrupt()?;
		pin.set_interrupt(Trigger::RisingEdge)?;
		Ok(())
	}

	fn rssi_offset(&self) -> f32 {
		if self.frequency_hz != 0 && self.frequency_hz < LOW_FREQUENCY_LIMIT_HZ {
			RSSI_OFFSET_LF
		} else {
			RSSI_OFFSET_HF
		}
	}

	/// SNR of the last packet in dB
	pub fn snr(&mut self) -> Result<f32> {
		Ok(snr_from_register(self.read_register(Register::LastSNRValue)?))
	}

	/// RSSI of the last packet in dBm
	pub fn packet_rssi(&mut self) -> Result<f32> {
		let raw = self.read_register(Register::LastRSSIValue)?;
		let snr = self.snr()?;
		Ok(packet_rssi(self.rssi_offset(), raw, snr))
	}

	/// Current RSSI of the channel in dBm
	pub fn current_rssi(&mut self) -> Result<f32> {
		Ok(self.rssi_offset() + self.read_register(Register::RSSIValue)? as f32)
	}

	pub fn version(&mut self) -> Result<u8> {
		self.read_register(Register::Version)
	}
}

/// CRC errors take precedence. In explicit mode a packet without a valid header is a header error.
fn packet_status(flags: IRQFlags, header: HeaderMode) -> PacketStatus {
	if flags.contains(IRQFlags::PAYLOAD_CRC_ERROR) {
		PacketStatus::CrcError
	} else if header == HeaderMode::Explicit && !flags.contains(IRQFlags::VALID_HEADER_RECEIVED) {
		PacketStatus::HeaderError
	} else {
		PacketStatus::Ok
	}
}

fn clear_flags_on_error<T, F>(result: Result<T>, clear: F) -> Result<T>
where
	F: FnOnce() -> Result<()>,
{
	if result.is_err() {
		if let Err(e) = clear() {
			warn!("Clearing IRQ flags after failed read: {}", e);
		}
	}
	result
}

fn snr_from_register(raw: u8) -> f32 {
	(raw as i8) as f32 / 4.0
}

/// Below the noise floor the packet strength is corrected by the SNR (data sheet 5.5.5)
fn packet_rssi(offset: f32, raw: u8, snr: f32) -> f32 {
	let rssi = offset + raw as f32;
	if snr < 0.0 {
		rssi + snr
	} else {
		rssi
	}
}

impl<'a> ChipSelected<'a> {
	fn new(cs_pin: Option<&'a mut OutputPin>) -> ChipSelected<'a> {
		let cs_pin = cs_pin.map(|pin| {
			pin.set_low();
			pin
		});
		ChipSelected { cs_pin }
	}
}

impl Drop for ChipSelected<'_> {
	fn drop(&mut self) {
		if let Some(ref mut pin) = self.cs_pin {
			pin.set_high();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn snr_is_signed_quarter_db() {
		assert_eq!(snr_from_register(0x28), 10.0);
		assert_eq!(snr_from_register(0xF6), -2.5);
		assert_eq!(snr_from_register(0x00), 0.0);
	}

	#[test]
	fn rssi_uses_port_offset_and_negative_snr() {
		assert_eq!(packet_rssi(RSSI_OFFSET_HF, 60, 7.25), -97.0);
		assert_eq!(packet_rssi(RSSI_OFFSET_HF, 60, -4.0), -101.0);
		assert_eq!(packet_rssi(RSSI_OFFSET_LF, 60, 0.0), -104.0);
	}

	#[test]
	fn irq_flags_decode() {
		let flags = IRQFlags::from_bits_retain(0x70);
		assert!(flags.contains(IRQFlags::RECEIVE_DONE));
		assert!(flags.contains(IRQFlags::PAYLOAD_CRC_ERROR));
		assert!(flags.contains(IRQFlags::VALID_HEADER_RECEIVED));
		assert!(!flags.contains(IRQFlags::RECEIVE_TIMEOUT));
	}

	#[test]
	fn packet_status_from_flags() {
		let done = IRQFlags::RECEIVE_DONE | IRQFlags::VALID_HEADER_RECEIVED;
		assert_eq!(packet_status(done, HeaderMode::Explicit), PacketStatus::Ok);
		assert_eq!(
			packet_status(done | IRQFlags::PAYLOAD_CRC_ERROR, HeaderMode::Explicit),
			PacketStatus::CrcError
		);
		assert_eq!(
			packet_status(IRQFlags::RECEIVE_DONE | IRQFlags::PAYLOAD_CRC_ERROR, HeaderMode::Explicit),
			PacketStatus::CrcError
		);
		assert_eq!(packet_status(IRQFlags::RECEIVE_DONE, HeaderMode::Explicit), PacketStatus::HeaderError);
		assert_eq!(packet_status(IRQFlags::RECEIVE_DONE, HeaderMode::Implicit), PacketStatus::Ok);
	}

	#[test]
	fn failed_read_still_clears_flags() {
		let mut cleared = false;
		let result: Result<u8> = clear_flags_on_error(Err(RadioError::NotListening), || {
			cleared = true;
			Ok(())
		});
		assert!(result.is_err());
		assert!(cleared);

		let mut cleared = false;
		let result = clear_flags_on_error(Ok(7u8), || {
			cleared = true;
			Ok(())
		});
		assert_eq!(result.unwrap(), 7);
		assert!(!cleared);
	}

	#[test]
	fn failed_clear_keeps_original_error() {
		let result: Result<()> = clear_flags_on_error(Err(RadioError::MissingIrqPin), || {
			Err(RadioError::NotListening)
		});
		assert!(matches!(result, Err(RadioError::MissingIrqPin)));
	}

	#[test]
	fn op_mode_bits() {
		assert_eq!((Mode::LORA | Mode::RECEIVE_CONTINUOUS).bits(), 0x85);
		assert_eq!((Mode::LORA | Mode::STANDBY | Mode::LOW_FREQUENCY_MODE).bits(), 0x89);
	}
}
