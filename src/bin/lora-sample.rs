use clap::Parser;
use std::process;

use sx1276_rx::modulation::{LnaGain, RxGainMode};
use sx1276_rx::{
	bytes_to_text, Bandwidth, CodingRate, HeaderMode, LoraModulation, LoraPacketParams, PacketStatus, PinConfig,
	Result, RxMode, SpreadingFactor, SX1276,
};

/// Step by step SX1276 bring-up: 915 MHz, SF9, 125 kHz, 4/7, sync word 0x12
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
	/// RESET pin (BCM)
	#[arg(long, default_value_t = 24)]
	reset_pin: u8,

	/// DIO0 interrupt pin (BCM)
	#[arg(long)]
	irq_pin: Option<u8>,
}

fn setup_radio(pins: &PinConfig) -> Result<SX1276> {
	let mut radio = pins.open()?;

	println!("Begin LoRa radio");
	if let Err(e) = radio.begin() {
		println!("LoRa begin failed: {}", e);
		return Err(e);
	}

	println!("Set frequency to 915 Mhz");
	radio.set_frequency(915_000_000)?;

	println!("Set RX gain to power saving gain");
	radio.set_rx_gain(RxGainMode::PowerSaving, LnaGain::Auto)?;

	println!("Set modulation parameters:\n\tSpreading factor = 9\n\tBandwidth = 125 kHz\n\tCoding rate = 4/7");
	radio.set_lora_modulation(&LoraModulation::new(SpreadingFactor::SF9, Bandwidth::BW125, CodingRate::CR4_7))?;

	println!("Set packet parameters:\n\tExplicit header type\n\tPreamble length = 10\n\tVariable payload length\n\tCRC on");
	radio.set_lora_packet(&LoraPacketParams {
		header: HeaderMode::Explicit,
		preamble_length: 10,
		payload_length: 255,
		crc: true,
		invert_iq: false,
	})?;

	println!("Set synchronize word to 0x12");
	radio.set_sync_word(0x12)?;

	Ok(radio)
}

fn run(cli: &Cli) -> Result<()> {
	let pins = PinConfig {
		reset_pin: cli.reset_pin,
		irq_pin: cli.irq_pin,
		..PinConfig::default()
	};
	let mut radio = setup_radio(&pins)?;

	println!("\n-- LoRa Receiver --\n");

	loop {
		radio.request(RxMode::Continuous)?;
		radio.wait(None)?;
		let packet = radio.read_packet()?;

		if packet.is_empty() {
			continue;
		}

		println!("Received: {}", bytes_to_text(&packet.payload));
		println!("Packet status: RSSI = {:.2} dBm | SNR = {:.2} dB", packet.rssi, packet.snr);

		match packet.status {
			PacketStatus::CrcError => println!("CRC error"),
			PacketStatus::HeaderError => println!("Packet header error"),
			PacketStatus::Ok => {}
		}
	}
}

fn main() {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
	let cli = Cli::parse();

	if let Err(e) = run(&cli) {
		eprintln!("\nError: {}", e);
		process::exit(1);
	}
}
