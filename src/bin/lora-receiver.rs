use clap::Parser;
use log::{error, info, warn};
use std::process;
use std::thread;
use std::time::Duration;

use sx1276_rx::{InterruptFlag, PinConfig, RadioConfig, Receiver, Result, RxMode, SX1276};

/// Receive LoRa packets on an SX1276 and print them to the console.
/// The radio settings must match the transmitter.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
	#[command(flatten)]
	radio: RadioConfig,

	#[command(flatten)]
	pins: PinConfig,

	/// Let a DIO0 interrupt callback flag new packets instead of blocking on each receive
	#[arg(long, requires = "irq_pin")]
	interrupt: bool,
}

fn setup_radio(cli: &Cli) -> Result<SX1276> {
	let mut radio = cli.pins.open()?;
	radio.begin()?;
	cli.radio.apply(&mut radio)?;

	println!("LoRa SX1276 Receiver initialized successfully!");
	println!("{}", cli.radio.banner());
	println!("\nWaiting for messages...\n");
	Ok(radio)
}

fn receive_blocking(receiver: &mut Receiver<SX1276>, stop: &InterruptFlag) {
	receiver.run_until(stop, |report| println!("{}\n", report));
}

fn receive_on_interrupt(receiver: &mut Receiver<SX1276>, stop: &InterruptFlag) -> Result<()> {
	let flag = InterruptFlag::new();
	let raised = flag.clone();

	let radio = receiver.source_mut();
	radio.set_receive_callback(move || raised.raise())?;
	radio.request(RxMode::Continuous)?;
	info!("Listening with DIO0 callback");

	while !stop.is_raised() {
		if !flag.take() {
			thread::sleep(Duration::from_millis(1));
			continue;
		}
		match receiver.source_mut().read_packet() {
			Ok(packet) => {
				if let Some(report) = receiver.accept(packet) {
					println!("{}\n", report);
				}
			}
			Err(e) => error!("Error receiving message: {}", e),
		}
	}

	receiver.source_mut().clear_receive_callback()
}

fn run(cli: &Cli, stop: &InterruptFlag) -> Result<()> {
	let radio = setup_radio(cli)?;
	let mut receiver = Receiver::new(radio);
	if cli.interrupt {
		receive_on_interrupt(&mut receiver, stop)?;
	} else {
		receive_blocking(&mut receiver, stop);
	}

	println!("\n\nReceiver stopped by user");
	if let Err(e) = receiver.source_mut().sleep() {
		warn!("Could not put radio to sleep: {}", e);
	}
	Ok(())
}

fn main() {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
	let cli = Cli::parse();

	let stop = InterruptFlag::new();
	let stop_handler = stop.clone();
	if let Err(e) = ctrlc::set_handler(move || stop_handler.raise()) {
		eprintln!("\nError: could not install Ctrl-C handler: {}", e);
		process::exit(1);
	}

	if let Err(e) = run(&cli, &stop) {
		eprintln!("\nError: {}", e);
		process::exit(1);
	}
}
