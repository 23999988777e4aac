//! Integration tests for the LoRa tracker link.
//!
//! Run with a tracker beaconing and its receiver attached over serial. The
//! receiver's uplink reports are decoded and checked against the expected
//! tracker configuration.

mod device;

use clap::Parser;
use colored::Colorize;

use device::{resolve_port, ReceiverClient};
use tests::{print_results, run_all_tests, Expectations};

#[derive(Parser)]
#[command(name = "integration-tests")]
#[command(about = "Integration tests for the LoRa tracker link")]
struct Args {
    /// Serial port of the receiver (use "auto" to auto-detect)
    #[arg(short, long, default_value = "auto")]
    port: String,

    /// Baud rate
    #[arg(short, long, default_value_t = lora_tracker::config::serial::BAUD_RATE)]
    baud: u32,

    /// Number of readings to collect
    #[arg(short, long, default_value = "3")]
    count: usize,

    /// Seconds to wait for each reading (one sleep plus one fix timeout)
    #[arg(short, long, default_value = "45")]
    timeout: u64,

    /// Tracker is running in test-coordinates mode
    #[arg(long)]
    test_coordinates: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Resolve port (auto-detect if "auto")
    let port = resolve_port(&args.port)?;

    println!("{}", "LoRa Tracker Integration Tests".bold());
    println!("Port: {}", port);
    println!("Baud: {}", args.baud);
    println!();

    println!("Connecting to receiver...");
    let mut device = ReceiverClient::new(&port, args.baud)?;

    // Wait for bootloader output to finish, then clear buffer
    std::thread::sleep(std::time::Duration::from_secs(1));
    device.clear_buffer()?;
    println!("{}", "Connected!".green());

    let expect = Expectations {
        count: args.count,
        timeout: std::time::Duration::from_secs(args.timeout),
        test_coordinates: args.test_coordinates,
    };

    println!("\nCollecting {} readings...\n", expect.count);
    let results = run_all_tests(&mut device, &expect);
    print_results(&results);

    // Exit with error code if any tests failed
    let failed = results.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
