//! Example: Reading data from PLC memory
//!
//! Run with: cargo run --example simple_read -- 192.168.1.250
//!
//! This example demonstrates:
//! - Opening a session and identifying the CPU
//! - Reading words, bits and multi-word values
//! - Reading BCD values that may contain invalid digits
//! - Reading several areas with one multiple read

use fins_engine::{BcdKind, MultiReadItem, MultiReadKind, Session, SessionConfig};

fn main() -> fins_engine::Result<()> {
    let host = std::env::args().nth(1).unwrap_or_else(|| "192.168.1.250".to_string());

    // =========================================================================
    // Connect to PLC
    // =========================================================================

    // Node 0 on both sides lets the PLC assign the numbers
    let mut session = Session::connect(SessionConfig::new(host, 0, 0))?;
    println!(
        "Connected as node {} to node {}",
        session.local_address().node,
        session.remote_address().node
    );

    let cpu = session.identify()?;
    println!("CPU: {} version {} ({:?})", cpu.model, cpu.version, cpu.family);

    // =========================================================================
    // Reading Words
    // =========================================================================

    println!("\n=== Reading Words ===\n");

    let data = session.read_u16("D0", 1)?;
    println!("D0 = {} (0x{:04X})", data[0], data[0]);

    // More words than fit in one message are split transparently
    let data = session.read_u16("D100", 500)?;
    println!("D100-D599: {} words, first {:?}", data.len(), &data[..5]);

    for address in ["CIO0", "W0", "H0"] {
        println!("{address:>4} = 0x{:04X}", session.read_u16(address, 1)?[0]);
    }

    // =========================================================================
    // Reading Bits
    // =========================================================================

    println!("\n=== Reading Bits ===\n");

    let bits = session.read_bits("CIO0.05", 16)?;
    for (i, bit) in bits.iter().enumerate() {
        if *bit {
            let n = 5 + i;
            println!("  CIO{}.{:02} is ON", n / 16, n % 16);
        }
    }

    // =========================================================================
    // Multi-word Values
    // =========================================================================

    println!("\n=== Multi-word Values ===\n");

    let temperature = session.read_f32("D200", 1)?[0];
    println!("Temperature (D200-D201): {:.2}", temperature);

    let precision = session.read_f64("D210", 1)?[0];
    println!("Precision value (D210-D213): {:.10}", precision);

    let counter = session.read_i32("D220", 1)?[0];
    println!("Counter (D220-D221): {}", counter);

    // =========================================================================
    // BCD
    // =========================================================================

    println!("\n=== BCD ===\n");

    for (i, value) in session.read_bcd16("D300", 4)?.iter().enumerate() {
        match value {
            Some(value) => println!("D{} = {}", 300 + i, value),
            None => println!("D{} is not valid BCD", 300 + i),
        }
    }

    // =========================================================================
    // Multiple Read (Single Request)
    // =========================================================================

    println!("\n=== Multiple Read ===\n");

    let values = session.read_multiple(&[
        MultiReadItem::new("D0", MultiReadKind::Word),
        MultiReadItem::new("CIO0.05", MultiReadKind::BitForced),
        MultiReadItem::new("D200", MultiReadKind::F32),
        MultiReadItem::new("D300", MultiReadKind::Bcd(BcdKind::Unsigned16)),
    ])?;
    for value in values {
        println!("{:?}", value);
    }

    println!("\nRead example completed!");
    Ok(())
}
