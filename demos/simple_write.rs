//! Example: Writing data to PLC memory
//!
//! Run with: cargo run --example simple_write -- 192.168.1.250
//!
//! This example demonstrates:
//! - Writing words, bits and multi-word values
//! - Writing BCD values
//! - Fill and transfer inside the PLC
//! - Forcing bits
//! - Handling errors and reconnecting
//!
//! WARNING: this writes to D1000-D1999, W100 and CIO0.00. Only run it against
//! a PLC where that is safe.

use std::thread;
use std::time::Duration;

use fins_engine::{FinsError, ForceAction, PlcMode, Session, SessionConfig, SignedBcd};

fn main() -> fins_engine::Result<()> {
    let host = std::env::args().nth(1).unwrap_or_else(|| "192.168.1.250".to_string());

    let config = SessionConfig::new(host, 0, 0)
        .with_recv_timeout(Duration::from_secs(2))
        .with_reconnect_backoff(Duration::from_secs(5));
    let mut session = Session::connect(config)?;
    session.identify()?;

    // =========================================================================
    // Words and Bits
    // =========================================================================

    println!("=== Words and Bits ===\n");

    session.write_u16("D1000", &[0x1234, 0x5678])?;
    println!("D1000-D1001 <- {:?}", session.read_u16("D1000", 2)?);

    session.write_bits("W100.14", &[true, true, true])?;
    println!("W100-W101 <- {:04X?}", session.read_u16("W100", 2)?);

    // =========================================================================
    // Multi-word Values
    // =========================================================================

    println!("\n=== Multi-word Values ===\n");

    session.write_f32("D1010", &[21.5, -3.25])?;
    session.write_f64("D1020", &[std::f64::consts::PI])?;
    session.write_i32("D1030", &[-123_456])?;
    println!("D1030 <- {:?}", session.read_i32("D1030", 1)?);

    // =========================================================================
    // BCD
    // =========================================================================

    println!("\n=== BCD ===\n");

    session.write_bcd16("D1040", &[1234, 9999])?;
    session.write_sbcd16("D1042", SignedBcd::NibbleF, &[-123])?;
    match session.write_bcd16("D1044", &[10_000]) {
        Err(FinsError::InvalidParameter { reason, .. }) => println!("rejected: {reason}"),
        other => println!("unexpected: {other:?}"),
    }

    // =========================================================================
    // Fill and Transfer
    // =========================================================================

    println!("\n=== Fill and Transfer ===\n");

    session.fill("D1100", 100, 0)?;
    session.transfer("D1000", "D1100", 50)?;
    println!("D1100 <- {:?}", session.read_u16("D1100", 4)?);

    // =========================================================================
    // Forcing and Operating Mode
    // =========================================================================

    println!("\n=== Forcing ===\n");

    session.forced_set_reset(&[("CIO0.00", ForceAction::Set)])?;
    thread::sleep(Duration::from_secs(1));
    session.forced_cancel()?;

    session.run(PlcMode::Monitor)?;

    // =========================================================================
    // Error Handling
    // =========================================================================

    println!("\n=== Error Handling ===\n");

    loop {
        match session.read_u16("D1000", 1) {
            Ok(data) => {
                println!("D1000 = {}", data[0]);
                break;
            }
            Err(FinsError::PlcError { main_code, sub_code }) => {
                println!("PLC error: main=0x{:02X}, sub=0x{:02X}", main_code, sub_code);
                break;
            }
            Err(e) if !session.is_connected() => {
                println!("connection lost ({e}), reconnecting");
                match session.reconnect() {
                    Err(FinsError::TryLater { retry_in }) => thread::sleep(retry_in),
                    Err(e) => println!("reconnect failed: {e}"),
                    Ok(()) => {}
                }
            }
            Err(e) => {
                println!("Error {:04X}: {}", e.code(), e);
                break;
            }
        }
    }

    println!("\nWrite example completed!");
    Ok(())
}
