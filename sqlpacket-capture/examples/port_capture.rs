//! Example: capture traffic to or from one TCP port
//!
//! Prints a line per captured packet until the source closes or 20 packets
//! have been seen. Needs capture privileges.
//!
//! Run with: sudo cargo run --example port_capture -- eth0 3306

use sqlpacket_capture::{tcp_port_filter, CaptureConfig, CaptureEvent, LiveCapture, PacketSource};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let interface = args.next().unwrap_or_else(|| "any".to_string());
    let port: u16 = args.next().as_deref().unwrap_or("3306").parse()?;

    let filter = tcp_port_filter(port);
    println!("Capturing on {} with filter: {}", interface, filter);

    let mut capture = LiveCapture::open(&interface, &filter, &CaptureConfig::default())?;

    let mut seen = 0;
    while seen < 20 {
        match capture.next_event()? {
            CaptureEvent::Packet(packet) => {
                seen += 1;
                println!(
                    "[{}] {} bytes (wire {}){}",
                    seen,
                    packet.data().len(),
                    packet.len(),
                    if packet.is_truncated() { " truncated" } else { "" }
                );
            }
            CaptureEvent::Timeout => continue,
            CaptureEvent::Closed => break,
        }
    }

    if let Some(stats) = capture.stats() {
        println!(
            "received {} dropped {} ({:.2}%)",
            stats.packets_received,
            stats.packets_dropped,
            stats.drop_rate()
        );
    }
    Ok(())
}
