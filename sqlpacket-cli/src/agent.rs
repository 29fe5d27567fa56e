//! Agent wiring: one capture worker per configured interface

use sqlpacket_capture::{
    list_capture_interfaces, tcp_port_filter, CaptureConfig, InterfaceInfo, LiveCapture,
};
use sqlpacket_core::{AgentConfig, Result};
use sqlpacket_forward::{
    CaptureWorker, RetryPolicy, Session, ShutdownFlag, ShutdownReason, SignalListener,
    StateHandle, Supervisor, TcpConnector, WorkerSummary,
};
use std::sync::Arc;
use tracing::info;

/// Run the agent until a termination signal or a fatal worker error
///
/// Signal handlers are installed before any worker dials the server.
pub async fn run(config: AgentConfig) -> Result<ShutdownReason> {
    let signals = SignalListener::new()?.spawn();

    info!(
        server = %config.server_address,
        interfaces = ?config.interfaces,
        port = config.target_port,
        handshake = config.handshake,
        "Starting sqlpacket agent"
    );

    let config = Arc::new(config);
    let mut supervisor = Supervisor::new(config.shutdown_grace);
    for interface in &config.interfaces {
        let config = Arc::clone(&config);
        let name = interface.clone();
        supervisor.spawn(interface, move |shutdown, state| {
            capture_job(&config, &name, shutdown, state)
        })?;
    }

    supervisor.run(signals).await
}

/// Capture on `interface` and forward to the configured server
fn capture_job(
    config: &AgentConfig,
    interface: &str,
    shutdown: ShutdownFlag,
    state: StateHandle,
) -> Result<WorkerSummary> {
    let session = Session::new(
        TcpConnector::from_config(config),
        RetryPolicy::from_config(config),
    );
    let filter = tcp_port_filter(config.target_port);
    let capture_config = CaptureConfig::with_snaplen(config.snaplen);

    CaptureWorker::with_state(interface, session, shutdown, state)
        .run(|| LiveCapture::open(interface, &filter, &capture_config))
}

/// Print capture-capable devices, one per line
pub fn print_interfaces() -> Result<()> {
    for iface in list_capture_interfaces()? {
        println!("{}", interface_line(&iface));
    }
    Ok(())
}

fn interface_line(iface: &InterfaceInfo) -> String {
    let ips: Vec<String> = iface.ips.iter().map(ToString::to_string).collect();
    format!("{}  {}  {}", iface.name, ips.join(","), iface.description)
}
