//! Publish session lifecycle demo
//!
//! Drives a full session against the mock transport: activation, simulated
//! publish-buffer pressure, a reconnect, camera rotation, and teardown.
//!
//! Run with `RUST_LOG=debug cargo run --example publish_session_demo` to see
//! the dispatch and attachment logging.

use livecast::{
    DevicePosition, MockDeviceProvider, MockTransport, PublishSession, PublishTransport,
    TransportEvent,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), livecast::LivecastError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let transport = Arc::new(MockTransport::new());
    let session = PublishSession::builder(transport.clone(), Arc::new(MockDeviceProvider::new()))
        .video_size(854, 480)
        .video_bitrate(640_000)
        .initial_position(DevicePosition::Back)
        .build()?;

    session.activate().await;
    println!("session active, video bitrate {} b/s", session.current_bitrate());

    // The network pushes back three times.
    let stream = transport.stream();
    for _ in 0..3 {
        transport.emit(TransportEvent::InsufficientBandwidth { stream });
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    println!("after congestion, video bitrate {} b/s", session.current_bitrate());

    // The connection drops and is re-established; publishing restarts at
    // full quality.
    transport.emit(TransportEvent::ConnectionCleared { stream });
    tokio::time::sleep(Duration::from_millis(50)).await;
    println!("after reconnect, video bitrate {} b/s", session.current_bitrate());

    session.rotate_camera().await;
    println!(
        "primary camera now {:?}",
        session
            .attachments()
            .video_slot(livecast::VideoSlot::Primary)
            .position
    );

    session.deactivate().await;
    println!("session deactivated");
    Ok(())
}
