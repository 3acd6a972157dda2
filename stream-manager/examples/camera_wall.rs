//! Camera wall demo
//!
//! Several panels share two cameras over a loopback transport. Run with
//! `STREAM_LOG_MODE=development` to see the refcount transitions.

use std::sync::Arc;
use std::time::Duration;

use stream_manager::logging::init_logging_from_env;
use stream_manager::prelude::*;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    init_logging_from_env()?;

    let transport = Arc::new(LoopbackTransport::new().with_yields(2));
    let registry = StreamRegistry::for_connection(transport.clone())?;

    let front = registry.get_or_create(
        "front-door",
        StreamCallbacks::new()
            .on_open(|name| println!("{} is live", name))
            .on_close(|name| println!("{} closed", name)),
    )?;
    let garage = registry.stream("garage");

    // Three panels want the front door, one wants the garage
    let (a, b, c, d) = tokio::join!(front.add(), front.add(), front.add(), garage.add());
    a?;
    b?;
    c?;
    d?;
    println!("Active streams: {:?}", registry.active_streams());

    transport.emit(TrackEvent::single(MediaStream::new(
        "front-door",
        vec!["video0".to_string()],
    )));
    transport.emit(TrackEvent::single(MediaStream::new(
        "garage",
        vec!["video0".to_string(), "audio0".to_string()],
    )));

    let media = front.watch_current().wait_for(Option::is_some).await?;
    if let Some(media) = media {
        println!("Front door tracks: {:?}", media.tracks);
    }

    // A thumbnail, independent of the live stream
    let thumbnail = FrameSlot::new();
    garage.set_src(&thumbnail).await?;
    if let Some(frame) = thumbnail.get() {
        println!("Garage thumbnail: {} bytes of {}", frame.len(), frame.mime_type);
    }

    // Simulated reconnect
    registry.stop_all().await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    registry.refresh_all().await?;

    for _ in 0..3 {
        front.remove().await?;
    }
    garage.remove().await?;

    println!("Transport calls: {:?}", transport.calls());
    Ok(())
}
