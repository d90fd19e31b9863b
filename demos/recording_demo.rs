//! Punch Out Recording Demo
//!
//! Records a walk-around clip that the time limit stops on its own, then
//! submits it with the punch-out photos. Configuration is loaded from JSON
//! the way a host application would ship it.

use fleetcap::{
    CaptureLayout, FleetCap, FleetCapConfig, FlowEvent, LayoutOptions, MemoryUploader,
    MockMediaDevices, PunchDirection,
};
use std::sync::Arc;
use std::time::Duration;

const CONFIG: &str = r#"{
    "debug_logging": true,
    "log_filter": "info,fleetcap_media=debug",
    "layout": "Compact",
    "min_punch_photos": 2,
    "video": { "max_duration_secs": 4 }
}"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("🎬 Fleet Capture Punch Out Demo");
    println!("===============================");

    // Logging is installed by FleetCap because the config asks for it
    let config = FleetCapConfig::from_json_str(CONFIG)?;
    println!("\n⚙️  Effective configuration");
    println!("{}", config.to_json_string()?);

    let devices = MockMediaDevices::new();
    let fleet_cap = FleetCap::init_with(config, Arc::new(devices.clone()))?;
    let uploader = Arc::new(MemoryUploader::new("inspections/van-2"));
    let mut punch = fleet_cap.punch(PunchDirection::Out, "van-2", uploader.clone())?;
    let mut events = punch.subscribe();

    println!("\n📸 Photos");
    println!("   {}", punch.photos().start().await);
    println!("   {}", punch.photos().capture().await);
    println!("   {}", punch.submit(None).await);
    println!("   {}", punch.photos().capture().await);
    punch.photos().stop();

    println!("\n🔴 Recording");
    println!("   {}", punch.video().start().await);
    let compact = fleet_cap.layout_options();
    let full = LayoutOptions::for_layout(CaptureLayout::Full);
    while punch.video().recorder().is_recording() {
        let view = punch.video().view(full, false);
        println!(
            "   {} {:>3}% (compact: {})",
            view.timer_label,
            view.progress_percent,
            punch.video().view(compact, false).timer_label
        );
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    // The recorder stopped itself; stop() still hands back the same clip
    println!("   {}", punch.video().stop());

    println!("\n⬆️  Submit");
    let notice = punch
        .submit(Some(Arc::new(|percent: u8| {
            println!("   upload {:>3}%", percent);
        })))
        .await;
    println!("   {}", notice);
    println!("   folder: {}", punch.storage_folder(chrono::Utc::now()));
    for video in uploader.videos() {
        println!("   clip {}s, {} bytes", video.duration, video.blob.len());
    }

    println!("\n📋 Flow events");
    for event in events.drain() {
        match event {
            FlowEvent::UploadProgress { .. } => {}
            FlowEvent::Notice { notice } => println!("   notice: {}", notice),
            other => println!("   {}: {:?}", other.event_type(), other),
        }
    }

    tokio::task::yield_now().await;
    let stats = fleet_cap.stats();
    println!(
        "\n📊 Recordings: {}, stopped at limit: {}",
        stats.video.clips_finalized, stats.video.stopped_at_limit
    );
    println!("   live tracks: {}", devices.live_tracks());

    println!("\n✨ Recording demo completed!");
    Ok(())
}
