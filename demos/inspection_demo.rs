//! Vehicle Checkout Demo
//!
//! Walks the agreement flow end to end against mock media devices:
//! select a vehicle, sign, accept, photograph the vehicle and submit.

use async_trait::async_trait;
use chrono::Utc;
use fleetcap::{
    list_labeled, CaptureLayout, CoreError, FixedSurface, FleetCap, FlowEvent, LayoutOptions,
    MemoryUploader, MockMediaDevices, Point, StorageCollaborator, SurfaceEvent,
};
use std::sync::Arc;

/// Storage listing that answers with names from the demo upload
struct DemoStorage {
    names: Vec<String>,
}

#[async_trait]
impl StorageCollaborator for DemoStorage {
    async fn list(&self, _folder: &str) -> Result<Vec<String>, CoreError> {
        Ok(self.names.clone())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    println!("🚚 Fleet Capture Checkout Demo");
    println!("==============================");

    let devices = MockMediaDevices::new();
    devices.set_torch_supported(true);
    let fleet_cap = FleetCap::init(Arc::new(devices.clone()))?;
    let uploader = Arc::new(MemoryUploader::new("inspections/truck-7"));

    let mut flow = fleet_cap.agreement(
        Box::new(FixedSurface {
            width: 600,
            height: 200,
        }),
        uploader.clone(),
    )?;
    let mut events = flow.subscribe();

    println!("\n✍️  Step 1: Signature");
    println!("   {}", flow.select_vehicle("truck-7"));
    flow.handle_signature_event(SurfaceEvent::PointerDown(Point::new(40.0, 120.0)));
    for x in (60..=400).step_by(20) {
        let y = 120.0 - ((x as f32) / 40.0).sin() * 30.0;
        flow.handle_signature_event(SurfaceEvent::PointerMove(Point::new(x as f32, y)));
    }
    flow.handle_signature_event(SurfaceEvent::PointerUp);
    println!("   {}", flow.accept_agreement());

    println!("\n📸 Step 2: Vehicle photos");
    println!("   {}", flow.photos().start().await);
    println!("   {}", flow.photos().toggle_flash().await);
    for _ in 0..3 {
        println!("   {}", flow.photos().capture().await);
    }
    println!("   {}", flow.photos().flip().await);
    println!("   {}", flow.photos().capture().await);
    println!("   {}", flow.photos().delete(3));

    for layout in [CaptureLayout::Full, CaptureLayout::Compact] {
        let options = LayoutOptions::for_layout(layout);
        let controls = flow.photos().controls(options, false);
        let gallery = flow.photos().gallery(options);
        println!("\n   {:?} layout: [{}] {}", layout, controls.capture_label, gallery.counter);
        for row in gallery.rows() {
            let cells: Vec<String> = row
                .iter()
                .map(|tile| match &tile.caption {
                    Some(caption) => format!("{} ({} KiB)", caption, tile.bytes / 1024),
                    None => format!("#{}", tile.index + 1),
                })
                .collect();
            println!("     {}", cells.join(" | "));
        }
    }

    println!("\n⬆️  Step 3: Submit");
    let folder = flow.storage_folder(Utc::now());
    let notice = flow
        .submit(Some(Arc::new(|percent: u8| {
            println!("   upload {:>3}%", percent);
        })))
        .await;
    println!("   {}", notice);
    if let Some(folder) = folder {
        println!("   stored under {}", folder);
    }

    println!("\n🗂️  Step 4: Report listing");
    let stamp = Utc::now().format("%Y%m%dT%H%M%S");
    let names = uploader
        .image_batches()
        .iter()
        .flatten()
        .enumerate()
        .map(|(i, image)| format!("{}_{}.{}", stamp, i, image.format.extension()))
        .collect();
    for file in list_labeled(&DemoStorage { names }, "inspections/truck-7").await? {
        println!("   {:<28} {}", file.name, file.view);
    }

    println!("\n📋 Flow events");
    for event in events.drain() {
        if matches!(event, FlowEvent::UploadProgress { .. }) {
            continue;
        }
        println!("   {:?}", event);
    }

    // Let the stats watchers catch up with the engine channels
    tokio::task::yield_now().await;
    println!("\n📊 Capture statistics");
    println!("{}", serde_json::to_string_pretty(&fleet_cap.stats())?);
    println!("   live camera tracks: {}", devices.live_tracks());

    println!("\n✨ Checkout demo completed!");
    Ok(())
}
