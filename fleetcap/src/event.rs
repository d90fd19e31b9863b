//! Event system for page-level capture flows

use crate::flow::UserNotice;
use fleetcap_core::{InspectionKind, InspectionView};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Events emitted by [`crate::AgreementFlow`] and [`crate::PunchFlow`]
#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
    /// A vehicle was selected; any previous signature was cleared
    VehicleSelected {
        /// Vehicle identifier
        vehicle_id: String,
    },
    /// The signature pad was cleared
    SignatureCleared,
    /// The agreement was accepted with a signature
    AgreementAccepted {
        /// Vehicle identifier
        vehicle_id: String,
    },
    /// A photo was added to the set
    PhotoCaptured {
        /// Position in the set
        index: usize,
        /// Positional label
        view: InspectionView,
    },
    /// A photo was removed from the set
    PhotoDeleted {
        /// Former position
        index: usize,
    },
    /// A video clip was finalized
    VideoRecorded {
        /// Clip length in seconds
        duration_secs: u32,
    },
    /// Upload progress reported by the collaborator
    UploadProgress {
        /// Percentage, never decreasing within one submission
        percent: u8,
    },
    /// Every artifact of a flow was handed off
    Submitted {
        /// Inspection kind
        kind: InspectionKind,
        /// Photos uploaded
        photos: usize,
        /// Whether a video clip was uploaded
        with_video: bool,
    },
    /// A message for the user
    Notice {
        /// The notice
        notice: UserNotice,
    },
}

impl FlowEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            FlowEvent::VehicleSelected { .. } => "vehicle_selected",
            FlowEvent::SignatureCleared => "signature_cleared",
            FlowEvent::AgreementAccepted { .. } => "agreement_accepted",
            FlowEvent::PhotoCaptured { .. } => "photo_captured",
            FlowEvent::PhotoDeleted { .. } => "photo_deleted",
            FlowEvent::VideoRecorded { .. } => "video_recorded",
            FlowEvent::UploadProgress { .. } => "upload_progress",
            FlowEvent::Submitted { .. } => "submitted",
            FlowEvent::Notice { .. } => "notice",
        }
    }

    /// Check if this is a capture-related event
    pub fn is_capture_event(&self) -> bool {
        matches!(
            self,
            FlowEvent::PhotoCaptured { .. }
                | FlowEvent::PhotoDeleted { .. }
                | FlowEvent::VideoRecorded { .. }
        )
    }

    /// Check if this is an error notice
    pub fn is_error_event(&self) -> bool {
        matches!(self, FlowEvent::Notice { notice } if notice.is_error())
    }
}

/// Stream of flow events for async iteration
#[derive(Debug)]
pub struct EventStream {
    receiver: mpsc::UnboundedReceiver<FlowEvent>,
}

impl EventStream {
    /// Create a new event stream with a receiver
    pub fn new(receiver: mpsc::UnboundedReceiver<FlowEvent>) -> Self {
        Self { receiver }
    }

    /// Get the next event from the stream
    pub async fn next(&mut self) -> Option<FlowEvent> {
        self.receiver.recv().await
    }

    /// Try to get the next event without blocking
    pub fn try_next(&mut self) -> Result<Option<FlowEvent>, mpsc::error::TryRecvError> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => {
                Err(mpsc::error::TryRecvError::Disconnected)
            }
        }
    }

    /// Drain every event already queued
    pub fn drain(&mut self) -> Vec<FlowEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Close the event stream
    pub fn close(&mut self) {
        self.receiver.close();
    }
}

/// Sending half shared by a flow and its steps; silent until subscribed
#[derive(Debug, Clone, Default)]
pub(crate) struct EventSink {
    sender: Arc<Mutex<Option<mpsc::UnboundedSender<FlowEvent>>>>,
}

impl EventSink {
    /// Replace any previous subscriber with a fresh stream
    pub(crate) fn subscribe(&self) -> EventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.sender.lock() = Some(tx);
        EventStream::new(rx)
    }

    pub(crate) fn emit(&self, event: FlowEvent) {
        if let Some(sender) = self.sender.lock().as_ref() {
            debug!(event_type = event.event_type(), "Flow event");
            let _ = sender.send(event);
        }
    }

    /// Emit a notice and hand it back
    pub(crate) fn notify(&self, notice: UserNotice) -> UserNotice {
        self.emit(FlowEvent::Notice {
            notice: notice.clone(),
        });
        notice
    }
}
