//! Capture session lifecycle around the external QR frame decoder.
//!
//! Camera acquisition and pixel decoding live behind the [`FrameDecoder`]
//! boundary; this module owns the session state machine and the single
//! exclusive capture handle.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::session::SessionState;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("No camera found. Please connect a camera and try again.")]
    DeviceUnavailable,
    #[error("Camera access was denied. Please allow camera access and try again.")]
    PermissionDenied,
    #[error("Camera is already in use by another application.")]
    DeviceBusy,
    #[error("Camera constraints could not be satisfied.")]
    UnsatisfiableConstraints,
    #[error("Camera access requires a secure connection. Please use HTTPS.")]
    InsecureContext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    Rear,
    Front,
}

/// Settings handed to the decoder when a capture starts.
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    pub facing: Facing,
    pub frame_rate: u32,
    /// Side length of the square detection region, in pixels.
    pub detection_box: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeEvent {
    /// A frame decoded successfully; carries the raw text payload.
    Decoded(String),
    Failed(DecodeFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeFailure {
    /// No readable code currently in frame; emitted continuously while idle.
    NoCodeInFrame,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: String,
    pub label: String,
}

/// Host facts checked once before any capture is attempted.
pub trait CaptureEnvironment: Send + Sync {
    fn video_devices(&self) -> Vec<DeviceInfo>;
    /// Capture requires a secure transport or a trusted local origin.
    fn secure_context(&self) -> bool;
}

/// A live capture owned by the controller. At most one exists at a time.
#[async_trait]
pub trait CaptureHandle: Send {
    async fn stop(&mut self) -> anyhow::Result<()>;
}

/// External barcode decoder boundary. A started decoder emits one event per
/// processed frame on the supplied channel until its handle is stopped.
#[async_trait]
pub trait FrameDecoder: Send + Sync {
    async fn start(
        &self,
        opts: &CaptureOptions,
        events: mpsc::Sender<DecodeEvent>,
    ) -> Result<Box<dyn CaptureHandle>, CaptureError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    Idle,
    Starting,
    Active,
    Stopped,
    Errored,
}

pub struct CaptureController {
    phase: CapturePhase,
    handle: Option<Box<dyn CaptureHandle>>,
    opts: CaptureOptions,
    camera_available: bool,
    secure_context: bool,
}

impl CaptureController {
    /// Probes the environment once; a missing camera disables start until the
    /// controller is rebuilt.
    pub fn new(env: &dyn CaptureEnvironment, opts: CaptureOptions) -> Self {
        CaptureController {
            phase: CapturePhase::Idle,
            handle: None,
            opts,
            camera_available: !env.video_devices().is_empty(),
            secure_context: env.secure_context(),
        }
    }

    pub fn phase(&self) -> CapturePhase {
        self.phase
    }

    pub fn camera_available(&self) -> bool {
        self.camera_available
    }

    /// Begin a capture session. Any prior handle is released first, so two
    /// captures can never be held concurrently. Returns the decode event
    /// stream for the caller to pump into [`Self::on_event`].
    pub async fn start(
        &mut self,
        session: &mut SessionState,
        decoder: &dyn FrameDecoder,
    ) -> Result<mpsc::Receiver<DecodeEvent>, CaptureError> {
        if !self.secure_context {
            return self.fail(session, CaptureError::InsecureContext);
        }
        if !self.camera_available {
            return self.fail(session, CaptureError::DeviceUnavailable);
        }

        self.release().await;
        self.phase = CapturePhase::Starting;
        session.set_scanning(true);
        session.set_info("Starting camera...");

        let (tx, rx) = mpsc::channel(16);
        match decoder.start(&self.opts, tx).await {
            Ok(handle) => {
                self.handle = Some(handle);
                self.phase = CapturePhase::Active;
                Ok(rx)
            }
            Err(err) => self.fail(session, err),
        }
    }

    /// Handle one decoder event. The first successful decode is terminal for
    /// the session; events arriving after a stop are ignored so a late
    /// callback cannot resurrect a stopped session or double-report a result.
    pub async fn on_event(&mut self, session: &mut SessionState, event: DecodeEvent) {
        if self.phase != CapturePhase::Active {
            debug!(?event, "decode event outside active capture; ignoring");
            return;
        }
        match event {
            DecodeEvent::Decoded(text) => {
                info!("QR code decoded");
                self.stop(session).await;
                if let Err(err) = session.apply_decoded(&text) {
                    warn!(%err, "decoded payload yielded no usable fields");
                }
            }
            DecodeEvent::Failed(DecodeFailure::NoCodeInFrame) => {
                session.set_info("No QR code detected. Please try again.");
            }
            DecodeEvent::Failed(DecodeFailure::Other(reason)) => {
                // Per-frame noise; not worth a status change.
                debug!(%reason, "frame decode failed");
            }
        }
    }

    /// Stop the active capture. Idempotent; safe to call when already stopped.
    pub async fn stop(&mut self, session: &mut SessionState) {
        let was_capturing = self.handle.is_some();
        self.release().await;
        if self.phase != CapturePhase::Errored {
            self.phase = CapturePhase::Stopped;
        }
        session.set_scanning(false);
        if was_capturing {
            session.set_info("Scanner stopped");
        }
    }

    fn fail<T>(
        &mut self,
        session: &mut SessionState,
        err: CaptureError,
    ) -> Result<T, CaptureError> {
        self.phase = CapturePhase::Errored;
        session.set_scanning(false);
        session.set_error(err.to_string());
        Err(err)
    }

    /// Best-effort teardown; failures are logged, never surfaced.
    async fn release(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            if let Err(err) = handle.stop().await {
                warn!(?err, "failed to stop capture handle");
            }
        }
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        if self.handle.is_some() {
            warn!("capture handle still held at teardown");
        }
    }
}
