//! Camera session lifecycle — a guarded state machine over a frame source.
//!
//! A session owns its device for the duration of one screen visit:
//! acquire on `start`, release on `stop`, and `Drop` guarantees release
//! even when the owner never calls `stop` explicitly.

use crate::camera::{CameraError, FrameSource};
use crate::frame::{self, CapturedImage};

/// Lifecycle state of a [`CameraSession`].
///
/// `capture` is only valid from `Ready`; every other state rejects it
/// with [`CameraError::NotStarted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Starting,
    Ready,
    Stopped,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Starting => "starting",
            SessionState::Ready => "ready",
            SessionState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// One camera session: a device stream held open by one screen.
pub struct CameraSession<S: FrameSource> {
    source: S,
    state: SessionState,
    jpeg_quality: u8,
}

impl<S: FrameSource> CameraSession<S> {
    pub fn new(source: S, jpeg_quality: u8) -> Self {
        Self {
            source,
            state: SessionState::Idle,
            jpeg_quality,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Acquire the device and negotiate a format.
    ///
    /// Idle→Ready (through Starting); restarting a stopped session
    /// re-opens the device. A failed open returns the session to its
    /// previous state so the caller can retry. Starting an already
    /// ready session is a no-op.
    pub fn start(&mut self) -> Result<(), CameraError> {
        if self.state == SessionState::Ready {
            return Ok(());
        }

        let previous = self.state;
        self.state = SessionState::Starting;
        match self.source.open() {
            Ok((width, height)) => {
                tracing::debug!(width, height, "camera session ready");
                self.state = SessionState::Ready;
                Ok(())
            }
            Err(e) => {
                self.state = previous;
                Err(e)
            }
        }
    }

    /// Sample one frame from the live stream and encode it as JPEG.
    ///
    /// Fails with [`CameraError::NotStarted`] unless the session is
    /// `Ready`. Exactly one image is produced per call.
    pub fn capture(&mut self) -> Result<CapturedImage, CameraError> {
        if self.state != SessionState::Ready {
            return Err(CameraError::NotStarted);
        }

        let frame = self.source.grab()?;
        if frame.width == 0 || frame.height == 0 {
            return Err(CameraError::CaptureFailed(
                "frame has zero dimensions".into(),
            ));
        }

        let image = frame::encode_jpeg(&frame, self.jpeg_quality)?;
        tracing::debug!(
            width = image.width,
            height = image.height,
            bytes = image.jpeg.len(),
            seq = frame.sequence,
            "captured frame"
        );
        Ok(image)
    }

    /// Release the device. Idempotent; safe to call from any state.
    pub fn stop(&mut self) {
        self.source.close();
        self.state = SessionState::Stopped;
    }
}

impl<S: FrameSource> Drop for CameraSession<S> {
    fn drop(&mut self) {
        self.stop();
    }
}
