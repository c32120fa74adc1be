//! Capture controller — async handle over a camera session thread.
//!
//! V4L2 capture blocks, so the session lives on a dedicated OS thread
//! and the shell talks to it through an mpsc request / oneshot reply
//! channel. Dropping the handle ends the thread, which drops the
//! session and releases the device.

use rollcall_hw::{CameraError, CameraSession, CapturedImage, FrameSource, SessionState};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error("camera thread exited")]
    ChannelClosed,
}

enum ControllerRequest {
    Start {
        reply: oneshot::Sender<Result<(), CameraError>>,
    },
    Capture {
        reply: oneshot::Sender<Result<CapturedImage, CameraError>>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
    State {
        reply: oneshot::Sender<SessionState>,
    },
}

/// Handle to the camera session thread. Methods take `&mut self`, so
/// at most one request per handle is in flight.
pub struct CaptureController {
    tx: mpsc::Sender<ControllerRequest>,
}

/// Spawn the camera session on a dedicated thread and return its handle.
pub fn spawn<S>(mut session: CameraSession<S>) -> CaptureController
where
    S: FrameSource + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<ControllerRequest>(4);

    std::thread::Builder::new()
        .name("rollcall-camera".into())
        .spawn(move || {
            tracing::debug!("camera thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    ControllerRequest::Start { reply } => {
                        let _ = reply.send(session.start());
                    }
                    ControllerRequest::Capture { reply } => {
                        let _ = reply.send(session.capture());
                    }
                    ControllerRequest::Stop { reply } => {
                        session.stop();
                        let _ = reply.send(());
                    }
                    ControllerRequest::State { reply } => {
                        let _ = reply.send(session.state());
                    }
                }
            }
            // Session drops here; its Drop releases the device.
            tracing::debug!("camera thread exiting");
        })
        .expect("failed to spawn camera thread");

    CaptureController { tx }
}

impl CaptureController {
    pub async fn start(&mut self) -> Result<(), ControllerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ControllerRequest::Start { reply: reply_tx })
            .await
            .map_err(|_| ControllerError::ChannelClosed)?;
        reply_rx
            .await
            .map_err(|_| ControllerError::ChannelClosed)?
            .map_err(ControllerError::from)
    }

    /// Sample one still from the live session. Each call yields at
    /// most one image; the caller's draft decides what to keep.
    pub async fn capture(&mut self) -> Result<CapturedImage, ControllerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ControllerRequest::Capture { reply: reply_tx })
            .await
            .map_err(|_| ControllerError::ChannelClosed)?;
        reply_rx
            .await
            .map_err(|_| ControllerError::ChannelClosed)?
            .map_err(ControllerError::from)
    }

    pub async fn stop(&mut self) -> Result<(), ControllerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ControllerRequest::Stop { reply: reply_tx })
            .await
            .map_err(|_| ControllerError::ChannelClosed)?;
        reply_rx.await.map_err(|_| ControllerError::ChannelClosed)
    }

    pub async fn state(&mut self) -> Result<SessionState, ControllerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ControllerRequest::State { reply: reply_tx })
            .await
            .map_err(|_| ControllerError::ChannelClosed)?;
        reply_rx.await.map_err(|_| ControllerError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_hw::Frame;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct FakeSource {
        open: Arc<AtomicBool>,
    }

    impl FrameSource for FakeSource {
        fn open(&mut self) -> Result<(u32, u32), CameraError> {
            self.open.store(true, Ordering::SeqCst);
            Ok((8, 4))
        }

        fn grab(&mut self) -> Result<Frame, CameraError> {
            if !self.is_open() {
                return Err(CameraError::NotStarted);
            }
            Ok(Frame {
                data: vec![90; 8 * 4 * 3],
                width: 8,
                height: 4,
                timestamp: std::time::Instant::now(),
                sequence: 0,
            })
        }

        fn close(&mut self) {
            self.open.store(false, Ordering::SeqCst);
        }

        fn is_open(&self) -> bool {
            self.open.load(Ordering::SeqCst)
        }
    }

    fn spawn_fake() -> (CaptureController, Arc<AtomicBool>) {
        let open = Arc::new(AtomicBool::new(false));
        let session = CameraSession::new(
            FakeSource { open: open.clone() },
            85,
        );
        (spawn(session), open)
    }

    #[tokio::test]
    async fn test_capture_before_start_is_not_started() {
        let (mut controller, _open) = spawn_fake();
        let err = controller.capture().await.unwrap_err();
        assert!(matches!(
            err,
            ControllerError::Camera(CameraError::NotStarted)
        ));
    }

    #[tokio::test]
    async fn test_start_capture_stop_lifecycle() {
        let (mut controller, open) = spawn_fake();

        controller.start().await.unwrap();
        assert_eq!(controller.state().await.unwrap(), SessionState::Ready);

        let image = controller.capture().await.unwrap();
        assert_eq!((image.width, image.height), (8, 4));

        controller.stop().await.unwrap();
        assert!(!open.load(Ordering::SeqCst), "stop must release the device");
        assert_eq!(controller.state().await.unwrap(), SessionState::Stopped);
    }

    #[tokio::test]
    async fn test_dropping_handle_releases_device() {
        let (mut controller, open) = spawn_fake();
        controller.start().await.unwrap();
        assert!(open.load(Ordering::SeqCst));

        drop(controller);
        // The camera thread drains and exits after the channel closes.
        for _ in 0..50 {
            if !open.load(Ordering::SeqCst) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("device still open after handle drop");
    }
}
