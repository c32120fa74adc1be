//! rollcall-hw — Hardware abstraction for camera capture.
//!
//! Provides V4L2-based camera access behind a guarded session state
//! machine, plus RGB conversion and JPEG encoding of captured frames.

pub mod camera;
pub mod frame;
pub mod session;

pub use camera::{list_devices, CameraError, DeviceInfo, FrameSource, PixelFormat, V4lSource};
pub use frame::{CapturedImage, Frame};
pub use session::{CameraSession, SessionState};
