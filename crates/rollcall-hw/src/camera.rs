//! V4L2 camera access via the `v4l` crate, behind the [`FrameSource`] trait.

use crate::frame::{self, Frame, FrameError};
use std::path::Path;
use thiserror::Error;
use v4l::buffer::Type as BufType;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("camera permission denied: {0}")]
    PermissionDenied(String),
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("camera not started")]
    NotStarted,
    #[error("format negotiation failed: {0}")]
    FormatNegotiation(String),
    #[error("capture failed: {0}")]
    CaptureFailed(String),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Info about a discovered V4L2 capture device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
    pub driver: String,
    pub bus: String,
}

/// Negotiated pixel format for the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// YUYV 4:2:2 packed (2 bytes/pixel).
    Yuyv,
    /// 8-bit grayscale (1 byte/pixel, native IR camera output).
    Grey,
}

/// A device that can be opened, grabbed from, and released.
///
/// [`CameraSession`](crate::session::CameraSession) drives this; the
/// production implementation is [`V4lSource`], and tests substitute a
/// fake to exercise the session lifecycle without hardware.
pub trait FrameSource {
    /// Open the device and negotiate a format; returns (width, height).
    fn open(&mut self) -> Result<(u32, u32), CameraError>;
    /// Dequeue one frame as RGB24. Requires a prior successful `open`.
    fn grab(&mut self) -> Result<Frame, CameraError>;
    /// Release the device. Idempotent.
    fn close(&mut self);
    /// Whether the device is currently held open.
    fn is_open(&self) -> bool;
}

/// V4L2-backed frame source for a `/dev/videoN` device.
pub struct V4lSource {
    device_path: String,
    device: Option<Device>,
    width: u32,
    height: u32,
    pixel_format: PixelFormat,
}

impl V4lSource {
    pub fn new(device_path: &str) -> Self {
        Self {
            device_path: device_path.to_string(),
            device: None,
            width: 0,
            height: 0,
            pixel_format: PixelFormat::Yuyv,
        }
    }
}

impl FrameSource for V4lSource {
    fn open(&mut self) -> Result<(u32, u32), CameraError> {
        if !Path::new(&self.device_path).exists() {
            return Err(CameraError::DeviceUnavailable(format!(
                "no such device: {}",
                self.device_path
            )));
        }

        let device = Device::with_path(&self.device_path).map_err(|e| {
            let msg = e.to_string();
            if msg.contains("denied") || msg.contains("EACCES") || msg.contains("os error 13") {
                CameraError::PermissionDenied(format!("{}: {e}", self.device_path))
            } else if msg.contains("busy") || msg.contains("EBUSY") {
                CameraError::DeviceUnavailable(format!("{} is busy", self.device_path))
            } else {
                CameraError::DeviceUnavailable(format!("{}: {e}", self.device_path))
            }
        })?;

        let caps = device.query_caps().map_err(|e| {
            CameraError::DeviceUnavailable(format!("failed to query capabilities: {e}"))
        })?;

        tracing::info!(
            device = %self.device_path,
            driver = %caps.driver,
            card = %caps.card,
            "opened camera"
        );

        if !caps
            .capabilities
            .contains(v4l::capability::Flags::VIDEO_CAPTURE)
        {
            return Err(CameraError::DeviceUnavailable(format!(
                "{} has no video capture capability",
                self.device_path
            )));
        }

        // Request YUYV at 640x480; if the driver negotiates GREY (common
        // for IR cameras), accept it.
        let mut fmt = device
            .format()
            .map_err(|e| CameraError::FormatNegotiation(format!("failed to get format: {e}")))?;

        fmt.fourcc = FourCC::new(b"YUYV");
        fmt.width = 640;
        fmt.height = 480;

        let negotiated = device
            .set_format(&fmt)
            .map_err(|e| CameraError::FormatNegotiation(format!("failed to set format: {e}")))?;

        let pixel_format = if negotiated.fourcc == FourCC::new(b"YUYV") {
            PixelFormat::Yuyv
        } else if negotiated.fourcc == FourCC::new(b"GREY") {
            PixelFormat::Grey
        } else {
            return Err(CameraError::FormatNegotiation(format!(
                "unsupported pixel format: {:?} (need YUYV or GREY)",
                negotiated.fourcc
            )));
        };

        tracing::info!(
            width = negotiated.width,
            height = negotiated.height,
            fourcc = ?negotiated.fourcc,
            "negotiated format"
        );

        self.width = negotiated.width;
        self.height = negotiated.height;
        self.pixel_format = pixel_format;
        self.device = Some(device);
        Ok((self.width, self.height))
    }

    fn grab(&mut self) -> Result<Frame, CameraError> {
        let device = self.device.as_ref().ok_or(CameraError::NotStarted)?;

        let mut stream = MmapStream::with_buffers(device, BufType::VideoCapture, 4)
            .map_err(|e| CameraError::CaptureFailed(format!("failed to create mmap stream: {e}")))?;

        let (buf, meta) = stream
            .next()
            .map_err(|e| CameraError::CaptureFailed(format!("failed to dequeue buffer: {e}")))?;

        let rgb = match self.pixel_format {
            PixelFormat::Yuyv => frame::yuyv_to_rgb(buf, self.width, self.height)?,
            PixelFormat::Grey => frame::grey_to_rgb(buf, self.width, self.height)?,
        };

        Ok(Frame {
            data: rgb,
            width: self.width,
            height: self.height,
            timestamp: std::time::Instant::now(),
            sequence: meta.sequence,
        })
    }

    fn close(&mut self) {
        if self.device.take().is_some() {
            tracing::info!(device = %self.device_path, "released camera");
        }
    }

    fn is_open(&self) -> bool {
        self.device.is_some()
    }
}

/// List available V4L2 video capture devices.
pub fn list_devices() -> Vec<DeviceInfo> {
    let mut devices = Vec::new();

    for i in 0..16 {
        let path = format!("/dev/video{i}");
        if !Path::new(&path).exists() {
            continue;
        }
        let Ok(dev) = Device::with_path(&path) else {
            continue;
        };
        let Ok(caps) = dev.query_caps() else {
            continue;
        };
        if !caps
            .capabilities
            .contains(v4l::capability::Flags::VIDEO_CAPTURE)
        {
            continue;
        }
        devices.push(DeviceInfo {
            path,
            name: caps.card.clone(),
            driver: caps.driver.clone(),
            bus: caps.bus.clone(),
        });
    }

    devices
}
