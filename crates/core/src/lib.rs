//! Detector lifecycle and camera-frame dispatch core of the mome vision bridge.
//!
//! A host application loads detectors through [`bridge::vision_bridge::VisionBridge`],
//! while a camera collaborator delivers frames to
//! [`bridge::frame_dispatcher::FrameDispatcher`] on its own capture thread. Both
//! sides share one [`detection::registry::DetectorRegistry`].

pub mod bitmap;
pub mod bridge;
pub mod camera;
pub mod detection;
pub mod error;
pub mod rendering;
pub mod shared;
