pub mod dispatch_logger;
pub mod frame_dispatcher;
pub mod proximity;
pub mod vision_bridge;
