pub mod constants;
pub mod detection;
pub mod frame;
pub mod pixel_format;
pub mod settings;
