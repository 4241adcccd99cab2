pub mod conversion;
pub mod host_bitmap;
pub mod rgba_bitmap;
