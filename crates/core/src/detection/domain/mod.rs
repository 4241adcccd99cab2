pub mod asset_source;
pub mod detector;
