pub mod directory_asset_source;
pub mod execution_provider;
pub mod math;
pub mod memory_asset_source;
pub mod onnx_blazeface_detector;
pub mod onnx_detector_factory;
pub mod onnx_segmentation_detector;
pub mod tensor;
