pub const FACE_MODEL_NAME: &str = "blazeface.onnx";
pub const SEGMENTATION_MODEL_NAME: &str = "pelee_seg.onnx";

/// Face model input resolution used by the deployed app.
pub const FACE_INPUT_SIZE: u32 = 192;
pub const SEGMENTATION_INPUT_SIZE: u32 = 304;

pub const DEFAULT_CONFIDENCE: f32 = 0.5;
pub const DEFAULT_NMS_THRESHOLD: f32 = 0.3;

/// Pascal VOC class names emitted by the segmentation detector, indexed by label.
pub const VOC_LABELS: [&str; 21] = [
    "background",
    "aeroplane",
    "bicycle",
    "bird",
    "boat",
    "bottle",
    "bus",
    "car",
    "cat",
    "chair",
    "cow",
    "diningtable",
    "dog",
    "horse",
    "motorbike",
    "person",
    "pottedplant",
    "sheep",
    "sofa",
    "train",
    "tvmonitor",
];

pub const FACE_LABEL: &str = "face";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Distance below which a detection is no longer considered safe, in metres.
pub const CAUTION_DISTANCE_M: f32 = 2.0;
/// Distance below which a detection triggers the danger zone, in metres.
pub const DANGER_DISTANCE_M: f32 = 1.0;
