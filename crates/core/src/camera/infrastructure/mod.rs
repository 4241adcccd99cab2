pub mod image_sequence;
pub mod replay_camera;
