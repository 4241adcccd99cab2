use ort::execution_providers::ExecutionProviderDispatch;

use crate::shared::detection::Accelerator;

/// Return the ONNX execution providers to register for `accelerator`.
///
/// An empty list means the default CPU provider. Platform providers fall
/// back to CPU when unavailable at runtime.
pub fn execution_providers(accelerator: Accelerator, use_fp16: bool) -> Vec<ExecutionProviderDispatch> {
    match accelerator {
        Accelerator::Cpu => vec![],
        Accelerator::Gpu => platform_providers(use_fp16),
    }
}

#[allow(unused_variables)]
fn platform_providers(use_fp16: bool) -> Vec<ExecutionProviderDispatch> {
    #[cfg(target_os = "android")]
    {
        vec![ort::execution_providers::NNAPIExecutionProvider::default()
            .with_fp16(use_fp16)
            .build()]
    }
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "android", target_os = "macos", target_os = "windows")))]
    {
        log::warn!("No GPU execution provider on this platform, using CPU");
        vec![]
    }
}
