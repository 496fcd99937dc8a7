//! Compute backends and their selection from the environment.

use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

/// Set to anything but `0` to train and infer on the GPU.
pub const WITH_GPU: &str = "WITH_GPU";

pub type Element = f32;

pub type CpuBackend = burn::backend::NdArray<Element, i32>;
pub type CpuAutoBackend = burn::backend::Autodiff<CpuBackend>;

#[cfg(feature = "wgpu")]
pub type GpuBackend = burn::backend::wgpu::Wgpu<Element, i32>;
#[cfg(feature = "wgpu")]
pub type GpuAutoBackend = burn::backend::Autodiff<GpuBackend>;

pub trait MainDevice: Backend {
    fn main_device() -> <Self as Backend>::Device {
        Default::default()
    }
}

impl MainDevice for CpuBackend {}
impl MainDevice for CpuAutoBackend {
    fn main_device() -> <Self as Backend>::Device {
        <<Self as AutodiffBackend>::InnerBackend as MainDevice>::main_device()
    }
}

#[cfg(feature = "wgpu")]
impl MainDevice for GpuBackend {}
#[cfg(feature = "wgpu")]
impl MainDevice for GpuAutoBackend {
    fn main_device() -> <Self as Backend>::Device {
        <<Self as AutodiffBackend>::InnerBackend as MainDevice>::main_device()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Cpu,
    Gpu,
}

/// Reads [`WITH_GPU`] and picks the backend.
///
/// A GPU request falls back to the CPU, with a warning, when the `wgpu` feature
/// is not compiled in.
pub fn select_backend() -> BackendKind {
    let value = std::env::var(WITH_GPU).ok();
    resolve(value.as_deref(), cfg!(feature = "wgpu"))
}

fn resolve(with_gpu: Option<&str>, gpu_available: bool) -> BackendKind {
    let requested = with_gpu.is_some_and(|value| value != "0");
    match (requested, gpu_available) {
        (false, _) => BackendKind::Cpu,
        (true, true) => BackendKind::Gpu,
        (true, false) => {
            log::warn!("{WITH_GPU} is set but the `wgpu` feature is disabled, using the CPU");
            BackendKind::Cpu
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_only_when_requested_and_available() {
        assert_eq!(resolve(None, true), BackendKind::Cpu);
        assert_eq!(resolve(Some("0"), true), BackendKind::Cpu);
        assert_eq!(resolve(Some(""), true), BackendKind::Gpu);
        assert_eq!(resolve(Some(" 0 "), true), BackendKind::Gpu);
        assert_eq!(resolve(Some("1"), true), BackendKind::Gpu);
        assert_eq!(resolve(Some("yes"), false), BackendKind::Cpu);
    }
}
