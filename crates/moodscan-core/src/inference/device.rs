//! Device selection for inference.

use candle_core::Device;
use serde::Deserialize;
use tracing::info;

/// Where the classifier should run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevicePreference {
    /// Use a GPU when one was compiled in and is present, else the CPU.
    #[default]
    Auto,
    /// Always run on the CPU.
    Cpu,
}

/// Returns the device to run inference on.
///
/// GPU backends are only considered when the `metal` or `cuda` feature is enabled.
#[must_use]
pub fn select_device(preference: DevicePreference) -> Device {
    if preference == DevicePreference::Cpu {
        info!("Using CPU for emotion inference (requested)");
        return Device::Cpu;
    }

    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(device) => {
                info!("Using Metal device for emotion inference");
                return device;
            }
            Err(e) => tracing::warn!("Metal device unavailable: {e}"),
        }
    }

    #[cfg(feature = "cuda")]
    {
        match Device::new_cuda(0) {
            Ok(device) => {
                info!("Using CUDA device for emotion inference");
                return device;
            }
            Err(e) => tracing::warn!("CUDA device unavailable: {e}"),
        }
    }

    info!("Using CPU for emotion inference");
    Device::Cpu
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_preference_returns_cpu() {
        assert!(matches!(select_device(DevicePreference::Cpu), Device::Cpu));
    }

    #[test]
    fn test_auto_returns_a_device() {
        let _device = select_device(DevicePreference::Auto);
    }
}
