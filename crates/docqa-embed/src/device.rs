use candle_core::Device;
use tracing::info;

/// Metal when built with the `metal` feature and a GPU is present, else CPU.
pub fn select_device() -> Device {
    #[cfg(feature = "metal")]
    {
        if let Ok(dev) = Device::new_metal(0) {
            info!("device: metal");
            return dev;
        }
    }
    info!("device: cpu");
    Device::Cpu
}
