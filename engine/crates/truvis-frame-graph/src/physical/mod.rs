//! 物理层：GPU 抽象边界、物理资源池和帧执行器
//!
//! - `device`: [`RgDevice`] / [`RgCommandRecorder`] 以及只记录调用的 [`RgNullDevice`]
//! - `resource_pool`: 以 fence value 管理物理资源的复用与回收
//! - `executor`: 按顺序录制已构建的帧

mod device;
mod executor;
mod resource_pool;

pub use device::{
    RgCommandRecorder, RgDevice, RgDeviceBuffer, RgDeviceError, RgDeviceResult, RgDeviceTexture, RgNullDevice,
    RgNullEvent, RgPhysicalResource,
};
pub use executor::{RgExecutionStats, RgFrameExecutor};
pub use resource_pool::{RgPhysicalEntry, RgPhysicalHandle, RgResourcePool};
