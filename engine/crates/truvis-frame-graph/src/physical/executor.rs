//! 帧执行器
//!
//! 按声明顺序遍历已构建帧中的 Pass：插入状态转换，转发队列，最后提交。

use crate::frame_graph::{RgCompiledFrame, RgPassKind};
use crate::physical::device::{RgCommandRecorder, RgDevice, RgDeviceError, RgDeviceResult, RgPhysicalResource};
use crate::physical::resource_pool::RgResourcePool;

/// 一帧执行的统计信息
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RgExecutionStats {
    pub fence_value: u64,
    pub passes: usize,
    pub queues: usize,
    pub transitions: usize,
    pub presents: usize,
}

#[derive(Debug, Default)]
pub struct RgFrameExecutor {
    fence_value: u64,
}

impl RgFrameExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 最近一次提交的 fence value
    #[inline]
    pub fn fence_value(&self) -> u64 {
        self.fence_value
    }

    /// 执行一帧
    ///
    /// 先为引用的资源准备物理资源，再按顺序录制每个 Pass。
    /// Present Pass 不录制队列，直接呈现其读取的纹理。
    pub fn execute<D>(
        &mut self,
        compiled: &RgCompiledFrame<'_>,
        pool: &mut RgResourcePool,
        device: &mut D,
    ) -> RgDeviceResult<RgExecutionStats>
    where
        D: RgDevice + RgCommandRecorder,
    {
        let fence_value = self.fence_value + 1;
        pool.mount(compiled, &mut *device, fence_value)?;

        // 逻辑资源 -> 物理资源
        let physical: Vec<Option<RgPhysicalResource>> =
            compiled.resources().iter().map(|(_, res)| pool.physical(res.name())).collect();

        let mut stats = RgExecutionStats {
            fence_value,
            ..Default::default()
        };

        device.begin_frame(fence_value)?;
        for (handle, pass) in compiled.passes() {
            for transition in compiled.transitions(handle) {
                let Some(res) = compiled.resource(transition.resource) else {
                    continue;
                };
                let resource = physical[transition.resource.index()]
                    .ok_or_else(|| RgDeviceError::MissingPhysicalResource(res.name().to_string()))?;
                device.transition(res.name(), resource, transition);
                stats.transitions += 1;
            }

            if pass.kind() == RgPassKind::Present {
                for view in pass.views() {
                    let name = compiled.resource(view.resource()).map(|res| res.name()).unwrap_or_default();
                    match physical[view.resource().index()] {
                        Some(RgPhysicalResource::Texture(texture)) => device.present(texture)?,
                        _ => return Err(RgDeviceError::PresentFailed(format!("\"{}\" is not a texture", name))),
                    }
                    stats.presents += 1;
                }
            } else {
                device.begin_pass(pass);
                for queue in pass.queues() {
                    device.record_queue(pass, queue);
                    stats.queues += 1;
                }
                device.end_pass(pass);
            }
            stats.passes += 1;
        }
        device.submit(fence_value)?;

        self.fence_value = fence_value;
        log::trace!(
            "frame {} executed: {} passes, {} transitions",
            compiled.frame_index(),
            stats.passes,
            stats.transitions
        );
        Ok(stats)
    }
}
