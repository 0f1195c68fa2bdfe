//! GPU 抽象边界
//!
//! FrameGraph 只通过这里的 trait 创建/销毁物理资源和录制命令，
//! 不依赖任何具体的图形后端。

use thiserror::Error;

use crate::frame_graph::{RgBufferDesc, RgPassNode, RgQueue, RgResourceDesc, RgResourceFlags, RgTransition};

/// 后端纹理的不透明句柄
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RgDeviceTexture(pub u64);

/// 后端缓冲区的不透明句柄
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RgDeviceBuffer(pub u64);

/// 物理资源
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RgPhysicalResource {
    Texture(RgDeviceTexture),
    Buffer(RgDeviceBuffer),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RgDeviceError {
    #[error("Failed to create resource \"{name}\": {reason}")]
    ResourceCreationFailed { name: String, reason: String },
    #[error("Resource \"{0}\" has no physical resource, import it before execution")]
    MissingPhysicalResource(String),
    #[error("Failed to submit frame {fence_value}: {reason}")]
    SubmitFailed { fence_value: u64, reason: String },
    #[error("Failed to present: {0}")]
    PresentFailed(String),
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Device lost")]
    DeviceLost,
}

pub type RgDeviceResult<T> = Result<T, RgDeviceError>;

/// 资源创建/销毁接口
pub trait RgDevice {
    fn create_texture(
        &mut self,
        name: &str,
        desc: &RgResourceDesc,
        usage: RgResourceFlags,
    ) -> RgDeviceResult<RgDeviceTexture>;

    fn destroy_texture(&mut self, texture: RgDeviceTexture);

    fn create_buffer(&mut self, name: &str, desc: &RgBufferDesc, usage: RgResourceFlags)
    -> RgDeviceResult<RgDeviceBuffer>;

    fn destroy_buffer(&mut self, buffer: RgDeviceBuffer);
}

/// 命令录制和提交接口
pub trait RgCommandRecorder {
    fn begin_frame(&mut self, fence_value: u64) -> RgDeviceResult<()>;

    /// 在 Pass 开始之前插入资源状态转换
    fn transition(&mut self, name: &str, resource: RgPhysicalResource, transition: &RgTransition);

    fn begin_pass(&mut self, pass: &RgPassNode);

    /// 转发 Pass 中的队列，具体绘制由外部的场景系统完成
    fn record_queue(&mut self, pass: &RgPassNode, queue: &RgQueue);

    fn end_pass(&mut self, pass: &RgPassNode);

    fn submit(&mut self, fence_value: u64) -> RgDeviceResult<()>;

    fn present(&mut self, texture: RgDeviceTexture) -> RgDeviceResult<()>;
}

/// 空设备中记录的事件
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RgNullEvent {
    CreateTexture(String),
    DestroyTexture(RgDeviceTexture),
    CreateBuffer(String),
    DestroyBuffer(RgDeviceBuffer),
    BeginFrame(u64),
    Transition(String),
    BeginPass(String),
    RecordQueue { pass: String, entries: usize },
    EndPass(String),
    Submit(u64),
    Present(RgDeviceTexture),
}

/// 不做任何 GPU 工作的设备，只记录调用
///
/// 用于测试和 demo。
#[derive(Debug, Default)]
pub struct RgNullDevice {
    next_id: u64,
    events: Vec<RgNullEvent>,
    live_textures: usize,
    live_buffers: usize,
}

impl RgNullDevice {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn events(&self) -> &[RgNullEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<RgNullEvent> {
        std::mem::take(&mut self.events)
    }

    /// 当前存活的物理纹理数量
    #[inline]
    pub fn live_textures(&self) -> usize {
        self.live_textures
    }

    #[inline]
    pub fn live_buffers(&self) -> usize {
        self.live_buffers
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl RgDevice for RgNullDevice {
    fn create_texture(
        &mut self,
        name: &str,
        desc: &RgResourceDesc,
        usage: RgResourceFlags,
    ) -> RgDeviceResult<RgDeviceTexture> {
        log::trace!("null device: create texture \"{}\" {:?} {:?}", name, desc, usage);
        self.events.push(RgNullEvent::CreateTexture(name.to_string()));
        self.live_textures += 1;
        Ok(RgDeviceTexture(self.next_id()))
    }

    fn destroy_texture(&mut self, texture: RgDeviceTexture) {
        self.events.push(RgNullEvent::DestroyTexture(texture));
        self.live_textures = self.live_textures.saturating_sub(1);
    }

    fn create_buffer(&mut self, name: &str, desc: &RgBufferDesc, usage: RgResourceFlags)
    -> RgDeviceResult<RgDeviceBuffer> {
        log::trace!("null device: create buffer \"{}\" {} bytes {:?}", name, desc.size, usage);
        self.events.push(RgNullEvent::CreateBuffer(name.to_string()));
        self.live_buffers += 1;
        Ok(RgDeviceBuffer(self.next_id()))
    }

    fn destroy_buffer(&mut self, buffer: RgDeviceBuffer) {
        self.events.push(RgNullEvent::DestroyBuffer(buffer));
        self.live_buffers = self.live_buffers.saturating_sub(1);
    }
}

impl RgCommandRecorder for RgNullDevice {
    fn begin_frame(&mut self, fence_value: u64) -> RgDeviceResult<()> {
        self.events.push(RgNullEvent::BeginFrame(fence_value));
        Ok(())
    }

    fn transition(&mut self, name: &str, _resource: RgPhysicalResource, _transition: &RgTransition) {
        self.events.push(RgNullEvent::Transition(name.to_string()));
    }

    fn begin_pass(&mut self, pass: &RgPassNode) {
        self.events.push(RgNullEvent::BeginPass(pass.name().to_string()));
    }

    fn record_queue(&mut self, pass: &RgPassNode, queue: &RgQueue) {
        self.events.push(RgNullEvent::RecordQueue {
            pass: pass.name().to_string(),
            entries: queue.entries().len(),
        });
    }

    fn end_pass(&mut self, pass: &RgPassNode) {
        self.events.push(RgNullEvent::EndPass(pass.name().to_string()));
    }

    fn submit(&mut self, fence_value: u64) -> RgDeviceResult<()> {
        self.events.push(RgNullEvent::Submit(fence_value));
        Ok(())
    }

    fn present(&mut self, texture: RgDeviceTexture) -> RgDeviceResult<()> {
        self.events.push(RgNullEvent::Present(texture));
        Ok(())
    }
}
