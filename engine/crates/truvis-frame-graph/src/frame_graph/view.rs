//! 资源视图
//!
//! Pass 通过视图声明自己如何访问一个逻辑资源：访问类型、附件类型、
//! load/store 操作以及 clear value。视图内嵌在 Pass 中，不单独存在。

use glam::Vec4;

use crate::frame_graph::handle::RgResourceHandle;
use crate::frame_graph::resource::RgResourceFlags;

/// 访问类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RgAccessType {
    Read,
    Write,
    /// 同一个 Pass 既消费又产出该资源（例如先 load 再 store 的附件）
    ReadWrite,
}

impl RgAccessType {
    #[inline]
    pub fn reads(&self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    #[inline]
    pub fn writes(&self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

/// 光栅附件类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RgAttachmentType {
    RenderTarget,
    DepthStencil,
    ShadingRate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RgLoadOp {
    /// 保留之前的内容
    Load,
    /// 清除为 clear value
    Clear,
    /// 之前的内容不再需要
    Discard,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RgStoreOp {
    Store,
    Discard,
}

/// Clear value
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RgClearValue {
    Color(Vec4),
    DepthStencil { depth: f32, stencil: u32 },
}

/// 光栅视图
///
/// 只能用在 Raster Pass 上。
#[derive(Clone, Debug, PartialEq)]
pub struct RgRasterView {
    pub attachment: RgAttachmentType,
    pub access: RgAccessType,
    pub load_op: RgLoadOp,
    pub store_op: RgStoreOp,
    pub clear_value: Option<RgClearValue>,
}

// new & builder
impl RgRasterView {
    pub fn new(attachment: RgAttachmentType, access: RgAccessType) -> Self {
        Self {
            attachment,
            access,
            load_op: RgLoadOp::Load,
            store_op: RgStoreOp::Store,
            clear_value: None,
        }
    }

    #[inline]
    pub fn render_target(access: RgAccessType) -> Self {
        Self::new(RgAttachmentType::RenderTarget, access)
    }

    #[inline]
    pub fn depth_stencil(access: RgAccessType) -> Self {
        Self::new(RgAttachmentType::DepthStencil, access)
    }

    #[inline]
    pub fn shading_rate() -> Self {
        Self::new(RgAttachmentType::ShadingRate, RgAccessType::Read)
    }

    /// 写入颜色附件，并清除为指定颜色
    pub fn clear_color(color: Vec4) -> Self {
        Self::render_target(RgAccessType::Write).with_clear(RgClearValue::Color(color))
    }

    /// 写入深度模板附件，并清除为指定值
    pub fn clear_depth_stencil(depth: f32, stencil: u32) -> Self {
        Self::depth_stencil(RgAccessType::Write).with_clear(RgClearValue::DepthStencil { depth, stencil })
    }

    #[inline]
    pub fn with_load_op(mut self, load_op: RgLoadOp) -> Self {
        self.load_op = load_op;
        self
    }

    #[inline]
    pub fn with_store_op(mut self, store_op: RgStoreOp) -> Self {
        self.store_op = store_op;
        self
    }

    /// 设置 clear value，同时把 load op 设为 Clear
    #[inline]
    pub fn with_clear(mut self, clear_value: RgClearValue) -> Self {
        self.load_op = RgLoadOp::Clear;
        self.clear_value = Some(clear_value);
        self
    }

    /// 写入时是否丢弃之前的内容
    #[inline]
    pub fn discards_contents(&self) -> bool {
        self.access == RgAccessType::Write && self.load_op != RgLoadOp::Load
    }
}

/// 计算视图
///
/// 用在 Compute / Dispatch / Raytrace Pass 上。`clear_value` 存在时表示执行前先清除。
#[derive(Clone, Debug, PartialEq)]
pub struct RgComputeView {
    pub access: RgAccessType,
    pub clear_value: Option<RgClearValue>,
}

impl RgComputeView {
    #[inline]
    pub fn read() -> Self {
        Self {
            access: RgAccessType::Read,
            clear_value: None,
        }
    }

    #[inline]
    pub fn write() -> Self {
        Self {
            access: RgAccessType::Write,
            clear_value: None,
        }
    }

    #[inline]
    pub fn read_write() -> Self {
        Self {
            access: RgAccessType::ReadWrite,
            clear_value: None,
        }
    }

    #[inline]
    pub fn with_clear(mut self, clear_value: RgClearValue) -> Self {
        self.clear_value = Some(clear_value);
        self
    }
}

/// 视图种类
#[derive(Clone, Debug, PartialEq)]
pub enum RgViewKind {
    Raster(RgRasterView),
    Compute(RgComputeView),
    /// copy / move / blit 的源
    CopySrc,
    /// copy / move / blit 的目标
    CopyDst,
    /// 呈现到交换链
    Present,
}

/// Pass 中声明的一个资源视图
#[derive(Clone, Debug, PartialEq)]
pub struct RgPassView {
    pub(crate) resource: RgResourceHandle,
    pub(crate) name: String,
    pub(crate) kind: RgViewKind,
}

// getters
impl RgPassView {
    #[inline]
    pub fn resource(&self) -> RgResourceHandle {
        self.resource
    }

    /// 资源名称
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> &RgViewKind {
        &self.kind
    }

    #[inline]
    pub fn as_raster(&self) -> Option<&RgRasterView> {
        match &self.kind {
            RgViewKind::Raster(view) => Some(view),
            _ => None,
        }
    }

    #[inline]
    pub fn is_depth_stencil(&self) -> bool {
        self.as_raster().is_some_and(|view| view.attachment == RgAttachmentType::DepthStencil)
    }

    /// 视图的访问类型
    pub fn access(&self) -> RgAccessType {
        match &self.kind {
            RgViewKind::Raster(view) => view.access,
            RgViewKind::Compute(view) => view.access,
            RgViewKind::CopySrc | RgViewKind::Present => RgAccessType::Read,
            RgViewKind::CopyDst => RgAccessType::Write,
        }
    }

    /// 根据视图推断资源用途
    pub fn usage(&self) -> RgResourceFlags {
        match &self.kind {
            RgViewKind::Raster(view) => match view.attachment {
                RgAttachmentType::RenderTarget if view.access.writes() => RgResourceFlags::COLOR_ATTACHMENT,
                RgAttachmentType::RenderTarget => RgResourceFlags::SAMPLED,
                RgAttachmentType::DepthStencil => RgResourceFlags::DEPTH_STENCIL_ATTACHMENT,
                RgAttachmentType::ShadingRate => RgResourceFlags::SHADING_RATE,
            },
            RgViewKind::Compute(view) if view.access.writes() => RgResourceFlags::STORAGE,
            RgViewKind::Compute(_) => RgResourceFlags::SAMPLED,
            RgViewKind::CopySrc => RgResourceFlags::TRANSFER_SRC,
            RgViewKind::CopyDst => RgResourceFlags::TRANSFER_DST,
            RgViewKind::Present => RgResourceFlags::empty(),
        }
    }

    /// 是否为 load op 为 Clear 却没有提供 clear value 的光栅视图
    pub fn is_missing_clear_value(&self) -> bool {
        self.as_raster().is_some_and(|view| view.load_op == RgLoadOp::Clear && view.clear_value.is_none())
    }

    /// 写入时是否丢弃资源之前的内容
    pub fn discards_contents(&self) -> bool {
        self.as_raster().is_some_and(RgRasterView::discards_contents)
    }
}
