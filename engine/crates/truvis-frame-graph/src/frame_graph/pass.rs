//! Pass 定义和构建器
//!
//! `RgPassNode` 保存一个 Pass 声明的视图和队列；
//! `RgPassBuilder` 是声明阶段使用的短生命周期借用，
//! 同时持有 Pass 和资源注册表，用于声明视图和隐式创建资源。

use bitflags::bitflags;

use crate::frame_graph::error::{RgError, RgResult};
use crate::frame_graph::handle::{RgPassHandle, RgResourceHandle};
use crate::frame_graph::resource::{RgFormat, RgResourceDesc, RgResourceFlags};
use crate::frame_graph::resource_registry::RgResourceRegistry;
use crate::frame_graph::view::{RgAttachmentType, RgComputeView, RgPassView, RgRasterView, RgViewKind};

/// Pass 类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RgPassKind {
    Raster,
    Compute,
    Blit,
    Copy,
    Dispatch,
    Move,
    Present,
    Raytrace,
    /// 只携带场景队列，不声明视图
    Scene,
}

impl RgPassKind {
    #[inline]
    pub fn allows_raster_views(&self) -> bool {
        matches!(self, Self::Raster)
    }

    #[inline]
    pub fn allows_compute_views(&self) -> bool {
        matches!(self, Self::Compute | Self::Dispatch | Self::Raytrace)
    }

    #[inline]
    pub fn allows_copy(&self) -> bool {
        matches!(self, Self::Copy | Self::Move | Self::Blit)
    }
}

/// 调度提示
///
/// 只供外部执行器做排序和合批参考，不参与依赖分析。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RgQueueHint {
    #[default]
    NoHint,
    RenderOpaque,
    RenderCutout,
    RenderTransparent,
}

/// 相机的不透明 id
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RgCameraId(pub u32);

/// 光源的不透明 id
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RgLightId(pub u32);

/// 显式的绘制项
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RgDrawItem {
    pub object: u64,
    pub sub_mesh: u32,
}

bitflags! {
    /// 相机场景的绘制内容
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct RgSceneFlags: u32 {
        const OPAQUE_OBJECT = 0x1;
        const CUTOUT_OBJECT = 0x2;
        const TRANSPARENT_OBJECT = 0x4;
        const SHADOW_CASTER = 0x8;
        const UI = 0x10;
    }
}

/// 队列中的一项工作
///
/// FrameGraph 只保存这些引用，不解释其内容。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RgQueueEntry {
    /// 对相机的场景进行剔除和绘制
    Camera {
        camera: RgCameraId,
        light: Option<RgLightId>,
        flags: RgSceneFlags,
    },
    /// 具名场景
    Scene(String),
    Draw(RgDrawItem),
}

/// Pass 内的队列，按声明顺序执行
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RgQueue {
    pub(crate) hint: RgQueueHint,
    pub(crate) entries: Vec<RgQueueEntry>,
}

impl RgQueue {
    #[inline]
    pub fn hint(&self) -> RgQueueHint {
        self.hint
    }

    #[inline]
    pub fn entries(&self) -> &[RgQueueEntry] {
        &self.entries
    }
}

/// 队列构建器
pub struct RgQueueBuilder<'a> {
    queue: &'a mut RgQueue,
}

impl RgQueueBuilder<'_> {
    pub fn add_scene_of_camera(&mut self, camera: RgCameraId, light: Option<RgLightId>, flags: RgSceneFlags) -> &mut Self {
        self.queue.entries.push(RgQueueEntry::Camera { camera, light, flags });
        self
    }

    pub fn add_scene(&mut self, scene: impl Into<String>) -> &mut Self {
        self.queue.entries.push(RgQueueEntry::Scene(scene.into()));
        self
    }

    pub fn add_draw(&mut self, item: RgDrawItem) -> &mut Self {
        self.queue.entries.push(RgQueueEntry::Draw(item));
        self
    }
}

/// Pass 节点
#[derive(Clone, Debug)]
pub struct RgPassNode {
    pub(crate) name: String,
    pub(crate) kind: RgPassKind,
    pub(crate) hint: RgQueueHint,
    /// 光栅 Pass 的渲染区域
    pub(crate) extent: Option<(u32, u32)>,
    pub(crate) views: Vec<RgPassView>,
    pub(crate) queues: Vec<RgQueue>,
    /// 深度模板视图在 `views` 中的位置
    pub(crate) depth_stencil: Option<usize>,
}

// new & init
impl RgPassNode {
    pub(crate) fn new(name: String, kind: RgPassKind) -> Self {
        Self {
            name,
            kind,
            hint: RgQueueHint::NoHint,
            extent: None,
            views: Vec::new(),
            queues: Vec::new(),
            depth_stencil: None,
        }
    }
}

// getters
impl RgPassNode {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> RgPassKind {
        self.kind
    }

    #[inline]
    pub fn hint(&self) -> RgQueueHint {
        self.hint
    }

    #[inline]
    pub fn extent(&self) -> Option<(u32, u32)> {
        self.extent
    }

    /// 按声明顺序的视图
    #[inline]
    pub fn views(&self) -> &[RgPassView] {
        &self.views
    }

    #[inline]
    pub fn queues(&self) -> &[RgQueue] {
        &self.queues
    }

    #[inline]
    pub fn depth_stencil_view(&self) -> Option<&RgPassView> {
        self.depth_stencil.map(|index| &self.views[index])
    }

    pub fn color_views(&self) -> impl Iterator<Item = &RgPassView> {
        self.views.iter().filter(|view| {
            view.as_raster()
                .is_some_and(|raster| raster.attachment == RgAttachmentType::RenderTarget && raster.access.writes())
        })
    }

    pub fn find_view(&self, resource: &str) -> Option<&RgPassView> {
        self.views.iter().find(|view| view.name == resource)
    }
}

/// 隐式创建资源时使用的默认参数
#[derive(Clone, Copy, Debug)]
pub(crate) struct RgImplicitDefaults {
    pub width: u32,
    pub height: u32,
    pub color_format: RgFormat,
    pub depth_format: RgFormat,
}

/// Pass 构建器
///
/// 通过 [`crate::frame_graph::FrameGraphBuilder::pass_builder`] 获取。
/// 每个声明方法都会立即检查结构性错误，出错时 Pass 保持调用前的状态。
#[derive(Debug)]
pub struct RgPassBuilder<'a> {
    pub(crate) handle: RgPassHandle,
    pub(crate) pass: &'a mut RgPassNode,
    pub(crate) resources: &'a mut RgResourceRegistry,
    pub(crate) defaults: RgImplicitDefaults,
}

impl RgPassBuilder<'_> {
    #[inline]
    pub fn handle(&self) -> RgPassHandle {
        self.handle
    }

    /// 声明光栅视图
    ///
    /// 每个 Pass 至多一个深度模板视图。资源不存在时按附件类型隐式创建一张
    /// backbuffer 大小的 2D 纹理。
    ///
    /// 已存在的资源必须是纹理；深度模板视图要求深度格式，且资源没有被当作颜色附件写过，
    /// 颜色写入反之。
    pub fn add_raster_view(&mut self, resource: &str, view: RgRasterView) -> RgResult<&mut Self> {
        self.check_view_allowed(self.pass.kind.allows_raster_views(), "raster", resource)?;
        self.check_raster_target(resource, &view)?;

        let is_depth_stencil = view.attachment == RgAttachmentType::DepthStencil;
        if is_depth_stencil && let Some(existing) = self.pass.depth_stencil_view() {
            return Err(RgError::DuplicateDepthStencil {
                pass: self.pass.name.clone(),
                existing: existing.name.clone(),
                rejected: resource.to_string(),
            });
        }
        self.check_duplicate(resource)?;

        let format = if is_depth_stencil { self.defaults.depth_format } else { self.defaults.color_format };
        let handle = self.resolve_resource(resource, format);
        self.push_view(resource, handle, RgViewKind::Raster(view))?;
        if is_depth_stencil {
            self.pass.depth_stencil = Some(self.pass.views.len() - 1);
        }
        Ok(self)
    }

    /// 声明计算视图，只能用在 Compute / Dispatch / Raytrace Pass 上
    pub fn add_compute_view(&mut self, resource: &str, view: RgComputeView) -> RgResult<&mut Self> {
        self.check_view_allowed(self.pass.kind.allows_compute_views(), "compute", resource)?;
        self.check_duplicate(resource)?;

        let handle = self.resolve_resource(resource, self.defaults.color_format);
        self.push_view(resource, handle, RgViewKind::Compute(view))?;
        Ok(self)
    }

    /// 声明 copy / move / blit：读取 `src`，写入 `dst`
    pub fn add_copy(&mut self, src: &str, dst: &str) -> RgResult<&mut Self> {
        self.check_view_allowed(self.pass.kind.allows_copy(), "copy", dst)?;
        if src == dst {
            return Err(RgError::DuplicateView {
                pass: self.pass.name.clone(),
                resource: dst.to_string(),
            });
        }
        self.check_duplicate(src)?;
        self.check_duplicate(dst)?;

        let src_handle = self.resolve_resource(src, self.defaults.color_format);
        let dst_handle = self.resolve_resource(dst, self.defaults.color_format);
        self.push_view(src, src_handle, RgViewKind::CopySrc)?;
        self.push_view(dst, dst_handle, RgViewKind::CopyDst)?;
        Ok(self)
    }

    /// 声明呈现的资源，只能用在 Present Pass 上
    pub fn add_present_view(&mut self, resource: &str) -> RgResult<&mut Self> {
        self.check_view_allowed(self.pass.kind == RgPassKind::Present, "present", resource)?;
        self.check_duplicate(resource)?;

        let handle = self.resolve_resource(resource, self.defaults.color_format);
        self.push_view(resource, handle, RgViewKind::Present)?;
        Ok(self)
    }

    /// 添加队列，返回用于追加场景和绘制项的构建器
    pub fn add_queue(&mut self, hint: RgQueueHint) -> RgQueueBuilder<'_> {
        self.pass.queues.push(RgQueue {
            hint,
            entries: Vec::new(),
        });
        let index = self.pass.queues.len() - 1;
        RgQueueBuilder {
            queue: &mut self.pass.queues[index],
        }
    }

    pub fn set_hint(&mut self, hint: RgQueueHint) -> &mut Self {
        self.pass.hint = hint;
        self
    }

    pub fn set_extent(&mut self, width: u32, height: u32) -> &mut Self {
        self.pass.extent = Some((width, height));
        self
    }
}

// helpers
impl RgPassBuilder<'_> {
    fn check_view_allowed(&self, allowed: bool, view: &'static str, resource: &str) -> RgResult<()> {
        if allowed {
            Ok(())
        } else {
            Err(self.invalid_view(resource, view, "pass kind does not accept it"))
        }
    }

    /// 只检查已存在的资源，隐式创建的资源总是匹配附件类型
    fn check_raster_target(&self, resource: &str, view: &RgRasterView) -> RgResult<()> {
        let Some(res) = self.resources.get_resource(resource) else {
            return Ok(());
        };
        let Some(desc) = res.desc().as_texture() else {
            return Err(self.invalid_view(resource, "raster", "resource is a buffer"));
        };

        let reason = match view.attachment {
            RgAttachmentType::DepthStencil if !desc.format.is_depth() => Some("format has no depth component"),
            RgAttachmentType::DepthStencil if res.usage().contains(RgResourceFlags::COLOR_ATTACHMENT) => {
                Some("resource is already a color attachment")
            }
            RgAttachmentType::RenderTarget if view.access.writes() && desc.format.is_depth() => {
                Some("depth format cannot be a color attachment")
            }
            RgAttachmentType::RenderTarget
                if view.access.writes() && res.usage().contains(RgResourceFlags::DEPTH_STENCIL_ATTACHMENT) =>
            {
                Some("resource is already a depth-stencil attachment")
            }
            _ => None,
        };
        match reason {
            Some(reason) => Err(self.invalid_view(resource, "raster", reason)),
            None => Ok(()),
        }
    }

    fn invalid_view(&self, resource: &str, view: &'static str, reason: &'static str) -> RgError {
        RgError::InvalidView {
            pass: self.pass.name.clone(),
            kind: self.pass.kind,
            resource: resource.to_string(),
            view,
            reason,
        }
    }

    fn check_duplicate(&self, resource: &str) -> RgResult<()> {
        if self.pass.find_view(resource).is_some() {
            return Err(RgError::DuplicateView {
                pass: self.pass.name.clone(),
                resource: resource.to_string(),
            });
        }
        Ok(())
    }

    fn resolve_resource(&mut self, resource: &str, format: RgFormat) -> RgResourceHandle {
        match self.resources.handle_of(resource) {
            Some(handle) => handle,
            None => self.resources.create_implicit(
                resource,
                RgResourceDesc::texture_2d(format, self.defaults.width, self.defaults.height),
            ),
        }
    }

    fn push_view(&mut self, resource: &str, handle: RgResourceHandle, kind: RgViewKind) -> RgResult<()> {
        let view = RgPassView {
            resource: handle,
            name: resource.to_string(),
            kind,
        };
        self.resources.add_usage(resource, view.usage())?;
        log::trace!("pass \"{}\" declares {:?} on \"{}\"", self.pass.name, view.access(), resource);
        self.pass.views.push(view);
        Ok(())
    }
}
