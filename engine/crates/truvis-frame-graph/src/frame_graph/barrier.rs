//! 资源状态转换计算
//!
//! 按 Pass 声明顺序跟踪每个资源的当前状态，
//! 为每个 Pass 计算执行前需要的状态转换，供执行器插入 barrier。

use crate::frame_graph::handle::{RgPassHandle, RgResourceHandle};
use crate::frame_graph::pass::RgPassNode;
use crate::frame_graph::resource::RgResidency;
use crate::frame_graph::resource_registry::RgResourceRegistry;
use crate::frame_graph::view::{RgAttachmentType, RgPassView, RgViewKind};

/// 资源布局
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RgLayout {
    Undefined,
    General,
    ColorAttachment,
    DepthStencilAttachment,
    DepthStencilReadOnly,
    ShaderReadOnly,
    TransferSrc,
    TransferDst,
    ShadingRate,
    Present,
}

/// 资源状态：布局 + 是否写入
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RgUsageState {
    pub layout: RgLayout,
    pub write: bool,
}

impl RgUsageState {
    pub const UNDEFINED: Self = Self::read(RgLayout::Undefined);
    pub const GENERAL: Self = Self::read(RgLayout::General);
    pub const COLOR_ATTACHMENT_WRITE: Self = Self::write(RgLayout::ColorAttachment);
    pub const DEPTH_STENCIL_WRITE: Self = Self::write(RgLayout::DepthStencilAttachment);
    pub const DEPTH_STENCIL_READ: Self = Self::read(RgLayout::DepthStencilReadOnly);
    pub const SHADER_READ: Self = Self::read(RgLayout::ShaderReadOnly);
    pub const STORAGE_WRITE: Self = Self::write(RgLayout::General);
    pub const TRANSFER_READ: Self = Self::read(RgLayout::TransferSrc);
    pub const TRANSFER_WRITE: Self = Self::write(RgLayout::TransferDst);
    pub const SHADING_RATE_READ: Self = Self::read(RgLayout::ShadingRate);
    pub const PRESENT: Self = Self::read(RgLayout::Present);

    #[inline]
    pub const fn read(layout: RgLayout) -> Self {
        Self { layout, write: false }
    }

    #[inline]
    pub const fn write(layout: RgLayout) -> Self {
        Self { layout, write: true }
    }

    /// 视图要求的资源状态
    pub fn for_view(view: &RgPassView) -> Self {
        let writes = view.access().writes();
        match view.kind() {
            RgViewKind::Raster(raster) => match raster.attachment {
                RgAttachmentType::RenderTarget if writes => Self::COLOR_ATTACHMENT_WRITE,
                RgAttachmentType::RenderTarget => Self::SHADER_READ,
                RgAttachmentType::DepthStencil if writes => Self::DEPTH_STENCIL_WRITE,
                RgAttachmentType::DepthStencil => Self::DEPTH_STENCIL_READ,
                RgAttachmentType::ShadingRate => Self::SHADING_RATE_READ,
            },
            RgViewKind::Compute(_) if writes => Self::STORAGE_WRITE,
            RgViewKind::Compute(_) => Self::SHADER_READ,
            RgViewKind::CopySrc => Self::TRANSFER_READ,
            RgViewKind::CopyDst => Self::TRANSFER_WRITE,
            RgViewKind::Present => Self::PRESENT,
        }
    }

    /// 资源在本帧开始时的状态
    pub fn initial(residency: RgResidency, externally_initialized: bool) -> Self {
        match residency {
            RgResidency::Backbuffer => Self::PRESENT,
            _ if externally_initialized => Self::GENERAL,
            _ => Self::UNDEFINED,
        }
    }
}

/// 一次资源状态转换
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RgTransition {
    pub resource: RgResourceHandle,
    pub src: RgUsageState,
    pub dst: RgUsageState,
}

impl RgTransition {
    /// 检查是否需要 barrier
    ///
    /// 布局不同或任一侧有写入时需要；只读到只读且布局相同时可以跳过。
    pub fn needs_barrier(&self) -> bool {
        if self.src.layout != self.dst.layout {
            return true;
        }
        self.src.write || self.dst.write
    }
}

/// 计算每个 Pass 执行前需要的状态转换
///
/// `initialized[i]` 表示句柄为 i 的资源在本帧开始时内容已经有效。
/// 写入且丢弃旧内容的视图从 `UNDEFINED` 开始转换。
pub fn compute_transitions<'p>(
    passes: impl IntoIterator<Item = &'p RgPassNode>,
    resources: &RgResourceRegistry,
    initialized: &[bool],
) -> Vec<Vec<RgTransition>> {
    let mut current: Vec<RgUsageState> = resources
        .iter()
        .map(|(handle, res)| {
            RgUsageState::initial(res.residency(), initialized.get(handle.index()).copied().unwrap_or(false))
        })
        .collect();

    passes
        .into_iter()
        .enumerate()
        .map(|(pass_index, pass)| {
            let mut transitions = Vec::new();
            for view in pass.views() {
                let index = view.resource().index();
                let dst = RgUsageState::for_view(view);
                let src = if view.discards_contents() { RgUsageState::UNDEFINED } else { current[index] };
                let transition = RgTransition {
                    resource: view.resource(),
                    src,
                    dst,
                };
                if transition.needs_barrier() {
                    log::debug!(
                        "{:?} \"{}\": {:?} -> {:?}",
                        RgPassHandle::new(pass_index),
                        view.name(),
                        src.layout,
                        dst.layout
                    );
                    transitions.push(transition);
                }
                current[index] = dst;
            }
            transitions
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_change_needs_barrier() {
        let transition = RgTransition {
            resource: RgResourceHandle::new(0),
            src: RgUsageState::UNDEFINED,
            dst: RgUsageState::COLOR_ATTACHMENT_WRITE,
        };
        assert!(transition.needs_barrier());
    }

    #[test]
    fn test_read_to_read_skipped() {
        let transition = RgTransition {
            resource: RgResourceHandle::new(0),
            src: RgUsageState::SHADER_READ,
            dst: RgUsageState::SHADER_READ,
        };
        assert!(!transition.needs_barrier());
    }

    #[test]
    fn test_write_to_write_same_layout() {
        let transition = RgTransition {
            resource: RgResourceHandle::new(0),
            src: RgUsageState::STORAGE_WRITE,
            dst: RgUsageState::STORAGE_WRITE,
        };
        assert!(transition.needs_barrier());
    }

    #[test]
    fn test_initial_state() {
        assert_eq!(RgUsageState::initial(RgResidency::Backbuffer, true), RgUsageState::PRESENT);
        assert_eq!(RgUsageState::initial(RgResidency::Persistent, true), RgUsageState::GENERAL);
        assert_eq!(RgUsageState::initial(RgResidency::Transient, false), RgUsageState::UNDEFINED);
    }
}
