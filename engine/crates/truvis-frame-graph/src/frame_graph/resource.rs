//! 逻辑资源定义
//!
//! 逻辑资源只描述"需要一张什么样的纹理/缓冲区"，以及本帧哪些 Pass 读写了它，
//! 不持有任何物理资源。物理资源由 [`crate::physical::RgResourcePool`] 按需创建。

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::frame_graph::handle::RgPassHandle;

/// 资源维度
///
/// 资源创建后维度不可改变。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RgResourceDimension {
    Texture1D,
    Texture2D,
    Texture3D,
    Buffer,
}

impl RgResourceDimension {
    #[inline]
    pub fn is_texture(&self) -> bool {
        !matches!(self, Self::Buffer)
    }
}

/// 纹理格式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RgFormat {
    Rgba8Unorm,
    Bgra8Unorm,
    Rgba16Float,
    Rgba32Float,
    R32Float,
    Depth16Unorm,
    Depth24Stencil8,
    Depth32Float,
    Depth32FloatStencil8,
}

impl RgFormat {
    /// 是否包含深度分量
    #[inline]
    pub fn is_depth(&self) -> bool {
        matches!(self, Self::Depth16Unorm | Self::Depth24Stencil8 | Self::Depth32Float | Self::Depth32FloatStencil8)
    }

    /// 每个像素的字节数
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            Self::Depth16Unorm => 2,
            Self::Rgba8Unorm | Self::Bgra8Unorm | Self::R32Float | Self::Depth24Stencil8 | Self::Depth32Float => 4,
            Self::Rgba16Float | Self::Depth32FloatStencil8 => 8,
            Self::Rgba32Float => 16,
        }
    }
}

bitflags! {
    /// 资源用途
    ///
    /// 由引用该资源的所有 view 累积（只做按位或），一帧内不会被清除。
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct RgResourceFlags: u32 {
        const UNIFORM = 0x1;
        const INDIRECT = 0x2;
        const STORAGE = 0x4;
        const SAMPLED = 0x8;
        const COLOR_ATTACHMENT = 0x10;
        const DEPTH_STENCIL_ATTACHMENT = 0x20;
        const INPUT_ATTACHMENT = 0x40;
        const SHADING_RATE = 0x80;
        const TRANSFER_SRC = 0x100;
        const TRANSFER_DST = 0x200;
    }
}

/// 纹理描述
#[derive(Clone, Debug, PartialEq)]
pub struct RgTextureDesc {
    pub format: RgFormat,
    pub width: u32,
    pub height: u32,
    /// 3D 纹理为深度，其余为数组层数
    pub depth_or_array_size: u32,
    pub mip_levels: u32,
    pub sample_count: u32,
}

impl Default for RgTextureDesc {
    fn default() -> Self {
        Self {
            format: RgFormat::Rgba8Unorm,
            width: 1,
            height: 1,
            depth_or_array_size: 1,
            mip_levels: 1,
            sample_count: 1,
        }
    }
}

// new & builder
impl RgTextureDesc {
    #[inline]
    pub fn new(format: RgFormat, width: u32, height: u32) -> Self {
        Self {
            format,
            width,
            height,
            ..Default::default()
        }
    }

    #[inline]
    pub fn with_depth_or_array_size(mut self, depth_or_array_size: u32) -> Self {
        self.depth_or_array_size = depth_or_array_size;
        self
    }

    #[inline]
    pub fn with_mip_levels(mut self, mip_levels: u32) -> Self {
        self.mip_levels = mip_levels;
        self
    }

    #[inline]
    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }
}

/// 缓冲区描述
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RgBufferDesc {
    /// 缓冲区大小（字节）
    pub size: u64,
}

impl RgBufferDesc {
    #[inline]
    pub fn new(size: u64) -> Self {
        Self { size }
    }
}

/// 资源描述
///
/// 按维度区分的 tagged union，纹理携带格式和尺寸，缓冲区只携带字节数。
#[derive(Clone, Debug, PartialEq)]
pub enum RgResourceDesc {
    Texture1D(RgTextureDesc),
    Texture2D(RgTextureDesc),
    Texture3D(RgTextureDesc),
    Buffer(RgBufferDesc),
}

// new
impl RgResourceDesc {
    pub fn texture_1d(format: RgFormat, width: u32) -> Self {
        Self::Texture1D(RgTextureDesc::new(format, width, 1))
    }

    pub fn texture_2d(format: RgFormat, width: u32, height: u32) -> Self {
        Self::Texture2D(RgTextureDesc::new(format, width, height))
    }

    pub fn texture_3d(format: RgFormat, width: u32, height: u32, depth: u32) -> Self {
        Self::Texture3D(RgTextureDesc::new(format, width, height).with_depth_or_array_size(depth))
    }

    pub fn buffer(size: u64) -> Self {
        Self::Buffer(RgBufferDesc::new(size))
    }
}

// getters
impl RgResourceDesc {
    pub fn dimension(&self) -> RgResourceDimension {
        match self {
            Self::Texture1D(_) => RgResourceDimension::Texture1D,
            Self::Texture2D(_) => RgResourceDimension::Texture2D,
            Self::Texture3D(_) => RgResourceDimension::Texture3D,
            Self::Buffer(_) => RgResourceDimension::Buffer,
        }
    }

    pub fn as_texture(&self) -> Option<&RgTextureDesc> {
        match self {
            Self::Texture1D(desc) | Self::Texture2D(desc) | Self::Texture3D(desc) => Some(desc),
            Self::Buffer(_) => None,
        }
    }

    pub fn as_buffer(&self) -> Option<&RgBufferDesc> {
        match self {
            Self::Buffer(desc) => Some(desc),
            _ => None,
        }
    }

    /// 粗略估计占用的显存大小（不考虑对齐和压缩）
    pub fn estimated_size(&self) -> u64 {
        match self {
            Self::Buffer(desc) => desc.size,
            Self::Texture1D(desc) | Self::Texture2D(desc) | Self::Texture3D(desc) => {
                let mut total = 0u64;
                let (mut w, mut h) = (desc.width as u64, desc.height as u64);
                for _ in 0..desc.mip_levels.max(1) {
                    total += w * h;
                    w = (w / 2).max(1);
                    h = (h / 2).max(1);
                }
                total
                    * desc.depth_or_array_size.max(1) as u64
                    * desc.sample_count.max(1) as u64
                    * desc.format.bytes_per_pixel() as u64
            }
        }
    }
}

/// 资源驻留方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RgResidency {
    /// 帧内临时资源，帧结束后可以被复用或销毁
    Transient,
    /// 跨帧保留的资源
    Persistent,
    /// 交换链图像
    Backbuffer,
    /// 外部导入的资源，内容由外部写入
    External,
}

impl RgResidency {
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient)
    }

    /// 资源内容是否在本帧之外已经初始化
    #[inline]
    pub fn is_externally_initialized(&self) -> bool {
        matches!(self, Self::Backbuffer | Self::External)
    }
}

/// 逻辑资源
///
/// 名字是帧内稳定的唯一标识。读写列表按声明顺序记录 Pass，
/// 只由依赖分析在 `build()` 时通过 `record_access` 填充。
#[derive(Clone, Debug)]
pub struct RgLogicalResource {
    pub(crate) name: String,
    pub(crate) desc: RgResourceDesc,
    pub(crate) residency: RgResidency,
    pub(crate) usage: RgResourceFlags,
    pub(crate) written_in: Vec<RgPassHandle>,
    pub(crate) read_in: Vec<RgPassHandle>,
    pub(crate) externally_initialized: bool,
    /// 由 Pass 首次引用时隐式创建，尚未被显式声明
    pub(crate) implicit: bool,
    /// 声明时的帧序号
    pub(crate) declared_in_frame: u64,
}

// new & init
impl RgLogicalResource {
    pub(crate) fn new(name: String, desc: RgResourceDesc, residency: RgResidency, frame: u64) -> Self {
        Self {
            name,
            desc,
            residency,
            usage: RgResourceFlags::empty(),
            written_in: Vec::new(),
            read_in: Vec::new(),
            externally_initialized: residency.is_externally_initialized(),
            implicit: false,
            declared_in_frame: frame,
        }
    }
}

// getters
impl RgLogicalResource {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn desc(&self) -> &RgResourceDesc {
        &self.desc
    }

    #[inline]
    pub fn dimension(&self) -> RgResourceDimension {
        self.desc.dimension()
    }

    #[inline]
    pub fn residency(&self) -> RgResidency {
        self.residency
    }

    #[inline]
    pub fn usage(&self) -> RgResourceFlags {
        self.usage
    }

    /// 写入过该资源的 Pass（声明顺序）
    #[inline]
    pub fn written_in(&self) -> &[RgPassHandle] {
        &self.written_in
    }

    /// 读取过该资源的 Pass（声明顺序）
    #[inline]
    pub fn read_in(&self) -> &[RgPassHandle] {
        &self.read_in
    }

    #[inline]
    pub fn is_externally_initialized(&self) -> bool {
        self.externally_initialized
    }

    #[inline]
    pub fn is_implicit(&self) -> bool {
        self.implicit
    }

    #[inline]
    pub fn is_transient(&self) -> bool {
        self.residency.is_transient()
    }

    /// 本帧是否有 Pass 引用了该资源
    #[inline]
    pub fn is_referenced(&self) -> bool {
        !self.written_in.is_empty() || !self.read_in.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desc_dimension() {
        assert_eq!(RgResourceDesc::texture_1d(RgFormat::R32Float, 64).dimension(), RgResourceDimension::Texture1D);
        assert_eq!(
            RgResourceDesc::texture_2d(RgFormat::Rgba8Unorm, 800, 600).dimension(),
            RgResourceDimension::Texture2D
        );
        assert_eq!(
            RgResourceDesc::texture_3d(RgFormat::Rgba16Float, 32, 32, 32).dimension(),
            RgResourceDimension::Texture3D
        );
        assert_eq!(RgResourceDesc::buffer(256).dimension(), RgResourceDimension::Buffer);
        assert!(RgResourceDesc::buffer(256).as_texture().is_none());
    }

    #[test]
    fn test_estimated_size() {
        let desc = RgResourceDesc::texture_2d(RgFormat::Rgba8Unorm, 4, 4);
        assert_eq!(desc.estimated_size(), 64);

        let mut tex = RgTextureDesc::new(RgFormat::Rgba8Unorm, 4, 4).with_mip_levels(3);
        tex.depth_or_array_size = 2;
        // 16 + 4 + 1 个像素，2 层，每像素 4 字节
        assert_eq!(RgResourceDesc::Texture2D(tex).estimated_size(), 21 * 2 * 4);
    }

    #[test]
    fn test_residency_initialization() {
        assert!(RgResidency::Backbuffer.is_externally_initialized());
        assert!(RgResidency::External.is_externally_initialized());
        assert!(!RgResidency::Transient.is_externally_initialized());
        assert!(!RgResidency::Persistent.is_externally_initialized());
    }

    #[test]
    fn test_format_classification() {
        assert!(RgFormat::Depth24Stencil8.is_depth());
        assert!(RgFormat::Depth32Float.is_depth());
        assert_eq!(RgFormat::Depth32FloatStencil8.bytes_per_pixel(), 8);
        assert!(!RgFormat::Rgba8Unorm.is_depth());
    }
}
