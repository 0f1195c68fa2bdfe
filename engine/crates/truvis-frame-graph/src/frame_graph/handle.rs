//! FrameGraph 句柄定义
//!
//! 句柄只是帧内 arena 的索引：Pass 句柄是 Pass 的声明顺序，
//! 资源句柄是资源在注册表中的位置。句柄只在创建它的那一帧内有效，
//! `begin_frame` 之后需要重新通过名字查询。

use std::fmt;

/// Pass 句柄
///
/// 值等于 Pass 在本帧中的声明序号，因此句柄之间的大小关系就是声明顺序。
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RgPassHandle(pub(crate) u32);

impl RgPassHandle {
    #[inline]
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// 获取 Pass 在声明序列中的索引
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for RgPassHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RgPass({})", self.0)
    }
}

/// 逻辑资源句柄
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RgResourceHandle(pub(crate) u32);

impl RgResourceHandle {
    #[inline]
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// 获取资源在注册表中的索引
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for RgResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RgResource({})", self.0)
    }
}
