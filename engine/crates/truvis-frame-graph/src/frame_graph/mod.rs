//! FrameGraph - 帧级别的声明式渲染依赖图
//!
//! 客户端每帧声明 Pass、Pass 读写的资源以及 Pass 内的绘制队列，
//! `build()` 根据资源访问推导 Pass 之间的依赖，并给出执行器需要的全部信息。
//!
//! # 核心概念
//!
//! - **RgLogicalResource**: 以名字标识的逻辑资源（纹理 / 缓冲区），记录读写它的 Pass
//! - **RgPassNode / RgPassBuilder**: Pass 及其视图、队列的声明
//! - **DependencyGraph**: 由资源访问推导出的 Pass 依赖图（RAW / WAR / WAW）
//! - **FrameGraphBuilder**: 帧级别入口，`Empty -> Building -> Built`
//! - **RgCompiledFrame**: `build()` 的只读结果
//!
//! # 使用示例
//!
//! ```ignore
//! let mut graph = FrameGraphBuilder::new(settings);
//! graph.begin_frame(1280, 720);
//!
//! let shadow = graph.add_raster_pass("Shadow", 2048, 2048)?;
//! graph.pass_builder(shadow)?.add_raster_view("shadowMap", RgRasterView::clear_depth_stencil(1.0, 0))?;
//!
//! let forward = graph.add_raster_pass("Forward", 1280, 720)?;
//! graph
//!     .pass_builder(forward)?
//!     .add_raster_view("shadowMap", RgRasterView::render_target(RgAccessType::Read))?
//!     .add_raster_view("color", RgRasterView::clear_color(Vec4::ZERO))?;
//!
//! let compiled = graph.build();
//! for diagnostic in compiled.diagnostics() {
//!     log::warn!("{}", diagnostic);
//! }
//! ```
//!
//! # 模块结构
//!
//! - `handle`: Pass 和资源句柄
//! - `resource` / `resource_registry`: 逻辑资源和注册表
//! - `view`: 资源视图
//! - `pass`: Pass 节点、队列和构建器
//! - `graph`: 依赖图
//! - `lifetime`: 资源生命周期和 aliasing 候选
//! - `barrier`: 状态转换计算
//! - `builder` / `compiled`: 帧构建器和构建结果

mod barrier;
mod builder;
mod compiled;
mod error;
mod graph;
mod handle;
mod lifetime;
mod pass;
mod resource;
mod resource_registry;
mod view;

// Re-exports
pub use barrier::{RgLayout, RgTransition, RgUsageState, compute_transitions};
pub use builder::{FrameGraphBuilder, RgFrameState};
pub use compiled::RgCompiledFrame;
pub use error::{RgError, RgResult};
pub use graph::{DependencyGraph, EdgeData, RgHazard, RgOverwrite};
pub use handle::{RgPassHandle, RgResourceHandle};
pub use lifetime::{RgAliasCandidate, RgResourceLifetime, compute_lifetimes, find_alias_candidates};
pub use pass::{
    RgCameraId, RgDrawItem, RgLightId, RgPassBuilder, RgPassKind, RgPassNode, RgQueue, RgQueueBuilder, RgQueueEntry,
    RgQueueHint, RgSceneFlags,
};
pub use resource::{
    RgBufferDesc, RgFormat, RgLogicalResource, RgResidency, RgResourceDesc, RgResourceDimension, RgResourceFlags,
    RgTextureDesc,
};
pub use resource_registry::{RgDeclareOutcome, RgResourceRegistry};
pub use view::{
    RgAccessType, RgAttachmentType, RgClearValue, RgComputeView, RgLoadOp, RgPassView, RgRasterView, RgStoreOp,
    RgViewKind,
};
