//! 声明式的帧渲染依赖图
//!
//! - [`frame_graph`]: 资源注册、Pass 构建、依赖分析、生命周期和状态转换
//! - [`physical`]: GPU 抽象边界、物理资源池和参考执行器
//! - [`forward_pipeline`]: 基于 FrameGraph 的前向渲染管线
//! - [`settings`]: FrameGraph 的 TOML 配置

pub mod forward_pipeline;
pub mod frame_graph;
pub mod physical;
pub mod settings;
