//! FrameGraph 构建器
//!
//! 帧级别的入口：注册资源和 Pass，`build()` 完成依赖分析，
//! 之后通过名字查询 Pass 和资源供执行器使用。

use indexmap::IndexMap;

use crate::frame_graph::barrier::compute_transitions;
use crate::frame_graph::compiled::{RgBuildResult, RgCompiledFrame};
use crate::frame_graph::error::{RgError, RgResult};
use crate::frame_graph::graph::DependencyGraph;
use crate::frame_graph::handle::{RgPassHandle, RgResourceHandle};
use crate::frame_graph::lifetime::{compute_lifetimes, find_alias_candidates};
use crate::frame_graph::pass::{RgImplicitDefaults, RgPassBuilder, RgPassKind, RgPassNode};
use crate::frame_graph::resource::{RgFormat, RgLogicalResource, RgResidency, RgResourceDesc, RgResourceFlags};
use crate::frame_graph::resource_registry::{RgDeclareOutcome, RgResourceRegistry};
use crate::settings::FrameGraphSettings;

/// 帧状态
///
/// `Empty -> Building -> Built`，`begin_frame` 回到 `Empty`。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RgFrameState {
    Empty,
    Building,
    /// 已构建，只读
    Built,
}

/// FrameGraph 构建器
///
/// 单线程使用，跨帧复用同一个实例：每帧 `begin_frame` 清空 Pass 和临时资源，
/// 持久资源的声明保留到下一帧。
///
/// # 使用流程
///
/// 1. `begin_frame(width, height)`
/// 2. `add_resource` / `add_pass` / `pass_builder(handle).add_raster_view(...)`
/// 3. `build()`，得到 [`RgCompiledFrame`]
pub struct FrameGraphBuilder {
    settings: FrameGraphSettings,
    frame_index: u64,
    state: RgFrameState,

    resources: RgResourceRegistry,
    /// Pass 按声明顺序存放，位置即句柄
    passes: IndexMap<String, RgPassNode>,

    result: Option<RgBuildResult>,
}

impl Default for FrameGraphBuilder {
    fn default() -> Self {
        Self::new(FrameGraphSettings::default())
    }
}

// new & init
impl FrameGraphBuilder {
    pub fn new(settings: FrameGraphSettings) -> Self {
        Self {
            settings,
            frame_index: 0,
            state: RgFrameState::Empty,
            resources: RgResourceRegistry::new(),
            passes: IndexMap::new(),
            result: None,
        }
    }

    /// 开始新的一帧
    ///
    /// 丢弃所有 Pass 和临时资源，持久资源只清空访问列表。
    /// `width`/`height` 是本帧隐式创建纹理的大小。
    pub fn begin_frame(&mut self, width: u32, height: u32) {
        self.frame_index += 1;
        self.settings.backbuffer_width = width;
        self.settings.backbuffer_height = height;
        self.passes.clear();
        self.resources.reset_for_frame(self.frame_index);
        self.result = None;
        self.state = RgFrameState::Empty;
        log::trace!("begin frame {} ({}x{})", self.frame_index, width, height);
    }

    fn ensure_mutable(&mut self) -> RgResult<()> {
        match self.state {
            RgFrameState::Built => Err(RgError::FrameAlreadyBuilt),
            RgFrameState::Empty => {
                self.state = RgFrameState::Building;
                Ok(())
            }
            RgFrameState::Building => Ok(()),
        }
    }
}

// resources
impl FrameGraphBuilder {
    /// 显式声明资源
    ///
    /// 显式声明优先于 Pass 引用时的隐式创建。
    pub fn add_resource(&mut self, name: &str, desc: RgResourceDesc, residency: RgResidency) -> RgResult<RgResourceHandle> {
        self.ensure_mutable()?;
        let (handle, outcome) = self.resources.add_resource(name, desc, residency)?;
        if outcome == RgDeclareOutcome::Updated {
            log::debug!("resource \"{}\" declaration updated", name);
        }
        Ok(handle)
    }

    /// 声明颜色渲染目标
    pub fn add_render_target(
        &mut self,
        name: &str,
        format: RgFormat,
        width: u32,
        height: u32,
        residency: RgResidency,
    ) -> RgResult<RgResourceHandle> {
        let handle = self.add_resource(name, RgResourceDesc::texture_2d(format, width, height), residency)?;
        self.resources.add_usage(name, RgResourceFlags::COLOR_ATTACHMENT)?;
        Ok(handle)
    }

    /// 声明深度模板纹理
    pub fn add_depth_stencil(
        &mut self,
        name: &str,
        format: RgFormat,
        width: u32,
        height: u32,
        residency: RgResidency,
    ) -> RgResult<RgResourceHandle> {
        let handle = self.add_resource(name, RgResourceDesc::texture_2d(format, width, height), residency)?;
        self.resources.add_usage(name, RgResourceFlags::DEPTH_STENCIL_ATTACHMENT)?;
        Ok(handle)
    }

    /// 标记资源内容在本帧之外已经初始化
    pub fn mark_externally_initialized(&mut self, name: &str) -> RgResult<()> {
        self.ensure_mutable()?;
        self.resources.mark_externally_initialized(name)
    }

    #[inline]
    pub fn get_resource(&self, name: &str) -> Option<&RgLogicalResource> {
        self.resources.get_resource(name)
    }

    /// 按名字查询纹理资源，缓冲区返回 `None`
    pub fn get_texture_resource(&self, name: &str) -> Option<&RgLogicalResource> {
        self.resources.get_resource(name).filter(|res| res.dimension().is_texture())
    }

    #[inline]
    pub fn resources(&self) -> &RgResourceRegistry {
        &self.resources
    }
}

// passes
impl FrameGraphBuilder {
    /// 添加 Pass，名字在本帧内必须唯一
    pub fn add_pass(&mut self, name: &str, kind: RgPassKind) -> RgResult<RgPassHandle> {
        self.ensure_mutable()?;
        if self.passes.contains_key(name) {
            return Err(RgError::DuplicatePassName { name: name.to_string() });
        }

        let (index, _) = self.passes.insert_full(name.to_string(), RgPassNode::new(name.to_string(), kind));
        log::trace!("add {:?} pass \"{}\" as {:?}", kind, name, RgPassHandle::new(index));
        Ok(RgPassHandle::new(index))
    }

    /// 添加光栅 Pass 并设置渲染区域
    pub fn add_raster_pass(&mut self, name: &str, width: u32, height: u32) -> RgResult<RgPassHandle> {
        let handle = self.add_pass(name, RgPassKind::Raster)?;
        self.pass_builder(handle)?.set_extent(width, height);
        Ok(handle)
    }

    /// 添加呈现 Pass，读取 `resource`
    pub fn add_present_pass(&mut self, name: &str, resource: &str) -> RgResult<RgPassHandle> {
        let handle = self.add_pass(name, RgPassKind::Present)?;
        self.pass_builder(handle)?.add_present_view(resource)?;
        Ok(handle)
    }

    /// 获取 Pass 构建器，用于声明视图和队列
    pub fn pass_builder(&mut self, handle: RgPassHandle) -> RgResult<RgPassBuilder<'_>> {
        self.ensure_mutable()?;
        let defaults = RgImplicitDefaults {
            width: self.settings.backbuffer_width,
            height: self.settings.backbuffer_height,
            color_format: self.settings.default_color_format,
            depth_format: self.settings.default_depth_format,
        };
        let (_, pass) = self.passes.get_index_mut(handle.index()).ok_or(RgError::InvalidPassHandle(handle.0))?;
        Ok(RgPassBuilder {
            handle,
            pass,
            resources: &mut self.resources,
            defaults,
        })
    }

    #[inline]
    pub fn find_pass(&self, name: &str) -> Option<RgPassHandle> {
        self.passes.get_index_of(name).map(RgPassHandle::new)
    }

    #[inline]
    pub fn get_pass(&self, handle: RgPassHandle) -> Option<&RgPassNode> {
        self.passes.get_index(handle.index()).map(|(_, pass)| pass)
    }

    #[inline]
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }
}

// build
impl FrameGraphBuilder {
    /// 构建依赖图
    ///
    /// 按声明顺序记录每个视图的访问，推导依赖边，收集诊断，计算生命周期和状态转换。
    /// 诊断不会中断构建；同一帧内重复调用会从头重新分析，结果相同。
    pub fn build(&mut self) -> RgCompiledFrame<'_> {
        let mut diagnostics = Vec::new();

        self.resources.clear_access();
        for (index, pass) in self.passes.values().enumerate() {
            let handle = RgPassHandle::new(index);
            for view in pass.views() {
                if let Err(err) = self.resources.record_access(view.name(), handle, view.access()) {
                    diagnostics.push(err);
                }
                if view.is_missing_clear_value() {
                    diagnostics.push(RgError::MissingClearValue {
                        resource: view.name().to_string(),
                        pass: pass.name().to_string(),
                    });
                }
            }
        }

        let (graph, overwrites) = DependencyGraph::analyze(self.passes.len(), &self.resources);

        let initialized: Vec<bool> = self.resources.iter().map(|(_, res)| self.is_initialized(res)).collect();
        for (handle, res) in self.resources.iter() {
            if initialized[handle.index()] {
                continue;
            }
            let first_write = res.written_in().first().copied();
            for &reader in res.read_in() {
                if first_write.is_some_and(|writer| writer < reader) {
                    break;
                }
                diagnostics.push(RgError::ReadBeforeWrite {
                    resource: res.name().to_string(),
                    pass: self.passes.get_index(reader.index()).map(|(name, _)| name.clone()).unwrap_or_default(),
                });
            }
        }

        for diagnostic in &diagnostics {
            log::warn!("frame {}: {}", self.frame_index, diagnostic);
        }

        let lifetimes = compute_lifetimes(&self.resources);
        let alias_candidates = find_alias_candidates(&self.resources, &lifetimes);
        let transitions = compute_transitions(self.passes.values(), &self.resources, &initialized);

        log::debug!(
            "frame {} built: {} passes, {} edges, {} overwrites, {} diagnostics",
            self.frame_index,
            self.passes.len(),
            graph.edge_count(),
            overwrites.len(),
            diagnostics.len()
        );

        self.state = RgFrameState::Built;
        let result = self.result.insert(RgBuildResult {
            graph,
            diagnostics,
            overwrites,
            lifetimes,
            alias_candidates,
            transitions,
        });
        let compiled = RgCompiledFrame {
            frame_index: self.frame_index,
            passes: &self.passes,
            resources: &self.resources,
            result,
        };
        if self.settings.print_execution_plan {
            compiled.print_execution_plan();
        }
        compiled
    }

    /// 已构建帧的只读视图，未构建时返回 `None`
    pub fn compiled(&self) -> Option<RgCompiledFrame<'_>> {
        if self.state != RgFrameState::Built {
            return None;
        }
        self.result.as_ref().map(|result| RgCompiledFrame {
            frame_index: self.frame_index,
            passes: &self.passes,
            resources: &self.resources,
            result,
        })
    }

    /// 资源内容在本帧开始时是否有效
    fn is_initialized(&self, res: &RgLogicalResource) -> bool {
        res.is_externally_initialized()
            || (res.residency() == RgResidency::Persistent && self.settings.persistent_is_initialized)
    }
}

// getters
impl FrameGraphBuilder {
    #[inline]
    pub fn state(&self) -> RgFrameState {
        self.state
    }

    #[inline]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    #[inline]
    pub fn settings(&self) -> &FrameGraphSettings {
        &self.settings
    }
}
