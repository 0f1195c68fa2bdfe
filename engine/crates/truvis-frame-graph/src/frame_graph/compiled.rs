//! 构建结果
//!
//! `build()` 之后执行器通过 [`RgCompiledFrame`] 读取：按顺序排列的 Pass、
//! 每个 Pass 的视图和队列、每个资源的读写列表、依赖图以及诊断信息。

use indexmap::IndexMap;
use itertools::Itertools;

use crate::frame_graph::barrier::RgTransition;
use crate::frame_graph::error::RgError;
use crate::frame_graph::graph::{DependencyGraph, RgOverwrite};
use crate::frame_graph::handle::{RgPassHandle, RgResourceHandle};
use crate::frame_graph::lifetime::{RgAliasCandidate, RgResourceLifetime};
use crate::frame_graph::pass::RgPassNode;
use crate::frame_graph::resource::{RgLogicalResource, RgResidency};
use crate::frame_graph::resource_registry::RgResourceRegistry;

/// `build()` 的派生数据，随帧重置
pub(crate) struct RgBuildResult {
    pub graph: DependencyGraph,
    pub diagnostics: Vec<RgError>,
    pub overwrites: Vec<RgOverwrite>,
    pub lifetimes: Vec<RgResourceLifetime>,
    pub alias_candidates: Vec<RgAliasCandidate>,
    /// pass index -> 执行前的状态转换
    pub transitions: Vec<Vec<RgTransition>>,
}

/// 已构建帧的只读视图
#[derive(Clone, Copy)]
pub struct RgCompiledFrame<'a> {
    pub(crate) frame_index: u64,
    pub(crate) passes: &'a IndexMap<String, RgPassNode>,
    pub(crate) resources: &'a RgResourceRegistry,
    pub(crate) result: &'a RgBuildResult,
}

// passes
impl<'a> RgCompiledFrame<'a> {
    #[inline]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    #[inline]
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// 按声明顺序迭代 Pass，这也是执行顺序
    pub fn passes(&self) -> impl Iterator<Item = (RgPassHandle, &'a RgPassNode)> + 'a {
        self.passes.values().enumerate().map(|(index, pass)| (RgPassHandle::new(index), pass))
    }

    #[inline]
    pub fn pass(&self, handle: RgPassHandle) -> Option<&'a RgPassNode> {
        self.passes.get_index(handle.index()).map(|(_, pass)| pass)
    }

    #[inline]
    pub fn find_pass(&self, name: &str) -> Option<RgPassHandle> {
        self.passes.get_index_of(name).map(RgPassHandle::new)
    }

    /// Pass 执行前需要的状态转换
    pub fn transitions(&self, pass: RgPassHandle) -> &'a [RgTransition] {
        self.result.transitions.get(pass.index()).map(Vec::as_slice).unwrap_or(&[])
    }
}

// resources
impl<'a> RgCompiledFrame<'a> {
    #[inline]
    pub fn resources(&self) -> &'a RgResourceRegistry {
        self.resources
    }

    #[inline]
    pub fn resource(&self, handle: RgResourceHandle) -> Option<&'a RgLogicalResource> {
        self.resources.get(handle)
    }

    #[inline]
    pub fn get_resource(&self, name: &str) -> Option<&'a RgLogicalResource> {
        self.resources.get_resource(name)
    }

    /// 本帧引用的 Transient 资源粗略占用的显存总量（字节），不考虑别名复用
    pub fn transient_memory(&self) -> u64 {
        self.resources
            .iter()
            .filter(|(_, res)| res.is_referenced() && res.residency() == RgResidency::Transient)
            .map(|(_, res)| res.desc().estimated_size())
            .sum()
    }

    /// 本帧被引用的资源的生命周期，按资源声明顺序
    #[inline]
    pub fn lifetimes(&self) -> &'a [RgResourceLifetime] {
        &self.result.lifetimes
    }

    pub fn lifetime_of(&self, resource: RgResourceHandle) -> Option<&'a RgResourceLifetime> {
        self.result.lifetimes.iter().find(|lifetime| lifetime.resource == resource)
    }

    #[inline]
    pub fn alias_candidates(&self) -> &'a [RgAliasCandidate] {
        &self.result.alias_candidates
    }
}

// graph & diagnostics
impl<'a> RgCompiledFrame<'a> {
    #[inline]
    pub fn graph(&self) -> &'a DependencyGraph {
        &self.result.graph
    }

    #[inline]
    pub fn overwrites(&self) -> &'a [RgOverwrite] {
        &self.result.overwrites
    }

    /// 构建时收集的诊断
    #[inline]
    pub fn diagnostics(&self) -> &'a [RgError] {
        &self.result.diagnostics
    }

    /// 没有任何诊断
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.result.diagnostics.is_empty()
    }
}

// debug
impl RgCompiledFrame<'_> {
    fn resource_name(&self, handle: RgResourceHandle) -> &str {
        self.resources.get(handle).map(|res| res.name()).unwrap_or("<unknown>")
    }

    fn pass_name(&self, handle: RgPassHandle) -> &str {
        self.pass(handle).map(|pass| pass.name()).unwrap_or("<unknown>")
    }

    /// 打印执行计划
    pub fn print_execution_plan(&self) {
        log::info!("╔══════════════════════════════════════════════════════════════════╗");
        log::info!("║              FrameGraph Execution Plan                           ║");
        log::info!("╠══════════════════════════════════════════════════════════════════╣");
        log::info!(
            "║ Frame: {}  |  Passes: {}  |  Order: [{}]",
            self.frame_index,
            self.pass_count(),
            self.passes().map(|(_, pass)| pass.name()).join(" → ")
        );
        log::info!(
            "║ Transient memory: {:.2} MiB  |  Alias candidates: {}",
            self.transient_memory() as f64 / (1024.0 * 1024.0),
            self.alias_candidates().len()
        );
        log::info!("╚══════════════════════════════════════════════════════════════════╝");

        for (handle, pass) in self.passes() {
            log::info!("");
            log::info!("┌─────────────────────────────────────────────────────────────────┐");
            log::info!("│ [{}/{}] {:?} Pass: \"{}\"", handle.index() + 1, self.pass_count(), pass.kind(), pass.name());
            log::info!("├─────────────────────────────────────────────────────────────────┤");

            if let Some((width, height)) = pass.extent() {
                log::info!("│ Extent: {}x{}", width, height);
            }

            if !pass.views().is_empty() {
                log::info!("│ Views:");
                for view in pass.views() {
                    let icon = if view.access().writes() { "✏️ " } else { "📖" };
                    log::info!("│   {} \"{}\" {:?} {:?}", icon, view.name(), view.access(), view.kind());
                }
            }

            if !pass.queues().is_empty() {
                log::info!("│ Queues:");
                for queue in pass.queues() {
                    log::info!("│   {:?}: {} entries", queue.hint(), queue.entries().len());
                }
            }

            let transitions = self.transitions(handle);
            if !transitions.is_empty() {
                log::info!("│ Transitions:");
                for transition in transitions {
                    log::info!(
                        "│   🔄 \"{}\" {:?} → {:?}",
                        self.resource_name(transition.resource),
                        transition.src.layout,
                        transition.dst.layout
                    );
                }
            }

            let predecessors = self.graph().predecessors(handle);
            if !predecessors.is_empty() {
                log::info!(
                    "│ Depends on: [{}]",
                    predecessors.iter().map(|pred| self.pass_name(*pred)).join(", ")
                );
            }

            let successors = self.graph().successors(handle);
            if !successors.is_empty() {
                log::info!("│ Feeds: [{}]", successors.iter().map(|succ| self.pass_name(*succ)).join(", "));
            }

            log::info!("└─────────────────────────────────────────────────────────────────┘");
        }

        for overwrite in self.overwrites() {
            log::info!(
                "overwrite: \"{}\" written by \"{}\" is discarded by \"{}\"",
                self.resource_name(overwrite.resource),
                self.pass_name(overwrite.discarded),
                self.pass_name(overwrite.overwritten_by)
            );
        }

        for diagnostic in self.diagnostics() {
            log::info!("⚠️  {}", diagnostic);
        }
    }
}
