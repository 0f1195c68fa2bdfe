//! 依赖图构建
//!
//! 根据资源注册表中记录的读写列表推导 Pass 之间的依赖，
//! 使用 petgraph 的 DiGraph 保存。边总是从声明较早的 Pass 指向声明较晚的 Pass，
//! 因此图天然无环，声明顺序本身就是一个合法的拓扑序。

use petgraph::Direction;
use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::frame_graph::handle::{RgPassHandle, RgResourceHandle};
use crate::frame_graph::resource_registry::RgResourceRegistry;

/// 依赖产生的原因
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RgHazard {
    /// 写后读：reader 依赖 writer
    ReadAfterWrite,
    /// 读后写：writer 需要等待之前的 reader 完成
    WriteAfterRead,
    /// 写后写，且两次写入之间没有读取
    WriteAfterWrite,
}

/// 依赖边数据
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EdgeData {
    /// 产生依赖的资源及原因
    pub dependencies: Vec<(RgResourceHandle, RgHazard)>,
}

/// 一次被覆盖的写入
///
/// `discarded` 写入的内容在被读取之前就被 `overwritten_by` 覆盖，
/// 执行器可以跳过针对这部分数据的同步。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RgOverwrite {
    pub resource: RgResourceHandle,
    pub discarded: RgPassHandle,
    pub overwritten_by: RgPassHandle,
}

/// 依赖图
pub struct DependencyGraph {
    /// 有向图：节点存储 Pass 句柄，边存储资源依赖
    graph: DiGraph<RgPassHandle, EdgeData>,
    /// Pass 索引到图节点的映射
    node_indices: Vec<NodeIndex>,
}

// new & init
impl DependencyGraph {
    pub fn new(pass_count: usize) -> Self {
        let mut graph = DiGraph::with_capacity(pass_count, pass_count * 2);
        let node_indices = (0..pass_count).map(|i| graph.add_node(RgPassHandle::new(i))).collect();
        Self { graph, node_indices }
    }

    /// 分析资源依赖，构建依赖图
    ///
    /// 对每个资源，按 Pass 声明顺序合并读写列表后顺序扫描：
    /// - 读取：依赖最后一个 writer（RAW）
    /// - 写入：依赖上次写入之后的所有 reader（WAR）；若中间没有读取，
    ///   依赖上一个 writer（WAW），并记录一次覆盖
    ///
    /// ReadWrite 的 Pass 先读后写，它自己的读取算作中间的读取。
    pub fn analyze(pass_count: usize, resources: &RgResourceRegistry) -> (Self, Vec<RgOverwrite>) {
        let mut graph = Self::new(pass_count);
        let mut overwrites = Vec::new();

        for (handle, res) in resources.iter() {
            if !res.is_referenced() {
                continue;
            }

            let mut last_writer: Option<RgPassHandle> = None;
            let mut readers_since_write: Vec<RgPassHandle> = Vec::new();

            let (mut reads, mut writes) = (res.read_in().iter().peekable(), res.written_in().iter().peekable());
            loop {
                // 两个列表都按声明顺序排列，归并出下一个访问该资源的 Pass
                let pass = match (reads.peek(), writes.peek()) {
                    (None, None) => break,
                    (Some(&&r), None) => r,
                    (None, Some(&&w)) => w,
                    (Some(&&r), Some(&&w)) => r.min(w),
                };
                let is_read = reads.next_if_eq(&&pass).is_some();
                let is_write = writes.next_if_eq(&&pass).is_some();

                if is_read {
                    if let Some(writer) = last_writer
                        && writer != pass
                    {
                        graph.add_edge(writer, pass, handle, RgHazard::ReadAfterWrite);
                    }
                    readers_since_write.push(pass);
                }

                if is_write {
                    for &reader in readers_since_write.iter().filter(|&&reader| reader != pass) {
                        graph.add_edge(reader, pass, handle, RgHazard::WriteAfterRead);
                    }

                    if let Some(writer) = last_writer
                        && writer != pass
                        && readers_since_write.is_empty()
                    {
                        graph.add_edge(writer, pass, handle, RgHazard::WriteAfterWrite);
                        overwrites.push(RgOverwrite {
                            resource: handle,
                            discarded: writer,
                            overwritten_by: pass,
                        });
                    }

                    last_writer = Some(pass);
                    readers_since_write.clear();
                }
            }
        }

        (graph, overwrites)
    }

    /// 添加依赖边
    ///
    /// 两个 Pass 之间已经存在边时合并依赖信息，不会产生重复的边。
    pub fn add_edge(&mut self, producer: RgPassHandle, consumer: RgPassHandle, resource: RgResourceHandle, hazard: RgHazard) {
        let producer_node = self.node_indices[producer.index()];
        let consumer_node = self.node_indices[consumer.index()];
        log::debug!("edge {:?} -> {:?} ({:?} on {:?})", producer, consumer, hazard, resource);

        match self.graph.find_edge(producer_node, consumer_node) {
            Some(edge_idx) => {
                if let Some(edge_data) = self.graph.edge_weight_mut(edge_idx)
                    && !edge_data.dependencies.contains(&(resource, hazard))
                {
                    edge_data.dependencies.push((resource, hazard));
                }
            }
            None => {
                self.graph.add_edge(
                    producer_node,
                    consumer_node,
                    EdgeData {
                        dependencies: vec![(resource, hazard)],
                    },
                );
            }
        }
    }
}

// query
impl DependencyGraph {
    #[inline]
    pub fn pass_count(&self) -> usize {
        self.node_indices.len()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// 所有边，按添加顺序
    pub fn edges(&self) -> impl Iterator<Item = (RgPassHandle, RgPassHandle, &EdgeData)> {
        self.graph
            .edge_references()
            .map(|edge| (self.graph[edge.source()], self.graph[edge.target()], edge.weight()))
    }

    /// 所有边的端点，按 (producer, consumer) 排序
    pub fn edge_pairs(&self) -> Vec<(RgPassHandle, RgPassHandle)> {
        let mut pairs: Vec<_> = self.edges().map(|(from, to, _)| (from, to)).collect();
        pairs.sort();
        pairs
    }

    pub fn has_edge(&self, producer: RgPassHandle, consumer: RgPassHandle) -> bool {
        self.edge(producer, consumer).is_some()
    }

    pub fn edge(&self, producer: RgPassHandle, consumer: RgPassHandle) -> Option<&EdgeData> {
        let from = *self.node_indices.get(producer.index())?;
        let to = *self.node_indices.get(consumer.index())?;
        self.graph.find_edge(from, to).and_then(|edge| self.graph.edge_weight(edge))
    }

    /// 获取 Pass 的直接依赖（前驱），按声明顺序
    pub fn predecessors(&self, pass: RgPassHandle) -> Vec<RgPassHandle> {
        self.neighbors(pass, Direction::Incoming)
    }

    /// 获取 Pass 的直接后继，按声明顺序
    pub fn successors(&self, pass: RgPassHandle) -> Vec<RgPassHandle> {
        self.neighbors(pass, Direction::Outgoing)
    }

    fn neighbors(&self, pass: RgPassHandle, direction: Direction) -> Vec<RgPassHandle> {
        let Some(&node) = self.node_indices.get(pass.index()) else {
            return Vec::new();
        };
        let mut result: Vec<_> = self.graph.neighbors_directed(node, direction).map(|n| self.graph[n]).collect();
        result.sort();
        result
    }

    /// `from` 是否（直接或间接）先于 `to`
    pub fn has_path(&self, from: RgPassHandle, to: RgPassHandle) -> bool {
        match (self.node_indices.get(from.index()), self.node_indices.get(to.index())) {
            (Some(&a), Some(&b)) => has_path_connecting(&self.graph, a, b, None),
            _ => false,
        }
    }

    /// 两个 Pass 之间任一方向都没有路径时可以并行执行
    pub fn can_run_concurrently(&self, a: RgPassHandle, b: RgPassHandle) -> bool {
        a != b && !self.has_path(a, b) && !self.has_path(b, a)
    }

    /// 拓扑排序
    ///
    /// 返回 petgraph 给出的一个合法顺序；出现环时返回参与环的 Pass。
    pub fn topological_sort(&self) -> Result<Vec<RgPassHandle>, Vec<RgPassHandle>> {
        match toposort(&self.graph, None) {
            Ok(sorted_nodes) => Ok(sorted_nodes.into_iter().map(|n| self.graph[n]).collect()),
            Err(cycle) => Err(vec![self.graph[cycle.node_id()]]),
        }
    }

    /// 按依赖层级把 Pass 分组
    ///
    /// 同一层内的 Pass 互相之间没有路径，可以并行录制；层之间按顺序执行。
    pub fn parallel_levels(&self) -> Vec<Vec<RgPassHandle>> {
        let mut levels: Vec<usize> = vec![0; self.pass_count()];
        // 边总是从低索引指向高索引，按声明顺序即可一次求出层级
        for index in 0..self.pass_count() {
            let level = self
                .predecessors(RgPassHandle::new(index))
                .iter()
                .map(|pred| levels[pred.index()] + 1)
                .max()
                .unwrap_or(0);
            levels[index] = level;
        }

        let depth = levels.iter().copied().max().map_or(0, |max| max + 1);
        let mut result = vec![Vec::new(); depth];
        for (index, level) in levels.into_iter().enumerate() {
            result[level].push(RgPassHandle::new(index));
        }
        result
    }
}
