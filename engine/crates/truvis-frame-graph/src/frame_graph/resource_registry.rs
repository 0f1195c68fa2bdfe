use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::frame_graph::error::{RgError, RgResult};
use crate::frame_graph::handle::{RgPassHandle, RgResourceHandle};
use crate::frame_graph::resource::{RgLogicalResource, RgResidency, RgResourceDesc, RgResourceFlags};
use crate::frame_graph::view::RgAccessType;

/// 资源声明的结果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RgDeclareOutcome {
    /// 新建了资源
    Created,
    /// 完全相同的声明已存在
    Existing,
    /// 隐式创建的资源被显式声明覆盖，或持久资源在新的一帧更新了描述
    Updated,
}

/// 资源注册表
///
/// 以名字为键的逻辑资源表，内部用 IndexMap 保证迭代顺序即声明顺序，
/// 资源句柄就是 IndexMap 中的位置。
#[derive(Debug, Default)]
pub struct RgResourceRegistry {
    resources: IndexMap<String, RgLogicalResource>,
    /// 当前帧序号
    frame: u64,
}

// new & init
impl RgResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 开始新的一帧
    ///
    /// 移除临时资源和隐式资源；其余资源保留声明和用途，只清空访问列表。
    pub fn reset_for_frame(&mut self, frame: u64) {
        self.frame = frame;
        self.resources.retain(|_, res| !res.residency.is_transient() && !res.implicit);
        self.clear_access();
    }
}

// register
impl RgResourceRegistry {
    /// 显式声明资源
    ///
    /// - 隐式创建的资源：显式声明优先，覆盖描述（包括维度）
    /// - 同名但维度不同：返回 `DuplicateResource`，原声明不变
    /// - 完全相同的声明：幂等
    /// - 上一帧保留下来的资源：允许更新描述（例如窗口大小变化）
    /// - 本帧已显式声明但描述不同：返回 `DuplicateResource`
    pub fn add_resource(
        &mut self,
        name: &str,
        desc: RgResourceDesc,
        residency: RgResidency,
    ) -> RgResult<(RgResourceHandle, RgDeclareOutcome)> {
        let frame = self.frame;
        match self.resources.entry(name.to_string()) {
            Entry::Vacant(entry) => {
                let handle = RgResourceHandle::new(entry.index());
                log::trace!("register resource \"{}\" ({:?}, {:?})", name, desc.dimension(), residency);
                entry.insert(RgLogicalResource::new(name.to_string(), desc, residency, frame));
                Ok((handle, RgDeclareOutcome::Created))
            }
            Entry::Occupied(mut entry) => {
                let handle = RgResourceHandle::new(entry.index());
                let res = entry.get_mut();
                // 隐式资源只是占位，显式声明可以改变维度；已累积的用途保留
                if res.implicit {
                    log::debug!("resource \"{}\" declared explicitly as {:?}", name, desc.dimension());
                    res.desc = desc;
                    res.residency = residency;
                    res.implicit = false;
                    res.externally_initialized |= residency.is_externally_initialized();
                    res.declared_in_frame = frame;
                    return Ok((handle, RgDeclareOutcome::Updated));
                }

                if res.dimension() != desc.dimension() {
                    return Err(RgError::DuplicateResource {
                        name: name.to_string(),
                        existing: res.dimension(),
                        requested: desc.dimension(),
                    });
                }

                let identical = res.desc == desc && res.residency == residency;
                if res.declared_in_frame == frame && !identical {
                    return Err(RgError::DuplicateResource {
                        name: name.to_string(),
                        existing: res.dimension(),
                        requested: desc.dimension(),
                    });
                }

                res.declared_in_frame = frame;
                if identical {
                    return Ok((handle, RgDeclareOutcome::Existing));
                }

                log::debug!("resource \"{}\" redeclared in frame {}, descriptor updated", name, frame);
                res.desc = desc;
                res.residency = residency;
                res.externally_initialized = residency.is_externally_initialized();
                Ok((handle, RgDeclareOutcome::Updated))
            }
        }
    }

    /// Pass 首次引用未知名字时隐式创建资源
    pub(crate) fn create_implicit(&mut self, name: &str, desc: RgResourceDesc) -> RgResourceHandle {
        if let Some(index) = self.resources.get_index_of(name) {
            return RgResourceHandle::new(index);
        }

        log::debug!("implicitly create resource \"{}\" ({:?})", name, desc);
        let mut res = RgLogicalResource::new(name.to_string(), desc, RgResidency::Transient, self.frame);
        res.implicit = true;
        let (index, _) = self.resources.insert_full(name.to_string(), res);
        RgResourceHandle::new(index)
    }
}

// access & usage
impl RgResourceRegistry {
    /// 记录 Pass 对资源的访问
    ///
    /// 依赖分析唯一使用的修改入口：按访问类型把 Pass 追加到读列表和/或写列表。
    pub fn record_access(&mut self, name: &str, pass: RgPassHandle, access: RgAccessType) -> RgResult<()> {
        let res = self.get_resource_mut(name)?;
        if access.reads() && res.read_in.last() != Some(&pass) {
            res.read_in.push(pass);
        }
        if access.writes() && res.written_in.last() != Some(&pass) {
            res.written_in.push(pass);
        }
        Ok(())
    }

    /// 累积资源用途，只做按位或
    pub fn add_usage(&mut self, name: &str, flags: RgResourceFlags) -> RgResult<()> {
        let res = self.get_resource_mut(name)?;
        res.usage |= flags;
        if res.usage.contains(RgResourceFlags::COLOR_ATTACHMENT | RgResourceFlags::DEPTH_STENCIL_ATTACHMENT) {
            log::warn!("resource \"{}\" is used as both color and depth-stencil attachment", name);
        }
        Ok(())
    }

    /// 标记资源内容在本帧之外已经初始化（导入资源等）
    pub fn mark_externally_initialized(&mut self, name: &str) -> RgResult<()> {
        self.get_resource_mut(name)?.externally_initialized = true;
        Ok(())
    }

    /// 清空所有资源的读写列表
    pub fn clear_access(&mut self) {
        for res in self.resources.values_mut() {
            res.read_in.clear();
            res.written_in.clear();
        }
    }

    fn get_resource_mut(&mut self, name: &str) -> RgResult<&mut RgLogicalResource> {
        self.resources.get_mut(name).ok_or_else(|| RgError::ResourceNotFound { name: name.to_string() })
    }
}

// getter & iter
impl RgResourceRegistry {
    #[inline]
    pub fn get_resource(&self, name: &str) -> Option<&RgLogicalResource> {
        self.resources.get(name)
    }

    #[inline]
    pub fn get(&self, handle: RgResourceHandle) -> Option<&RgLogicalResource> {
        self.resources.get_index(handle.index()).map(|(_, res)| res)
    }

    #[inline]
    pub fn handle_of(&self, name: &str) -> Option<RgResourceHandle> {
        self.resources.get_index_of(name).map(RgResourceHandle::new)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// 按声明顺序迭代所有资源
    pub fn iter(&self) -> impl Iterator<Item = (RgResourceHandle, &RgLogicalResource)> {
        self.resources.values().enumerate().map(|(index, res)| (RgResourceHandle::new(index), res))
    }
}
