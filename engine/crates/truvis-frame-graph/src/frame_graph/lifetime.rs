//! 资源生命周期
//!
//! 生命周期是资源在本帧第一次和最后一次被 Pass 引用的区间。
//! FrameGraph 本身不做 aliasing，只给出描述相同且生命周期不重叠的临时资源对，
//! 由执行器决定是否共享物理内存。

use itertools::Itertools;

use crate::frame_graph::handle::{RgPassHandle, RgResourceHandle};
use crate::frame_graph::resource_registry::RgResourceRegistry;

/// 资源在本帧的生命周期（闭区间）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RgResourceLifetime {
    pub resource: RgResourceHandle,
    pub first_use: RgPassHandle,
    pub last_use: RgPassHandle,
}

impl RgResourceLifetime {
    /// 在 `pass` 执行时资源是否存活
    #[inline]
    pub fn is_alive(&self, pass: RgPassHandle) -> bool {
        self.first_use <= pass && pass <= self.last_use
    }

    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.first_use <= other.last_use && other.first_use <= self.last_use
    }
}

/// 可以共享物理内存的一对临时资源
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RgAliasCandidate {
    pub first: RgResourceHandle,
    pub second: RgResourceHandle,
}

/// 计算所有被引用资源的生命周期，按资源声明顺序
pub fn compute_lifetimes(resources: &RgResourceRegistry) -> Vec<RgResourceLifetime> {
    resources
        .iter()
        .filter_map(|(handle, res)| {
            let (first_use, last_use) = res.read_in().iter().chain(res.written_in()).copied().minmax().into_option()?;
            Some(RgResourceLifetime {
                resource: handle,
                first_use,
                last_use,
            })
        })
        .collect()
}

/// 找出描述相同、生命周期不重叠的临时资源对
pub fn find_alias_candidates(resources: &RgResourceRegistry, lifetimes: &[RgResourceLifetime]) -> Vec<RgAliasCandidate> {
    lifetimes
        .iter()
        .filter(|lifetime| resources.get(lifetime.resource).is_some_and(|res| res.is_transient()))
        .tuple_combinations()
        .filter(|(a, b)| !a.overlaps(b))
        .filter(|(a, b)| {
            match (resources.get(a.resource), resources.get(b.resource)) {
                (Some(ra), Some(rb)) => ra.desc() == rb.desc(),
                _ => false,
            }
        })
        .map(|(a, b)| RgAliasCandidate {
            first: a.resource,
            second: b.resource,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_graph::resource::{RgFormat, RgResidency, RgResourceDesc};
    use crate::frame_graph::view::RgAccessType;

    fn desc() -> RgResourceDesc {
        RgResourceDesc::texture_2d(RgFormat::Rgba8Unorm, 64, 64)
    }

    #[test]
    fn test_lifetimes_and_aliasing() {
        let mut registry = RgResourceRegistry::new();
        registry.add_resource("a", desc(), RgResidency::Transient).unwrap();
        registry.add_resource("b", desc(), RgResidency::Transient).unwrap();
        registry.add_resource("c", desc(), RgResidency::Transient).unwrap();
        registry.add_resource("history", desc(), RgResidency::Persistent).unwrap();
        registry.add_resource("unused", desc(), RgResidency::Transient).unwrap();

        // a: [0, 1]  b: [2, 3]  c: [1, 2]  history: [3, 3]
        registry.record_access("a", RgPassHandle::new(0), RgAccessType::Write).unwrap();
        registry.record_access("a", RgPassHandle::new(1), RgAccessType::Read).unwrap();
        registry.record_access("c", RgPassHandle::new(1), RgAccessType::Write).unwrap();
        registry.record_access("b", RgPassHandle::new(2), RgAccessType::Write).unwrap();
        registry.record_access("c", RgPassHandle::new(2), RgAccessType::Read).unwrap();
        registry.record_access("b", RgPassHandle::new(3), RgAccessType::Read).unwrap();
        registry.record_access("history", RgPassHandle::new(3), RgAccessType::Write).unwrap();

        let lifetimes = compute_lifetimes(&registry);
        assert_eq!(lifetimes.len(), 4);
        let a = lifetimes[0];
        assert_eq!((a.first_use, a.last_use), (RgPassHandle::new(0), RgPassHandle::new(1)));
        assert!(a.is_alive(RgPassHandle::new(1)));
        assert!(!a.is_alive(RgPassHandle::new(2)));

        let candidates = find_alias_candidates(&registry, &lifetimes);
        let a = registry.handle_of("a").unwrap();
        let b = registry.handle_of("b").unwrap();
        // 只有 a 和 b 不重叠；history 不是临时资源
        assert_eq!(candidates, vec![RgAliasCandidate { first: a, second: b }]);
    }

    #[test]
    fn test_different_desc_not_aliased() {
        let mut registry = RgResourceRegistry::new();
        registry.add_resource("a", desc(), RgResidency::Transient).unwrap();
        registry
            .add_resource("b", RgResourceDesc::texture_2d(RgFormat::Rgba16Float, 64, 64), RgResidency::Transient)
            .unwrap();
        registry.record_access("a", RgPassHandle::new(0), RgAccessType::Write).unwrap();
        registry.record_access("b", RgPassHandle::new(1), RgAccessType::Write).unwrap();

        let lifetimes = compute_lifetimes(&registry);
        assert!(find_alias_candidates(&registry, &lifetimes).is_empty());
    }
}
