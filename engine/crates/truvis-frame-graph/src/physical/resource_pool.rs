use std::collections::HashMap;

use slotmap::{SlotMap, new_key_type};

use crate::frame_graph::{RgCompiledFrame, RgResidency, RgResourceDesc, RgResourceFlags};
use crate::physical::device::{RgDevice, RgDeviceError, RgDeviceResult, RgPhysicalResource};

new_key_type! {
    /// 物理资源在资源池中的句柄
    pub struct RgPhysicalHandle;
}

/// 资源池中的一个物理资源
#[derive(Clone, Debug)]
pub struct RgPhysicalEntry {
    pub name: String,
    pub desc: RgResourceDesc,
    pub usage: RgResourceFlags,
    pub resource: RgPhysicalResource,
    /// 最后一次使用该资源的帧的 fence value
    pub fence_value: u64,
    /// 外部导入的资源，资源池不负责销毁
    pub imported: bool,
}

/// 物理资源池
///
/// `mount` 为已构建帧中引用的每个逻辑资源准备物理资源：描述不变时复用，
/// 否则重新创建；`unmount` 销毁长时间未使用的资源。
/// Backbuffer 和 External 资源需要事先通过 `import` 导入。
pub struct RgResourcePool {
    entries: SlotMap<RgPhysicalHandle, RgPhysicalEntry>,
    by_name: HashMap<String, RgPhysicalHandle>,
    retire_after_frames: u64,
}

// new & init
impl RgResourcePool {
    pub fn new(retire_after_frames: u64) -> Self {
        Self {
            entries: SlotMap::with_key(),
            by_name: HashMap::new(),
            retire_after_frames,
        }
    }

    /// 导入外部资源（交换链图像等）
    pub fn import(
        &mut self,
        name: &str,
        desc: RgResourceDesc,
        resource: RgPhysicalResource,
        fence_value: u64,
    ) -> RgPhysicalHandle {
        let entry = RgPhysicalEntry {
            name: name.to_string(),
            desc,
            usage: RgResourceFlags::empty(),
            resource,
            fence_value,
            imported: true,
        };
        match self.by_name.get(name).copied() {
            Some(handle) if self.entries.contains_key(handle) => {
                self.entries[handle] = entry;
                handle
            }
            _ => {
                let handle = self.entries.insert(entry);
                self.by_name.insert(name.to_string(), handle);
                handle
            }
        }
    }
}

// mount & unmount
impl RgResourcePool {
    /// 为已构建帧中引用的资源准备物理资源，并标记 fence value
    pub fn mount(
        &mut self,
        compiled: &RgCompiledFrame<'_>,
        device: &mut dyn RgDevice,
        fence_value: u64,
    ) -> RgDeviceResult<()> {
        for (_, res) in compiled.resources().iter().filter(|(_, res)| res.is_referenced()) {
            let name = res.name();
            if let Some(&handle) = self.by_name.get(name)
                && let Some(entry) = self.entries.get_mut(handle)
            {
                let compatible = entry.imported || (entry.desc == *res.desc() && entry.usage.contains(res.usage()));
                if compatible {
                    entry.fence_value = fence_value;
                    continue;
                }

                log::debug!("physical resource \"{}\" descriptor changed, recreate", name);
                Self::destroy_entry(device, entry);
                self.entries.remove(handle);
                self.by_name.remove(name);
            }

            if matches!(res.residency(), RgResidency::Backbuffer | RgResidency::External) {
                return Err(RgDeviceError::MissingPhysicalResource(name.to_string()));
            }

            let resource = match res.desc() {
                RgResourceDesc::Buffer(desc) => {
                    RgPhysicalResource::Buffer(device.create_buffer(name, desc, res.usage())?)
                }
                desc => RgPhysicalResource::Texture(device.create_texture(name, desc, res.usage())?),
            };
            let handle = self.entries.insert(RgPhysicalEntry {
                name: name.to_string(),
                desc: res.desc().clone(),
                usage: res.usage(),
                resource,
                fence_value,
                imported: false,
            });
            self.by_name.insert(name.to_string(), handle);
        }
        Ok(())
    }

    /// 销毁在 `completed_fence` 之前已经连续 `retire_after_frames` 帧未使用的资源
    ///
    /// 返回销毁的数量。导入的资源只移出资源池，不销毁。
    pub fn unmount(&mut self, completed_fence: u64, device: &mut dyn RgDevice) -> usize {
        let retire_after_frames = self.retire_after_frames;
        let expired: Vec<RgPhysicalHandle> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.fence_value + retire_after_frames <= completed_fence)
            .map(|(handle, _)| handle)
            .collect();

        let mut destroyed = 0;
        for handle in expired {
            if let Some(entry) = self.entries.remove(handle) {
                self.by_name.remove(&entry.name);
                if !entry.imported {
                    Self::destroy_entry(device, &entry);
                    destroyed += 1;
                }
            }
        }
        if destroyed > 0 {
            log::debug!("unmount: destroyed {} physical resources (completed fence {})", destroyed, completed_fence);
        }
        destroyed
    }

    /// 销毁所有非导入的资源
    pub fn destroy_all(&mut self, device: &mut dyn RgDevice) {
        for (_, entry) in self.entries.drain() {
            if !entry.imported {
                Self::destroy_entry(device, &entry);
            }
        }
        self.by_name.clear();
    }

    fn destroy_entry(device: &mut dyn RgDevice, entry: &RgPhysicalEntry) {
        match entry.resource {
            RgPhysicalResource::Texture(texture) => device.destroy_texture(texture),
            RgPhysicalResource::Buffer(buffer) => device.destroy_buffer(buffer),
        }
    }
}

// getters
impl RgResourcePool {
    #[inline]
    pub fn get(&self, name: &str) -> Option<&RgPhysicalEntry> {
        self.by_name.get(name).and_then(|&handle| self.entries.get(handle))
    }

    #[inline]
    pub fn physical(&self, name: &str) -> Option<RgPhysicalResource> {
        self.get(name).map(|entry| entry.resource)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec4;

    use super::*;
    use crate::frame_graph::{FrameGraphBuilder, RgFormat, RgPassKind, RgRasterView};
    use crate::physical::device::{RgDeviceTexture, RgNullDevice};

    fn declare_frame(graph: &mut FrameGraphBuilder, width: u32) {
        graph.begin_frame(width, 64);
        let p = graph.add_pass("P", RgPassKind::Raster).unwrap();
        graph.pass_builder(p).unwrap().add_raster_view("color", RgRasterView::clear_color(Vec4::ZERO)).unwrap();
    }

    #[test]
    fn test_mount_reuses_matching_resources() {
        let mut graph = FrameGraphBuilder::default();
        let mut device = RgNullDevice::new();
        let mut pool = RgResourcePool::new(2);

        declare_frame(&mut graph, 64);
        pool.mount(&graph.build(), &mut device, 1).unwrap();
        let first = pool.physical("color").unwrap();

        declare_frame(&mut graph, 64);
        pool.mount(&graph.build(), &mut device, 2).unwrap();
        assert_eq!(pool.physical("color"), Some(first));
        assert_eq!(pool.get("color").unwrap().fence_value, 2);
        assert_eq!(device.live_textures(), 1);

        // 尺寸变化时重新创建
        declare_frame(&mut graph, 128);
        pool.mount(&graph.build(), &mut device, 3).unwrap();
        assert_ne!(pool.physical("color"), Some(first));
        assert_eq!(device.live_textures(), 1);
    }

    #[test]
    fn test_unmount_retires_old_resources() {
        let mut graph = FrameGraphBuilder::default();
        let mut device = RgNullDevice::new();
        let mut pool = RgResourcePool::new(2);

        declare_frame(&mut graph, 64);
        pool.mount(&graph.build(), &mut device, 1).unwrap();

        assert_eq!(pool.unmount(2, &mut device), 0);
        assert_eq!(pool.unmount(3, &mut device), 1);
        assert!(pool.is_empty());
        assert_eq!(device.live_textures(), 0);
    }

    #[test]
    fn test_backbuffer_requires_import() {
        let mut graph = FrameGraphBuilder::default();
        let mut device = RgNullDevice::new();
        let mut pool = RgResourcePool::new(2);

        graph.begin_frame(64, 64);
        let desc = RgResourceDesc::texture_2d(RgFormat::Bgra8Unorm, 64, 64);
        graph.add_resource("swapchain", desc.clone(), RgResidency::Backbuffer).unwrap();
        graph.add_present_pass("Present", "swapchain").unwrap();

        let err = pool.mount(&graph.build(), &mut device, 1).unwrap_err();
        assert_eq!(err, RgDeviceError::MissingPhysicalResource("swapchain".to_string()));

        pool.import("swapchain", desc, RgPhysicalResource::Texture(RgDeviceTexture(42)), 0);
        pool.mount(&graph.compiled().unwrap(), &mut device, 1).unwrap();
        assert_eq!(device.live_textures(), 0);

        // 导入的资源过期后只移出资源池
        assert_eq!(pool.unmount(10, &mut device), 0);
        assert!(pool.get("swapchain").is_none());
    }
}
