//! 前向渲染管线
//!
//! 每帧为每个相机声明：主光源和聚光灯的阴影 Pass、前向光栅 Pass 以及呈现 Pass。

use bitflags::bitflags;
use glam::Vec4;
use serde::{Deserialize, Serialize};

use crate::frame_graph::{
    FrameGraphBuilder, RgAccessType, RgCameraId, RgFormat, RgLightId, RgLoadOp, RgQueueHint, RgRasterView,
    RgResidency, RgResourceDesc, RgResult, RgSceneFlags,
};

/// 所有阴影 Pass 共享的阴影贴图
pub const SHADOW_MAP: &str = "dsShadowMap";
/// 前向 Pass 的颜色输出，同时也是呈现的目标
pub const FORWARD_COLOR: &str = "dsForwardPassColor";
pub const FORWARD_DEPTH_STENCIL: &str = "dsForwardPassDS";

/// 前向管线配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardPipelineSettings {
    pub shadows_enabled: bool,
    pub shadow_map_size: u32,
    pub shadow_map_format: RgFormat,
    /// 每个相机最多为多少个聚光灯生成阴影
    pub max_spot_light_shadows: usize,
}

impl Default for ForwardPipelineSettings {
    fn default() -> Self {
        Self {
            shadows_enabled: true,
            shadow_map_size: 1024,
            shadow_map_format: RgFormat::Depth32Float,
            max_spot_light_shadows: 4,
        }
    }
}

bitflags! {
    /// 相机的清除标记
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct RgClearFlags: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
        const SKYBOX = 1 << 3;

        const DEPTH_STENCIL = Self::DEPTH.bits() | Self::STENCIL.bits();
        const ALL = Self::COLOR.bits() | Self::DEPTH_STENCIL.bits();
    }
}

/// 管线需要的相机信息
#[derive(Clone, Debug)]
pub struct RgCamera {
    pub id: RgCameraId,
    pub width: u32,
    pub height: u32,
    pub clear_flags: RgClearFlags,
    pub clear_color: Vec4,
    /// 没有场景的相机不参与渲染
    pub has_scene: bool,
    pub main_light: Option<RgLightId>,
    pub spot_lights: Vec<RgLightId>,
    /// 场景中投射阴影的物体数量
    pub shadow_casters: usize,
}

impl RgCamera {
    pub fn new(id: u32, width: u32, height: u32) -> Self {
        Self {
            id: RgCameraId(id),
            width,
            height,
            clear_flags: RgClearFlags::ALL,
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            has_scene: true,
            main_light: None,
            spot_lights: Vec::new(),
            shadow_casters: 0,
        }
    }
}

/// 所有相机窗口的最大尺寸
pub fn backbuffer_extent(cameras: &[RgCamera]) -> (u32, u32) {
    cameras
        .iter()
        .filter(|camera| camera.has_scene)
        .fold((1, 1), |(width, height), camera| (width.max(camera.width), height.max(camera.height)))
}

pub struct ForwardPipeline {
    settings: ForwardPipelineSettings,
}

impl ForwardPipeline {
    pub fn new(settings: ForwardPipelineSettings) -> Self {
        Self { settings }
    }

    #[inline]
    pub fn settings(&self) -> &ForwardPipelineSettings {
        &self.settings
    }

    /// 开始新的一帧并声明所有相机的 Pass
    ///
    /// 总是开始新帧；没有相机时这一帧没有任何 Pass。
    pub fn build_frame(&self, graph: &mut FrameGraphBuilder, cameras: &[RgCamera]) -> RgResult<()> {
        let (width, height) = backbuffer_extent(cameras);
        graph.begin_frame(width, height);

        for (index, camera) in cameras.iter().enumerate().filter(|(_, camera)| camera.has_scene) {
            self.build_shadow_passes(graph, camera, &format!("Camera{}", index))?;
            self.build_forward_pass(graph, camera, index, (width, height))?;
            graph.add_present_pass(&format!("CameraPresentPass{}", index), FORWARD_COLOR)?;
        }
        Ok(())
    }

    fn build_shadow_passes(&self, graph: &mut FrameGraphBuilder, camera: &RgCamera, name: &str) -> RgResult<()> {
        if !self.settings.shadows_enabled {
            return Ok(());
        }

        let cast_shadow = camera.shadow_casters > 0;
        let map_size = if cast_shadow { self.settings.shadow_map_size } else { 1 };

        if let Some(light) = camera.main_light {
            self.build_shadow_pass(graph, camera, light, &format!("{}-MainLight", name), map_size, cast_shadow)?;
        }
        for (i, &light) in camera.spot_lights.iter().take(self.settings.max_spot_light_shadows).enumerate() {
            self.build_shadow_pass(graph, camera, light, &format!("{}-SpotLight{}", name, i), map_size, cast_shadow)?;
        }
        Ok(())
    }

    fn build_shadow_pass(
        &self,
        graph: &mut FrameGraphBuilder,
        camera: &RgCamera,
        light: RgLightId,
        pass_name: &str,
        map_size: u32,
        cast_shadow: bool,
    ) -> RgResult<()> {
        // 本帧第一个阴影 Pass 决定阴影贴图的尺寸
        if graph.get_resource(SHADOW_MAP).is_none() {
            graph.add_depth_stencil(
                SHADOW_MAP,
                self.settings.shadow_map_format,
                map_size,
                map_size,
                RgResidency::Transient,
            )?;
        }

        let pass = graph.add_raster_pass(pass_name, map_size, map_size)?;
        let mut builder = graph.pass_builder(pass)?;
        builder.add_raster_view(SHADOW_MAP, RgRasterView::clear_depth_stencil(1.0, 0))?;
        if cast_shadow {
            builder
                .add_queue(RgQueueHint::NoHint)
                .add_scene(format!("{}_shadowScene", pass_name))
                .add_scene_of_camera(camera.id, Some(light), RgSceneFlags::SHADOW_CASTER);
        }
        Ok(())
    }

    fn build_forward_pass(
        &self,
        graph: &mut FrameGraphBuilder,
        camera: &RgCamera,
        index: usize,
        (width, height): (u32, u32),
    ) -> RgResult<()> {
        graph.add_resource(
            FORWARD_COLOR,
            RgResourceDesc::texture_2d(RgFormat::Rgba8Unorm, width, height),
            RgResidency::Backbuffer,
        )?;
        let depth_format = graph.settings().default_depth_format;
        graph.add_depth_stencil(
            FORWARD_DEPTH_STENCIL,
            depth_format,
            width,
            height,
            RgResidency::Transient,
        )?;
        let has_shadow_map = graph.get_resource(SHADOW_MAP).is_some();

        let pass = graph.add_raster_pass(&format!("CameraForwardPass{}", index), camera.width, camera.height)?;
        let mut builder = graph.pass_builder(pass)?;
        if has_shadow_map {
            builder.add_raster_view(SHADOW_MAP, RgRasterView::render_target(RgAccessType::Read))?;
        }
        builder
            .add_raster_view(FORWARD_COLOR, Self::color_view(camera))?
            .add_raster_view(FORWARD_DEPTH_STENCIL, Self::depth_stencil_view(camera))?;

        builder.add_queue(RgQueueHint::RenderOpaque).add_scene_of_camera(
            camera.id,
            None,
            RgSceneFlags::OPAQUE_OBJECT | RgSceneFlags::CUTOUT_OBJECT,
        );
        builder.add_queue(RgQueueHint::RenderTransparent).add_scene_of_camera(
            camera.id,
            None,
            RgSceneFlags::TRANSPARENT_OBJECT,
        );
        Ok(())
    }

    /// 清除颜色时写入；天空盒会覆盖整个画面，丢弃旧内容；否则在旧内容上继续绘制
    fn color_view(camera: &RgCamera) -> RgRasterView {
        if camera.clear_flags.contains(RgClearFlags::COLOR) {
            RgRasterView::clear_color(camera.clear_color)
        } else if camera.clear_flags.contains(RgClearFlags::SKYBOX) {
            RgRasterView::render_target(RgAccessType::Write).with_load_op(RgLoadOp::Discard)
        } else {
            RgRasterView::render_target(RgAccessType::ReadWrite)
        }
    }

    /// 深度和模板都清除时才使用 Clear
    fn depth_stencil_view(camera: &RgCamera) -> RgRasterView {
        if camera.clear_flags.contains(RgClearFlags::DEPTH_STENCIL) {
            RgRasterView::clear_depth_stencil(1.0, 0)
        } else {
            RgRasterView::depth_stencil(RgAccessType::Write)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_graph::{RgHazard, RgQueueEntry};

    fn shadowed_camera(id: u32) -> RgCamera {
        let mut camera = RgCamera::new(id, 800, 600);
        camera.main_light = Some(RgLightId(0));
        camera.spot_lights = vec![RgLightId(1), RgLightId(2)];
        camera.shadow_casters = 3;
        camera
    }

    fn pipeline(max_spot_light_shadows: usize) -> ForwardPipeline {
        ForwardPipeline::new(ForwardPipelineSettings {
            max_spot_light_shadows,
            ..Default::default()
        })
    }

    #[test]
    fn test_single_camera_with_shadows() {
        let mut graph = FrameGraphBuilder::default();
        pipeline(1).build_frame(&mut graph, &[shadowed_camera(0)]).unwrap();
        let compiled = graph.build();

        let names: Vec<&str> = compiled.passes().map(|(_, pass)| pass.name()).collect();
        assert_eq!(
            names,
            vec!["Camera0-MainLight", "Camera0-SpotLight0", "CameraForwardPass0", "CameraPresentPass0"]
        );
        assert!(compiled.is_ok(), "{:?}", compiled.diagnostics());

        let main = compiled.find_pass("Camera0-MainLight").unwrap();
        let spot = compiled.find_pass("Camera0-SpotLight0").unwrap();
        let forward = compiled.find_pass("CameraForwardPass0").unwrap();
        let present = compiled.find_pass("CameraPresentPass0").unwrap();

        let graph = compiled.graph();
        assert_eq!(graph.edge_pairs(), vec![(main, spot), (spot, forward), (forward, present)]);
        assert!(
            graph
                .edge(main, spot)
                .unwrap()
                .dependencies
                .iter()
                .any(|&(_, hazard)| hazard == RgHazard::WriteAfterWrite)
        );
        assert_eq!(compiled.overwrites().len(), 1);

        let shadow_map = compiled.get_resource(SHADOW_MAP).unwrap();
        assert_eq!(shadow_map.desc().as_texture().unwrap().width, 1024);

        let forward_node = compiled.pass(forward).unwrap();
        assert_eq!(forward_node.extent(), Some((800, 600)));
        let hints: Vec<RgQueueHint> = forward_node.queues().iter().map(|queue| queue.hint()).collect();
        assert_eq!(hints, vec![RgQueueHint::RenderOpaque, RgQueueHint::RenderTransparent]);
    }

    #[test]
    fn test_shadows_disabled() {
        let mut graph = FrameGraphBuilder::default();
        let pipeline = ForwardPipeline::new(ForwardPipelineSettings {
            shadows_enabled: false,
            ..Default::default()
        });
        pipeline.build_frame(&mut graph, &[shadowed_camera(0)]).unwrap();
        let compiled = graph.build();

        assert_eq!(compiled.pass_count(), 2);
        assert!(compiled.get_resource(SHADOW_MAP).is_none());
        let forward = compiled.pass(compiled.find_pass("CameraForwardPass0").unwrap()).unwrap();
        assert!(forward.find_view(SHADOW_MAP).is_none());
    }

    #[test]
    fn test_no_shadow_casters_uses_minimal_map() {
        let mut graph = FrameGraphBuilder::default();
        let mut camera = shadowed_camera(0);
        camera.shadow_casters = 0;
        camera.spot_lights.clear();
        pipeline(4).build_frame(&mut graph, &[camera]).unwrap();
        let compiled = graph.build();

        let shadow_map = compiled.get_resource(SHADOW_MAP).unwrap();
        assert_eq!(shadow_map.desc().as_texture().unwrap().width, 1);
        let shadow_pass = compiled.pass(compiled.find_pass("Camera0-MainLight").unwrap()).unwrap();
        assert!(shadow_pass.queues().is_empty());
    }

    #[test]
    fn test_shadow_queue_entries() {
        let mut graph = FrameGraphBuilder::default();
        pipeline(0).build_frame(&mut graph, &[shadowed_camera(7)]).unwrap();
        let compiled = graph.build();

        let shadow_pass = compiled.pass(compiled.find_pass("Camera0-MainLight").unwrap()).unwrap();
        assert_eq!(
            shadow_pass.queues()[0].entries(),
            &[
                RgQueueEntry::Scene("Camera0-MainLight_shadowScene".to_string()),
                RgQueueEntry::Camera {
                    camera: RgCameraId(7),
                    light: Some(RgLightId(0)),
                    flags: RgSceneFlags::SHADOW_CASTER
                },
            ]
        );
    }

    #[test]
    fn test_clear_flags() {
        let mut graph = FrameGraphBuilder::default();
        let pipeline = pipeline(0);

        let mut skybox = RgCamera::new(0, 64, 64);
        skybox.clear_flags = RgClearFlags::SKYBOX | RgClearFlags::DEPTH;
        pipeline.build_frame(&mut graph, &[skybox]).unwrap();
        let forward = graph.get_pass(graph.find_pass("CameraForwardPass0").unwrap()).unwrap();
        let color = forward.find_view(FORWARD_COLOR).unwrap().as_raster().unwrap();
        assert_eq!(color.load_op, RgLoadOp::Discard);
        assert_eq!(color.access, RgAccessType::Write);
        let depth = forward.find_view(FORWARD_DEPTH_STENCIL).unwrap().as_raster().unwrap();
        assert_eq!(depth.load_op, RgLoadOp::Load);

        let mut overlay = RgCamera::new(0, 64, 64);
        overlay.clear_flags = RgClearFlags::DEPTH_STENCIL;
        pipeline.build_frame(&mut graph, &[overlay]).unwrap();
        let forward = graph.get_pass(graph.find_pass("CameraForwardPass0").unwrap()).unwrap();
        let color = forward.find_view(FORWARD_COLOR).unwrap().as_raster().unwrap();
        assert_eq!(color.load_op, RgLoadOp::Load);
        assert_eq!(color.access, RgAccessType::ReadWrite);
        let depth = forward.find_view(FORWARD_DEPTH_STENCIL).unwrap().as_raster().unwrap();
        assert_eq!(depth.load_op, RgLoadOp::Clear);

        // 后备缓冲区由外部初始化，在旧内容上绘制不产生诊断
        assert!(graph.build().is_ok());
    }

    #[test]
    fn test_two_cameras_share_resources() {
        let mut graph = FrameGraphBuilder::default();
        let mut second = shadowed_camera(1);
        second.width = 1920;
        second.height = 1080;
        pipeline(0).build_frame(&mut graph, &[shadowed_camera(0), second]).unwrap();
        let compiled = graph.build();

        assert_eq!(compiled.pass_count(), 6);
        let color = compiled.get_resource(FORWARD_COLOR).unwrap().desc().as_texture().unwrap().clone();
        assert_eq!((color.width, color.height), (1920, 1080));

        let forward0 = compiled.find_pass("CameraForwardPass0").unwrap();
        let present0 = compiled.find_pass("CameraPresentPass0").unwrap();
        let shadow1 = compiled.find_pass("Camera1-MainLight").unwrap();
        let forward1 = compiled.find_pass("CameraForwardPass1").unwrap();
        assert!(compiled.graph().has_edge(forward0, shadow1));
        assert!(compiled.graph().has_edge(present0, forward1));
    }

    #[test]
    fn test_camera_without_scene_skipped() {
        let mut graph = FrameGraphBuilder::default();
        let mut camera = RgCamera::new(0, 64, 64);
        camera.has_scene = false;
        pipeline(0).build_frame(&mut graph, &[camera, RgCamera::new(1, 32, 32)]).unwrap();

        assert!(graph.find_pass("CameraForwardPass0").is_none());
        assert!(graph.find_pass("CameraForwardPass1").is_some());
    }

    #[test]
    fn test_no_cameras_starts_empty_frame() {
        let mut graph = FrameGraphBuilder::default();
        let pipeline = pipeline(0);
        pipeline.build_frame(&mut graph, &[shadowed_camera(0)]).unwrap();
        graph.build();

        pipeline.build_frame(&mut graph, &[]).unwrap();
        assert_eq!(graph.pass_count(), 0);
        assert!(graph.compiled().is_none());

        let compiled = graph.build();
        assert_eq!(compiled.pass_count(), 0);
        assert!(compiled.is_ok());
        assert!(compiled.get_resource(FORWARD_COLOR).is_none());
    }

    #[test]
    fn test_backbuffer_extent() {
        let cameras = [RgCamera::new(0, 800, 300), RgCamera::new(1, 400, 600)];
        assert_eq!(backbuffer_extent(&cameras), (800, 600));
        assert_eq!(backbuffer_extent(&[]), (1, 1));
    }
}
