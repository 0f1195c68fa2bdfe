//! 用空设备跑几帧前向管线，打印每帧的执行计划

use anyhow::Context;
use glam::Vec4;
use serde::{Deserialize, Serialize};
use truvis_crate_tools::config::load_toml_or_default;
use truvis_crate_tools::init_log::init_log;
use truvis_crate_tools::resource::TruvisPath;
use truvis_frame_graph::forward_pipeline::{
    FORWARD_COLOR, ForwardPipeline, ForwardPipelineSettings, RgCamera, RgClearFlags, backbuffer_extent,
};
use truvis_frame_graph::frame_graph::{FrameGraphBuilder, RgFormat, RgLightId, RgResourceDesc};
use truvis_frame_graph::physical::{RgDeviceTexture, RgFrameExecutor, RgNullDevice, RgPhysicalResource, RgResourcePool};
use truvis_frame_graph::settings::FrameGraphSettings;

/// `config/frame-graph.toml`
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ForwardFrameConfig {
    frame_graph: FrameGraphSettings,
    forward_pipeline: ForwardPipelineSettings,
    frames: u32,
}

fn scene_cameras(frame: u32) -> Vec<RgCamera> {
    let mut main = RgCamera::new(0, 1280, 720);
    main.main_light = Some(RgLightId(0));
    main.spot_lights = vec![RgLightId(1), RgLightId(2)];
    main.shadow_casters = 16;
    main.clear_flags = RgClearFlags::DEPTH_STENCIL | RgClearFlags::SKYBOX;

    // 第二帧开始多一个画中画相机
    if frame == 0 {
        return vec![main];
    }
    let mut overlay = RgCamera::new(1, 320, 180);
    overlay.clear_flags = RgClearFlags::ALL;
    overlay.clear_color = Vec4::new(0.1, 0.1, 0.1, 1.0);
    vec![main, overlay]
}

fn main() -> anyhow::Result<()> {
    init_log();

    let config_path = TruvisPath::config_path("frame-graph.toml");
    let mut config: ForwardFrameConfig =
        load_toml_or_default(&config_path).with_context(|| format!("加载配置失败: {:?}", config_path))?;
    if config.frames == 0 {
        config.frames = 3;
    }
    config.frame_graph.print_execution_plan = true;
    log::info!("config: {:?}", config);

    let retire_after_frames = config.frame_graph.retire_after_frames;
    let mut graph = FrameGraphBuilder::new(config.frame_graph);
    let pipeline = ForwardPipeline::new(config.forward_pipeline);
    let mut device = RgNullDevice::new();
    let mut pool = RgResourcePool::new(retire_after_frames);
    let mut executor = RgFrameExecutor::new();

    for frame in 0..config.frames {
        let cameras = scene_cameras(frame);
        pipeline.build_frame(&mut graph, &cameras)?;

        let (width, height) = backbuffer_extent(&cameras);
        pool.import(
            FORWARD_COLOR,
            RgResourceDesc::texture_2d(RgFormat::Rgba8Unorm, width, height),
            RgPhysicalResource::Texture(RgDeviceTexture(u64::MAX - frame as u64)),
            executor.fence_value(),
        );

        let compiled = graph.build();
        for diagnostic in compiled.diagnostics() {
            log::warn!("frame {}: {}", frame, diagnostic);
        }
        let stats = executor.execute(&compiled, &mut pool, &mut device)?;
        log::info!("frame {}: {:?}, transient memory {} bytes", frame, stats, compiled.transient_memory());

        // 空设备上提交即完成
        let destroyed = pool.unmount(stats.fence_value, &mut device);
        log::info!("frame {}: {} events, {} resources retired", frame, device.take_events().len(), destroyed);
    }

    pool.destroy_all(&mut device);
    log::info!("live textures after shutdown: {}", device.live_textures());
    Ok(())
}
