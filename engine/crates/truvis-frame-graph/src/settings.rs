use serde::{Deserialize, Serialize};
use truvis_crate_tools::config;

use crate::frame_graph::RgFormat;

/// FrameGraph 配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameGraphSettings {
    /// 隐式创建纹理的宽度，`begin_frame` 每帧更新
    pub backbuffer_width: u32,
    /// 隐式创建纹理的高度，`begin_frame` 每帧更新
    pub backbuffer_height: u32,
    pub default_color_format: RgFormat,
    pub default_depth_format: RgFormat,
    /// 持久资源在帧开始时是否视为已初始化（影响先读后写的检查）
    pub persistent_is_initialized: bool,
    /// 每次 `build()` 之后打印执行计划
    pub print_execution_plan: bool,
    /// 物理资源在多少帧未使用之后被销毁
    pub retire_after_frames: u64,
}

impl Default for FrameGraphSettings {
    fn default() -> Self {
        Self {
            backbuffer_width: 1280,
            backbuffer_height: 720,
            default_color_format: RgFormat::Rgba8Unorm,
            default_depth_format: RgFormat::Depth24Stencil8,
            persistent_is_initialized: true,
            print_execution_plan: false,
            retire_after_frames: 3,
        }
    }
}

impl FrameGraphSettings {
    /// 从 TOML 字符串解析，未出现的字段使用默认值
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        config::parse_toml(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml() {
        let settings = FrameGraphSettings::from_toml_str(
            r#"
            backbuffer_width = 1920
            default_depth_format = "depth32_float"
            print_execution_plan = true
            "#,
        )
        .unwrap();

        assert_eq!(settings.backbuffer_width, 1920);
        assert_eq!(settings.backbuffer_height, 720);
        assert_eq!(settings.default_depth_format, RgFormat::Depth32Float);
        assert!(settings.print_execution_plan);
        assert!(settings.persistent_is_initialized);
    }

    #[test]
    fn test_invalid_format_rejected() {
        assert!(FrameGraphSettings::from_toml_str("default_color_format = \"rgb565\"").is_err());
    }
}
