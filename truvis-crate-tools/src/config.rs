//! TOML 配置文件读取
//!
//! 各个 crate 的配置结构体只需要实现 serde 的 trait，
//! 读写逻辑统一放在这里。

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;

/// 从 TOML 文件加载配置
pub fn load_toml<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> anyhow::Result<T> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).with_context(|| format!("读取配置文件失败: {:?}", path))?;

    parse_toml(&content).with_context(|| format!("解析 TOML 配置失败: {:?}", path))
}

/// 加载配置，文件不存在时使用默认值
pub fn load_toml_or_default<T: DeserializeOwned + Default, P: AsRef<Path>>(path: P) -> anyhow::Result<T> {
    let path = path.as_ref();
    if !path.exists() {
        log::info!("配置文件 {:?} 不存在，使用默认配置", path);
        return Ok(T::default());
    }

    load_toml(path)
}

/// 从字符串解析配置
pub fn parse_toml<T: DeserializeOwned>(content: &str) -> anyhow::Result<T> {
    let config = toml::from_str(content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Deserialize)]
    #[serde(default)]
    struct DemoConfig {
        name: String,
        count: u32,
    }

    #[test]
    fn test_parse_partial_config() {
        let config: DemoConfig = parse_toml("count = 3").unwrap();
        assert_eq!(config, DemoConfig { name: String::new(), count: 3 });
    }

    #[test]
    fn test_parse_invalid_config() {
        let result: anyhow::Result<DemoConfig> = parse_toml("count = \"three\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file_uses_default() {
        let path = std::env::temp_dir().join("truvis-crate-tools-missing-config.toml");
        let config: DemoConfig = load_toml_or_default(&path).unwrap();
        assert_eq!(config, DemoConfig::default());
    }

    #[test]
    fn test_load_existing_file() {
        let path = std::env::temp_dir().join(format!("truvis-crate-tools-{}.toml", std::process::id()));
        fs::write(&path, "name = \"forward\"\ncount = 2\n").unwrap();

        let loaded: DemoConfig = load_toml_or_default(&path).unwrap();
        assert_eq!(loaded, DemoConfig { name: "forward".to_string(), count: 2 });

        fs::remove_file(&path).unwrap();
    }
}
