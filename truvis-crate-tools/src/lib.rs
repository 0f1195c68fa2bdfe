//! Truvis 工具集
//!
//! 提供日志初始化、资源路径管理、TOML 配置加载等通用工具。
//!
//! # TruvisPath
//! 基于工作区根目录的统一路径管理，避免硬编码相对路径。
//!
//! # 配置
//! 任意实现了 serde trait 的结构体都可以通过 [`config::load_toml`] 从 TOML 文件加载。

pub mod config;
pub mod init_log;
pub mod resource;
