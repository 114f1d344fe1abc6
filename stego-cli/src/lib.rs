//! chess-stego 命令行
//!
//! 负责文件读写、配置加载、元数据记录与内容指纹，编解码本身由 `chess-stego` 完成。

pub mod cli;
pub mod commands;
pub mod config;
pub mod fingerprint;
pub mod storage;

pub use config::StegoConfig;
pub use storage::{ArtifactMetadata, FileMetadataStore, MetadataStore};
