//! 配置
//!
//! JSON 格式，缺省位置为 `<用户配置目录>/chess-stego/config.json`。
//! 文件不存在时使用默认值；命令行参数优先于配置文件。

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chess_stego::EncodeOptions;
use serde::{Deserialize, Serialize};
use tracing::debug;

const APP_DIR: &str = "chess-stego";

/// 命令行配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StegoConfig {
    /// 编码选项的默认值
    pub encode: EncodeOptions,
    /// 元数据存储目录，缺省为用户数据目录下的 chess-stego/artifacts
    pub store_dir: Option<PathBuf>,
    /// 编码后是否记录元数据
    pub record_metadata: bool,
}

impl Default for StegoConfig {
    fn default() -> Self {
        Self {
            encode: EncodeOptions::default(),
            store_dir: None,
            record_metadata: true,
        }
    }
}

impl StegoConfig {
    /// 加载配置
    ///
    /// 显式指定的路径必须存在；缺省路径不存在时返回默认配置。
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match default_config_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        if !required && !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!("配置文件不存在，使用默认配置: {:?}", path);
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("读取配置文件失败: {:?}", path))?;
        let config = Self::from_json(&content)
            .with_context(|| format!("解析配置文件失败: {:?}", path))?;
        debug!("已加载配置: {:?}", path);
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// 元数据存储目录
    pub fn store_dir(&self) -> Result<PathBuf> {
        match &self.store_dir {
            Some(dir) => Ok(dir.clone()),
            None => {
                let data_dir = dirs::data_dir().context("无法获取应用数据目录")?;
                Ok(data_dir.join(APP_DIR).join("artifacts"))
            }
        }
    }
}

/// 缺省配置文件路径
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.json"))
}
