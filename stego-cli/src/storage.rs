//! 产物元数据存储
//!
//! 每条记录保存为存储目录下的一个 `<identifier>.json` 文件。

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

/// 一次编码的元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub identifier: Uuid,
    /// 原始文件名（不含路径）
    pub original_filename: String,
    /// 原始文件扩展名，没有时为 `bin`
    pub file_type: String,
    pub created_at: DateTime<Utc>,
    /// 载荷的 BLAKE3 指纹
    pub payload_hash: String,
    /// PGN 产物的 BLAKE3 指纹
    pub artifact_hash: String,
    pub payload_bytes: u64,
    pub games: usize,
    pub plies: usize,
    pub expiry_unix_time: Option<i64>,
}

impl ArtifactMetadata {
    /// 新建记录，分配随机标识
    pub fn new(original_filename: &str, payload_hash: String, artifact_hash: String) -> Self {
        let file_type = Path::new(original_filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_else(|| "bin".to_string());
        Self {
            identifier: Uuid::new_v4(),
            original_filename: original_filename.to_string(),
            file_type,
            created_at: Utc::now(),
            payload_hash,
            artifact_hash,
            payload_bytes: 0,
            games: 0,
            plies: 0,
            expiry_unix_time: None,
        }
    }
}

/// 元数据存储接口
pub trait MetadataStore {
    /// 写入（同标识则覆盖）
    fn put(&self, metadata: &ArtifactMetadata) -> Result<()>;

    fn get(&self, identifier: &Uuid) -> Result<Option<ArtifactMetadata>>;

    /// 全部记录，按创建时间倒序
    fn list(&self) -> Result<Vec<ArtifactMetadata>>;

    /// 按载荷或产物指纹查找
    fn find_by_hash(&self, hash: &str) -> Result<Vec<ArtifactMetadata>> {
        let hash = hash.to_ascii_lowercase();
        Ok(self
            .list()?
            .into_iter()
            .filter(|m| m.payload_hash == hash || m.artifact_hash == hash)
            .collect())
    }

    /// 删除记录，返回是否存在
    fn delete(&self, identifier: &Uuid) -> Result<bool>;
}

/// 基于 JSON 文件的元数据存储
pub struct FileMetadataStore {
    dir: PathBuf,
}

impl FileMetadataStore {
    /// 打开存储目录，不存在时创建
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir).with_context(|| format!("无法创建存储目录: {:?}", dir))?;
        }
        Ok(Self { dir })
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, identifier: &Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", identifier))
    }

    fn load(path: &Path) -> Result<ArtifactMetadata> {
        let content =
            fs::read_to_string(path).with_context(|| format!("读取文件失败: {:?}", path))?;
        serde_json::from_str(&content).with_context(|| format!("解析元数据失败: {:?}", path))
    }
}

impl MetadataStore for FileMetadataStore {
    fn put(&self, metadata: &ArtifactMetadata) -> Result<()> {
        let path = self.path_for(&metadata.identifier);
        let json = serde_json::to_string_pretty(metadata).context("序列化元数据失败")?;
        fs::write(&path, json).with_context(|| format!("写入文件失败: {:?}", path))?;
        debug!("已记录元数据 {}", metadata.identifier);
        Ok(())
    }

    fn get(&self, identifier: &Uuid) -> Result<Option<ArtifactMetadata>> {
        let path = self.path_for(identifier);
        if !path.exists() {
            return Ok(None);
        }
        Self::load(&path).map(Some)
    }

    fn list(&self) -> Result<Vec<ArtifactMetadata>> {
        let mut records = Vec::new();
        if !self.dir.exists() {
            return Ok(records);
        }

        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("读取存储目录失败: {:?}", self.dir))?;
        for entry in entries {
            let path = entry.context("读取目录项失败")?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            match Self::load(&path) {
                Ok(record) => records.push(record),
                Err(err) => warn!("跳过损坏的元数据文件 {:?}: {:#}", path, err),
            }
        }

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    fn delete(&self, identifier: &Uuid) -> Result<bool> {
        let path = self.path_for(identifier);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).with_context(|| format!("删除文件失败: {:?}", path))?;
        Ok(true)
    }
}
