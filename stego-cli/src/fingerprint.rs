//! 内容指纹（BLAKE3，十六进制）

/// 计算 256 位 BLAKE3 摘要的十六进制形式
pub fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(blake3::hash(bytes).as_bytes())
}

/// 显示用的短指纹
pub fn short(fingerprint: &str) -> &str {
    fingerprint.get(..12).unwrap_or(fingerprint)
}
