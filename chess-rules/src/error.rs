//! 错误类型定义

use thiserror::Error;

/// 象棋规则错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChessError {
    /// 语法错误或局面不合法的 FEN
    #[error("Invalid FEN string: {reason}")]
    InvalidFen { reason: String },

    /// 无法解析或不合法的 SAN 走法
    #[error("Invalid SAN move '{san}': {reason}")]
    InvalidSan { san: String, reason: String },

    /// PGN 语法错误
    #[error("Invalid PGN: {reason}")]
    InvalidPgn { reason: String },
}

/// 规则操作结果类型
pub type Result<T> = std::result::Result<T, ChessError>;
