//! 编解码错误类型

use chess_rules::ChessError;
use thiserror::Error;

/// 编码容量耗尽的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityLimit {
    /// 对局到达将死或逼和
    Terminal,
    /// 到达半回合上限
    PlyCap,
}

impl std::fmt::Display for CapacityLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapacityLimit::Terminal => f.write_str("game reached a terminal position"),
            CapacityLimit::PlyCap => f.write_str("ply limit reached"),
        }
    }
}

/// 编码错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// 载荷位未写完就无法继续走子
    #[error("Capacity exceeded at ply {ply}: encoded {encoded_bits} of {total_bits} bits ({reason})")]
    CapacityExceeded {
        ply: usize,
        encoded_bits: u64,
        total_bits: u64,
        reason: CapacityLimit,
    },

    /// 自定义标签试图覆盖编解码保留标签
    #[error("Header tag '{tag}' is reserved")]
    ReservedHeader { tag: String },

    /// 标签名不是合法的 PGN 符号
    #[error("Invalid header tag name '{tag}'")]
    InvalidHeaderName { tag: String },

    #[error("Invalid start position: {0}")]
    InvalidStartPosition(#[from] ChessError),
}

/// 解码错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Malformed header tag '{tag}': {reason}")]
    MalformedHeader { tag: String, reason: String },

    /// 已过有效期，不提取任何载荷
    #[error("Message expired {} ago (expiry {expiry}, now {now})", format_age(.now, .expiry))]
    MessageExpired { expiry: i64, now: i64 },

    /// 走法无法解析或不在该局面的合法走法中
    #[error("Move '{san}' (game {game}, ply {ply}) is not in the legal move set")]
    MoveNotInLegalSet { game: usize, ply: usize, san: String },

    /// 走法合法，但其序号超出了该局面可承载的编码范围
    #[error("Move '{san}' (game {game}, ply {ply}) has index {index} outside the {width}-bit code space")]
    MoveOutsideCodeSpace {
        game: usize,
        ply: usize,
        san: String,
        index: usize,
        width: u32,
    },

    #[error("Truncated payload: expected {expected} bits, recovered {recovered}")]
    TruncatedPayload { expected: u64, recovered: u64 },

    /// PGN 语法错误、没有对局、起始局面无效等
    #[error("Invalid artifact: {reason}")]
    InvalidArtifact { reason: String },
}

impl DecodeError {
    /// 是否因过期而拒绝
    pub fn is_expired(&self) -> bool {
        matches!(self, DecodeError::MessageExpired { .. })
    }
}

impl From<ChessError> for DecodeError {
    fn from(err: ChessError) -> Self {
        DecodeError::InvalidArtifact {
            reason: err.to_string(),
        }
    }
}

fn format_age(now: &i64, expiry: &i64) -> String {
    let seconds = now.saturating_sub(*expiry).max(0);
    match seconds {
        s if s < 60 => format!("{}s", s),
        s if s < 3600 => format!("{}m {}s", s / 60, s % 60),
        s if s < 86_400 => format!("{}h {}m", s / 3600, (s % 3600) / 60),
        s => format!("{}d {}h", s / 86_400, (s % 86_400) / 3600),
    }
}
