//! 国际象棋隐写编解码
//!
//! 把任意字节序列编码为一局（或多局）合法的国际象棋对局，并从对局中还原原始字节。
//!
//! 包含:
//! - 走法空间枚举：给定局面的合法走法按规范顺序排列
//! - 编解码引擎：位流与走法选择之间的双向映射
//! - 帧序列化：载荷长度、种子、过期时间等写入 PGN 标签

mod bits;
mod decode;
mod encode;
mod enumerate;
mod error;
mod frame;
mod game;
mod options;

pub use bits::{BitReader, BitWriter};
pub use decode::{decode, decode_records, inspect, ArtifactSummary, GameSummary};
pub use encode::{encode, EncodeStats, EncodedArtifact, Encoder};
pub use enumerate::{capacity_bits, legal_moves, LegalMoveSet, MoveOrdering};
pub use error::{CapacityLimit, DecodeError, EncodeError};
pub use frame::{game_seed, Header, RESERVED_TAGS};
pub use game::Game;
pub use options::{
    EncodeOptions, GameEndPolicy, MoveOrder, DEFAULT_MAX_PLIES, DEFAULT_PLIES_PER_GAME, SEED_RANGE,
};
