//! 国际象棋规则库
//!
//! 走法生成与局面合法性由 `shakmaty` 提供，这里补充编解码需要的部分:
//! - FEN 解析（拒绝不合法的局面）
//! - 标准代数记谱法 (SAN) 的生成与宽松解析
//! - 多局 PGN 棋谱的读写

mod error;
mod fen;
mod notation;
mod record;

pub use error::{ChessError, Result};
pub use fen::{Fen, INITIAL_FEN};
pub use notation::Notation;
pub use record::{GameRecord, GameResult, PGN_LINE_WIDTH, SEVEN_TAG_ROSTER};
pub use shakmaty::{Chess, Color, Move, Position, Role, Square};
