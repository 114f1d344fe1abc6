//! FEN 格式解析
//!
//! 标准 FEN 格式：
//! `<棋盘> <走子方> <易位权利> <过路兵格> <半回合数> <回合数>`
//!
//! 示例：
//! `rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1`

use shakmaty::fen::Fen as FenText;
use shakmaty::{CastlingMode, Chess};

use crate::error::ChessError;

/// 初始局面 FEN
pub const INITIAL_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// FEN 格式处理
pub struct Fen;

impl Fen {
    /// 解析 FEN 字符串为局面
    ///
    /// 半回合数和回合数可以省略。除语法外还检查局面本身：
    /// 双方各一个王、底线没有兵、不走棋的一方不能处于被将军状态等。
    pub fn parse(fen: &str) -> Result<Chess, ChessError> {
        let text: FenText = fen
            .trim()
            .parse()
            .map_err(|err| invalid(format!("{}", err)))?;
        text.into_position(CastlingMode::Standard)
            .map_err(|err| invalid(format!("{}", err)))
    }
}

fn invalid(reason: String) -> ChessError {
    ChessError::InvalidFen { reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::{perft, Color, Position, Square};

    #[test]
    fn test_parse_initial_fen() {
        let pos = Fen::parse(INITIAL_FEN).unwrap();
        assert_eq!(pos.board(), Chess::default().board());
        assert_eq!(pos.turn(), Color::White);
        assert_eq!(perft(&pos, 3), 8902);
    }

    #[test]
    fn test_parse_custom_fen() {
        let pos = Fen::parse("4k3/8/8/3pP3/8/8/8/4K3 w - d6 3 12").unwrap();
        assert_eq!(pos.turn(), Color::White);
        assert_eq!(pos.halfmoves(), 3);
        assert_eq!(pos.fullmoves().get(), 12);
        assert!(pos
            .legal_moves()
            .iter()
            .any(|mv| mv.is_en_passant() && mv.to() == Square::D6));
    }

    #[test]
    fn test_castling_rights_survive_parsing() {
        // Kiwipete：易位、过路兵、升变都会出现
        let pos =
            Fen::parse("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1")
                .unwrap();
        assert_eq!(perft(&pos, 1), 48);
        assert_eq!(perft(&pos, 2), 2039);
    }

    #[test]
    fn test_optional_counters() {
        let pos = Fen::parse("4k3/8/8/8/8/8/8/4K3 b - -").unwrap();
        assert_eq!(pos.halfmoves(), 0);
        assert_eq!(pos.fullmoves().get(), 1);
    }

    #[test]
    fn test_extreme_counters_are_accepted() {
        let pos = Fen::parse("4k3/8/8/8/8/8/8/R3K3 w - - 4294967295 4294967295").unwrap();
        assert_eq!(pos.halfmoves(), u32::MAX);
        assert_eq!(pos.fullmoves().get(), u32::MAX);
    }

    #[test]
    fn test_opponent_in_check_is_rejected() {
        // 白方走棋时黑王已被车将军，局面不可能出现
        assert!(matches!(
            Fen::parse("4k3/8/8/8/8/8/8/4RK2 w - - 0 1"),
            Err(ChessError::InvalidFen { .. })
        ));
    }

    #[test]
    fn test_invalid_fen() {
        // 行数不对
        assert!(Fen::parse("8/8/8 w - -").is_err());
        // 列数不对
        assert!(Fen::parse("9/8/8/8/8/8/8/4K2k w - -").is_err());
        // 无效字符
        assert!(Fen::parse("4x3/8/8/8/8/8/8/4K2k w - -").is_err());
        // 缺少王
        assert!(Fen::parse("8/8/8/8/8/8/8/4K3 w - -").is_err());
        // 底线上的兵
        assert!(Fen::parse("P3k3/8/8/8/8/8/8/4K3 w - -").is_err());
        // 走子方错误
        assert!(Fen::parse(&INITIAL_FEN.replace(" w ", " x ")).is_err());
        assert!(Fen::parse("").is_err());
    }
}
