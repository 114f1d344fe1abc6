//! 编码过程中的对局
//!
//! 只追加不修改：`positions[i]` 是第 `i` 步走之前的局面，最后一个元素是当前局面。

use chess_rules::{Chess, GameRecord, GameResult, Move, Notation, Position};
use shakmaty::zobrist::{Zobrist64, ZobristHash};
use shakmaty::EnPassantMode;

/// 五十回合规则对应的半回合数
const FIFTY_MOVE_PLIES: u32 = 100;

/// 只追加的对局记录
#[derive(Debug, Clone)]
pub struct Game {
    positions: Vec<Chess>,
    /// 每个局面的重复判定键（棋子、走子方、易位权利、过路兵）
    keys: Vec<Zobrist64>,
    moves: Vec<Move>,
    /// 带将军/将死后缀的 SAN
    sans: Vec<String>,
}

impl Game {
    pub fn new(start: Chess) -> Self {
        let key = repetition_key(&start);
        Self {
            positions: vec![start],
            keys: vec![key],
            moves: Vec::new(),
            sans: Vec::new(),
        }
    }

    /// 当前局面
    pub fn current(&self) -> &Chess {
        // positions 至少包含起始局面
        &self.positions[self.positions.len() - 1]
    }

    pub fn start(&self) -> &Chess {
        &self.positions[0]
    }

    /// 已走的半回合数
    pub fn ply_count(&self) -> usize {
        self.moves.len()
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn sans(&self) -> &[String] {
        &self.sans
    }

    /// 在当前局面走一步，返回带后缀的 SAN
    ///
    /// `mv` 必须取自当前局面的合法走法。
    pub fn push(&mut self, mv: Move) -> &str {
        let san = Notation::to_san_with_suffix(self.current(), &mv);
        let mut next = self.current().clone();
        next.play_unchecked(&mv);

        self.keys.push(repetition_key(&next));
        self.positions.push(next);
        self.moves.push(mv);
        self.sans.push(san);
        &self.sans[self.sans.len() - 1]
    }

    /// 当前局面在本局中出现的次数（含当前这一次）
    pub fn repetitions(&self) -> usize {
        let current = self.keys[self.keys.len() - 1];
        self.keys.iter().filter(|&&key| key == current).count()
    }

    /// 可以按三次重复局面提和
    pub fn is_threefold_repetition(&self) -> bool {
        self.repetitions() >= 3
    }

    /// 可以按五十回合规则提和
    pub fn is_fifty_move_draw(&self) -> bool {
        self.current().halfmoves() >= FIFTY_MOVE_PLIES
    }

    /// 双方都没有将死对方的子力
    pub fn is_insufficient_material(&self) -> bool {
        self.current().is_insufficient_material()
    }

    /// 按当前局面判定的结果
    pub fn result(&self) -> GameResult {
        GameResult::from_position(self.current())
    }

    /// 转换为棋谱记录（只含走法与结果，标签由调用方写入）
    pub fn to_record(&self) -> GameRecord {
        let mut record = GameRecord::new();
        for san in &self.sans {
            record.add_move(san.clone());
        }
        record.set_result(self.result());
        record
    }
}

fn repetition_key(position: &Chess) -> Zobrist64 {
    position.zobrist_hash(EnPassantMode::Legal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_rules::Fen;

    fn play(game: &mut Game, san: &str) -> String {
        let mv = Notation::parse_san(game.current(), san).unwrap();
        game.push(mv).to_string()
    }

    #[test]
    fn test_append_only_history() {
        let mut game = Game::new(Chess::default());
        assert_eq!(game.ply_count(), 0);

        play(&mut game, "e4");
        play(&mut game, "e5");
        assert_eq!(game.ply_count(), 2);
        assert_eq!(game.start().board(), Chess::default().board());
        assert_eq!(game.sans(), &["e4".to_string(), "e5".to_string()]);
        assert_eq!(game.moves().len(), 2);
        assert_eq!(game.result(), GameResult::Ongoing);
    }

    #[test]
    fn test_suffixes_and_result() {
        let mut game = Game::new(Chess::default());
        for san in ["f3", "e5", "g4"] {
            play(&mut game, san);
        }
        assert_eq!(play(&mut game, "Qh4"), "Qh4#");
        assert_eq!(game.result(), GameResult::BlackWin);

        let record = game.to_record();
        assert_eq!(record.moves, vec!["f3", "e5", "g4", "Qh4#"]);
        assert_eq!(record.result, GameResult::BlackWin);
        assert_eq!(record.tag("Result"), Some("0-1"));
    }

    #[test]
    fn test_check_suffix() {
        let start = Fen::parse("4k3/8/8/8/8/8/8/R3K3 w Q - 0 1").unwrap();
        let mut game = Game::new(start);
        assert_eq!(play(&mut game, "Ra8+"), "Ra8+");
        assert_eq!(play(&mut game, "Kd7"), "Kd7");
        assert_eq!(game.result(), GameResult::Ongoing);
    }

    #[test]
    fn test_threefold_repetition() {
        let mut game = Game::new(Chess::default());
        assert_eq!(game.repetitions(), 1);
        for _ in 0..2 {
            for san in ["Nf3", "Nf6", "Ng1", "Ng8"] {
                play(&mut game, san);
            }
        }
        assert_eq!(game.repetitions(), 3);
        assert!(game.is_threefold_repetition());

        play(&mut game, "e4");
        assert_eq!(game.repetitions(), 1);
        assert!(!game.is_threefold_repetition());
    }

    #[test]
    fn test_fifty_move_clock() {
        let start = Fen::parse("4k3/8/8/8/8/8/8/R3K3 w - - 99 80").unwrap();
        let mut game = Game::new(start);
        assert!(!game.is_fifty_move_draw());
        play(&mut game, "Ra2");
        assert!(game.is_fifty_move_draw());
    }

    #[test]
    fn test_extreme_clock_does_not_overflow() {
        let start = Fen::parse("4k3/8/8/8/8/8/8/R3K3 w - - 4294967295 4294967295").unwrap();
        let mut game = Game::new(start);
        play(&mut game, "Ra2");
        play(&mut game, "Kd7");
        assert_eq!(game.current().halfmoves(), u32::MAX);
        assert!(game.is_fifty_move_draw());
    }

    #[test]
    fn test_insufficient_material() {
        let start = Fen::parse("4k3/8/8/8/8/8/4q3/4K3 w - - 0 1").unwrap();
        let mut game = Game::new(start);
        assert!(!game.is_insufficient_material());
        play(&mut game, "Kxe2");
        assert!(game.is_insufficient_material());
        assert_eq!(game.result(), GameResult::Draw);
    }
}
