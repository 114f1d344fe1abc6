//! 编码
//!
//! 从起始局面开始，每一步：
//! 1. 取当前局面的有序合法走法，共 `len` 个
//! 2. `n = floor(log2(len))`，`n == 0` 时走唯一的走法，不消耗载荷
//! 3. 否则读取 `n` 位作为序号 `k`（不足时右侧补零），走第 `k` 个走法
//!
//! 因为 `k < 2^n <= len`，序号总是有效。
//!
//! 串联模式下，对局到达终局、单局上限或 [`GameEndPolicy`] 列出的和棋局面时，
//! 从起始局面开新的一局继续编码。
//!
//! [`GameEndPolicy`]: crate::options::GameEndPolicy

use chess_rules::{Chess, Fen, GameRecord};
use chrono::Utc;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::bits::BitReader;
use crate::enumerate::{legal_moves, MoveOrdering};
use crate::error::{CapacityLimit, EncodeError};
use crate::frame::{game_seed, Header};
use crate::game::Game;
use crate::options::{EncodeOptions, SEED_RANGE};

/// 编码统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EncodeStats {
    /// 载荷位数
    pub payload_bits: u64,
    /// 全部半回合数（含诱饵）
    pub total_plies: usize,
    /// 承载载荷的半回合数
    pub carrying_plies: usize,
    /// 只有一个合法走法的半回合数
    pub forced_plies: usize,
    /// 诱饵半回合数
    pub trailing_plies: usize,
    /// 对局数
    pub games: usize,
}

impl EncodeStats {
    /// 平均每个承载半回合的位数
    pub fn bits_per_carrying_ply(&self) -> f64 {
        if self.carrying_plies == 0 {
            0.0
        } else {
            self.payload_bits as f64 / self.carrying_plies as f64
        }
    }
}

/// 编码产物
#[derive(Debug, Clone)]
pub struct EncodedArtifact {
    pub header: Header,
    /// 已写好标签的对局
    pub games: Vec<GameRecord>,
    pub stats: EncodeStats,
}

impl EncodedArtifact {
    /// 导出为 PGN 文本，多局之间空一行
    pub fn to_pgn(&self) -> String {
        self.games
            .iter()
            .map(GameRecord::to_pgn)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// 编码器
#[derive(Debug, Clone, Default)]
pub struct Encoder {
    options: EncodeOptions,
}

impl Encoder {
    pub fn new(options: EncodeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    /// 把载荷编码为一局或多局对局
    pub fn encode(&self, payload: &[u8]) -> Result<EncodedArtifact, EncodeError> {
        let options = &self.options;
        let start = match &options.start_fen {
            Some(fen) => Fen::parse(fen)?,
            None => Chess::default(),
        };
        let seed = options
            .seed
            .unwrap_or_else(|| rand::thread_rng().gen_range(SEED_RANGE));
        let encode_time = options.encode_time.unwrap_or_else(|| Utc::now().timestamp());

        let mut reader = BitReader::new(payload);
        let total_bits = reader.bit_len();
        let header = Header::for_encode(total_bits, seed, encode_time, options)?;

        info!(
            "开始编码: {} 字节, 种子 {}, 排列方式 {}",
            payload.len(),
            seed,
            options.move_order
        );

        let mut session = Session {
            options,
            start: start.clone(),
            seed,
            finished: Vec::new(),
            game: Game::new(start),
            ordering: MoveOrdering::new(options.move_order, seed),
            stats: EncodeStats {
                payload_bits: total_bits,
                ..EncodeStats::default()
            },
        };
        session.encode_payload(&mut reader)?;
        session.play_trailing();

        let stats = session.stats;
        let games = session.into_games();
        let records = games
            .iter()
            .enumerate()
            .map(|(index, game)| {
                let mut record = game.to_record();
                header.write_to(&mut record, index);
                record
            })
            .collect::<Vec<_>>();

        let stats = EncodeStats {
            games: records.len(),
            ..stats
        };
        info!(
            "编码完成: {} 局, {} 个半回合 ({} 承载, {} 强制, {} 诱饵)",
            stats.games, stats.total_plies, stats.carrying_plies, stats.forced_plies, stats.trailing_plies
        );

        Ok(EncodedArtifact {
            header,
            games: records,
            stats,
        })
    }
}

/// 便捷函数，等价于 `Encoder::new(options.clone()).encode(payload)`
pub fn encode(payload: &[u8], options: &EncodeOptions) -> Result<EncodedArtifact, EncodeError> {
    Encoder::new(options.clone()).encode(payload)
}

/// 串联模式下结束一局的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndReason {
    Terminal,
    PlyLimit,
    InsufficientMaterial,
    ThreefoldRepetition,
    FiftyMoveRule,
}

/// 一次编码的可变状态
struct Session<'a> {
    options: &'a EncodeOptions,
    start: Chess,
    seed: u64,
    finished: Vec<Game>,
    /// 正在编码的对局
    game: Game,
    ordering: MoveOrdering,
    stats: EncodeStats,
}

impl Session<'_> {
    /// 结束当前对局，从起始局面开始新的一局
    fn next_game(&mut self, reason: EndReason) {
        let game = std::mem::replace(&mut self.game, Game::new(self.start.clone()));
        debug!(
            "第 {} 局结束 ({:?}): {} 个半回合",
            self.finished.len() + 1,
            reason,
            game.ply_count()
        );
        self.finished.push(game);
        let index = self.finished.len();
        self.ordering = MoveOrdering::new(self.options.move_order, game_seed(self.seed, index));
    }

    /// 串联模式下当前对局是否应当收场，返回原因
    fn end_reason(&self, plies_per_game: Option<usize>) -> Option<EndReason> {
        if !self.options.chain_games || self.game.ply_count() == 0 {
            return None;
        }
        let policy = self.options.game_end;
        if plies_per_game.is_some_and(|limit| self.game.ply_count() >= limit) {
            Some(EndReason::PlyLimit)
        } else if policy.insufficient_material && self.game.is_insufficient_material() {
            Some(EndReason::InsufficientMaterial)
        } else if policy.threefold_repetition && self.game.is_threefold_repetition() {
            Some(EndReason::ThreefoldRepetition)
        } else if policy.fifty_move_rule && self.game.is_fifty_move_draw() {
            Some(EndReason::FiftyMoveRule)
        } else {
            None
        }
    }

    fn capacity_exceeded(&self, reader: &BitReader<'_>, reason: CapacityLimit) -> EncodeError {
        EncodeError::CapacityExceeded {
            ply: self.stats.total_plies + 1,
            encoded_bits: reader.position(),
            total_bits: reader.bit_len(),
            reason,
        }
    }

    fn encode_payload(&mut self, reader: &mut BitReader<'_>) -> Result<(), EncodeError> {
        let max_plies = self.options.effective_max_plies();
        let plies_per_game = self.options.effective_plies_per_game();

        while !reader.is_exhausted() {
            if self.stats.total_plies >= max_plies {
                return Err(self.capacity_exceeded(reader, CapacityLimit::PlyCap));
            }
            if let Some(reason) = self.end_reason(plies_per_game) {
                self.next_game(reason);
            }

            let position = self.game.current().clone();
            let set = self.ordering.order(&position);
            if set.is_empty() {
                if self.options.chain_games && self.game.ply_count() > 0 {
                    self.next_game(EndReason::Terminal);
                    continue;
                }
                return Err(self.capacity_exceeded(reader, CapacityLimit::Terminal));
            }

            let width = set.capacity_bits();
            let index = if width == 0 {
                self.stats.forced_plies += 1;
                0
            } else {
                let (value, consumed) = reader.read(width);
                self.stats.carrying_plies += 1;
                debug!(
                    "第 {} 步: {} 个合法走法, 读取 {}/{} 位, 序号 {}",
                    self.stats.total_plies + 1,
                    set.len(),
                    consumed,
                    width,
                    value
                );
                value as usize
            };

            let mv = set
                .get(index)
                .cloned()
                .ok_or_else(|| self.capacity_exceeded(reader, CapacityLimit::Terminal))?;
            let san = self.game.push(mv).to_string();
            self.stats.total_plies += 1;
            debug!("走 {}", san);
        }
        Ok(())
    }

    /// 载荷写完后追加诱饵走法，遇到终局或总上限即停止
    fn play_trailing(&mut self) {
        if self.options.trailing_plies == 0 {
            return;
        }
        let max_plies = self.options.effective_max_plies();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        for _ in 0..self.options.trailing_plies {
            if self.stats.total_plies >= max_plies {
                break;
            }
            let set = legal_moves(self.game.current());
            if set.is_empty() {
                break;
            }
            let index = rng.gen_range(0..set.len());
            let Some(mv) = set.get(index).cloned() else {
                break;
            };
            self.game.push(mv);
            self.stats.total_plies += 1;
            self.stats.trailing_plies += 1;
        }
        debug!("追加 {} 个诱饵半回合", self.stats.trailing_plies);
    }

    fn into_games(mut self) -> Vec<Game> {
        self.finished.push(self.game);
        self.finished
    }
}
