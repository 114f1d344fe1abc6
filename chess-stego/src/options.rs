//! 编码选项

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// 默认的总半回合上限
pub const DEFAULT_MAX_PLIES: usize = 10_000;

/// 串联模式下未指定时的单局半回合上限
pub const DEFAULT_PLIES_PER_GAME: usize = 50;

/// 未指定种子时随机选取的范围
pub const SEED_RANGE: RangeInclusive<u64> = 1..=1_000_000;

/// 合法走法的排列方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MoveOrder {
    /// 按 SAN 字节序排列
    #[default]
    Canonical,
    /// 规范顺序再按种子洗牌
    Shuffled,
}

impl MoveOrder {
    /// `MoveOrder` 标签值
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveOrder::Canonical => "canonical",
            MoveOrder::Shuffled => "shuffled",
        }
    }

    pub fn parse(s: &str) -> Option<MoveOrder> {
        match s {
            "canonical" => Some(MoveOrder::Canonical),
            "shuffled" => Some(MoveOrder::Shuffled),
            _ => None,
        }
    }
}

impl std::fmt::Display for MoveOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 串联模式下提前结束一局的条件
///
/// 这些局面还有合法走法，但真实对局通常会在此收场。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameEndPolicy {
    /// 双方都没有将死对方的子力
    pub insufficient_material: bool,
    /// 同一局面出现三次
    pub threefold_repetition: bool,
    /// 连续一百个半回合没有吃子或动兵
    pub fifty_move_rule: bool,
}

impl Default for GameEndPolicy {
    fn default() -> Self {
        Self {
            insufficient_material: true,
            threefold_repetition: true,
            fifty_move_rule: true,
        }
    }
}

impl GameEndPolicy {
    /// 只在将死、逼和或单局上限时结束
    pub fn terminal_only() -> Self {
        Self {
            insufficient_material: false,
            threefold_repetition: false,
            fifty_move_rule: false,
        }
    }
}

/// 编码选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    /// 消息有效期（秒），过期后拒绝解码
    pub self_destruct_seconds: Option<u64>,
    /// 自定义标签，可覆盖七标签名册的默认值
    pub custom_headers: BTreeMap<String, String>,
    /// 整个产物的半回合上限，缺省为 [`DEFAULT_MAX_PLIES`]
    pub max_plies: Option<usize>,
    /// 种子，缺省时从 [`SEED_RANGE`] 随机选取
    pub seed: Option<u64>,
    /// 编码时间（Unix 秒），缺省取当前时间
    pub encode_time: Option<i64>,
    pub move_order: MoveOrder,
    /// 到达终局或单局上限时开新局继续编码
    pub chain_games: bool,
    /// 串联模式下每局的半回合上限，缺省为 [`DEFAULT_PLIES_PER_GAME`]，0 表示不限制
    pub plies_per_game: Option<usize>,
    /// 串联模式下提前结束一局的条件
    pub game_end: GameEndPolicy,
    /// 载荷写完后追加的诱饵半回合数
    pub trailing_plies: usize,
    /// 自定义起始局面
    pub start_fen: Option<String>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            self_destruct_seconds: None,
            custom_headers: BTreeMap::new(),
            max_plies: None,
            seed: None,
            encode_time: None,
            move_order: MoveOrder::Canonical,
            chain_games: false,
            plies_per_game: None,
            game_end: GameEndPolicy::default(),
            trailing_plies: 0,
            start_fen: None,
        }
    }
}

impl EncodeOptions {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_encode_time(mut self, unix_time: i64) -> Self {
        self.encode_time = Some(unix_time);
        self
    }

    pub fn with_self_destruct(mut self, seconds: u64) -> Self {
        self.self_destruct_seconds = Some(seconds);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.insert(name.into(), value.into());
        self
    }

    pub fn with_max_plies(mut self, max_plies: usize) -> Self {
        self.max_plies = Some(max_plies);
        self
    }

    pub fn with_move_order(mut self, order: MoveOrder) -> Self {
        self.move_order = order;
        self
    }

    pub fn chained(mut self, plies_per_game: Option<usize>) -> Self {
        self.chain_games = true;
        self.plies_per_game = plies_per_game;
        self
    }

    pub fn with_game_end(mut self, policy: GameEndPolicy) -> Self {
        self.game_end = policy;
        self
    }

    pub fn with_trailing_plies(mut self, plies: usize) -> Self {
        self.trailing_plies = plies;
        self
    }

    pub fn with_start_fen(mut self, fen: impl Into<String>) -> Self {
        self.start_fen = Some(fen.into());
        self
    }

    /// 实际生效的半回合上限
    pub fn effective_max_plies(&self) -> usize {
        self.max_plies.unwrap_or(DEFAULT_MAX_PLIES)
    }

    /// 实际生效的单局上限，只在串联模式下有意义
    pub fn effective_plies_per_game(&self) -> Option<usize> {
        if !self.chain_games {
            return None;
        }
        match self.plies_per_game {
            None => Some(DEFAULT_PLIES_PER_GAME),
            Some(0) => None,
            Some(limit) => Some(limit),
        }
    }
}
