//! 走法空间枚举
//!
//! 给定局面，列出全部合法走法并排成双方都能独立复现的顺序。
//! 规范顺序是每步走法（不带将军/将死后缀的）SAN 字符串的字节序。
//! SAN 经过最小消歧，同一局面下各走法的 SAN 互不相同，所以这是全序。

use chess_rules::{Chess, Move, Notation, Position};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::options::MoveOrder;

/// 有序的合法走法集合，每个走法附带它的 SAN
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegalMoveSet {
    entries: Vec<(String, Move)>,
}

impl LegalMoveSet {
    /// 计算局面的合法走法并按规范顺序排列
    pub fn canonical(position: &Chess) -> Self {
        let mut entries: Vec<(String, Move)> = position
            .legal_moves()
            .into_iter()
            .map(|mv| (Notation::to_san(position, &mv), mv))
            .collect();
        entries.sort_by(|(a, _), (b, _)| a.as_bytes().cmp(b.as_bytes()));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 没有合法走法即终局
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Move> {
        self.entries.get(index).map(|(_, mv)| mv)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Move> {
        self.entries.iter().map(|(_, mv)| mv)
    }

    /// 按结构相等查找走法的序号
    pub fn index_of(&self, mv: &Move) -> Option<usize> {
        self.entries.iter().position(|(_, m)| m == mv)
    }

    /// 本步可承载的位数 `floor(log2(len))`
    pub fn capacity_bits(&self) -> u32 {
        capacity_bits(self.entries.len())
    }

    /// 按序号返回 SAN（不带后缀）
    pub fn san(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|(san, _)| san.as_str())
    }

    fn shuffle(&mut self, rng: &mut ChaCha8Rng) {
        self.entries.shuffle(rng);
    }
}

/// 计算局面的规范顺序合法走法
pub fn legal_moves(position: &Chess) -> LegalMoveSet {
    LegalMoveSet::canonical(position)
}

/// 有 `len` 个选项时可承载的位数
pub fn capacity_bits(len: usize) -> u32 {
    if len < 2 {
        0
    } else {
        usize::BITS - 1 - len.leading_zeros()
    }
}

/// 一局之内的走法排序器
///
/// 洗牌模式下持有以该局种子初始化的随机数生成器，
/// 每遇到一个承载位的半回合（至少两个合法走法）推进一次。
#[derive(Debug, Clone)]
pub struct MoveOrdering {
    rng: Option<ChaCha8Rng>,
}

impl MoveOrdering {
    pub fn new(order: MoveOrder, seed: u64) -> Self {
        let rng = match order {
            MoveOrder::Canonical => None,
            MoveOrder::Shuffled => Some(ChaCha8Rng::seed_from_u64(seed)),
        };
        Self { rng }
    }

    /// 返回当前局面的有序走法集合
    pub fn order(&mut self, position: &Chess) -> LegalMoveSet {
        let mut set = LegalMoveSet::canonical(position);
        if set.len() >= 2 {
            if let Some(rng) = self.rng.as_mut() {
                set.shuffle(rng);
            }
        }
        set
    }
}
