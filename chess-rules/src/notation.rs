//! 标准代数记谱法 (SAN)
//!
//! 生成与解析都交给 `shakmaty::san`，这里只处理棋谱里常见的写法差异：
//! - 将军 `+`、将死 `#` 后缀与 `!`、`?` 注释符号
//! - 易位的 `0-0` / `0-0-0` 写法
//! - 省略 `=` 的升变，例如 `e8Q`

use shakmaty::san::San;
use shakmaty::{Chess, Move, Position};

use crate::error::ChessError;

/// SAN 记谱法
pub struct Notation;

impl Notation {
    /// 将走法转换为 SAN（不含将军后缀）
    ///
    /// SAN 按最小消歧义生成，同一局面下不同走法的 SAN 互不相同。
    pub fn to_san(position: &Chess, mv: &Move) -> String {
        San::from_move(position, mv).to_string()
    }

    /// 计算带将军/将死后缀的 SAN，`mv` 必须是合法走法
    pub fn to_san_with_suffix(position: &Chess, mv: &Move) -> String {
        let mut after = position.clone();
        after.play_unchecked(mv);
        let mut san = Self::to_san(position, mv);
        san.push_str(Self::check_suffix(&after));
        san
    }

    /// 走子后局面对应的后缀
    pub fn check_suffix(after: &Chess) -> &'static str {
        if after.is_checkmate() {
            "#"
        } else if after.is_check() {
            "+"
        } else {
            ""
        }
    }

    /// 解析 SAN 为合法走法
    ///
    /// 返回的走法一定是 `position` 的合法走法；`x` 吃子标记必须与棋盘一致。
    pub fn parse_san(position: &Chess, text: &str) -> Result<Move, ChessError> {
        let fail = |reason: String| ChessError::InvalidSan {
            san: text.to_string(),
            reason,
        };

        let normalized = Self::normalize(text);
        if normalized.is_empty() {
            return Err(fail("empty move".to_string()));
        }

        let san: San = normalized
            .parse()
            .map_err(|err| fail(format!("{}", err)))?;
        let mv = san
            .to_move(position)
            .map_err(|err| fail(format!("{}", err)))?;

        if !mv.is_castle() && normalized.contains('x') != mv.is_capture() {
            return Err(fail("capture marker does not match board".to_string()));
        }
        Ok(mv)
    }

    /// 去掉后缀与注释符号，统一易位与升变写法
    fn normalize(text: &str) -> String {
        let san = text.trim().trim_end_matches(['+', '#', '!', '?']);
        match san {
            "0-0" => return "O-O".to_string(),
            "0-0-0" => return "O-O-O".to_string(),
            _ => {}
        }

        let starts_lower = san.starts_with(|c: char| c.is_ascii_lowercase());
        match san.char_indices().last() {
            Some((idx, last)) if starts_lower && !san.contains('=') && "NBRQ".contains(last) => {
                format!("{}={}", &san[..idx], last)
            }
            _ => san.to_string(),
        }
    }
}
