//! 棋谱记录格式
//!
//! 支持 PGN 的读写（标签对 + 走法文本），并提供 JSON 导出便于其他工具分析。

use serde::{Deserialize, Serialize};
use shakmaty::{Chess, Color, Position};
use tracing::{debug, trace};

use crate::error::ChessError;
use crate::fen::Fen;

/// PGN 导出时的行宽
pub const PGN_LINE_WIDTH: usize = 80;

/// PGN 七标签名册，导出时必须按此顺序排在最前
pub const SEVEN_TAG_ROSTER: [&str; 7] = ["Event", "Site", "Date", "Round", "White", "Black", "Result"];

/// 对局结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum GameResult {
    /// 白胜
    WhiteWin,
    /// 黑胜
    BlackWin,
    /// 和棋
    Draw,
    /// 未结束
    #[default]
    Ongoing,
}

impl GameResult {
    /// PGN 结果记号
    pub fn as_str(&self) -> &'static str {
        match self {
            GameResult::WhiteWin => "1-0",
            GameResult::BlackWin => "0-1",
            GameResult::Draw => "1/2-1/2",
            GameResult::Ongoing => "*",
        }
    }

    /// 从 PGN 结果记号解析
    pub fn parse(s: &str) -> Option<GameResult> {
        match s {
            "1-0" => Some(GameResult::WhiteWin),
            "0-1" => Some(GameResult::BlackWin),
            "1/2-1/2" => Some(GameResult::Draw),
            "*" => Some(GameResult::Ongoing),
            _ => None,
        }
    }

    /// 根据局面判定结果：将死判负，逼和或子力不足判和，其余未结束
    pub fn from_position(position: &Chess) -> GameResult {
        if position.is_checkmate() {
            match position.turn() {
                Color::White => GameResult::BlackWin,
                Color::Black => GameResult::WhiteWin,
            }
        } else if position.is_stalemate() || position.is_insufficient_material() {
            GameResult::Draw
        } else {
            GameResult::Ongoing
        }
    }
}

impl std::fmt::Display for GameResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 完整的棋谱记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    /// 标签对，保持写入顺序
    pub tags: Vec<(String, String)>,
    /// SAN 走法列表（保留原文，含后缀）
    pub moves: Vec<String>,
    /// 对局结果
    pub result: GameResult,
}

impl GameRecord {
    /// 创建新的棋谱记录，七标签名册预填 `?`
    pub fn new() -> Self {
        let mut tags: Vec<(String, String)> = SEVEN_TAG_ROSTER
            .iter()
            .map(|name| (name.to_string(), "?".to_string()))
            .collect();
        if let Some(result) = tags.iter_mut().find(|(name, _)| name == "Result") {
            result.1 = GameResult::Ongoing.as_str().to_string();
        }
        Self {
            tags,
            moves: Vec::new(),
            result: GameResult::Ongoing,
        }
    }

    /// 获取标签值
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// 设置标签，已存在则原地替换
    pub fn set_tag(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.tags.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.tags.push((name.to_string(), value)),
        }
    }

    /// 添加走法
    pub fn add_move(&mut self, san: impl Into<String>) {
        self.moves.push(san.into());
    }

    /// 设置游戏结果（同步 Result 标签）
    pub fn set_result(&mut self, result: GameResult) {
        self.result = result;
        self.set_tag("Result", result.as_str());
    }

    /// 对局起始局面：有 FEN 标签时使用它，否则为标准初始局面
    pub fn initial_position(&self) -> Result<Chess, ChessError> {
        match self.tag("FEN") {
            Some(fen) => Fen::parse(fen),
            None => Ok(Chess::default()),
        }
    }

    /// 转换为 JSON 字符串
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// 从 JSON 字符串解析
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// 导出为 PGN 文本
    pub fn to_pgn(&self) -> String {
        let mut output = String::new();

        for (name, value) in &self.tags {
            output.push_str(&format!("[{} \"{}\"]\n", name, escape_tag_value(value)));
        }
        output.push('\n');

        let start = self.initial_position().unwrap_or_default();
        let mut number = start.fullmoves().get();
        let mut side = start.turn();

        let mut tokens = Vec::with_capacity(self.moves.len() * 3 / 2 + 1);
        for (i, san) in self.moves.iter().enumerate() {
            match side {
                Color::White => tokens.push(format!("{}.", number)),
                Color::Black if i == 0 => tokens.push(format!("{}...", number)),
                Color::Black => {}
            }
            tokens.push(san.clone());
            if side == Color::Black {
                number = number.saturating_add(1);
            }
            side = side.other();
        }
        tokens.push(self.result.as_str().to_string());

        output.push_str(&wrap_tokens(&tokens, PGN_LINE_WIDTH));
        output.push('\n');
        output
    }

    /// 解析 PGN 文本中的第一局
    pub fn from_pgn(text: &str) -> Result<Self, ChessError> {
        Self::parse_all(text)?
            .into_iter()
            .next()
            .ok_or_else(|| ChessError::InvalidPgn {
                reason: "no game found".to_string(),
            })
    }

    /// 解析 PGN 文本中的所有对局
    ///
    /// 支持 `{}` 与 `;` 注释、`%` 转义行、NAG、`!?` 注释符号和括号变着（变着内容被忽略）。
    pub fn parse_all(text: &str) -> Result<Vec<GameRecord>, ChessError> {
        let mut parser = PgnParser::new(text);
        parser.run()?;
        debug!("Parsed {} PGN games", parser.games.len());
        Ok(parser.games)
    }
}

impl Default for GameRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// 按行宽贪心换行
fn wrap_tokens(tokens: &[String], width: usize) -> String {
    let mut out = String::new();
    let mut line_len = 0;
    for token in tokens {
        if line_len > 0 && line_len + 1 + token.len() > width {
            out.push('\n');
            line_len = 0;
        } else if line_len > 0 {
            out.push(' ');
            line_len += 1;
        }
        out.push_str(token);
        line_len += token.len();
    }
    out
}

fn escape_tag_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// PGN 词法/语法解析状态
struct PgnParser<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    text: &'a str,
    games: Vec<GameRecord>,
    current: Option<PartialGame>,
    variation_depth: usize,
    at_line_start: bool,
}

/// 正在解析的对局
struct PartialGame {
    tags: Vec<(String, String)>,
    moves: Vec<String>,
    in_movetext: bool,
}

impl PartialGame {
    fn new() -> Self {
        Self {
            tags: Vec::new(),
            moves: Vec::new(),
            in_movetext: false,
        }
    }

    fn finish(self, result: GameResult) -> GameRecord {
        GameRecord {
            tags: self.tags,
            moves: self.moves,
            result,
        }
    }
}

impl<'a> PgnParser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.char_indices().peekable(),
            text,
            games: Vec::new(),
            current: None,
            variation_depth: 0,
            at_line_start: true,
        }
    }

    fn run(&mut self) -> Result<(), ChessError> {
        while let Some(&(idx, c)) = self.chars.peek() {
            let line_start = self.at_line_start;
            self.at_line_start = c == '\n';

            match c {
                c if c.is_whitespace() => {
                    self.chars.next();
                }
                '%' if line_start => self.skip_line(),
                ';' => self.skip_line(),
                '{' => self.skip_comment()?,
                '[' => self.read_tag()?,
                '(' => {
                    self.chars.next();
                    self.variation_depth += 1;
                }
                ')' => {
                    self.chars.next();
                    if self.variation_depth == 0 {
                        return Err(pgn_error(format!("unbalanced ')' at byte {}", idx)));
                    }
                    self.variation_depth -= 1;
                }
                '$' => {
                    self.chars.next();
                    self.read_symbol();
                }
                _ => {
                    let token = self.read_symbol();
                    if token.is_empty() {
                        return Err(pgn_error(format!("unexpected character '{}' at byte {}", c, idx)));
                    }
                    self.handle_token(&token);
                }
            }
        }

        if self.variation_depth > 0 {
            return Err(pgn_error("unterminated variation".to_string()));
        }
        if let Some(game) = self.current.take() {
            self.games.push(game.finish(GameResult::Ongoing));
        }
        Ok(())
    }

    fn handle_token(&mut self, token: &str) {
        if self.variation_depth > 0 {
            trace!("Skipping variation token {}", token);
            return;
        }

        if let Some(result) = GameResult::parse(token) {
            let game = self.current.take().unwrap_or_else(PartialGame::new);
            self.games.push(game.finish(result));
            return;
        }

        // 去掉走法编号前缀，如 "12." 或 "12..."，也兼容 "1.e4"
        let san = match token.find(|c: char| !c.is_ascii_digit()) {
            Some(pos) if token[pos..].starts_with('.') => token[pos..].trim_start_matches('.'),
            Some(_) => token,
            None => "",
        };
        if san.is_empty() {
            return;
        }

        let game = self.current.get_or_insert_with(PartialGame::new);
        game.in_movetext = true;
        game.moves.push(san.to_string());
    }

    fn read_tag(&mut self) -> Result<(), ChessError> {
        self.chars.next(); // '['

        // 上一局只有走法没有结果记号时，新的标签开始下一局
        if self.current.as_ref().is_some_and(|g| g.in_movetext) {
            if let Some(game) = self.current.take() {
                self.games.push(game.finish(GameResult::Ongoing));
            }
        }

        self.skip_inline_whitespace();
        let name = self.read_symbol();
        if name.is_empty() {
            return Err(pgn_error("tag without name".to_string()));
        }
        self.skip_inline_whitespace();

        match self.chars.next() {
            Some((_, '"')) => {}
            _ => return Err(pgn_error(format!("tag {} missing value", name))),
        }

        let mut value = String::new();
        loop {
            match self.chars.next() {
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, escaped)) => value.push(escaped),
                    None => return Err(pgn_error(format!("unterminated tag {}", name))),
                },
                Some((_, '"')) => break,
                Some((_, '\n')) | None => {
                    return Err(pgn_error(format!("unterminated tag {}", name)))
                }
                Some((_, c)) => value.push(c),
            }
        }

        self.skip_inline_whitespace();
        match self.chars.next() {
            Some((_, ']')) => {}
            _ => return Err(pgn_error(format!("tag {} missing ']'", name))),
        }

        let game = self.current.get_or_insert_with(PartialGame::new);
        match game.tags.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => game.tags.push((name, value)),
        }
        Ok(())
    }

    /// 读取一个符号（字母、数字及 SAN 中允许的字符）
    fn read_symbol(&mut self) -> String {
        let start = match self.chars.peek() {
            Some(&(idx, _)) => idx,
            None => return String::new(),
        };
        let mut end = start;
        while let Some(&(idx, c)) = self.chars.peek() {
            if c.is_whitespace() || "{}()[];\"$".contains(c) {
                break;
            }
            end = idx + c.len_utf8();
            self.chars.next();
        }
        self.text[start..end].to_string()
    }

    fn skip_inline_whitespace(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c == ' ' || c == '\t' {
                self.chars.next();
            } else {
                break;
            }
        }
    }

    fn skip_line(&mut self) {
        for (_, c) in self.chars.by_ref() {
            if c == '\n' {
                break;
            }
        }
        self.at_line_start = true;
    }

    fn skip_comment(&mut self) -> Result<(), ChessError> {
        self.chars.next(); // '{'
        for (_, c) in self.chars.by_ref() {
            if c == '}' {
                return Ok(());
            }
        }
        Err(pgn_error("unterminated comment".to_string()))
    }
}

fn pgn_error(reason: String) -> ChessError {
    ChessError::InvalidPgn { reason }
}
