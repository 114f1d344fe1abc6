//! 帧序列化
//!
//! 解码所需的全部元数据（载荷位长度、种子、过期时间、排列方式、起始局面）
//! 都以 PGN 标签的形式保存在产物里，没有额外的二进制帧。

use std::collections::BTreeMap;

use chess_rules::{GameRecord, SEVEN_TAG_ROSTER};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{DecodeError, EncodeError};
use crate::options::{EncodeOptions, MoveOrder};

pub const TAG_PAYLOAD_BIT_LENGTH: &str = "PayloadBitLength";
pub const TAG_SEED: &str = "Seed";
pub const TAG_EXPIRY: &str = "ExpiryUnixTime";
pub const TAG_EXPIRY_READABLE: &str = "ExpiryTimeReadable";
pub const TAG_MOVE_ORDER: &str = "MoveOrder";
pub const TAG_SETUP: &str = "SetUp";
pub const TAG_FEN: &str = "FEN";
const TAG_ROUND: &str = "Round";
const TAG_RESULT: &str = "Result";

/// 编解码保留的标签，自定义标签不能覆盖
pub const RESERVED_TAGS: [&str; 8] = [
    TAG_PAYLOAD_BIT_LENGTH,
    TAG_SEED,
    TAG_EXPIRY,
    TAG_EXPIRY_READABLE,
    TAG_MOVE_ORDER,
    TAG_SETUP,
    TAG_FEN,
    TAG_RESULT,
];

/// 七标签名册的默认值（Round 与 Result 按局生成）
const ROSTER_DEFAULTS: [(&str, &str); 4] = [
    ("Event", "Encoded Game"),
    ("Site", "?"),
    ("White", "Player1"),
    ("Black", "Player2"),
];

/// 产物头部
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// 载荷总位数
    pub payload_bit_length: u64,
    /// 第一局的种子，后续各局依次加一
    pub seed: u64,
    /// 过期时间（Unix 秒）
    pub expiry_unix_time: Option<i64>,
    pub move_order: MoveOrder,
    /// 自定义起始局面
    pub start_fen: Option<String>,
    /// 非保留标签（七标签名册与自定义标签），按写出顺序
    pub tags: Vec<(String, String)>,
}

impl Header {
    /// 为一次编码构造头部，同时校验自定义标签
    pub fn for_encode(
        payload_bit_length: u64,
        seed: u64,
        encode_time: i64,
        options: &EncodeOptions,
    ) -> Result<Self, EncodeError> {
        validate_custom_headers(&options.custom_headers)?;

        let mut tags: Vec<(String, String)> = Vec::new();
        for (name, default) in ROSTER_DEFAULTS {
            tags.push((name.to_string(), default.to_string()));
        }
        tags.insert(2, ("Date".to_string(), format_pgn_date(encode_time)));

        for (name, value) in &options.custom_headers {
            let value = sanitize_value(value);
            match tags.iter_mut().find(|(n, _)| n == name) {
                Some(slot) => {
                    warn!("自定义标签覆盖默认值: {} = {:?} (原为 {:?})", name, value, slot.1);
                    slot.1 = value;
                }
                None => tags.push((name.clone(), value)),
            }
        }

        // 0 秒等同于不设定时
        let expiry_unix_time = options
            .self_destruct_seconds
            .filter(|&secs| secs > 0)
            .map(|secs| encode_time.saturating_add(i64::try_from(secs).unwrap_or(i64::MAX)));

        Ok(Self {
            payload_bit_length,
            seed,
            expiry_unix_time,
            move_order: options.move_order,
            start_fen: options.start_fen.clone(),
            tags,
        })
    }

    /// 从第一局的标签解析头部
    pub fn from_record(record: &GameRecord) -> Result<Self, DecodeError> {
        let payload_bit_length = parse_digits(required_tag(record, TAG_PAYLOAD_BIT_LENGTH)?)
            .ok_or_else(|| malformed(TAG_PAYLOAD_BIT_LENGTH, "not a non-negative integer"))?;

        let seed = parse_seed(required_tag(record, TAG_SEED)?)?;

        let expiry_unix_time = match record.tag(TAG_EXPIRY) {
            Some(raw) => {
                let raw = raw.trim();
                let (negative, digits) = match raw.strip_prefix('-') {
                    Some(rest) => (true, rest),
                    None => (false, raw),
                };
                let magnitude = parse_digits(digits)
                    .and_then(|value| i64::try_from(value).ok())
                    .ok_or_else(|| malformed(TAG_EXPIRY, "not an integer"))?;
                Some(if negative { -magnitude } else { magnitude })
            }
            None => None,
        };

        let move_order = match record.tag(TAG_MOVE_ORDER) {
            Some(raw) => MoveOrder::parse(raw.trim())
                .ok_or_else(|| malformed(TAG_MOVE_ORDER, &format!("unknown order '{}'", raw)))?,
            None => MoveOrder::Canonical,
        };

        let tags = record
            .tags
            .iter()
            .filter(|(name, _)| !RESERVED_TAGS.contains(&name.as_str()))
            .cloned()
            .collect();

        Ok(Self {
            payload_bit_length,
            seed,
            expiry_unix_time,
            move_order,
            start_fen: record.tag(TAG_FEN).map(str::to_string),
            tags,
        })
    }

    /// 将第 `game_index` 局（从 0 开始）的标签写入记录
    ///
    /// 记录的 Result 标签由调用方按终局局面设置。
    pub fn write_to(&self, record: &mut GameRecord, game_index: usize) {
        for (name, value) in &self.tags {
            if SEVEN_TAG_ROSTER.contains(&name.as_str()) {
                record.set_tag(name, value.clone());
            }
        }
        if game_index > 0 || self.tag(TAG_ROUND).is_none() {
            record.set_tag(TAG_ROUND, (game_index + 1).to_string());
        }

        if let Some(fen) = &self.start_fen {
            record.set_tag(TAG_SETUP, "1");
            record.set_tag(TAG_FEN, fen.clone());
        }
        record.set_tag(TAG_SEED, game_seed(self.seed, game_index).to_string());
        if game_index == 0 {
            record.set_tag(TAG_PAYLOAD_BIT_LENGTH, self.payload_bit_length.to_string());
        }
        if self.move_order == MoveOrder::Shuffled {
            record.set_tag(TAG_MOVE_ORDER, self.move_order.as_str());
        }
        if let Some(expiry) = self.expiry_unix_time {
            record.set_tag(TAG_EXPIRY, expiry.to_string());
            record.set_tag(TAG_EXPIRY_READABLE, format_expiry(expiry));
        }

        for (name, value) in &self.tags {
            if !SEVEN_TAG_ROSTER.contains(&name.as_str()) {
                record.set_tag(name, value.clone());
            }
        }
    }

    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn event(&self) -> Option<&str> {
        self.tag("Event")
    }

    pub fn site(&self) -> Option<&str> {
        self.tag("Site")
    }

    pub fn white(&self) -> Option<&str> {
        self.tag("White")
    }

    pub fn black(&self) -> Option<&str> {
        self.tag("Black")
    }

    /// 过期时间的可读形式
    pub fn expiry_readable(&self) -> Option<String> {
        self.expiry_unix_time.map(format_expiry)
    }

    /// `now` 晚于过期时间时拒绝
    pub fn check_expiry(&self, now: i64) -> Result<(), DecodeError> {
        match self.expiry_unix_time {
            Some(expiry) if now > expiry => Err(DecodeError::MessageExpired { expiry, now }),
            _ => Ok(()),
        }
    }
}

/// 第 `game_index` 局（从 0 开始）的种子
pub fn game_seed(base: u64, game_index: usize) -> u64 {
    base.wrapping_add(game_index as u64)
}

/// 解析 `Seed` 标签
pub(crate) fn parse_seed(raw: &str) -> Result<u64, DecodeError> {
    parse_digits(raw.trim()).ok_or_else(|| malformed(TAG_SEED, "not an integer"))
}

/// 只接受 ASCII 数字组成的十进制数，不接受符号
fn parse_digits(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

fn required_tag<'a>(record: &'a GameRecord, name: &str) -> Result<&'a str, DecodeError> {
    record
        .tag(name)
        .map(str::trim)
        .ok_or_else(|| malformed(name, "missing"))
}

fn malformed(tag: &str, reason: &str) -> DecodeError {
    DecodeError::MalformedHeader {
        tag: tag.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_custom_headers(headers: &BTreeMap<String, String>) -> Result<(), EncodeError> {
    for name in headers.keys() {
        if RESERVED_TAGS.contains(&name.as_str()) {
            return Err(EncodeError::ReservedHeader { tag: name.clone() });
        }
        if !is_tag_name(name) {
            return Err(EncodeError::InvalidHeaderName { tag: name.clone() });
        }
    }
    Ok(())
}

/// PGN 标签名：字母、数字、下划线，首字符为字母或数字
fn is_tag_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// 标签值不能跨行
fn sanitize_value(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

fn format_pgn_date(unix_time: i64) -> String {
    match DateTime::from_timestamp(unix_time, 0) {
        Some(time) => time.format("%Y.%m.%d").to_string(),
        None => "????.??.??".to_string(),
    }
}

fn format_expiry(unix_time: i64) -> String {
    match DateTime::from_timestamp(unix_time, 0) {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => unix_time.to_string(),
    }
}
