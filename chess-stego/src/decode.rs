//! 解码
//!
//! 逐步重放对局，在每个局面重新计算与编码时相同的有序合法走法，
//! 由实际走法的序号还原载荷位，凑够 `PayloadBitLength` 位即停止。

use chess_rules::{GameRecord, GameResult, Notation, Position};
use serde::Serialize;
use tracing::{debug, info};

use crate::bits::BitWriter;
use crate::enumerate::{legal_moves, MoveOrdering};
use crate::error::DecodeError;
use crate::frame::{game_seed, parse_seed, Header, TAG_SEED};

/// 从 PGN 文本还原载荷
///
/// `now` 为当前 Unix 时间，晚于 `ExpiryUnixTime` 时在提取任何载荷前拒绝。
pub fn decode(artifact_text: &str, now: i64) -> Result<Vec<u8>, DecodeError> {
    let games = parse_artifact(artifact_text)?;
    decode_records(&games, now)
}

/// 从已解析的对局还原载荷
pub fn decode_records(games: &[GameRecord], now: i64) -> Result<Vec<u8>, DecodeError> {
    let first = games.first().ok_or_else(|| DecodeError::InvalidArtifact {
        reason: "no games found".to_string(),
    })?;
    let header = Header::from_record(first)?;
    header.check_expiry(now)?;

    let expected = header.payload_bit_length;
    info!("开始解码: {} 局, 载荷 {} 位", games.len(), expected);

    let mut writer = BitWriter::new();
    'games: for (game_index, record) in games.iter().enumerate() {
        if writer.bit_len() >= expected {
            break;
        }

        let seed = match record.tag(TAG_SEED) {
            Some(raw) => parse_seed(raw)?,
            None => game_seed(header.seed, game_index),
        };
        let mut ordering = MoveOrdering::new(header.move_order, seed);
        let mut position = record.initial_position()?;

        for (ply_index, san) in record.moves.iter().enumerate() {
            if writer.bit_len() >= expected {
                break 'games;
            }

            let not_legal = || DecodeError::MoveNotInLegalSet {
                game: game_index + 1,
                ply: ply_index + 1,
                san: san.clone(),
            };
            let mv = Notation::parse_san(&position, san).map_err(|_| not_legal())?;
            let set = ordering.order(&position);
            let index = set.index_of(&mv).ok_or_else(not_legal)?;

            let width = set.capacity_bits();
            if width > 0 {
                if (index as u64) >> width != 0 {
                    return Err(DecodeError::MoveOutsideCodeSpace {
                        game: game_index + 1,
                        ply: ply_index + 1,
                        san: san.clone(),
                        index,
                        width,
                    });
                }
                // 最后一步只取需要的高位，其余是编码时补的零
                let take = (width as u64).min(expected - writer.bit_len()) as u32;
                writer.write((index as u64) >> (width - take), take);
                debug!(
                    "第 {} 局第 {} 步 {}: 序号 {}/{}, 写入 {} 位",
                    game_index + 1,
                    ply_index + 1,
                    san,
                    index,
                    set.len(),
                    take
                );
            }

            position.play_unchecked(&mv);
        }
    }

    if writer.bit_len() < expected {
        return Err(DecodeError::TruncatedPayload {
            expected,
            recovered: writer.bit_len(),
        });
    }

    let payload = writer.into_bytes();
    info!("解码完成: {} 字节", payload.len());
    Ok(payload)
}

/// 单局概要
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameSummary {
    /// 第几局（从 1 开始）
    pub round: usize,
    pub plies: usize,
    pub result: GameResult,
    /// 本局全部走法可承载的位数之和
    pub capacity_bits: u64,
}

/// 产物概要，不提取载荷也不检查过期
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactSummary {
    pub header: Header,
    pub expiry_readable: Option<String>,
    pub games: Vec<GameSummary>,
}

impl ArtifactSummary {
    pub fn total_plies(&self) -> usize {
        self.games.iter().map(|g| g.plies).sum()
    }

    /// 所有对局可承载的位数之和
    pub fn capacity_bits(&self) -> u64 {
        self.games.iter().map(|g| g.capacity_bits).sum()
    }

    /// 在 `now` 时刻是否已过期
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.header.check_expiry(now).is_err()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// 读取头部并重放每局走法，统计可承载容量
pub fn inspect(artifact_text: &str) -> Result<ArtifactSummary, DecodeError> {
    let games = parse_artifact(artifact_text)?;
    let first = games.first().ok_or_else(|| DecodeError::InvalidArtifact {
        reason: "no games found".to_string(),
    })?;
    let header = Header::from_record(first)?;

    let mut summaries = Vec::with_capacity(games.len());
    for (game_index, record) in games.iter().enumerate() {
        let mut position = record.initial_position()?;
        let mut capacity_bits = 0u64;
        for (ply_index, san) in record.moves.iter().enumerate() {
            let set = legal_moves(&position);
            let mv = Notation::parse_san(&position, san)
                .ok()
                .filter(|mv| set.index_of(mv).is_some())
                .ok_or_else(|| DecodeError::MoveNotInLegalSet {
                    game: game_index + 1,
                    ply: ply_index + 1,
                    san: san.clone(),
                })?;
            capacity_bits += set.capacity_bits() as u64;
            position.play_unchecked(&mv);
        }
        summaries.push(GameSummary {
            round: game_index + 1,
            plies: record.moves.len(),
            result: record.result,
            capacity_bits,
        });
    }

    Ok(ArtifactSummary {
        expiry_readable: header.expiry_readable(),
        header,
        games: summaries,
    })
}

fn parse_artifact(text: &str) -> Result<Vec<GameRecord>, DecodeError> {
    let games = GameRecord::parse_all(text)?;
    if games.is_empty() {
        return Err(DecodeError::InvalidArtifact {
            reason: "no games found".to_string(),
        });
    }
    Ok(games)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode;
    use crate::options::{EncodeOptions, MoveOrder};

    const NOW: i64 = 1_700_000_000;

    fn fixed() -> EncodeOptions {
        EncodeOptions::default().with_seed(77).with_encode_time(NOW)
    }

    fn artifact(movetext: &str, bits: u64) -> String {
        format!(
            "[Event \"Encoded Game\"]\n[Seed \"1\"]\n[PayloadBitLength \"{}\"]\n\n{}\n",
            bits, movetext
        )
    }

    #[test]
    fn test_decode_single_byte() {
        assert_eq!(decode(&artifact("1. a3 Nc6 *", 8), NOW).unwrap(), vec![0x41]);
    }

    #[test]
    fn test_extra_moves_are_ignored() {
        let text = artifact("1. a3 Nc6 2. e4 e5 3. Nf3 *", 8);
        assert_eq!(decode(&text, NOW).unwrap(), vec![0x41]);
    }

    #[test]
    fn test_annotations_are_ignored() {
        let text = artifact("1. a3 {opening} Nc6! $1 (1... e5) *", 8);
        assert_eq!(decode(&text, NOW).unwrap(), vec![0x41]);
    }

    #[test]
    fn test_zero_length_payload() {
        assert_eq!(decode(&artifact("*", 0), NOW).unwrap(), Vec::<u8>::new());
        assert_eq!(decode(&artifact("1. e4 e5 *", 0), NOW).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_partial_last_index() {
        // 只需要 6 位：a3 给出 0100，Nc6 的 0001 只取高两位 00
        assert_eq!(decode(&artifact("1. a3 Nc6 *", 6), NOW).unwrap(), vec![0x40]);
    }

    #[test]
    fn test_roundtrip() {
        let payloads: [&[u8]; 5] = [
            b"",
            &[0x00],
            &[0xff, 0x00, 0xff],
            b"hello, world",
            &[0x13, 0x37, 0xc0, 0xde, 0x42, 0x99, 0x01],
        ];
        for payload in payloads {
            let artifact = encode(payload, &fixed().chained(None)).unwrap();
            let decoded = decode(&artifact.to_pgn(), NOW).unwrap();
            assert_eq!(decoded, payload.to_vec());
        }
    }

    #[test]
    fn test_roundtrip_with_options() {
        let payload = b"attack at dawn";
        let variants = [
            fixed().with_move_order(MoveOrder::Shuffled).chained(None),
            fixed().chained(Some(10)),
            fixed().chained(Some(7)).with_move_order(MoveOrder::Shuffled),
            fixed().with_trailing_plies(9).chained(None),
            fixed()
                .with_start_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1")
                .chained(None),
            fixed()
                .with_header("Annotator", "Nobody")
                .with_header("White", "Carol")
                .chained(None),
        ];
        for options in variants {
            let artifact = encode(payload, &options).unwrap();
            let text = artifact.to_pgn();
            assert_eq!(decode(&text, NOW).unwrap(), payload.to_vec(), "options {:?}", options);
        }
    }

    #[test]
    fn test_shuffled_needs_move_order_tag() {
        let options = fixed().with_move_order(MoveOrder::Shuffled).chained(None);
        let text = encode(b"secret", &options).unwrap().to_pgn();
        let stripped: String = text
            .lines()
            .filter(|line| !line.starts_with("[MoveOrder"))
            .map(|line| format!("{}\n", line))
            .collect();
        // 去掉排列方式后按规范顺序解码，不会得到原文
        assert_ne!(decode(&stripped, NOW).ok(), Some(b"secret".to_vec()));
    }

    #[test]
    fn test_illegal_move_is_reported() {
        let err = decode(&artifact("1. a3 Nc5 *", 8), NOW).unwrap_err();
        assert_eq!(
            err,
            DecodeError::MoveNotInLegalSet {
                game: 1,
                ply: 2,
                san: "Nc5".to_string(),
            }
        );

        // 伪合法但让己方被将军的走法
        let text = "[Seed \"1\"]\n[PayloadBitLength \"4\"]\n[SetUp \"1\"]\n[FEN \"4k3/4r3/8/8/8/8/4B3/4K3 w - - 0 1\"]\n\n1. Bd3 *\n";
        assert!(matches!(
            decode(text, NOW),
            Err(DecodeError::MoveNotInLegalSet { game: 1, ply: 1, .. })
        ));
    }

    #[test]
    fn test_move_outside_code_space() {
        // 初始局面 20 个走法只用前 16 个
        let err = decode(&artifact("1. h4 *", 4), NOW).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::MoveOutsideCodeSpace {
                index: 19,
                width: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_tampered_move_changes_payload() {
        // Nc6 (0001) 换成 Na6 (0000)
        assert_eq!(decode(&artifact("1. a3 Na6 *", 8), NOW).unwrap(), vec![0x40]);
    }

    #[test]
    fn test_truncated_payload() {
        let err = decode(&artifact("1. a3 *", 8), NOW).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TruncatedPayload {
                expected: 8,
                recovered: 4,
            }
        );
    }

    #[test]
    fn test_extreme_move_counters() {
        // 15 个合法走法，每步 3 位
        let text = "[Seed \"1\"]\n[PayloadBitLength \"8\"]\n[SetUp \"1\"]\n[FEN \"4k3/8/8/8/8/8/8/R3K3 w - - 4294967295 1\"]\n\n1. Ra2 *\n";
        assert_eq!(
            decode(text, NOW).unwrap_err(),
            DecodeError::TruncatedPayload {
                expected: 8,
                recovered: 3,
            }
        );

        let options = fixed()
            .with_start_fen("4k3/8/8/8/8/8/8/R3K3 b - - 4294967295 4294967295")
            .chained(None);
        let text = encode(b"overflow", &options).unwrap().to_pgn();
        assert_eq!(decode(&text, NOW).unwrap(), b"overflow".to_vec());
    }

    #[test]
    fn test_impossible_start_position() {
        // 白方走棋时黑王已被将军
        let text = "[Seed \"1\"]\n[PayloadBitLength \"4\"]\n[SetUp \"1\"]\n[FEN \"4k3/8/8/8/8/8/8/4RK2 w - - 0 1\"]\n\n1. Rxe8 *\n";
        assert!(matches!(decode(text, NOW), Err(DecodeError::InvalidArtifact { .. })));
        assert!(matches!(inspect(text), Err(DecodeError::InvalidArtifact { .. })));
    }

    #[test]
    fn test_expiry_enforced() {
        let options = fixed().with_self_destruct(60).chained(None);
        let text = encode(b"burn after reading", &options).unwrap().to_pgn();

        assert!(decode(&text, NOW + 60).is_ok());
        let err = decode(&text, NOW + 61).unwrap_err();
        assert!(err.is_expired());
        assert_eq!(
            err,
            DecodeError::MessageExpired {
                expiry: NOW + 60,
                now: NOW + 61,
            }
        );
    }

    #[test]
    fn test_expiry_checked_before_moves() {
        let text = "[Seed \"1\"]\n[PayloadBitLength \"8\"]\n[ExpiryUnixTime \"10\"]\n\n1. Qh5 *\n";
        assert!(decode(text, 11).unwrap_err().is_expired());
    }

    #[test]
    fn test_invalid_artifacts() {
        assert!(matches!(decode("", NOW), Err(DecodeError::InvalidArtifact { .. })));
        assert!(matches!(
            decode("[Seed \"1\"\n1. e4 *", NOW),
            Err(DecodeError::InvalidArtifact { .. })
        ));
        let bad_fen = "[Seed \"1\"]\n[PayloadBitLength \"8\"]\n[FEN \"8/8/8 w - -\"]\n\n1. e4 *\n";
        assert!(matches!(decode(bad_fen, NOW), Err(DecodeError::InvalidArtifact { .. })));
        let missing_length = "[Seed \"1\"]\n\n1. e4 *\n";
        assert!(matches!(
            decode(missing_length, NOW),
            Err(DecodeError::MalformedHeader { .. })
        ));
    }

    #[test]
    fn test_inspect() {
        let options = fixed().chained(Some(4)).with_self_destruct(3600);
        let artifact = encode(&[0xab, 0xcd, 0xef], &options).unwrap();
        let summary = inspect(&artifact.to_pgn()).unwrap();

        assert_eq!(summary.header.payload_bit_length, 24);
        assert_eq!(summary.header.seed, 77);
        assert_eq!(summary.games.len(), artifact.games.len());
        assert_eq!(summary.total_plies(), artifact.stats.total_plies);
        assert!(summary.capacity_bits() >= 24);
        assert!(summary.expiry_readable.is_some());
        assert!(!summary.is_expired_at(NOW));
        assert!(summary.is_expired_at(NOW + 3601));
        assert_eq!(summary.games[0].round, 1);

        let json = summary.to_json().unwrap();
        assert!(json.contains("\"payload_bit_length\": 24"));
    }
}
