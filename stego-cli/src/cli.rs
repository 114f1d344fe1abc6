//! 命令行参数定义

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "chess-stego")]
#[command(about = "Hide bytes inside legal chess games and recover them")]
#[command(version)]
pub struct Cli {
    /// 配置文件路径（缺省为用户配置目录下的 chess-stego/config.json）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// 输出调试日志
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode a file into a PGN artifact
    Encode(EncodeArgs),
    /// Recover the original bytes from a PGN artifact
    Decode(DecodeArgs),
    /// Show header and capacity of a PGN artifact without decoding it
    Inspect(InspectArgs),
    /// List recorded artifacts
    History,
    /// Look up an artifact's fingerprint in the metadata store
    Verify(VerifyArgs),
}

#[derive(Args, Debug, Clone)]
pub struct EncodeArgs {
    /// 要隐藏的文件
    pub input: PathBuf,

    /// 输出的 PGN 文件
    #[arg(short, long)]
    pub output: PathBuf,

    /// 有效期（秒）
    #[arg(long, value_name = "SECS")]
    pub self_destruct: Option<u64>,

    /// 自定义标签，可重复
    #[arg(long = "header", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub headers: Vec<(String, String)>,

    #[arg(long)]
    pub max_plies: Option<usize>,

    #[arg(long)]
    pub seed: Option<u64>,

    /// 按种子打乱走法顺序
    #[arg(long)]
    pub shuffle: bool,

    /// 一局写不下时继续开新局
    #[arg(long)]
    pub chain: bool,

    /// 每局最多的半回合数，默认 50，0 表示不限
    #[arg(long, requires = "chain")]
    pub plies_per_game: Option<usize>,

    /// 串联时只在将死或逼和处换局，不按和棋规则提前结束
    #[arg(long, requires = "chain")]
    pub terminal_only: bool,

    #[arg(long)]
    pub trailing_plies: Option<usize>,

    /// 自定义起始局面
    #[arg(long, value_name = "FEN")]
    pub start_fen: Option<String>,

    /// 不写入元数据存储
    #[arg(long)]
    pub no_record: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DecodeArgs {
    /// PGN 产物
    pub artifact: PathBuf,

    /// 还原后的文件
    #[arg(short, long)]
    pub output: PathBuf,

    /// 以指定的 Unix 时间检查有效期（缺省为当前时间）
    #[arg(long, value_name = "UNIX")]
    pub now: Option<i64>,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    pub artifact: PathBuf,

    /// 以 JSON 输出
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    pub artifact: PathBuf,
}

/// 解析 `KEY=VALUE`
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("Annotator=Bob"),
            Ok(("Annotator".to_string(), "Bob".to_string()))
        );
        assert_eq!(
            parse_key_val("Event=a=b"),
            Ok(("Event".to_string(), "a=b".to_string()))
        );
        assert!(parse_key_val("novalue").is_err());
        assert!(parse_key_val("=x").is_err());
    }

    #[test]
    fn test_parse_encode_command() {
        let cli = Cli::parse_from([
            "chess-stego",
            "encode",
            "secret.txt",
            "-o",
            "out.pgn",
            "--header",
            "White=Alice",
            "--header",
            "Annotator=Bob",
            "--chain",
            "--plies-per-game",
            "40",
            "--shuffle",
            "-v",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Command::Encode(args) => {
                assert_eq!(args.input, PathBuf::from("secret.txt"));
                assert_eq!(args.output, PathBuf::from("out.pgn"));
                assert_eq!(args.headers.len(), 2);
                assert!(args.chain && args.shuffle);
                assert_eq!(args.plies_per_game, Some(40));
                assert!(!args.no_record);
                assert!(!args.terminal_only);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_plies_per_game_requires_chain() {
        let result = Cli::try_parse_from([
            "chess-stego",
            "encode",
            "a",
            "-o",
            "b",
            "--plies-per-game",
            "10",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_decode_command() {
        let cli = Cli::parse_from(["chess-stego", "decode", "in.pgn", "-o", "out.bin", "--now", "42"]);
        match cli.command {
            Command::Decode(args) => assert_eq!(args.now, Some(42)),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
