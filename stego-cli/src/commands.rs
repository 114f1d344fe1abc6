//! 子命令实现

use std::path::Path;

use anyhow::{bail, Context, Result};
use chess_stego::{decode, encode, inspect, EncodeOptions, GameEndPolicy, MoveOrder};
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::{Command, DecodeArgs, EncodeArgs, InspectArgs, VerifyArgs};
use crate::config::StegoConfig;
use crate::fingerprint::{fingerprint, short};
use crate::storage::{ArtifactMetadata, FileMetadataStore, MetadataStore};

/// 执行子命令
pub async fn run(command: Command, config: &StegoConfig) -> Result<()> {
    match command {
        Command::Encode(args) => run_encode(args, config).await,
        Command::Decode(args) => run_decode(args).await,
        Command::Inspect(args) => run_inspect(args).await,
        Command::History => run_history(config),
        Command::Verify(args) => run_verify(args, config).await,
    }
}

/// 合并配置文件与命令行参数，命令行优先
pub fn encode_options(args: &EncodeArgs, config: &StegoConfig) -> EncodeOptions {
    let mut options = config.encode.clone();
    if args.self_destruct.is_some() {
        options.self_destruct_seconds = args.self_destruct;
    }
    for (name, value) in &args.headers {
        options.custom_headers.insert(name.clone(), value.clone());
    }
    if args.max_plies.is_some() {
        options.max_plies = args.max_plies;
    }
    if args.seed.is_some() {
        options.seed = args.seed;
    }
    if args.shuffle {
        options.move_order = MoveOrder::Shuffled;
    }
    if args.chain {
        options.chain_games = true;
    }
    if args.plies_per_game.is_some() {
        options.plies_per_game = args.plies_per_game;
    }
    if args.terminal_only {
        options.game_end = GameEndPolicy::terminal_only();
    }
    if let Some(plies) = args.trailing_plies {
        options.trailing_plies = plies;
    }
    if args.start_fen.is_some() {
        options.start_fen = args.start_fen.clone();
    }
    options
}

async fn run_encode(args: EncodeArgs, config: &StegoConfig) -> Result<()> {
    let payload = tokio::fs::read(&args.input)
        .await
        .with_context(|| format!("读取输入文件失败: {:?}", args.input))?;
    let options = encode_options(&args, config);

    let artifact = tokio::task::spawn_blocking({
        let payload = payload.clone();
        move || encode(&payload, &options)
    })
    .await
    .context("编码任务异常退出")?
    .context("编码失败")?;

    let pgn = artifact.to_pgn();
    tokio::fs::write(&args.output, &pgn)
        .await
        .with_context(|| format!("写入输出文件失败: {:?}", args.output))?;

    let stats = artifact.stats;
    println!(
        "Encoded {} bytes into {} game(s), {} plies ({:.2} bits per carrying ply)",
        payload.len(),
        stats.games,
        stats.total_plies,
        stats.bits_per_carrying_ply()
    );
    if let Some(expiry) = artifact.header.expiry_readable() {
        println!("Expires at {}", expiry);
    }

    if args.no_record || !config.record_metadata {
        return Ok(());
    }

    let mut metadata = ArtifactMetadata::new(
        &file_name(&args.input),
        fingerprint(&payload),
        fingerprint(pgn.as_bytes()),
    );
    metadata.payload_bytes = payload.len() as u64;
    metadata.games = stats.games;
    metadata.plies = stats.total_plies;
    metadata.expiry_unix_time = artifact.header.expiry_unix_time;

    let store = FileMetadataStore::open(config.store_dir()?)?;
    store.put(&metadata)?;
    info!("已记录元数据 {}", metadata.identifier);
    println!("Recorded as {}", metadata.identifier);
    Ok(())
}

async fn run_decode(args: DecodeArgs) -> Result<()> {
    let text = read_artifact(&args.artifact).await?;
    let now = args.now.unwrap_or_else(|| Utc::now().timestamp());

    let payload = match decode(&text, now) {
        Ok(payload) => payload,
        Err(err) if err.is_expired() => {
            warn!("消息已过期: {}", err);
            bail!("{}", err);
        }
        Err(err) => return Err(err).context("解码失败"),
    };

    tokio::fs::write(&args.output, &payload)
        .await
        .with_context(|| format!("写入输出文件失败: {:?}", args.output))?;
    println!("Recovered {} bytes", payload.len());
    Ok(())
}

async fn run_inspect(args: InspectArgs) -> Result<()> {
    let text = read_artifact(&args.artifact).await?;
    let summary = inspect(&text).context("读取产物失败")?;

    if args.json {
        println!("{}", summary.to_json().context("序列化概要失败")?);
        return Ok(());
    }

    let header = &summary.header;
    println!("Payload:     {} bits", header.payload_bit_length);
    println!("Seed:        {}", header.seed);
    println!("Move order:  {}", header.move_order);
    if let Some(fen) = &header.start_fen {
        println!("Start FEN:   {}", fen);
    }
    match &summary.expiry_readable {
        Some(expiry) => {
            let state = if summary.is_expired_at(Utc::now().timestamp()) {
                "expired"
            } else {
                "valid"
            };
            println!("Expires:     {} ({})", expiry, state);
        }
        None => println!("Expires:     never"),
    }
    println!(
        "Games:       {} ({} plies, capacity {} bits)",
        summary.games.len(),
        summary.total_plies(),
        summary.capacity_bits()
    );
    for game in &summary.games {
        println!(
            "  #{:<3} {:>4} plies  {:>6} bits  {}",
            game.round, game.plies, game.capacity_bits, game.result
        );
    }
    Ok(())
}

fn run_history(config: &StegoConfig) -> Result<()> {
    let store = FileMetadataStore::open(config.store_dir()?)?;
    let records = store.list()?;
    if records.is_empty() {
        println!("No recorded artifacts in {:?}", store.directory());
        return Ok(());
    }
    for record in records {
        println!(
            "{}  {}  {:<24} {:>8} bytes  {}",
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
            record.identifier,
            record.original_filename,
            record.payload_bytes,
            short(&record.artifact_hash)
        );
    }
    Ok(())
}

async fn run_verify(args: VerifyArgs, config: &StegoConfig) -> Result<()> {
    let bytes = tokio::fs::read(&args.artifact)
        .await
        .with_context(|| format!("读取产物失败: {:?}", args.artifact))?;
    let hash = fingerprint(&bytes);

    let store = FileMetadataStore::open(config.store_dir()?)?;
    let matches = store.find_by_hash(&hash)?;
    if matches.is_empty() {
        bail!("No record matches fingerprint {}", hash);
    }
    for record in matches {
        println!(
            "Matches {} ({}, created {})",
            record.identifier,
            record.original_filename,
            record.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    Ok(())
}

async fn read_artifact(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("读取产物失败: {:?}", path))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("payload")
        .to_string()
}
