//! # Host CLI
//!
//! 线性视觉小说的终端播放器。
//!
//! ## 用法
//!
//! ```bash
//! host-cli play --assets assets
//! host-cli play --headless          # 快进模式一口气播完，用于冒烟测试
//! host-cli check --assets assets
//! host-cli slots
//! host-cli slots --delete 2
//! ```

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::{Level, debug, info, warn};

use host_cli::check::check_assets;
use host_cli::commands::{Command, HELP, parse_command};
use host_cli::{AppConfig, FsImageLoader, FsRepository, FsStore, SilentAudio, TerminalSurface};
use vn_playback::{
    Collaborators, Engine, Input, PlaybackEvent, Session, SlotEntry, SnapshotStore,
};

/// 没有待触发定时器时等待输入的最长时间
const IDLE_POLL_MS: u64 = 250;

/// 无头模式下连续推进而没有任何进展的上限
const HEADLESS_STALL_LIMIT: u32 = 1000;

#[derive(Parser)]
#[command(name = "host-cli")]
#[command(about = "线性视觉小说终端播放器")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 配置文件（默认：config.json）
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// 资源目录（覆盖配置文件中的 assets_root）
    #[arg(long, global = true)]
    assets: Option<PathBuf>,

    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,

    /// 只输出错误日志
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// 播放
    Play {
        /// 开启自动播放
        #[arg(long)]
        auto: bool,

        /// 开启快进
        #[arg(long)]
        skip: bool,

        /// 不读取输入，快进播放到结束
        #[arg(long)]
        headless: bool,
    },

    /// 校验资源目录
    Check,

    /// 列出存档槽位
    Slots {
        /// 删除指定槽位
        #[arg(long)]
        delete: Option<u32>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("错误: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = AppConfig::load(&cli.config);
    if let Some(assets) = cli.assets {
        config.assets_root = assets;
    }

    match cli.command {
        Commands::Play {
            auto,
            skip,
            headless,
        } => {
            config.validate().context("配置无效")?;
            let mut engine = build_engine(&config)?;
            if headless {
                play_headless(&mut engine, auto)
            } else {
                play_interactive(&mut engine, auto, skip)
            }
        }
        Commands::Check => run_check(&config),
        Commands::Slots { delete } => run_slots(&config, delete),
    }
}

fn build_engine(config: &AppConfig) -> anyhow::Result<Engine> {
    let root = &config.assets_root;
    let session = Session::new(
        config.playback.clone(),
        Collaborators {
            repository: Box::new(FsRepository::new(root, &config.scene_index)),
            surface: Box::new(TerminalSurface::stdout()),
            images: Box::new(FsImageLoader::new(root)),
            audio: Box::new(SilentAudio::new(root, config.nominal_cue_ms)),
            store: Box::new(FsStore::new(&config.saves_dir)),
        },
    )
    .context("创建播放会话失败")?;
    info!(assets = %root.display(), "播放会话已创建");
    Ok(Engine::new(session))
}

/// 进入游戏后按参数打开自动或快进
fn apply_modes(engine: &mut Engine, auto: bool, skip: bool) {
    if auto && !engine.session().cursor().auto_mode {
        engine.handle(Input::ToggleAuto);
    }
    if skip && !engine.session().cursor().skip_mode {
        engine.handle(Input::ToggleSkip);
    }
}

/// 输出事件，返回会话是否已回到标题
fn report_events(engine: &mut Engine) -> bool {
    let mut ended = false;
    for event in engine.drain_events() {
        match event {
            PlaybackEvent::SceneSkipped { file, reason } => {
                eprintln!("\n[跳过场景 {file}: {reason}]");
            }
            PlaybackEvent::AssetFailed {
                kind,
                reference,
                reason,
            } => {
                eprintln!("\n[{kind} 资源加载失败 {reference}: {reason}]");
            }
            PlaybackEvent::Saved { slot, ok } => {
                println!("\n[存档 {slot}: {}]", if ok { "成功" } else { "失败" });
            }
            PlaybackEvent::Loaded { slot, ok } => {
                println!("\n[读档 {slot}: {}]", if ok { "成功" } else { "失败" });
            }
            PlaybackEvent::ChapterStarted { chapter } => println!("\n== 第 {chapter} 章 =="),
            PlaybackEvent::SessionEnded => {
                println!("\n== 完 ==");
                ended = true;
            }
            other => debug!(event = ?other, "播放事件"),
        }
    }
    ended
}

/// 推进虚拟时间直到没有待触发的定时器
fn drain_timers(engine: &mut Engine) {
    while let Some(due) = engine.session().next_timer_due() {
        let now = engine.session().now_ms();
        engine.advance_time(due.saturating_sub(now));
    }
}

fn play_headless(engine: &mut Engine, auto: bool) -> anyhow::Result<ExitCode> {
    engine.handle(Input::StartSession);
    if engine.on_menu() {
        report_events(engine);
        bail!("无法开始游戏");
    }
    apply_modes(engine, auto, !auto);

    let mut stalls = 0;
    loop {
        drain_timers(engine);
        if report_events(engine) || engine.on_menu() {
            return Ok(ExitCode::SUCCESS);
        }

        // 没有定时器时会话在等待推进信号
        let before = engine.session().cursor().coordinate();
        let line = engine.session().cursor().line_index;
        engine.handle(Input::Progress);
        apply_modes(engine, auto, !auto);

        if engine.session().next_timer_due().is_none()
            && engine.session().cursor().coordinate() == before
            && engine.session().cursor().line_index == line
        {
            stalls += 1;
            if stalls >= HEADLESS_STALL_LIMIT {
                bail!("播放停滞在第 {line} 行");
            }
        } else {
            stalls = 0;
        }
    }
}

fn play_interactive(engine: &mut Engine, auto: bool, skip: bool) -> anyhow::Result<ExitCode> {
    let (tx, rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    println!("回车开始游戏，load N 读档，help 查看命令，q 退出");
    let mut pending_modes = auto || skip;
    let mut last_tick = Instant::now();

    loop {
        let wait_ms = engine
            .session()
            .next_timer_due()
            .map(|due| due.saturating_sub(engine.session().now_ms()))
            .unwrap_or(IDLE_POLL_MS);
        let received = rx.recv_timeout(Duration::from_millis(wait_ms));

        let elapsed = last_tick.elapsed().as_millis() as u64;
        last_tick = Instant::now();
        engine.advance_time(elapsed);

        match received {
            Ok(line) => match parse_command(&line) {
                Ok(Command::Quit) => break,
                Ok(Command::Advance) => {
                    if engine.on_menu() {
                        engine.handle(Input::StartSession);
                    } else {
                        engine.handle(Input::Progress);
                    }
                }
                Ok(Command::Input(input)) => engine.handle(input),
                Ok(Command::Slots) => print_slots(&engine.slot_listing()),
                Ok(Command::Help) => println!("{HELP}"),
                Err(e) => eprintln!("{e}"),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                warn!("标准输入已关闭");
                break;
            }
        }

        if pending_modes && !engine.on_menu() {
            apply_modes(engine, auto, skip);
            pending_modes = false;
        }

        if report_events(engine) {
            println!("回车重新开始，load N 读档，q 退出");
            pending_modes = auto || skip;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_slots(entries: &[SlotEntry]) {
    for entry in entries {
        println!(
            "{:>2}  {:<16}  {}",
            entry.slot,
            entry.date_label(),
            entry.info_label()
        );
    }
}

fn run_check(config: &AppConfig) -> anyhow::Result<ExitCode> {
    if !config.assets_root.is_dir() {
        bail!("资源目录不存在: {}", config.assets_root.display());
    }

    let repository = FsRepository::new(&config.assets_root, &config.scene_index);
    let report = check_assets(&repository, &config.scene_index);

    for issue in &report.issues {
        println!("{issue}");
    }
    println!(
        "{} 个章节，{} 个场景，{} 行；{} 个错误，{} 个警告",
        report.chapters,
        report.scenes,
        report.lines,
        report.error_count(),
        report.issues.len() - report.error_count()
    );

    Ok(if report.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_slots(config: &AppConfig, delete: Option<u32>) -> anyhow::Result<ExitCode> {
    let max_slots = config.playback.max_save_slots;
    let mut snapshots = SnapshotStore::new(Box::new(FsStore::new(&config.saves_dir)), max_slots);

    if let Some(slot) = delete {
        if !snapshots.delete(slot) {
            bail!("删除槽位 {slot} 失败");
        }
        println!("已删除槽位 {slot}");
    }

    let entries: Vec<SlotEntry> = (1..=max_slots)
        .map(|slot| SlotEntry {
            slot,
            summary: snapshots.describe(slot),
        })
        .collect();
    print_slots(&entries);

    Ok(ExitCode::SUCCESS)
}
