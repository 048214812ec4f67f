use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use portal_chat::{
    send_transcript, ApiConfig, ChatApi, ChatHandle, ChatOptions, FileSessionStore,
    FileTranscript, ReplyMode, SessionStore, StreamingChatClient, TurnOutcome,
};
use portal_config::{Config, ConfigManager};
use portal_observability::LogManager;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

mod view;

use view::ConsoleView;

type CliClient = StreamingChatClient<ConsoleView<io::Stdout>>;

#[derive(Parser)]
#[command(name = "portal-cli")]
#[command(about = "社区物业门户智能客服命令行")]
#[command(version)]
struct Cli {
    /// Override server.url from the config file
    #[arg(long)]
    server_url: Option<String>,

    /// Enable debug mode
    #[arg(long, short, default_value = "false")]
    debug: bool,

    /// Config file path
    #[arg(long, env = "PORTAL_CONFIG", default_value = "~/.portal/config.json")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 启动交互式聊天
    Chat(ReplyArgs),
    /// 发送单条消息
    Send {
        /// 消息内容
        message: String,
        #[command(flatten)]
        reply: ReplyArgs,
    },
    /// 查看当前会话的服务端历史
    History,
    /// 查看服务状态
    Info,
    /// 配置管理命令
    Config(ConfigArgs),
}

#[derive(Args, Clone)]
struct ReplyArgs {
    /// 一次性获取完整回复，而不是流式输出
    #[arg(long, default_value = "false")]
    blocking: bool,

    /// 清空对话时不再确认
    #[arg(long, short, default_value = "false")]
    yes: bool,
}

#[derive(Args, Clone)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// 获取配置值
    Get {
        /// 配置键 (如: server.url, chat.quick_questions)
        key: String,
    },
    /// 设置配置值
    Set {
        /// 配置键 (如: server.url, chat.quick_questions)
        key: String,
        /// 配置值
        value: String,
    },
    /// 初始化默认配置
    Init {
        /// 强制覆盖已有配置
        #[arg(long, default_value = "false")]
        force: bool,
    },
    /// 显示当前配置
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 展开配置文件路径
    let config_path =
        portal_config::expand_tilde(&cli.config).unwrap_or_else(|| PathBuf::from(&cli.config));

    if cli.debug {
        eprintln!("{}", "[DEBUG] Debug mode enabled".dimmed());
        eprintln!("{}", format!("[DEBUG] Config path: {:?}", config_path).dimmed());
    }

    let command = match cli.command {
        Commands::Config(args) => return handle_config(args, &config_path).await,
        command => command,
    };

    let manager = ConfigManager::load(&config_path).await?;
    let mut config = manager.snapshot().await;
    if let Some(url) = &cli.server_url {
        config.server.url = url.trim_end_matches('/').to_string();
    }

    let _log_manager = init_logging(&config, cli.debug)?;
    let _span = portal_observability::create_surface_span("mobile").entered();

    if cli.debug {
        eprintln!("{}", format!("[DEBUG] API base: {}", config.server.api_base()).dimmed());
    }

    match command {
        Commands::Chat(reply) => run_interactive_chat(&config, &reply).await,
        Commands::Send { message, reply } => send_once(&config, &reply, &message).await,
        Commands::History => show_history(&config).await,
        Commands::Info => show_info(&config).await,
        Commands::Config(_) => Ok(()),
    }
}

fn init_logging(config: &Config, debug: bool) -> anyhow::Result<LogManager> {
    // stdout carries the conversation, logs stay on stderr and quiet by default
    let level = if debug { "debug" } else { "warn" };
    let observability = portal_observability::Config::from(config)
        .with_app_name("portal-cli")
        .with_log_level(level);
    Ok(LogManager::init(&observability)?)
}

fn api_config(config: &Config) -> ApiConfig {
    ApiConfig {
        server_url: config.server.url.clone(),
        api_path: config.server.api_path.clone(),
        connect_timeout: Duration::from_secs(config.server.connect_timeout_secs),
        request_timeout: Duration::from_secs(config.server.request_timeout_secs),
    }
}

fn session_store(config: &Config) -> anyhow::Result<Arc<FileSessionStore>> {
    let dir = config
        .chat
        .session_dir
        .as_deref()
        .and_then(portal_config::expand_tilde)
        .or_else(portal_config::default_session_dir)
        .ok_or_else(|| anyhow::anyhow!("Could not resolve the session directory"))?;
    Ok(Arc::new(FileSessionStore::new(dir)))
}

fn build_client(config: &Config, reply: &ReplyArgs, echo_user: bool) -> anyhow::Result<CliClient> {
    let api = ChatApi::new(&api_config(config))?;
    let mode = if reply.blocking {
        ReplyMode::Blocking
    } else {
        ReplyMode::Stream
    };
    let options = ChatOptions::new(config.chat.mobile_session_key.clone())
        .with_typing_indicator(true)
        .with_reply_mode(mode);
    let view = ConsoleView::stdout()
        .with_assume_yes(reply.yes)
        .with_echo_user(echo_user);

    Ok(StreamingChatClient::new(api, session_store(config)?, view, options))
}

/// What a Ctrl+C did
#[derive(Debug, PartialEq, Eq)]
enum Interrupt {
    StoppedTurn,
    Quit,
}

/// Ctrl+C stops the reply in flight; with nothing running it tears the
/// client down and the process should exit.
fn route_interrupt(handle: &ChatHandle) -> Interrupt {
    if handle.stop_turn() {
        Interrupt::StoppedTurn
    } else {
        handle.dispose();
        Interrupt::Quit
    }
}

/// Owns SIGINT for the lifetime of the client. Once tokio has installed its
/// handler the default disposition is gone, so every Ctrl+C, including ones
/// pressed at a blocking stdin prompt, has to be routed here.
fn spawn_interrupt_listener(handle: ChatHandle) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for Ctrl+C: {}", e);
                return;
            }
            match route_interrupt(&handle) {
                Interrupt::StoppedTurn => eprintln!("{}", "⏹  已停止".dimmed()),
                Interrupt::Quit => {
                    println!("\n{}", "👋 再见!".cyan());
                    std::process::exit(130);
                }
            }
        }
    })
}

async fn send_once(config: &Config, reply: &ReplyArgs, message: &str) -> anyhow::Result<()> {
    let mut client = build_client(config, reply, true)?;
    let interrupts = spawn_interrupt_listener(client.handle());
    client.init().await?;

    let outcome = client.send_message(message).await?;
    tracing::debug!("Turn ended: {:?}", outcome);
    interrupts.abort();
    client.dispose();

    match outcome {
        TurnOutcome::Finalized(_) | TurnOutcome::Ignored => Ok(()),
        TurnOutcome::Discarded(reason) => Err(anyhow::anyhow!("reply discarded: {:?}", reason)),
    }
}

async fn run_interactive_chat(config: &Config, reply: &ReplyArgs) -> anyhow::Result<()> {
    let mut client = build_client(config, reply, false)?;
    let interrupts = spawn_interrupt_listener(client.handle());

    println!("{}", "🏠 社区智能客服".cyan().bold());
    println!("{}", format!("服务地址: {}", config.server.url).dimmed());
    print_help(config);
    println!();

    client.init().await?;
    if let Some(id) = client.session_id() {
        println!("{}", format!("会话: {}", id).dimmed());
    }
    let _session = portal_observability::create_session_span(client.session_id()).entered();

    loop {
        print!("{} ", "我:".cyan().bold());
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        match parse_command(input) {
            Some(ChatCommand::Quit) => {
                println!("{}", "👋 再见!".cyan());
                break;
            }
            Some(ChatCommand::Clear) => {
                client.clear_chat().await?;
            }
            Some(ChatCommand::Help) => print_help(config),
            Some(ChatCommand::History) => match client.fetch_history().await {
                Ok(history) if history.is_empty() => println!("{}", "(暂无历史)".dimmed()),
                Ok(history) => {
                    for entry in history {
                        println!("{} {}", format!("{}:", entry.role).bold(), entry.content);
                    }
                }
                Err(e) => println!("{}", format!("❌ 获取历史失败: {}", e).red()),
            },
            Some(ChatCommand::Quick(n)) => {
                match n.checked_sub(1).and_then(|i| config.chat.quick_questions.get(i)) {
                    Some(question) => {
                        println!("{} {}", "我:".cyan().bold(), question);
                        client.send_message(question).await?;
                    }
                    None => println!("{}", format!("❌ 没有第 {} 个快捷问题", n).red()),
                }
            }
            Some(ChatCommand::Voice(path)) => {
                let source = FileTranscript::new(path);
                let outcome = send_transcript(&mut client, &source).await?;
                tracing::debug!("Voice turn ended: {:?}", outcome);
            }
            Some(ChatCommand::Invalid(reason)) => println!("{}", format!("❌ {}", reason).red()),
            None => {
                client.send_message(input).await?;
            }
        }
    }

    interrupts.abort();
    client.dispose();
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum ChatCommand {
    Quit,
    Clear,
    Help,
    History,
    Quick(usize),
    Voice(PathBuf),
    Invalid(String),
}

/// Slash commands of the interactive loop; plain text returns None.
fn parse_command(input: &str) -> Option<ChatCommand> {
    let rest = input.strip_prefix('/')?;
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    let command = match name {
        "quit" | "exit" => ChatCommand::Quit,
        "clear" => ChatCommand::Clear,
        "help" => ChatCommand::Help,
        "history" => ChatCommand::History,
        "quick" => match arg.parse() {
            Ok(n) => ChatCommand::Quick(n),
            Err(_) => ChatCommand::Invalid("用法: /quick N".to_string()),
        },
        "voice" if !arg.is_empty() => ChatCommand::Voice(PathBuf::from(arg)),
        "voice" => ChatCommand::Invalid("用法: /voice FILE".to_string()),
        other => ChatCommand::Invalid(format!("未知命令: /{}", other)),
    };
    Some(command)
}

fn print_help(config: &Config) {
    println!(
        "{}",
        "/clear 清空对话  /history 历史  /quick N 快捷问题  /voice FILE 语音  /quit 退出".dimmed()
    );
    for (i, question) in config.chat.quick_questions.iter().enumerate() {
        println!("{}", format!("  {}. {}", i + 1, question).dimmed());
    }
}

async fn show_history(config: &Config) -> anyhow::Result<()> {
    let store = session_store(config)?;
    if store.load(&config.chat.mobile_session_key).await?.is_none() {
        println!("{}", "❌ 还没有会话, 请先使用 chat 或 send".red());
        return Ok(());
    }

    let reply = ReplyArgs {
        blocking: false,
        yes: false,
    };
    let mut client = build_client(config, &reply, false)?;
    client.init().await?;

    let history = client.fetch_history().await?;
    println!(
        "{}",
        format!("📜 会话 {} 共 {} 条消息", client.session_id().unwrap_or("-"), history.len()).cyan()
    );
    for entry in history {
        println!("{} {}", format!("{}:", entry.role).bold(), entry.content);
    }
    Ok(())
}

async fn show_info(config: &Config) -> anyhow::Result<()> {
    let api = ChatApi::new(&api_config(config))?;

    match api.health().await {
        Ok(health) => println!(
            "{}",
            format!(
                "✅ {} {}",
                health.status,
                health.message.unwrap_or_default()
            )
            .green()
        ),
        Err(e) => {
            println!("{}", format!("❌ 服务不可用: {}", e).red());
            return Ok(());
        }
    }

    let info = api.info().await?;
    println!("{}", format!("📋 {} v{} ({})", info.name, info.version, info.status).cyan().bold());
    for module in info.modules {
        println!("   • {}", module);
    }
    Ok(())
}

async fn handle_config(args: ConfigArgs, config_path: &Path) -> anyhow::Result<()> {
    match args.command {
        ConfigCommands::Get { key } => {
            let manager = ConfigManager::load(config_path).await?;
            let config = manager.snapshot().await;

            match config.get_value(&key) {
                Some(value) => {
                    println!("{}", format!("{} = {}", key, value).green());
                }
                None => {
                    println!("{}", format!("❌ Key not found: {}", key).red());
                    std::process::exit(1);
                }
            }
        }
        ConfigCommands::Set { key, value } => {
            let manager = ConfigManager::load(config_path).await?;

            if let Err(e) = manager.update(|config| config.set_value(&key, &value)).await {
                eprintln!("{}", format!("❌ Failed to set value: {}", e).red());
                std::process::exit(1);
            }
            println!("{}", format!("✅ Set {} = {}", key, value).green());
        }
        ConfigCommands::Init { force } => {
            if config_path.exists() && !force {
                println!("{}", format!("⚠️  Config already exists at {:?}", config_path).yellow());
                println!("{}", "Use --force to overwrite".dimmed());
                return Ok(());
            }

            // 初始化目录
            portal_config::init_portal_dirs().await?;

            let manager = ConfigManager::new(Config::default(), config_path.to_path_buf());
            manager.save().await?;

            println!("{}", format!("✅ Config initialized at {:?}", config_path).green());
            println!("{}", "You can edit this file to customize your settings".dimmed());
        }
        ConfigCommands::Show => {
            let manager = ConfigManager::load(config_path).await?;
            let config = manager.snapshot().await;

            println!("{}", "📋 Current Configuration:".cyan().bold());
            println!();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
