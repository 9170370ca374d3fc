//! 后台聊天命令行客户端
//!
//! 用本地会话身份列出联系人、打开会话、发送和删除消息。
//! 交互命令：直接输入文本发送，`/delete <id>` 删除，`/refresh` 刷新，`/quit` 退出。

use anyhow::{anyhow, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use console_chat_sdk::im::conversation::view::SELECT_PROMPT;
use console_chat_sdk::im::conversation::{render_directory, Alignment, Bubble};
use console_chat_sdk::{
    ChatBackend, ChatProfile, ClientConfig, ConversationPane, CounterpartLoader, HttpChatBackend,
    LocalIdentity, Message, PaneListener, PaneState, Role, Session, SessionSnapshot, SessionStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

/// 后台聊天客户端
#[derive(Parser, Debug)]
#[command(name = "console-chat")]
#[command(about = "后台聊天客户端 - 管理员 / 供应商 / 保险公司之间的站内消息", long_about = None)]
struct Args {
    #[command(flatten)]
    identity: IdentityArgs,

    /// API 基础地址
    #[arg(long, env = "CONSOLE_CHAT_API_URL")]
    api_url: Option<String>,

    /// 轮询间隔（秒），只对保险公司端生效
    #[arg(long, env = "CONSOLE_CHAT_POLL_SECS")]
    poll_secs: Option<u64>,

    /// 日志级别（默认: info,console_chat_sdk=debug）
    #[arg(long, default_value = "info,console_chat_sdk=debug")]
    log_level: String,

    /// 额外写入日志文件
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
struct IdentityArgs {
    /// 会话文件路径
    #[arg(long, env = "CONSOLE_CHAT_SESSION")]
    session: Option<PathBuf>,

    /// 用户ID（与 --role、--token 一起覆盖会话文件）
    #[arg(long)]
    user_id: Option<String>,

    /// 角色: admin / vendor / insuranceCompany
    #[arg(long)]
    role: Option<Role>,

    #[arg(long, env = "CONSOLE_CHAT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// 把命令行身份写入会话文件
    #[arg(long)]
    save_session: bool,

    /// 管理员的用户ID（供应商、保险公司端的固定聊天对象）
    #[arg(long, env = "CONSOLE_CHAT_ADMIN_ID")]
    admin_id: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 列出可以聊天的联系人
    List,
    /// 打开会话并进入交互模式
    Open {
        /// 联系人ID（管理员必填，其他角色固定和管理员聊天）
        counterpart_id: Option<String>,
    },
    /// 清除本地会话
    Logout,
}

/// 初始化日志（输出到 stderr，stdout 留给聊天内容；可选同时写文件）
fn init_logger(log_level: &str, log_file: Option<&PathBuf>) -> Result<()> {
    use std::fs::OpenOptions;
    use std::io;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    // 优先使用环境变量 RUST_LOG，否则使用命令行参数
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(true);

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("无法创建日志文件 {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_file(true)
                    .with_line_number(true)
                    .with_target(false)
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    if let Some(path) = log_file {
        info!("[CLI] 📝 日志同时写入文件: {}", path.display());
    }
    Ok(())
}

/// 解析当前身份：命令行参数优先，其次会话文件
fn resolve_identity(session: &Session, args: &IdentityArgs) -> Result<SessionSnapshot> {
    match (&args.user_id, args.role) {
        (Some(user_id), Some(role)) => {
            let mut identity = LocalIdentity::new(user_id.clone(), role);
            if let Some(token) = &args.token {
                identity = identity.with_token(token.clone());
            }
            if args.save_session {
                Ok(session.login(identity)?)
            } else {
                Ok(SessionSnapshot::new(identity))
            }
        }
        (Some(_), None) | (None, Some(_)) => Err(anyhow!("--user-id 和 --role 需要同时提供")),
        (None, None) => session
            .snapshot()
            .ok_or_else(|| anyhow!("没有本地会话，请使用 --user-id/--role/--token 登录")),
    }
}

/// 终端监听器：把面板变化打印到 stdout
struct CliPaneListener {
    local_user_id: String,
}

impl CliPaneListener {
    fn print(&self, message: &Message) {
        let bubble = Bubble::from_message(message, &self.local_user_id);
        let who = match bubble.alignment {
            Alignment::Right => "我",
            Alignment::Left => message.sender.as_str(),
        };
        println!("  [{}] {} ({}): {}", bubble.timestamp, who, bubble.message_id, bubble.text);
    }
}

#[async_trait::async_trait]
impl PaneListener for CliPaneListener {
    async fn on_state_changed(&self, state: PaneState) {
        match state {
            PaneState::NoCounterpartSelected => println!("{}", SELECT_PROMPT),
            PaneState::CounterpartSelected { counterpart_id, phase } => {
                info!("[CLI/Pane] 🔄 {} -> {:?}", counterpart_id, phase);
            }
        }
    }

    async fn on_messages_replaced(&self, messages: Vec<Message>) {
        println!("---- 共 {} 条消息 ----", messages.len());
        for m in &messages {
            self.print(m);
        }
    }

    async fn on_message_appended(&self, message: Message) {
        self.print(&message);
    }

    async fn on_message_removed(&self, message_id: String) {
        println!("  (已删除 {})", message_id);
    }

    async fn on_scroll_to_latest(&self) {}
}

async fn run_list(backend: Arc<dyn ChatBackend>, profile: &ChatProfile) -> Result<()> {
    if profile.directory.is_empty() {
        match &profile.fixed_receiver {
            Some(admin) => println!("{}", admin),
            None => warn!("[CLI] 当前角色没有可用的联系人列表"),
        }
        return Ok(());
    }
    let directory = CounterpartLoader::new(backend, profile.directory).load().await;
    info!("[CLI] 📋 联系人（共 {} 个）", directory.len());
    for (i, line) in render_directory(&directory).iter().enumerate() {
        println!("{:>3}. {}", i + 1, line);
    }
    Ok(())
}

async fn run_open(
    backend: Arc<dyn ChatBackend>,
    profile: ChatProfile,
    snapshot: SessionSnapshot,
    counterpart_id: Option<String>,
) -> Result<()> {
    let listener = Arc::new(CliPaneListener {
        local_user_id: snapshot.user_id().to_string(),
    });
    let pane = ConversationPane::with_listener(backend.clone(), profile.clone(), snapshot, listener);

    let opened = match (&profile.fixed_receiver, counterpart_id) {
        (Some(_), _) => pane.open().await,
        (None, Some(id)) => {
            let directory = CounterpartLoader::new(backend, profile.directory).load().await;
            let counterpart = directory
                .find(&id)
                .cloned()
                .ok_or_else(|| anyhow!("联系人不存在: {}", id))?;
            pane.select(counterpart).await
        }
        (None, None) => return Err(anyhow!("管理员需要指定联系人ID")),
    };
    if let Err(e) = opened {
        error!("[CLI] ❌ 加载历史消息失败: {}", e);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line == "/quit" {
            break;
        } else if line == "/refresh" {
            if let Err(e) = pane.refresh().await {
                error!("[CLI] ❌ 刷新失败: {}", e);
            }
        } else if let Some(id) = line.strip_prefix("/delete ") {
            match pane.delete_message(id.trim()).await {
                Ok(true) => {}
                Ok(false) => warn!("[CLI] 当前会话没有消息 {}", id.trim()),
                Err(e) => error!("[CLI] ❌ 删除失败: {}", e),
            }
        } else {
            pane.set_draft(line).await;
            if let Err(e) = pane.send_draft().await {
                error!("[CLI] ❌ 发送失败，可以重新输入: {}", e);
            }
        }
    }

    pane.close().await;
    info!("[CLI] 👋 退出会话");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(&args.log_level, args.log_file.as_ref())?;

    let mut config = ClientConfig::from_env()?;
    if let Some(url) = &args.api_url {
        config.api_base_url = url.clone();
    }
    if let Some(secs) = args.poll_secs {
        config = config.with_poll_interval(Duration::from_secs(secs));
    }
    if let Some(path) = &args.identity.session {
        config = config.with_session_path(path.clone());
    }
    config.validate()?;

    let session = Session::restore(SessionStore::new(config.session_path.clone()))?;
    if let Command::Logout = args.command {
        session.logout()?;
        return Ok(());
    }

    let snapshot = resolve_identity(&session, &args.identity)?;
    info!(
        "[CLI] 🚀 用户ID: {}, 角色: {}, API: {}",
        snapshot.user_id(),
        snapshot.role(),
        config.api_base_url
    );

    let profile = ChatProfile::for_role(snapshot.role(), args.identity.admin_id.as_deref())
        .ok_or_else(|| anyhow!("角色 {} 需要 --admin-id", snapshot.role()))?
        .with_poll_interval(config.poll_interval);
    let backend: Arc<dyn ChatBackend> = Arc::new(HttpChatBackend::connect(&config, &snapshot)?);

    match args.command {
        Command::List => run_list(backend, &profile).await,
        Command::Open { counterpart_id } => run_open(backend, profile, snapshot, counterpart_id).await,
        Command::Logout => Ok(()),
    }
}
