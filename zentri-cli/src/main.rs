//! Zentri 门诊排队终端主程序

mod config;
mod demo;
mod logging;
mod shell;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;
use zentri_core::ReferenceCatalog;
use zentri_queue::{ConsultationConsole, QrScanner, QueueStore, SimulatedScanner};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "zentri")]
#[command(about = "Zentri 门诊排队演示终端")]
struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 日志级别，覆盖配置文件
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 运行完整的排队演示
    Demo,
    /// 交互式终端，从标准输入读取命令
    Shell,
    /// 输出当前生效的配置
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = config::load_config(args.config.as_deref())?;
    if let Some(level) = args.log_level {
        settings.logging.level = level;
    }

    // 初始化日志
    logging::init_logging(&settings.logging)?;

    info!("启动Zentri排队终端...");
    info!("  扫码延迟: {:?}", settings.scanner.delay());
    info!("  默认诊室: {} / {}", settings.console.department, settings.console.doctor);

    let store = QueueStore::new(ReferenceCatalog::seeded());
    let console = ConsultationConsole::new(&settings.console.department, &settings.console.doctor);
    let scanner: Arc<dyn QrScanner> = Arc::new(SimulatedScanner::new(settings.scanner.delay()));

    match args.command {
        Command::Demo => demo::run(store, console, scanner).await,
        Command::Shell => shell::run(shell::Session::new(store, console, scanner)).await,
        Command::Config => {
            println!("{}", config::render_config(&settings)?);
            Ok(())
        }
    }
}
