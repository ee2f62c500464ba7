use anyhow::{anyhow, Result};
use clap::{CommandFactory, Parser};
use std::io::BufRead;
use temperature_monitor::config::{Cli, Commands, Config};
use temperature_monitor::monitor::{analyze_batch, run_interactive, MonitorSession};
use temperature_monitor::notify::{build_notifier, credentials};
use temperature_monitor::presenter::ConsolePresenter;

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let cli = Cli::parse();

    // 补全脚本不需要加载配置
    if let Some(Commands::Completions { shell }) = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "temperature-monitor", &mut std::io::stdout());
        return Ok(());
    }

    // 加载配置
    let config = Config::load_with_cli(cli.clone())?;

    // 初始化日志系统，guard 需要保持到程序结束
    let _log_guard = config.init_logging()?;

    tracing::info!("Temperature Monitor Starting...");

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(&config).await?,
        Commands::Analyze {
            readings,
            no_notify,
        } => analyze(&config, &readings, no_notify).await?,
        Commands::ShowConfig => {
            print!("{}", config.to_toml()?);
        }
        Commands::ResetConfig => {
            // 重置配置
            let default_config = Config::default();
            if let Some(config_path) = Config::get_user_config_path() {
                default_config.save_to_file(&config_path)?;
                println!("配置已重置到: {}", config_path.display());
            } else {
                println!("无法确定配置文件路径");
            }
        }
        Commands::SetPassword => set_password(&config)?,
        Commands::ClearPassword => clear_password(&config)?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// 交互式会话
async fn run(config: &Config) -> Result<()> {
    let (mut session, worker) = MonitorSession::from_config(config).await?;
    let worker_task = tokio::spawn(worker.run());

    let mut presenter = ConsolePresenter::stdout();
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    run_interactive(&mut session, stdin, &mut presenter).await?;

    // 丢弃会话以关闭调度器，等待未完成的投递
    drop(session);
    worker_task.await?;
    Ok(())
}

/// 一次性分析
async fn analyze(config: &Config, readings: &str, no_notify: bool) -> Result<()> {
    let mut config = config.clone();
    if no_notify {
        config.mail.enabled = false;
    }

    let notifier = build_notifier(&config.mail).await?;
    let mut presenter = ConsolePresenter::stdout();
    analyze_batch(&config, notifier, readings, &mut presenter).await?;
    Ok(())
}

/// 保存 SMTP 密码到 keyring
fn set_password(config: &Config) -> Result<()> {
    let sender = credentials::configured_sender(&config.mail)?;

    println!("请输入 {sender} 的 SMTP 密码（应用专用密码）:");
    let mut password = String::new();
    std::io::stdin().lock().read_line(&mut password)?;
    let password = password.trim_end_matches(&['\r', '\n'][..]);
    if password.is_empty() {
        return Err(anyhow!("密码不能为空"));
    }

    credentials::save_to_keyring(sender, password)?;
    println!("SMTP 密码已保存到系统 keyring");
    Ok(())
}

/// 删除 keyring 中的 SMTP 密码
fn clear_password(config: &Config) -> Result<()> {
    let sender = credentials::configured_sender(&config.mail)?;
    credentials::delete_from_keyring(sender)?;
    println!("已删除 {sender} 的 SMTP 密码");
    Ok(())
}
