//! 交互循环
//!
//! 逐行读取用户输入并转发给会话，结果交给展示层

use super::MonitorSession;
use crate::health::AlertOutcome;
use crate::notify::{DeliveryChannel, NotificationStatus};
use crate::presenter::Presenter;
use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

pub const TITLE: &str = "Body Temperature Monitor";

pub const HELP: &str = "Enter temperatures (comma-separated), e.g. 36.5, 38.1, 37.0\n\
                        Commands: show | clear | help | exit";

pub const ADDED: &str = "Temperature readings added successfully!";
pub const INVALID_INPUT: &str = "Invalid input. Please enter numeric values separated by commas.";
pub const CLEARED: &str = "Temperature readings cleared.";
pub const ALERT_SENT: &str = "Alert sent successfully!";
pub const ALERT_LOGGED: &str = "Alert recorded in the log (mail alerts are disabled).";

/// 用户输入的一行
#[derive(Debug, PartialEq)]
enum Command<'a> {
    Add(&'a str),
    Show,
    Clear,
    Help,
    Exit,
    Nothing,
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Self {
        match line.trim() {
            "" => Command::Nothing,
            "show" => Command::Show,
            "clear" => Command::Clear,
            "help" | "?" => Command::Help,
            "exit" | "quit" => Command::Exit,
            readings => Command::Add(readings),
        }
    }
}

/// 运行交互循环，直到用户退出或输入结束
pub async fn run_interactive<R, P>(session: &mut MonitorSession, reader: R, presenter: &mut P) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    P: Presenter,
{
    presenter.info(TITLE, HELP);
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Command::Add(input) => add_readings(session, input, presenter).await,
            Command::Show => presenter.show_analysis(&session.analysis()),
            Command::Clear => {
                session.clear();
                presenter.clear_analysis();
                presenter.info("Success", CLEARED);
            }
            Command::Help => presenter.info(TITLE, HELP),
            Command::Exit => break,
            Command::Nothing => {}
        }
    }

    tracing::info!("交互会话结束");
    Ok(())
}

async fn add_readings<P: Presenter>(session: &mut MonitorSession, input: &str, presenter: &mut P) {
    let submission = match session.submit(input).await {
        Ok(submission) => submission,
        Err(_) => {
            presenter.error("Error", INVALID_INPUT);
            return;
        }
    };

    presenter.info("Success", ADDED);
    presenter.show_analysis(&submission.analysis);

    if let Some(pending) = submission.pending {
        report_delivery(pending.wait().await, presenter);
    }
}

/// 把投递结果转换为用户提示
pub fn report_delivery<P: Presenter>(status: NotificationStatus, presenter: &mut P) {
    match status {
        NotificationStatus::Delivered {
            notifier,
            channel,
            delivered_at,
        } => {
            tracing::info!("报警已由 {} 于 {} 投递", notifier, delivered_at.to_rfc3339());
            report_channel(channel, presenter);
        }
        NotificationStatus::Failed(e) => presenter.error("Error", &e.user_message()),
    }
}

/// 把同步报警结果转换为用户提示
pub fn report_alert_outcome<P: Presenter>(outcome: AlertOutcome, presenter: &mut P) {
    match outcome {
        AlertOutcome::NotRequired => {}
        AlertOutcome::Delivered(channel) => report_channel(channel, presenter),
        AlertOutcome::Failed(e) => presenter.error("Error", &e.user_message()),
    }
}

fn report_channel<P: Presenter>(channel: DeliveryChannel, presenter: &mut P) {
    match channel {
        DeliveryChannel::Mail => presenter.info("Success", ALERT_SENT),
        DeliveryChannel::Log => presenter.info("Alert", ALERT_LOGGED),
    }
}
