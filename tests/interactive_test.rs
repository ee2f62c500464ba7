//! 交互循环测试
//!
//! 用脚本化输入驱动完整的交互会话

use anyhow::Result;
use std::sync::Arc;
use temperature_monitor::health::{AnalysisReporter, ReadingStore};
use temperature_monitor::monitor::{interactive, run_interactive, MonitorSession};
use temperature_monitor::notify::{create_dispatcher, NotificationError};
use temperature_monitor::presenter::ConsolePresenter;
use temperature_monitor::testing::{PresenterEvent, RecordingNotifier, RecordingPresenter};

fn create_test_session(notifier: Arc<RecordingNotifier>) -> Result<MonitorSession> {
    let (dispatcher, worker) = create_dispatcher(notifier, 8);
    tokio::spawn(worker.run());
    Ok(MonitorSession::new(
        ReadingStore::new(37.5)?,
        AnalysisReporter::default(),
        dispatcher,
    ))
}

#[tokio::test]
async fn test_scripted_session() -> Result<()> {
    let notifier = Arc::new(RecordingNotifier::new());
    let mut session = create_test_session(notifier.clone())?;
    let mut presenter = RecordingPresenter::new();

    let script = "36.5, 36.9\n36.5, abc\n38.4\nshow\nclear\nshow\nexit\n36.0\n";
    run_interactive(&mut session, script.as_bytes(), &mut presenter).await?;

    assert_eq!(
        presenter.infos(),
        vec![
            interactive::HELP,
            interactive::ADDED,
            interactive::ADDED,
            interactive::ALERT_SENT,
            interactive::CLEARED,
        ]
    );
    assert_eq!(presenter.errors(), vec![interactive::INVALID_INPUT]);
    assert!(presenter.events.contains(&PresenterEvent::Cleared));

    // 清空后 show 显示空结果，exit 之后的输入不再处理
    let last = presenter.last_analysis().unwrap();
    assert_eq!(last.total_readings, 0);
    assert!(session.readings().is_empty());
    assert_eq!(notifier.call_count(), 1);

    Ok(())
}

#[tokio::test]
async fn test_failure_message_per_kind() -> Result<()> {
    let cases = [
        (
            NotificationError::Authentication("535".into()),
            "SMTP Authentication Error: Check your email and password.",
        ),
        (
            NotificationError::Connection("refused".into()),
            "SMTP Connection Error: Unable to connect to the server.",
        ),
        (
            NotificationError::Protocol("552 message too large".into()),
            "SMTP Error: 552 message too large",
        ),
    ];

    for (error, expected) in cases {
        let notifier = Arc::new(RecordingNotifier::new().fail_with(error));
        let mut session = create_test_session(notifier)?;
        let mut presenter = RecordingPresenter::new();

        run_interactive(&mut session, "39.5\n".as_bytes(), &mut presenter).await?;
        assert_eq!(presenter.errors(), vec![expected]);
        assert_eq!(session.readings(), &[39.5]);
    }

    Ok(())
}

#[tokio::test]
async fn test_console_transcript() -> Result<()> {
    let notifier = Arc::new(RecordingNotifier::new());
    let mut session = create_test_session(notifier)?;
    let mut presenter = ConsolePresenter::new(Vec::new());

    run_interactive(&mut session, "36.0, 38.0\n".as_bytes(), &mut presenter).await?;

    let output = String::from_utf8(presenter.into_inner())?;
    assert!(output.contains("[Success] Temperature readings added successfully!"));
    assert!(output.contains("Total readings: 2\nAverage temperature: 37.00\nOutliers: [38.0]"));
    assert!(output.contains("[Success] Alert sent successfully!"));

    Ok(())
}
