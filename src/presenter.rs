//! 展示层接口
//!
//! 会话只通过 [`Presenter`] 与界面交互，不直接管理窗口或控件。

use crate::health::AnalysisResult;
use std::io::Write;

/// 展示协作方
pub trait Presenter {
    /// 显示最新的分析结果
    fn show_analysis(&mut self, analysis: &AnalysisResult);

    /// 清空分析结果区域
    fn clear_analysis(&mut self);

    /// 成功/提示信息
    fn info(&mut self, title: &str, message: &str);

    /// 错误信息
    fn error(&mut self, title: &str, message: &str);
}

/// 输出到终端（或任意 writer）的展示实现
pub struct ConsolePresenter<W: Write> {
    writer: W,
}

impl ConsolePresenter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> ConsolePresenter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_block(&mut self, text: &str) {
        if let Err(e) = writeln!(self.writer, "{text}").and_then(|_| self.writer.flush()) {
            tracing::warn!("无法写入输出: {}", e);
        }
    }
}

impl<W: Write> Presenter for ConsolePresenter<W> {
    fn show_analysis(&mut self, analysis: &AnalysisResult) {
        self.write_block(&format!("Analysis:\n{analysis}"));
    }

    fn clear_analysis(&mut self) {
        self.write_block("Analysis:");
    }

    fn info(&mut self, title: &str, message: &str) {
        self.write_block(&format!("[{title}] {message}"));
    }

    fn error(&mut self, title: &str, message: &str) {
        self.write_block(&format!("[{title}] {message}"));
    }
}
