//! 日志工具模块
//!
//! 提供日志初始化、格式化和输出的辅助函数
use anyhow::Result;
use std::fs;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::models::PageRange;

/// 初始化 tracing
///
/// 优先使用 `RUST_LOG`，否则 `verbose` 时为 debug，默认 info。重复调用无副作用。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
/// - `title`: 本次运行的标题
pub fn init_log_file(log_file_path: &str, title: &str) -> Result<()> {
    let log_header = format!(
        "{}\n{} - {}\n{}\n\n",
        "=".repeat(60),
        title,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 向日志文件追加一行
pub fn append_log_line(log_file_path: &str, line: &str) -> Result<()> {
    use std::io::Write;
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;
    writeln!(file, "{}", line)?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(command: &str, input: &Path) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - {}", command);
    info!("📄 输入文件: {}", input.display());
    info!("{}", "=".repeat(60));
}

/// 打印抽取统计
///
/// # 参数
/// - `sections`: 解析出的题号数
/// - `output`: 中间结果保存路径
pub fn print_extraction_stats(sections: usize, output: &Path) {
    info!("\n{}", "=".repeat(60));
    info!("📊 抽取完成");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("✅ 共 {} 个题号", sections);
    info!("💾 结果已保存至: {}", output.display());
    info!("{}", "=".repeat(60));
}

/// 打印学生区间表
pub fn print_partition_table(ranges: &[PageRange]) {
    info!("\n{}", "─".repeat(60));
    info!("{:<16}| {:<10}| {:<10}| 页数", "学号", "起始页", "结束页");
    info!("{}", "─".repeat(60));
    for range in ranges {
        info!(
            "{:<16}| {:<10}| {:<10}| {}",
            range.student_id,
            range.start_page + 1,
            range.end_page + 1,
            range.len()
        );
    }
    info!("{}", "─".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text_counts_chars() {
        assert_eq!(truncate_text("題號：1 答案", 4), "題號：1...");
        assert_eq!(truncate_text("short", 10), "short");
    }

    #[test]
    fn test_log_file_header_and_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.txt");
        let path = path.to_str().unwrap();

        init_log_file(path, "抽取日志").unwrap();
        append_log_line(path, "第 1 页完成").unwrap();

        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("抽取日志 - "));
        assert!(content.ends_with("第 1 页完成\n"));
    }
}
