//! 页面处理上下文
//!
//! 封装"我正在处理哪份文档的第几页"这一信息，只用于日志

use std::fmt::Display;

use crate::models::ExtractionKind;

#[derive(Debug, Clone)]
pub struct PageCtx {
    /// 文档名（仅用于日志显示）
    pub document: String,
    /// 从 0 开始的页码
    pub page_index: usize,
    pub total_pages: usize,
    pub kind: ExtractionKind,
}

impl PageCtx {
    pub fn new(document: &str, page_index: usize, total_pages: usize, kind: ExtractionKind) -> Self {
        Self {
            document: document.to_string(),
            page_index,
            total_pages,
            kind,
        }
    }
}

impl Display for PageCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            ExtractionKind::Questions => "题目",
            ExtractionKind::Answers => "答案",
        };
        write!(
            f,
            "[{} {} 第 {}/{} 页]",
            kind,
            self.document,
            self.page_index + 1,
            self.total_pages
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_one_based() {
        let ctx = PageCtx::new("final.pdf", 0, 3, ExtractionKind::Answers);
        assert_eq!(ctx.to_string(), "[答案 final.pdf 第 1/3 页]");
    }
}
