//! 文档解析流程 - 流程层
//!
//! 按扩展名选择来源，统一产出 [`SectionMap`]：
//! - `.json`：之前保存的解析结果，直接加载
//! - `.pdf`：渲染 → 逐页抽取 → 切分
//! - 其他：已经带题号标记的文本，直接切分
//!
//! 后两种会把结果保存为 `<文件名>_questions.json` / `<文件名>_answers.json`

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::error::{AppError, AppResult, DocumentError};
use crate::infrastructure::PageRenderer;
use crate::models::{load_sections, save_sections, ExtractionKind, PageImage, SectionMap};
use crate::services::parse_sections;
use crate::workflow::section_extractor::SectionExtractor;

/// 输入来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Json,
    Pdf,
    Text,
}

impl SourceKind {
    pub fn of(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "json" => SourceKind::Json,
            "pdf" => SourceKind::Pdf,
            _ => SourceKind::Text,
        }
    }
}

/// 解析结果
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub sections: SectionMap,
    /// 新保存的中间结果路径（直接加载 JSON 时为 `None`）
    pub saved_to: Option<PathBuf>,
}

pub struct DocumentParser {
    renderer: Arc<dyn PageRenderer>,
    extractor: SectionExtractor,
    dpi: u32,
}

impl DocumentParser {
    pub fn new(renderer: Arc<dyn PageRenderer>, extractor: SectionExtractor, dpi: u32) -> Self {
        Self {
            renderer,
            extractor,
            dpi,
        }
    }

    pub fn kind(&self) -> ExtractionKind {
        self.extractor.kind()
    }

    /// 解析一个输入文件
    pub async fn parse(&self, path: &Path) -> AppResult<ParsedDocument> {
        let kind = self.kind();
        let content = match SourceKind::of(path) {
            SourceKind::Json => {
                let sections = load_sections(path).await?;
                return Ok(ParsedDocument {
                    sections,
                    saved_to: None,
                });
            }
            SourceKind::Pdf => {
                let pages = self.render(path).await?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                self.extractor.extract(&pages, &name).await?
            }
            SourceKind::Text => {
                info!("📄 读取已标注文本: {}", path.display());
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?
            }
        };

        let sections = parse_sections(&content, kind);
        let saved_to = save_sections(&sections, path, kind.json_suffix()).await?;
        Ok(ParsedDocument {
            sections,
            saved_to: Some(saved_to),
        })
    }

    async fn render(&self, path: &Path) -> AppResult<Vec<PageImage>> {
        info!("🖨️ 正在渲染 {} (DPI {})", path.display(), self.dpi);
        let renderer = Arc::clone(&self.renderer);
        let owned = path.to_path_buf();
        let dpi = self.dpi;
        let pages = tokio::task::spawn_blocking(move || renderer.render(&owned, dpi))
            .await
            .map_err(|e| DocumentError::OpenFailed {
                path: path.display().to_string(),
                reason: format!("渲染任务异常退出: {}", e),
            })??;
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecognitionError;
    use crate::services::RecognitionModel;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedPages(usize);

    impl PageRenderer for FixedPages {
        fn render(&self, _path: &Path, _dpi: u32) -> Result<Vec<PageImage>, DocumentError> {
            Ok((0..self.0).map(|i| PageImage::new(i, vec![0])).collect())
        }
    }

    struct Replies(Mutex<Vec<String>>);

    #[async_trait]
    impl RecognitionModel for Replies {
        async fn generate(
            &self,
            _prompt: &str,
            _image: Option<&PageImage>,
        ) -> Result<Option<String>, RecognitionError> {
            let mut replies = self.0.lock().unwrap();
            Ok(if replies.is_empty() {
                None
            } else {
                Some(replies.remove(0))
            })
        }
    }

    fn parser(kind: ExtractionKind, replies: &[&str]) -> DocumentParser {
        let model = Arc::new(Replies(Mutex::new(
            replies.iter().map(|r| r.to_string()).collect(),
        )));
        DocumentParser::new(
            Arc::new(FixedPages(replies.len())),
            SectionExtractor::new(model, kind),
            300,
        )
    }

    #[test]
    fn test_source_kind_by_extension() {
        assert_eq!(SourceKind::of(Path::new("a/b.JSON")), SourceKind::Json);
        assert_eq!(SourceKind::of(Path::new("exam.pdf")), SourceKind::Pdf);
        assert_eq!(SourceKind::of(Path::new("answers.txt")), SourceKind::Text);
        assert_eq!(SourceKind::of(Path::new("noext")), SourceKind::Text);
    }

    #[tokio::test]
    async fn test_pdf_source_is_extracted_and_saved() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("midterm.pdf");
        let parser = parser(
            ExtractionKind::Questions,
            &["題號：1\n配分：10\n甲", "題號：2\n配分：5\n乙"],
        );

        let parsed = parser.parse(&input).await.unwrap();
        assert_eq!(parsed.sections.ids(), vec!["1", "2"]);
        let saved = parsed.saved_to.unwrap();
        assert!(saved.ends_with("midterm_questions.json"));

        // 再次解析保存的 JSON 得到同样的结果
        let reloaded = parser.parse(&saved).await.unwrap();
        assert_eq!(reloaded.sections, parsed.sections);
        assert!(reloaded.saved_to.is_none());
    }

    #[tokio::test]
    async fn test_text_source_is_parsed_directly() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("answers.txt");
        tokio::fs::write(&input, "題號：1\n甲\n題號：1（續）\n乙").await.unwrap();

        let parsed = parser(ExtractionKind::Answers, &[]).parse(&input).await.unwrap();
        assert_eq!(parsed.sections.get("1").unwrap().text, "甲\n乙");
        assert!(parsed.saved_to.unwrap().ends_with("answers_answers.json"));
    }

    #[tokio::test]
    async fn test_missing_text_source_is_a_file_error() {
        let result = parser(ExtractionKind::Answers, &[])
            .parse(Path::new("/no/such/answers.txt"))
            .await;
        assert!(matches!(result, Err(AppError::File(_))));
    }
}
