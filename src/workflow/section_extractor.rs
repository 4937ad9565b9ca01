//! 逐页抽取流程 - 流程层
//!
//! 核心职责：定义"一份文档"的完整抽取流程
//!
//! 每一页的顺序：
//! 1. 根据跨页状态生成提示
//! 2. 调用识别模型（限流重试由模型包装层负责）
//! 3. 页首没有题号时补续写标记
//! 4. 以本页之前的状态校正题号
//! 5. 用校正后的题号推进状态
//! 6. 拼接到输出文本
//!
//! 页面按顺序处理，不并发：后一页依赖前一页的状态。

use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

use crate::error::RecognitionError;
use crate::models::label::scan_labels;
use crate::models::{ExtractionKind, PageImage};
use crate::services::{prompts, LabelValidator, RecognitionModel};
use crate::utils::truncate_text;
use crate::workflow::continuity::ContinuityTracker;
use crate::workflow::page_ctx::PageCtx;

/// 默认续写判断窗口（字符）
pub const DEFAULT_CONTINUATION_WINDOW: usize = 300;

/// 抽取进度事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionEvent {
    PageStarted { page: usize, total: usize },
    PageCompleted {
        page: usize,
        /// 本页校正后的题号（含续写）
        labels: Vec<String>,
        corrections: usize,
    },
    PageSkipped { page: usize, reason: String },
    Finished { pages: usize, skipped: usize },
}

/// 逐页抽取流程
///
/// - 不持有渲染资源，只接收已经渲染好的页面
/// - 每次 `extract` 使用独立的跨页状态
pub struct SectionExtractor {
    model: Arc<dyn RecognitionModel>,
    validator: LabelValidator,
    kind: ExtractionKind,
    continuation_window: usize,
    events: Option<UnboundedSender<ExtractionEvent>>,
}

impl SectionExtractor {
    pub fn new(model: Arc<dyn RecognitionModel>, kind: ExtractionKind) -> Self {
        Self {
            model,
            validator: LabelValidator::heuristic(),
            kind,
            continuation_window: DEFAULT_CONTINUATION_WINDOW,
            events: None,
        }
    }

    pub fn with_validator(mut self, validator: LabelValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_continuation_window(mut self, window: usize) -> Self {
        self.continuation_window = window;
        self
    }

    pub fn with_events(mut self, events: UnboundedSender<ExtractionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn kind(&self) -> ExtractionKind {
        self.kind
    }

    fn emit(&self, event: ExtractionEvent) {
        if let Some(events) = &self.events {
            // 接收端已关闭时忽略
            let _ = events.send(event);
        }
    }

    fn skip(&self, ctx: &PageCtx, reason: String) {
        warn!("{} ⚠️ 跳过: {}", ctx, reason);
        self.emit(ExtractionEvent::PageSkipped {
            page: ctx.page_index,
            reason,
        });
    }

    /// 抽取全部页面，返回带题号标记的整份文本
    ///
    /// # 参数
    /// - `pages`: 按顺序排列的页面图片
    /// - `document`: 文档名（仅用于日志）
    ///
    /// # 返回
    /// 限流重试耗尽只跳过当前页；其他模型错误中止整份文档
    pub async fn extract(
        &self,
        pages: &[PageImage],
        document: &str,
    ) -> Result<String, RecognitionError> {
        let total = pages.len();
        let tracks_continuity = self.kind.tracks_continuity();
        let mut tracker = ContinuityTracker::new();
        let mut output = String::new();
        let mut skipped = 0;

        info!("📖 开始抽取 {} ({} 页)", document, total);

        for page in pages {
            let ctx = PageCtx::new(document, page.index, total, self.kind);
            self.emit(ExtractionEvent::PageStarted {
                page: page.index,
                total,
            });

            if page.is_empty() {
                skipped += 1;
                self.skip(&ctx, "页面没有图片数据".to_string());
                continue;
            }

            let hint = if tracks_continuity { tracker.hint() } else { None };
            let prompt = prompts::build_page_prompt(self.kind, hint.as_deref());

            let text = match self.model.generate(&prompt, Some(page)).await {
                Ok(Some(text)) => text,
                Ok(None) => {
                    skipped += 1;
                    self.skip(&ctx, "模型没有返回内容".to_string());
                    continue;
                }
                Err(e) if e.is_retryable() => {
                    skipped += 1;
                    self.skip(&ctx, format!("重试耗尽: {}", e));
                    continue;
                }
                Err(e) => {
                    error!("{} ❌ 模型调用失败，中止抽取: {}", ctx, e);
                    return Err(e);
                }
            };
            debug!("{} 模型输出: {}", ctx, truncate_text(&text, 80));

            let text = if tracks_continuity {
                tracker.ensure_continuation(text, self.continuation_window)
            } else {
                text
            };

            let mut scratch = tracker.state();
            let validated = self.validator.validate_text(&text, &mut scratch);
            let labels = scan_labels(&validated.text);
            tracker.observe(&labels);

            info!(
                "{} ✓ {} 个题号, 校正 {} 处",
                ctx,
                labels.len(),
                validated.corrections.len()
            );
            self.emit(ExtractionEvent::PageCompleted {
                page: page.index,
                labels: labels.iter().map(|m| m.label.to_string()).collect(),
                corrections: validated.corrections.len(),
            });

            output.push_str(&validated.text);
            output.push('\n');
        }

        info!(
            "✅ {} 抽取完成: {} 页, 跳过 {} 页",
            document, total, skipped
        );
        self.emit(ExtractionEvent::Finished {
            pages: total,
            skipped,
        });
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuestionRegistry;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// 按顺序返回预设结果，并记录收到的提示词
    struct ScriptedModel {
        replies: Mutex<VecDeque<Result<Option<String>, RecognitionError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<Result<Option<String>, RecognitionError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn text(replies: &[&str]) -> Arc<Self> {
            Self::new(replies.iter().map(|r| Ok(Some(r.to_string()))).collect())
        }
    }

    #[async_trait]
    impl RecognitionModel for ScriptedModel {
        async fn generate(
            &self,
            prompt: &str,
            _image: Option<&PageImage>,
        ) -> Result<Option<String>, RecognitionError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(None))
        }
    }

    fn pages(n: usize) -> Vec<PageImage> {
        (0..n).map(|i| PageImage::new(i, vec![1, 2, 3])).collect()
    }

    #[test]
    fn test_no_pages_yields_empty_text() {
        let model = ScriptedModel::text(&[]);
        let extractor = SectionExtractor::new(model.clone(), ExtractionKind::Answers);
        let text = tokio_test::block_on(extractor.extract(&[], "empty.pdf")).unwrap();
        assert!(text.is_empty());
        assert!(model.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_untagged_page_top_becomes_continuation() {
        let model = ScriptedModel::text(&["題號：1\n甲\n題號：2a\n乙", "接續乙\n題號：2b\n丙"]);
        let extractor = SectionExtractor::new(model.clone(), ExtractionKind::Answers)
            .with_continuation_window(3);

        let text = extractor.extract(&pages(2), "t.pdf").await.unwrap();
        assert_eq!(
            text,
            "題號：1\n甲\n題號：2a\n乙\n題號：2a（續）\n接續乙\n題號：2b\n丙\n"
        );

        let prompts = model.prompts.lock().unwrap();
        assert!(!prompts[0].contains("Note: the previous page"));
        assert!(prompts[1].contains("Note: the previous page ended in question 2a"));
    }

    #[tokio::test]
    async fn test_questions_kind_has_no_hint_or_synthesis() {
        let model = ScriptedModel::text(&["題號：1\n配分：5\n甲", "沒有題號的一頁"]);
        let extractor = SectionExtractor::new(model.clone(), ExtractionKind::Questions);

        let text = extractor.extract(&pages(2), "q.pdf").await.unwrap();
        assert_eq!(text, "題號：1\n配分：5\n甲\n沒有題號的一頁\n");
        assert!(!model.prompts.lock().unwrap()[1].contains("Note: the previous page"));
    }

    #[tokio::test]
    async fn test_empty_pages_and_empty_replies_are_skipped() {
        let model = ScriptedModel::new(vec![Ok(None), Ok(Some("題號：3\n丁".to_string()))]);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let extractor =
            SectionExtractor::new(model.clone(), ExtractionKind::Answers).with_events(tx);

        let mut input = pages(3);
        input[0].png.clear();
        let text = extractor.extract(&input, "t.pdf").await.unwrap();
        assert_eq!(text, "題號：3\n丁\n");
        // 空图片的页面不调用模型
        assert_eq!(model.prompts.lock().unwrap().len(), 2);

        drop(extractor);
        let mut skipped = Vec::new();
        while let Some(event) = rx.recv().await {
            if let ExtractionEvent::PageSkipped { page, .. } = event {
                skipped.push(page);
            }
        }
        assert_eq!(skipped, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_exhausted_retries_skip_page_but_fatal_errors_abort() {
        let model = ScriptedModel::new(vec![
            Err(RecognitionError::classify("m", "429")),
            Ok(Some("題號：1\n甲".to_string())),
        ]);
        let extractor = SectionExtractor::new(model, ExtractionKind::Answers);
        let text = extractor.extract(&pages(2), "t.pdf").await.unwrap();
        assert_eq!(text, "題號：1\n甲\n");

        let model = ScriptedModel::new(vec![
            Ok(Some("題號：1\n甲".to_string())),
            Err(RecognitionError::classify("m", "invalid api key")),
        ]);
        let extractor = SectionExtractor::new(model, ExtractionKind::Answers);
        let err = extractor.extract(&pages(2), "t.pdf").await.unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_oversized_number_does_not_become_state() {
        let model = ScriptedModel::text(&["題號：4294967295\nx", "題號：1\ny"]);
        let extractor = SectionExtractor::new(model.clone(), ExtractionKind::Answers);

        let text = extractor.extract(&pages(2), "t.pdf").await.unwrap();
        assert_eq!(text, "題號：4294967295\nx\n題號：1\ny\n");
        assert!(!model.prompts.lock().unwrap()[1].contains("Note: the previous page"));
    }

    #[tokio::test]
    async fn test_registry_correction_carries_across_pages() {
        let model = ScriptedModel::text(&["題號：5a\n甲\n題號：5b\n乙", "題號：5S\n丙"]);
        let registry = QuestionRegistry::from_ids(["5a", "5b", "5c", "6"]);
        let extractor = SectionExtractor::new(model, ExtractionKind::Answers)
            .with_validator(LabelValidator::with_registry(registry));

        let text = extractor.extract(&pages(2), "t.pdf").await.unwrap();
        assert!(text.ends_with("題號：5c\n丙\n"));
    }
}
