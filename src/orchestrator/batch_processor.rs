//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：检查配置、创建识别模型、加载 PDFium
//! 2. **资源管理**：持有模型、渲染器与 PDF 读写器，向下只传 `Arc`
//! 3. **命令调度**：`extract`（题目/答案抽取）与 `partition`（按学生拆分）
//! 4. **进度记录**：把抽取事件写入运行日志文件
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单页细节，委托给 workflow 与 boundary_detector
//! - **阻塞隔离**：PDFium 渲染与 lopdf 读写都放进 `spawn_blocking`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::Config;
use crate::infrastructure::{LopdfStore, PageRenderer, PdfStore, PdfiumRenderer};
use crate::models::{ExtractionKind, PageImage, QuestionRegistry};
use crate::orchestrator::boundary_detector::StudentBoundaryDetector;
use crate::orchestrator::partitioner::{DocumentPartitioner, StudentDocument};
use crate::services::{LabelValidator, LlmService, RecognitionModel, RetryPolicy, RetryingModel};
use crate::utils::logging;
use crate::workflow::{DocumentParser, ExtractionEvent, ParsedDocument, SectionExtractor};

/// 应用主结构
pub struct App {
    config: Config,
    model: Arc<dyn RecognitionModel>,
    renderer: Arc<dyn PageRenderer>,
    store: Arc<dyn PdfStore>,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> Result<Self> {
        config.require_api_key()?;
        logging::init_log_file(&config.output_log_file, "试卷处理日志")
            .with_context(|| format!("无法创建日志文件 {}", config.output_log_file))?;

        let llm = LlmService::new(&config);
        info!("🤖 识别模型: {}", llm.model_name());
        let model = RetryingModel::new(llm, RetryPolicy::from_config(&config));
        let renderer = PdfiumRenderer::new().context("PDFium 初始化失败")?;

        Ok(Self::with_parts(
            config,
            Arc::new(model),
            Arc::new(renderer),
            Arc::new(LopdfStore::new()),
        ))
    }

    /// 用给定的组件组装应用
    pub fn with_parts(
        config: Config,
        model: Arc<dyn RecognitionModel>,
        renderer: Arc<dyn PageRenderer>,
        store: Arc<dyn PdfStore>,
    ) -> Self {
        Self {
            config,
            model,
            renderer,
            store,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn parser(&self, kind: ExtractionKind, validator: LabelValidator) -> DocumentParser {
        let extractor = SectionExtractor::new(Arc::clone(&self.model), kind)
            .with_validator(validator)
            .with_continuation_window(self.config.continuation_window);
        self.parser_with(extractor)
    }

    fn parser_with(&self, extractor: SectionExtractor) -> DocumentParser {
        DocumentParser::new(
            Arc::clone(&self.renderer),
            extractor,
            self.config.extraction_dpi,
        )
    }

    /// 从题目卷（PDF、已标注文本或之前保存的 JSON）构建题号表
    pub async fn load_registry(&self, path: &Path) -> Result<QuestionRegistry> {
        info!("📚 正在加载题号表: {}", path.display());
        let parsed = self
            .parser(ExtractionKind::Questions, LabelValidator::heuristic())
            .parse(path)
            .await
            .with_context(|| format!("无法解析题目 {}", path.display()))?;
        let registry = QuestionRegistry::from_sections(&parsed.sections);
        if registry.is_empty() {
            warn!("⚠️ 题号表为空，题号校正将使用启发式模式");
        }
        Ok(registry)
    }

    /// 抽取题目或答案
    ///
    /// # 参数
    /// - `input`: 输入文件
    /// - `kind`: 题目卷 / 答案卷
    /// - `registry`: 可选的题目文件，用于构建题号表
    pub async fn extract(
        &self,
        input: &Path,
        kind: ExtractionKind,
        registry: Option<&Path>,
    ) -> Result<ParsedDocument> {
        logging::log_startup("抽取", input);

        let validator = match registry {
            Some(path) => LabelValidator::with_registry(self.load_registry(path).await?),
            None => LabelValidator::heuristic(),
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let recorder = tokio::spawn(record_events(rx, self.config.output_log_file.clone()));

        let extractor = SectionExtractor::new(Arc::clone(&self.model), kind)
            .with_validator(validator)
            .with_continuation_window(self.config.continuation_window)
            .with_events(tx);
        let parser = self.parser_with(extractor);
        let result = parser.parse(input).await;

        // 发送端随 parser 一起释放，记录任务随之结束
        drop(parser);
        if let Err(e) = recorder.await {
            warn!("事件记录任务异常退出: {}", e);
        }

        let parsed = result.with_context(|| format!("抽取失败: {}", input.display()))?;
        if let Some(saved) = &parsed.saved_to {
            logging::print_extraction_stats(parsed.sections.len(), saved);
        } else {
            info!("📂 已加载 {} 个题号", parsed.sections.len());
        }
        Ok(parsed)
    }

    /// 按学生拆分整份扫描文件
    ///
    /// # 返回
    /// 按起始页排序的输出文件；页数校验失败时返回错误
    pub async fn partition(
        &self,
        input: &Path,
        output_dir: Option<&Path>,
    ) -> Result<Vec<StudentDocument>> {
        logging::log_startup("拆分", input);
        let output_dir = output_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.output_dir.clone());

        let pages = self.render(input, self.config.detection_dpi).await?;
        let detector = StudentBoundaryDetector::new(Arc::clone(&self.model), &self.config);
        let records = detector.detect(&pages).await;

        let partitioner = DocumentPartitioner::new(Arc::clone(&self.store));
        let source = input.to_path_buf();
        let target = output_dir.clone();
        let documents = tokio::task::spawn_blocking(move || {
            partitioner.partition(&source, &records, &target)
        })
        .await
        .context("拆分任务异常退出")?
        .with_context(|| format!("拆分失败: {}", input.display()))?;

        let ranges: Vec<_> = documents.iter().map(|doc| doc.range.clone()).collect();
        logging::print_partition_table(&ranges);
        info!("💾 输出目录: {}", output_dir.display());
        Ok(documents)
    }

    async fn render(&self, input: &Path, dpi: u32) -> Result<Vec<PageImage>> {
        let renderer = Arc::clone(&self.renderer);
        let path: PathBuf = input.to_path_buf();
        let pages = tokio::task::spawn_blocking(move || renderer.render(&path, dpi))
            .await
            .context("渲染任务异常退出")?
            .with_context(|| format!("无法渲染 {}", input.display()))?;
        Ok(pages)
    }
}

/// 把抽取事件写入运行日志
async fn record_events(mut rx: mpsc::UnboundedReceiver<ExtractionEvent>, log_file: String) {
    while let Some(event) = rx.recv().await {
        let line = match event {
            ExtractionEvent::PageStarted { .. } => continue,
            ExtractionEvent::PageCompleted {
                page,
                labels,
                corrections,
            } => format!(
                "第 {} 页: {} (校正 {} 处)",
                page + 1,
                labels.join(", "),
                corrections
            ),
            ExtractionEvent::PageSkipped { page, reason } => {
                format!("第 {} 页: 跳过 ({})", page + 1, reason)
            }
            ExtractionEvent::Finished { pages, skipped } => {
                format!("完成: 共 {} 页, 跳过 {} 页", pages, skipped)
            }
        };
        if let Err(e) = logging::append_log_line(&log_file, &line) {
            warn!("写入日志文件失败: {}", e);
        }
    }
}
