//! # Exam Grader
//!
//! 从扫描的试卷 PDF 中抽取题目与答案，并把整班的答题卷按学生拆分
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（PDFium、PDF 文件），只暴露能力
//! - `PdfiumRenderer` - 页面渲染
//! - `LopdfStore` - 页数统计与按区间另存
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单页或单段文本
//! - `LlmService` / `RetryingModel` - 多模态识别与限流退避
//! - `LabelValidator` - 题号校正
//! - `content_parser` - 按题号切分文本
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一份文档"的完整抽取流程
//! - `ContinuityTracker` - 跨页题号状态
//! - `SectionExtractor` - 逐页抽取（提示 → 识别 → 续写 → 校正）
//! - `DocumentParser` - 按输入类型选择来源并保存结果
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 应用入口，管理资源与命令
//! - `orchestrator/boundary_detector` - 并发识别学生起始页
//! - `orchestrator/partitioner` - 按学生拆分并校验页数
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{ExtractedSection, ExtractionKind, QuestionLabel, SectionMap};
pub use orchestrator::{App, DocumentPartitioner, StudentBoundaryDetector};
pub use services::{LabelValidator, RecognitionModel};
pub use workflow::{DocumentParser, SectionExtractor};
