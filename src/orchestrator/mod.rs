//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责资源持有与流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 应用入口
//! - 管理模型、渲染器与 PDF 读写器
//! - 调度抽取与拆分两条流程
//! - 输出统计信息
//!
//! ### `boundary_detector` - 学生边界识别
//! - 每页一个任务，Semaphore 控制并发
//! - 全部完成后汇总、去重、排序
//!
//! ### `partitioner` - 按学生拆分
//! - 起始页 → 页码区间
//! - 另存与页数校验
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (App)
//!     ↓                         ↓
//! workflow::DocumentParser   boundary_detector → partitioner
//!     ↓                         ↓
//! services (能力层：识别 / 校正 / 解析)
//!     ↓
//! infrastructure (基础设施：PDFium / lopdf)
//! ```

pub mod batch_processor;
pub mod boundary_detector;
pub mod partitioner;

// 重新导出主要类型
pub use batch_processor::App;
pub use boundary_detector::StudentBoundaryDetector;
pub use partitioner::{compute_ranges, DocumentPartitioner, StudentDocument};
