//! 基础设施层 - 持有 PDFium 与 PDF 文件这类"稀缺资源"
//!
//! 只暴露渲染与读写能力，不认识题号、学生与流程

pub mod pdf_renderer;
pub mod pdf_store;

pub use pdf_renderer::{PageRenderer, PdfiumRenderer};
pub use pdf_store::{LopdfStore, PdfStore};
