//! PDF 读写 - 基础设施层
//!
//! 只暴露"数页数"和"按页码区间另存"两种能力，不认识学生与题号

use lopdf::Document;
use std::path::Path;
use tracing::debug;

use crate::error::DocumentError;
use crate::models::PageRange;

/// PDF 页面读写能力
pub trait PdfStore: Send + Sync {
    fn page_count(&self, path: &Path) -> Result<usize, DocumentError>;

    /// 把 `range`（从 0 开始的闭区间）内的页面另存为 `dest`
    ///
    /// # 返回
    /// 写入的页数
    fn extract_pages(
        &self,
        source: &Path,
        range: &PageRange,
        dest: &Path,
    ) -> Result<usize, DocumentError>;
}

/// 基于 lopdf 的实现
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfStore;

impl LopdfStore {
    pub fn new() -> Self {
        Self
    }

    fn load(path: &Path) -> Result<Document, DocumentError> {
        Document::load(path).map_err(|e| DocumentError::OpenFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

impl PdfStore for LopdfStore {
    fn page_count(&self, path: &Path) -> Result<usize, DocumentError> {
        Ok(Self::load(path)?.get_pages().len())
    }

    fn extract_pages(
        &self,
        source: &Path,
        range: &PageRange,
        dest: &Path,
    ) -> Result<usize, DocumentError> {
        let mut doc = Self::load(source)?;
        let total = doc.get_pages().len();
        if range.is_empty() || range.end_page >= total {
            return Err(DocumentError::PageOutOfRange {
                start: range.start_page,
                end: range.end_page,
                total,
            });
        }

        // lopdf 页码从 1 开始
        let keep = (range.start_page as u32 + 1)..=(range.end_page as u32 + 1);
        let to_delete: Vec<u32> = doc
            .get_pages()
            .keys()
            .copied()
            .filter(|page| !keep.contains(page))
            .collect();
        doc.delete_pages(&to_delete);
        doc.prune_objects();
        doc.compress();

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DocumentError::SaveFailed {
                path: dest.display().to_string(),
                reason: e.to_string(),
            })?;
        }
        doc.save(dest).map_err(|e| DocumentError::SaveFailed {
            path: dest.display().to_string(),
            reason: e.to_string(),
        })?;

        let written = doc.get_pages().len();
        debug!("已写入 {} ({} 页)", dest.display(), written);
        Ok(written)
    }
}

/// 测试用：生成每页一行文字的 PDF
#[cfg(test)]
pub(crate) fn write_test_pdf(path: &Path, pages: usize) {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for i in 0..pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(format!("Page {}", i + 1))]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("内容编码失败"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).expect("保存测试 PDF 失败");
}
