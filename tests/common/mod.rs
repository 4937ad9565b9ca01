//! 集成测试共用的模拟组件

#![allow(dead_code)]

use async_trait::async_trait;
use exam_grader::error::{DocumentError, RecognitionError};
use exam_grader::infrastructure::PageRenderer;
use exam_grader::models::PageImage;
use exam_grader::services::RecognitionModel;
use image::{DynamicImage, ImageOutputFormat, RgbImage};
use lopdf::{dictionary, Document, Object, Stream};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::Mutex;

/// 生成一个 `pages` 页的空白 PDF
pub fn write_blank_pdf(path: &Path, pages: usize) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = (0..pages)
        .map(|_| {
            let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            page_id.into()
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

/// 渲染出 `n` 张小 PNG，页码写在 `PageImage::index` 里
pub struct PngPages(pub usize);

impl PageRenderer for PngPages {
    fn render(&self, _path: &Path, _dpi: u32) -> Result<Vec<PageImage>, DocumentError> {
        Ok((0..self.0).map(png_page).collect())
    }
}

pub fn png_page(index: usize) -> PageImage {
    let img = DynamicImage::ImageRgb8(RgbImage::new(60, 30));
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, ImageOutputFormat::Png).unwrap();
    PageImage::new(index, cursor.into_inner())
}

/// 按页码返回预设回复，没有预设的页面返回空
pub struct PageReplies {
    replies: HashMap<usize, String>,
    pub prompts: Mutex<Vec<(usize, String)>>,
}

impl PageReplies {
    pub fn new<'a>(replies: impl IntoIterator<Item = (usize, &'a str)>) -> Self {
        Self {
            replies: replies
                .into_iter()
                .map(|(page, reply)| (page, reply.to_string()))
                .collect(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl RecognitionModel for PageReplies {
    async fn generate(
        &self,
        prompt: &str,
        image: Option<&PageImage>,
    ) -> Result<Option<String>, RecognitionError> {
        let index = image.map(|img| img.index).unwrap_or(usize::MAX);
        self.prompts.lock().unwrap().push((index, prompt.to_string()));
        Ok(self.replies.get(&index).cloned())
    }
}
