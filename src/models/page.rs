use image::{GenericImageView, ImageOutputFormat};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

use crate::error::DocumentError;

/// 渲染后的单页图片（PNG 字节 + 从 0 开始的页码）
#[derive(Debug, Clone)]
pub struct PageImage {
    pub index: usize,
    pub png: Vec<u8>,
}

impl PageImage {
    pub fn new(index: usize, png: Vec<u8>) -> Self {
        Self { index, png }
    }

    /// 渲染失败的页面没有图片数据
    pub fn is_empty(&self) -> bool {
        self.png.is_empty()
    }

    /// 裁剪左上角区域，超出图片尺寸时按图片尺寸截断
    pub fn crop_top_left(&self, width: u32, height: u32) -> Result<PageImage, DocumentError> {
        let img = image::load_from_memory(&self.png)
            .map_err(|e| DocumentError::Image(format!("第 {} 页解码失败: {}", self.index, e)))?;
        let (full_w, full_h) = img.dimensions();
        let cropped = img.crop_imm(0, 0, width.min(full_w), height.min(full_h));

        let mut cursor = Cursor::new(Vec::new());
        cropped
            .write_to(&mut cursor, ImageOutputFormat::Png)
            .map_err(|e| DocumentError::Image(format!("第 {} 页编码失败: {}", self.index, e)))?;

        debug!(
            "第 {} 页裁剪: {}x{} -> {}x{}",
            self.index,
            full_w,
            full_h,
            cropped.width(),
            cropped.height()
        );

        Ok(PageImage::new(self.index, cursor.into_inner()))
    }

    /// 把图片写入调试目录
    pub fn save_debug(&self, dir: &Path, name: &str) -> std::io::Result<()> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(name);
        std::fs::write(&path, &self.png)?;
        debug!("调试图片已保存: {}", path.display());
        Ok(())
    }
}
