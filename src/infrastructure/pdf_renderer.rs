//! PDF 渲染 - 基础设施层
//!
//! 用 PDFium 把 PDF 页面渲染为 PNG。`Pdfium` 不是 `Send`，
//! 所以每次操作都重新绑定动态库（系统会缓存 dlopen，重复加载几乎没有开销）。
//! 渲染是同步阻塞操作，异步代码中请放进 `spawn_blocking`。

use image::ImageOutputFormat;
use pdfium_render::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::DocumentError;
use crate::models::PageImage;

/// 渲染尺寸上限（宽或高），防止异常页面撑爆内存
const MAX_DIMENSION_PX: u32 = 5000;

const POINTS_PER_INCH: f32 = 72.0;

/// 页面渲染能力
pub trait PageRenderer: Send + Sync {
    /// 按给定 DPI 渲染全部页面
    ///
    /// 单页渲染失败不会中断：该页返回空图片并记录警告，由调用方跳过
    fn render(&self, path: &Path, dpi: u32) -> Result<Vec<PageImage>, DocumentError>;
}

/// 基于 PDFium 的渲染器
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfiumRenderer;

impl PdfiumRenderer {
    /// 创建渲染器并确认 PDFium 可以加载
    pub fn new() -> Result<Self, DocumentError> {
        let _ = load_pdfium()?;
        Ok(Self)
    }
}

/// 加载 PDFium 动态库
///
/// 查找顺序：
/// 1. 环境变量 `PDFIUM_DYNAMIC_LIB_PATH`
/// 2. 可执行文件所在目录
/// 3. 系统库路径
fn load_pdfium() -> Result<Pdfium, DocumentError> {
    let load_failed = |reason: String| DocumentError::OpenFailed {
        path: "pdfium".to_string(),
        reason,
    };

    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        debug!("从环境变量加载 PDFium: {}", path);
        let bindings = Pdfium::bind_to_library(&path)
            .map_err(|e| load_failed(format!("无法从 {} 加载 PDFium: {}", path, e)))?;
        return Ok(Pdfium::new(bindings));
    }

    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        let lib_path =
            Pdfium::pdfium_platform_library_name_at_path(exe_dir.to_string_lossy().as_ref());
        if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
            debug!("从程序目录加载 PDFium: {}", exe_dir.display());
            return Ok(Pdfium::new(bindings));
        }
    }

    let bindings = Pdfium::bind_to_system_library().map_err(|e| {
        load_failed(format!(
            "找不到 PDFium，请设置 PDFIUM_DYNAMIC_LIB_PATH 或安装 PDFium: {}",
            e
        ))
    })?;
    Ok(Pdfium::new(bindings))
}

/// 按 DPI 计算像素尺寸，超过上限时等比缩小
fn render_dimensions(width_points: f32, height_points: f32, dpi: u32) -> (u32, u32) {
    let scale = dpi as f32 / POINTS_PER_INCH;
    let raw_w = (width_points * scale).max(1.0);
    let raw_h = (height_points * scale).max(1.0);

    let max_dim = raw_w.max(raw_h);
    if max_dim > MAX_DIMENSION_PX as f32 {
        let ratio = MAX_DIMENSION_PX as f32 / max_dim;
        (
            ((raw_w * ratio) as u32).clamp(1, MAX_DIMENSION_PX),
            ((raw_h * ratio) as u32).clamp(1, MAX_DIMENSION_PX),
        )
    } else {
        (raw_w as u32, raw_h as u32)
    }
}

fn open_failed(path: &Path, e: PdfiumError) -> DocumentError {
    DocumentError::OpenFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

fn render_page(page: &PdfPage, index: usize, dpi: u32) -> Result<Vec<u8>, DocumentError> {
    let (width, height) = render_dimensions(page.width().value, page.height().value, dpi);
    let config = PdfRenderConfig::new()
        .set_target_width(width as i32)
        .set_maximum_height(height as i32);

    let bitmap = page
        .render_with_config(&config)
        .map_err(|e| DocumentError::RenderFailed {
            page: index,
            reason: e.to_string(),
        })?;

    let mut cursor = Cursor::new(Vec::new());
    bitmap
        .as_image()
        .write_to(&mut cursor, ImageOutputFormat::Png)
        .map_err(|e| DocumentError::Image(format!("第 {} 页 PNG 编码失败: {}", index, e)))?;
    Ok(cursor.into_inner())
}

impl PageRenderer for PdfiumRenderer {
    fn render(&self, path: &Path, dpi: u32) -> Result<Vec<PageImage>, DocumentError> {
        let pdfium = load_pdfium()?;
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| open_failed(path, e))?;

        let mut images = Vec::new();
        for (index, page) in document.pages().iter().enumerate() {
            match render_page(&page, index, dpi) {
                Ok(png) => {
                    debug!("第 {} 页渲染完成: {} 字节", index + 1, png.len());
                    images.push(PageImage::new(index, png));
                }
                Err(e) => {
                    warn!("⚠️ {}，跳过该页", e);
                    images.push(PageImage::new(index, Vec::new()));
                }
            }
        }
        Ok(images)
    }
}
