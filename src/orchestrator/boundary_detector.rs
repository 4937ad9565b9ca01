//! 学生边界识别 - 编排层
//!
//! 对每一页裁剪左上角的页眉区域，交给识别模型读出学号与姓名。
//! 页面之间互不依赖，用 Semaphore + tokio::spawn 并发处理，全部完成后再汇总。
//!
//! 单页失败（裁剪失败、模型报错、没读到学号）只意味着这一页不是某个学生的起始页。

use futures::future::join_all;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::DocumentError;
use crate::models::student::is_sentinel;
use crate::models::{PageImage, StudentRecord};
use crate::services::{prompts, RecognitionModel};

fn student_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Student ID:\s*([^\n]+)").expect("学号正则无效"))
}

fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Name:\s*([^\n]+)").expect("姓名正则无效"))
}

/// 从模型回复中解析 `(学号, 姓名)`，任一缺失或为占位值时返回 `None`
pub fn parse_student_response(text: &str) -> Option<(String, String)> {
    let capture = |re: &Regex| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|value| !is_sentinel(value))
    };
    let student_id = capture(student_id_regex())?;
    let name = capture(name_regex())?;
    Some((student_id, name))
}

/// 同一学号只保留最小的起始页，按起始页（再按学号）排序
pub fn dedup_records(records: impl IntoIterator<Item = StudentRecord>) -> Vec<StudentRecord> {
    let mut by_id: HashMap<String, StudentRecord> = HashMap::new();
    for record in records {
        match by_id.get(&record.student_id) {
            Some(existing) if existing.start_page <= record.start_page => {
                debug!(
                    "学号 {} 在第 {} 页重复出现，保留第 {} 页",
                    record.student_id,
                    record.start_page + 1,
                    existing.start_page + 1
                );
            }
            _ => {
                by_id.insert(record.student_id.clone(), record);
            }
        }
    }
    let mut records: Vec<StudentRecord> = by_id.into_values().collect();
    records.sort_by(|a, b| {
        a.start_page
            .cmp(&b.start_page)
            .then_with(|| a.student_id.cmp(&b.student_id))
    });
    records
}

/// 学生边界识别器
///
/// 职责：
/// - 控制并发数量（不超过页数）
/// - 每个任务只处理一页
/// - 汇总、去重、排序
pub struct StudentBoundaryDetector {
    model: Arc<dyn RecognitionModel>,
    max_workers: usize,
    crop_width: u32,
    crop_height: u32,
    debug_dir: Option<PathBuf>,
}

impl StudentBoundaryDetector {
    pub fn new(model: Arc<dyn RecognitionModel>, config: &Config) -> Self {
        Self {
            model,
            max_workers: config.max_detection_workers.max(1),
            crop_width: config.header_crop_width,
            crop_height: config.header_crop_height,
            debug_dir: config.debug_image_dir.clone(),
        }
    }

    /// 识别每个学生的起始页
    ///
    /// # 参数
    /// - `pages`: 整份扫描文件按顺序渲染出的页面
    ///
    /// # 返回
    /// 按起始页排序、学号不重复的记录；没有识别到任何学生时为空
    pub async fn detect(&self, pages: &[PageImage]) -> Vec<StudentRecord> {
        if pages.is_empty() {
            return Vec::new();
        }
        let workers = self.max_workers.min(pages.len());
        info!("🔎 开始识别学生信息: {} 页, 并发数 {}", pages.len(), workers);

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut handles = Vec::with_capacity(pages.len());

        for page in pages {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                error!("并发控制已关闭，停止派发任务");
                break;
            };
            let model = Arc::clone(&self.model);
            let index = page.index;
            let page = page.clone();
            let (width, height) = (self.crop_width, self.crop_height);
            let debug_dir = self.debug_dir.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                detect_page(model.as_ref(), page, width, height, debug_dir).await
            });
            handles.push((index, handle));
        }

        // 按页码汇总，保证结果与完成顺序无关
        let (indices, handles): (Vec<usize>, Vec<_>) = handles.into_iter().unzip();
        let results = join_all(handles).await;
        let mut found: BTreeMap<usize, StudentRecord> = BTreeMap::new();
        for (index, result) in indices.into_iter().zip(results) {
            match result {
                Ok(Some(record)) => {
                    found.insert(index, record);
                }
                Ok(None) => {}
                Err(e) => error!("[第 {} 页] 识别任务异常退出: {}", index + 1, e),
            }
        }

        let records = dedup_records(found.into_values());
        info!("✓ 识别到 {} 名学生", records.len());
        records
    }
}

/// 裁剪页眉（解码、裁剪、重新编码），需要时保存调试图片
fn crop_header(
    page: &PageImage,
    width: u32,
    height: u32,
    debug_dir: Option<&Path>,
) -> Result<PageImage, DocumentError> {
    let header = page.crop_top_left(width, height)?;
    if let Some(dir) = debug_dir {
        let name = format!("header_page_{}.png", page.index + 1);
        if let Err(e) = header.save_debug(dir, &name) {
            debug!("[第 {} 页] 调试图片保存失败: {}", page.index + 1, e);
        }
    }
    Ok(header)
}

async fn detect_page(
    model: &dyn RecognitionModel,
    page: PageImage,
    width: u32,
    height: u32,
    debug_dir: Option<PathBuf>,
) -> Option<StudentRecord> {
    let index = page.index;
    let page_no = index + 1;
    if page.is_empty() {
        warn!("[第 {} 页] 没有图片数据，跳过", page_no);
        return None;
    }

    let cropped = tokio::task::spawn_blocking(move || {
        crop_header(&page, width, height, debug_dir.as_deref())
    })
    .await;
    let header = match cropped {
        Ok(Ok(header)) => header,
        Ok(Err(e)) => {
            warn!("[第 {} 页] 裁剪失败: {}", page_no, e);
            return None;
        }
        Err(e) => {
            error!("[第 {} 页] 裁剪任务异常退出: {}", page_no, e);
            return None;
        }
    };

    let reply = match model.generate(prompts::student_id_prompt(), Some(&header)).await {
        Ok(Some(reply)) => reply,
        Ok(None) => {
            debug!("[第 {} 页] 模型没有返回内容", page_no);
            return None;
        }
        Err(e) => {
            warn!("[第 {} 页] 学生信息识别失败: {}", page_no, e);
            return None;
        }
    };

    let (student_id, name) = parse_student_response(&reply)?;
    info!("[第 {} 页] 👤 {} {}", page_no, student_id, name);
    Some(StudentRecord::new(student_id, name, index))
}
