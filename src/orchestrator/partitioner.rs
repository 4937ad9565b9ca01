//! 按学生拆分 PDF - 编排层
//!
//! ## 流程
//!
//! 1. 学生记录 → 页码区间（纯计算，可单独测试）
//! 2. 每个区间另存为 `<输出目录>/<学号>_answers.pdf`
//! 3. 重新打开全部输出文件，页数总和必须等于原文件页数
//!
//! 第 3 步失败时整次拆分视为失败，调用方不得使用任何输出。

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::{AppResult, PartitionError};
use crate::infrastructure::PdfStore;
use crate::models::{PageRange, StudentRecord};
use crate::orchestrator::boundary_detector::dedup_records;

/// 由起始页计算每个学生的页码区间
///
/// - 学号为空或为占位值的记录不参与计算，它的页面归入前一个学生
/// - 同一学号只保留最小起始页
/// - 起始页超出文档范围的记录被丢弃
/// - 第一个学生之前的页面归入第一个学生
///
/// # 返回
/// 连续、不重叠、恰好覆盖 `[0, total_pages - 1]` 的区间
pub fn compute_ranges(
    records: &[StudentRecord],
    total_pages: usize,
) -> Result<Vec<PageRange>, PartitionError> {
    let valid = records.iter().filter(|r| {
        let keep = r.has_valid_id();
        if !keep {
            warn!("⚠️ 第 {} 页的学号无效，页面归入前一个学生", r.start_page + 1);
        }
        keep
    });
    let mut starts: Vec<StudentRecord> = dedup_records(valid.cloned())
        .into_iter()
        .filter(|r| {
            let keep = r.start_page < total_pages;
            if !keep {
                warn!(
                    "⚠️ 学号 {} 的起始页 {} 超出文档范围 (共 {} 页)，忽略",
                    r.student_id,
                    r.start_page + 1,
                    total_pages
                );
            }
            keep
        })
        .collect();

    // 不同学号落在同一页时保留排序在前的一个
    starts.dedup_by(|later, earlier| {
        let same = later.start_page == earlier.start_page;
        if same {
            warn!(
                "⚠️ 学号 {} 与 {} 的起始页相同 (第 {} 页)，忽略前者",
                later.student_id,
                earlier.student_id,
                later.start_page + 1
            );
        }
        same
    });

    if starts.is_empty() {
        return Err(PartitionError::NoStudentsDetected);
    }
    if starts[0].start_page > 0 {
        warn!(
            "⚠️ 前 {} 页没有识别到学生，归入学号 {}",
            starts[0].start_page, starts[0].student_id
        );
        starts[0].start_page = 0;
    }

    let ranges = starts
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let end_page = starts
                .get(i + 1)
                .map(|next| next.start_page - 1)
                .unwrap_or(total_pages - 1);
            PageRange {
                student_id: record.student_id.clone(),
                start_page: record.start_page,
                end_page,
            }
        })
        .collect();
    Ok(ranges)
}

/// 输出文件名中不允许出现的字符替换为 `_`
pub fn sanitize_file_stem(student_id: &str) -> String {
    student_id
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// 一个学生的拆分结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentDocument {
    pub range: PageRange,
    pub path: PathBuf,
}

/// PDF 拆分器
pub struct DocumentPartitioner {
    store: Arc<dyn PdfStore>,
}

impl DocumentPartitioner {
    pub fn new(store: Arc<dyn PdfStore>) -> Self {
        Self { store }
    }

    /// 按学生记录拆分 PDF 并校验页数
    ///
    /// # 参数
    /// - `source`: 整份扫描文件
    /// - `records`: 识别到的学生起始页
    /// - `output_dir`: 输出目录（不存在时自动创建）
    ///
    /// # 返回
    /// 按起始页排序的输出文件
    pub fn partition(
        &self,
        source: &Path,
        records: &[StudentRecord],
        output_dir: &Path,
    ) -> AppResult<Vec<StudentDocument>> {
        let total = self.store.page_count(source)?;
        let ranges = compute_ranges(records, total)?;
        let documents = self.split(source, &ranges, output_dir)?;
        self.verify(total, &documents)?;
        info!("✅ 拆分完成: {} 名学生, 共 {} 页", documents.len(), total);
        Ok(documents)
    }

    /// 把每个区间另存为独立文件
    ///
    /// 不同学号清理后可能得到相同的文件名（如 `S/1` 与 `S_1`），
    /// 后出现的文件名加上起始页 `<学号>_p<页码>_answers.pdf`
    pub fn split(
        &self,
        source: &Path,
        ranges: &[PageRange],
        output_dir: &Path,
    ) -> AppResult<Vec<StudentDocument>> {
        let mut documents = Vec::with_capacity(ranges.len());
        let mut used: HashSet<PathBuf> = HashSet::new();
        for range in ranges {
            let stem = sanitize_file_stem(&range.student_id);
            let mut path = output_dir.join(format!("{}_answers.pdf", stem));
            if used.contains(&path) {
                let unique = output_dir.join(format!("{}_p{}_answers.pdf", stem, range.start_page + 1));
                warn!(
                    "⚠️ 学号 {} 的文件名与前一个学生冲突，改为 {}",
                    range.student_id,
                    unique.display()
                );
                path = unique;
            }
            used.insert(path.clone());
            let written = self.store.extract_pages(source, range, &path)?;
            info!("📄 {} -> {} ({} 页)", range, path.display(), written);
            documents.push(StudentDocument {
                range: range.clone(),
                path,
            });
        }
        Ok(documents)
    }

    /// 重新打开每个输出文件，页数总和必须等于原文件
    ///
    /// 无法打开的文件按 0 页计算
    pub fn verify(&self, expected: usize, documents: &[StudentDocument]) -> Result<(), PartitionError> {
        let actual: usize = documents
            .iter()
            .map(|doc| match self.store.page_count(&doc.path) {
                Ok(count) => {
                    if count != doc.range.len() {
                        warn!(
                            "⚠️ {} 应有 {} 页, 实际 {} 页",
                            doc.path.display(),
                            doc.range.len(),
                            count
                        );
                    }
                    count
                }
                Err(e) => {
                    error!("❌ 无法重新打开 {}: {}", doc.path.display(), e);
                    0
                }
            })
            .sum();

        if actual != expected {
            error!("❌ 页数校验失败: 原文件 {} 页, 拆分后 {} 页", expected, actual);
            return Err(PartitionError::PageCountMismatch { expected, actual });
        }
        Ok(())
    }
}
