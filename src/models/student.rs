use serde::{Deserialize, Serialize};
use std::fmt;

/// 模型在找不到内容时返回的占位值（不区分大小写）
pub const NOT_FOUND_TOKENS: [&str; 5] = ["not found", "not_found", "n/a", "none", "unknown"];

/// 是否为空值或"未找到"占位值
pub fn is_sentinel(value: &str) -> bool {
    let value = value.trim();
    value.is_empty()
        || NOT_FOUND_TOKENS
            .iter()
            .any(|token| value.eq_ignore_ascii_case(token))
}

/// 某个学生作答的起始页
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub student_id: String,
    pub name: String,
    /// 从 0 开始的页码
    pub start_page: usize,
}

impl StudentRecord {
    pub fn new(student_id: impl Into<String>, name: impl Into<String>, start_page: usize) -> Self {
        Self {
            student_id: student_id.into(),
            name: name.into(),
            start_page,
        }
    }

    pub fn has_valid_id(&self) -> bool {
        !is_sentinel(&self.student_id)
    }
}

/// 一个学生占用的页码区间（闭区间）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub student_id: String,
    pub start_page: usize,
    pub end_page: usize,
}

impl PageRange {
    pub fn len(&self) -> usize {
        (self.end_page + 1).saturating_sub(self.start_page)
    }

    pub fn is_empty(&self) -> bool {
        self.end_page < self.start_page
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}-{}] ({} 页)",
            self.student_id,
            self.start_page,
            self.end_page,
            self.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_values() {
        assert!(is_sentinel(""));
        assert!(is_sentinel("  Not Found "));
        assert!(is_sentinel("N/A"));
        assert!(is_sentinel("UNKNOWN"));
        assert!(!is_sentinel("B11201001"));
    }

    #[test]
    fn test_page_range_len() {
        let range = PageRange {
            student_id: "S1".to_string(),
            start_page: 5,
            end_page: 8,
        };
        assert_eq!(range.len(), 4);
        assert_eq!(range.to_string(), "S1 [5-8] (4 页)");
    }
}
