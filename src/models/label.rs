//! 题号标记
//!
//! 抽取文本中的题号统一写作 `題號：<数字><可选小写字母>`，续写段落在后面追加 `（續）`。
//! 下游解析依赖这一格式，不要改动。

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Range;
use std::sync::OnceLock;

/// 题号前缀
pub const LABEL_PREFIX: &str = "題號：";
/// 续写标记（全角括号）
pub const CONTINUATION_SUFFIX: &str = "（續）";
/// 大题号上限，更大的数字不是题号
pub const MAX_MAIN: u32 = 999;

/// 解析大题号数字，超过 [`MAX_MAIN`] 时返回 `None`
pub fn parse_main(digits: &str) -> Option<u32> {
    digits.parse().ok().filter(|main| *main <= MAX_MAIN)
}

/// 严格格式的题号：数字 + 可选字母 + 可选续写标记（全角或半角括号）
fn label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"題號：(\d+)([A-Za-z])?(\s*(?:（續）|\(續\)))?").expect("题号正则无效")
    })
}

/// 题号
///
/// 相等性只看 `(main, sub)`，`continuation` 只影响渲染
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuestionLabel {
    /// 大题号
    pub main: u32,
    /// 小题字母（统一为小写）
    pub sub: Option<char>,
    /// 是否为上一页题目的续写
    #[serde(default)]
    pub continuation: bool,
}

impl QuestionLabel {
    pub fn new(main: u32, sub: Option<char>) -> Self {
        Self {
            main,
            sub: sub.map(|c| c.to_ascii_lowercase()),
            continuation: false,
        }
    }

    /// 构造续写题号
    pub fn continuation_of(main: u32, sub: Option<char>) -> Self {
        Self {
            continuation: true,
            ..Self::new(main, sub)
        }
    }

    /// 去掉续写标记后的题号 ID，例如 `2a`
    pub fn id(&self) -> String {
        match self.sub {
            Some(sub) => format!("{}{}", self.main, sub),
            None => self.main.to_string(),
        }
    }

    /// 完整标记，例如 `題號：2a（續）`
    pub fn markup(&self) -> String {
        if self.continuation {
            format!("{}{}{}", LABEL_PREFIX, self.id(), CONTINUATION_SUFFIX)
        } else {
            format!("{}{}", LABEL_PREFIX, self.id())
        }
    }

    /// 解析 `12` / `2a` 形式的题号 ID
    pub fn parse_id(id: &str) -> Option<Self> {
        let id = id.trim();
        let digits_end = id
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(id.len());
        if digits_end == 0 {
            return None;
        }
        let main = parse_main(&id[..digits_end])?;
        let rest: Vec<char> = id[digits_end..].chars().collect();
        match rest.as_slice() {
            [] => Some(Self::new(main, None)),
            [c] if c.is_ascii_alphabetic() => Some(Self::new(main, Some(*c))),
            _ => None,
        }
    }

    /// 下一个小题字母
    pub fn next_sub(sub: char) -> Option<char> {
        match sub {
            'a'..='y' => char::from_u32(sub as u32 + 1),
            _ => None,
        }
    }
}

impl PartialEq for QuestionLabel {
    fn eq(&self, other: &Self) -> bool {
        self.main == other.main && self.sub == other.sub
    }
}

impl Eq for QuestionLabel {}

impl Hash for QuestionLabel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.main.hash(state);
        self.sub.hash(state);
    }
}

impl fmt::Display for QuestionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.continuation {
            write!(f, "{}{}", self.id(), CONTINUATION_SUFFIX)
        } else {
            write!(f, "{}", self.id())
        }
    }
}

/// 文本中的一个题号
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMatch {
    pub label: QuestionLabel,
    /// 整个标记在文本中的字节范围
    pub range: Range<usize>,
}

/// 按出现顺序扫描文本中的全部严格格式题号
pub fn scan_labels(text: &str) -> Vec<LabelMatch> {
    label_regex()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let main = parse_main(caps.get(1)?.as_str())?;
            let sub = caps.get(2).and_then(|m| m.as_str().chars().next());
            let continuation = caps.get(3).is_some();
            let mut label = QuestionLabel::new(main, sub);
            label.continuation = continuation;
            Some(LabelMatch {
                label,
                range: whole.range(),
            })
        })
        .collect()
}

/// 文本开头 `window` 个字符内是否出现题号前缀
pub fn has_label_within(text: &str, window: usize) -> bool {
    let head: String = text.chars().take(window).collect();
    head.contains(LABEL_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_continuation() {
        let a = QuestionLabel::new(3, Some('b'));
        let b = QuestionLabel::continuation_of(3, Some('b'));
        assert_eq!(a, b);
        assert_eq!(b.markup(), "題號：3b（續）");
        assert_eq!(a.markup(), "題號：3b");
    }

    #[test]
    fn test_oversized_main_is_not_a_label() {
        assert_eq!(QuestionLabel::parse_id("4294967295"), None);
        assert_eq!(QuestionLabel::parse_id("1000"), None);
        assert!(scan_labels("題號：4294967295\nx").is_empty());
        assert_eq!(scan_labels("題號：999").len(), 1);
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(QuestionLabel::parse_id("12"), Some(QuestionLabel::new(12, None)));
        assert_eq!(QuestionLabel::parse_id("2A"), Some(QuestionLabel::new(2, Some('a'))));
        assert_eq!(QuestionLabel::parse_id("a"), None);
        assert_eq!(QuestionLabel::parse_id("2ab"), None);
    }

    #[test]
    fn test_scan_labels_with_both_continuation_styles() {
        let text = "題號：1\nfoo\n題號：2a（續）\nbar\n題號：2b (續)\nbaz\n題號：3";
        let labels: Vec<String> = scan_labels(text).iter().map(|m| m.label.to_string()).collect();
        assert_eq!(labels, vec!["1", "2a（續）", "2b（續）", "3"]);
    }

    #[test]
    fn test_has_label_within_counts_chars_not_bytes() {
        let text = format!("{}題號：4", "續".repeat(10));
        assert!(has_label_within(&text, 13));
        assert!(!has_label_within(&text, 12));
    }
}
