use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::label::QuestionLabel;

/// 抽取类型：题目卷或答案卷（标准答案与学生答案共用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionKind {
    Questions,
    Answers,
}

impl ExtractionKind {
    /// 是否跨页追踪题号
    pub fn tracks_continuity(self) -> bool {
        matches!(self, ExtractionKind::Answers)
    }

    /// 中间结果 JSON 的文件名后缀
    pub fn json_suffix(self) -> &'static str {
        match self {
            ExtractionKind::Questions => "_questions",
            ExtractionKind::Answers => "_answers",
        }
    }
}

/// 一道题（或小题）的结构化内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedSection {
    /// 题号 ID，例如 `2a`
    pub id: String,
    pub label: QuestionLabel,
    /// 正文，表格与图片以 `[TABLE]` / `[FIGURE]` 占位
    #[serde(default)]
    pub text: String,
    /// 原始 markdown 表格，与 `[TABLE]` 占位一一对应
    #[serde(default)]
    pub tables: Vec<String>,
    /// 图片描述，与 `[FIGURE]` 占位一一对应
    #[serde(default)]
    pub figures: Vec<String>,
    /// 配分（只有题目卷有）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    /// 评分细则（由评分阶段填写）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rubric: Option<String>,
}

impl ExtractedSection {
    pub fn new(label: QuestionLabel) -> Self {
        let mut label = label;
        label.continuation = false;
        Self {
            id: label.id(),
            label,
            text: String::new(),
            tables: Vec::new(),
            figures: Vec::new(),
            score: None,
            rubric: None,
        }
    }

    /// 合并同一题号的后续片段：正文换行拼接，表格与图片按顺序追加
    pub fn absorb(&mut self, other: ExtractedSection) {
        if self.text.is_empty() {
            self.text = other.text;
        } else if !other.text.is_empty() {
            self.text.push('\n');
            self.text.push_str(&other.text);
        }
        self.tables.extend(other.tables);
        self.figures.extend(other.figures);
        if self.score.is_none() {
            self.score = other.score;
        }
    }

    /// 把占位符依次还原为表格 markdown 与 `[Figure: …]`
    pub fn render_with_media(&self) -> String {
        let mut text = self.text.clone();
        for table in &self.tables {
            text = text.replacen("[TABLE]", table, 1);
        }
        for figure in &self.figures {
            text = text.replacen("[FIGURE]", &format!("[Figure: {}]", figure), 1);
        }
        text
    }
}

/// 按首次出现顺序保存的题号 → 内容映射
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionMap {
    sections: Vec<ExtractedSection>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl SectionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入片段；题号已存在时合并到已有内容
    pub fn insert(&mut self, section: ExtractedSection) {
        self.ensure_index();
        match self.index.get(&section.id) {
            Some(&pos) => self.sections[pos].absorb(section),
            None => {
                self.index.insert(section.id.clone(), self.sections.len());
                self.sections.push(section);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&ExtractedSection> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.id.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExtractedSection> {
        self.sections.iter()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    // 反序列化后索引为空，第一次插入时重建
    fn ensure_index(&mut self) {
        if self.index.len() != self.sections.len() {
            self.index = self
                .sections
                .iter()
                .enumerate()
                .map(|(i, s)| (s.id.clone(), i))
                .collect();
        }
    }
}

impl PartialEq for SectionMap {
    fn eq(&self, other: &Self) -> bool {
        self.sections == other.sections
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(id: &str, text: &str) -> ExtractedSection {
        let mut s = ExtractedSection::new(QuestionLabel::parse_id(id).unwrap());
        s.text = text.to_string();
        s
    }

    #[test]
    fn test_insert_merges_same_id_in_order() {
        let mut map = SectionMap::new();
        map.insert(section("1", "one"));
        map.insert(section("2a", "two-a"));
        let mut tail = section("1", "one more");
        tail.figures.push("graph".to_string());
        map.insert(tail);

        assert_eq!(map.ids(), vec!["1", "2a"]);
        let one = map.get("1").unwrap();
        assert_eq!(one.text, "one\none more");
        assert_eq!(one.figures, vec!["graph"]);
    }

    #[test]
    fn test_render_with_media_restores_in_order() {
        let mut s = section("3", "see [TABLE] and [FIGURE] then [TABLE]");
        s.tables = vec!["|a|".to_string(), "|b|".to_string()];
        s.figures = vec!["a tree".to_string()];
        assert_eq!(s.render_with_media(), "see |a| and [Figure: a tree] then |b|");
    }

    #[test]
    fn test_json_round_trip_keeps_order_and_reindexes() {
        let mut map = SectionMap::new();
        map.insert(section("10", "ten"));
        map.insert(section("2", "two"));
        let json = serde_json::to_string(&map).unwrap();
        let mut loaded: SectionMap = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.ids(), vec!["10", "2"]);

        loaded.insert(section("2", "again"));
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get("2").unwrap().text, "two\nagain");
    }
}
