//! 已知题号表
//!
//! 从题目卷的解析结果一次性构建：大题号 → 合法小题字母集合。
//! 答案卷校正题号时以它为准；表为空时校正器退回启发式模式。

use std::collections::{BTreeMap, BTreeSet};

use super::label::QuestionLabel;
use super::section::SectionMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionRegistry {
    questions: BTreeMap<u32, BTreeSet<char>>,
}

impl QuestionRegistry {
    /// 从题号 ID 列表构建，例如 `["1", "2a", "2b", "3"]`；无法解析的 ID 被忽略
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut questions: BTreeMap<u32, BTreeSet<char>> = BTreeMap::new();
        for id in ids {
            if let Some(label) = QuestionLabel::parse_id(id.as_ref()) {
                let subs = questions.entry(label.main).or_default();
                if let Some(sub) = label.sub {
                    subs.insert(sub);
                }
            }
        }
        Self { questions }
    }

    /// 从题目卷解析结果构建
    pub fn from_sections(sections: &SectionMap) -> Self {
        Self::from_ids(sections.ids())
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn contains_main(&self, main: u32) -> bool {
        self.questions.contains_key(&main)
    }

    /// 某大题的合法小题字母（按字母序）
    pub fn subproblems(&self, main: u32) -> Option<&BTreeSet<char>> {
        self.questions.get(&main)
    }

    /// 大于 `after` 的最小合法大题号
    pub fn next_main_after(&self, after: u32) -> Option<u32> {
        self.questions
            .range(after.saturating_add(1)..)
            .next()
            .map(|(main, _)| *main)
    }

    /// 与 `main` 数值距离最近的合法大题号，距离相同取较小者
    pub fn nearest_main(&self, main: u32) -> Option<u32> {
        self.questions
            .keys()
            .copied()
            .min_by_key(|candidate| (candidate.abs_diff(main), *candidate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> QuestionRegistry {
        QuestionRegistry::from_ids(["1", "2", "2a", "2b", "5a", "5b", "5c", "7", "bogus"])
    }

    #[test]
    fn test_from_ids_groups_subproblems() {
        let reg = registry();
        assert!(reg.contains_main(2));
        assert!(!reg.contains_main(3));
        assert_eq!(
            reg.subproblems(5).unwrap().iter().collect::<String>(),
            "abc"
        );
        assert!(reg.subproblems(1).unwrap().is_empty());
    }

    #[test]
    fn test_next_and_nearest_main() {
        let reg = registry();
        assert_eq!(reg.next_main_after(2), Some(5));
        assert_eq!(reg.next_main_after(7), None);
        assert_eq!(reg.nearest_main(6), Some(5));
        assert_eq!(reg.nearest_main(40), Some(7));
    }
}
