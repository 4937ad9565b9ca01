//! 跨页题号追踪
//!
//! 每次抽取独占一个追踪器：提供给模型的提示、续写标记的补全，
//! 以及每页校正后的状态推进都在这里完成

use tracing::debug;

use crate::models::label::{has_label_within, LabelMatch};
use crate::models::{ContinuityState, QuestionLabel};
use crate::services::prompts;

#[derive(Debug, Clone, Default)]
pub struct ContinuityTracker {
    state: ContinuityState,
}

impl ContinuityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从已知位置开始追踪
    pub fn starting_at(label: QuestionLabel) -> Self {
        let mut tracker = Self::new();
        tracker.state.advance(&label);
        tracker
    }

    pub fn state(&self) -> ContinuityState {
        self.state
    }

    /// 给模型的跨页提示；第一页（还没有状态）没有提示
    pub fn hint(&self) -> Option<String> {
        self.state
            .current()
            .map(|current| prompts::continuity_hint(&current))
    }

    /// 页首 `window` 个字符内没有题号时，补上上一题的续写标记
    pub fn ensure_continuation(&self, text: String, window: usize) -> String {
        let Some(current) = self.state.current() else {
            return text;
        };
        if has_label_within(&text, window) {
            return text;
        }
        let marker = QuestionLabel::continuation_of(current.main, current.sub).markup();
        debug!("页首没有题号，补充续写标记: {}", marker);
        format!("{}\n{}", marker, text)
    }

    /// 用校正后的题号推进状态，最后一个非续写题号生效
    pub fn observe(&mut self, labels: &[LabelMatch]) {
        self.state.observe(labels.iter().map(|m| &m.label));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::label::scan_labels;

    #[test]
    fn test_no_hint_on_first_page() {
        assert!(ContinuityTracker::new().hint().is_none());
    }

    #[test]
    fn test_hint_names_current_label() {
        let tracker = ContinuityTracker::starting_at(QuestionLabel::new(4, Some('b')));
        assert!(tracker.hint().unwrap().contains("題號：4b（續）"));
    }

    #[test]
    fn test_ensure_continuation_prepends_marker() {
        let tracker = ContinuityTracker::starting_at(QuestionLabel::new(2, Some('a')));
        let text = tracker.ensure_continuation("接續的證明".to_string(), 300);
        assert_eq!(text, "題號：2a（續）\n接續的證明");
    }

    #[test]
    fn test_ensure_continuation_respects_window() {
        let tracker = ContinuityTracker::starting_at(QuestionLabel::new(2, None));
        let near = "前言\n題號：3\n答案".to_string();
        assert_eq!(tracker.ensure_continuation(near.clone(), 300), near);

        let far = format!("{}題號：3", "字".repeat(20));
        assert!(tracker
            .ensure_continuation(far, 10)
            .starts_with("題號：2（續）\n"));
    }

    #[test]
    fn test_ensure_continuation_without_state_is_noop() {
        let text = ContinuityTracker::new().ensure_continuation("無題號".to_string(), 300);
        assert_eq!(text, "無題號");
    }

    #[test]
    fn test_observe_ignores_trailing_continuation() {
        let mut tracker = ContinuityTracker::new();
        tracker.observe(&scan_labels("題號：1\na\n題號：2a\nb\n題號：1（續）\nc"));
        assert_eq!(tracker.state().current(), Some(QuestionLabel::new(2, Some('a'))));
    }
}
