use super::label::QuestionLabel;

/// 跨页题号状态：上一页（或上一个题号）停在哪一题
///
/// 每页只在校正之后更新一次，只向前推进
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContinuityState {
    pub last_main: Option<u32>,
    pub last_sub: Option<char>,
}

impl ContinuityState {
    pub fn is_empty(&self) -> bool {
        self.last_main.is_none()
    }

    /// 当前所在的题号
    pub fn current(&self) -> Option<QuestionLabel> {
        self.last_main
            .map(|main| QuestionLabel::new(main, self.last_sub))
    }

    /// 以某个题号为新的当前位置
    pub fn advance(&mut self, label: &QuestionLabel) {
        self.last_main = Some(label.main);
        self.last_sub = label.sub;
    }

    /// 按出现顺序观察一页内的题号，续写题号不推进状态，最后一个非续写题号生效
    pub fn observe<'a, I>(&mut self, labels: I)
    where
        I: IntoIterator<Item = &'a QuestionLabel>,
    {
        for label in labels {
            if !label.continuation {
                self.advance(label);
            }
        }
    }

    /// 顺序上可能出现的下一个题号（包括停留在当前题号）
    ///
    /// - 当前 `5b`：`5b`、`5c`、`6`、`6a`
    /// - 当前 `5`：`5`、`5a`、`6`、`6a`
    pub fn expected_next(&self) -> Vec<QuestionLabel> {
        let Some(main) = self.last_main else {
            return Vec::new();
        };
        let mut expected = vec![QuestionLabel::new(main, self.last_sub)];
        match self.last_sub {
            Some(sub) => {
                if let Some(next) = QuestionLabel::next_sub(sub) {
                    expected.push(QuestionLabel::new(main, Some(next)));
                }
            }
            None => expected.push(QuestionLabel::new(main, Some('a'))),
        }
        if let Some(next_main) = main.checked_add(1) {
            expected.push(QuestionLabel::new(next_main, None));
            expected.push(QuestionLabel::new(next_main, Some('a')));
        }
        expected
    }
}
