//! 识别提示词
//!
//! 输出格式（`題號：`、`配分：`、`<TABLE>`、`<FIGURE>`）是与下游解析器的约定，修改时两边一起改。

use crate::models::{ExtractionKind, QuestionLabel};

const ANSWER_PROMPT: &str = r#"Analyze this exam page which contains answers to one or more questions.
IMPORTANT: Extract ALL text on the page, regardless of language or format.

For EACH answer on the page:
1. Find the question number (題號):
   - Plain numbers (e.g. 4, 5)
   - Numbers with a subproblem letter (e.g. 2a, 2b, 2c)
   - A lone subproblem letter (e.g. 'd') belongs to the question seen most recently, so 'd' after question 5 is '5d'
2. Extract the complete answer text:
   - Text in any language, preserving the original Chinese/English mix
   - Formulas inline with the text: ^ for exponents, _ for subscripts, n/(2^(k+1)) style fractions
   - Never split an equation across lines or insert spaces inside it
3. Tables go in markdown wrapped as:
   <TABLE>
   | Header1 | Header2 |
   |---------|---------|
   | Data1   | Data2   |
   </TABLE>
4. Figures are described in detail wrapped as: <FIGURE>description</FIGURE>
5. Format each answer as:
題號：<number><letter if subproblem>
<answer text including any table or figure markup>

GUIDELINES:
- Text at the top of the page before any question number is a continuation of the previous page
- Do not skip any question number or any text
- Keep subproblem labels consistent across pages"#;

const QUESTION_PROMPT: &str = r#"Analyze this exam page and extract every question and subproblem with its score.
For each question or subproblem:
1. Identify the question number (題號) including the subproblem letter (e.g. 2a, 2b)
2. Identify the score (配分), which follows the number in parentheses:
   e.g. 2. (10) Problem description
   e.g. 2a (10) Subproblem description
   e.g. (a) (10) Subproblem description
3. Extract the full content without the score or % symbols
4. Formulas use LaTeX style, stay on one line, and keep every bracket exactly as printed
5. Tables go in markdown wrapped as <TABLE>...</TABLE>
6. Figures are described in detail wrapped as <FIGURE>...</FIGURE>
7. Format the output as:
題號：<number><letter if subproblem>
配分：<score>
<content including any table or figure markup>"#;

const STUDENT_ID_PROMPT: &str = r#"This image is the top-left corner of an exam answer sheet.
Read the handwritten or printed student ID and student name.
Reply with exactly two lines:
Student ID: <student id>
Name: <student name>
If either value is not visible, write NOT_FOUND for it."#;

/// 某类抽取的基础提示词
pub fn extraction_prompt(kind: ExtractionKind) -> &'static str {
    match kind {
        ExtractionKind::Questions => QUESTION_PROMPT,
        ExtractionKind::Answers => ANSWER_PROMPT,
    }
}

/// 学生信息识别提示词
pub fn student_id_prompt() -> &'static str {
    STUDENT_ID_PROMPT
}

/// 跨页提示：告诉模型上一页停在哪一题
///
/// 只是提示，模型可以不遵守；真正的保证来自续写标记注入与题号校正
pub fn continuity_hint(current: &QuestionLabel) -> String {
    let id = current.id();
    let main = current.main;
    format!(
        "Note: the previous page ended in question {id}. \
         A lone subproblem letter without a number belongs to question {main}. \
         If the page begins with text that has no question number, it continues question {id}; \
         label it as 題號：{id}（續）. \
         This page may contain BOTH continuation text from question {id} at the top AND new questions."
    )
}

/// 组装完整提示词
pub fn build_page_prompt(kind: ExtractionKind, hint: Option<&str>) -> String {
    match hint {
        Some(hint) if !hint.is_empty() => format!("{}\n{}", extraction_prompt(kind), hint),
        _ => extraction_prompt(kind).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continuity_hint_mentions_continuation_markup() {
        let hint = continuity_hint(&QuestionLabel::new(5, Some('c')));
        assert!(hint.contains("question 5c"));
        assert!(hint.contains("題號：5c（續）"));
        assert!(hint.contains("belongs to question 5."));
    }

    #[test]
    fn test_build_page_prompt_appends_hint() {
        let prompt = build_page_prompt(ExtractionKind::Answers, Some("HINT"));
        assert!(prompt.starts_with(ANSWER_PROMPT));
        assert!(prompt.ends_with("\nHINT"));
        assert_eq!(
            build_page_prompt(ExtractionKind::Questions, None),
            QUESTION_PROMPT
        );
    }
}
