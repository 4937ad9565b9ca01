//! 题号校正服务 - 业务能力层
//!
//! 只负责"把识别错的题号改回来"，不关心页面与流程。
//!
//! ## 两种模式
//! - **启发式**：没有已知题号表时使用。只有当识别结果不在顺序上的下一个题号之中，
//!   并且恰好一次形近字替换（如 `6`/`b`、`5`/`S`）能把它变成顺序上的下一个题号时才改。
//!   `5b` 之后出现 `6` 属于正常进位，永远不改。
//! - **题号表**：已知每道大题有哪些小题时使用。大题号吸附到合法题号，
//!   小题字母吸附到该题合法字母序列中的下一个。
//!
//! 校正器从不报错：无法判断时原样返回。

use phf::phf_map;
use regex::Regex;
use std::ops::Bound::{Excluded, Unbounded};
use std::sync::OnceLock;
use tracing::{debug, info};

use crate::models::{ContinuityState, QuestionLabel, QuestionRegistry};

/// 形近字对照表（对称）
static CONFUSABLES: phf::Map<char, &'static str> = phf_map! {
    '6' => "b",
    'b' => "6",
    '5' => "Ss",
    'S' => "5",
    's' => "5",
    '0' => "Oo",
    'O' => "0",
    'o' => "0",
    '1' => "lI|",
    'l' => "1",
    'I' => "1",
    '|' => "1",
    '2' => "Zz",
    'Z' => "2",
    'z' => "2",
    '8' => "B",
    'B' => "8",
    '9' => "gq",
    'g' => "9",
    'q' => "9",
    '(' => "c",
    'c' => "(",
};

/// 宽松的题号 token：允许形近字进入 token，交给校正器判断
fn raw_label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"題號：(?P<token>[0-9A-Za-z|(]+)(?P<cont>\s*(?:（續）|\(續\)|續\)))?")
            .expect("题号正则无效")
    })
}

/// 一次校正记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    /// 识别出的原始 token
    pub original: String,
    pub corrected: QuestionLabel,
}

/// 校正结果
#[derive(Debug, Clone, Default)]
pub struct ValidatedText {
    /// 题号已就地替换的文本
    pub text: String,
    /// 按出现顺序的全部题号（含续写）
    pub labels: Vec<QuestionLabel>,
    pub corrections: Vec<Correction>,
}

/// 题号校正器
#[derive(Debug, Clone, Default)]
pub struct LabelValidator {
    registry: Option<QuestionRegistry>,
}

impl LabelValidator {
    /// 启发式模式
    pub fn heuristic() -> Self {
        Self { registry: None }
    }

    /// 题号表模式；空表退回启发式模式
    pub fn with_registry(registry: QuestionRegistry) -> Self {
        if registry.is_empty() {
            debug!("题号表为空，使用启发式校正");
            return Self::heuristic();
        }
        Self {
            registry: Some(registry),
        }
    }

    pub fn uses_registry(&self) -> bool {
        self.registry.is_some()
    }

    /// 校正一段文本中的全部题号
    ///
    /// `state` 为进入本段文本之前的状态，逐个题号向前推进；
    /// 无论是否发生校正，状态都推进到校正后的题号。续写题号不推进状态。
    pub fn validate_text(&self, text: &str, state: &mut ContinuityState) -> ValidatedText {
        let mut result = ValidatedText::default();
        let mut output = String::with_capacity(text.len());
        let mut cursor = 0;

        for caps in raw_label_regex().captures_iter(text) {
            let Some(token_match) = caps.name("token") else {
                continue;
            };
            let cont = caps.name("cont");
            let mut token = token_match.as_str();
            let mut token_end = token_match.end();
            // `題號：5(續)` 中的半角左括号属于续写标记
            if let Some(cont) = cont {
                if cont.as_str().starts_with('續') && token.ends_with('(') {
                    token = &token[..token.len() - 1];
                    token_end -= 1;
                }
            }
            if token.is_empty() {
                continue;
            }

            if cont.is_some() {
                if let Some(label) = parse_token(token, state) {
                    result
                        .labels
                        .push(QuestionLabel::continuation_of(label.main, label.sub));
                }
                continue;
            }

            let Some(label) = self.validate_token(token, state) else {
                debug!("无法判断题号 '{}'，保持原样", token);
                continue;
            };

            // 只有大小写不同不算校正，原文保持不动
            let corrected = label.id();
            if !corrected.eq_ignore_ascii_case(token) {
                info!("🔧 题号校正: {} -> {}", token, corrected);
                output.push_str(&text[cursor..token_match.start()]);
                output.push_str(&corrected);
                cursor = token_end;
                result.corrections.push(Correction {
                    original: token.to_string(),
                    corrected: label,
                });
            }

            state.advance(&label);
            result.labels.push(label);
        }

        output.push_str(&text[cursor..]);
        result.text = output;
        result
    }

    /// 校正单个题号 token（不含 `題號：` 前缀）
    ///
    /// 返回 `None` 表示无法判断
    pub fn validate_token(&self, token: &str, state: &ContinuityState) -> Option<QuestionLabel> {
        match &self.registry {
            Some(registry) => resolve_with_registry(registry, token, state),
            None => resolve_heuristic(token, state),
        }
    }
}

/// 严格解析：`<数字><可选字母>`，或只有一个字母（属于当前大题）
fn parse_token(token: &str, state: &ContinuityState) -> Option<QuestionLabel> {
    let chars: Vec<char> = token.chars().collect();
    if let [letter] = chars.as_slice() {
        if letter.is_ascii_alphabetic() {
            return state
                .last_main
                .map(|main| QuestionLabel::new(main, Some(*letter)));
        }
    }
    QuestionLabel::parse_id(token)
}

/// 每个位置做一次形近字替换得到的全部候选，按位置、再按对照表顺序
fn confusable_variants(token: &str) -> Vec<String> {
    let chars: Vec<char> = token.chars().collect();
    let mut variants = Vec::new();
    for (i, c) in chars.iter().enumerate() {
        if let Some(alternatives) = CONFUSABLES.get(c) {
            for alt in alternatives.chars() {
                let mut variant = chars.clone();
                variant[i] = alt;
                variants.push(variant.into_iter().collect());
            }
        }
    }
    variants
}

/// 单独字母不会回到已经出现过的小题：`2b` 之后的 `a` 视为 `2c`
fn advance_lone_letter(token: &str, state: &ContinuityState) -> Option<QuestionLabel> {
    let mut chars = token.chars();
    let (Some(letter), None) = (chars.next(), chars.next()) else {
        return None;
    };
    if !letter.is_ascii_alphabetic() {
        return None;
    }
    let (main, last_sub) = (state.last_main?, state.last_sub?);
    if letter.to_ascii_lowercase() >= last_sub {
        return None;
    }
    QuestionLabel::next_sub(last_sub).map(|next| QuestionLabel::new(main, Some(next)))
}

fn resolve_heuristic(token: &str, state: &ContinuityState) -> Option<QuestionLabel> {
    if let Some(label) = advance_lone_letter(token, state) {
        return Some(label);
    }
    let parsed = parse_token(token, state);
    let expected = state.expected_next();

    if let Some(label) = parsed {
        let sequential_advance = state
            .last_main
            .and_then(|last| last.checked_add(1))
            .is_some_and(|next| label.main == next);
        if expected.is_empty() || sequential_advance || expected.contains(&label) {
            return Some(label);
        }
    }

    if !expected.is_empty() {
        let fixed = confusable_variants(token)
            .iter()
            .filter_map(|variant| parse_token(variant, state))
            .find(|candidate| expected.contains(candidate));
        if fixed.is_some() {
            return fixed;
        }
    }

    parsed
}

fn resolve_with_registry(
    registry: &QuestionRegistry,
    token: &str,
    state: &ContinuityState,
) -> Option<QuestionLabel> {
    let parsed = parse_token(token, state).or_else(|| {
        confusable_variants(token)
            .iter()
            .filter_map(|variant| parse_token(variant, state))
            .find(|candidate| registry.contains_main(candidate.main))
    })?;

    let main = snap_main(registry, parsed.main, state.last_main)?;
    let sub = snap_sub(registry, main, parsed.sub, state);
    Some(QuestionLabel::new(main, sub))
}

/// 大题号吸附
///
/// 识别值合法则保留；比上一题大时向前找下一个合法题号；
/// 否则停在上一题；没有上一题时取数值最近者
fn snap_main(registry: &QuestionRegistry, recognized: u32, last: Option<u32>) -> Option<u32> {
    if registry.contains_main(recognized) {
        return Some(recognized);
    }
    match last {
        Some(last) if recognized > last => registry
            .next_main_after(last)
            .or_else(|| registry.nearest_main(recognized)),
        Some(last) if registry.contains_main(last) => Some(last),
        _ => registry.nearest_main(recognized),
    }
}

/// 小题字母吸附
///
/// 该大题没有小题时丢弃字母；字母合法则保留；
/// 否则取上一小题之后的下一个合法字母（换了大题则取第一个）
fn snap_sub(
    registry: &QuestionRegistry,
    main: u32,
    recognized: Option<char>,
    state: &ContinuityState,
) -> Option<char> {
    let valid = registry.subproblems(main)?;
    if valid.is_empty() {
        return None;
    }
    let recognized = recognized?.to_ascii_lowercase();
    if valid.contains(&recognized) {
        return Some(recognized);
    }

    let after = if state.last_main == Some(main) {
        state.last_sub
    } else {
        None
    };
    let next = match after {
        Some(last) => valid.range((Excluded(last), Unbounded)).next(),
        None => valid.iter().next(),
    };
    next.copied().or_else(|| {
        valid
            .iter()
            .copied()
            .min_by_key(|c| (*c as u32).abs_diff(recognized as u32))
    })
}
