//! 文本解析服务 - 业务能力层
//!
//! 把抽取出的整份文本按 `題號：` 切分为 [`SectionMap`]。
//! 续写片段与同题号的前文合并，所以跨页切开的答案在结果中仍是一段。

use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::models::label::parse_main;
use crate::models::{ExtractedSection, ExtractionKind, QuestionLabel, SectionMap};

fn split_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"題號：(\d+)([A-Za-z])?(\s*(?:（續）|\(續\)))?").expect("切分正则无效")
    })
}

fn score_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"配分：(\d+)").expect("配分正则无效"))
}

fn score_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"配分：\d+\n?").expect("配分正则无效"))
}

fn table_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<TABLE>\s*(.*?)\s*</TABLE>").expect("表格正则无效"))
}

fn figure_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<FIGURE>(.*?)</FIGURE>").expect("图片正则无效"))
}

/// 表头、分隔行、至少一行数据
const MIN_TABLE_LINES: usize = 3;

/// 解析整份抽取文本
///
/// # 参数
/// - `content`: 抽取流程输出的文本（题号已校正）
/// - `kind`: 题目卷会额外解析 `配分：`
///
/// 第一个题号之前的文本被丢弃
pub fn parse_sections(content: &str, kind: ExtractionKind) -> SectionMap {
    let mut sections = SectionMap::new();
    // 数字过大的"题号"按正文处理
    let matches: Vec<_> = split_regex()
        .captures_iter(content)
        .filter(|caps| {
            let valid = caps.get(1).and_then(|m| parse_main(m.as_str())).is_some();
            if !valid {
                debug!("题号数字过大，按正文处理: {}", &caps[0]);
            }
            valid
        })
        .collect();

    if let Some(first) = matches.first().and_then(|caps| caps.get(0)) {
        let preamble = content[..first.start()].trim();
        if !preamble.is_empty() {
            debug!("丢弃第一个题号之前的 {} 个字符", preamble.chars().count());
        }
    } else if !content.trim().is_empty() {
        warn!("⚠️ 文本中没有任何题号");
    }

    for (i, caps) in matches.iter().enumerate() {
        let (Some(whole), Some(main)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Some(main) = parse_main(main.as_str()) else {
            continue;
        };
        let sub = caps.get(2).and_then(|m| m.as_str().chars().next());
        let continuation = caps.get(3).is_some();

        let body_end = matches
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(content.len());
        let body = &content[whole.end()..body_end];

        let mut section = ExtractedSection::new(QuestionLabel::new(main, sub));
        fill_section(&mut section, body, kind, continuation);
        sections.insert(section);
    }

    debug!("解析得到 {} 个题号", sections.len());
    sections
}

fn fill_section(
    section: &mut ExtractedSection,
    body: &str,
    kind: ExtractionKind,
    continuation: bool,
) {
    let body = body.trim();

    if kind == ExtractionKind::Questions && !continuation {
        section.score = score_regex()
            .captures(body)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok());
    }
    let text = score_line_regex().replace_all(body, "");

    let mut tables = Vec::new();
    let text = table_regex().replace_all(&text, |caps: &regex::Captures| {
        let table = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        if table.lines().filter(|l| !l.trim().is_empty()).count() >= MIN_TABLE_LINES {
            tables.push(table.to_string());
            "[TABLE]".to_string()
        } else {
            // 不像表格的内容保留为正文
            table.to_string()
        }
    });

    let mut figures = Vec::new();
    let text = figure_regex().replace_all(&text, |caps: &regex::Captures| {
        let figure = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        figures.push(figure.to_string());
        "[FIGURE]"
    });

    section.text = text.trim().to_string();
    section.tables = tables;
    section.figures = figures;
}
