use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult, FileError};
use crate::models::section::SectionMap;

/// 中间结果保存路径：与输入文件同目录，`<文件名><后缀>.json`
pub fn intermediate_json_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{}{}.json", stem, suffix))
}

/// 保存解析结果（UTF-8，缩进格式）
pub async fn save_sections(sections: &SectionMap, input: &Path, suffix: &str) -> AppResult<PathBuf> {
    let output_path = intermediate_json_path(input, suffix);
    let json = serde_json::to_string_pretty(sections).map_err(|e| {
        AppError::File(FileError::JsonParseFailed {
            path: output_path.display().to_string(),
            source: e,
        })
    })?;
    tokio::fs::write(&output_path, json)
        .await
        .map_err(|e| AppError::file_write_failed(output_path.display().to_string(), e))?;
    tracing::info!("💾 中间结果已保存: {}", output_path.display());
    Ok(output_path)
}

/// 加载之前保存的解析结果
pub async fn load_sections(path: &Path) -> AppResult<SectionMap> {
    if !path.exists() {
        return Err(AppError::File(FileError::NotFound {
            path: path.display().to_string(),
        }));
    }
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
    let sections: SectionMap = serde_json::from_str(&content).map_err(|e| {
        AppError::File(FileError::JsonParseFailed {
            path: path.display().to_string(),
            source: e,
        })
    })?;
    tracing::info!("📂 已加载 {} 个题号: {}", sections.len(), path.display());
    Ok(sections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::label::QuestionLabel;
    use crate::models::section::ExtractedSection;

    #[test]
    fn test_intermediate_json_path() {
        let path = intermediate_json_path(Path::new("/tmp/exam/final.pdf"), "_answers");
        assert_eq!(path, PathBuf::from("/tmp/exam/final_answers.json"));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("midterm.pdf");

        let mut sections = SectionMap::new();
        let mut section = ExtractedSection::new(QuestionLabel::new(1, None));
        section.text = "解答".to_string();
        section.score = Some(10);
        sections.insert(section);

        let saved = save_sections(&sections, &input, "_questions").await.unwrap();
        assert!(saved.ends_with("midterm_questions.json"));

        let loaded = load_sections(&saved).await.unwrap();
        assert_eq!(loaded, sections);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let result = load_sections(Path::new("/definitely/not/here.json")).await;
        assert!(matches!(result, Err(AppError::File(FileError::NotFound { .. }))));
    }
}
