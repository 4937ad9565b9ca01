use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- 识别模型配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 限流时的最大尝试次数（含第一次）
    pub retry_max_attempts: usize,
    /// 退避初始等待（毫秒）
    pub retry_min_delay_ms: u64,
    /// 退避最大等待（毫秒）
    pub retry_max_delay_ms: u64,

    // --- 渲染配置 ---
    /// 抽取题目/答案时的渲染分辨率
    pub extraction_dpi: u32,
    /// 识别学生信息时的渲染分辨率
    pub detection_dpi: u32,
    /// 页眉裁剪宽度（像素，从左上角起）
    pub header_crop_width: u32,
    /// 页眉裁剪高度（像素，从左上角起）
    pub header_crop_height: u32,

    // --- 流程配置 ---
    /// 页首多少个字符内没有题号时视为续写
    pub continuation_window: usize,
    /// 学生信息识别的最大并发数
    pub max_detection_workers: usize,
    /// 拆分后文件的输出目录
    pub output_dir: PathBuf,
    /// 保存裁剪/渲染图片的调试目录
    pub debug_image_dir: Option<PathBuf>,

    // --- 日志配置 ---
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model_name: "gemini-2.5-flash".to_string(),
            retry_max_attempts: 5,
            retry_min_delay_ms: 4_000,
            retry_max_delay_ms: 60_000,
            extraction_dpi: 300,
            detection_dpi: 144,
            header_crop_width: 500,
            header_crop_height: 100,
            continuation_window: 300,
            max_detection_workers: 4,
            output_dir: PathBuf::from("partitioned"),
            debug_image_dir: None,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default().merge_env()
    }

    /// 从 TOML 文件加载配置，缺失的字段使用默认值，之后环境变量仍可覆盖
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(config.merge_env())
    }

    fn merge_env(self) -> Self {
        let base = self;
        Self {
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(base.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(base.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(base.llm_model_name),
            retry_max_attempts: std::env::var("RETRY_MAX_ATTEMPTS").ok().and_then(|v| v.parse().ok()).unwrap_or(base.retry_max_attempts),
            retry_min_delay_ms: std::env::var("RETRY_MIN_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(base.retry_min_delay_ms),
            retry_max_delay_ms: std::env::var("RETRY_MAX_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(base.retry_max_delay_ms),
            extraction_dpi: std::env::var("EXTRACTION_DPI").ok().and_then(|v| v.parse().ok()).unwrap_or(base.extraction_dpi),
            detection_dpi: std::env::var("DETECTION_DPI").ok().and_then(|v| v.parse().ok()).unwrap_or(base.detection_dpi),
            header_crop_width: std::env::var("HEADER_CROP_WIDTH").ok().and_then(|v| v.parse().ok()).unwrap_or(base.header_crop_width),
            header_crop_height: std::env::var("HEADER_CROP_HEIGHT").ok().and_then(|v| v.parse().ok()).unwrap_or(base.header_crop_height),
            continuation_window: std::env::var("CONTINUATION_WINDOW").ok().and_then(|v| v.parse().ok()).unwrap_or(base.continuation_window),
            max_detection_workers: std::env::var("MAX_DETECTION_WORKERS").ok().and_then(|v| v.parse().ok()).unwrap_or(base.max_detection_workers),
            output_dir: std::env::var("OUTPUT_DIR").map(PathBuf::from).unwrap_or(base.output_dir),
            debug_image_dir: std::env::var("DEBUG_IMAGE_DIR").ok().map(PathBuf::from).or(base.debug_image_dir),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(base.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(base.output_log_file),
        }
    }

    /// 调用模型前检查必需项
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        if self.llm_api_key.trim().is_empty() {
            return Err(ConfigError::Missing {
                name: "LLM_API_KEY".to_string(),
            });
        }
        Ok(&self.llm_api_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_partial_override_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            llm_model_name = "vision-test"
            max_detection_workers = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.llm_model_name, "vision-test");
        assert_eq!(config.max_detection_workers, 8);
        assert_eq!(config.header_crop_width, 500);
        assert_eq!(config.continuation_window, 300);
    }

    #[test]
    fn test_missing_api_key_is_reported() {
        let config = Config::default();
        assert!(matches!(
            config.require_api_key(),
            Err(ConfigError::Missing { .. })
        ));
    }
}
