use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 识别模型错误
    #[error("识别模型错误: {0}")]
    Recognition(#[from] RecognitionError),
    /// 文档渲染/读写错误
    #[error("文档错误: {0}")]
    Document(#[from] DocumentError),
    /// 拆分错误
    #[error("拆分错误: {0}")]
    Partition(#[from] PartitionError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 识别模型错误
///
/// 只区分两类：可重试（限流 / 配额耗尽）与不可重试（其他一切）
#[derive(Debug, Clone, Error)]
pub enum RecognitionError {
    /// 限流或配额耗尽，可以退避后重试
    #[error("模型请求被限流 (模型: {model}): {message}")]
    Retryable { model: String, message: String },
    /// 其他错误，立即向上传播
    #[error("模型调用失败 (模型: {model}): {message}")]
    NonRetryable { model: String, message: String },
}

impl RecognitionError {
    /// 是否值得退避重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, RecognitionError::Retryable { .. })
    }

    /// 根据错误文本判断错误类型
    ///
    /// 上游 SDK 的错误类型众多，这里只看文本中的限流信号：
    /// HTTP 429、`RESOURCE_EXHAUSTED`、rate limit、quota。
    pub fn classify(model: impl Into<String>, message: impl Into<String>) -> Self {
        let model = model.into();
        let message = message.into();
        let lower = message.to_lowercase();
        let retryable = lower.contains("429")
            || lower.contains("resource_exhausted")
            || lower.contains("rate limit")
            || lower.contains("rate_limit")
            || lower.contains("too many requests")
            || lower.contains("quota");

        if retryable {
            RecognitionError::Retryable { model, message }
        } else {
            RecognitionError::NonRetryable { model, message }
        }
    }
}

/// 文档渲染与 PDF 读写错误
#[derive(Debug, Error)]
pub enum DocumentError {
    /// 打开 PDF 失败
    #[error("无法打开文档 ({path}): {reason}")]
    OpenFailed { path: String, reason: String },
    /// 渲染页面失败
    #[error("第 {page} 页渲染失败: {reason}")]
    RenderFailed { page: usize, reason: String },
    /// 图片解码/编码失败
    #[error("图片处理失败: {0}")]
    Image(String),
    /// 页码超出范围
    #[error("页码范围 {start}-{end} 超出文档范围 (共 {total} 页)")]
    PageOutOfRange {
        start: usize,
        end: usize,
        total: usize,
    },
    /// 保存 PDF 失败
    #[error("保存文档失败 ({path}): {reason}")]
    SaveFailed { path: String, reason: String },
}

/// 拆分错误
///
/// `PageCountMismatch` 是结构性错误：拆分结果不可信，调用方不得使用任何输出
#[derive(Debug, Error)]
pub enum PartitionError {
    /// 未识别到任何学生
    #[error("未在文档中识别到任何学生")]
    NoStudentsDetected,
    /// 拆分后总页数与原文档不一致
    #[error("页数不一致: 原文档 {expected} 页, 拆分后共 {actual} 页")]
    PageCountMismatch { expected: usize, actual: usize },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// JSON 解析失败
    #[error("JSON 解析失败 ({path}): {source}")]
    JsonParseFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件解析失败
    #[error("配置文件 {path} 解析失败: {reason}")]
    ParseFailed { path: String, reason: String },
    /// 缺少必需的配置项
    #[error("缺少配置项 {name}")]
    Missing { name: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_rate_limit_signals() {
        assert!(RecognitionError::classify("m", "HTTP 429 Too Many Requests").is_retryable());
        assert!(RecognitionError::classify("m", "status: RESOURCE_EXHAUSTED").is_retryable());
        assert!(RecognitionError::classify("m", "Quota exceeded for project").is_retryable());
    }

    #[test]
    fn test_classify_other_errors_are_fatal() {
        let err = RecognitionError::classify("m", "invalid api key");
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("invalid api key"));
    }
}
