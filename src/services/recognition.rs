//! 识别模型抽象
//!
//! 抽取流程只依赖 [`RecognitionModel`]：给一段提示词和一张可选图片，返回文本。
//! 真实实现见 [`crate::services::LlmService`]，测试中用脚本化的假模型替代。

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::config::Config;
use crate::error::RecognitionError;
use crate::models::PageImage;

/// 多模态识别能力
///
/// 返回 `Ok(None)` 表示模型没有给出任何内容
#[async_trait]
pub trait RecognitionModel: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        image: Option<&PageImage>,
    ) -> Result<Option<String>, RecognitionError>;
}

#[async_trait]
impl<M: RecognitionModel + ?Sized> RecognitionModel for Arc<M> {
    async fn generate(
        &self,
        prompt: &str,
        image: Option<&PageImage>,
    ) -> Result<Option<String>, RecognitionError> {
        (**self).generate(prompt, image).await
    }
}

/// 退避策略
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// 最大尝试次数（含第一次）
    pub max_attempts: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.retry_max_attempts.max(1),
            min_delay: Duration::from_millis(config.retry_min_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
        }
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_factor(2.0)
            .with_max_times(self.max_attempts.saturating_sub(1))
            .with_jitter()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// 带限流退避的识别模型
///
/// 只有 [`RecognitionError::Retryable`] 会被重试；重试耗尽后返回最后一次的错误，
/// 由调用方决定跳过当前页还是中止
pub struct RetryingModel<M> {
    inner: M,
    policy: RetryPolicy,
}

impl<M: RecognitionModel> RetryingModel<M> {
    pub fn new(inner: M, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<M: RecognitionModel> RecognitionModel for RetryingModel<M> {
    async fn generate(
        &self,
        prompt: &str,
        image: Option<&PageImage>,
    ) -> Result<Option<String>, RecognitionError> {
        let attempt = || async { self.inner.generate(prompt, image).await };
        attempt
            .retry(self.policy.backoff())
            .when(RecognitionError::is_retryable)
            .notify(|err: &RecognitionError, dur: Duration| {
                warn!("⏳ 模型限流，{:.1} 秒后重试: {}", dur.as_secs_f32(), err);
            })
            .await
    }
}
