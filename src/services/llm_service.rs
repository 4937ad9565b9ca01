//! LLM 服务 - 业务能力层
//!
//! 只负责"看图识字"能力，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 页面图片以 `data:image/png;base64,...` 的形式内联发送
//! - 兼容 OpenAI API 的服务（如 Gemini, Azure, Doubao 等）

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestUserMessageArgs,
        ChatCompletionRequestUserMessageContent, ChatCompletionRequestUserMessageContentPart,
        CreateChatCompletionRequestArgs, ImageDetail, ImageUrl,
    },
    Client,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::RecognitionError;
use crate::models::PageImage;
use crate::services::recognition::RecognitionModel;

/// LLM 服务
///
/// 职责：
/// - 把一张页面图片和提示词发给多模态模型
/// - 把 SDK 错误归类为可重试 / 不可重试
/// - 不重试，重试由 [`crate::services::RetryingModel`] 负责
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    fn request_error(&self, e: impl std::fmt::Display) -> RecognitionError {
        RecognitionError::classify(&self.model_name, e.to_string())
    }

    /// 构建用户消息：文本在前，图片在后
    fn build_user_message(
        &self,
        prompt: &str,
        image: Option<&PageImage>,
    ) -> Result<ChatCompletionRequestMessage, RecognitionError> {
        let builder = match image {
            Some(image) if !image.is_empty() => {
                let parts = vec![
                    ChatCompletionRequestUserMessageContentPart::Text(
                        ChatCompletionRequestMessageContentPartText {
                            text: prompt.to_string(),
                        },
                    ),
                    ChatCompletionRequestUserMessageContentPart::ImageUrl(
                        ChatCompletionRequestMessageContentPartImage {
                            image_url: ImageUrl {
                                url: png_data_url(&image.png),
                                detail: Some(ImageDetail::High),
                            },
                        },
                    ),
                ];
                ChatCompletionRequestUserMessageArgs::default()
                    .content(ChatCompletionRequestUserMessageContent::Array(parts))
                    .build()
            }
            _ => ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build(),
        };
        let message = builder.map_err(|e| self.request_error(e))?;
        Ok(ChatCompletionRequestMessage::User(message))
    }
}

/// PNG 字节编码为 data URL
pub fn png_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", BASE64_STANDARD.encode(png))
}

#[async_trait]
impl RecognitionModel for LlmService {
    async fn generate(
        &self,
        prompt: &str,
        image: Option<&PageImage>,
    ) -> Result<Option<String>, RecognitionError> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        if let Some(image) = image {
            debug!("第 {} 页图片: {} 字节", image.index + 1, image.png.len());
        }

        let message = self.build_user_message(prompt, image)?;
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![message])
            .temperature(0.0)
            .build()
            .map_err(|e| self.request_error(e))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            self.request_error(e)
        })?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());

        if content.is_none() {
            debug!("LLM 返回内容为空");
        }
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_data_url() {
        assert_eq!(png_data_url(b"abc"), "data:image/png;base64,YWJj");
    }

    /// 需要真实 API Key: `cargo test -- --ignored`
    #[tokio::test]
    #[ignore]
    async fn test_live_text_only_call() {
        let config = Config::from_env();
        let service = LlmService::new(&config);
        let result = service.generate("Reply with the word: pong", None).await;
        assert!(result.is_ok(), "{:?}", result.err());
    }
}
