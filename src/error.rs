use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::features::board::canvas::CanvasError;
use crate::features::board::encode::EncodeError;

/// 应用统一错误类型
///
/// 渲染核心只有一种致命错误（无法创建画布/产出图片）；缓存读写失败、贴图缺失、
/// FEN 畸形等降级情况在各组件内部吸收，不会出现在这里。
#[derive(Error, Debug)]
pub enum AppError {
    /// 渲染能力不可用：无法创建画布或编码输出
    #[error("渲染不可用: {0}")]
    RenderUnavailable(String),

    /// 配置错误（仅启动期）
    #[error("配置错误: {0}")]
    Config(String),

    /// 内部服务器错误
    #[error("内部错误: {0}")]
    Internal(String),
}

/// RFC7807 风格的错误响应（Problem Details）。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    /// 问题类型（URI）
    #[serde(rename = "type")]
    pub type_url: String,
    pub title: String,
    /// HTTP 状态码（与响应 status 一致）
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// 稳定的错误码，用于程序化处理
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::RenderUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn stable_code(&self) -> &'static str {
        match self {
            AppError::RenderUnavailable(_) => "RENDER_UNAVAILABLE",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 对外只暴露通用描述，具体原因写日志
    fn public_detail(&self) -> &'static str {
        match self {
            AppError::RenderUnavailable(_) => "board rendering is unavailable",
            AppError::Config(_) | AppError::Internal(_) => "internal server error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("请求失败: {}", self);
        let status = self.status_code();

        let problem = ProblemDetails {
            type_url: "about:blank".to_string(),
            title: status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            status: status.as_u16(),
            detail: Some(self.public_detail().to_string()),
            code: self.stable_code().to_string(),
            request_id: crate::request_id::current_request_id(),
        };

        let mut res = Json(problem).into_response();
        *res.status_mut() = status;
        res.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        res
    }
}

impl From<CanvasError> for AppError {
    fn from(err: CanvasError) -> Self {
        AppError::RenderUnavailable(err.to_string())
    }
}

impl From<EncodeError> for AppError {
    fn from(err: EncodeError) -> Self {
        AppError::RenderUnavailable(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}
