use serde::Deserialize;

use crate::config::BoardConfig;

/// 原始查询参数（全部按字符串接收，由 [`RenderRequest::from_query`] 宽松归一化）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoardQuery {
    #[serde(default)]
    pub fen: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub reversed: Option<String>,
    /// 以附件形式下载
    #[serde(default)]
    pub download: Option<String>,
}

/// 已校验的渲染请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub fen: String,
    pub size: u32,
    pub reversed: bool,
}

impl RenderRequest {
    pub fn new(fen: impl Into<String>, size: u32, reversed: bool) -> Self {
        Self {
            fen: fen.into(),
            size,
            reversed,
        }
    }

    /// 归一化查询：
    /// - `fen` 去标签、引号转义、剔除控制字符与非 ASCII 字节
    /// - `size` 非整数或越界时回落到默认值
    /// - `reversed` 仅 `1/true/on/yes` 视为真
    pub fn from_query(q: &BoardQuery, board: &BoardConfig) -> Self {
        Self {
            fen: q.fen.as_deref().map(sanitize_fen).unwrap_or_default(),
            size: parse_size(q.size.as_deref(), board),
            reversed: parse_flag(q.reversed.as_deref()),
        }
    }
}

/// 宽松布尔：`1/true/on/yes`（忽略大小写与首尾空白）为真，其余一律为假
pub fn parse_flag(raw: Option<&str>) -> bool {
    raw.map(|v| v.trim().to_ascii_lowercase())
        .is_some_and(|v| matches!(v.as_str(), "1" | "true" | "on" | "yes"))
}

fn parse_size(raw: Option<&str>, board: &BoardConfig) -> u32 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| (board.min_size as i64..=board.max_size as i64).contains(v))
        .map(|v| v as u32)
        .unwrap_or(board.default_size)
}

/// 去除 `<...>` 标签，`'`/`"` 转为数字实体，丢弃 ASCII 控制字符与非 ASCII 字符
pub fn sanitize_fen(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_tag = false;
    for c in raw.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if in_tag => {}
            '\'' => out.push_str("&#39;"),
            '"' => out.push_str("&#34;"),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            _ => {}
        }
    }
    out
}
