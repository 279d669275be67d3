use std::fmt;

use md5::{Digest, Md5};

/// 缓存文件扩展名（输出格式固定为 PNG）
pub const ARTIFACT_EXTENSION: &str = "png";

/// 字段拼接分隔符
const FIELD_SEPARATOR: &str = "_";

/// 请求指纹：32 位小写十六进制摘要 + `.png` 后缀，可直接作为缓存文件名。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 十六进制摘要部分（不含扩展名）
    pub fn digest_hex(&self) -> &str {
        self.0
            .strip_suffix(ARTIFACT_EXTENSION)
            .and_then(|s| s.strip_suffix('.'))
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_key_char(c: char) -> bool {
    matches!(
        c,
        'k' | 'q' | 'r' | 'n' | 'b' | 'p' | 'K' | 'Q' | 'R' | 'N' | 'B' | 'P' | '_' | '-'
    ) || c.is_ascii_digit()
}

/// 拼接并过滤后的规范化字符串（哈希前的原文）。
///
/// 注意：`/`、空格等分隔符会被整体剔除，因此仅在空格跨行切分方式上不同的两个
/// 摆放串可能得到同一个指纹并共享缓存产物。保留该行为以兼容既有缓存目录。
pub fn canonical_form(fen: &str, size: u32, reversed: bool) -> String {
    let reversed = if reversed { "1" } else { "0" };
    let joined = [fen, &size.to_string(), reversed].join(FIELD_SEPARATOR);
    joined.chars().filter(|c| is_key_char(*c)).collect()
}

/// 由 (fen, size, reversed) 计算确定性的缓存键；纯函数，跨进程稳定。
pub fn fingerprint(fen: &str, size: u32, reversed: bool) -> CacheKey {
    let canonical = canonical_form(fen, size, reversed);
    let digest = Md5::digest(canonical.as_bytes());
    CacheKey(format!("{}.{ARTIFACT_EXTENSION}", hex::encode(digest)))
}
