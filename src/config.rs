use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::features::board::canvas::{Palette, Rgb};
use crate::features::board::encode::EncodeOptions;

/// 配置文件路径环境变量
const CONFIG_PATH_ENV: &str = "FEN_BOARD_CONFIG";

/// 棋盘边长上限（4096² 的 RGBA 画布约 64 MiB）
pub const MAX_BOARD_SIZE: u32 = 4096;

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "ServerConfig::default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,
}

impl ServerConfig {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }
    fn default_port() -> u16 {
        8080
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（RUST_LOG 未设置时生效）
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API 路由前缀
    #[serde(default = "ApiConfig::default_prefix")]
    pub prefix: String,
}

impl ApiConfig {
    fn default_prefix() -> String {
        "/api/v1".to_string()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            prefix: Self::default_prefix(),
        }
    }
}

/// 棋盘尺寸与配色
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// 默认边长（像素）
    #[serde(default = "BoardConfig::default_size")]
    pub default_size: u32,
    #[serde(default = "BoardConfig::default_min_size")]
    pub min_size: u32,
    #[serde(default = "BoardConfig::default_max_size")]
    pub max_size: u32,
    /// 深色格（`#rrggbb` 或 `#rgb`）
    #[serde(default = "BoardConfig::default_dark")]
    pub dark_square: String,
    /// 浅色格
    #[serde(default = "BoardConfig::default_light")]
    pub light_square: String,
}

impl BoardConfig {
    fn default_size() -> u32 {
        200
    }
    fn default_min_size() -> u32 {
        100
    }
    fn default_max_size() -> u32 {
        1000
    }
    fn default_dark() -> String {
        "#b5876b".to_string()
    }
    fn default_light() -> String {
        "#f0dec7".to_string()
    }

    /// 解析配色；`validate()` 通过后不会失败
    pub fn palette(&self) -> Result<Palette, ConfigError> {
        let parse = |name: &str, hex: &str| {
            Rgb::from_hex(hex)
                .ok_or_else(|| ConfigError::Message(format!("board.{name} 不是合法颜色: {hex}")))
        };
        Ok(Palette {
            dark: parse("dark_square", &self.dark_square)?,
            light: parse("light_square", &self.light_square)?,
        })
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            default_size: Self::default_size(),
            min_size: Self::default_min_size(),
            max_size: Self::default_max_size(),
            dark_square: Self::default_dark(),
            light_square: Self::default_light(),
        }
    }
}

/// 存储路径配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 渲染结果缓存目录
    #[serde(default = "StorageConfig::default_cache_path")]
    pub cache_path: String,
    /// 棋子贴图目录（`wk.png`、`bq.png` …）
    #[serde(default = "StorageConfig::default_sprite_path")]
    pub sprite_path: String,
}

impl StorageConfig {
    fn default_cache_path() -> String {
        "./cache".to_string()
    }
    fn default_sprite_path() -> String {
        "./pieces".to_string()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_path: Self::default_cache_path(),
            sprite_path: Self::default_sprite_path(),
        }
    }
}

/// PNG 输出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// 压缩等级 0-9
    #[serde(default = "OutputConfig::default_compression")]
    pub compression_level: u8,
    /// 调色板位深 1-8
    #[serde(default = "OutputConfig::default_palette_bits")]
    pub palette_bits: u8,
}

impl OutputConfig {
    fn default_compression() -> u8 {
        9
    }
    fn default_palette_bits() -> u8 {
        8
    }

    pub fn encode_options(&self) -> EncodeOptions {
        EncodeOptions {
            compression_level: self.compression_level,
            palette_bits: self.palette_bits,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            compression_level: Self::default_compression(),
            palette_bits: Self::default_palette_bits(),
        }
    }
}

/// 渲染调度配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// 并发渲染许可数（0=自动，取 CPU 核心数）
    #[serde(default)]
    pub max_parallel: u32,
    /// 是否在磁盘缓存前保留进程内热缓存（默认关闭；同键并发渲染始终合并）
    #[serde(default = "RenderConfig::default_memory_cache_enabled")]
    pub memory_cache_enabled: bool,
    /// 热缓存最大容量（字节），按图片字节大小加权
    #[serde(default = "RenderConfig::default_memory_cache_max_bytes")]
    pub memory_cache_max_bytes: u64,
    /// 热缓存 TTL（秒）
    #[serde(default = "RenderConfig::default_memory_cache_ttl")]
    pub memory_cache_ttl_secs: u64,
}

impl RenderConfig {
    fn default_memory_cache_enabled() -> bool {
        false
    }
    fn default_memory_cache_max_bytes() -> u64 {
        32 * 1024 * 1024
    }
    fn default_memory_cache_ttl() -> u64 {
        300
    }

    /// 实际并发许可数
    pub fn parallelism(&self) -> usize {
        if self.max_parallel == 0 {
            num_cpus::get()
        } else {
            self.max_parallel as usize
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_parallel: 0,
            memory_cache_enabled: Self::default_memory_cache_enabled(),
            memory_cache_max_bytes: Self::default_memory_cache_max_bytes(),
            memory_cache_ttl_secs: Self::default_memory_cache_ttl(),
        }
    }
}

/// 优雅退出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// 优雅退出超时时间（秒）
    #[serde(default = "ShutdownConfig::default_timeout")]
    pub timeout_secs: u64,
}

impl ShutdownConfig {
    fn default_timeout() -> u64 {
        30
    }

    pub fn timeout_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout(),
        }
    }
}

/// 应用配置：进程启动时构造一次，之后以 `Arc` 显式传递。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl AppConfig {
    /// 从配置文件加载配置（文件可缺省），支持环境变量覆盖，例如：APP_BOARD_DEFAULT_SIZE
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path();
        tracing::info!("正在从 {:?} 加载配置文件", config_path);
        Self::load_from(config_path)
    }

    /// 从指定路径加载并校验
    pub fn load_from(config_path: PathBuf) -> Result<Self, ConfigError> {
        let builder = ConfigBuilder::builder()
            .add_source(File::from(config_path).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = builder.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 启动期校验，非法配置直接拒绝启动
    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.board;
        if b.min_size == 0 || b.min_size > b.max_size {
            return Err(ConfigError::Message(format!(
                "board.min_size/max_size 不合法: {}..{}",
                b.min_size, b.max_size
            )));
        }
        if b.max_size > MAX_BOARD_SIZE {
            return Err(ConfigError::Message(format!(
                "board.max_size={} 超过上限 {}",
                b.max_size, MAX_BOARD_SIZE
            )));
        }
        if !(b.min_size..=b.max_size).contains(&b.default_size) {
            return Err(ConfigError::Message(format!(
                "board.default_size={} 不在 [{}, {}] 内",
                b.default_size, b.min_size, b.max_size
            )));
        }
        b.palette()?;
        if !(1..=8).contains(&self.output.palette_bits) {
            return Err(ConfigError::Message(format!(
                "output.palette_bits 必须在 1-8 之间: {}",
                self.output.palette_bits
            )));
        }
        if self.output.compression_level > 9 {
            return Err(ConfigError::Message(format!(
                "output.compression_level 必须在 0-9 之间: {}",
                self.output.compression_level
            )));
        }
        Ok(())
    }

    /// 获取配置文件路径
    fn get_config_path() -> PathBuf {
        std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"))
    }

    /// 获取服务器监听地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn cache_path(&self) -> PathBuf {
        PathBuf::from(&self.storage.cache_path)
    }

    pub fn sprite_path(&self) -> PathBuf {
        PathBuf::from(&self.storage.sprite_path)
    }
}
