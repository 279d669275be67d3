//! 渲染编排：指纹 → 查缓存 →（未命中）解析 → 画格 → 贴子 → 编码 → 尽力持久化 → 响应。
//!
//! 每个请求独立执行；跨请求共享的只有磁盘缓存目录与同键在途渲染的合并表。
//! 进程内热缓存需显式开启，开启后产物会在内存中保留到 TTL 到期。

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use axum::body::Bytes;
use moka::future::Cache;
use tokio::sync::Semaphore;
use tokio::task::spawn_blocking;

use super::cache::{ArtifactCache, CachedArtifact, PersistOutcome};
use super::canvas::{Canvas, Palette, draw_board};
use super::encode::{EncodeOptions, encode_png};
use super::fen::parse_placement;
use super::fingerprint::{CacheKey, fingerprint};
use super::sprites::{SpriteSet, place_pieces};
use super::types::RenderRequest;
use crate::config::AppConfig;
use crate::error::AppError;

/// 不保留产物时合并表的条目上限（只容纳在途的键）
const MAX_IN_FLIGHT: u64 = 1024;

/// 单次渲染所需的不可变参数
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub palette: Palette,
    pub encode: EncodeOptions,
    pub sprite_root: PathBuf,
}

impl RenderSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        Ok(Self {
            palette: config.board.palette()?,
            encode: config.output.encode_options(),
            sprite_root: config.sprite_path(),
        })
    }
}

/// 产物来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactSource {
    /// 进程内热缓存，或合并到其他请求的同键在途渲染
    Memory,
    /// 磁盘缓存
    Disk,
    /// 本次新渲染
    Rendered,
}

impl ArtifactSource {
    pub fn is_hit(self) -> bool {
        !matches!(self, ArtifactSource::Rendered)
    }
}

/// 编排结果
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub key: CacheKey,
    pub artifact: CachedArtifact,
    pub source: ArtifactSource,
}

/// 同步渲染：解析 → 画格 → 贴子 → 编码。
///
/// 画布与贴图都是本函数内的局部值，任何提前返回都会随作用域释放。
pub fn render_png(req: &RenderRequest, settings: &RenderSettings) -> Result<Vec<u8>, AppError> {
    let board = parse_placement(&req.fen);
    let mut canvas = Canvas::new(req.size)?;
    draw_board(&mut canvas, &settings.palette);

    let sprites = SpriteSet::load_for(&board, &settings.sprite_root);
    place_pieces(&mut canvas, &board, req.reversed, &sprites);

    Ok(encode_png(canvas.pixels(), &settings.encode)?)
}

/// 渲染流水线
#[derive(Debug, Clone)]
pub struct RenderPipeline {
    settings: Arc<RenderSettings>,
    cache: ArtifactCache,
    /// 同键合并表；`retain` 为假时结果交付后立即移除
    flights: Cache<String, CachedArtifact>,
    retain: bool,
    permits: Arc<Semaphore>,
}

impl RenderPipeline {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let hot = config.render.memory_cache_enabled.then(|| {
            Cache::builder()
                .weigher(|_k, v: &CachedArtifact| v.bytes.len().try_into().unwrap_or(u32::MAX))
                .max_capacity(config.render.memory_cache_max_bytes)
                .time_to_live(Duration::from_secs(config.render.memory_cache_ttl_secs))
                .build()
        });
        Ok(Self::from_parts(
            RenderSettings::from_config(config)?,
            ArtifactCache::new(config.cache_path()),
            hot,
            config.render.parallelism(),
        ))
    }

    /// `hot` 为 `None` 时只合并在途渲染，不在内存中保留产物
    pub fn from_parts(
        settings: RenderSettings,
        cache: ArtifactCache,
        hot: Option<Cache<String, CachedArtifact>>,
        max_parallel: usize,
    ) -> Self {
        let retain = hot.is_some();
        let flights = hot.unwrap_or_else(|| Cache::builder().max_capacity(MAX_IN_FLIGHT).build());
        Self {
            settings: Arc::new(settings),
            cache,
            flights,
            retain,
            permits: Arc::new(Semaphore::new(max_parallel.max(1))),
        }
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// 处理一次请求；只有画布不可用等致命错误会返回 `Err`。
    pub async fn render(&self, req: &RenderRequest) -> Result<RenderOutcome, AppError> {
        let key = fingerprint(&req.fen, req.size, req.reversed);

        if self.retain {
            if let Some(artifact) = self.flights.get(key.as_str()).await {
                tracing::debug!("热缓存命中: {}", key);
                return Ok(RenderOutcome {
                    key,
                    artifact,
                    source: ArtifactSource::Memory,
                });
            }
        }

        // 同键并发请求只有一个执行 init，其余等待同一结果
        let source = OnceLock::new();
        let result = self
            .flights
            .try_get_with(key.as_str().to_string(), async {
                let (artifact, src) = self.lookup_or_render(&key, req).await?;
                let _ = source.set(src);
                Ok::<_, AppError>(artifact)
            })
            .await;
        if !self.retain {
            self.flights.invalidate(key.as_str()).await;
        }
        let artifact = result.map_err(|e| unshare(&e))?;

        Ok(RenderOutcome {
            key,
            artifact,
            source: source.get().copied().unwrap_or(ArtifactSource::Memory),
        })
    }

    async fn lookup_or_render(
        &self,
        key: &CacheKey,
        req: &RenderRequest,
    ) -> Result<(CachedArtifact, ArtifactSource), AppError> {
        if let Some(bytes) = self.cache.get(key).await {
            tracing::debug!("磁盘缓存命中: {}", key);
            let artifact = CachedArtifact {
                bytes,
                location: Some(self.cache.location(key)),
            };
            return Ok((artifact, ArtifactSource::Disk));
        }
        tracing::debug!("缓存未命中: {}", key);

        let t0 = Instant::now();
        let bytes = Bytes::from(self.render_blocking(req.clone()).await?);
        let render_ms = t0.elapsed().as_millis();

        let location = match self.cache.put(key, &bytes).await {
            PersistOutcome::Stored(path) => Some(path),
            PersistOutcome::Failed => None,
        };

        tracing::info!(
            target: "board_render",
            key = %key,
            size = req.size,
            reversed = req.reversed,
            bytes = bytes.len(),
            persisted = location.is_some(),
            "棋盘渲染完成，耗时 {render_ms}ms"
        );

        Ok((CachedArtifact { bytes, location }, ArtifactSource::Rendered))
    }

    /// 在阻塞线程池中执行 CPU 密集的渲染，信号量限制并发数
    async fn render_blocking(&self, req: RenderRequest) -> Result<Vec<u8>, AppError> {
        let _permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| AppError::Internal(format!("渲染许可获取失败: {e}")))?;
        let settings = Arc::clone(&self.settings);

        spawn_blocking(move || render_png(&req, &settings))
            .await
            .map_err(|e| AppError::Internal(format!("阻塞渲染任务执行失败: {e}")))?
    }
}

/// moka 以 `Arc` 共享 init 错误，这里还原出独立的 `AppError`
fn unshare(err: &AppError) -> AppError {
    match err {
        AppError::RenderUnavailable(m) => AppError::RenderUnavailable(m.clone()),
        AppError::Config(m) => AppError::Config(m.clone()),
        AppError::Internal(m) => AppError::Internal(m.clone()),
    }
}
