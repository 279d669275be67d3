use std::fs;
use std::path::Path;

use crate::config::AppConfig;
use crate::features::board::Piece;
use crate::features::board::sprites::sprite_path;

/// 启动检查报告
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StartupReport {
    /// 缓存目录是否可用
    pub cache_ready: bool,
    /// 缺失的贴图文件名（如 `wq.png`）
    pub missing_sprites: Vec<String>,
}

/// 执行启动检查
///
/// 1. 检查并创建缓存目录（失败只告警：服务仍可运行，只是不落盘）
/// 2. 检查 12 个棋子贴图是否齐全（缺失只告警，对应棋子渲染时跳过）
pub fn run_startup_checks(config: &AppConfig) -> StartupReport {
    tracing::info!("开始执行启动检查...");

    let report = StartupReport {
        cache_ready: ensure_cache_dir(&config.cache_path()),
        missing_sprites: missing_sprites(&config.sprite_path()),
    };

    if report.missing_sprites.is_empty() {
        tracing::info!("棋子贴图齐全: {:?}", config.sprite_path());
    } else {
        tracing::warn!(
            "棋子贴图缺失 {:?}: {}",
            config.sprite_path(),
            report.missing_sprites.join(", ")
        );
    }

    tracing::info!("启动检查完成");
    report
}

fn ensure_cache_dir(path: &Path) -> bool {
    if path.is_dir() {
        tracing::info!("缓存目录已存在: {:?}", path);
        return true;
    }
    tracing::warn!("未找到缓存目录，正在创建: {:?}", path);
    match fs::create_dir_all(path) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("创建缓存目录失败 {:?}: {}（渲染结果将不落盘）", path, e);
            false
        }
    }
}

fn missing_sprites(root: &Path) -> Vec<String> {
    Piece::all()
        .map(|p| sprite_path(root, p))
        .filter(|p| !p.is_file())
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_cache_dir_and_lists_missing_sprites() {
        let root = std::env::temp_dir().join(format!("fen-board-startup-{}", uuid::Uuid::new_v4()));
        let pieces = root.join("pieces");
        fs::create_dir_all(&pieces).unwrap();
        fs::write(pieces.join("wk.png"), b"").unwrap();

        let mut config = AppConfig::default();
        config.storage.cache_path = root.join("cache/nested").to_string_lossy().into_owned();
        config.storage.sprite_path = pieces.to_string_lossy().into_owned();

        let report = run_startup_checks(&config);
        assert!(report.cache_ready);
        assert!(root.join("cache/nested").is_dir());
        assert_eq!(report.missing_sprites.len(), 11);
        assert!(!report.missing_sprites.contains(&"wk.png".to_string()));
        assert!(report.missing_sprites.contains(&"bn.png".to_string()));

        let _ = fs::remove_dir_all(&root);
    }
}
