use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use image::{Rgba, RgbaImage};
use tower::ServiceExt;
use uuid::Uuid;

use fen_board::{AppConfig, build_app, state::AppState};

const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR%20w%20KQkq%20-%200%201";
const LIGHT: [u8; 4] = [0xf0, 0xde, 0xc7, 0xff];
const DARK: [u8; 4] = [0xb5, 0x87, 0x6b, 0xff];
const WHITE_KING: [u8; 4] = [10, 200, 10, 0xff];

struct TestEnv {
    root: PathBuf,
}

impl TestEnv {
    fn new() -> Self {
        let root = std::env::temp_dir().join(format!("fen-board-it-{}", Uuid::new_v4()));
        std::fs::create_dir_all(root.join("cache")).expect("create cache dir");
        std::fs::create_dir_all(root.join("pieces")).expect("create pieces dir");
        RgbaImage::from_pixel(32, 32, Rgba(WHITE_KING))
            .save(root.join("pieces/wk.png"))
            .expect("write sprite");
        Self { root }
    }

    fn config(&self, memory_cache: bool) -> AppConfig {
        let mut config = AppConfig::default();
        config.storage.cache_path = self.root.join("cache").to_string_lossy().into_owned();
        config.storage.sprite_path = self.root.join("pieces").to_string_lossy().into_owned();
        config.render.memory_cache_enabled = memory_cache;
        config.render.max_parallel = 2;
        config
    }

    fn app(&self, memory_cache: bool) -> Router {
        let state = AppState::new(Arc::new(self.config(memory_cache))).expect("state");
        build_app(state)
    }

    fn cached_files(&self) -> Vec<String> {
        std::fs::read_dir(self.root.join("cache"))
            .expect("read cache dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
            .collect()
    }
}

impl Drop for TestEnv {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

async fn get(app: &Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.clone().oneshot(req).await.expect("call app");
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
    (status, headers, body.to_vec())
}

fn decode(bytes: &[u8]) -> RgbaImage {
    image::load_from_memory(bytes).expect("decode png").into_rgba8()
}

#[tokio::test]
async fn empty_board_is_plain_checkerboard() {
    let env = TestEnv::new();
    let app = env.app(false);

    let (status, headers, body) = get(&app, "/api/v1/board?fen=8/8/8/8/8/8/8/8&size=200").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "image/png");
    assert_eq!(headers.get("x-cache").unwrap(), "MISS");

    let img = decode(&body);
    assert_eq!(img.dimensions(), (200, 200));
    for row in 0..8u32 {
        for col in 0..8u32 {
            let expected = if (row + col) % 2 == 1 { DARK } else { LIGHT };
            // 每格 25px，取格子中心
            assert_eq!(img.get_pixel(col * 25 + 12, row * 25 + 12).0, expected);
        }
    }
}

#[tokio::test]
async fn second_request_hits_cache_with_identical_bytes() {
    let env = TestEnv::new();
    let app = env.app(false);
    let uri = format!("/api/v1/board?fen={START}&size=240");

    let (s1, h1, first) = get(&app, &uri).await;
    let (s2, h2, second) = get(&app, &uri).await;
    assert_eq!((s1, s2), (StatusCode::OK, StatusCode::OK));
    assert_eq!(h1.get("x-cache").unwrap(), "MISS");
    assert_eq!(h2.get("x-cache").unwrap(), "HIT");
    assert_eq!(first, second);

    let files = env.cached_files();
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with(".png"));
    assert_eq!(files[0].len(), 32 + 4);
}

#[tokio::test]
async fn reversed_moves_light_pieces_to_top() {
    let env = TestEnv::new();
    let app = env.app(true);

    let (_, _, upright) = get(&app, &format!("/api/v1/board?fen={START}&size=200")).await;
    let (_, _, flipped) =
        get(&app, &format!("/api/v1/board?fen={START}&size=200&reversed=true")).await;
    let upright = decode(&upright);
    let flipped = decode(&flipped);

    // 白王：正常视角在第 8 行第 5 列，翻转后在第 1 行第 4 列
    assert_eq!(upright.get_pixel(4 * 25 + 12, 7 * 25 + 12).0, WHITE_KING);
    assert_eq!(flipped.get_pixel(3 * 25 + 12, 12).0, WHITE_KING);
    assert_ne!(flipped.get_pixel(4 * 25 + 12, 7 * 25 + 12).0, WHITE_KING);

    // 空格子底色不随翻转变化
    assert_eq!(upright.get_pixel(12, 4 * 25 + 12).0, LIGHT);
    assert_eq!(flipped.get_pixel(12, 4 * 25 + 12).0, LIGHT);
}

#[tokio::test]
async fn invalid_size_falls_back_to_default() {
    let env = TestEnv::new();
    let app = env.app(false);

    for size in ["5", "5000", "abc"] {
        let (status, _, body) = get(&app, &format!("/api/v1/board?fen=K7&size={size}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(decode(&body).dimensions(), (200, 200), "size={size}");
    }
}

#[tokio::test]
async fn malformed_fen_still_renders() {
    let env = TestEnv::new();
    let app = env.app(false);

    let (status, headers, body) = get(&app, "/api/v1/board?fen=%3F%3F%3F/xyz/999999999").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "image/png");
    assert_eq!(decode(&body).get_pixel(0, 0).0, LIGHT);
}

#[tokio::test]
async fn root_path_and_download_header() {
    let env = TestEnv::new();
    let app = env.app(false);

    let (status, headers, _) = get(&app, "/?fen=K7&size=100&download=1").await;
    assert_eq!(status, StatusCode::OK);
    let disposition = headers
        .get(header::CONTENT_DISPOSITION)
        .expect("missing content-disposition")
        .to_str()
        .unwrap();
    assert!(disposition.starts_with("attachment; filename=\""));
    assert!(disposition.ends_with(".png\""));
}

#[tokio::test]
async fn unwritable_cache_serves_uncached_render() {
    let env = TestEnv::new();
    let mut config = env.config(false);
    config.storage.cache_path = env.root.join("missing").to_string_lossy().into_owned();
    let app = build_app(AppState::new(Arc::new(config)).expect("state"));

    let (s1, h1, first) = get(&app, "/api/v1/board?fen=K7").await;
    let (s2, h2, second) = get(&app, "/api/v1/board?fen=K7").await;
    assert_eq!((s1, s2), (StatusCode::OK, StatusCode::OK));
    assert_eq!(h1.get("x-cache").unwrap(), "MISS");
    assert_eq!(h2.get("x-cache").unwrap(), "MISS");
    assert_eq!(first, second);
}

#[tokio::test]
async fn health_and_request_id() {
    let env = TestEnv::new();
    let app = env.app(false);

    let req = Request::builder()
        .uri("/health")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .expect("build request");
    let resp = app.oneshot(req).await.expect("call app");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("x-request-id").unwrap(), "abc-123");

    let body = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
    let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "fen-board");
}

#[tokio::test]
async fn sizes_below_grid_are_served_not_rejected() {
    let env = TestEnv::new();
    let mut config = env.config(false);
    config.board.min_size = 1;
    let app = build_app(AppState::new(Arc::new(config)).expect("state"));

    let (status, headers, body) = get(&app, "/api/v1/board?fen=K7&size=4").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "image/png");
    assert_eq!(decode(&body).dimensions(), (4, 4));
}

#[tokio::test]
async fn purged_cache_dir_is_rendered_again() {
    let env = TestEnv::new();
    let mut config = AppConfig::default();
    config.storage.cache_path = env.root.join("cache").to_string_lossy().into_owned();
    config.storage.sprite_path = env.root.join("pieces").to_string_lossy().into_owned();
    let app = build_app(AppState::new(Arc::new(config)).expect("state"));
    let uri = "/api/v1/board?fen=K7&size=160";

    let (_, h1, first) = get(&app, uri).await;
    assert_eq!(h1.get("x-cache").unwrap(), "MISS");

    std::fs::remove_dir_all(env.root.join("cache")).expect("purge cache");
    std::fs::create_dir_all(env.root.join("cache")).expect("recreate cache");

    let (_, h2, second) = get(&app, uri).await;
    assert_eq!(h2.get("x-cache").unwrap(), "MISS");
    assert_eq!(first, second);
    assert_eq!(env.cached_files().len(), 1);
}
