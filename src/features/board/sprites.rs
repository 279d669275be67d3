use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use image::imageops::{self, FilterType};

use super::canvas::Canvas;
use super::fen::{BOARD_DIM, Board};
use super::piece::Piece;

/// 贴图文件扩展名
const SPRITE_EXTENSION: &str = "png";

/// 棋子贴图目录中某个棋子对应的文件路径，例如 `<root>/wq.png`。
pub fn sprite_path(root: &Path, piece: Piece) -> PathBuf {
    root.join(format!("{}.{SPRITE_EXTENSION}", piece.sprite_stem()))
}

/// 本次渲染用到的贴图集合：只加载棋盘上实际出现的棋子（去重），随渲染结束释放。
#[derive(Debug, Default)]
pub struct SpriteSet {
    sprites: HashMap<Piece, RgbaImage>,
}

impl SpriteSet {
    /// 按需加载；单个贴图缺失或解码失败只记录日志并跳过。
    pub fn load_for(board: &Board, root: &Path) -> Self {
        let mut sprites = HashMap::new();
        for (_, piece) in board.pieces() {
            if sprites.contains_key(&piece) {
                continue;
            }
            let path = sprite_path(root, piece);
            match image::open(&path) {
                Ok(img) => {
                    sprites.insert(piece, img.into_rgba8());
                }
                Err(e) => {
                    tracing::warn!("贴图加载失败 {:?}: {}（该棋子将不绘制）", path, e);
                }
            }
        }
        Self { sprites }
    }

    pub fn from_images(images: impl IntoIterator<Item = (Piece, RgbaImage)>) -> Self {
        Self {
            sprites: images.into_iter().collect(),
        }
    }

    pub fn get(&self, piece: Piece) -> Option<&RgbaImage> {
        self.sprites.get(&piece)
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}

/// 线性下标到画面上的 `(col, row)`；翻转时映射为 `(7 - col, 7 - row)`。
pub fn square_for_index(i: usize, reversed: bool) -> (usize, usize) {
    let col = i % BOARD_DIM;
    let row = (i - col) / BOARD_DIM;
    if reversed {
        (BOARD_DIM - 1 - col, BOARD_DIM - 1 - row)
    } else {
        (col, row)
    }
}

/// 将贴图缩放到格子边长并叠加到对应格子的左上角；缺贴图的棋子静默跳过。
pub fn place_pieces(canvas: &mut Canvas, board: &Board, reversed: bool, sprites: &SpriteSet) {
    let sq = canvas.square_size();
    if sq == 0 {
        return;
    }
    // 同一棋子的缩放结果在本次渲染中复用
    let mut scaled: HashMap<Piece, RgbaImage> = HashMap::new();

    for (i, piece) in board.pieces() {
        let Some(sprite) = sprites.get(piece) else {
            continue;
        };
        let tile = scaled
            .entry(piece)
            .or_insert_with(|| imageops::resize(sprite, sq, sq, FilterType::Triangle));

        let (col, row) = square_for_index(i, reversed);
        let x = col as i64 * sq as i64;
        let y = row as i64 * sq as i64;
        imageops::overlay(canvas.pixels_mut(), tile, x, y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::board::canvas::{Palette, draw_board};
    use crate::features::board::fen::parse_placement;
    use crate::features::board::piece::{Color, Kind};
    use image::Rgba;

    fn solid(color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(16, 16, Rgba(color))
    }

    #[test]
    fn reversed_mirrors_both_axes() {
        assert_eq!(square_for_index(0, false), (0, 0));
        assert_eq!(square_for_index(0, true), (7, 7));
        assert_eq!(square_for_index(63, true), (0, 0));
        assert_eq!(square_for_index(9, false), (1, 1));
        assert_eq!(square_for_index(10, true), (5, 6));
    }

    #[test]
    fn places_scaled_sprite_at_square_origin() {
        let board = parse_placement("K7");
        let king = Piece::new(Color::Light, Kind::King);
        let sprites = SpriteSet::from_images([(king, solid([255, 0, 0, 255]))]);

        let mut canvas = Canvas::new(200).unwrap();
        draw_board(&mut canvas, &Palette::default());
        place_pieces(&mut canvas, &board, false, &sprites);

        assert_eq!(canvas.pixels().get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(canvas.pixels().get_pixel(24, 24).0, [255, 0, 0, 255]);
        assert_ne!(canvas.pixels().get_pixel(25, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn reversed_moves_sprite_to_opposite_corner() {
        let board = parse_placement("K7");
        let king = Piece::new(Color::Light, Kind::King);
        let sprites = SpriteSet::from_images([(king, solid([255, 0, 0, 255]))]);

        let mut canvas = Canvas::new(200).unwrap();
        draw_board(&mut canvas, &Palette::default());
        place_pieces(&mut canvas, &board, true, &sprites);

        assert_eq!(canvas.pixels().get_pixel(175, 175).0, [255, 0, 0, 255]);
        let [r, g, b] = Palette::default().light.0;
        assert_eq!(canvas.pixels().get_pixel(0, 0).0, [r, g, b, 255]);
    }

    #[test]
    fn missing_sprite_is_skipped() {
        let board = parse_placement("kK6");
        let sprites = SpriteSet::from_images([(
            Piece::new(Color::Light, Kind::King),
            solid([0, 0, 255, 255]),
        )]);

        let mut canvas = Canvas::new(80).unwrap();
        draw_board(&mut canvas, &Palette::default());
        let before = canvas.pixels().get_pixel(0, 0).0;
        place_pieces(&mut canvas, &board, false, &sprites);

        assert_eq!(canvas.pixels().get_pixel(0, 0).0, before);
        assert_eq!(canvas.pixels().get_pixel(10, 0).0, [0, 0, 255, 255]);
    }

    #[test]
    fn load_for_skips_unreadable_files() {
        let root = std::env::temp_dir().join(format!("fen-board-sprites-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&root).unwrap();
        solid([1, 2, 3, 255]).save(root.join("wk.png")).unwrap();

        let board = parse_placement("KKkq");
        let set = SpriteSet::load_for(&board, &root);
        assert_eq!(set.len(), 1);
        assert!(set.get(Piece::new(Color::Light, Kind::King)).is_some());

        let _ = std::fs::remove_dir_all(&root);
    }
}
