use image::{Rgba, RgbaImage};
use thiserror::Error;

use super::fen::BOARD_DIM;

/// 画布创建失败（唯一会中止请求的渲染错误）
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CanvasError {
    #[error("board size must be positive")]
    Empty,
    #[error("board size {0} exceeds the addressable pixel buffer")]
    TooLarge(u32),
}

/// 方格颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    /// 解析 `#rrggbb` 或 `#rgb`（单位数通道按重复补齐，`#abc` 等价于 `#aabbcc`）。
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim_start_matches('#');
        if !digits.is_ascii() {
            return None;
        }
        let group = if hex.len() > 4 { 2 } else { 1 };
        if digits.len() != 3 * group {
            return None;
        }
        let mut out = [0u8; 3];
        for (slot, chunk) in out.iter_mut().zip(digits.as_bytes().chunks(group)) {
            let text = std::str::from_utf8(chunk).ok()?.repeat(3 - group);
            *slot = u8::from_str_radix(&text, 16).ok()?;
        }
        Some(Self(out))
    }

    fn opaque(self) -> Rgba<u8> {
        let [r, g, b] = self.0;
        Rgba([r, g, b, 0xFF])
    }
}

/// 棋盘配色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub dark: Rgb,
    pub light: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            dark: Rgb([0xb5, 0x87, 0x6b]),
            light: Rgb([0xf0, 0xde, 0xc7]),
        }
    }
}

/// 单次渲染持有的正方形画布，随作用域结束释放。
#[derive(Debug, Clone)]
pub struct Canvas {
    pixels: RgbaImage,
}

impl Canvas {
    /// 创建 `size × size` 的全黑不透明画布。
    ///
    /// 小于 8 的尺寸仍然合法，此时每格边长为 0，画布保持全黑。
    pub fn new(size: u32) -> Result<Self, CanvasError> {
        if size == 0 {
            return Err(CanvasError::Empty);
        }
        let len = (size as usize)
            .checked_mul(size as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or(CanvasError::TooLarge(size))?;
        let buf = vec![0u8; len];
        let mut pixels = RgbaImage::from_raw(size, size, buf).ok_or(CanvasError::TooLarge(size))?;
        for px in pixels.pixels_mut() {
            px.0[3] = 0xFF;
        }
        Ok(Self { pixels })
    }

    pub fn size(&self) -> u32 {
        self.pixels.width()
    }

    /// 每格边长（整数截断；不能整除时右/下边缘留出不足 8 像素的空白条）
    pub fn square_size(&self) -> u32 {
        self.size() / BOARD_DIM as u32
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }

    fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: Rgba<u8>) {
        for py in y..y + h {
            for px in x..x + w {
                self.pixels.put_pixel(px, py, color);
            }
        }
    }
}

/// 绘制 8×8 交替方格；`(row + col)` 为奇数时取深色。
pub fn draw_board(canvas: &mut Canvas, palette: &Palette) {
    let sq = canvas.square_size();
    for row in 0..BOARD_DIM as u32 {
        for col in 0..BOARD_DIM as u32 {
            let color = if (row + col) % 2 == 1 {
                palette.dark
            } else {
                palette.light
            };
            canvas.fill_rect(col * sq, row * sq, sq, sq, color.opaque());
        }
    }
}
