//! 画布 → 索引色 PNG。
//!
//! 先把颜色收敛到不超过 `2^palette_bits` 个（能精确容纳就不做任何损失），
//! 再以 PNG color type 3 写出。

use std::collections::HashMap;

use image::RgbaImage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("PNG 编码失败: {0}")]
    Png(#[from] png::EncodingError),
}

/// 输出编码参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// zlib 压缩等级 0-9
    pub compression_level: u8,
    /// 调色板位深 1-8（调色板最多 `2^bits` 色）
    pub palette_bits: u8,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            compression_level: 9,
            palette_bits: 8,
        }
    }
}

impl EncodeOptions {
    fn max_colors(&self) -> usize {
        1usize << self.palette_bits.clamp(1, 8)
    }

    fn compression(&self) -> png::Compression {
        match self.compression_level {
            0..=3 => png::Compression::Fast,
            4..=6 => png::Compression::Default,
            _ => png::Compression::Best,
        }
    }
}

/// 已索引化的图像数据
#[derive(Debug, PartialEq, Eq)]
pub struct Indexed {
    /// RGB 三元组平铺
    pub palette: Vec<u8>,
    pub indices: Vec<u8>,
}

impl Indexed {
    pub fn color_count(&self) -> usize {
        self.palette.len() / 3
    }
}

#[inline]
fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    (r as u32) | ((g as u32) << 8) | ((b as u32) << 16)
}

/// 丢弃低 `shift` 位后重新拉伸回 0-255，保持 0x00/0xFF 两端不变
#[inline]
fn reduce_channel(c: u8, shift: u32) -> u8 {
    if shift == 0 {
        return c;
    }
    if shift >= 8 {
        return 0;
    }
    let levels = (1u32 << (8 - shift)) - 1;
    ((c as u32 >> shift) * 255 / levels) as u8
}

fn try_extract(img: &RgbaImage, max_colors: usize, shift: u32) -> Option<Indexed> {
    let mut lookup: HashMap<u32, u8> = HashMap::with_capacity(max_colors);
    let mut palette = Vec::with_capacity(max_colors * 3);
    let mut indices = Vec::with_capacity(img.width() as usize * img.height() as usize);

    for px in img.pixels() {
        let [r, g, b, _] = px.0;
        let (r, g, b) = (
            reduce_channel(r, shift),
            reduce_channel(g, shift),
            reduce_channel(b, shift),
        );
        let packed = pack_rgb(r, g, b);
        let idx = match lookup.get(&packed) {
            Some(&idx) => idx,
            None => {
                if lookup.len() >= max_colors {
                    return None;
                }
                let idx = lookup.len() as u8;
                palette.extend_from_slice(&[r, g, b]);
                lookup.insert(packed, idx);
                idx
            }
        };
        indices.push(idx);
    }

    Some(Indexed { palette, indices })
}

/// 收敛为调色板：逐位降低通道精度直到颜色数不超过上限。
///
/// 画布在合成后总是不透明的，alpha 通道在这里被丢弃。
pub fn reduce_to_palette(img: &RgbaImage, palette_bits: u8) -> Indexed {
    let max_colors = 1usize << palette_bits.clamp(1, 8);
    (0..=8)
        .find_map(|shift| try_extract(img, max_colors, shift))
        .unwrap_or_else(|| Indexed {
            palette: vec![0, 0, 0],
            indices: vec![0; img.width() as usize * img.height() as usize],
        })
}

/// 编码为索引色 PNG
pub fn encode_png(img: &RgbaImage, opts: &EncodeOptions) -> Result<Vec<u8>, EncodeError> {
    let indexed = reduce_to_palette(img, opts.palette_bits);
    debug_assert!(indexed.color_count() <= opts.max_colors());

    let mut out = Vec::with_capacity(indexed.indices.len() / 4);
    {
        let mut encoder = png::Encoder::new(&mut out, img.width(), img.height());
        encoder.set_color(png::ColorType::Indexed);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_palette(indexed.palette);
        encoder.set_compression(opts.compression());
        encoder.set_filter(png::FilterType::NoFilter);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&indexed.indices)?;
        writer.finish()?;
    }
    Ok(out)
}
