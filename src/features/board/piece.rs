/// 棋子颜色（大写字母为白方/浅色，小写为黑方/深色）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Light,
    Dark,
}

/// 棋子种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    King,
    Queen,
    Rook,
    Knight,
    Bishop,
    Pawn,
}

impl Kind {
    /// FEN 中使用的小写字母
    pub fn letter(self) -> char {
        match self {
            Kind::King => 'k',
            Kind::Queen => 'q',
            Kind::Rook => 'r',
            Kind::Knight => 'n',
            Kind::Bishop => 'b',
            Kind::Pawn => 'p',
        }
    }

    fn from_letter(lower: char) -> Option<Self> {
        Some(match lower {
            'k' => Kind::King,
            'q' => Kind::Queen,
            'r' => Kind::Rook,
            'n' => Kind::Knight,
            'b' => Kind::Bishop,
            'p' => Kind::Pawn,
            _ => return None,
        })
    }
}

/// 不可变的棋子值（颜色 + 种类）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub color: Color,
    pub kind: Kind,
}

impl Piece {
    pub const fn new(color: Color, kind: Kind) -> Self {
        Self { color, kind }
    }

    /// 识别 `kqrnbpKQRNBP` 中的字符，其余字符返回 `None`。
    pub fn from_fen_char(c: char) -> Option<Self> {
        if !c.is_ascii() {
            return None;
        }
        let kind = Kind::from_letter(c.to_ascii_lowercase())?;
        let color = if c.is_ascii_uppercase() {
            Color::Light
        } else {
            Color::Dark
        };
        Some(Self { color, kind })
    }

    pub fn fen_char(self) -> char {
        match self.color {
            Color::Light => self.kind.letter().to_ascii_uppercase(),
            Color::Dark => self.kind.letter(),
        }
    }

    /// 贴图文件名主干，例如白后为 `wq`、黑马为 `bn`。
    pub fn sprite_stem(self) -> String {
        let side = match self.color {
            Color::Light => 'w',
            Color::Dark => 'b',
        };
        format!("{side}{}", self.kind.letter())
    }

    /// 全部 12 种棋子，用于启动期检查贴图目录。
    pub fn all() -> impl Iterator<Item = Piece> {
        const KINDS: [Kind; 6] = [
            Kind::King,
            Kind::Queen,
            Kind::Rook,
            Kind::Knight,
            Kind::Bishop,
            Kind::Pawn,
        ];
        [Color::Light, Color::Dark]
            .into_iter()
            .flat_map(|color| KINDS.into_iter().map(move |kind| Piece::new(color, kind)))
    }
}
