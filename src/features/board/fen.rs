use super::piece::Piece;

/// 棋盘边长（格）
pub const BOARD_DIM: usize = 8;
/// 棋盘格数
pub const SQUARES: usize = BOARD_DIM * BOARD_DIM;

/// 8×8 棋盘，按 `row * 8 + col` 线性排列；无论输入如何都恰有 64 格。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    squares: [Option<Piece>; SQUARES],
}

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}

impl Board {
    pub const fn empty() -> Self {
        Self {
            squares: [None; SQUARES],
        }
    }

    pub fn get(&self, row: usize, col: usize) -> Option<Piece> {
        self.squares.get(row * BOARD_DIM + col).copied().flatten()
    }

    /// 按线性下标遍历全部 64 格
    pub fn slots(&self) -> &[Option<Piece>; SQUARES] {
        &self.squares
    }

    /// 已放置的棋子及其线性下标
    pub fn pieces(&self) -> impl Iterator<Item = (usize, Piece)> + '_ {
        self.squares
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.map(|p| (i, p)))
    }

    pub fn piece_count(&self) -> usize {
        self.pieces().count()
    }
}

/// 宽松的 FEN 摆放字段解析：从不失败，畸形输入退化为尽力而为（可能为空）的棋盘。
///
/// 只读取第一个空格之前的字段。行列越界由这里的 `row`/`col` 检查兜底：
/// - 遇到 `/` 或当前列已超过 7 时换行；触发换行的字符本身不再参与放置
/// - 数字 `1`-`8` 直接推进列，不做截断，溢出由下一个字符触发的换行处理
/// - 超过第 8 行后停止扫描
pub fn parse_placement(fen: &str) -> Board {
    let placement = fen.split(' ').next().unwrap_or_default();
    let mut board = Board::empty();
    let mut row = 0usize;
    let mut col = 0usize;

    for c in placement.chars() {
        if row >= BOARD_DIM {
            break;
        }
        if c == '/' || col >= BOARD_DIM {
            row += 1;
            col = 0;
        } else if let Some(d) = c.to_digit(10).filter(|d| (1..=8).contains(d)) {
            col += d as usize;
        } else if let Some(piece) = Piece::from_fen_char(c) {
            board.squares[row * BOARD_DIM + col] = Some(piece);
            col += 1;
        }
    }

    board
}
