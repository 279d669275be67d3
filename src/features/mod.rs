/// 棋盘渲染与缓存
pub mod board;
/// 健康检查
pub mod health;
