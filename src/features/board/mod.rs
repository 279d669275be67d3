pub mod cache;
pub mod canvas;
pub mod encode;
pub mod fen;
pub mod fingerprint;
pub mod handler;
pub mod piece;
pub mod pipeline;
pub mod sprites;
pub mod types;

pub use cache::{ArtifactCache, CachedArtifact, PersistOutcome};
pub use fen::{Board, parse_placement};
pub use fingerprint::{CacheKey, fingerprint};
pub use handler::{create_board_router, render_board};
pub use piece::{Color, Kind, Piece};
pub use pipeline::{ArtifactSource, RenderOutcome, RenderPipeline, RenderSettings, render_png};
pub use types::{BoardQuery, RenderRequest};
