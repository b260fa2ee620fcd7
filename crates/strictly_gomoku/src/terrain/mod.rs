//! Terrain variant: hidden tiles and chain scoring.

mod scorer;
mod tiles;

pub use scorer::{Chain, Intersection, TerrainScore, compare, score};
pub use tiles::{
    MysteryEffect, StealFallback, TerrainEvent, TileContext, TileWeights, generate,
    is_hidden_block, reveal_block, trigger,
};
