//! Frame tiling, per-block change detection, and motion search.

pub mod decision;
pub mod grid;
pub mod motion;
pub mod rowstate;

pub use grid::{BlockGrid, BlockPos, Rect};
pub use motion::MotionParams;
