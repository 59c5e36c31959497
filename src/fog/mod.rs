//! Fog of war: which squares a side may observe, and the board it is shown.

pub mod visibility;

pub use visibility::{filter_board, visible_squares, VisibleSet};
