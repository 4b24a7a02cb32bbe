//! Theme rendering for input-method panels.
//! Used by the main binary (X11) and the preview binary (cross-platform).

pub mod byte_order;
pub mod cache;
pub mod canvas;
pub mod config;
pub mod error;
pub mod geometry;
pub mod mask;
pub mod nine_patch;
pub mod paths;
pub mod surface;
pub mod text_icon;
pub mod theme;
