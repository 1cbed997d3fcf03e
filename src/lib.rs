#[cfg(feature = "cli")]
pub mod cli;
pub mod cloud;
pub mod config;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod layout_dump;
pub mod raster;
pub mod rasterizer;
pub mod render;
pub mod scheduler;
pub mod surface;
#[cfg(feature = "font")]
pub mod text_metrics;

#[cfg(feature = "cli")]
pub use cli::run;
pub use cloud::{LabelEvent, LabelSource, WordCloud};
pub use config::Config;
pub use error::{Error, Result};
pub use geometry::Coordinate;
pub use layout::{LayoutReport, Placement, PlacementEngine, PlacementKind};
pub use raster::{BoundingBox, Raster};
pub use rasterizer::{BlockRasterizer, TextRasterizer};
#[cfg(feature = "font")]
pub use render::FontRasterizer;
