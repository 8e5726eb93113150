// src/view/mod.rs
//! View-side computations: viewport state, culling, level of detail and the
//! marker overlay transform

pub mod culling;
pub mod lod;
pub mod overlay;
pub mod viewport;

pub use culling::{compute_render_area, plan_update, RenderArea, RenderUpdate};
pub use lod::{update_visibility, LodPolicy, LodSelection};
pub use overlay::{OverlaySync, OverlayTransform, OverlayUpdate};
pub use viewport::ViewportState;
