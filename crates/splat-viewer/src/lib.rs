//! Interactive viewer for gaussian splats and colored point clouds.
//!
//! Input flows from [`platform`] through [`gesture`] into the [`camera`];
//! the [`renderer`] draws whichever [`model`] is current each frame, never
//! keeping more than a bounded number of frames queued on the GPU ([`gate`]).

pub mod app;
pub mod camera;
pub mod config;
pub mod error;
pub mod gate;
pub mod geometry;
pub mod gesture;
pub mod model;
pub mod platform;
pub mod renderer;
