//! Narrated time-series playback: detect features in a series, map them
//! through a feature-action table to visual actions, build a chronological
//! timeline, and play it back against a [`canvas::Canvas`].

pub mod action;
pub mod canvas;
pub mod config;
pub mod detect;
pub mod error;
pub mod feature;
pub mod io;
pub mod playback;
pub mod predicate;
pub mod rank;
pub mod table;
pub mod template;
pub mod timeline;
pub mod types;

pub use error::{Result, StoryError};
