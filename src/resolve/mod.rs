// src/resolve/mod.rs

//! Pattern handling and file resolution.
//!
//! - [`pattern`] expands macros in a configured path and splits it into a
//!   directory and a glob.
//! - [`patterns`] compiles Ant-style include/exclude lists and walks a
//!   directory through the [`FileSystem`](crate::fs::FileSystem) seam.
//! - [`locator`] applies the ambiguity strategy to yield at most one file.

pub mod locator;
pub mod pattern;
pub mod patterns;

pub use locator::{locate, LocatedFile};
pub use pattern::{expand_macros, resolve, PatternParts};
pub use patterns::{collect_matching, AntPatternSet, MatchedPath, DEFAULT_INCLUDES};
