//! Core data model shared by the conversion stages.
//!
//! This module contains:
//! - The closed set of ILIAS object types
//! - Timing (availability) windows carried through from the container
//! - Resolved items, the unit every later stage works with
//! - Synthesized target sections

mod item;
mod object_type;
mod section;
mod timing;

pub use item::{ResolutionSource, ResolvedItem};
pub use object_type::ObjectType;
pub use section::Section;
pub use timing::{Timing, TimingKind};
