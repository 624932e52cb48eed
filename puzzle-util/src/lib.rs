#![forbid(unsafe_code)]
//! Small presentation-layer helpers shared by the rest of the workspace.
//!
//! The original source kept these in one grab-bag header alongside colour
//! mixing and cursor math for drawing back-ends. Those belong to a drawing
//! back-end, which is out of scope here, so only the two helpers with a
//! non-drawing caller survive: [`hex`] (decoding a hex-encoded seed typed
//! at a CLI) and [`names`] (turning a solved digit into a display string
//! for diagnostics).

pub mod hex;
pub mod names;
