//! # Source records.
//!
//! One [`Source`] per configured address, stored in a [`SourceSet`] keyed by
//! index. Each source owns both of its feed identifiers, so the live and
//! fallback names can never drift apart from the index they belong to.
//!
//! [`Mode`] is **not** stored on the source. It is derived from whatever the
//! routing table currently says, via [`Source::mode_of`].

mod source;

pub use source::{Mode, Source, SourceSet};
