//! Emission half of the binding generator: the member/parameter shaper and
//! the header emitter, driven over a processed [`registry::catalog::Catalog`].

pub mod emit;
pub mod vars;
