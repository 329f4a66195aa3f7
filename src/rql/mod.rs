//! RQL (Resource Query Language) terms and parsing.
//!
//! A query string such as `eq(status,open),sort(-date)` is parsed into a forest
//! of [`Term`]s stored in a [`TermArena`]. Everything downstream (clause
//! builders, backend compilers) works on [`TermId`]s into that arena.

pub mod parser;
pub mod term;

pub use parser::{parse, parse_params};
pub use term::{Term, TermArena, TermId};
