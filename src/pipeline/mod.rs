//! Pipeline stages for paper-to-slides generation.
//!
//! Each submodule implements exactly one step. Stages talk to each other
//! through files in the paper's [`WorkingDirectory`](crate::output::WorkingDirectory),
//! so each can be tested against a temp dir on its own.
//!
//! ## Data Flow
//!
//! ```text
//! fetch ──▶ extract ──▶ split ──▶ compose
//! (arXiv)   (lopdf)     (lopdf)   (templates)
//! ```
//!
//! 1. [`fetch`]  : query the arXiv API and download `<id>.pdf`; the only
//!    stage with network I/O
//! 2. [`extract`]: wrap each marked form XObject into its own page of
//!    `out_<id>.pdf`; runs in `spawn_blocking`
//! 3. [`split`]  : write every page of `out_<id>.pdf` to
//!    `figures/figure_<n>.pdf`; runs in `spawn_blocking`
//! 4. [`compose`]: fill the beamer templates with the record and one block
//!    per figure file

pub mod compose;
pub mod extract;
pub mod fetch;
pub(crate) mod objects;
pub mod split;
