//! Blood report parameter extraction and condition scoring.
//!
//! Raw report text goes through the [`extraction`] stage to produce a
//! [`ParameterMap`]. Three independent evaluations then run over that map:
//! - [`ranges`]: per-parameter Low/Normal/High status against reference ranges
//! - [`risk`]: coarse overall risk, rule-based or from a statistical predictor
//! - [`inference`]: weighted condition rules ranked by confidence
//!
//! [`report::Analyzer`] composes all of them for the command-line tool.
//! Every table is loaded once and only read afterwards.

pub mod config;
pub mod extraction;
pub mod inference;
pub mod ranges;
pub mod report;
pub mod risk;
pub mod tables;

pub use extraction::ParameterMap;
