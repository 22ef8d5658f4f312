//! Mines tagged calendar entries and reports time spent per project.
//!
//! Event titles carry a small inline grammar: `$project %activity #tag
//! @person`. The [`parser`] decodes fetched events into [`event::Record`]
//! values and the [`pipeline`] filters, aggregates, and totals them before
//! one of the [`output`] writers renders the result.

pub mod calendar;
pub mod config;
pub mod event;
pub mod output;
pub mod parser;
pub mod pipeline;
