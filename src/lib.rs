//! Filter-and-aggregate engine behind an Olympic Games results dashboard.
//!
//! Source tables are loaded once into a [`session::Session`]. Each page of
//! [`dashboard::Page`] narrows them with one [`data::filter::FilterContext`]
//! before summarizing; [`export`] renders the resulting reports.

pub mod config;
pub mod dashboard;
pub mod data;
pub mod export;
pub mod session;
