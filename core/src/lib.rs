//! Call-center KPI analysis engine.
//!
//! Ingests call, lead, and KPI-plan rows from the operational store,
//! classifies lead outcomes, measures operator efficiency against plan,
//! and produces per-category recommendations and plan-correction flags.
//!
//! Typical flow: build a [`analyzer::KpiAnalyzer`] from an
//! [`config::AnalyzerConfig`], push the offer catalog, the plan feed, and
//! the three row streams, call `finalize`, then export with
//! [`report::build_report`].

pub mod analyzer;
pub mod call_aggregator;
pub mod config;
pub mod correction;
pub mod efficiency;
pub mod error;
pub mod hierarchy;
pub mod kpi_plan;
pub mod lead_aggregator;
pub mod lead_classifier;
pub mod lead_container;
pub mod recommendation;
pub mod report;
pub mod rows;
pub mod stat_utils;
pub mod timesheet;
pub mod types;

pub use analyzer::KpiAnalyzer;
pub use config::AnalyzerConfig;
pub use error::{KpiError, KpiResult};
pub use report::{build_report, KpiReport};
