//! Workflow modules grouped by business area.

pub mod distribution;
