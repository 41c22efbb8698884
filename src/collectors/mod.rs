use anyhow::Result;
use futures::future::BoxFuture;
use prometheus::core::Desc;
use prometheus::proto::MetricFamily;
use std::collections::HashMap;

use crate::collectors::source::DataSource;

#[macro_use]
mod register_macro;

pub trait Collector {
    fn name(&self) -> &'static str;

    /// Descriptors of every metric the collector currently exports.
    fn describe(&self) -> Vec<Desc>;

    /// Scrape `source` and return a consistent snapshot of the collector's metrics.
    ///
    /// # Errors
    ///
    /// Returns an error if the collector cannot produce a snapshot at all.
    fn collect<'a>(&'a self, source: &'a DataSource) -> BoxFuture<'a, Result<Vec<MetricFamily>>>;

    fn enabled_by_default(&self) -> bool {
        false
    }
}

pub mod source;
pub mod util;

register_collectors! {
    status => StatusCollector,
    process => ProcessCollector,
}

pub mod config;
pub mod registry;
