//! Metrics collection.
//!
//! # Metrics
//! - `config_cache_hits_total` (counter)
//! - `config_cache_misses_total` (counter)
//! - `config_cache_evictions_total` (counter): lazily evicted expired entries
//! - `config_cache_entries` (gauge): physically present entries
//! - `config_loads_total` (counter): by result (`hit`, `absent`, `error`)
//! - `config_writes_total` (counter): by op (`save`, `update_path`, `restore`, `flat`)
//! - `config_backups_total` (counter)
//! - `config_watch_events_total` (counter)

use metrics::{counter, gauge};

pub fn record_cache_hit() {
    counter!("config_cache_hits_total").increment(1);
}

pub fn record_cache_miss() {
    counter!("config_cache_misses_total").increment(1);
}

pub fn record_cache_evictions(count: usize) {
    if count > 0 {
        counter!("config_cache_evictions_total").increment(count as u64);
    }
}

pub fn record_cache_size(size: usize) {
    gauge!("config_cache_entries").set(size as f64);
}

pub fn record_load(result: &'static str) {
    counter!("config_loads_total", "result" => result).increment(1);
}

pub fn record_write(op: &'static str) {
    counter!("config_writes_total", "op" => op).increment(1);
}

pub fn record_backup() {
    counter!("config_backups_total").increment(1);
}

pub fn record_watch_event() {
    counter!("config_watch_events_total").increment(1);
}
