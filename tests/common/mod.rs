use std::{
    io::Write,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use chronobin::TimeSeries;

pub fn setup_origin() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap()
}

/// Instant `secs` seconds after [`setup_origin`], at millisecond resolution.
pub fn at(secs: f64) -> DateTime<Utc> {
    setup_origin() + TimeDelta::milliseconds((secs * 1_000.0).round() as i64)
}

/// An irregular light curve: a flux column in Jy, a plain counter and a
/// text label per sample.
pub fn setup_light_curve() -> TimeSeries {
    let secs = [0.0, 0.4, 1.9, 2.0, 2.0, 3.3, 7.25, 7.5, 9.99];
    let flux = [1.0, 3.0, 2.0, 10.0, 12.0, f64::NAN, 5.0, 7.0, 4.0];
    let counter = (1..=secs.len()).map(|i| i as f64).collect();
    let labels = secs.iter().map(|s| format!("obs-{s}")).collect();

    TimeSeries::new(secs.iter().map(|&s| at(s)).collect())
        .and_then(|ts| ts.with_quantity_column("flux", flux.to_vec(), "Jy"))
        .and_then(|ts| ts.with_float_column("counter", counter))
        .and_then(|ts| ts.with_opaque_column("label", "str", labels))
        .expect("Fixture must be a valid time series")
}

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Runs `f` under a plain-text subscriber and returns everything it logged.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buf = SharedBuf::default();
    let writer = buf.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(move || writer.clone())
        .finish();

    let out = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
    (out, logs)
}
