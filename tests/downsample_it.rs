use chronobin::{
    BinSize, DownsampleConfig, Reducer, SampledSeries, SkippedColumn, TimeUnit, Unit, downsample,
};

mod common;

use common::{at, capture_logs, setup_light_curve};

#[test]
fn test_light_curve_default_window() -> anyhow::Result<()> {
    let series = setup_light_curve();

    let out = downsample(&series, BinSize::seconds(2.0)?, None, None, None)?;

    // Last sample at 9.99s -> ceil(9.99 / 2) = 5 bins covering [0s, 10s).
    assert_eq!(out.binned.n_bins(), 5);
    assert_eq!(out.binned.time_bin_end(), at(10.0));
    assert_eq!(out.counts, vec![3, 3, 0, 2, 1]);

    let flux = out.binned.column("flux").expect("flux column");
    assert_eq!(flux.unit(), Some(&Unit::new("Jy")));
    assert_eq!(
        flux.values(),
        &[Some(2.0), Some(11.0), None, Some(6.0), Some(4.0)],
        "NaN inside bin 1 must be ignored by the default median"
    );

    let counter = out.binned.column("counter").expect("counter column");
    assert_eq!(counter.unit(), None);
    assert_eq!(
        counter.values(),
        &[Some(2.0), Some(5.0), None, Some(7.5), Some(9.0)]
    );

    assert_eq!(
        out.skipped,
        vec![SkippedColumn {
            name: "label".to_string(),
            type_name: "str".to_string(),
        }]
    );
    assert_eq!(
        out.binned.column_names().collect::<Vec<_>>(),
        vec!["flux", "counter"]
    );
    Ok(())
}

#[test]
fn test_every_kept_sample_lands_in_exactly_one_bin() -> anyhow::Result<()> {
    let series = setup_light_curve();
    let cases = [
        (0.5, None, None),
        (1.0, Some(at(1.0)), Some(4)),
        (2.0, Some(at(-3.0)), Some(8)),
        (3.0, Some(at(2.0)), None),
        (0.25, None, Some(100)),
    ];

    for (secs, origin, n_bins) in cases {
        let out = downsample(&series, BinSize::seconds(secs)?, None, origin, n_bins)?;
        let bins: Vec<_> = out.binned.bins().collect();

        for bin in &bins {
            let inside = series
                .timestamps()
                .iter()
                .filter(|&&t| bin.contains(t))
                .count();
            assert_eq!(
                out.counts[bin.index], inside,
                "Bin {} of {secs}s grid holds the wrong samples",
                bin.index
            );
        }

        let window_start = out.binned.bin_start(0);
        let expected_kept = series
            .timestamps()
            .iter()
            .filter(|&&t| window_start.is_some_and(|s| s <= t) && t < out.binned.time_bin_end())
            .count();
        assert_eq!(out.kept(), expected_kept, "Coverage broken for {secs}s bins");
    }
    Ok(())
}

#[test]
fn test_masks_follow_occupancy() -> anyhow::Result<()> {
    let series = setup_light_curve();

    let out = downsample(
        &series,
        BinSize::new(750.0, TimeUnit::Millisecond)?,
        None,
        None,
        None,
    )?;

    for (name, column) in out.binned.columns() {
        for (bin, &count) in out.counts.iter().enumerate() {
            assert_eq!(
                column.is_masked(bin),
                count == 0,
                "Column {name}, bin {bin}: mask does not match {count} samples"
            );
        }
    }
    Ok(())
}

#[test]
fn test_repeated_runs_are_identical() -> anyhow::Result<()> {
    let series = setup_light_curve();
    let config = DownsampleConfig::new(BinSize::seconds(1.5)?).with_reducer(Reducer::NanMean);

    let first = config.run(&series)?;
    let second = config.run(&series)?;

    // The NaN-only bin at [3s, 4.5s) yields NaN, so compare bit patterns.
    let bits = |out: &chronobin::Downsampled| {
        out.binned
            .columns()
            .map(|(name, c)| {
                let values: Vec<_> = c.values().iter().map(|v| v.map(f64::to_bits)).collect();
                (name.to_string(), values)
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(first.counts, second.counts);
    assert_eq!(first.binned.time_bin_start(), second.binned.time_bin_start());
    assert_eq!(bits(&first), bits(&second));
    assert!(
        first.binned.column("flux").and_then(|c| c.get(2)).is_some_and(f64::is_nan),
        "An all-NaN bin is a computed NaN, not a mask"
    );
    Ok(())
}

#[test]
fn test_skipped_column_is_logged() -> anyhow::Result<()> {
    let series = setup_light_curve();
    let size = BinSize::seconds(2.0)?;

    let (out, logs) = capture_logs(|| downsample(&series, size, None, None, None));

    assert_eq!(out?.skipped.len(), 1);
    assert!(logs.contains("WARN"), "Missing warning in logs: {logs}");
    assert!(logs.contains("label"), "Warning does not name the column: {logs}");
    assert!(logs.contains("Computed bin window"), "Missing debug event: {logs}");
    Ok(())
}

#[test]
fn test_config_from_json() -> anyhow::Result<()> {
    let series = setup_light_curve();
    let config: DownsampleConfig = serde_json::from_str(&format!(
        r#"{{ "bin_size": "4 s", "origin": "{}", "n_bins": 2, "reducer": "count" }}"#,
        at(2.0).to_rfc3339()
    ))?;

    let out = config.run(&series)?;

    // [2s, 6s) and [6s, 10s); the NaN at 3.3s is not counted.
    assert_eq!(out.counts, vec![3, 3]);
    assert_eq!(
        out.binned.column("flux").map(|c| c.values().to_vec()),
        Some(vec![Some(2.0), Some(3.0)])
    );
    Ok(())
}

#[test]
fn test_binned_frame_export() -> anyhow::Result<()> {
    let series = setup_light_curve();

    let out = downsample(&series, BinSize::seconds(2.0)?, Some(&Reducer::NanMax), None, None)?;
    let df = out.binned.to_df()?;

    assert_eq!(df.height(), 5);
    let flux = df.column("flux")?.f64()?;
    assert_eq!(flux.get(1), Some(12.0));
    assert_eq!(flux.null_count(), 1);
    Ok(())
}
