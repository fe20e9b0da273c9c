mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use blockmatch::{
    BlockMatchError, BlockMatchResult, BlockMatcher, BlockRadius, CalculatorMode, CancelFlag,
    DisplacementCalculator, FixedBlock, Image, ImageRegion, MaximumPixelDisplacementCalculator,
    MeanSquares, MetricImage, MetricImageFilter, SiteContext, TileBudget,
};
use common::{assert_same_field, grid_search_regions, shifted_pair};

/// Fails for the block centered on `fail_at`.
#[derive(Clone)]
struct FailingMetric {
    inner: MeanSquares<2>,
    fail_at: [i64; 2],
}

impl MetricImageFilter<2> for FailingMetric {
    fn compute(
        &mut self,
        block: &FixedBlock<2>,
        search_region: &ImageRegion<2>,
        moving: &Image<f32, 2>,
    ) -> BlockMatchResult<MetricImage<2>> {
        if block.center() == self.fail_at {
            return Err(BlockMatchError::strategy("synthetic failure"));
        }
        self.inner.compute(block, search_region, moving)
    }
}

/// Requests cancellation once `after` metric images were computed.
#[derive(Clone)]
struct CancellingMetric {
    inner: MeanSquares<2>,
    calls: Arc<AtomicUsize>,
    after: usize,
    cancel: CancelFlag,
}

impl MetricImageFilter<2> for CancellingMetric {
    fn compute(
        &mut self,
        block: &FixedBlock<2>,
        search_region: &ImageRegion<2>,
        moving: &Image<f32, 2>,
    ) -> BlockMatchResult<MetricImage<2>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) + 1 >= self.after {
            self.cancel.cancel();
        }
        self.inner.compute(block, search_region, moving)
    }
}

/// Batch calculator that records the size of every batch it receives.
#[derive(Clone, Default)]
struct RecordingBatch {
    batches: Arc<Mutex<Vec<usize>>>,
}

impl DisplacementCalculator<2> for RecordingBatch {
    fn mode(&self) -> CalculatorMode {
        CalculatorMode::Batch
    }

    fn extract(
        &mut self,
        metric: &MetricImage<2>,
        site: &SiteContext<2>,
    ) -> BlockMatchResult<[f64; 2]> {
        MaximumPixelDisplacementCalculator.extract(metric, site)
    }

    fn extract_all(
        &mut self,
        metrics: &[(SiteContext<2>, MetricImage<2>)],
    ) -> BlockMatchResult<Vec<[f64; 2]>> {
        self.batches.lock().unwrap().push(metrics.len());
        metrics
            .iter()
            .map(|(site, metric)| self.extract(metric, site))
            .collect()
    }
}

#[test]
fn strategy_failure_aborts_and_names_the_site() {
    let (fixed, moving) = shifted_pair(17);
    let search = grid_search_regions();
    // Site [3, 4] is centered on fixed index [6 + 21, 6 + 28].
    let metric = FailingMetric {
        inner: MeanSquares::new(),
        fail_at: [27, 34],
    };
    let matcher = BlockMatcher::new(metric)
        .with_fixed_image(&fixed)
        .with_moving_image(&moving)
        .with_radius(BlockRadius::uniform(2));

    assert_eq!(
        matcher.execute(&search).unwrap_err(),
        BlockMatchError::Strategy {
            site: vec![3, 4],
            reason: "synthetic failure".to_string(),
        }
    );
}

#[test]
fn cancelled_before_execute_returns_cancelled() {
    let (fixed, moving) = shifted_pair(17);
    let search = grid_search_regions();
    let matcher = BlockMatcher::new(MeanSquares::new())
        .with_fixed_image(&fixed)
        .with_moving_image(&moving)
        .with_radius(BlockRadius::uniform(2));

    let flag = matcher.cancel_flag();
    flag.cancel();
    assert_eq!(matcher.execute(&search).unwrap_err(), BlockMatchError::Cancelled);

    flag.reset();
    assert!(matcher.execute(&search).is_ok());
}

#[test]
fn cancellation_stops_at_the_next_site() {
    let (fixed, moving) = shifted_pair(17);
    let search = grid_search_regions();
    let cancel = CancelFlag::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let metric = CancellingMetric {
        inner: MeanSquares::new(),
        calls: Arc::clone(&calls),
        after: 5,
        cancel: cancel.clone(),
    };
    let mut matcher = BlockMatcher::new(metric)
        .with_cancel_flag(cancel)
        .with_fixed_image(&fixed)
        .with_moving_image(&moving)
        .with_radius(BlockRadius::uniform(2));
    matcher.set_use_streaming(true);
    matcher.set_tile_budget(TileBudget::Tiles(4));

    assert_eq!(matcher.execute(&search).unwrap_err(), BlockMatchError::Cancelled);
    assert_eq!(calls.load(Ordering::SeqCst), 5);
}

#[test]
fn batch_calculator_sees_whole_tiles() {
    let (fixed, moving) = shifted_pair(19);
    let search = grid_search_regions();
    let recorder = RecordingBatch::default();
    let batches = Arc::clone(&recorder.batches);

    let mut batched = BlockMatcher::new(MeanSquares::new())
        .with_calculator(recorder)
        .with_fixed_image(&fixed)
        .with_moving_image(&moving)
        .with_radius(BlockRadius::uniform(2));
    batched.set_use_streaming(true);
    batched.set_tile_budget(TileBudget::Tiles(4));
    let batched_field = batched.execute(&search).unwrap();
    assert_eq!(*batches.lock().unwrap(), vec![16, 16, 16, 16]);

    let per_site = BlockMatcher::new(MeanSquares::new())
        .with_fixed_image(&fixed)
        .with_moving_image(&moving)
        .with_radius(BlockRadius::uniform(2))
        .execute(&search)
        .unwrap();
    assert_same_field(&batched_field, &per_site);
}

/// Batch calculator whose output depends on how often it was called.
#[derive(Clone, Default)]
struct CountingBatch {
    calls: usize,
}

impl DisplacementCalculator<2> for CountingBatch {
    fn mode(&self) -> CalculatorMode {
        CalculatorMode::Batch
    }

    fn extract(
        &mut self,
        metric: &MetricImage<2>,
        site: &SiteContext<2>,
    ) -> BlockMatchResult<[f64; 2]> {
        let [dx, dy] = MaximumPixelDisplacementCalculator.extract(metric, site)?;
        Ok([dx + self.calls as f64, dy])
    }

    fn extract_all(
        &mut self,
        metrics: &[(SiteContext<2>, MetricImage<2>)],
    ) -> BlockMatchResult<Vec<[f64; 2]>> {
        self.calls += 1;
        metrics
            .iter()
            .map(|(site, metric)| self.extract(metric, site))
            .collect()
    }
}

#[test]
fn batch_calculator_state_does_not_leak_between_tiles() {
    let (fixed, moving) = shifted_pair(23);
    let search = grid_search_regions();
    let run = |tiles: Option<usize>| {
        let mut matcher = BlockMatcher::new(MeanSquares::new())
            .with_calculator(CountingBatch::default())
            .with_fixed_image(&fixed)
            .with_moving_image(&moving)
            .with_radius(BlockRadius::uniform(2));
        if let Some(tiles) = tiles {
            matcher.set_use_streaming(true);
            matcher.set_tile_budget(TileBudget::Tiles(tiles));
        }
        matcher.execute(&search).unwrap()
    };

    let direct = run(None);
    assert_eq!(direct.get(&[3, 3]).copied(), Some([3.0, -1.0]));
    assert_same_field(&direct, &run(Some(4)));
    assert_same_field(&direct, &run(Some(64)));
}

/// Batch calculator that fails either for one site or for the whole batch.
#[derive(Clone)]
struct FailingBatch {
    fail_site: Option<[i64; 2]>,
}

impl DisplacementCalculator<2> for FailingBatch {
    fn mode(&self) -> CalculatorMode {
        CalculatorMode::Batch
    }

    fn extract(
        &mut self,
        metric: &MetricImage<2>,
        site: &SiteContext<2>,
    ) -> BlockMatchResult<[f64; 2]> {
        if self.fail_site == Some(site.site) {
            return Err(BlockMatchError::strategy("bad peak"));
        }
        MaximumPixelDisplacementCalculator.extract(metric, site)
    }

    fn extract_all(
        &mut self,
        metrics: &[(SiteContext<2>, MetricImage<2>)],
    ) -> BlockMatchResult<Vec<[f64; 2]>> {
        if self.fail_site.is_none() {
            return Err(BlockMatchError::strategy("batch rejected"));
        }
        metrics
            .iter()
            .map(|(site, metric)| {
                self.extract(metric, site)
                    .map_err(|err| err.at_site(&site.site))
            })
            .collect()
    }
}

#[test]
fn batch_failures_report_a_site() {
    let (fixed, moving) = shifted_pair(29);
    let search = grid_search_regions();
    let run = |fail_site: Option<[i64; 2]>| {
        BlockMatcher::new(MeanSquares::new())
            .with_calculator(FailingBatch { fail_site })
            .with_fixed_image(&fixed)
            .with_moving_image(&moving)
            .with_radius(BlockRadius::uniform(2))
            .execute(&search)
            .unwrap_err()
    };

    assert_eq!(
        run(Some([5, 2])),
        BlockMatchError::Strategy {
            site: vec![5, 2],
            reason: "bad peak".to_string(),
        }
    );
    // Unattributed batch errors are charged to the first site of the tile.
    assert_eq!(
        run(None),
        BlockMatchError::Strategy {
            site: vec![0, 0],
            reason: "batch rejected".to_string(),
        }
    );
}
