//! Block matcher configuration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::registration::stream::TileBudget;
use crate::util::{BlockMatchError, BlockMatchResult};

/// Half-size of a fixed block, per axis, in fixed-image index units.
///
/// A block covers `2 * radius + 1` pixels along each axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockRadius<const D: usize>([usize; D]);

impl<const D: usize> BlockRadius<D> {
    /// Per-axis radius.
    pub fn new(radius: [usize; D]) -> Self {
        Self(radius)
    }

    /// Same radius along every axis.
    pub fn uniform(radius: usize) -> Self {
        Self([radius; D])
    }

    pub fn as_array(&self) -> [usize; D] {
        self.0
    }

    /// Block extent `2 * radius + 1` per axis.
    pub fn extent(&self) -> [usize; D] {
        self.0.map(|r| 2 * r + 1)
    }
}

impl<const D: usize> Default for BlockRadius<D> {
    fn default() -> Self {
        Self([0; D])
    }
}

impl<const D: usize> From<[usize; D]> for BlockRadius<D> {
    fn from(radius: [usize; D]) -> Self {
        Self(radius)
    }
}

impl<const D: usize> TryFrom<[i64; D]> for BlockRadius<D> {
    type Error = BlockMatchError;

    fn try_from(radius: [i64; D]) -> BlockMatchResult<Self> {
        let mut out = [0usize; D];
        for (dst, &r) in out.iter_mut().zip(radius.iter()) {
            *dst = usize::try_from(r)
                .map_err(|_| BlockMatchError::Configuration("block radius must be non-negative"))?;
        }
        Ok(Self(out))
    }
}

/// Parameters of one block-matching run.
#[derive(Clone, Debug, PartialEq)]
pub struct RegistrationConfig<const D: usize> {
    /// Fixed block half-size.
    pub radius: BlockRadius<D>,
    /// Process the output in tiles instead of all at once.
    pub use_streaming: bool,
    /// Tile limit used when `use_streaming` is set.
    pub tile_budget: TileBudget,
    /// Spread the sites of each tile over the rayon pool (`rayon` feature).
    pub parallel: bool,
    /// Displacement written at sites without a usable block or search region.
    pub sentinel: [f64; D],
}

impl<const D: usize> Default for RegistrationConfig<D> {
    fn default() -> Self {
        Self {
            radius: BlockRadius::default(),
            use_streaming: false,
            tile_budget: TileBudget::default(),
            parallel: false,
            sentinel: [f64::NAN; D],
        }
    }
}

/// Shared cancellation request.
///
/// Clones observe the same flag. Workers check it between sites, so a
/// running execution stops at the next site boundary.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Clears a previous request so the matcher can run again.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::{BlockRadius, CancelFlag, RegistrationConfig};
    use crate::registration::TileBudget;
    use crate::util::BlockMatchError;

    #[test]
    fn negative_radius_is_a_configuration_error() {
        let err = BlockRadius::<2>::try_from([-1i64, 2]).unwrap_err();
        assert!(matches!(err, BlockMatchError::Configuration(_)));
        assert_eq!(BlockRadius::try_from([3i64, 0]).unwrap().extent(), [7, 1]);
    }

    #[test]
    fn defaults_use_nan_sentinel_and_no_streaming() {
        let config = RegistrationConfig::<3>::default();
        assert!(config.sentinel.iter().all(|v| v.is_nan()));
        assert!(!config.use_streaming);
        assert!(matches!(config.tile_budget, TileBudget::MaxBytes(_)));
        assert_eq!(config.radius, BlockRadius::uniform(0));
    }

    #[test]
    fn cancel_flag_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let observer = flag.clone();
        flag.cancel();
        assert!(observer.is_cancelled());
        observer.reset();
        assert!(!flag.is_cancelled());
    }
}
