//! N-dimensional index regions.
//!
//! A region is a start index plus a per-axis size. Pixels are laid out and
//! traversed with axis 0 varying fastest, so `[x, y]` regions iterate row by
//! row.

use std::fmt;

/// Axis-aligned box in index space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageRegion<const D: usize> {
    index: [i64; D],
    size: [usize; D],
}

impl<const D: usize> Default for ImageRegion<D> {
    fn default() -> Self {
        Self {
            index: [0; D],
            size: [0; D],
        }
    }
}

impl<const D: usize> ImageRegion<D> {
    /// Creates a region from its start index and size.
    pub fn new(index: [i64; D], size: [usize; D]) -> Self {
        Self { index, size }
    }

    /// Creates a region starting at the origin.
    pub fn from_size(size: [usize; D]) -> Self {
        Self::new([0; D], size)
    }

    /// Creates the region spanning `lower..=upper`; inverted axes give an empty region.
    pub fn from_bounds(lower: [i64; D], upper: [i64; D]) -> Self {
        let mut size = [0usize; D];
        for axis in 0..D {
            if upper[axis] >= lower[axis] {
                size[axis] = (upper[axis] - lower[axis] + 1) as usize;
            }
        }
        Self::new(lower, size)
    }

    /// Creates the region `center - radius ..= center + radius`.
    pub fn centered(center: [i64; D], radius: [usize; D]) -> Self {
        let mut index = [0i64; D];
        let mut size = [0usize; D];
        for axis in 0..D {
            index[axis] = center[axis] - radius[axis] as i64;
            size[axis] = 2 * radius[axis] + 1;
        }
        Self::new(index, size)
    }

    /// Returns the start index.
    pub fn index(&self) -> [i64; D] {
        self.index
    }

    /// Returns the per-axis size.
    pub fn size(&self) -> [usize; D] {
        self.size
    }

    /// Returns the exclusive end index.
    pub fn upper(&self) -> [i64; D] {
        let mut upper = self.index;
        for (value, size) in upper.iter_mut().zip(self.size.iter()) {
            *value += *size as i64;
        }
        upper
    }

    /// Returns the number of pixels covered.
    pub fn num_pixels(&self) -> usize {
        self.size.iter().product()
    }

    /// Returns true when any axis has zero extent.
    pub fn is_empty(&self) -> bool {
        self.size.iter().any(|&s| s == 0)
    }

    /// Returns true when `index` lies inside the region.
    pub fn contains_index(&self, index: &[i64; D]) -> bool {
        let upper = self.upper();
        (0..D).all(|axis| index[axis] >= self.index[axis] && index[axis] < upper[axis])
    }

    /// Returns true when `other` lies inside the region. Empty regions are
    /// contained everywhere.
    pub fn contains_region(&self, other: &Self) -> bool {
        if other.is_empty() {
            return true;
        }
        let upper = self.upper();
        let other_upper = other.upper();
        (0..D).all(|axis| other.index[axis] >= self.index[axis] && other_upper[axis] <= upper[axis])
    }

    /// Returns the overlap of two regions (possibly empty).
    pub fn intersect(&self, other: &Self) -> Self {
        let upper = self.upper();
        let other_upper = other.upper();
        let mut index = [0i64; D];
        let mut size = [0usize; D];
        for axis in 0..D {
            let lo = self.index[axis].max(other.index[axis]);
            let hi = upper[axis].min(other_upper[axis]);
            index[axis] = lo;
            size[axis] = if hi > lo { (hi - lo) as usize } else { 0 };
        }
        Self::new(index, size)
    }

    /// Returns the bounding box of two regions, ignoring empty operands.
    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let upper = self.upper();
        let other_upper = other.upper();
        let mut index = [0i64; D];
        let mut size = [0usize; D];
        for axis in 0..D {
            let lo = self.index[axis].min(other.index[axis]);
            let hi = upper[axis].max(other_upper[axis]);
            index[axis] = lo;
            size[axis] = (hi - lo) as usize;
        }
        Self::new(index, size)
    }

    /// Grows the region by `radius` on both sides of every axis.
    pub fn dilate(&self, radius: [usize; D]) -> Self {
        let mut index = self.index;
        let mut size = self.size;
        for axis in 0..D {
            index[axis] -= radius[axis] as i64;
            size[axis] += 2 * radius[axis];
        }
        Self::new(index, size)
    }

    /// Shrinks the region by `radius` on both sides of every axis.
    pub fn erode(&self, radius: [usize; D]) -> Self {
        let mut index = self.index;
        let mut size = self.size;
        for axis in 0..D {
            index[axis] += radius[axis] as i64;
            size[axis] = size[axis].saturating_sub(2 * radius[axis]);
        }
        Self::new(index, size)
    }

    /// Returns the linear offset of `index` in a buffer laid out over this region.
    pub fn offset_of(&self, index: &[i64; D]) -> Option<usize> {
        let mut offset = 0usize;
        let mut stride = 1usize;
        for axis in 0..D {
            let rel = index[axis] - self.index[axis];
            if rel < 0 || rel as usize >= self.size[axis] {
                return None;
            }
            offset += rel as usize * stride;
            stride *= self.size[axis];
        }
        Some(offset)
    }

    /// Returns the index stored at a linear offset of this region.
    pub fn index_at(&self, mut offset: usize) -> Option<[i64; D]> {
        if offset >= self.num_pixels() {
            return None;
        }
        let mut index = self.index;
        for axis in 0..D {
            let size = self.size[axis];
            index[axis] += (offset % size) as i64;
            offset /= size;
        }
        Some(index)
    }

    /// Iterates over all indices with axis 0 varying fastest.
    pub fn iter(&self) -> RegionIter<D> {
        RegionIter {
            region: *self,
            next: if self.is_empty() || D == 0 {
                None
            } else {
                Some(self.index)
            },
        }
    }
}

impl<const D: usize> fmt::Display for ImageRegion<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[index {:?}, size {:?}]", self.index, self.size)
    }
}

impl<const D: usize> IntoIterator for &ImageRegion<D> {
    type Item = [i64; D];
    type IntoIter = RegionIter<D>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the indices of a region.
#[derive(Clone, Debug)]
pub struct RegionIter<const D: usize> {
    region: ImageRegion<D>,
    next: Option<[i64; D]>,
}

impl<const D: usize> Iterator for RegionIter<D> {
    type Item = [i64; D];

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        let upper = self.region.upper();
        let mut advanced = current;
        for axis in 0..D {
            advanced[axis] += 1;
            if advanced[axis] < upper[axis] {
                self.next = Some(advanced);
                return Some(current);
            }
            advanced[axis] = self.region.index[axis];
        }
        self.next = None;
        Some(current)
    }
}
