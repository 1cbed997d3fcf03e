use crate::geometry::{Coordinate, DistanceBias};

/// Every pixel of a `width × height` surface, ordered by distance from the
/// surface center. Pixels at equal distance keep row-major order.
#[derive(Debug, Clone)]
pub struct CandidateIndex {
    width: u32,
    height: u32,
    order: Vec<u32>,
}

impl CandidateIndex {
    pub fn build(width: u32, height: u32, bias: DistanceBias) -> Self {
        let center = Coordinate::new(width as f32 / 2.0, height as f32 / 2.0);
        let count = width as usize * height as usize;
        let distances: Vec<f32> = (0..count)
            .map(|idx| {
                let pixel = Coordinate::new(
                    (idx % width as usize) as f32,
                    (idx / width as usize) as f32,
                );
                pixel.scaled_distance(center, bias)
            })
            .collect();

        let mut order: Vec<u32> = (0..count as u32).collect();
        // `sort_by` is stable, which keeps ties in row-major order.
        order.sort_by(|a, b| distances[*a as usize].total_cmp(&distances[*b as usize]));

        Self {
            width,
            height,
            order,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn matches(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }

    /// Pixel at position `rank` in the ordering.
    pub fn coordinate(&self, rank: usize) -> Coordinate {
        let idx = self.order[rank];
        Coordinate::new((idx % self.width) as f32, (idx / self.width) as f32)
    }

    /// Candidates at ranks `0, stride, 2·stride, …`.
    pub fn iter_strided(&self, stride: usize) -> impl Iterator<Item = Coordinate> + '_ {
        (0..self.order.len())
            .step_by(stride.max(1))
            .map(|rank| self.coordinate(rank))
    }
}
