//! Uniform cell grid for fixed-radius contact searches.
//!
//! Items are binned into cubic cells whose side matches the query radius, so a query only
//! visits the 27 cells around the center. Each cell is a singly linked list threaded through
//! the `next` array, which keeps construction to two flat allocations.

use super::types::Point;
use nalgebra::Vector3;

const END: u32 = u32::MAX;

#[derive(Debug, Clone)]
pub struct Grid<T> {
    cell_size: f64,
    origin: Point,
    dims: [usize; 3],
    head: Vec<u32>,
    next: Vec<u32>,
    items: Vec<(Point, T)>,
}

impl<T> Grid<T> {
    /// Bins `items` into cells of side `cell_size`.
    ///
    /// # Panics
    ///
    /// Panics if `cell_size` is not strictly positive.
    pub fn new(items: impl IntoIterator<Item = (Point, T)>, cell_size: f64) -> Self {
        assert!(cell_size > 0.0, "grid cell size must be positive");

        let items: Vec<(Point, T)> = items.into_iter().collect();
        if items.is_empty() {
            return Self {
                cell_size,
                origin: Point::origin(),
                dims: [0; 3],
                head: Vec::new(),
                next: Vec::new(),
                items,
            };
        }

        let (lo, hi) = items.iter().fold(
            (items[0].0, items[0].0),
            |(lo, hi), (p, _)| (lo.inf(p), hi.sup(p)),
        );
        let extent = hi - lo;
        let dims = [
            (extent.x / cell_size).floor() as usize + 1,
            (extent.y / cell_size).floor() as usize + 1,
            (extent.z / cell_size).floor() as usize + 1,
        ];

        let mut grid = Self {
            cell_size,
            origin: lo,
            dims,
            head: vec![END; dims[0] * dims[1] * dims[2]],
            next: vec![END; items.len()],
            items,
        };
        for i in 0..grid.items.len() {
            let cell = grid.flat_index(grid.cell_of(&grid.items[i].0));
            grid.next[i] = grid.head[cell];
            grid.head[cell] = i as u32;
        }
        grid
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn cell_of(&self, pos: &Point) -> [usize; 3] {
        let offset: Vector3<f64> = pos - self.origin;
        let clamp =
            |v: f64, dim: usize| ((v / self.cell_size).floor().max(0.0) as usize).min(dim - 1);
        [
            clamp(offset.x, self.dims[0]),
            clamp(offset.y, self.dims[1]),
            clamp(offset.z, self.dims[2]),
        ]
    }

    fn flat_index(&self, cell: [usize; 3]) -> usize {
        cell[0] + cell[1] * self.dims[0] + cell[2] * self.dims[0] * self.dims[1]
    }

    /// Items whose stored position lies within `radius` of `center` (inclusive).
    pub fn within<'a>(
        &'a self,
        center: &Point,
        radius: f64,
    ) -> impl Iterator<Item = (&'a Point, &'a T)> + 'a {
        let center = *center;
        let radius_sq = radius * radius;
        let span = if self.items.is_empty() {
            None
        } else {
            let r = Vector3::new(radius, radius, radius);
            Some((self.cell_of(&(center - r)), self.cell_of(&(center + r))))
        };

        span.into_iter()
            .flat_map(move |(lo, hi)| {
                (lo[2]..=hi[2]).flat_map(move |z| {
                    (lo[1]..=hi[1]).flat_map(move |y| (lo[0]..=hi[0]).map(move |x| [x, y, z]))
                })
            })
            .flat_map(move |cell| CellChain {
                grid: self,
                cursor: self.head[self.flat_index(cell)],
            })
            .filter(move |(pos, _)| nalgebra::distance_squared(*pos, &center) <= radius_sq)
    }
}

struct CellChain<'a, T> {
    grid: &'a Grid<T>,
    cursor: u32,
}

impl<'a, T> Iterator for CellChain<'a, T> {
    type Item = (&'a Point, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == END {
            return None;
        }
        let i = self.cursor as usize;
        self.cursor = self.grid.next[i];
        let (pos, item) = &self.grid.items[i];
        Some((pos, item))
    }
}
