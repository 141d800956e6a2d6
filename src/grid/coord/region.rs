// ============================================
// Region3 - Полуоткрытый бокс [min, max)
// ============================================
// Итерация z -> y -> x (x самый быстрый), как линеаризация ndshape.

use super::pos::GridPos;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region3 {
    pub min: GridPos,
    pub max: GridPos,
}

impl Region3 {
    #[inline]
    pub fn new(min: GridPos, max: GridPos) -> Self {
        Self { min, max }
    }

    /// Куб [min, max)³
    #[inline]
    pub fn cube(min: i32, max: i32) -> Self {
        Self::new(GridPos::splat(min), GridPos::splat(max))
    }

    #[inline]
    pub fn contains(&self, p: GridPos) -> bool {
        p.inside(self.min, self.max)
    }

    pub fn is_empty(&self) -> bool {
        self.min.x >= self.max.x || self.min.y >= self.max.y || self.min.z >= self.max.z
    }

    pub fn volume(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        let d = self.max - self.min;
        d.x as usize * d.y as usize * d.z as usize
    }

    pub fn translated(&self, by: GridPos) -> Self {
        Self::new(self.min + by, self.max + by)
    }

    pub fn iter(&self) -> RegionIter {
        RegionIter { region: *self, next: if self.is_empty() { None } else { Some(self.min) } }
    }
}

impl IntoIterator for Region3 {
    type Item = GridPos;
    type IntoIter = RegionIter;

    fn into_iter(self) -> RegionIter {
        self.iter()
    }
}

pub struct RegionIter {
    region: Region3,
    next: Option<GridPos>,
}

impl Iterator for RegionIter {
    type Item = GridPos;

    fn next(&mut self) -> Option<GridPos> {
        let current = self.next?;
        let mut p = current;
        p.x += 1;
        if p.x >= self.region.max.x {
            p.x = self.region.min.x;
            p.y += 1;
            if p.y >= self.region.max.y {
                p.y = self.region.min.y;
                p.z += 1;
            }
        }
        self.next = if p.z >= self.region.max.z { None } else { Some(p) };
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        // Грубо: верхняя граница = объём
        (0, Some(self.region.volume()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_iteration_order_and_count() {
        let region = Region3::new(GridPos::new(-1, 0, 2), GridPos::new(1, 2, 3));
        let cells: Vec<_> = region.iter().collect();
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[0], GridPos::new(-1, 0, 2));
        assert_eq!(cells[1], GridPos::new(0, 0, 2));
        assert_eq!(cells[2], GridPos::new(-1, 1, 2));
        assert_eq!(cells[3], GridPos::new(0, 1, 2));
    }

    #[test]
    fn test_empty_region() {
        let region = Region3::new(GridPos::splat(3), GridPos::new(3, 5, 5));
        assert!(region.is_empty());
        assert_eq!(region.iter().count(), 0);
        assert_eq!(Region3::cube(-2, 2).volume(), 64);
    }
}
