// ============================================
// Block Key - Ключ блока / корневого региона
// ============================================
//
// Координата блока (мировая координата / L) смещается на 2^31 и
// перемежается в 96-битный Morton-ключ. Ключ есть у любой i32 координаты.

use super::bits::{deinterleave3, interleave3};
use super::pos::GridPos;

/// Переворот знакового бита: i32 -> u32 с сохранением порядка
const KEY_BIAS: u32 = 1 << 31;

/// Упакованный Morton-ключ координаты (блока или корня)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockKey(u128);

impl BlockKey {
    /// Из координаты в единицах блоков
    #[inline]
    pub fn from_cell(cell: GridPos) -> Self {
        let bias = |v: i32| (v as u32) ^ KEY_BIAS;
        Self(interleave3(bias(cell.x), bias(cell.y), bias(cell.z)))
    }

    /// Из мировой координаты узла и размера ячейки
    #[inline]
    pub fn from_world(coord: GridPos, cell_size: i32) -> Self {
        Self::from_cell(coord.div_floor(cell_size))
    }

    /// Обратно в координату ячейки
    #[inline]
    pub fn cell(self) -> GridPos {
        let (x, y, z) = deinterleave3(self.0);
        let unbias = |v: u32| (v ^ KEY_BIAS) as i32;
        GridPos::new(unbias(x), unbias(y), unbias(z))
    }

    #[inline]
    pub fn raw(self) -> u128 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_roundtrip_negative() {
        for cell in [
            GridPos::ZERO,
            GridPos::new(-1, -1, -1),
            GridPos::new(-1000, 77, 123456),
            GridPos::new(-(1 << 20), (1 << 20) - 1, 0),
            GridPos::new(i32::MIN, i32::MAX, 1 << 28),
        ] {
            assert_eq!(BlockKey::from_cell(cell).cell(), cell);
        }
    }

    #[test]
    fn test_world_key_groups_block() {
        let a = BlockKey::from_world(GridPos::new(0, 0, 0), 8);
        let b = BlockKey::from_world(GridPos::new(7, 7, 7), 8);
        let c = BlockKey::from_world(GridPos::new(-1, 0, 0), 8);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(c.cell(), GridPos::new(-1, 0, 0));
    }

    #[test]
    fn test_key_order_follows_sign() {
        // По одной оси ключ монотонен, в том числе через ноль
        let keys: Vec<BlockKey> = [i32::MIN, -(1 << 25), -1, 0, 1, 1 << 25, i32::MAX]
            .iter()
            .map(|&x| BlockKey::from_cell(GridPos::new(x, 0, 0)))
            .collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }
}
