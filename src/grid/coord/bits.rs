// ============================================
// Bits - Битовые помощники
// ============================================
// Степени двойки, pdep и Morton-перемежение для ключей блоков.

/// Степень двойки?
#[inline]
pub fn is_power_of_two(x: u64) -> bool {
    x != 0 && (x & (x - 1)) == 0
}

/// Наименьшая степень двойки >= x (для 0 возвращает 1)
#[inline]
pub fn least_pot_bound(x: u64) -> u64 {
    x.max(1).next_power_of_two()
}

/// Целый log2. Для 0 не определён.
#[inline]
pub fn log2int(x: u64) -> u32 {
    assert!(x != 0, "log2int(0) is undefined");
    63 - x.leading_zeros()
}

/// Маска младших бит для степени двойки: pot_mask(8) = 0xFF
#[inline]
pub fn pot_mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Программный PDEP: раскладывает младшие биты `value`
/// по позициям единичных бит `mask`.
pub fn pdep(value: u64, mut mask: u64) -> u64 {
    let mut out = 0u64;
    let mut bit = 1u64;
    while mask != 0 {
        let lowest = mask & mask.wrapping_neg();
        if value & bit != 0 {
            out |= lowest;
        }
        mask &= mask - 1;
        bit <<= 1;
    }
    out
}

/// Обратная операция к pdep
pub fn pext(value: u64, mut mask: u64) -> u64 {
    let mut out = 0u64;
    let mut bit = 1u64;
    while mask != 0 {
        let lowest = mask & mask.wrapping_neg();
        if value & lowest != 0 {
            out |= bit;
        }
        mask &= mask - 1;
        bit <<= 1;
    }
    out
}

/// Произведение компонент фиксированного кортежа
#[inline]
pub fn product<const D: usize>(dims: [i64; D]) -> i64 {
    dims.iter().product()
}

/// Биты x в Morton-ключе: 0, 3, 6, ...
const MORTON_X: u64 = 0x1249_2492_4924_9249;
const MORTON_Y: u64 = MORTON_X << 1;
const MORTON_Z: u64 = MORTON_X << 2;

/// Бит на ось в Morton-ключе
pub const MORTON_BITS: u32 = 32;
/// Бит на ось в одном 64-битном слове (3 * 21 = 63)
const MORTON_WORD_BITS: u32 = 21;
const MORTON_WORD_MASK: u32 = (1 << MORTON_WORD_BITS) - 1;

#[inline]
fn interleave_word(x: u32, y: u32, z: u32) -> u64 {
    pdep(x as u64, MORTON_X) | pdep(y as u64, MORTON_Y) | pdep(z as u64, MORTON_Z)
}

#[inline]
fn deinterleave_word(word: u64) -> (u32, u32, u32) {
    (
        pext(word, MORTON_X) as u32,
        pext(word, MORTON_Y) as u32,
        pext(word, MORTON_Z) as u32,
    )
}

/// Перемежение трёх 32-битных чисел в 96-битный ключ.
/// Младшие 21 бит каждой оси - в битах 0..63, старшие 11 - выше.
#[inline]
pub fn interleave3(x: u32, y: u32, z: u32) -> u128 {
    let low = interleave_word(x & MORTON_WORD_MASK, y & MORTON_WORD_MASK, z & MORTON_WORD_MASK);
    let high = interleave_word(
        x >> MORTON_WORD_BITS,
        y >> MORTON_WORD_BITS,
        z >> MORTON_WORD_BITS,
    );
    debug_assert!(3 * MORTON_BITS <= u128::BITS);
    low as u128 | (high as u128) << (3 * MORTON_WORD_BITS)
}

#[inline]
pub fn deinterleave3(key: u128) -> (u32, u32, u32) {
    let low = (key & ((1u128 << (3 * MORTON_WORD_BITS)) - 1)) as u64;
    let high = (key >> (3 * MORTON_WORD_BITS)) as u64;
    let (lx, ly, lz) = deinterleave_word(low);
    let (hx, hy, hz) = deinterleave_word(high);
    (
        lx | hx << MORTON_WORD_BITS,
        ly | hy << MORTON_WORD_BITS,
        lz | hz << MORTON_WORD_BITS,
    )
}
