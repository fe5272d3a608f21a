/// A square perforated mask of side `2 × half_side_length`. Each cell of the
/// upper-left quadrant stores which of the 4 rotations owns the hole at that
/// position (a base-4 digit); the digits together are the grille's ordinal,
/// cell 0 being the least significant digit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grille {
    half_side_length: usize,
    holes: Vec<u8>,
}

impl Grille {
    #[inline]
    pub fn new(half_side_length: usize, ordinal: u64) -> Self {
        let mut holes: Vec<u8> = vec![0; half_side_length * half_side_length];

        let mut ordinal = ordinal;
        for hole in holes.iter_mut() {
            if ordinal == 0 {
                break;
            }
            *hole = (ordinal & 0b11) as u8;
            ordinal >>= 2;
        }

        Self {
            half_side_length,
            holes,
        }
    }

    /// Advances the ordinal by 1: a base-4 counter with carry.
    #[inline]
    pub fn increment(&mut self) {
        for hole in self.holes.iter_mut() {
            if *hole < 3 {
                *hole += 1;
                break;
            }
            *hole = 0;
        }
    }

    /// The only place where the rotation geometry is defined. For every cell
    /// and every one of the 4 rotations, exactly one rotation exposes the
    /// cell as a hole.
    #[inline]
    pub fn is_hole(&self, x: usize, y: usize, rotation: usize) -> bool {
        let side_length: usize = self.half_side_length * 2;

        // Map the output coordinates back to rotation 0.
        let (orig_x, orig_y): (usize, usize) = match rotation {
            0 => (x, y),
            1 => (y, side_length - 1 - x),
            2 => (side_length - 1 - x, side_length - 1 - y),
            3 => (side_length - 1 - y, x),
            _ => panic!("invalid rotation: {}", rotation),
        };

        // Fold the canonical point into the upper-left quadrant and note
        // which quadrant it came from.
        let (quadrant, hole_x, hole_y): (u8, usize, usize) =
            if orig_x < self.half_side_length {
                if orig_y < self.half_side_length {
                    (0, orig_x, orig_y)
                } else {
                    (3, side_length - 1 - orig_y, orig_x)
                }
            } else if orig_y < self.half_side_length {
                (1, orig_y, side_length - 1 - orig_x)
            } else {
                (2, side_length - 1 - orig_x, side_length - 1 - orig_y)
            };

        self.holes[hole_x * self.half_side_length + hole_y] == quadrant
    }
}

/// A half-open ordinal range `[begin, end)` with one mutable `Grille` cursor.
/// `get_next` hands out a borrowed view of the cursor (single-owner,
/// allocation-free); `clone_next` hands out an owned copy for crossing a
/// thread boundary.
pub struct GrilleInterval {
    next: Grille,
    preincremented: bool,
    begin: u64,
    next_ordinal: u64,
    end: u64,
}

impl GrilleInterval {
    #[inline]
    pub fn new(half_side_length: usize, begin: u64, end: u64) -> Self {
        Self {
            next: Grille::new(half_side_length, begin),
            preincremented: true,
            begin,
            next_ordinal: begin,
            end,
        }
    }

    #[inline]
    pub fn clone_next(&mut self) -> Option<Grille> {
        if self.next_ordinal >= self.end {
            return None;
        }

        if !self.preincremented {
            self.next.increment();
        }

        let current: Grille = self.next.clone();

        self.next.increment();
        self.preincremented = true;

        self.next_ordinal += 1;
        Some(current)
    }

    #[inline]
    pub fn get_next(&mut self) -> Option<&Grille> {
        if self.next_ordinal >= self.end {
            return None;
        }

        if !self.preincremented {
            self.next.increment();
        }
        self.preincremented = false;

        self.next_ordinal += 1;
        Some(&self.next)
    }

    pub fn calculate_completion(&self) -> f32 {
        (self.next_ordinal - self.begin) as f32 * 100.0 / (self.end - self.begin) as f32
    }
}

/// Splits `[0, total)` into `count` disjoint, exhaustive half-open ranges:
/// a rounded even split, with the final range absorbing the remainder.
pub fn split_into_intervals(total: u64, count: usize) -> Vec<(u64, u64)> {
    let length: u64 = (total as f64 / count as f64).round() as u64;

    let mut intervals: Vec<(u64, u64)> = Vec::with_capacity(count);
    let mut begin: u64 = 0;
    for i in 0..count {
        let end: u64 = if i < count - 1 {
            (begin + length).min(total)
        } else {
            total
        };
        intervals.push((begin, end));
        begin = end;
    }

    intervals
}

#[cfg(test)]
mod tests {
    use super::*;

    const HALF_SIDE: usize = 2;
    const GRILLE_COUNT: u64 = 256; // 4 ^ (2 * 2)

    #[test]
    fn incrementing_matches_direct_construction() {
        let mut grille = Grille::new(HALF_SIDE, 0);
        for ordinal in 1..GRILLE_COUNT {
            grille.increment();
            assert_eq!(grille, Grille::new(HALF_SIDE, ordinal), "ordinal {}", ordinal);
        }
    }

    #[test]
    fn rotations_partition_the_whole_surface() {
        let side: usize = HALF_SIDE * 2;
        for ordinal in 0..GRILLE_COUNT {
            let grille = Grille::new(HALF_SIDE, ordinal);
            for y in 0..side {
                for x in 0..side {
                    let exposing: usize = (0..4)
                        .filter(|&rotation| grille.is_hole(x, y, rotation))
                        .count();
                    assert_eq!(
                        exposing, 1,
                        "cell ({}, {}) of grille {} is exposed by {} rotations",
                        x, y, ordinal, exposing
                    );
                }
            }
        }
    }

    #[test]
    fn each_rotation_exposes_a_quarter_of_the_cells() {
        let side: usize = HALF_SIDE * 2;
        let grille = Grille::new(HALF_SIDE, 0b11100100);
        for rotation in 0..4 {
            let holes: usize = (0..side * side)
                .filter(|i| grille.is_hole(i % side, i / side, rotation))
                .count();
            assert_eq!(holes, HALF_SIDE * HALF_SIDE);
        }
    }

    #[test]
    fn interval_yields_every_ordinal_once() {
        let mut interval = GrilleInterval::new(HALF_SIDE, 10, 30);
        for ordinal in 10..30 {
            let grille = interval.clone_next().unwrap();
            assert_eq!(grille, Grille::new(HALF_SIDE, ordinal));
        }
        assert!(interval.clone_next().is_none());
        assert!(interval.get_next().is_none());
    }

    #[test]
    fn borrowed_and_owned_retrieval_interleave() {
        let mut interval = GrilleInterval::new(HALF_SIDE, 0, 4);
        assert_eq!(*interval.get_next().unwrap(), Grille::new(HALF_SIDE, 0));
        assert_eq!(interval.clone_next().unwrap(), Grille::new(HALF_SIDE, 1));
        assert_eq!(*interval.get_next().unwrap(), Grille::new(HALF_SIDE, 2));
        assert_eq!(interval.clone_next().unwrap(), Grille::new(HALF_SIDE, 3));
        assert!(interval.get_next().is_none());
    }

    #[test]
    fn completion_runs_from_zero_to_one_hundred() {
        let mut interval = GrilleInterval::new(HALF_SIDE, 0, 4);
        assert_eq!(interval.calculate_completion(), 0.0);
        interval.get_next();
        interval.get_next();
        assert_eq!(interval.calculate_completion(), 50.0);
        interval.get_next();
        interval.get_next();
        assert_eq!(interval.calculate_completion(), 100.0);
    }

    #[test]
    fn intervals_are_disjoint_and_exhaustive() {
        for total in [1u64, 2, 10, 256, 1000, 4096] {
            for count in 1..=17usize {
                let intervals = split_into_intervals(total, count);
                assert_eq!(intervals.len(), count);

                let mut expected_begin: u64 = 0;
                for &(begin, end) in &intervals {
                    assert_eq!(begin, expected_begin);
                    assert!(end >= begin);
                    expected_begin = end;
                }
                assert_eq!(expected_begin, total);
            }
        }
    }
}
