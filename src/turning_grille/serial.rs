use super::Grille;
use super::GrilleInterval;
use super::TurningGrilleCracker;
use super::TurningGrilleCrackerImplDetails;

use std::sync::Arc;

/// Single-threaded baseline: one interval over the whole ordinal space,
/// consumed through the borrowed cursor.
pub struct TurningGrilleCrackerSerial;

impl TurningGrilleCrackerImplDetails for TurningGrilleCrackerSerial {
    fn brute_force(self: Arc<Self>, cracker: &Arc<TurningGrilleCracker>) {
        let mut grille_interval: GrilleInterval =
            GrilleInterval::new(cracker.side_length / 2, 0, cracker.grille_count);

        loop {
            let grille: Option<&Grille> = grille_interval.get_next();
            let grille_count_so_far: u64 = match grille {
                None => break,
                Some(grille) => cracker.apply_grille(grille),
            };
            cracker.register_one_applied_grille(grille_count_so_far);
        }
    }
}

impl TurningGrilleCrackerSerial {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TurningGrilleCrackerSerial {
    fn default() -> Self {
        Self::new()
    }
}
