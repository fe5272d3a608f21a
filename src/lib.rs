pub mod queue;
pub mod turning_grille;

pub use turning_grille::CrackerConfig;
pub use turning_grille::CrackerError;
pub use turning_grille::TurningGrilleCracker;
