/// Frame-to-frame displacements
pub mod displacement;

/// Rest periods and jumps
pub mod delay;

/// Mean squared displacement
pub mod msd;

/// Angular displacements
pub mod angles;

/// Motion activity over time
pub mod activity;

/// Fitted delay, displacement and heading distributions
pub mod distributions;

/// Diffusion constant comparison across datasets
pub mod compare;
