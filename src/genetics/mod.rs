pub mod genome;

pub use genome::{Appearance, Aptitudes, Genome, Personality};
