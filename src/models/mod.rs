pub mod factory;
pub mod gbdt;
pub mod linear;
pub mod predictor;

pub use predictor::Predictor;
