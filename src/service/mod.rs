pub mod housing;
pub mod predictor;
pub mod seed;
