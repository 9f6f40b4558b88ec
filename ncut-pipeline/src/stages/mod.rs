pub mod discretization;
pub mod embedding;
