// Domain layer - Plain data and pure logic
pub mod error;
pub mod geo;
pub mod region;
pub mod rules;
pub mod selection;
pub mod series;
