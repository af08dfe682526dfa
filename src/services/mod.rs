pub mod baseline;
pub mod calendar;
pub mod climate;
pub mod crops;
pub mod gdd;
pub mod onset;
pub mod risk;
pub mod series;
pub mod suitability;
pub mod window;
