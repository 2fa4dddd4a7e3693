pub mod assignment;
pub mod booking;
pub mod driver;
pub mod vehicle;
