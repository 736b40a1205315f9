pub mod customer;
pub mod feedback;
pub mod fleet;
pub mod location;
pub mod trip;
