pub mod admin;
pub mod cart;
pub mod orders;
pub mod products;
