pub mod authority;
pub mod signature;
