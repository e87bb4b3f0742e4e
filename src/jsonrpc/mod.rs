pub mod methods;
pub mod protocol;
pub mod router;
