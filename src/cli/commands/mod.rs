pub mod ean;
pub mod health;
pub mod pipeline;
