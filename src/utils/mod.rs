pub mod ids;
pub mod money;
