pub mod health;
pub mod verse;
