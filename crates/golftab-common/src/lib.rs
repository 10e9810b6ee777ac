pub mod code;
pub mod identity;
pub mod participant;
pub mod protocol;
pub mod room;
pub mod score;
