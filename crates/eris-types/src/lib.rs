pub mod archive;
pub mod destination;
pub mod failure;
