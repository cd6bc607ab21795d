pub mod events;
pub mod jobs;
pub mod printer;
