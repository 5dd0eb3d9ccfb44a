//! CSV input and output of the batch CLI.

pub mod command_reader;
pub mod subscription_writer;
