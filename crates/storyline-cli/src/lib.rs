pub mod cmd;
pub mod inputs;
pub mod output;
