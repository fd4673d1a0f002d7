pub mod ast;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod natives;
pub mod output;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod session;
mod stack;
pub mod token;
pub mod value;
