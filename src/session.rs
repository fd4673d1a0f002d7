//! Driver: parse, resolve and evaluate one declaration at a time.
//!
//! A [`Session`] keeps the resolver's globals scope and the interpreter's
//! globals environment in step across any number of sources, so a later
//! `run` sees declarations made by an earlier one.

use log::{debug, info};

use crate::ast::{NodeId, Stmt};
use crate::error::{LoxError, Result};
use crate::interpreter::Interpreter;
use crate::natives::natives;
use crate::output::{OutputSink, StdoutSink};
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;

pub struct Session {
    resolver: Resolver,
    interpreter: Interpreter,
    next_id: NodeId,
}

impl Session {
    pub fn new(output: Box<dyn OutputSink>) -> Self {
        let natives = natives();
        let resolver = Resolver::new(natives.iter().map(|native| native.name));
        let interpreter = Interpreter::new(natives, output);

        info!("Session started");

        Session {
            resolver,
            interpreter,
            next_id: NodeId(0),
        }
    }

    /// A session printing to standard output.
    pub fn with_stdout() -> Self {
        Self::new(Box::new(StdoutSink))
    }

    /// Execute `source`, stopping at the first error of any kind.
    pub fn run(&mut self, source: &str) -> Result<()> {
        let mut parser = Parser::starting_at(Scanner::new(source), self.next_id);

        loop {
            let next = parser.next_declaration();
            self.next_id = parser.next_node_id();

            match next? {
                Some(stmt) => self.execute(&stmt)?,
                None => break,
            }
        }

        info!("Run completed");
        Ok(())
    }

    /// Execute `source`, skipping declarations that fail statically and
    /// collecting their errors. A runtime error still ends the run and is
    /// returned as `Err`.
    pub fn run_recovering(&mut self, source: &str) -> Result<Vec<LoxError>> {
        let mut parser = Parser::starting_at(Scanner::new(source), self.next_id);
        let mut errors = Vec::new();

        loop {
            let next = parser.next_declaration();
            self.next_id = parser.next_node_id();

            let outcome = match next {
                Ok(Some(stmt)) => self.execute(&stmt),
                Ok(None) => break,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(()) => {}
                Err(e) if e.is_static() => {
                    debug!("Skipping declaration: {}", e);
                    errors.push(e);
                }
                Err(e) => return Err(e),
            }
        }

        info!("Run completed with {} static error(s)", errors.len());
        Ok(errors)
    }

    fn execute(&mut self, stmt: &Stmt) -> Result<()> {
        let locals = self.resolver.resolve(stmt)?;
        self.interpreter.absorb(locals);
        self.interpreter.interpret(stmt)?;

        Ok(())
    }
}
