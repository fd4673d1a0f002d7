//! Where `print` statements go.

use std::cell::RefCell;
use std::rc::Rc;

pub trait OutputSink {
    /// Receive the textual form of one printed value.
    fn print(&mut self, text: &str);
}

/// Writes each value on its own line to standard output.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn print(&mut self, text: &str) {
        println!("{}", text);
    }
}

/// Records printed values. Clones share the same buffer, so a test can keep
/// one handle and give the other to the interpreter.
#[derive(Debug, Clone, Default)]
pub struct BufferSink {
    lines: Rc<RefCell<Vec<String>>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }
}

impl OutputSink for BufferSink {
    fn print(&mut self, text: &str) {
        self.lines.borrow_mut().push(text.to_string());
    }
}
