use crate::error::RuntimeError;
use crate::resolver::Address;
use crate::token::Token;
use crate::value::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// One scope of runtime storage. Slots are addressed by index; `None` marks a
/// declared variable that has not been given a value yet.
#[derive(Debug)]
pub struct Environment {
    slots: Vec<Option<Value>>,
    depth: usize,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    /// The root (natives) scope.
    pub fn new() -> Self {
        Environment {
            slots: Vec::new(),
            depth: 0,
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        let depth = enclosing.borrow().depth + 1;

        Environment {
            slots: Vec::new(),
            depth,
            enclosing: Some(enclosing),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Append a slot without going through an address. Used for natives and
    /// implicit bindings such as `this` and `super`.
    pub fn push(&mut self, value: Option<Value>) {
        self.slots.push(value);
    }

    /// Create the slot at `address`, which must be the next free slot of this
    /// very scope.
    pub fn define(
        &mut self,
        address: Address,
        value: Option<Value>,
        name: &Token,
    ) -> Result<(), RuntimeError> {
        if address.depth != self.depth || address.index != self.slots.len() {
            return Err(RuntimeError::UndefinedIdentifier { name: name.clone() });
        }

        self.slots.push(value);
        Ok(())
    }

    pub fn get(&self, address: Address, name: &Token) -> Result<Value, RuntimeError> {
        if address.depth == self.depth {
            return match self.slots.get(address.index) {
                Some(Some(value)) => Ok(value.clone()),
                Some(None) => Err(RuntimeError::UninitializedIdentifier { name: name.clone() }),
                None => Err(RuntimeError::UndefinedIdentifier { name: name.clone() }),
            };
        }

        match &self.enclosing {
            Some(enclosing) if address.depth < self.depth => enclosing.borrow().get(address, name),
            _ => Err(RuntimeError::UndefinedIdentifier { name: name.clone() }),
        }
    }

    pub fn assign(
        &mut self,
        address: Address,
        value: Value,
        name: &Token,
    ) -> Result<(), RuntimeError> {
        if address.depth == self.depth {
            return match self.slots.get_mut(address.index) {
                Some(slot) => {
                    *slot = Some(value);
                    Ok(())
                }
                None => Err(RuntimeError::UndefinedIdentifier { name: name.clone() }),
            };
        }

        match &self.enclosing {
            Some(enclosing) if address.depth < self.depth => {
                enclosing.borrow_mut().assign(address, value, name)
            }
            _ => Err(RuntimeError::UndefinedIdentifier { name: name.clone() }),
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    fn name(text: &str) -> Token {
        Token::new(TokenType::IDENTIFIER, text, 1, 1)
    }

    fn at(depth: usize, index: usize) -> Address {
        Address { depth, index }
    }

    #[test]
    fn child_depth_follows_parent() {
        let root = Rc::new(RefCell::new(Environment::new()));
        let child = Rc::new(RefCell::new(Environment::with_enclosing(root.clone())));
        let grandchild = Environment::with_enclosing(child);

        assert_eq!(root.borrow().depth(), 0);
        assert_eq!(grandchild.depth(), 2);
    }

    #[test]
    fn reads_walk_to_the_addressed_scope() {
        let root = Rc::new(RefCell::new(Environment::new()));
        root.borrow_mut().push(Some(Value::Number(1.0)));

        let mut child = Environment::with_enclosing(root);
        child
            .define(at(1, 0), Some(Value::Bool(true)), &name("b"))
            .unwrap();

        assert_eq!(child.get(at(0, 0), &name("a")).unwrap(), Value::Number(1.0));
        assert_eq!(child.get(at(1, 0), &name("b")).unwrap(), Value::Bool(true));
    }

    #[test]
    fn assignment_reaches_enclosing_scope() {
        let root = Rc::new(RefCell::new(Environment::new()));
        root.borrow_mut().push(Some(Value::Nil));

        let mut child = Environment::with_enclosing(root.clone());
        child
            .assign(at(0, 0), Value::Number(7.0), &name("a"))
            .unwrap();

        assert_eq!(
            root.borrow().get(at(0, 0), &name("a")).unwrap(),
            Value::Number(7.0)
        );
    }

    #[test]
    fn uninitialized_slot_is_reported() {
        let mut env = Environment::new();
        env.define(at(0, 0), None, &name("x")).unwrap();

        assert!(matches!(
            env.get(at(0, 0), &name("x")),
            Err(RuntimeError::UninitializedIdentifier { .. })
        ));
    }

    #[test]
    fn out_of_range_addresses_are_undefined() {
        let env = Environment::new();

        assert!(matches!(
            env.get(at(0, 3), &name("x")),
            Err(RuntimeError::UndefinedIdentifier { .. })
        ));
        assert!(matches!(
            env.get(at(2, 0), &name("x")),
            Err(RuntimeError::UndefinedIdentifier { .. })
        ));
    }

    #[test]
    fn define_rejects_misplaced_address() {
        let mut env = Environment::new();

        assert!(env.define(at(0, 1), None, &name("x")).is_err());
        assert!(env.define(at(1, 0), None, &name("x")).is_err());
        assert!(env.define(at(0, 0), None, &name("x")).is_ok());
    }
}
