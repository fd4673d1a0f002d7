//! Runtime values and the object model.
//!
//! Primitive values are stored inline; functions, classes and instances are
//! shared through `Rc` and compare by identity.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::{FunctionDecl, FunctionKind};
use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::interpreter::Interpreter;

/// Anything that can appear before `(`.
pub trait Callable {
    fn arity(&self) -> usize;

    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError>;
}

#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Native(Rc<NativeFunction>),
    Function(Rc<Function>),
    Class(Rc<Class>),
    Instance(Rc<Instance>),
}

impl Value {
    /// `nil` and `false` are falsy, everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Native(_) | Value::Function(_) => "function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
        }
    }

    /// What `typeof` reports: instances answer with their class name.
    pub fn type_of(&self) -> Rc<str> {
        match self {
            Value::Nil => Rc::from("$nil$"),
            Value::Instance(instance) => instance.class.name.clone(),
            other => Rc::from(other.type_name()),
        }
    }

    pub fn as_callable(&self) -> Option<&dyn Callable> {
        match self {
            Value::Native(native) => Some(native.as_ref()),
            Value::Function(function) => Some(function.as_ref()),
            Value::Class(class) => Some(class),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "$nil$"),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Number(n) => {
                if n.fract() == 0.0 {
                    write!(f, "{:.0}", n)
                } else {
                    write!(f, "{}", n)
                }
            }

            Value::String(s) => write!(f, "{}", s),

            Value::Native(native) => write!(f, "<native fn {}>", native.name),

            Value::Function(function) => write!(f, "<fn {}>", function.name()),

            Value::Class(class) => write!(f, "{}", class.name),

            Value::Instance(instance) => write!(f, "{} instance", instance.class.name),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}

// ───────────────────────────── natives ─────────────────────────────

/// A function implemented by the host.
#[derive(Debug)]
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&[Value]) -> Value,
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(&self, _: &mut Interpreter, arguments: Vec<Value>) -> Result<Value, RuntimeError> {
        Ok((self.func)(&arguments))
    }
}

// ───────────────────────────── functions ───────────────────────────

/// A user function, method or lambda together with its closure.
pub struct Function {
    pub decl: Rc<FunctionDecl>,
    pub closure: Rc<RefCell<Environment>>,
    /// Receiver of a bound method.
    pub this: Option<Value>,
}

impl Function {
    pub fn new(decl: Rc<FunctionDecl>, closure: Rc<RefCell<Environment>>) -> Self {
        Function {
            decl,
            closure,
            this: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.decl.name.lexeme
    }

    pub fn kind(&self) -> FunctionKind {
        self.decl.kind
    }

    /// A copy of this method whose body sees `instance` as `this`.
    pub fn bind(&self, instance: Value) -> Function {
        Function {
            decl: self.decl.clone(),
            closure: self.closure.clone(),
            this: Some(instance),
        }
    }
}

impl Callable for Function {
    fn arity(&self) -> usize {
        self.decl.params.len()
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        interpreter.call_function(self, arguments)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

// ───────────────────────────── classes ─────────────────────────────

pub struct Class {
    pub name: Rc<str>,
    pub superclass: Option<Rc<Class>>,
    methods: HashMap<Rc<str>, Rc<Function>>,
}

impl Class {
    pub fn new(
        name: Rc<str>,
        superclass: Option<Rc<Class>>,
        methods: HashMap<Rc<str>, Rc<Function>>,
    ) -> Self {
        Class {
            name,
            superclass,
            methods,
        }
    }

    /// Look a method up along the inheritance chain. Also returns the class
    /// that declares it.
    pub fn find_method(self: &Rc<Self>, name: &str) -> Option<(Rc<Class>, Rc<Function>)> {
        let mut class = self;

        loop {
            if let Some(method) = class.methods.get(name) {
                return Some((class.clone(), method.clone()));
            }

            class = class.superclass.as_ref()?;
        }
    }
}

impl Callable for Rc<Class> {
    fn arity(&self) -> usize {
        self.find_method("init")
            .map_or(0, |(_, init)| init.decl.params.len())
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let instance = Rc::new(Instance::new(self.clone()));

        if let Some((declaring, init)) = self.find_method("init") {
            let bound = instance.bind(&declaring, &init);
            bound.call(interpreter, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

// ───────────────────────────── instances ───────────────────────────

pub struct Instance {
    pub class: Rc<Class>,
    fields: RefCell<HashMap<Rc<str>, Value>>,
    /// Bound methods, keyed by declaring class and name so `super.m` and an
    /// overriding `m` never share an entry.
    bound: RefCell<HashMap<(*const Class, Rc<str>), Rc<Function>>>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Instance {
            class,
            fields: RefCell::new(HashMap::new()),
            bound: RefCell::new(HashMap::new()),
        }
    }

    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields.borrow().get(name).cloned()
    }

    pub fn set_field(&self, name: Rc<str>, value: Value) {
        self.fields.borrow_mut().insert(name, value);
    }

    /// `method` (declared by `declaring`) bound to this instance, memoized.
    pub fn bind(self: &Rc<Self>, declaring: &Rc<Class>, method: &Rc<Function>) -> Rc<Function> {
        let key = (Rc::as_ptr(declaring), method.decl.name.lexeme.clone());

        if let Some(bound) = self.bound.borrow().get(&key) {
            return bound.clone();
        }

        let bound = Rc::new(method.bind(Value::Instance(self.clone())));
        self.bound.borrow_mut().insert(key, bound.clone());

        bound
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.class.name)
    }
}
