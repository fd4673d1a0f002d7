use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{ClassDecl, Expr, FunctionKind, NodeId, Stmt};
use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::output::OutputSink;
use crate::resolver::{Address, Locals};
use crate::stack::ensure_sufficient_stack;
use crate::token::{Literal, Token, TokenType};
use crate::value::{Class, Function, Instance, NativeFunction, Value};

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Break,
    Return(Value),
}

/// Convenient alias for interpreter results.
pub type IResult<T> = Result<T, RuntimeError>;

pub struct Interpreter {
    environment: Rc<RefCell<Environment>>,
    locals: Locals,
    output: Box<dyn OutputSink>,
}

impl Interpreter {
    /// Creates a new Interpreter with `natives` in the root scope and an
    /// empty globals scope below it.
    pub fn new(natives: Vec<NativeFunction>, output: Box<dyn OutputSink>) -> Self {
        info!("Initializing Interpreter");

        let mut root = Environment::new();
        for native in natives {
            debug!("Defining native function '{}'", native.name);
            root.push(Some(Value::Native(Rc::new(native))));
        }

        let globals = Environment::with_enclosing(Rc::new(RefCell::new(root)));

        Self {
            environment: Rc::new(RefCell::new(globals)),
            locals: HashMap::new(),
            output,
        }
    }

    /// Make the addresses of a freshly resolved statement available.
    pub fn absorb(&mut self, locals: Locals) {
        self.locals.extend(locals);
    }

    /// Interprets one resolved top-level statement.
    pub fn interpret(&mut self, stmt: &Stmt) -> IResult<()> {
        self.execute(stmt)?;
        Ok(())
    }

    // ───────────────────────── statements ─────────────────────────

    fn execute(&mut self, stmt: &Stmt) -> IResult<Flow> {
        ensure_sufficient_stack(|| self.execute_stmt(stmt))
    }

    fn execute_stmt(&mut self, stmt: &Stmt) -> IResult<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                debug!("Printing value: {}", value);
                self.output.print(&value.to_string());
            }

            Stmt::Var {
                id,
                name,
                initializer,
            } => {
                let value = match initializer {
                    Some(expr) => Some(self.evaluate(expr)?),
                    None => None,
                };

                let address = self.address(*id, name)?;
                self.environment
                    .borrow_mut()
                    .define(address, value, name)?;

                debug!("Variable '{}' defined at {:?}", name.lexeme, address);
            }

            Stmt::Block(statements) => {
                let env = Environment::with_enclosing(self.environment.clone());
                return self.execute_block(statements, env);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(else_branch) = else_branch {
                    return self.execute(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Flow::Normal => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
            }

            Stmt::Break(_) => return Ok(Flow::Break),

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                return Ok(Flow::Return(value));
            }

            Stmt::Function(decl) => {
                let function = Function::new(decl.clone(), self.environment.clone());
                let address = self.address(decl.id, &decl.name)?;

                self.environment.borrow_mut().define(
                    address,
                    Some(Value::Function(Rc::new(function))),
                    &decl.name,
                )?;

                info!("Function '{}' defined", decl.name.lexeme);
            }

            Stmt::Class(decl) => self.declare_class(decl)?,
        }

        Ok(Flow::Normal)
    }

    /// Run `statements` inside `env`; the previous environment is restored
    /// however the block exits.
    fn execute_block(&mut self, statements: &[Stmt], env: Environment) -> IResult<Flow> {
        let previous = std::mem::replace(&mut self.environment, Rc::new(RefCell::new(env)));

        let result = self.execute_all(statements);

        self.environment = previous;
        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> IResult<Flow> {
        for stmt in statements {
            match self.execute(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }

        Ok(Flow::Normal)
    }

    fn declare_class(&mut self, decl: &ClassDecl) -> IResult<()> {
        let address = self.address(decl.id, &decl.name)?;
        self.environment
            .borrow_mut()
            .define(address, None, &decl.name)?;

        let superclass = match &decl.superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                other => {
                    return Err(RuntimeError::ClassExpected {
                        found: other.type_name().to_string(),
                        name: expr.token().clone(),
                    })
                }
            },
            None => None,
        };

        // Methods close over the class scope, which holds `super` when there is one.
        let mut class_env = Environment::with_enclosing(self.environment.clone());
        if let Some(superclass) = &superclass {
            class_env.push(Some(Value::Class(superclass.clone())));
        }
        let class_env = Rc::new(RefCell::new(class_env));

        let methods = decl
            .methods
            .iter()
            .map(|method| {
                let function = Function::new(method.clone(), class_env.clone());
                (method.name.lexeme.clone(), Rc::new(function))
            })
            .collect();

        let class = Class::new(decl.name.lexeme.clone(), superclass, methods);
        self.environment.borrow_mut().assign(
            address,
            Value::Class(Rc::new(class)),
            &decl.name,
        )?;

        info!("Class '{}' defined", decl.name.lexeme);
        Ok(())
    }

    // ───────────────────────── calls ─────────────────────────

    /// Invoke a user function: a fresh scope under its closure holding
    /// `this` (for bound methods) and the parameters.
    pub(crate) fn call_function(
        &mut self,
        function: &Function,
        arguments: Vec<Value>,
    ) -> IResult<Value> {
        debug!("Calling user-defined function '{}'", function.name());

        let mut env = Environment::with_enclosing(function.closure.clone());
        if let Some(this) = &function.this {
            env.push(Some(this.clone()));
        }
        for argument in arguments {
            env.push(Some(argument));
        }

        let flow = self.execute_block(&function.decl.body, env)?;

        if function.kind() == FunctionKind::Initializer {
            if let Some(this) = &function.this {
                return Ok(this.clone());
            }
        }

        match flow {
            Flow::Return(value) => {
                debug!("Function '{}' returned: {}", function.name(), value);
                Ok(value)
            }
            _ => Ok(Value::Nil),
        }
    }

    /// A bound method as a value, or the result of running it for properties.
    fn bound_value(&mut self, bound: Rc<Function>) -> IResult<Value> {
        if bound.kind() == FunctionKind::Property {
            return self.call_function(&bound, Vec::new());
        }

        Ok(Value::Function(bound))
    }

    fn get_property(&mut self, instance: &Rc<Instance>, name: &Token) -> IResult<Value> {
        if let Some(value) = instance.field(&name.lexeme) {
            return Ok(value);
        }

        match instance.class.find_method(&name.lexeme) {
            Some((declaring, method)) => {
                let bound = instance.bind(&declaring, &method);
                self.bound_value(bound)
            }
            None => Err(RuntimeError::UndefinedProperty {
                instance: format!("{} instance", instance.class.name),
                name: name.clone(),
            }),
        }
    }

    // ───────────────────────── expressions ─────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> IResult<Value> {
        ensure_sufficient_stack(|| self.evaluate_expr(expr))
    }

    fn evaluate_expr(&mut self, expr: &Expr) -> IResult<Value> {
        match expr {
            Expr::Literal(token) => Ok(literal_value(token)),

            Expr::Variable { id, name } => self.look_up(*id, name),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;
                let address = self.address(*id, name)?;

                self.environment
                    .borrow_mut()
                    .assign(address, value.clone(), name)?;

                Ok(value)
            }

            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;

                match operator.token_type {
                    TokenType::MINUS => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        other => Err(mismatch("number", &other, operator)),
                    },
                    _ => Ok(Value::Bool(!right.is_truthy())),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let Some(callable) = callee.as_callable() else {
                    return Err(RuntimeError::CallableExpected {
                        callee: callee.to_string(),
                        paren: paren.clone(),
                    });
                };

                if callable.arity() != arguments.len() {
                    return Err(RuntimeError::ArgumentCountMismatch {
                        expected: callable.arity(),
                        actual: arguments.len(),
                        callee: callee.to_string(),
                        paren: paren.clone(),
                    });
                }

                let mut values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                debug!("Calling {}", callee);
                callable.call(self, values)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => self.get_property(&instance, name),
                other => Err(RuntimeError::ObjectExpected {
                    found: other.type_name().to_string(),
                    name: name.clone(),
                }),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let instance = match self.evaluate(object)? {
                    Value::Instance(instance) => instance,
                    other => {
                        return Err(RuntimeError::ObjectExpected {
                            found: other.type_name().to_string(),
                            name: name.clone(),
                        })
                    }
                };

                let value = self.evaluate(value)?;
                instance.set_field(name.lexeme.clone(), value.clone());

                Ok(value)
            }

            Expr::This { id, keyword } => self.look_up(*id, keyword),

            Expr::Super {
                id,
                this_id,
                keyword,
                method,
            } => {
                let superclass = match self.look_up(*id, keyword)? {
                    Value::Class(class) => class,
                    other => {
                        return Err(RuntimeError::ClassExpected {
                            found: other.type_name().to_string(),
                            name: keyword.clone(),
                        })
                    }
                };

                let this = Token::synthetic(TokenType::THIS, "this", keyword);
                let instance = match self.look_up(*this_id, &this)? {
                    Value::Instance(instance) => instance,
                    other => {
                        return Err(RuntimeError::ObjectExpected {
                            found: other.type_name().to_string(),
                            name: method.clone(),
                        })
                    }
                };

                let Some((declaring, function)) = superclass.find_method(&method.lexeme) else {
                    return Err(RuntimeError::UndefinedProperty {
                        instance: format!("{} instance", instance.class.name),
                        name: method.clone(),
                    });
                };

                let bound = instance.bind(&declaring, &function);
                self.bound_value(bound)
            }

            Expr::Lambda(decl) => Ok(Value::Function(Rc::new(Function::new(
                decl.clone(),
                self.environment.clone(),
            )))),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> IResult<Value> {
        match operator.token_type {
            TokenType::OR => {
                let left = self.evaluate(left)?;
                if left.is_truthy() {
                    return Ok(left);
                }
                return self.evaluate(right);
            }
            TokenType::AND => {
                let left = self.evaluate(left)?;
                if !left.is_truthy() {
                    return Ok(left);
                }
                return self.evaluate(right);
            }
            TokenType::COMMA => {
                self.evaluate(left)?;
                return self.evaluate(right);
            }
            _ => {}
        }

        let left = self.evaluate(left)?;
        let right = self.evaluate(right)?;

        match operator.token_type {
            TokenType::PLUS => match (&left, &right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(_), _) | (_, Value::String(_)) => {
                    Ok(Value::String(Rc::from(format!("{}{}", left, right))))
                }
                _ => Err(RuntimeError::TypeMismatch {
                    expected: "numbers or a string".to_string(),
                    actual: format!("{} and {}", left.type_name(), right.type_name()),
                    at: operator.clone(),
                }),
            },

            TokenType::MINUS | TokenType::STAR | TokenType::SLASH => {
                let (a, b) = numbers(&left, &right, operator)?;

                match operator.token_type {
                    TokenType::MINUS => Ok(Value::Number(a - b)),
                    TokenType::STAR => Ok(Value::Number(a * b)),
                    _ if b == 0.0 => Err(RuntimeError::DivideByZero {
                        dividend: a,
                        at: operator.clone(),
                    }),
                    _ => Ok(Value::Number(a / b)),
                }
            }

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(equals(&left, &right, operator)?)),
            TokenType::BANG_EQUAL => Ok(Value::Bool(!equals(&left, &right, operator)?)),

            TokenType::LESS => {
                let ordering = compare(&left, &right, operator)?;
                Ok(Value::Bool(matches!(ordering, Some(Ordering::Less))))
            }
            TokenType::LESS_EQUAL => {
                let ordering = compare(&left, &right, operator)?;
                Ok(Value::Bool(matches!(
                    ordering,
                    Some(Ordering::Less | Ordering::Equal)
                )))
            }
            TokenType::GREATER => {
                let ordering = compare(&left, &right, operator)?;
                Ok(Value::Bool(matches!(ordering, Some(Ordering::Greater))))
            }
            TokenType::GREATER_EQUAL => {
                let ordering = compare(&left, &right, operator)?;
                Ok(Value::Bool(matches!(
                    ordering,
                    Some(Ordering::Greater | Ordering::Equal)
                )))
            }

            _ => Err(RuntimeError::TypeMismatch {
                expected: "a binary operator".to_string(),
                actual: operator.lexeme.to_string(),
                at: operator.clone(),
            }),
        }
    }

    // ───────────────────────── variables ─────────────────────────

    fn address(&self, id: NodeId, name: &Token) -> IResult<Address> {
        self.locals
            .get(&id)
            .copied()
            .ok_or_else(|| RuntimeError::UndefinedIdentifier { name: name.clone() })
    }

    fn look_up(&self, id: NodeId, name: &Token) -> IResult<Value> {
        let address = self.address(id, name)?;
        self.environment.borrow().get(address, name)
    }
}

fn literal_value(token: &Token) -> Value {
    match token.literal() {
        Some(Literal::Number(n)) => Value::Number(*n),
        Some(Literal::Str(s)) => Value::String(s.clone()),
        Some(Literal::Bool(b)) => Value::Bool(*b),
        Some(Literal::Nil) | None => Value::Nil,
    }
}

fn mismatch(expected: &str, actual: &Value, at: &Token) -> RuntimeError {
    RuntimeError::TypeMismatch {
        expected: expected.to_string(),
        actual: actual.type_name().to_string(),
        at: at.clone(),
    }
}

fn numbers(left: &Value, right: &Value, operator: &Token) -> IResult<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        (Value::Number(_), other) | (other, _) => Err(mismatch("number", other, operator)),
    }
}

/// `nil` only equals `nil`; other values must share a type.
fn equals(left: &Value, right: &Value, operator: &Token) -> IResult<bool> {
    match (left, right) {
        (Value::Nil, _) | (_, Value::Nil) => Ok(left == right),
        _ if left.type_name() == right.type_name() => Ok(left == right),
        _ => Err(mismatch(left.type_name(), right, operator)),
    }
}

/// `nil` sorts before everything; numbers, strings and booleans are ordered
/// among themselves. `None` for NaN, which fails every ordering test.
fn compare(left: &Value, right: &Value, operator: &Token) -> IResult<Option<Ordering>> {
    match (left, right) {
        (Value::Nil, Value::Nil) => Ok(Some(Ordering::Equal)),
        (Value::Nil, _) => Ok(Some(Ordering::Less)),
        (_, Value::Nil) => Ok(Some(Ordering::Greater)),
        (Value::Number(a), Value::Number(b)) => Ok(a.partial_cmp(b)),
        (Value::String(a), Value::String(b)) => Ok(Some(a.cmp(b))),
        (Value::Bool(a), Value::Bool(b)) => Ok(Some(a.cmp(b))),
        _ if left.type_name() == right.type_name() => {
            Err(mismatch("number, string or boolean", left, operator))
        }
        _ => Err(mismatch(left.type_name(), right, operator)),
    }
}
