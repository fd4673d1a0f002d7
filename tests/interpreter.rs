use rox::error::{LoxError, ParseError, ResolveError, RuntimeError};
use rox::output::BufferSink;
use rox::session::Session;

fn session() -> (Session, BufferSink) {
    let sink = BufferSink::new();
    (Session::new(Box::new(sink.clone())), sink)
}

fn run(source: &str) -> Vec<String> {
    let (mut session, sink) = session();

    if let Err(e) = session.run(source) {
        panic!("program failed: {}", e);
    }

    sink.lines()
}

fn run_error(source: &str) -> LoxError {
    let (mut session, _) = session();

    session.run(source).expect_err("program should fail")
}

fn runtime_error(source: &str) -> RuntimeError {
    match run_error(source) {
        LoxError::Runtime(e) => e,
        other => panic!("expected a runtime error, got {}", other),
    }
}

// ───────────────────────── scoping ─────────────────────────

#[test]
fn block_shadows_global_and_restores_it() {
    let source = "
var x = 1;
print x;
{
    var x = 2;
    print x;
}
print x;
";

    assert_eq!(run(source), ["1", "2", "1"]);
}

#[test]
fn nested_blocks_may_shadow_but_not_redeclare() {
    assert_eq!(
        run("{ var x = 1; print x; { var x = 2; print x; } }"),
        ["1", "2"]
    );

    let LoxError::Resolve(ResolveError::DuplicateIdentifier { name }) =
        run_error("{ var x = 1; var x = 2; print x; }")
    else {
        panic!("expected duplicate identifier");
    };
    assert_eq!(&*name.lexeme, "x");
}

#[test]
fn globals_can_be_redeclared() {
    assert_eq!(run("var a = 1; var a = 2; print a;"), ["2"]);
}

#[test]
fn reading_uninitialized_variable_fails() {
    let RuntimeError::UninitializedIdentifier { name } = runtime_error("var x;\nprint x;") else {
        panic!("expected uninitialized identifier");
    };

    assert_eq!(&*name.lexeme, "x");
    assert_eq!((name.line, name.column), (2, 7));
}

#[test]
fn unused_local_aborts_the_declaration() {
    let LoxError::Resolve(ResolveError::UnusedVariable { name }) =
        run_error("{\n    var x = 1;\n    var y = 2;\n    print x;\n}")
    else {
        panic!("expected unused variable");
    };

    assert_eq!(&*name.lexeme, "y");
}

// ───────────────────────── control flow ─────────────────────────

#[test]
fn desugared_for_loop() {
    assert_eq!(
        run("for(var i = 0; i < 5; i = i + 1)\n    print i;"),
        ["0", "1", "2", "3", "4"]
    );
}

#[test]
fn for_loop_clauses_are_independent() {
    let expected = ["0", "1", "2", "3", "4"];

    assert_eq!(run("var i = 0; for (; i < 5; i = i + 1) print i;"), expected);
    assert_eq!(
        run("for (var i = 0;; i = i + 1) { if (i >= 5) break; print i; }"),
        expected
    );
    assert_eq!(
        run("for (var i = 0; i < 5;) { print i; i = i + 1; }"),
        expected
    );
}

#[test]
fn break_leaves_only_the_innermost_loop() {
    let source = "
for(var i = 0; i < 5; i = i + 1)
{
    var j = i;
    while(true)
    {
        if(j <= 0)
        {
            break;
        }
        print j;
        j = j - 1;
    }
}
";

    assert_eq!(
        run(source),
        ["1", "2", "1", "3", "2", "1", "4", "3", "2", "1"]
    );
}

#[test]
fn return_unwinds_loops_and_blocks() {
    let source = "
fun find() {
    for (var i = 0; i < 10; i = i + 1) {
        if (i == 3) { return i; }
    }
    return -1;
}
print find();
";

    assert_eq!(run(source), ["3"]);
}

#[test]
fn if_else_and_ternary() {
    assert_eq!(
        run("if (nil) print 1; else print 2; print 0 ? \"yes\" : \"no\";"),
        ["2", "yes"]
    );
}

// ───────────────────────── operators ─────────────────────────

#[test]
fn logical_operators_return_operands() {
    assert_eq!(
        run("print nil or \"x\"; print 0 and \"y\"; print false and 1;"),
        ["x", "y", "false"]
    );
}

#[test]
fn comma_yields_the_right_operand() {
    assert_eq!(run("var a = 0; print (a = 1, a + 1); print a;"), ["2", "1"]);
}

#[test]
fn plus_concatenates_when_either_side_is_a_string() {
    assert_eq!(
        run("print \"n=\" + 1.5; print 1 + \"a\"; print 2 + 3;"),
        ["n=1.5", "1a", "5"]
    );

    assert!(matches!(
        runtime_error("print true + 1;"),
        RuntimeError::TypeMismatch { .. }
    ));
}

#[test]
fn arithmetic_needs_numbers() {
    assert_eq!(run("print 7 / 2; print -(3 - 5) * 2;"), ["3.5", "4"]);

    assert!(matches!(
        runtime_error("print \"a\" - 1;"),
        RuntimeError::TypeMismatch { .. }
    ));
    assert!(matches!(
        runtime_error("print -\"a\";"),
        RuntimeError::TypeMismatch { .. }
    ));
}

#[test]
fn division_by_zero() {
    let RuntimeError::DivideByZero { dividend, .. } = runtime_error("print 4 / (2 - 2);") else {
        panic!("expected divide by zero");
    };

    assert_eq!(dividend, 4.0);
}

#[test]
fn comparisons() {
    let source = "
print nil == nil;
print nil == 1;
print nil < 1;
print \"a\" < \"b\";
print false < true;
print 2 >= 2;
print 1 != 2;
";

    assert_eq!(
        run(source),
        ["true", "false", "true", "true", "true", "true", "true"]
    );
}

#[test]
fn comparing_different_types_fails() {
    assert!(matches!(
        runtime_error("print 1 == \"1\";"),
        RuntimeError::TypeMismatch { .. }
    ));
    assert!(matches!(
        runtime_error("print 1 < true;"),
        RuntimeError::TypeMismatch { .. }
    ));
}

#[test]
fn functions_compare_by_identity_only() {
    assert_eq!(
        run("fun f() {} fun g() {} print f == f; print f == g;"),
        ["true", "false"]
    );

    assert!(matches!(
        runtime_error("fun f() {} print f < f;"),
        RuntimeError::TypeMismatch { .. }
    ));
}

// ───────────────────────── functions ─────────────────────────

#[test]
fn natives() {
    let source = "
print typeof(nil);
print typeof(1);
print typeof(\"s\");
print typeof(clock);
print clock() > 0;
print clock;
";

    assert_eq!(
        run(source),
        ["$nil$", "number", "string", "function", "true", "<native fn clock>"]
    );
}

#[test]
fn wrong_argument_count() {
    let RuntimeError::ArgumentCountMismatch {
        expected,
        actual,
        callee,
        ..
    } = runtime_error("typeof(1, 2, 3);")
    else {
        panic!("expected argument count mismatch");
    };

    assert_eq!((expected, actual), (1, 3));
    assert_eq!(callee, "<native fn typeof>");
}

#[test]
fn calling_a_non_callable() {
    let error = runtime_error("typeof(1)(\"hello\");");

    assert!(matches!(error, RuntimeError::CallableExpected { .. }));
    assert!(error
        .to_string()
        .contains("You can only call functions and classes"));
}

#[test]
fn arguments_are_not_evaluated_on_arity_mismatch() {
    let (mut session, sink) = session();
    let result = session.run("fun f(a) {} fun loud() { print \"evaluated\"; return 1; } f(loud(), loud());");

    assert!(matches!(
        result,
        Err(LoxError::Runtime(RuntimeError::ArgumentCountMismatch { .. }))
    ));
    assert!(sink.lines().is_empty());
}

#[test]
fn parameters_shadow_outer_names() {
    let source = "
fun Greet(name)
{
    var userName = \"error\";
    fun BuildMessage(userName)
    {
        return \"Hello \" + userName;
    }
    userName = userName + \"hehe\";
    print \"Greeting \" + name;
    return BuildMessage(name);
}
print Greet(\"Abdallah\");
";

    assert_eq!(run(source), ["Greeting Abdallah", "Hello Abdallah"]);
}

#[test]
fn nested_parameter_shadowing() {
    let source = "
fun fn1(a, b)
{
    fun fn2(a, b)
    {
        fun fn3(a, b)
        {
            return a + 3 + b + 3;
        }
        return fn3(a + 2, b + 2);
    }
    return fn2(a + 1, b + 1);
}
print fn1(1, 2);
";

    assert_eq!(run(source), ["15"]);
}

#[test]
fn recursion() {
    let source = "
fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }
print fib(10);
{
    fun down(n) { if (n > 0) return down(n - 1); return \"done\"; }
    print down(3);
}
";

    assert_eq!(run(source), ["55", "done"]);
}

#[test]
fn functions_without_return_yield_nil() {
    assert_eq!(run("fun f() {} print f();"), ["$nil$"]);
}

#[test]
fn closures_capture_their_environment() {
    let source = "
fun makeCounter() {
    var i = 0;
    fun count() { i = i + 1; return i; }
    return count;
}
var a = makeCounter();
var b = makeCounter();
print a();
print a();
print b();
";

    assert_eq!(run(source), ["1", "2", "1"]);
}

#[test]
fn closures_from_one_block_share_variables() {
    let source = "
var get;
var set;
{
    var v = 1;
    fun g() { return v; }
    fun s(x) { v = x; }
    get = g;
    set = s;
}
set(5);
print get();
";

    assert_eq!(run(source), ["5"]);
}

#[test]
fn lambdas() {
    let source = "
print fun(name)
{
    return fun(userName)
    {
        return \"Hello \" + userName;
    }(name);
}(\"Abdallah\");
var fn = fun(name)
{
    return \"Hello \" + name;
};
print fn(\"Abdallah\");
print fn;
";

    assert_eq!(
        run(source),
        ["Hello Abdallah", "Hello Abdallah", "<fn $lambda9_10$>"]
    );
}

// ───────────────────────── classes ─────────────────────────

#[test]
fn classes_and_instances_print_by_name() {
    let source = "
class MetroBoomin
{
    Hello()
    {
        print \"hello there\";
    }
}
print MetroBoomin;
class Arctic
{
    Sing()
    {
        print \"I am goint back to 505\";
    }
}
var instance = Arctic();
print instance;
print typeof(instance);
print typeof(Arctic);
";

    assert_eq!(
        run(source),
        ["MetroBoomin", "Arctic instance", "Arctic", "class"]
    );
}

#[test]
fn methods_share_instance_state() {
    let source = "
class Counter
{

    SetValue(val)
    {
        this._value = val;
    }

    Increment(addition)
    {
        this._value = this._value + addition;
        return this._value;
    }
}
var cnt = Counter();
cnt.SetValue(0);
print cnt.Increment(1);
print cnt.Increment(2);
print cnt.Increment(3);
";

    assert_eq!(run(source), ["1", "3", "6"]);
}

#[test]
fn initializer_and_property_methods() {
    let source = "
class Circle {
    init(r) { this.r = r; }
    area { return 3 * this.r * this.r; }
}
var c = Circle(2);
print c.area;
print c.init(5) == c;
print c.r;
";

    assert_eq!(run(source), ["12", "true", "5"]);
}

#[test]
fn class_arity_comes_from_init() {
    let RuntimeError::ArgumentCountMismatch {
        expected,
        actual,
        callee,
        ..
    } = runtime_error("class P { init(a, b) {} } P(1);")
    else {
        panic!("expected argument count mismatch");
    };

    assert_eq!((expected, actual), (2, 1));
    assert_eq!(callee, "P");
}

#[test]
fn fields_shadow_methods() {
    let source = "
class Box { value() { return \"method\"; } }
var b = Box();
print b.value();
b.value = \"field\";
print b.value;
";

    assert_eq!(run(source), ["method", "field"]);
}

#[test]
fn inheritance_and_super() {
    let source = "
class Animal {
    init(name) { this.name = name; }
    speak() { return this.name + \" makes a sound\"; }
}
class Dog < Animal {
    speak() { return super.speak() + \" (woof)\"; }
}
print Dog(\"Rex\").speak();
";

    assert_eq!(run(source), ["Rex makes a sound (woof)"]);
}

#[test]
fn super_dispatches_from_the_declaring_class() {
    let source = "
class A { method() { print \"A method\"; } }
class B < A {
    method() { print \"B method\"; }
    test() { super.method(); }
}
class C < B {}
C().test();
";

    assert_eq!(run(source), ["A method"]);
}

#[test]
fn bound_methods_remember_their_receiver() {
    let source = "
class Person {
    init(name) { this.name = name; }
    hello() { return \"hi \" + this.name; }
}
var greet = Person(\"ada\").hello;
print greet();
";

    assert_eq!(run(source), ["hi ada"]);
}

#[test]
fn superclass_must_be_a_class() {
    assert!(matches!(
        runtime_error("var NotClass = 1; class A < NotClass {}"),
        RuntimeError::ClassExpected { .. }
    ));
}

#[test]
fn property_access_needs_an_instance() {
    assert!(matches!(
        runtime_error("var x = 1; print x.y;"),
        RuntimeError::ObjectExpected { .. }
    ));
    assert!(matches!(
        runtime_error("var x = 1; x.y = 2;"),
        RuntimeError::ObjectExpected { .. }
    ));
}

#[test]
fn undefined_property() {
    let RuntimeError::UndefinedProperty { name, .. } =
        runtime_error("class E {} print E().missing;")
    else {
        panic!("expected undefined property");
    };

    assert_eq!(&*name.lexeme, "missing");
}

// ───────────────────────── driver ─────────────────────────

#[test]
fn run_stops_at_the_first_static_error() {
    let (mut session, sink) = session();
    let result = session.run("print 1; var = 2; print 3;");

    assert!(matches!(
        result,
        Err(LoxError::Parse(ParseError::UnexpectedToken { .. }))
    ));
    assert_eq!(sink.lines(), ["1"]);
}

#[test]
fn recovering_run_skips_failed_declarations() {
    let (mut session, sink) = session();
    let errors = session
        .run_recovering("var a = ; print 1; { var unused = 2; } print 2; print $; print 3;")
        .expect("no runtime error");

    assert_eq!(errors.len(), 3);
    assert!(matches!(errors[0], LoxError::Parse(_)));
    assert!(matches!(errors[1], LoxError::Resolve(_)));
    assert!(matches!(errors[2], LoxError::Lex(_)));
    assert_eq!(sink.lines(), ["1", "2", "3"]);
}

#[test]
fn runtime_error_ends_a_recovering_run() {
    let (mut session, sink) = session();
    let result = session.run_recovering("print 1; print -\"x\"; print 2;");

    assert!(matches!(result, Err(LoxError::Runtime(_))));
    assert_eq!(sink.lines(), ["1"]);
}

#[test]
fn failed_global_declaration_leaves_no_trace() {
    let (mut session, sink) = session();

    let errors = session
        .run_recovering("fun broken() { var unused = 1; } var ok = 1; print ok;")
        .expect("no runtime error");

    assert_eq!(errors.len(), 1);
    assert_eq!(sink.lines(), ["1"]);
}

#[test]
fn session_keeps_globals_between_runs() {
    let (mut session, sink) = session();

    session.run("var a = 1; fun add(x) { return a + x; }").unwrap();
    session.run("a = 10; print add(5);").unwrap();

    assert_eq!(sink.lines(), ["15"]);
}

#[test]
fn same_program_prints_the_same_sequence() {
    let source = "var s = \"\"; for (var i = 0; i < 3; i = i + 1) s = s + i; print s;";

    assert_eq!(run(source), run(source));
    assert_eq!(run(source), ["012"]);
}

#[test]
fn rejected_class_body_is_skipped_whole() {
    let (mut session, sink) = session();
    let errors = session
        .run_recovering("class A < A { m() { print 1; } } print 3;")
        .expect("no runtime error");

    assert_eq!(errors.len(), 1);
    assert!(matches!(
        errors[0],
        LoxError::Parse(ParseError::SelfInheritance { .. })
    ));
    assert_eq!(sink.lines(), ["3"]);
}

// ───────────────────────── deep recursion ─────────────────────────

#[test]
fn deep_recursion_runs_to_completion() {
    let source = "
fun depth(n) { if (n == 0) return 0; return depth(n - 1) + 1; }
print depth(10000);
fun countdown(n) { if (n == 0) return \"done\"; return countdown(n - 1); }
print countdown(10000);
";

    assert_eq!(run(source), ["10000", "done"]);
}

#[test]
fn deeply_nested_expressions() {
    let source = format!("print {}1{};", "(".repeat(2000), ")".repeat(2000));

    assert_eq!(run(&source), ["1"]);
}
