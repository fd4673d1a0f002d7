//! Host functions visible to every program.

use chrono::Utc;
use log::debug;

use crate::value::{NativeFunction, Value};

/// The predefined functions, in the slot order of the natives scope.
pub fn natives() -> Vec<NativeFunction> {
    vec![
        NativeFunction {
            name: "clock",
            arity: 0,
            func: clock,
        },
        NativeFunction {
            name: "typeof",
            arity: 1,
            func: type_of,
        },
    ]
}

/// Seconds since the Unix epoch.
fn clock(_: &[Value]) -> Value {
    let now = Utc::now();
    let seconds = now.timestamp_micros() as f64 / 1_000_000.0;

    debug!("clock() -> {}", seconds);

    Value::Number(seconds)
}

fn type_of(arguments: &[Value]) -> Value {
    let name = arguments.first().map_or_else(|| Value::Nil.type_of(), Value::type_of);

    Value::String(name)
}
