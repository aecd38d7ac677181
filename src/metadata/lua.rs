//! Lua sidecar decoding
//!
//! KOReader writes `return { ... }` chunks. They are evaluated in a
//! restricted interpreter (no `io`, `os` or `package`) and converted to a JSON
//! tree whose table keys are always strings.

use std::sync::atomic::{AtomicU32, Ordering};

use mlua::{HookTriggers, Lua, LuaOptions, StdLib, Value, VmState};
use serde_json::{Map, Number};

use super::ScanError;

/// Instructions between two budget checks
const HOOK_INTERVAL: u32 = 10_000;

/// Budget checks before a chunk is abandoned (100 million instructions)
const MAX_HOOK_CALLS: u32 = 10_000;

/// Heap available to one chunk
const MEMORY_LIMIT: usize = 64 * 1024 * 1024;

/// Evaluate a sidecar chunk and convert the returned table to JSON.
///
/// Evaluation is bounded in instructions and memory, so a corrupt chunk
/// fails the scan instead of hanging it.
pub fn decode_metadata(source: &str, chunk_name: &str) -> Result<serde_json::Value, ScanError> {
    let lua = Lua::new_with(StdLib::STRING | StdLib::TABLE | StdLib::MATH, LuaOptions::new())
        .map_err(|e| lua_error(chunk_name, e))?;
    lua.set_memory_limit(MEMORY_LIMIT)
        .map_err(|e| lua_error(chunk_name, e))?;

    let checks = AtomicU32::new(0);
    lua.set_hook(
        HookTriggers::new().every_nth_instruction(HOOK_INTERVAL),
        move |_lua, _debug| {
            if checks.fetch_add(1, Ordering::Relaxed) >= MAX_HOOK_CALLS {
                return Err(mlua::Error::runtime("instruction budget exhausted"));
            }
            Ok(VmState::Continue)
        },
    );

    let value: Value = lua
        .load(source)
        .set_name(chunk_name)
        .eval()
        .map_err(|e| lua_error(chunk_name, e))?;

    lua_to_json(value).map_err(|e| lua_error(chunk_name, e))
}

fn lua_error(chunk_name: &str, e: mlua::Error) -> ScanError {
    ScanError::Lua {
        path: chunk_name.to_string(),
        message: e.to_string(),
    }
}

fn lua_to_json(value: Value) -> mlua::Result<serde_json::Value> {
    Ok(match value {
        Value::Nil => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(b),
        Value::Integer(i) => serde_json::Value::Number(Number::from(i)),
        Value::Number(n) => Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.to_string_lossy().to_string()),
        Value::Table(table) => {
            let mut map = Map::new();
            for pair in table.pairs::<Value, Value>() {
                let (key, value) = pair?;
                let key = match key {
                    Value::String(s) => s.to_string_lossy().to_string(),
                    Value::Integer(i) => i.to_string(),
                    Value::Number(n) => n.to_string(),
                    Value::Boolean(b) => b.to_string(),
                    // Functions, userdata and friends never appear as keys in sidecars
                    _ => continue,
                };
                map.insert(key, lua_to_json(value)?);
            }
            serde_json::Value::Object(map)
        }
        // Closures and other runtime-only values have no data meaning
        _ => serde_json::Value::Null,
    })
}
