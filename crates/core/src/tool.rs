// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool registry: named, invokable units executed inside workers.
//!
//! Tools are synchronous functions over opaque JSON arguments. The built-in
//! set mirrors the service's demo catalog — real computation where it is
//! cheap (arithmetic, factorization), canned text where the real thing
//! would need an external service (weather).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("invalid arguments for {tool}: {message}")]
    InvalidArgs { tool: String, message: String },
}

/// Descriptor returned by `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// One item of tool output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentItem {
    pub text: String,
}

/// Result payload of a completed `tools/call`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallResult {
    pub content: Vec<ContentItem>,
}

impl CallResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem { text: text.into() }],
        }
    }
}

type Handler = Box<dyn Fn(&Value) -> Result<String, ToolError> + Send + Sync>;

struct ToolSpec {
    description: String,
    handler: Handler,
}

/// Lookup table from tool name to implementation.
///
/// Shared read-only between the listener (for `tools/list`) and the worker
/// threads (for execution). Tests register their own tools.
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolSpec>,
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ToolRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Registry with the built-in demo tools.
    pub fn builtin() -> Self {
        let mut registry = Self::new();

        registry.register("echo", "Echo back the provided text", |args| {
            let text = require_str(args, "echo", "text")?;
            Ok(text.to_string())
        });

        registry.register("add", "Add two numbers", |args| {
            let a = require_number(args, "add", "a")?;
            let b = require_number(args, "add", "b")?;
            Ok(format!(
                "The sum of {} and {} is {}",
                fmt_number(a),
                fmt_number(b),
                fmt_number(a + b)
            ))
        });

        registry.register(
            "get_weather",
            "Get weather information for a location",
            |args| {
                let location = require_str(args, "get_weather", "location")?;
                let metric = args
                    .get("units")
                    .and_then(Value::as_str)
                    .map(|u| u != "imperial")
                    .unwrap_or(true);
                let (temp, wind) = if metric {
                    ("22°C", "15 km/h")
                } else {
                    ("72°F", "9 mph")
                };
                Ok(format!(
                    "Weather in {location}: {temp} Partly cloudy. Humidity: 65% Wind: {wind}"
                ))
            },
        );

        registry.register(
            "calculate_date",
            "Calculate dates based on expressions",
            |args| {
                // Expression parsing is not implemented; the base date (or
                // today) is echoed, matching the demo behavior.
                require_str(args, "calculate_date", "expression")?;
                let date = match args.get("base_date").and_then(Value::as_str) {
                    Some(base) => chrono::NaiveDate::parse_from_str(base, "%Y-%m-%d")
                        .map_err(|e| ToolError::InvalidArgs {
                            tool: "calculate_date".to_string(),
                            message: format!("bad base_date: {e}"),
                        })?,
                    None => chrono::Utc::now().date_naive(),
                };
                Ok(format!("Calculated date: {}", date.format("%Y-%m-%d")))
            },
        );

        registry.register(
            "fibonacci",
            "Calculate Fibonacci numbers (CPU-intensive)",
            |args| {
                let n = require_number(args, "fibonacci", "n")? as u64;
                // fib(186) is the largest Fibonacci number that fits in u128.
                if n > 186 {
                    return Err(ToolError::InvalidArgs {
                        tool: "fibonacci".to_string(),
                        message: format!("n too large: {n} (max 186)"),
                    });
                }
                let mut pair: (u128, u128) = (0, 1);
                for _ in 1..n {
                    pair = (pair.1, pair.0 + pair.1);
                }
                let value = if n == 0 { 0 } else { pair.1 };
                Ok(format!("Fibonacci({n}) = {value}"))
            },
        );

        registry.register(
            "prime_factorization",
            "Factorize numbers into primes (CPU-intensive)",
            |args| {
                let number = require_number(args, "prime_factorization", "number")? as u64;
                if number < 2 {
                    return Err(ToolError::InvalidArgs {
                        tool: "prime_factorization".to_string(),
                        message: format!("number must be >= 2, got {number}"),
                    });
                }
                let mut factors = Vec::new();
                let mut n = number;
                let mut divisor = 2u64;
                while divisor.saturating_mul(divisor) <= n {
                    while n % divisor == 0 {
                        factors.push(divisor);
                        n /= divisor;
                    }
                    divisor += 1;
                }
                if n > 1 {
                    factors.push(n);
                }
                let listed = factors
                    .iter()
                    .map(u64::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                Ok(format!("Prime factors of {number}: {listed}"))
            },
        );

        registry
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        handler: impl Fn(&Value) -> Result<String, ToolError> + Send + Sync + 'static,
    ) {
        self.tools.insert(
            name.into(),
            ToolSpec {
                description: description.into(),
                handler: Box::new(handler),
            },
        );
    }

    /// Descriptors for every registered tool, in name order.
    pub fn list(&self) -> Vec<ToolInfo> {
        self.tools
            .iter()
            .map(|(name, spec)| ToolInfo {
                name: name.clone(),
                description: spec.description.clone(),
            })
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Run a tool by name. Unknown names surface as [`ToolError::NotFound`],
    /// which callers report as a task failure, not a protocol error.
    pub fn execute(&self, name: &str, args: &Value) -> Result<CallResult, ToolError> {
        let spec = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        let text = (spec.handler)(args)?;
        Ok(CallResult::text(text))
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn require_str<'a>(args: &'a Value, tool: &str, field: &str) -> Result<&'a str, ToolError> {
    args.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArgs {
            tool: tool.to_string(),
            message: format!("missing string field `{field}`"),
        })
}

fn require_number(args: &Value, tool: &str, field: &str) -> Result<f64, ToolError> {
    args.get(field)
        .and_then(Value::as_f64)
        .ok_or_else(|| ToolError::InvalidArgs {
            tool: tool.to_string(),
            message: format!("missing numeric field `{field}`"),
        })
}

/// Format a number the way clients expect: integers without a trailing `.0`.
fn fmt_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[cfg(test)]
#[path = "tool_tests.rs"]
mod tests;
