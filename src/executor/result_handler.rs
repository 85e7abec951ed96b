// Copyright 2025 Sqlweave Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Consumers of mapped results

use crate::core::{Result, Value};

/// Per-pass state handed to a [`ResultHandler`] with every result
#[derive(Debug, Default)]
pub struct ResultContext {
    result_object: Value,
    result_count: usize,
    stopped: bool,
}

impl ResultContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The result just produced
    pub fn result_object(&self) -> &Value {
        &self.result_object
    }

    /// Take ownership of the current result
    pub fn take_result_object(&mut self) -> Value {
        std::mem::take(&mut self.result_object)
    }

    /// Number of results produced so far, the current one included
    pub fn result_count(&self) -> usize {
        self.result_count
    }

    /// Ask the engine to stop reading rows
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub(crate) fn next_result_object(&mut self, value: Value) {
        self.result_count += 1;
        self.result_object = value;
    }
}

/// Receives each top-level result as soon as it is complete
pub trait ResultHandler {
    fn handle_result(&mut self, context: &mut ResultContext) -> Result<()>;
}

impl<F> ResultHandler for F
where
    F: FnMut(&mut ResultContext) -> Result<()>,
{
    fn handle_result(&mut self, context: &mut ResultContext) -> Result<()> {
        self(context)
    }
}

/// Collects every result into a list
#[derive(Debug, Default)]
pub struct DefaultResultHandler {
    list: Vec<Value>,
}

impl DefaultResultHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_result_list(self) -> Vec<Value> {
        self.list
    }
}

impl ResultHandler for DefaultResultHandler {
    fn handle_result(&mut self, context: &mut ResultContext) -> Result<()> {
        self.list.push(context.take_result_object());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_handler_collects() {
        let mut handler = DefaultResultHandler::new();
        let mut ctx = ResultContext::new();
        for i in 0..3 {
            ctx.next_result_object(Value::integer(i));
            handler.handle_result(&mut ctx).unwrap();
        }
        assert_eq!(ctx.result_count(), 3);
        assert_eq!(
            handler.into_result_list(),
            vec![Value::integer(0), Value::integer(1), Value::integer(2)]
        );
    }

    #[test]
    fn test_closure_handler_can_stop() {
        let mut seen = Vec::new();
        let mut handler = |ctx: &mut ResultContext| -> Result<()> {
            seen.push(ctx.result_object().clone());
            if ctx.result_count() == 2 {
                ctx.stop();
            }
            Ok(())
        };
        let mut ctx = ResultContext::new();
        ctx.next_result_object(Value::text("a"));
        handler.handle_result(&mut ctx).unwrap();
        assert!(!ctx.is_stopped());
        ctx.next_result_object(Value::text("b"));
        handler.handle_result(&mut ctx).unwrap();
        assert!(ctx.is_stopped());
        assert_eq!(seen.len(), 2);
    }
}
