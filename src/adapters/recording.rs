use crate::core::client::methods;
use crate::domain::ports::ControlChannel;
use crate::utils::error::RemoteError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: String,
    pub args: Vec<Value>,
}

#[derive(Default)]
struct State {
    calls: Vec<RecordedCall>,
    scripted: HashMap<String, VecDeque<Result<Value, String>>>,
    registered: HashSet<String>,
}

/// In-memory control channel that records every call.
///
/// Answers like an empty container: nothing is installed, jars become
/// registered once `registerJar` has been called, `uninstall` and
/// `setStatus` succeed. Scripted responses take precedence, in order.
/// Clones share state.
#[derive(Clone, Default)]
pub struct RecordingChannel {
    state: Arc<Mutex<State>>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queues one successful result for the next `method` call.
    pub fn respond(&self, method: &str, value: Value) {
        self.state()
            .scripted
            .entry(method.to_string())
            .or_default()
            .push_back(Ok(value));
    }

    /// Queues one failure for the next `method` call.
    pub fn fail(&self, method: &str, message: &str) {
        self.state()
            .scripted
            .entry(method.to_string())
            .or_default()
            .push_back(Err(message.to_string()));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.state().calls.iter().map(|c| c.method.clone()).collect()
    }

    pub fn calls_to(&self, method: &str) -> Vec<RecordedCall> {
        self.state()
            .calls
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    fn default_response(state: &mut State, method: &str, args: &[Value]) -> Value {
        match method {
            methods::GET_RUNTIME => json!({"services": {}, "filters": []}),
            methods::HAS_JAR => {
                if state.registered.contains(&coordinate_key(args)) {
                    json!(1)
                } else {
                    json!(-1)
                }
            }
            methods::REGISTER_JAR => {
                state.registered.insert(coordinate_key(args));
                Value::Null
            }
            methods::UNINSTALL => json!(0),
            methods::SET_STATUS => json!(true),
            _ => Value::Null,
        }
    }
}

fn coordinate_key(args: &[Value]) -> String {
    Value::from(args[..args.len().min(3)].to_vec()).to_string()
}

#[async_trait]
impl ControlChannel for RecordingChannel {
    async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, RemoteError> {
        let mut state = self.state();
        state.calls.push(RecordedCall {
            method: method.to_string(),
            args: args.clone(),
        });

        let scripted = state
            .scripted
            .get_mut(method)
            .and_then(VecDeque::pop_front);
        match scripted {
            Some(Ok(value)) => Ok(value),
            Some(Err(message)) => Err(RemoteError::new(method, message)),
            None => Ok(Self::default_response(&mut state, method, &args)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_registration_is_remembered() {
        let channel = RecordingChannel::new();
        let gav = vec![json!("g"), json!("a"), json!("1")];

        assert_eq!(channel.call(methods::HAS_JAR, gav.clone()).await.unwrap(), json!(-1));
        let mut register = gav.clone();
        register.extend([json!("a-1.jar"), Value::Null]);
        channel.call(methods::REGISTER_JAR, register).await.unwrap();
        assert_eq!(channel.call(methods::HAS_JAR, gav).await.unwrap(), json!(1));
    }

    #[tokio::test]
    async fn test_scripted_responses_in_order() {
        let channel = RecordingChannel::new();
        channel.respond(methods::UNINSTALL, json!(2));
        channel.fail(methods::UNINSTALL, "boom");

        assert_eq!(channel.call(methods::UNINSTALL, vec![]).await.unwrap(), json!(2));
        assert!(channel.call(methods::UNINSTALL, vec![]).await.is_err());
        assert_eq!(channel.call(methods::UNINSTALL, vec![]).await.unwrap(), json!(0));
        assert_eq!(channel.methods().len(), 3);
    }
}
