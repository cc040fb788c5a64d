//! Fake platform API for extension pages.
//!
//! Builds a self-contained script that replaces the extension host's
//! `chrome.runtime` and `chrome.storage` namespaces with deterministic fakes.
//! The script must be registered as a pre-navigation hook so it runs before
//! any script of the page under test.
//!
//! Completion callbacks are invoked synchronously, exactly once per call,
//! matching the callback contract the extension code is written against.
//! Calls made without a callback receive a resolved promise of the same value.

use crate::result::{PopshotError, PopshotResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Global the installed fake exposes for inspection from steps.
pub const FAKE_HANDLE: &str = "__popshotFake";

const CONFIG_PLACEHOLDER: &str = "__POPSHOT_CONFIG__";

const SCRIPT_TEMPLATE: &str = r#"(() => {
  const config = __POPSHOT_CONFIG__;
  const clone = (value) => value === undefined ? undefined : JSON.parse(JSON.stringify(value));
  const calls = [];
  const record = (name, args) => { calls.push({ name, args: args === undefined ? null : clone(args) }); };
  const complete = (callback, value) => {
    if (typeof callback === 'function') {
      callback(value);
      return undefined;
    }
    return Promise.resolve(value);
  };
  const area = (name, initial) => {
    let state = clone(initial);
    return {
      get(keys, callback) {
        if (typeof keys === 'function') {
          callback = keys;
          keys = null;
        }
        record(name + '.get', keys);
        return complete(callback, clone(state));
      },
      set(items, callback) {
        record(name + '.set', items);
        if (config.mutable) Object.assign(state, clone(items));
        return complete(callback);
      },
      remove(keys, callback) {
        record(name + '.remove', keys);
        if (config.mutable) [].concat(keys).forEach((key) => { delete state[key]; });
        return complete(callback);
      },
      clear(callback) {
        record(name + '.clear');
        if (config.mutable) state = {};
        return complete(callback);
      },
    };
  };
  const listeners = [];
  const fake = {
    runtime: {
      id: config.extensionId === null ? undefined : config.extensionId,
      lastError: null,
      sendMessage(message, callback) {
        record('runtime.sendMessage', message);
        const key = message !== null && typeof message === 'object' ? message.type : message;
        const known = Object.prototype.hasOwnProperty.call(config.messages, key);
        return complete(callback, known ? clone(config.messages[key]) : undefined);
      },
      onMessage: {
        addListener(listener) { listeners.push(listener); },
        removeListener(listener) {
          const at = listeners.indexOf(listener);
          if (at >= 0) listeners.splice(at, 1);
        },
        hasListener(listener) { return listeners.includes(listener); },
      },
    },
    storage: {
      local: area('storage.local', config.local),
      sync: area('storage.sync', config.sync),
    },
  };
  try {
    Object.defineProperty(window, 'chrome', { value: fake, writable: false, configurable: true });
  } catch (_) {
    window.chrome = fake;
  }
  Object.defineProperty(window, '__popshotFake', {
    value: Object.freeze({ installed: true, calls }),
    configurable: true,
  });
})();
"#;

/// Deterministic storage contents handed to the extension.
///
/// Keys are unique and ordered, so the generated script is byte-stable for a
/// given state. The fake never synthesizes keys the caller left out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FakeStorageState {
    entries: BTreeMap<String, Value>,
}

impl FakeStorageState {
    /// Create an empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level key
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Build from a JSON value, which must be an object
    pub fn from_value(value: Value) -> PopshotResult<Self> {
        match value {
            Value::Object(map) => Ok(Self {
                entries: map.into_iter().collect(),
            }),
            other => Err(PopshotError::config(format!(
                "fake storage state must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Parse from a JSON document
    pub fn from_json_str(source: &str) -> PopshotResult<Self> {
        Self::from_value(serde_json::from_str(source)?)
    }

    /// Load from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> PopshotResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_json_str(&source)
    }

    /// Look up a top-level key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Number of top-level keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the state holds no keys
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Top-level keys in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// The state as a JSON object
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Optional parts of the fake surface, as written in scenario files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FakeApiOptions {
    /// Whether `set`/`remove`/`clear` mutate the in-page copy
    pub mutable: bool,
    /// Contents of `chrome.storage.sync`
    pub sync_data: FakeStorageState,
    /// Canned `runtime.sendMessage` replies keyed by message `type`
    pub messages: BTreeMap<String, Value>,
}

/// Fake `chrome.*` surface, parameterized per page.
#[derive(Debug, Clone, Default)]
pub struct FakePlatformApi {
    local: FakeStorageState,
    options: FakeApiOptions,
    extension_id: Option<String>,
}

impl FakePlatformApi {
    /// Create a read-only fake serving `local` from `chrome.storage.local`
    #[must_use]
    pub fn new(local: FakeStorageState) -> Self {
        Self {
            local,
            options: FakeApiOptions::default(),
            extension_id: None,
        }
    }

    /// Apply scenario options
    #[must_use]
    pub fn with_options(mut self, options: FakeApiOptions) -> Self {
        self.options = options;
        self
    }

    /// Make `set`/`remove`/`clear` observable by later reads
    #[must_use]
    pub const fn mutable(mut self, mutable: bool) -> Self {
        self.options.mutable = mutable;
        self
    }

    /// Answer `runtime.sendMessage({type})` with `response`
    #[must_use]
    pub fn with_message(mut self, message_type: impl Into<String>, response: Value) -> Self {
        self.options.messages.insert(message_type.into(), response);
        self
    }

    /// Report `id` from `chrome.runtime.id`
    #[must_use]
    pub fn with_extension_id(mut self, id: impl Into<String>) -> Self {
        self.extension_id = Some(id.into());
        self
    }

    /// The `chrome.storage.local` contents
    #[must_use]
    pub const fn local(&self) -> &FakeStorageState {
        &self.local
    }

    /// Whether mutating calls are applied
    #[must_use]
    pub const fn is_mutable(&self) -> bool {
        self.options.mutable
    }

    /// Render the pre-navigation script
    pub fn to_script(&self) -> PopshotResult<String> {
        let config = json!({
            "local": self.local.to_value(),
            "sync": self.options.sync_data.to_value(),
            "messages": self.options.messages,
            "mutable": self.options.mutable,
            "extensionId": self.extension_id,
        });
        let literal = serde_json::to_string(&config)?;
        Ok(SCRIPT_TEMPLATE.replacen(CONFIG_PLACEHOLDER, &literal, 1))
    }

    /// Expression returning how many times `name` was called in the page
    #[must_use]
    pub fn call_count_expression(name: &str) -> String {
        format!(
            "(window.{FAKE_HANDLE} ? window.{FAKE_HANDLE}.calls.filter(c => c.name === {name:?}).length : -1)"
        )
    }
}
