//! Boa-backed script host and DOM provider.
//!
//! [`ScriptHost`] owns the script context whose global object is the
//! namespace the lifecycle manager mirrors window properties onto.
//! [`BoaDomProvider`] builds DOM instances inside that context from markup
//! parsed by `df-html`.

mod bootstrap;
mod provider;

use std::fmt;

use boa_engine::Context;
use boa_engine::JsError;
use boa_engine::JsObject;
use boa_engine::JsString;
use boa_engine::JsValue;
use boa_engine::Source;
use df_core::DomifyError;
use df_core::DomifyResult;
use df_lifecycle::GlobalNamespace;

pub use provider::BoaDomInstance;
pub use provider::BoaDomProvider;
pub use provider::DocumentHandle;
pub use provider::ProviderConfig;

/// Runtime hardening knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptHostConfig {
    pub recursion_limit: usize,
    pub stack_size_limit: usize,
    pub loop_iteration_limit: u64,
}

impl Default for ScriptHostConfig {
    fn default() -> Self {
        Self {
            recursion_limit: 512,
            stack_size_limit: 10 * 1024,
            loop_iteration_limit: 1_000_000,
        }
    }
}

/// Script context whose global object serves as the process-wide namespace.
pub struct ScriptHost {
    context: Context,
    config: ScriptHostConfig,
    assignable_check: Option<JsObject>,
}

impl ScriptHost {
    pub fn new(config: ScriptHostConfig) -> Self {
        let mut context = Context::default();
        context
            .runtime_limits_mut()
            .set_recursion_limit(config.recursion_limit);
        context
            .runtime_limits_mut()
            .set_stack_size_limit(config.stack_size_limit);
        context
            .runtime_limits_mut()
            .set_loop_iteration_limit(config.loop_iteration_limit);
        Self {
            context,
            config,
            assignable_check: None,
        }
    }

    pub fn config(&self) -> &ScriptHostConfig {
        &self.config
    }

    /// Evaluates `source` as a classic script in the global scope.
    pub fn eval(&mut self, origin: &str, source: &str) -> DomifyResult<JsValue> {
        self.context
            .eval(Source::from_bytes(source.as_bytes()))
            .map_err(|error| self.script_error(origin, &error))
    }

    /// Evaluates `source` and converts the completion value to a string.
    pub fn eval_string(&mut self, origin: &str, source: &str) -> DomifyResult<String> {
        let value = self.eval(origin, source)?;
        self.to_display_string(origin, &value)
    }

    pub fn to_display_string(&mut self, origin: &str, value: &JsValue) -> DomifyResult<String> {
        value
            .to_string(&mut self.context)
            .map(|text| text.to_std_string_escaped())
            .map_err(|error| self.script_error(origin, &error))
    }

    /// Own property names of the global object, in definition order.
    pub fn global_property_names(&mut self) -> DomifyResult<Vec<String>> {
        let json = self.eval_string(
            "global-property-names",
            "JSON.stringify(Object.getOwnPropertyNames(globalThis))",
        )?;
        serde_json::from_str(&json)
            .map_err(|error| DomifyError::script("global-property-names", error.to_string()))
    }

    pub fn call(
        &mut self,
        origin: &str,
        function: &JsObject,
        this: &JsValue,
        args: &[JsValue],
    ) -> DomifyResult<JsValue> {
        function
            .call(this, args, &mut self.context)
            .map_err(|error| self.script_error(origin, &error))
    }

    pub fn property(
        &mut self,
        origin: &str,
        target: &JsObject,
        key: &str,
    ) -> DomifyResult<JsValue> {
        target
            .get(JsString::from(key), &mut self.context)
            .map_err(|error| self.script_error(origin, &error))
    }

    /// Calls `target[method](...args)` with `target` as the receiver.
    pub fn invoke_method(
        &mut self,
        origin: &str,
        target: &JsObject,
        method: &str,
        args: &[JsValue],
    ) -> DomifyResult<JsValue> {
        let value = self.property(origin, target, method)?;
        let Some(function) = value.as_callable().cloned() else {
            return Err(DomifyError::script(
                origin,
                format!("`{method}` is not a function"),
            ));
        };
        self.call(origin, &function, &JsValue::from(target.clone()), args)
    }

    /// Enumerable own string keys of `target`, in enumeration order.
    pub fn own_enumerable_keys(&mut self, target: &JsObject) -> DomifyResult<Vec<String>> {
        let helper = self.eval_callable("own-keys", bootstrap::OWN_KEYS_HELPER)?;
        let json = self.call(
            "own-keys",
            &helper,
            &JsValue::undefined(),
            &[JsValue::from(target.clone())],
        )?;
        let json = self.to_display_string("own-keys", &json)?;
        serde_json::from_str(&json)
            .map_err(|error| DomifyError::script("own-keys", error.to_string()))
    }

    /// Evaluates a function expression and returns the function object.
    pub(crate) fn eval_callable(&mut self, origin: &str, source: &str) -> DomifyResult<JsObject> {
        let value = self.eval(origin, source)?;
        value
            .as_callable()
            .cloned()
            .ok_or_else(|| DomifyError::script(origin, "source did not evaluate to a function"))
    }

    pub(crate) fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    fn script_error(&mut self, origin: &str, error: &JsError) -> DomifyError {
        DomifyError::script(origin, describe_error(error, &mut self.context))
    }

    fn namespace_error(&mut self, key: &str, error: &JsError) -> DomifyError {
        DomifyError::namespace(key, describe_error(error, &mut self.context))
    }
}

/// Renders a thrown value the way `String(error)` would, falling back to
/// the engine's own formatting for native and uncatchable errors.
fn describe_error(error: &JsError, context: &mut Context) -> String {
    match error.as_opaque() {
        Some(value) => value
            .to_string(context)
            .map(|text| text.to_std_string_escaped())
            .unwrap_or_else(|_| error.to_string()),
        None => error.to_string(),
    }
}

impl Default for ScriptHost {
    fn default() -> Self {
        Self::new(ScriptHostConfig::default())
    }
}

impl fmt::Debug for ScriptHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptHost")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GlobalNamespace for ScriptHost {
    type Value = JsValue;

    fn lookup(&mut self, key: &str) -> DomifyResult<Option<JsValue>> {
        let global = self.context.global_object();
        let present = global
            .has_own_property(JsString::from(key), &mut self.context)
            .map_err(|error| self.namespace_error(key, &error))?;
        if !present {
            return Ok(None);
        }
        global
            .get(JsString::from(key), &mut self.context)
            .map(Some)
            .map_err(|error| self.namespace_error(key, &error))
    }

    fn assign(&mut self, key: &str, value: JsValue) -> DomifyResult<()> {
        let global = self.context.global_object();
        global
            .set(JsString::from(key), value, true, &mut self.context)
            .map(|_| ())
            .map_err(|error| self.namespace_error(key, &error))
    }

    fn remove(&mut self, key: &str) -> DomifyResult<()> {
        let global = self.context.global_object();
        global
            .delete_property_or_throw(JsString::from(key), &mut self.context)
            .map(|_| ())
            .map_err(|error| self.namespace_error(key, &error))
    }

    fn ensure_assignable(&mut self, key: &str) -> DomifyResult<()> {
        let check = match self.assignable_check.clone() {
            Some(check) => check,
            None => {
                let check = self.eval_callable("assignable-check", bootstrap::ASSIGNABLE_CHECK)?;
                self.assignable_check = Some(check.clone());
                check
            }
        };
        let writable = self.call(
            "assignable-check",
            &check,
            &JsValue::undefined(),
            &[JsValue::from(JsString::from(key))],
        )?;
        if writable.to_boolean() {
            Ok(())
        } else {
            Err(DomifyError::namespace(key, "global is read-only"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ScriptHost;
    use super::ScriptHostConfig;
    use boa_engine::JsValue;
    use boa_engine::js_string;
    use df_lifecycle::GlobalNamespace;

    #[test]
    fn evaluates_scripts_in_the_global_scope() {
        let mut host = ScriptHost::default();
        host.eval("inline:1", "var answer = 40 + 2;")
            .expect("script runs");
        assert_eq!(
            host.eval_string("inline:2", "String(answer)").expect("reads global"),
            "42"
        );
    }

    #[test]
    fn reports_script_errors_with_origin() {
        let mut host = ScriptHost::default();
        let error = host
            .eval("inline:broken", "throw new Error('boom');")
            .expect_err("throws");
        assert_eq!(error.code(), "script");
        assert!(error.to_string().contains("inline:broken"));
        assert!(error.to_string().contains("boom"));
    }

    #[test]
    fn lookup_distinguishes_absent_from_undefined() {
        let mut host = ScriptHost::default();
        host.eval("inline:1", "globalThis.declared = undefined;")
            .expect("script runs");

        assert!(host.lookup("missing").expect("lookup").is_none());
        let declared = host.lookup("declared").expect("lookup");
        assert!(declared.is_some_and(|value| value.is_undefined()));
    }

    #[test]
    fn assign_and_remove_round_trip_global_keys() {
        let mut host = ScriptHost::default();
        let before = host.global_property_names().expect("names");

        host.assign("injected", JsValue::from(7)).expect("assign");
        assert_eq!(
            host.eval_string("inline:1", "typeof injected").expect("reads"),
            "number"
        );
        assert!(
            host.global_property_names()
                .expect("names")
                .contains(&"injected".to_owned())
        );

        host.remove("injected").expect("remove");
        assert_eq!(host.global_property_names().expect("names"), before);
        assert_eq!(
            host.eval_string("inline:2", "typeof injected").expect("reads"),
            "undefined"
        );
    }

    #[test]
    fn assign_rejects_non_writable_globals() {
        let mut host = ScriptHost::default();
        let error = host
            .assign("NaN", JsValue::from(1))
            .expect_err("NaN is read-only");
        assert_eq!(error.code(), "namespace");
    }

    #[test]
    fn ensure_assignable_matches_what_assign_would_do() {
        let mut host = ScriptHost::default();
        host.eval(
            "inline:1",
            "Object.defineProperty(globalThis, 'readOnlyView', { get: function () { return 1; }, configurable: true });",
        )
        .expect("script runs");

        host.ensure_assignable("freshKey").expect("new keys are writable");
        assert!(host.lookup("freshKey").expect("lookup").is_none());
        assert_eq!(
            host.ensure_assignable("NaN").expect_err("read-only").code(),
            "namespace"
        );
        assert!(host.ensure_assignable("readOnlyView").is_err());
        assert!(host.assign("readOnlyView", JsValue::from(2)).is_err());
    }

    #[test]
    fn enumerates_own_enumerable_keys_in_order() {
        let mut host = ScriptHost::default();
        let value = host
            .eval(
                "inline:1",
                "(function () { var o = { b: 1, a: 2 }; Object.defineProperty(o, 'h', { value: 3 }); return o; })()",
            )
            .expect("object");
        let object = value.as_object().cloned().expect("is object");
        assert_eq!(
            host.own_enumerable_keys(&object).expect("keys"),
            vec!["b".to_owned(), "a".to_owned()]
        );
    }

    #[test]
    fn loop_iteration_limit_stops_runaway_scripts() {
        let mut host = ScriptHost::new(ScriptHostConfig {
            loop_iteration_limit: 1_000,
            ..ScriptHostConfig::default()
        });
        assert!(host.eval("inline:loop", "while (true) {}").is_err());
    }

    #[test]
    fn invoke_method_requires_a_function() {
        let mut host = ScriptHost::default();
        let value = host
            .eval("inline:1", "({ greet: function (name) { return 'hi ' + name; }, plain: 1 })")
            .expect("object");
        let object = value.as_object().cloned().expect("is object");

        let greeting = host
            .invoke_method("inline:2", &object, "greet", &[JsValue::from(js_string!("ada"))])
            .expect("callable");
        assert_eq!(
            host.to_display_string("inline:2", &greeting).expect("string"),
            "hi ada"
        );
        assert!(host.invoke_method("inline:3", &object, "plain", &[]).is_err());
    }
}
