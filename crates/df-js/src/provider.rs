//! DOM provider that builds window/document pairs inside a [`ScriptHost`].

use boa_engine::Context;
use boa_engine::JsNativeError;
use boa_engine::JsObject;
use boa_engine::JsResult;
use boa_engine::JsString;
use boa_engine::JsValue;
use boa_engine::NativeFunction;
use df_core::DomifyError;
use df_core::DomifyResult;
use df_html::HtmlParser;
use df_html::ParserConfig;
use df_lifecycle::DomInstance;
use df_lifecycle::DomProvider;
use serde::Serialize;
use url::Url;

use crate::ScriptHost;
use crate::bootstrap::DOM_FACTORY;

/// Environment the provider presents to DOM code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Document URL, exposed through `location` and `document.URL`.
    pub url: String,
    pub user_agent: String,
    pub language: String,
    pub inner_width: u32,
    pub inner_height: u32,
    pub parser: ParserConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            url: "about:blank".to_owned(),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) domify/0.1".to_owned(),
            language: "en-US".to_owned(),
            inner_width: 1024,
            inner_height: 768,
            parser: ParserConfig::default(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ShimOptions<'a> {
    href: String,
    protocol: String,
    host: String,
    hostname: String,
    port: String,
    pathname: String,
    search: String,
    hash: String,
    origin: String,
    user_agent: &'a str,
    language: &'a str,
    inner_width: u32,
    inner_height: u32,
}

impl<'a> ShimOptions<'a> {
    fn new(config: &'a ProviderConfig, url: &Url) -> Self {
        let hostname = url.host_str().unwrap_or_default().to_owned();
        let port = url.port().map(|port| port.to_string()).unwrap_or_default();
        let host = if port.is_empty() {
            hostname.clone()
        } else {
            format!("{hostname}:{port}")
        };
        Self {
            href: url.as_str().to_owned(),
            protocol: format!("{}:", url.scheme()),
            host,
            hostname,
            port,
            pathname: url.path().to_owned(),
            search: url.query().map(|query| format!("?{query}")).unwrap_or_default(),
            hash: url
                .fragment()
                .map(|fragment| format!("#{fragment}"))
                .unwrap_or_default(),
            origin: url.origin().ascii_serialization(),
            user_agent: &config.user_agent,
            language: &config.language,
            inner_width: config.inner_width,
            inner_height: config.inner_height,
        }
    }
}

/// Builds DOM instances in the host's script context.
#[derive(Debug, Clone, Default)]
pub struct BoaDomProvider {
    config: ProviderConfig,
    parser: HtmlParser,
}

impl BoaDomProvider {
    pub fn new(config: ProviderConfig) -> Self {
        let parser = HtmlParser::new(config.parser);
        Self { config, parser }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn options_json(&self) -> DomifyResult<String> {
        let url = Url::parse(&self.config.url).map_err(|error| {
            DomifyError::provider_initialization(format!(
                "invalid document url `{}`: {error}",
                self.config.url
            ))
        })?;
        serde_json::to_string(&ShimOptions::new(&self.config, &url))
            .map_err(|error| DomifyError::provider_initialization(error.to_string()))
    }
}

impl DomProvider<ScriptHost> for BoaDomProvider {
    type Instance = BoaDomInstance;

    fn instantiate(&mut self, host: &mut ScriptHost, markup: &str) -> DomifyResult<BoaDomInstance> {
        let options = self.options_json()?;
        let seed = document_snapshot_json(&self.parser, markup)?;

        let factory = host.eval_callable("dom-factory", DOM_FACTORY)?;
        let parser_config = self.config.parser;
        let parse_fragment = NativeFunction::from_copy_closure(move |_this, args, context| {
            parse_fragment_json(parser_config, args, context)
        })
        .to_js_function(host.context_mut().realm());

        let controller = host.call(
            "dom-factory",
            &factory,
            &JsValue::undefined(),
            &[
                JsValue::from(JsString::from(seed.as_str())),
                JsValue::from(parse_fragment),
                JsValue::from(JsString::from(options.as_str())),
            ],
        )?;
        let controller = expect_object("dom-factory", controller)?;
        let window = host.property("dom-factory", &controller, "window")?;
        let window = expect_object("dom-factory", window)?;
        let document = host.property("dom-factory", &controller, "document")?;
        let document = expect_object("dom-factory", document)?;

        tracing::debug!(
            url = %self.config.url,
            seed_bytes = markup.len(),
            "dom provider instantiated"
        );
        Ok(BoaDomInstance {
            controller,
            window,
            document: DocumentHandle { object: document },
            parser: self.parser.clone(),
        })
    }
}

/// A window/document pair living in the host's script context.
#[derive(Debug)]
pub struct BoaDomInstance {
    controller: JsObject,
    window: JsObject,
    document: DocumentHandle,
    parser: HtmlParser,
}

impl BoaDomInstance {
    pub fn window(&self) -> &JsObject {
        &self.window
    }

    /// Runs queued timer callbacks in FIFO order, at most `limit` of them,
    /// and returns how many ran.
    pub fn flush_timers(&self, host: &mut ScriptHost, limit: u32) -> DomifyResult<u32> {
        let ran = host.invoke_method(
            "timers",
            &self.controller,
            "flushTimers",
            &[JsValue::from(limit)],
        )?;
        count(host, "timers", &ran)
    }

    pub fn pending_timers(&self, host: &mut ScriptHost) -> DomifyResult<u32> {
        let pending = host.invoke_method("timers", &self.controller, "pendingTimers", &[])?;
        count(host, "timers", &pending)
    }
}

impl DomInstance<ScriptHost> for BoaDomInstance {
    type Document = DocumentHandle;

    fn window_properties(&self, host: &mut ScriptHost) -> DomifyResult<Vec<(String, JsValue)>> {
        let keys = host.own_enumerable_keys(&self.window)?;
        let mut properties = Vec::with_capacity(keys.len());
        for key in keys {
            let value = host.property("window", &self.window, &key)?;
            properties.push((key, value));
        }
        Ok(properties)
    }

    fn document(&self) -> DocumentHandle {
        self.document.clone()
    }

    fn reset_document(&mut self, host: &mut ScriptHost, markup: &str) -> DomifyResult<()> {
        let seed = document_snapshot_json(&self.parser, markup)?;
        host.invoke_method(
            "dom-reset",
            &self.controller,
            "reset",
            &[JsValue::from(JsString::from(seed.as_str()))],
        )?;
        Ok(())
    }

    fn close(self, host: &mut ScriptHost) {
        if let Err(error) = host.invoke_method("dom-detach", &self.controller, "detach", &[]) {
            tracing::warn!(%error, "failed to detach dom instance");
        }
    }
}

/// The document object of a DOM instance.
///
/// Handles compare by object identity. A handle kept past `destroy` still
/// reads, but every mutating call on it throws.
#[derive(Debug, Clone)]
pub struct DocumentHandle {
    object: JsObject,
}

impl DocumentHandle {
    pub fn object(&self) -> &JsObject {
        &self.object
    }

    pub fn to_value(&self) -> JsValue {
        JsValue::from(self.object.clone())
    }

    pub fn is_same(&self, other: &Self) -> bool {
        JsObject::equals(&self.object, &other.object)
    }

    /// Calls `document[method](...args)`.
    pub fn invoke(
        &self,
        host: &mut ScriptHost,
        method: &str,
        args: &[JsValue],
    ) -> DomifyResult<JsValue> {
        host.invoke_method("document", &self.object, method, args)
    }

    pub fn count_by_tag(&self, host: &mut ScriptHost, tag_name: &str) -> DomifyResult<u32> {
        let list = self.invoke(
            host,
            "getElementsByTagName",
            &[JsValue::from(JsString::from(tag_name))],
        )?;
        let list = expect_object("document", list)?;
        let length = host.property("document", &list, "length")?;
        count(host, "document", &length)
    }

    pub fn body_inner_html(&self, host: &mut ScriptHost) -> DomifyResult<String> {
        let body = host.property("document", &self.object, "body")?;
        let body = expect_object("document", body)?;
        let html = host.property("document", &body, "innerHTML")?;
        host.to_display_string("document", &html)
    }

    pub fn element_exists(&self, host: &mut ScriptHost, id: &str) -> DomifyResult<bool> {
        let element = self.invoke(host, "getElementById", &[JsValue::from(JsString::from(id))])?;
        Ok(element.is_object())
    }

    pub fn title(&self, host: &mut ScriptHost) -> DomifyResult<String> {
        let title = host.property("document", &self.object, "title")?;
        host.to_display_string("document", &title)
    }
}

impl PartialEq for DocumentHandle {
    fn eq(&self, other: &Self) -> bool {
        self.is_same(other)
    }
}

fn document_snapshot_json(parser: &HtmlParser, markup: &str) -> DomifyResult<String> {
    let document = parser
        .parse_document(markup)
        .map_err(|error| DomifyError::provider_initialization(error.to_string()))?;
    serde_json::to_string(&document.snapshot_children(document.root()))
        .map_err(|error| DomifyError::provider_initialization(error.to_string()))
}

/// Native half of `innerHTML` assignment: markup in, snapshot JSON out.
fn parse_fragment_json(
    config: ParserConfig,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let markup = match args.first() {
        Some(value) => value.to_string(context)?.to_std_string_escaped(),
        None => String::new(),
    };
    let fragment = HtmlParser::new(config)
        .parse_fragment(&markup)
        .map_err(|error| JsNativeError::syntax().with_message(error.to_string()))?;
    let json = serde_json::to_string(&fragment.snapshot_children(fragment.root()))
        .map_err(|error| JsNativeError::typ().with_message(error.to_string()))?;
    Ok(JsValue::from(JsString::from(json.as_str())))
}

fn expect_object(origin: &str, value: JsValue) -> DomifyResult<JsObject> {
    value
        .as_object()
        .cloned()
        .ok_or_else(|| DomifyError::script(origin, "expected an object"))
}

fn count(host: &mut ScriptHost, origin: &str, value: &JsValue) -> DomifyResult<u32> {
    match value.as_number() {
        Some(number) if number >= 0.0 && number.fract() == 0.0 && number <= f64::from(u32::MAX) => {
            Ok(number as u32)
        }
        _ => {
            let shown = host.to_display_string(origin, value)?;
            Err(DomifyError::script(origin, format!("expected a count, got {shown}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::BoaDomProvider;
    use super::ProviderConfig;
    use crate::ScriptHost;
    use boa_engine::JsValue;
    use boa_engine::js_string;
    use df_html::ParserConfig;
    use df_lifecycle::DomInstance;
    use df_lifecycle::DomProvider;
    use df_lifecycle::GlobalNamespace;

    fn instantiate(host: &mut ScriptHost, markup: &str) -> super::BoaDomInstance {
        BoaDomProvider::default()
            .instantiate(host, markup)
            .expect("provider builds an instance")
    }

    #[test]
    fn instantiation_binds_nothing_on_the_global_object() {
        let mut host = ScriptHost::default();
        let before = host.global_property_names().expect("names");
        let instance = instantiate(&mut host, "<p>hi</p>");
        assert_eq!(host.global_property_names().expect("names"), before);
        instance.close(&mut host);
    }

    #[test]
    fn window_exposes_document_and_environment() {
        let mut host = ScriptHost::default();
        let instance = instantiate(&mut host, "<title>Demo</title><p>hi</p>");
        let properties = instance.window_properties(&mut host).expect("window keys");
        let keys: Vec<&str> = properties.iter().map(|(key, _)| key.as_str()).collect();
        for expected in [
            "window",
            "self",
            "document",
            "navigator",
            "location",
            "setTimeout",
            "HTMLElement",
        ] {
            assert!(keys.contains(&expected), "window is missing {expected}");
        }

        let document = instance.document();
        assert_eq!(document.title(&mut host).expect("title"), "Demo");
        assert_eq!(document.count_by_tag(&mut host, "p").expect("count"), 1);
        assert_eq!(
            document.body_inner_html(&mut host).expect("body"),
            "<p>hi</p>"
        );
    }

    #[test]
    fn location_reflects_the_configured_url() {
        let mut host = ScriptHost::default();
        let mut provider = BoaDomProvider::new(ProviderConfig {
            url: "https://example.test:8443/app/index.html?mode=dark#top".to_owned(),
            ..ProviderConfig::default()
        });
        let instance = provider.instantiate(&mut host, "").expect("instance");
        let window = instance.window().clone();
        let location = host.property("test", &window, "location").expect("location");
        let location = location.as_object().cloned().expect("object");
        let read = |host: &mut ScriptHost, key: &str| {
            let value = host.property("test", &location, key).expect("property");
            host.to_display_string("test", &value).expect("string")
        };
        assert_eq!(read(&mut host, "protocol"), "https:");
        assert_eq!(read(&mut host, "host"), "example.test:8443");
        assert_eq!(read(&mut host, "pathname"), "/app/index.html");
        assert_eq!(read(&mut host, "search"), "?mode=dark");
        assert_eq!(read(&mut host, "hash"), "#top");
        assert_eq!(read(&mut host, "origin"), "https://example.test:8443");
    }

    #[test]
    fn invalid_url_fails_initialization() {
        let mut host = ScriptHost::default();
        let mut provider = BoaDomProvider::new(ProviderConfig {
            url: "not a url".to_owned(),
            ..ProviderConfig::default()
        });
        let error = provider.instantiate(&mut host, "").expect_err("url rejected");
        assert!(error.is_provider_initialization());
    }

    #[test]
    fn oversized_seed_fails_initialization() {
        let mut host = ScriptHost::default();
        let mut provider = BoaDomProvider::new(ProviderConfig {
            parser: ParserConfig {
                max_input_bytes: 8,
                ..ParserConfig::default()
            },
            ..ProviderConfig::default()
        });
        let error = provider
            .instantiate(&mut host, "<p>far too long</p>")
            .expect_err("seed rejected");
        assert!(error.is_provider_initialization());
    }

    #[test]
    fn reset_keeps_document_identity() {
        let mut host = ScriptHost::default();
        let mut instance = instantiate(&mut host, "<p>one</p>");
        let before = instance.document();
        instance
            .reset_document(&mut host, "<div>two</div>")
            .expect("reset");
        let after = instance.document();
        assert!(before.is_same(&after));
        assert_eq!(after.body_inner_html(&mut host).expect("body"), "<div>two</div>");
    }

    #[test]
    fn close_detaches_captured_handles() {
        let mut host = ScriptHost::default();
        let instance = instantiate(&mut host, "");
        let document = instance.document();
        instance.close(&mut host);

        let error = document
            .invoke(&mut host, "createElement", &[JsValue::from(js_string!("p"))])
            .expect_err("detached");
        assert!(error.to_string().contains("InvalidStateError"));
    }

    #[test]
    fn inner_html_assignment_uses_the_markup_parser() {
        let mut host = ScriptHost::default();
        let instance = instantiate(&mut host, "<div id=\"root\"></div>");
        let window = instance.window().clone();
        let document = host.property("test", &window, "document").expect("document");
        host.assign("document", document).expect("assign");
        let count = host
            .eval_string(
                "inline:1",
                "var root = document.getElementById('root'); \
                 root.innerHTML = '<ul><li>a<li>b</ul><br/>tail &amp; more'; \
                 root.children.length + ':' + root.getElementsByTagName('li').length + ':' + root.textContent",
            )
            .expect("script runs");
        assert_eq!(count, "2:2:abtail & more");
    }

    #[test]
    fn timers_run_only_when_flushed() {
        let mut host = ScriptHost::default();
        let instance = instantiate(&mut host, "");
        let window = instance.window().clone();
        let set_timeout = host.property("test", &window, "setTimeout").expect("setTimeout");
        host.assign("setTimeout", set_timeout).expect("assign");
        host.eval(
            "inline:1",
            "globalThis.ticks = 0; setTimeout(function () { ticks += 1; }, 10); setTimeout('ticks += 10', 0);",
        )
        .expect("script runs");

        assert_eq!(instance.pending_timers(&mut host).expect("pending"), 2);
        assert_eq!(host.eval_string("inline:2", "String(ticks)").expect("reads"), "0");
        assert_eq!(instance.flush_timers(&mut host, 16).expect("flush"), 2);
        assert_eq!(host.eval_string("inline:3", "String(ticks)").expect("reads"), "11");
        assert_eq!(instance.pending_timers(&mut host).expect("pending"), 0);
    }
}
