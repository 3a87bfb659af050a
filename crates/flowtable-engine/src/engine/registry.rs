//! Backend registry: language tags, aliases and dispatch.
//!
//! A formula expression starts with a `[tag]` naming the language it is
//! written in. The registry lower-cases the tag, resolves it through the alias
//! table and hands the remaining code to the matching [`Backend`].

use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use super::extract::RenderedGrid;
use super::formula::{Direction, FormatSpec, Formula};
use crate::error::{EngineError, Result};

/// Ingested data: variable name to arbitrary nested value.
pub type DataMap = Map<String, Value>;

/// Aliases every registry starts with.
pub const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("javascript", "js"),
    ("ecmascript", "js"),
    ("es", "js"),
    ("python", "py"),
];

/// An expression-evaluation engine for one language.
pub trait Backend {
    /// Canonical language tag, also usable as an alias.
    fn name(&self) -> &str;

    /// Bind every top-level entry of `data` as a read-only variable.
    fn init_data(&mut self, data: &DataMap) -> Result<()>;

    /// Evaluate `code` (tag already stripped) and shape the result.
    fn calc_value(
        &mut self,
        code: &str,
        direction: Direction,
        format: &FormatSpec,
    ) -> Result<RenderedGrid>;
}

fn lang_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)^\[(\w+)\](.*)$").expect("valid language tag regex"))
}

/// Split `[tag]code` into the lower-cased tag and the code.
pub fn split_lang_tag(code: &str) -> Result<(String, &str)> {
    let caps = lang_re()
        .captures(code)
        .ok_or(EngineError::WrongCodeFormat)?;
    let tag = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    let body = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
    Ok((tag.to_lowercase(), body))
}

/// Per-session set of backends plus the alias table used to find them.
pub struct Registry {
    backends: HashMap<String, Box<dyn Backend>>,
    aliases: BTreeMap<String, String>,
}

impl Registry {
    /// An empty registry with the default aliases and no backends.
    pub fn new() -> Self {
        let aliases = DEFAULT_ALIASES
            .iter()
            .map(|(alias, name)| (alias.to_string(), name.to_string()))
            .collect();
        Registry {
            backends: HashMap::new(),
            aliases,
        }
    }

    /// A registry holding every backend compiled into this build.
    pub fn with_default_backends() -> Result<Self> {
        let mut registry = Registry::new();
        for backend in crate::backends::default_backends()? {
            registry.register(backend);
        }
        Ok(registry)
    }

    /// Add a backend; its name becomes an alias of itself.
    pub fn register(&mut self, backend: Box<dyn Backend>) {
        let name = backend.name().to_lowercase();
        log::debug!("registering backend {}", name);
        self.aliases.insert(name.clone(), name.clone());
        self.backends.insert(name, backend);
    }

    /// Map `alias` (case-insensitive) to the backend called `target`.
    pub fn add_alias(&mut self, alias: &str, target: &str) {
        self.aliases
            .insert(alias.to_lowercase(), target.to_lowercase());
    }

    /// Drop every backend whose name is not in `keep`.
    pub fn retain_backends(&mut self, keep: &[String]) {
        self.backends
            .retain(|name, _| keep.iter().any(|k| k.eq_ignore_ascii_case(name)));
    }

    /// Names of the registered backends, sorted.
    pub fn backend_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolve a language tag to the name of a registered backend.
    pub fn resolve(&self, tag: &str) -> Option<&str> {
        let name = self.aliases.get(&tag.to_lowercase())?;
        self.backends.contains_key(name).then_some(name.as_str())
    }

    /// Hand the ingested data to every backend. Stops at the first failure.
    pub fn init_data(&mut self, data: &DataMap) -> Result<()> {
        for name in self.backend_names() {
            if let Some(backend) = self.backends.get_mut(&name) {
                log::debug!("binding {} variables into {}", data.len(), name);
                backend.init_data(data)?;
            }
        }
        Ok(())
    }

    /// Evaluate a formula with the backend named by its tag.
    pub fn calc_value(&mut self, formula: &Formula) -> Result<RenderedGrid> {
        let (tag, code) = split_lang_tag(&formula.code)?;
        let name = self
            .aliases
            .get(&tag)
            .ok_or_else(|| EngineError::UnknownLang(tag.clone()))?;
        let backend = self
            .backends
            .get_mut(name)
            .ok_or_else(|| EngineError::UnknownLang(tag.clone()))?;
        backend.calc_value(code, formula.direction, &formula.format)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::extract::tests::Fake;
    use crate::engine::extract::{Scalar, shape};

    /// Backend that answers every expression with its code length.
    struct EchoBackend {
        name: &'static str,
        bound: Option<usize>,
    }

    impl Backend for EchoBackend {
        fn name(&self) -> &str {
            self.name
        }

        fn init_data(&mut self, data: &DataMap) -> Result<()> {
            self.bound = Some(data.len());
            Ok(())
        }

        fn calc_value(
            &mut self,
            code: &str,
            direction: Direction,
            format: &FormatSpec,
        ) -> Result<RenderedGrid> {
            if self.bound.is_none() {
                return Err(EngineError::evaluation(self.name, "no data bound"));
            }
            shape(&Fake::Int(code.len() as i64), direction, format)
        }
    }

    fn echo(name: &'static str) -> Box<dyn Backend> {
        Box::new(EchoBackend { name, bound: None })
    }

    fn formula(text: &str) -> Formula {
        Formula::parse(text).unwrap()
    }

    #[test]
    fn test_split_lang_tag() {
        assert_eq!(split_lang_tag("[Py]1+1").unwrap(), ("py".to_string(), "1+1"));
        assert_eq!(split_lang_tag("[js]").unwrap(), ("js".to_string(), ""));
        assert!(matches!(
            split_lang_tag("1+1"),
            Err(EngineError::WrongCodeFormat)
        ));
        assert!(matches!(
            split_lang_tag("[]1"),
            Err(EngineError::WrongCodeFormat)
        ));
    }

    #[test]
    fn test_aliases_resolve_case_insensitively() {
        let mut registry = Registry::new();
        registry.register(echo("js"));
        registry.register(echo("py"));

        assert_eq!(registry.resolve("JavaScript"), Some("js"));
        assert_eq!(registry.resolve("es"), Some("js"));
        assert_eq!(registry.resolve("Python"), Some("py"));
        assert_eq!(registry.resolve("PY"), Some("py"));
        assert_eq!(registry.resolve("lua"), None);
    }

    #[test]
    fn test_alias_to_missing_backend_is_unknown() {
        let mut registry = Registry::new();
        registry.register(echo("js"));
        // "python" is a default alias, but nothing named "py" is registered.
        let err = registry.calc_value(&formula("{{C(d)|[python]1}}")).unwrap_err();
        assert!(matches!(err, EngineError::UnknownLang(ref tag) if tag == "python"));
    }

    #[test]
    fn test_calc_value_dispatches_stripped_code() {
        let mut registry = Registry::new();
        registry.register(echo("js"));
        registry.init_data(&DataMap::new()).unwrap();
        let grid = registry
            .calc_value(&formula("{{C(d)|[ECMAScript]abcd}}"))
            .unwrap();
        assert_eq!(grid.get(0, 0), Some(&Scalar::Int(4)));
    }

    #[test]
    fn test_unknown_lang_and_wrong_format() {
        let mut registry = Registry::new();
        registry.register(echo("js"));

        let err = registry.calc_value(&formula("{{[lua]1}}")).unwrap_err();
        assert!(matches!(err, EngineError::UnknownLang(ref tag) if tag == "lua"));

        let err = registry.calc_value(&formula("{{C(d)|1 + 1}}")).unwrap_err();
        assert!(matches!(err, EngineError::WrongCodeFormat));
    }

    #[test]
    fn test_custom_alias_and_retain() {
        let mut registry = Registry::new();
        registry.register(echo("js"));
        registry.register(echo("cel"));
        registry.add_alias("Node", "JS");
        assert_eq!(registry.resolve("node"), Some("js"));

        registry.retain_backends(&["cel".to_string()]);
        assert_eq!(registry.backend_names(), vec!["cel".to_string()]);
        assert_eq!(registry.resolve("node"), None);
    }

    #[test]
    fn test_init_data_reaches_every_backend() {
        let mut registry = Registry::new();
        registry.register(echo("js"));
        registry.register(echo("cel"));
        let mut data = DataMap::new();
        data.insert("a".to_string(), Value::from(1));
        data.insert("b".to_string(), Value::from("x"));
        registry.init_data(&data).unwrap();
        // Echo backends refuse to evaluate before data is bound.
        for tag in ["js", "cel"] {
            let text = format!("{{{{C(d)|[{}]xy}}}}", tag);
            let grid = registry.calc_value(&formula(&text)).unwrap();
            assert_eq!(grid.get(0, 0), Some(&Scalar::Int(2)));
        }
    }
}
