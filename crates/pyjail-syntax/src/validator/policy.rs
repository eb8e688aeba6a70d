//! Limits and denylist the validator enforces.

use pyjail_config::{
    Config, DEFAULT_MAX_FUNCTION_DEFINITIONS, DEFAULT_MAX_SCRIPT_BYTES, NameList,
    default_denied_attributes, default_denied_calls, default_denied_modules,
};

/// Names a script may not import, reference, or access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denylist {
    modules: NameList,
    calls: NameList,
    attributes: NameList,
}

impl Denylist {
    /// Builds a denylist from explicit name lists.
    #[must_use]
    pub const fn new(modules: NameList, calls: NameList, attributes: NameList) -> Self {
        Self {
            modules,
            calls,
            attributes,
        }
    }

    /// Returns the denied module, if `module` or one of its parent packages
    /// is listed.
    #[must_use]
    pub fn denied_module<'a>(&self, module: &'a str) -> Option<&'a str> {
        let mut prefix_end = 0;
        for segment in module.split('.') {
            prefix_end += segment.len();
            let prefix = module.get(..prefix_end)?;
            if self.modules.contains(prefix) {
                return Some(prefix);
            }
            prefix_end += 1;
        }
        None
    }

    /// Returns whether `name` is a denied builtin.
    #[must_use]
    pub fn denies_call(&self, name: &str) -> bool {
        self.calls.contains(name)
    }

    /// Returns whether a qualified path such as `os.system`, or a bare
    /// attribute name such as `__globals__`, is listed.
    #[must_use]
    pub fn denies_attribute(&self, path: &str) -> bool {
        self.attributes.contains(path)
    }

    /// Returns whether any denied attribute lives directly under `module`.
    #[must_use]
    pub fn has_attributes_under(&self, module: &str) -> bool {
        self.attributes.iter().any(|path| {
            path.strip_prefix(module)
                .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    /// Segment count of the longest qualified attribute.
    pub(crate) fn max_attribute_depth(&self) -> usize {
        self.attributes
            .iter()
            .map(|path| path.split('.').count())
            .max()
            .unwrap_or(0)
    }
}

impl Default for Denylist {
    fn default() -> Self {
        Self::new(
            default_denied_modules(),
            default_denied_calls(),
            default_denied_attributes(),
        )
    }
}

/// Everything the validator needs to judge a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPolicy {
    max_script_bytes: usize,
    max_function_definitions: usize,
    denylist: Denylist,
}

impl ValidationPolicy {
    /// Builds a policy from explicit limits.
    #[must_use]
    pub const fn new(
        max_script_bytes: usize,
        max_function_definitions: usize,
        denylist: Denylist,
    ) -> Self {
        Self {
            max_script_bytes,
            max_function_definitions,
            denylist,
        }
    }

    /// Builds the policy described by the service configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.max_script_bytes(),
            config.max_function_definitions(),
            Denylist::new(
                config.denied_modules().clone(),
                config.denied_calls().clone(),
                config.denied_attributes().clone(),
            ),
        )
    }

    /// Replaces the script size limit.
    #[must_use]
    pub const fn with_max_script_bytes(mut self, max_script_bytes: usize) -> Self {
        self.max_script_bytes = max_script_bytes;
        self
    }

    /// Replaces the function definition budget.
    #[must_use]
    pub const fn with_max_function_definitions(mut self, max_function_definitions: usize) -> Self {
        self.max_function_definitions = max_function_definitions;
        self
    }

    /// Largest accepted script, in bytes.
    #[must_use]
    pub const fn max_script_bytes(&self) -> usize {
        self.max_script_bytes
    }

    /// Largest number of function definitions.
    #[must_use]
    pub const fn max_function_definitions(&self) -> usize {
        self.max_function_definitions
    }

    /// Names the script may not use.
    #[must_use]
    pub const fn denylist(&self) -> &Denylist {
        &self.denylist
    }
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_SCRIPT_BYTES,
            DEFAULT_MAX_FUNCTION_DEFINITIONS,
            Denylist::default(),
        )
    }
}
