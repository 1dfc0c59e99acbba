//! Parser plugin contracts and the plugin registry.
//!
//! Plugins claim and decode one payload format each. The registry is
//! built once at startup from an explicit configuration list, then
//! shared read-only across every parse session; there is no runtime
//! type scanning.

use async_trait::async_trait;
use std::sync::Arc;

use crate::app::models::{Activity, LocationInfo, ParseOutcome, TimeInterval};
use crate::app::services::builtin::JsonFieldDataPlugin;
use crate::error::{Error, Result};

/// Opaque handle to a pending visit inside one parse session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitHandle(pub(crate) usize);

/// Per-payload context handed to plugins
#[derive(Debug, Clone, Default)]
pub struct ParseContext {
    /// Name of the source file, for error messages
    pub file_name: String,
    /// Optional location identifier hinted by the caller, used when a
    /// document does not name its own location
    pub location_hint: Option<String>,
}

/// Sink through which a plugin reports parsed fragments.
///
/// Visits reported here are pending: materialization is deferred so
/// fragments parsed later in the same session can join them.
#[async_trait]
pub trait FieldDataSink: Send {
    /// Report a visit fragment; overlapping fragments at the same
    /// location collapse into one pending visit
    async fn add_visit(
        &mut self,
        location_identifier: &str,
        interval: TimeInterval,
    ) -> Result<VisitHandle>;

    /// Attach an activity to a pending visit, widening its window over
    /// the activity's timestamps
    async fn add_activity(&mut self, visit: VisitHandle, activity: Activity) -> Result<()>;

    /// Record the field party for a pending visit; the first reported
    /// party wins when fragments disagree
    async fn set_party(&mut self, visit: VisitHandle, party: &str) -> Result<()>;

    /// Resolve a location by its human-assigned identifier; `None`
    /// when the remote store does not know it
    async fn location_by_identifier(&self, identifier: &str) -> Result<Option<LocationInfo>>;

    /// Resolve a location by its server-assigned unique id
    async fn location_by_unique_id(&self, unique_id: &str) -> Result<Option<LocationInfo>>;
}

/// An external parser capable of claiming and decoding one payload
/// format.
///
/// "Not my format" is the expected [`ParseOutcome::CannotParse`] value,
/// never an error; errors are reserved for infrastructure failures.
#[async_trait]
pub trait FieldDataPlugin: Send + Sync {
    /// Stable plugin name used in logs and error messages
    fn name(&self) -> &str;

    /// Offer a payload to this plugin
    async fn parse(
        &self,
        payload: &[u8],
        context: &ParseContext,
        sink: &mut dyn FieldDataSink,
    ) -> Result<ParseOutcome>;
}

/// Ordered, registration-stable collection of parser plugins
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn FieldDataPlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configured plugin identifiers.
    ///
    /// Each identifier must resolve to exactly one implementation;
    /// unknown or duplicate identifiers are configuration errors.
    pub fn from_names(names: &[String]) -> Result<Self> {
        if names.is_empty() {
            return Err(Error::plugin_load("no plugins configured"));
        }

        let mut registry = Self::new();
        for name in names {
            if registry.plugins.iter().any(|p| p.name() == name) {
                return Err(Error::plugin_load(format!(
                    "plugin '{name}' resolves to more than one registration"
                )));
            }
            registry.register(resolve_builtin(name)?);
        }
        Ok(registry)
    }

    /// Append a plugin; priority follows registration order
    pub fn register(&mut self, plugin: Arc<dyn FieldDataPlugin>) {
        self.plugins.push(plugin);
    }

    /// Plugins in priority order
    pub fn plugins(&self) -> &[Arc<dyn FieldDataPlugin>] {
        &self.plugins
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field(
                "plugins",
                &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Resolve a configured identifier against the built-in plugin table
fn resolve_builtin(name: &str) -> Result<Arc<dyn FieldDataPlugin>> {
    match name {
        "json-field-data" => Ok(Arc::new(JsonFieldDataPlugin::new())),
        other => Err(Error::plugin_load(format!(
            "plugin '{other}' resolves to no implementation"
        ))),
    }
}
