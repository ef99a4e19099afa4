//! Plugin manager and context enhancement
//!
//! A plugin is a named unit contributing optional prop enhancements and/or
//! slot-specific fragments to the table engine. Capabilities are declared
//! up front ([`Capability`]) and the manager consults only declared ones,
//! with no optional-method probing. Each [`PluginManager`] is owned by exactly
//! one table instance; there is no module-level registry.

use std::borrow::Cow;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::PluginError;
use crate::query::Query;
use crate::render::{Fragment, PropBag};

/// A fixed UI slot a plugin can render into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Placeholder shown when the table has no rows.
    NoData,
    /// Shown instead of the data grid when a fetch failed.
    ErrorState,
    /// The filter bar above the grid.
    FilterBar,
    /// Informational banner.
    Alert,
    /// Footer control for load-more pagination.
    LoadMore,
}

impl Slot {
    /// Stable slot name, used for fragment keys and lookups.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NoData => "no-data",
            Self::ErrorState => "error-state",
            Self::FilterBar => "filter-bar",
            Self::Alert => "alert",
            Self::LoadMore => "load-more",
        }
    }

    /// All slots, in composition order.
    pub fn all() -> [Slot; 5] {
        [
            Self::NoData,
            Self::ErrorState,
            Self::FilterBar,
            Self::Alert,
            Self::LoadMore,
        ]
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A capability a plugin declares at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// The plugin contributes prop enhancements to the shared context.
    EnhancesProps,
    /// The plugin renders a fragment for the given slot.
    RendersSlot(Slot),
}

/// Shared context assembled once per render pass and handed to every
/// plugin.
#[derive(Debug, Clone)]
pub struct PluginContext {
    /// Current (normalized) query.
    pub query: Query,
    /// A fetch is in flight.
    pub loading: bool,
    /// Message of the last fetch error, if any.
    pub error: Option<String>,
    /// Total row count from the last fetch.
    pub total: u64,
    /// Rows currently held.
    pub row_count: usize,
    /// The table has never completed a search.
    pub never_searched: bool,
    /// Base props before enhancement.
    pub props: PropBag,
    /// Bumped by the owner whenever any context input changes; used by the
    /// slot composition cache.
    pub generation: u64,
}

/// Arguments for a slot render call.
#[derive(Debug, Clone)]
pub struct RenderArgs {
    /// The slot being rendered.
    pub slot: Slot,
    /// Enhanced props for this render pass.
    pub props: PropBag,
}

/// A named unit of table behavior.
///
/// Implementations declare their capabilities; the manager never calls a
/// method whose capability was not declared.
pub trait Plugin: Send + Sync {
    /// Unique plugin name within one manager.
    fn name(&self) -> &str;

    /// Disabled plugins are skipped by every pass.
    fn enabled(&self) -> bool {
        true
    }

    /// Declared capabilities.
    fn capabilities(&self) -> Vec<Capability>;

    /// Contribute a prop patch, merged onto the accumulating props.
    ///
    /// Only consulted when [`Capability::EnhancesProps`] is declared.
    /// Later plugins see earlier plugins' contributions through `props`.
    fn enhance_props(
        &self,
        _props: &PropBag,
        _ctx: &PluginContext,
    ) -> Result<PropBag, PluginError> {
        Ok(PropBag::new())
    }

    /// Render a fragment for a slot.
    ///
    /// Only consulted for slots declared via [`Capability::RendersSlot`].
    fn render(&self, _slot: Slot, _args: &RenderArgs) -> Result<Option<Fragment>, PluginError> {
        Ok(None)
    }
}

/// Registry of plugins owned by one table instance.
///
/// Plugins are iterated in registration order. A throwing plugin is
/// skipped with a log line, never aborting the pipeline.
pub struct PluginManager {
    plugins: Vec<Arc<dyn Plugin>>,
    /// `(plugin name, slot)` to plugin index, built once at construction.
    slot_index: HashMap<(String, Slot), usize>,
    id: u64,
}

impl PluginManager {
    /// Builds a manager over the given plugins.
    pub fn new(plugins: Vec<Arc<dyn Plugin>>) -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let mut slot_index = HashMap::new();
        for (idx, plugin) in plugins.iter().enumerate() {
            for capability in plugin.capabilities() {
                if let Capability::RendersSlot(slot) = capability {
                    slot_index.insert((plugin.name().to_string(), slot), idx);
                }
            }
        }
        Self {
            plugins,
            slot_index,
            id: COUNTER.fetch_add(1, Ordering::SeqCst),
        }
    }

    /// All registered plugins, in registration order.
    pub fn all(&self) -> &[Arc<dyn Plugin>] {
        &self.plugins
    }

    /// Identity of this manager instance, used by composition caches.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Runs the enhancement pass.
    ///
    /// When no enabled plugin declares [`Capability::EnhancesProps`] the
    /// base bag is returned borrowed, so callers can memoize on identity.
    /// Otherwise each enabled enhancer's patch is folded onto an
    /// accumulating bag, last write wins per key; a failing enhancer is
    /// skipped.
    pub fn enhance<'a>(&self, base: &'a PropBag, ctx: &PluginContext) -> Cow<'a, PropBag> {
        let enhancers: Vec<&Arc<dyn Plugin>> = self
            .plugins
            .iter()
            .filter(|p| p.enabled())
            .filter(|p| p.capabilities().contains(&Capability::EnhancesProps))
            .collect();
        if enhancers.is_empty() {
            return Cow::Borrowed(base);
        }
        let mut acc = base.clone();
        for plugin in enhancers {
            let outcome = catch_unwind(AssertUnwindSafe(|| plugin.enhance_props(&acc, ctx)));
            match outcome {
                Ok(Ok(patch)) => acc.merge(patch),
                Ok(Err(err)) => {
                    log::warn!("plugin {:?} enhancement failed: {err}", plugin.name());
                }
                Err(_) => {
                    log::warn!("plugin {:?} enhancement panicked", plugin.name());
                }
            }
        }
        Cow::Owned(acc)
    }

    /// Renders a specific `(plugin, slot)` pair.
    ///
    /// Returns `None` when the plugin is unknown, disabled, did not declare
    /// the slot, declined to render, or failed; a failing render degrades
    /// the slot instead of propagating.
    pub fn render_slot(
        &self,
        plugin_name: &str,
        slot: Slot,
        args: &RenderArgs,
    ) -> Option<Fragment> {
        let idx = *self.slot_index.get(&(plugin_name.to_string(), slot))?;
        let plugin = &self.plugins[idx];
        if !plugin.enabled() {
            return None;
        }
        self.try_render(plugin, slot, args)
    }

    /// Renders a slot via the first enabled plugin (registration order)
    /// that declared it and produced a fragment.
    pub fn render_first(&self, slot: Slot, args: &RenderArgs) -> Option<Fragment> {
        self.plugins
            .iter()
            .filter(|p| p.enabled())
            .filter(|p| p.capabilities().contains(&Capability::RendersSlot(slot)))
            .find_map(|p| self.try_render(p, slot, args))
    }

    fn try_render(&self, plugin: &Arc<dyn Plugin>, slot: Slot, args: &RenderArgs) -> Option<Fragment> {
        let outcome = catch_unwind(AssertUnwindSafe(|| plugin.render(slot, args)));
        match outcome {
            // Isolate each plugin's render tree under a stable key.
            Ok(Ok(Some(fragment))) => Some(Fragment::keyed(
                format!("{}:{}", plugin.name(), slot.name()),
                fragment,
            )),
            Ok(Ok(None)) => None,
            Ok(Err(err)) => {
                log::warn!("plugin {:?} failed to render {slot}: {err}", plugin.name());
                None
            }
            Err(_) => {
                log::warn!("plugin {:?} panicked rendering {slot}", plugin.name());
                None
            }
        }
    }
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.plugins.iter().map(|p| p.name()).collect();
        f.debug_struct("PluginManager")
            .field("id", &self.id)
            .field("plugins", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BannerPlugin {
        enabled: bool,
    }

    impl Plugin for BannerPlugin {
        fn name(&self) -> &str {
            "banner"
        }

        fn enabled(&self) -> bool {
            self.enabled
        }

        fn capabilities(&self) -> Vec<Capability> {
            vec![Capability::EnhancesProps, Capability::RendersSlot(Slot::Alert)]
        }

        fn enhance_props(
            &self,
            _props: &PropBag,
            _ctx: &PluginContext,
        ) -> Result<PropBag, PluginError> {
            Ok(PropBag::new().with("banner", "on"))
        }

        fn render(&self, _slot: Slot, _args: &RenderArgs) -> Result<Option<Fragment>, PluginError> {
            Ok(Some(Fragment::text("banner text")))
        }
    }

    struct BrokenPlugin;

    impl Plugin for BrokenPlugin {
        fn name(&self) -> &str {
            "broken"
        }

        fn capabilities(&self) -> Vec<Capability> {
            vec![Capability::EnhancesProps, Capability::RendersSlot(Slot::Alert)]
        }

        fn enhance_props(
            &self,
            _props: &PropBag,
            _ctx: &PluginContext,
        ) -> Result<PropBag, PluginError> {
            Err(PluginError::new("enhancement exploded"))
        }

        fn render(&self, _slot: Slot, _args: &RenderArgs) -> Result<Option<Fragment>, PluginError> {
            panic!("render exploded");
        }
    }

    struct OverridePlugin;

    impl Plugin for OverridePlugin {
        fn name(&self) -> &str {
            "override"
        }

        fn capabilities(&self) -> Vec<Capability> {
            vec![Capability::EnhancesProps]
        }

        fn enhance_props(
            &self,
            props: &PropBag,
            _ctx: &PluginContext,
        ) -> Result<PropBag, PluginError> {
            // Later plugins see and may override earlier contributions.
            assert_eq!(props.get("banner").and_then(|v| v.as_str()), Some("on"));
            Ok(PropBag::new().with("banner", "off"))
        }
    }

    fn ctx() -> PluginContext {
        PluginContext {
            query: Query::new(),
            loading: false,
            error: None,
            total: 0,
            row_count: 0,
            never_searched: true,
            props: PropBag::new(),
            generation: 0,
        }
    }

    fn args(slot: Slot) -> RenderArgs {
        RenderArgs {
            slot,
            props: PropBag::new(),
        }
    }

    #[test]
    fn test_enhance_short_circuits_without_enhancers() {
        let manager = PluginManager::new(vec![]);
        let base = PropBag::new().with("kept", true);
        let enhanced = manager.enhance(&base, &ctx());
        assert!(matches!(enhanced, Cow::Borrowed(_)));
    }

    #[test]
    fn test_enhance_last_write_wins() {
        let manager = PluginManager::new(vec![
            Arc::new(BannerPlugin { enabled: true }),
            Arc::new(OverridePlugin),
        ]);
        let base = PropBag::new();
        let enhanced = manager.enhance(&base, &ctx());
        assert_eq!(
            enhanced.get("banner").and_then(|v| v.as_str()),
            Some("off")
        );
    }

    #[test]
    fn test_failing_enhancer_is_skipped() {
        let manager = PluginManager::new(vec![
            Arc::new(BrokenPlugin),
            Arc::new(BannerPlugin { enabled: true }),
        ]);
        let base = PropBag::new();
        let enhanced = manager.enhance(&base, &ctx());
        assert_eq!(enhanced.get("banner").and_then(|v| v.as_str()), Some("on"));
    }

    #[test]
    fn test_disabled_plugin_is_skipped() {
        let manager = PluginManager::new(vec![Arc::new(BannerPlugin { enabled: false })]);
        let base = PropBag::new();
        let enhanced = manager.enhance(&base, &ctx());
        assert!(enhanced.get("banner").is_none());
        assert!(manager.render_slot("banner", Slot::Alert, &args(Slot::Alert)).is_none());
    }

    #[test]
    fn test_render_wraps_with_stable_key() {
        let manager = PluginManager::new(vec![Arc::new(BannerPlugin { enabled: true })]);
        let fragment = manager
            .render_slot("banner", Slot::Alert, &args(Slot::Alert))
            .expect("fragment");
        match fragment {
            Fragment::Group { key, children } => {
                assert_eq!(key, "banner:alert");
                assert_eq!(children, vec![Fragment::text("banner text")]);
            }
            other => panic!("expected keyed group, got {other:?}"),
        }
    }

    #[test]
    fn test_panicking_render_degrades_to_none() {
        let manager = PluginManager::new(vec![Arc::new(BrokenPlugin)]);
        assert!(manager.render_slot("broken", Slot::Alert, &args(Slot::Alert)).is_none());
    }

    #[test]
    fn test_undeclared_slot_is_not_rendered() {
        let manager = PluginManager::new(vec![Arc::new(BannerPlugin { enabled: true })]);
        assert!(manager.render_slot("banner", Slot::NoData, &args(Slot::NoData)).is_none());
    }
}
