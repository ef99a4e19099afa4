//! Fragment model and slot composition
//!
//! The engine is headless: render slots produce an abstract [`Fragment`]
//! tree that the embedding shell interprets however it likes. The
//! [`SlotComposer`] derives the concrete fragment for each fixed slot from
//! plugin output plus caller overrides, memoized against plugin-manager and
//! context identity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::plugin::{PluginContext, PluginManager, RenderArgs, Slot};

/// A bag of named props carried through the plugin pipeline.
///
/// Values are JSON so arbitrary business props survive the trip without the
/// engine knowing their shapes. Backed by a `BTreeMap` for deterministic
/// iteration and equality.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropBag(BTreeMap<String, serde_json::Value>);

impl PropBag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Inserts a prop, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Looks up a prop.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Merges `other` into `self`, key by key (last write wins).
    pub fn merge(&mut self, other: PropBag) {
        for (key, value) in other.0 {
            self.0.insert(key, value);
        }
    }

    /// Returns `true` when the bag holds no props.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of props.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates props in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }
}

/// An abstract UI node produced by render slots and column renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Fragment {
    /// Plain text.
    Text(String),
    /// A named widget with props, interpreted by the shell.
    Widget {
        /// Widget name the shell dispatches on.
        name: String,
        /// Widget props.
        props: PropBag,
    },
    /// A keyed group of children; the key isolates the subtree's identity
    /// from its parent's reconciliation context.
    Group {
        /// Stable key.
        key: String,
        /// Child fragments.
        children: Vec<Fragment>,
    },
}

impl Fragment {
    /// A text node.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    /// A widget node.
    pub fn widget(name: impl Into<String>, props: PropBag) -> Self {
        Self::Widget {
            name: name.into(),
            props,
        }
    }

    /// Wraps a fragment in a stable-keyed group.
    pub fn keyed(key: impl Into<String>, child: Fragment) -> Self {
        Self::Group {
            key: key.into(),
            children: vec![child],
        }
    }
}

/// Caller-supplied per-slot replacement fragments; an override wins over
/// whatever plugins would render for that slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotOverrides {
    /// Override for [`Slot::NoData`].
    pub no_data: Option<Fragment>,
    /// Override for [`Slot::ErrorState`].
    pub error_state: Option<Fragment>,
    /// Override for [`Slot::FilterBar`].
    pub filter_bar: Option<Fragment>,
    /// Override for [`Slot::Alert`].
    pub alert: Option<Fragment>,
    /// Override for [`Slot::LoadMore`].
    pub load_more: Option<Fragment>,
}

impl SlotOverrides {
    /// No overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style override for one slot.
    pub fn with(mut self, slot: Slot, fragment: Fragment) -> Self {
        *self.slot_mut(slot) = Some(fragment);
        self
    }

    fn slot(&self, slot: Slot) -> &Option<Fragment> {
        match slot {
            Slot::NoData => &self.no_data,
            Slot::ErrorState => &self.error_state,
            Slot::FilterBar => &self.filter_bar,
            Slot::Alert => &self.alert,
            Slot::LoadMore => &self.load_more,
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut Option<Fragment> {
        match slot {
            Slot::NoData => &mut self.no_data,
            Slot::ErrorState => &mut self.error_state,
            Slot::FilterBar => &mut self.filter_bar,
            Slot::Alert => &mut self.alert,
            Slot::LoadMore => &mut self.load_more,
        }
    }
}

/// The concrete fragment per fixed slot for one render pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComposedSlots {
    /// Empty-state placeholder.
    pub no_data: Option<Fragment>,
    /// Fetch-error surface.
    pub error_state: Option<Fragment>,
    /// Filter bar.
    pub filter_bar: Option<Fragment>,
    /// Alert banner.
    pub alert: Option<Fragment>,
    /// Load-more footer.
    pub load_more: Option<Fragment>,
}

impl ComposedSlots {
    fn slot_mut(&mut self, slot: Slot) -> &mut Option<Fragment> {
        match slot {
            Slot::NoData => &mut self.no_data,
            Slot::ErrorState => &mut self.error_state,
            Slot::FilterBar => &mut self.filter_bar,
            Slot::Alert => &mut self.alert,
            Slot::LoadMore => &mut self.load_more,
        }
    }
}

/// Derives [`ComposedSlots`] from plugin output plus caller overrides.
///
/// Composition is cached against `(manager id, context generation)`: a
/// repeat call with the same identities returns the cached result without
/// consulting any plugin.
#[derive(Debug, Default)]
pub struct SlotComposer {
    cache: Option<((u64, u64), ComposedSlots)>,
}

impl SlotComposer {
    /// Creates a composer with an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Composes all fixed slots for the current context.
    pub fn compose(
        &mut self,
        manager: &PluginManager,
        ctx: &PluginContext,
        overrides: &SlotOverrides,
    ) -> ComposedSlots {
        let key = (manager.id(), ctx.generation);
        if let Some((cached_key, cached)) = &self.cache {
            if *cached_key == key {
                return cached.clone();
            }
        }

        let props = manager.enhance(&ctx.props, ctx).into_owned();
        let mut composed = ComposedSlots::default();
        for slot in Slot::all() {
            let fragment = match overrides.slot(slot) {
                Some(replacement) => Some(replacement.clone()),
                None => manager.render_first(
                    slot,
                    &RenderArgs {
                        slot,
                        props: props.clone(),
                    },
                ),
            };
            *composed.slot_mut(slot) = fragment;
        }

        self.cache = Some((key, composed.clone()));
        composed
    }

    /// Drops the cached composition.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }
}
