//! Per-region session registry.
//!
//! Binding the same region twice reconfigures the existing session rather
//! than starting a new one, so history survives a trigger change.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::hash::Hash;

use crate::config::RetypeConfig;
use crate::platform::RegionDom;
use crate::session::Session;
use crate::trigger::TriggerSpec;

/// Sessions keyed by region identity.
pub struct Registry<K, R: RegionDom> {
    sessions: HashMap<K, Session<R>>,
}

impl<K, R: RegionDom> Default for Registry<K, R> {
    fn default() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, R: RegionDom> Registry<K, R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a session to `key`, or reconfigure the one already there.
    ///
    /// `make_region` and `config` are only used on first bind.
    pub fn bind(
        &mut self,
        key: K,
        make_region: impl FnOnce() -> R,
        trigger: TriggerSpec,
        config: &RetypeConfig,
    ) -> &mut Session<R> {
        self.bind_with(key, trigger, |trigger| Session::new(make_region(), trigger, config))
    }

    /// Like [`bind`](Self::bind), with full control over how a new session is built.
    ///
    /// A new session receives `trigger` through `make_session`; an existing
    /// one is reconfigured with it.
    pub fn bind_with(
        &mut self,
        key: K,
        trigger: TriggerSpec,
        make_session: impl FnOnce(TriggerSpec) -> Session<R>,
    ) -> &mut Session<R> {
        match self.sessions.entry(key) {
            Entry::Occupied(entry) => {
                tracing::debug!(target: "retype::session", "rebinding existing region");
                let session = entry.into_mut();
                session.set_trigger(trigger);
                session
            }
            Entry::Vacant(entry) => entry.insert(make_session(trigger)),
        }
    }

    pub fn get(&self, key: &K) -> Option<&Session<R>> {
        self.sessions.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut Session<R>> {
        self.sessions.get_mut(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.sessions.contains_key(key)
    }

    /// Drop the session for `key`, returning it.
    pub fn unbind(&mut self, key: &K) -> Option<Session<R>> {
        self.sessions.remove(key)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryRegion;
    use crate::keys::{Key, KeyInput};
    use crate::platform::RegionDom;

    fn focused(html: &str) -> MemoryRegion {
        let mut region = MemoryRegion::from_html(html);
        region.focus();
        let len = region.text_content().chars().count();
        region.set_caret_offset(len);
        region
    }

    fn backspace(session: &mut Session<MemoryRegion>) {
        session.key_down(&KeyInput::new(Key::Backspace));
        session.region_mut().delete_backward();
        session.settle();
    }

    #[test]
    fn test_bind_creates_once() {
        let mut registry = Registry::new();
        let config = RetypeConfig::default();

        registry.bind(1, || focused("ab"), "@".into(), &config);
        registry.bind(
            1,
            || panic!("region rebuilt on rebind"),
            "#".into(),
            &config,
        );

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_rebind_keeps_history_and_swaps_trigger() {
        let mut registry = Registry::new();
        let config = RetypeConfig::default();

        let session = registry.bind("a", || focused("xyz"), "@".into(), &config);
        backspace(session);
        session.region_mut().type_text(" ");
        let len = session.history().len();

        let session = registry.bind("a", || focused(""), "#".into(), &config);
        assert_eq!(session.history().len(), len);

        session.key_down(&KeyInput::char('#'));
        session.region_mut().type_text("#a");
        session.settle();
        assert_eq!(
            session.region().inner_html(),
            r#"xy <span class="tag tag1">#a</span>"#
        );
    }

    #[test]
    fn test_rebind_with_keep() {
        let mut registry = Registry::new();
        let config = RetypeConfig::default();

        registry.bind(7, || focused(""), "@".into(), &config);
        let session = registry.bind(7, || focused(""), TriggerSpec::Keep, &config);

        session.key_down(&KeyInput::char('@'));
        session.region_mut().type_text("@me");
        session.settle();
        assert_eq!(session.content(), r#"<span class="tag tag1">@me</span><br>"#);
    }

    #[test]
    fn test_sessions_are_independent() {
        let mut registry = Registry::new();
        let config = RetypeConfig::default();

        registry.bind("one", || focused("aa"), "@".into(), &config);
        registry.bind("two", || focused("bb"), "@".into(), &config);

        if let Some(one) = registry.get_mut(&"one") {
            backspace(one);
            backspace(one);
        }

        assert_eq!(registry.get(&"one").map(|s| s.content()), Some("<br>".to_string()));
        assert_eq!(registry.get(&"two").map(|s| s.content()), Some("bb".to_string()));
    }

    #[test]
    fn test_first_bind_highlights_content() {
        let mut registry = Registry::new();
        let session = registry.bind(1, || focused("to @ann"), "@".into(), &RetypeConfig::default());
        assert_eq!(
            session.content(),
            r#"to <span class="tag tag1">@ann</span>"#
        );
    }

    #[test]
    fn test_unbind() {
        let mut registry = Registry::new();
        registry.bind(1, || focused("a"), TriggerSpec::Keep, &RetypeConfig::default());
        assert!(registry.unbind(&1).is_some());
        assert!(registry.is_empty());
        assert!(!registry.contains(&1));
    }
}
