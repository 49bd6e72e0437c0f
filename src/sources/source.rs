use std::fmt;
use std::sync::Arc;

/// Which feed a source is currently routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Routed to the real upstream feed.
    Live,
    /// Routed to the locally generated synthetic feed.
    Fallback,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Live => f.write_str("live"),
            Mode::Fallback => f.write_str("fallback"),
        }
    }
}

/// One independently tracked upstream feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    index: usize,
    address: String,
    live_id: Arc<str>,
    fallback_id: Arc<str>,
}

impl Source {
    /// Creates a source with the conventional feed identifiers
    /// `live_sink_<index>` and `fallback_sink_<index>`.
    pub fn new(index: usize, address: impl Into<String>) -> Self {
        Self {
            index,
            address: address.into(),
            live_id: format!("live_sink_{index}").into(),
            fallback_id: format!("fallback_sink_{index}").into(),
        }
    }

    /// Source index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Upstream address (e.g. an RTSP URL).
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Identifier of the live feed.
    pub fn live_id(&self) -> &str {
        &self.live_id
    }

    /// Identifier of the fallback feed.
    pub fn fallback_id(&self) -> &str {
        &self.fallback_id
    }

    /// Identifier that selects `mode`.
    pub fn id_for(&self, mode: Mode) -> &str {
        match mode {
            Mode::Live => &self.live_id,
            Mode::Fallback => &self.fallback_id,
        }
    }

    /// Derives the mode from a routed identifier.
    ///
    /// Returns `None` when `routed` is neither of this source's feeds.
    pub fn mode_of(&self, routed: &str) -> Option<Mode> {
        if routed == &*self.live_id {
            Some(Mode::Live)
        } else if routed == &*self.fallback_id {
            Some(Mode::Fallback)
        } else {
            None
        }
    }

    /// True if `identifier` is one of this source's feeds.
    pub fn owns(&self, identifier: &str) -> bool {
        self.mode_of(identifier).is_some()
    }
}

/// Index-keyed collection of sources.
///
/// `sources[i].index() == i` holds for every entry.
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    sources: Vec<Source>,
}

impl SourceSet {
    /// Builds one source per address, indexed in order.
    pub fn from_addresses<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sources = addresses
            .into_iter()
            .enumerate()
            .map(|(i, a)| Source::new(i, a))
            .collect();
        Self { sources }
    }

    /// Returns the source at `index`.
    pub fn get(&self, index: usize) -> Option<&Source> {
        self.sources.get(index)
    }

    /// Iterates sources in index order.
    pub fn iter(&self) -> std::slice::Iter<'_, Source> {
        self.sources.iter()
    }

    /// Number of sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// True if there are no sources.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl<'a> IntoIterator for &'a SourceSet {
    type Item = &'a Source;
    type IntoIter = std::slice::Iter<'a, Source>;

    fn into_iter(self) -> Self::IntoIter {
        self.sources.iter()
    }
}
