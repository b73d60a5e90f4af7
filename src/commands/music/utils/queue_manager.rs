use dashmap::DashMap;
use serenity::model::id::GuildId;
use std::collections::VecDeque;
use std::fmt;
use url::Url;

/// How a query should be handed to the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// A direct `http`/`https` link.
    Url,
    /// Free text; the first search result is used.
    Search,
}

/// A not-yet-resolved playback request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackReference {
    query: String,
    kind: QueryKind,
}

impl TrackReference {
    /// Classify a raw user query. Anything that does not parse as an http(s) URL is a search term.
    pub fn new(query: impl Into<String>) -> Self {
        let query = query.into().trim().to_string();
        let kind = match Url::parse(&query) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => QueryKind::Url,
            _ => QueryKind::Search,
        };

        Self { query, kind }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn is_search(&self) -> bool {
        self.kind == QueryKind::Search
    }
}

impl fmt::Display for TrackReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.query)
    }
}

/// Process-wide map of guild ID to pending tracks.
///
/// Each guild's entries are only mutated by that guild's worker, so the
/// shard-level locking of `DashMap` is the only synchronisation needed.
#[derive(Debug, Default)]
pub struct QueueStore {
    queues: DashMap<GuildId, VecDeque<TrackReference>>,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a track, creating the guild's queue on first use.
    /// Returns the 1-based position of the new entry.
    pub fn enqueue(&self, guild_id: GuildId, track: TrackReference) -> usize {
        let mut queue = self.queues.entry(guild_id).or_default();
        queue.push_back(track);
        queue.len()
    }

    /// Remove and return the oldest entry, if any
    pub fn dequeue_front(&self, guild_id: GuildId) -> Option<TrackReference> {
        self.queues
            .get_mut(&guild_id)
            .and_then(|mut queue| queue.pop_front())
    }

    /// Empty the guild's queue. The mapping entry itself is kept.
    pub fn clear(&self, guild_id: GuildId) {
        if let Some(mut queue) = self.queues.get_mut(&guild_id) {
            queue.clear();
        }
    }

    /// Copy of the guild's pending entries, in playback order.
    pub fn snapshot(&self, guild_id: GuildId) -> QueueSnapshot {
        let entries = self
            .queues
            .get(&guild_id)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default();

        QueueSnapshot { entries }
    }

    pub fn len(&self, guild_id: GuildId) -> usize {
        self.queues.get(&guild_id).map_or(0, |queue| queue.len())
    }

    pub fn is_empty(&self, guild_id: GuildId) -> bool {
        self.len(guild_id) == 0
    }

    /// Whether a queue has ever been created for this guild.
    pub fn contains_guild(&self, guild_id: GuildId) -> bool {
        self.queues.contains_key(&guild_id)
    }
}

/// Read-only view of a queue taken at one point in time.
///
/// Iterating does not consume it, so the same snapshot can be walked any
/// number of times.
/// Room kept free for the "…and N more" line.
const OVERFLOW_RESERVE: usize = 32;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    entries: Vec<TrackReference>,
}

impl QueueSnapshot {
    pub fn iter(&self) -> std::slice::Iter<'_, TrackReference> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The numbered listing, cut short to stay within `max_chars` characters.
    /// Entries that do not fit are summarised as "…and N more".
    pub fn listing(&self, max_chars: usize) -> String {
        let mut listing = String::new();
        let mut used = 0;

        for (index, track) in self.entries.iter().enumerate() {
            let line = format!("{}. {}\n", index + 1, track);
            let line_len = line.chars().count();
            let budget = if index + 1 == self.entries.len() {
                max_chars
            } else {
                max_chars.saturating_sub(OVERFLOW_RESERVE)
            };

            if used + line_len > budget {
                listing.push_str(&format!("…and {} more", self.entries.len() - index));
                return listing;
            }
            listing.push_str(&line);
            used += line_len;
        }

        listing
    }
}

impl<'a> IntoIterator for &'a QueueSnapshot {
    type Item = &'a TrackReference;
    type IntoIter = std::slice::Iter<'a, TrackReference>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl fmt::Display for QueueSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, track) in self.entries.iter().enumerate() {
            writeln!(f, "{}. {}", index + 1, track)?;
        }
        Ok(())
    }
}
