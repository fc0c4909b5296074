//! Randomness behind injectable seams.
//!
//! Rooms never call `rand` directly. Word candidates, hint positions, and
//! room ids come from these traits so tests can pin every choice.

use std::sync::Arc;

use rand::Rng;
use rand::distr::Alphanumeric;
use rand::seq::index;
use scribble_protocol::RoomId;

/// Supplies word candidates for a drawer.
pub trait WordSource: Send + Sync + 'static {
    /// Returns up to `count` distinct candidates. Fewer than `count`
    /// means the source is exhausted.
    fn choices(&self, count: usize) -> Vec<String>;
}

/// Picks a uniformly random index in `0..upper`. `upper` is never 0.
pub trait IndexPicker: Send + Sync + 'static {
    fn pick(&self, upper: usize) -> usize;
}

/// Produces ids for new rooms.
pub trait RoomIdGenerator: Send + Sync + 'static {
    fn next_id(&self) -> RoomId;
}

/// The collaborators one room needs. Cheap to clone.
#[derive(Clone)]
pub struct Collaborators {
    pub words: Arc<dyn WordSource>,
    pub picker: Arc<dyn IndexPicker>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            words: Arc::new(WordList::builtin()),
            picker: Arc::new(RandomPicker),
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const BUILTIN_WORDS: &[&str] = &[
    "apple", "banana", "cherry", "guitar", "rocket", "pizza", "castle", "dragon", "umbrella",
    "bicycle", "penguin", "volcano", "lighthouse", "snowman", "cactus", "giraffe", "robot",
    "rainbow", "octopus", "pirate ship", "treasure", "tornado", "hamburger", "butterfly",
    "telescope", "mermaid", "skateboard", "waterfall", "toothbrush", "spider web", "ice cream",
    "hot air balloon", "kangaroo", "lightning", "mushroom", "scarecrow", "sandcastle",
    "windmill", "anchor", "backpack", "campfire", "dinosaur", "fireworks", "hedgehog",
    "igloo", "jellyfish", "ladder", "magnet", "necklace", "parachute",
];

/// A fixed list of lowercase words sampled without replacement.
#[derive(Debug, Clone)]
pub struct WordList {
    words: Vec<String>,
}

impl WordList {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    pub fn builtin() -> Self {
        Self::new(BUILTIN_WORDS.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl WordSource for WordList {
    fn choices(&self, count: usize) -> Vec<String> {
        let amount = count.min(self.words.len());
        let mut rng = rand::rng();
        index::sample(&mut rng, self.words.len(), amount)
            .into_iter()
            .map(|i| self.words[i].clone())
            .collect()
    }
}

/// Uniform picks from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPicker;

impl IndexPicker for RandomPicker {
    fn pick(&self, upper: usize) -> usize {
        rand::rng().random_range(0..upper)
    }
}

/// Six lowercase alphanumeric characters, like `k3x9qa`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlphanumericIds;

impl AlphanumericIds {
    pub const LEN: usize = 6;
}

impl RoomIdGenerator for AlphanumericIds {
    fn next_id(&self) -> RoomId {
        let id: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(Self::LEN)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect();
        RoomId(id)
    }
}
