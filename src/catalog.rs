//! Built-in library of short motifs.
//!
//! A motif is a list of semitone offsets played one after another from the
//! motif base pitch. The library has a handful of named entries and a block
//! of generated ones so there is always something to browse.

use crate::synth::PitchId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Motif {
    /// Name with whitespace removed; unique within the catalog.
    pub id: String,
    pub name: String,
    pub genre: String,
    pub offsets: Vec<PitchId>,
    /// Listed length, for display only. Playback timing comes from the
    /// note spacing.
    pub nominal_duration_ms: u32,
}

impl Motif {
    pub fn new(
        name: impl Into<String>,
        genre: impl Into<String>,
        offsets: Vec<PitchId>,
        nominal_duration_ms: u32,
    ) -> Self {
        let name = name.into();
        Self {
            id: name.split_whitespace().collect(),
            name,
            genre: genre.into(),
            offsets,
            nominal_duration_ms,
        }
    }
}

const NAMED: &[(&str, &str, &[PitchId], u32)] = &[
    ("Super Mario Jump", "Gaming Classics", &[0, 5, 12], 1_000),
    ("Pikachu Pika!", "Gaming Classics", &[12, 14, 12], 800),
    ("Sonic Ring", "Gaming Classics", &[0, 4, 7, 12, 16, 24], 1_000),
    ("Zelda Secret", "Gaming Classics", &[5, 4, 1, 6, 5, 1, 8, 7], 3_000),
    ("Frozen Elsa Arp", "Viral Pop Snippets", &[0, 7, 12, 16], 4_000),
    ("Wednesday Snap", "Viral Pop Snippets", &[0, 1, 0], 1_000),
    ("Encanto Sun", "Viral Pop Snippets", &[0, 3, 7, 10, 12], 3_000),
    ("Banking Success", "Minimalist UI", &[0, 12, 15], 2_000),
    ("Shopping Cart", "Minimalist UI", &[7, 12], 1_000),
    ("Email Sent", "Minimalist UI", &[12, 19], 1_000),
];

const GENERATED_COUNT: usize = 110;
const GENERATED_KINDS: [&str; 6] = ["Ping", "Alert", "Hifi", "Loft", "Echo", "Wave"];
const GENERATED_GENRES: [&str; 4] = [
    "Retro & Lofi",
    "ASMR & Nature",
    "Cinematic Effects",
    "Gaming Classics",
];

pub struct Catalog {
    motifs: Vec<Motif>,
}

impl Catalog {
    pub fn new(motifs: Vec<Motif>) -> Self {
        Self { motifs }
    }

    /// The shipped library: named motifs first, then the generated block.
    pub fn builtin() -> Self {
        let named = NAMED.iter().map(|&(name, genre, offsets, duration_ms)| {
            Motif::new(name, genre, offsets.to_vec(), duration_ms)
        });

        let generated = (1..=GENERATED_COUNT).map(|i| {
            let step = (i % 12) as PitchId;
            Motif::new(
                format!("{} {}", GENERATED_KINDS[i % GENERATED_KINDS.len()], i),
                GENERATED_GENRES[i % GENERATED_GENRES.len()],
                vec![step, (step + 4) % 12],
                2_000,
            )
        });

        Self::new(named.chain(generated).collect())
    }

    pub fn all(&self) -> &[Motif] {
        &self.motifs
    }

    pub fn len(&self) -> usize {
        self.motifs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.motifs.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Motif> {
        self.motifs.iter().find(|m| m.id == id)
    }

    /// Distinct genres in order of first appearance.
    pub fn genres(&self) -> Vec<&str> {
        let mut genres: Vec<&str> = Vec::new();
        for motif in &self.motifs {
            if !genres.contains(&motif.genre.as_str()) {
                genres.push(&motif.genre);
            }
        }
        genres
    }

    /// Motifs whose name contains `text` (case-insensitive) and whose genre
    /// equals `genre` when one is given.
    pub fn search(&self, text: &str, genre: Option<&str>) -> Vec<&Motif> {
        let needle = text.trim().to_lowercase();
        self.motifs
            .iter()
            .filter(|m| genre.map_or(true, |g| m.genre == g))
            .filter(|m| needle.is_empty() || m.name.to_lowercase().contains(&needle))
            .collect()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
