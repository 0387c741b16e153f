//! Deterministic placeholder catalog used when the API is off or failing.

use crate::media::{
    CastMember, CollectionKind, Credits, CrewMember, GenreRef, MediaId, MediaItem,
};

struct Seed {
    id: MediaId,
    title: &'static str,
    date: &'static str,
    genres: &'static [(u64, &'static str)],
    rating: f32,
    overview: &'static str,
}

const SEEDS: [Seed; 6] = [
    Seed {
        id: 1,
        title: "Aube Rouge",
        date: "2025-03-14",
        genres: &[(878, "Sci-Fi"), (28, "Action")],
        rating: 7.8,
        overview: "Dans un avenir proche, une pilote se bat pour sauver sa cité d'une menace inconnue.",
    },
    Seed {
        id: 2,
        title: "Nuit Blanche",
        date: "2024-03-01",
        genres: &[(53, "Thriller")],
        rating: 7.2,
        overview: "Une nuit, une ville, un témoin qui en sait trop.",
    },
    Seed {
        id: 3,
        title: "Lignes de fuite",
        date: "2023-09-20",
        genres: &[(18, "Drama")],
        rating: 6.9,
        overview: "Trois frères reprennent la route de leur enfance après un deuil.",
    },
    Seed {
        id: 4,
        title: "Zone Libre",
        date: "2025-06-11",
        genres: &[(28, "Action")],
        rating: 8.1,
        overview: "Une équipe d'élite traverse une frontière fermée pour une dernière mission.",
    },
    Seed {
        id: 5,
        title: "Les Échos",
        date: "2022-11-02",
        genres: &[(9648, "Mystery")],
        rating: 7.0,
        overview: "Dans un village isolé, des voix reviennent hanter les vivants.",
    },
    Seed {
        id: 6,
        title: "Soleil Noir",
        date: "2024-10-30",
        genres: &[(27, "Horror")],
        rating: 6.5,
        overview: "Quand l'éclipse ne finit plus, quelque chose se réveille.",
    },
];

const SIMILAR_LIMIT: usize = 8;
const COPY_ID_STEP: MediaId = 100;

fn poster(id: MediaId) -> String {
    format!("https://picsum.photos/300/450?random={}", id)
}

fn backdrop(id: MediaId) -> String {
    format!("https://picsum.photos/1280/720?random={}", id)
}

fn item(seed: &Seed, copy: u64) -> MediaItem {
    let id = seed.id + COPY_ID_STEP * copy;
    MediaItem {
        id,
        title: Some(seed.title.to_string()),
        release_date: Some(seed.date.to_string()),
        poster_path: Some(poster(seed.id)),
        backdrop_path: Some(backdrop(seed.id)),
        overview: Some(seed.overview.to_string()),
        vote_average: Some(seed.rating),
        genres: seed
            .genres
            .iter()
            .map(|(id, name)| GenreRef::Named {
                id: *id,
                name: (*name).to_string(),
            })
            .collect(),
        ..Default::default()
    }
}

fn base(copy: u64) -> Vec<MediaItem> {
    SEEDS.iter().map(|seed| item(seed, copy)).collect()
}

fn reversed(copy: u64) -> Vec<MediaItem> {
    SEEDS.iter().rev().map(|seed| item(seed, copy)).collect()
}

/// Placeholder items for a collection. Same input, same output.
pub fn generate(kind: CollectionKind) -> Vec<MediaItem> {
    match kind {
        CollectionKind::Popular | CollectionKind::Browse => {
            let mut items = base(0);
            items.extend(reversed(1));
            items.extend(base(2));
            items
        }
        CollectionKind::Recent => {
            let mut items = reversed(0);
            items.extend(base(1));
            items
        }
        CollectionKind::Similar => base(0).into_iter().take(SIMILAR_LIMIT).collect(),
        CollectionKind::TopRated => {
            let mut items = base(0);
            items.sort_by(|a, b| {
                b.vote_average
                    .unwrap_or_default()
                    .total_cmp(&a.vote_average.unwrap_or_default())
            });
            items
        }
        CollectionKind::Trending => base(0),
    }
}

/// Placeholder detail record.
pub fn movie(id: MediaId) -> MediaItem {
    let id = id.max(1);
    MediaItem {
        id,
        title: Some(if id == 1 {
            String::from("Aube Rouge")
        } else {
            format!("Film {}", id)
        }),
        release_date: Some(String::from("2025-03-14")),
        poster_path: Some(format!("https://picsum.photos/600/900?random={}", id)),
        backdrop_path: Some(backdrop(id)),
        overview: Some(String::from(
            "Dans un avenir proche, une pilote se bat pour sauver sa cité d'une menace inconnue.",
        )),
        tagline: Some(String::from("Le ciel brûle à l'aube.")),
        vote_average: Some(7.8),
        runtime: Some(118),
        status: Some(String::from("Released")),
        languages: vec![String::from("Français")],
        countries: vec![String::from("France")],
        genres: vec![
            GenreRef::Named {
                id: 878,
                name: String::from("Sci-Fi"),
            },
            GenreRef::Named {
                id: 28,
                name: String::from("Action"),
            },
        ],
        ..Default::default()
    }
}

pub fn credits(_id: MediaId) -> Credits {
    let cast = ["A. Martin", "K. Leroy", "M. Dupont"]
        .iter()
        .map(|name| CastMember {
            name: (*name).to_string(),
            character: String::new(),
            profile_path: None,
        })
        .collect();
    Credits {
        cast,
        crew: vec![CrewMember {
            name: String::from("L. Durand"),
            job: String::from("Director"),
        }],
    }
}
