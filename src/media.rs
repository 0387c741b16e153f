use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use iced::widget::image::Handle;
use iced::Color;
use serde::Deserialize;
use thiserror::Error;

use crate::detail::DetailSections;
use crate::hero::TimerToken;
use crate::search::DebounceToken;

fn simple_hash(s: &str) -> String {
    let mut hash: u64 = 5381;
    for byte in s.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(byte as u64);
    }
    format!("{:016x}", hash)
}

fn get_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("streamflix").join("images"))
}

pub const BRAND_RED: Color = Color::from_rgb(0.898, 0.035, 0.078);
pub const SKELETON_GRAY: Color = Color::from_rgba(0.5, 0.5, 0.5, 0.25);
pub const MISSING_IMAGE_GRAY: Color = Color::from_rgb(0.2, 0.2, 0.2);

pub type MediaId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    Browse,
    Detail(MediaId),
}

/// Where a finished collection load should be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridSlot {
    Home(usize),
    Browse,
}

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP {status} {status_text}")]
    Remote { status: u16, status_text: String },
    #[error("malformed response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Genre {
    pub id: u64,
    pub name: String,
}

/// A genre as carried by a record: list endpoints only give ids, detail
/// endpoints give the name too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenreRef {
    Id(u64),
    Named { id: u64, name: String },
}

impl GenreRef {
    pub fn id(&self) -> u64 {
        match self {
            GenreRef::Id(id) | GenreRef::Named { id, .. } => *id,
        }
    }
}

const MOVIE_GENRES: [(u64, &str); 19] = [
    (28, "Action"),
    (12, "Adventure"),
    (16, "Animation"),
    (35, "Comedy"),
    (80, "Crime"),
    (99, "Documentary"),
    (18, "Drama"),
    (10751, "Family"),
    (14, "Fantasy"),
    (36, "History"),
    (27, "Horror"),
    (10402, "Music"),
    (9648, "Mystery"),
    (10749, "Romance"),
    (878, "Science Fiction"),
    (10770, "TV Movie"),
    (53, "Thriller"),
    (10752, "War"),
    (37, "Western"),
];

/// Genre id to name lookup, fetched once per session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenreCatalog {
    names: HashMap<u64, String>,
}

impl GenreCatalog {
    pub fn from_genres(genres: Vec<Genre>) -> Self {
        Self {
            names: genres.into_iter().map(|g| (g.id, g.name)).collect(),
        }
    }

    /// The TMDB movie genre table, used when the API cannot be reached.
    pub fn builtin() -> Self {
        Self {
            names: MOVIE_GENRES
                .iter()
                .map(|(id, name)| (*id, (*name).to_string()))
                .collect(),
        }
    }

    pub fn name(&self, id: u64) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Resolve genre references to display names, in order. Unknown ids are
    /// skipped.
    pub fn resolve<'a>(&'a self, genres: &'a [GenreRef]) -> impl Iterator<Item = &'a str> + 'a {
        genres.iter().filter_map(move |genre| match genre {
            GenreRef::Named { name, .. } => Some(name.as_str()),
            GenreRef::Id(id) => self.name(*id),
        })
    }

    /// All genres sorted by name, for filter controls.
    pub fn sorted(&self) -> Vec<Genre> {
        let mut genres: Vec<Genre> = self
            .names
            .iter()
            .map(|(id, name)| Genre {
                id: *id,
                name: name.clone(),
            })
            .collect();
        genres.sort_by(|a, b| a.name.cmp(&b.name));
        genres
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaItem {
    pub id: MediaId,
    pub title: Option<String>,
    pub alternate_title: Option<String>,
    pub original_title: Option<String>,
    pub release_date: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub overview: Option<String>,
    pub tagline: Option<String>,
    pub vote_average: Option<f32>,
    pub vote_count: Option<u64>,
    pub popularity: Option<f64>,
    pub runtime: Option<u32>,
    pub budget: Option<u64>,
    pub revenue: Option<u64>,
    pub status: Option<String>,
    pub genres: Vec<GenreRef>,
    pub languages: Vec<String>,
    pub countries: Vec<String>,
    pub companies: Vec<String>,
}

impl MediaItem {
    pub const UNTITLED: &'static str = "Untitled";

    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .or(self.alternate_title.as_deref())
            .unwrap_or(Self::UNTITLED)
    }

    pub fn year(&self) -> Option<&str> {
        self.release_date.as_deref().and_then(crate::format::year)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastMember {
    pub name: String,
    pub character: String,
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrewMember {
    pub name: String,
    pub job: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credits {
    pub cast: Vec<CastMember>,
    pub crew: Vec<CrewMember>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Video {
    pub key: String,
    #[serde(default)]
    pub name: String,
    pub site: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Trending,
    Popular,
    TopRated,
    Recent,
    Similar,
    Browse,
}

impl CollectionKind {
    /// Map a collection name to its loading strategy. Unknown names load the
    /// trending list.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "trending" | "tendances" => CollectionKind::Trending,
            "popular" | "populaires" => CollectionKind::Popular,
            "toprated" | "top_rated" | "top-rated" | "mieux-notes" => CollectionKind::TopRated,
            "recent" | "recents" | "now" => CollectionKind::Recent,
            "similar" => CollectionKind::Similar,
            "browse" | "catalog" => CollectionKind::Browse,
            _ => CollectionKind::Trending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Popularity,
    Rating,
    ReleaseDate,
    Title,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [
        SortKey::Popularity,
        SortKey::Rating,
        SortKey::ReleaseDate,
        SortKey::Title,
    ];

    pub fn as_param(self) -> &'static str {
        match self {
            SortKey::Popularity => "popularity.desc",
            SortKey::Rating => "vote_average.desc",
            SortKey::ReleaseDate => "primary_release_date.desc",
            SortKey::Title => "original_title.asc",
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortKey::Popularity => write!(f, "Popularity"),
            SortKey::Rating => write!(f, "Rating"),
            SortKey::ReleaseDate => write!(f, "Release Date"),
            SortKey::Title => write!(f, "A-Z"),
        }
    }
}

/// Everything that determines a collection's result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRequest {
    pub collection: CollectionKind,
    pub page: u32,
    pub sort: Option<SortKey>,
    pub genre: Option<u64>,
    pub year: Option<u32>,
    pub query: Option<String>,
}

impl CollectionRequest {
    pub fn new(collection: CollectionKind) -> Self {
        Self {
            collection,
            page: 1,
            sort: None,
            genre: None,
            year: None,
            query: None,
        }
    }

    pub fn named(name: &str) -> Self {
        Self::new(CollectionKind::from_name(name))
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    /// The free-text query, if it has any non-blank content.
    pub fn search_text(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionResult {
    pub items: Vec<MediaItem>,
    pub total_pages: u32,
    pub total_results: u64,
}

impl CollectionResult {
    /// Upstream refuses pages past this.
    pub const MAX_PAGES: u32 = 500;
    /// Upstream totals are not meaningful past this.
    pub const MAX_DISPLAY_RESULTS: u64 = 10_000;

    pub fn single_page(items: Vec<MediaItem>) -> Self {
        Self {
            total_results: items.len() as u64,
            items,
            total_pages: 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<TmdbListResponse> for CollectionResult {
    fn from(response: TmdbListResponse) -> Self {
        let items: Vec<MediaItem> = response.results.into_iter().map(MediaItem::from).collect();
        let total_pages = response
            .total_pages
            .unwrap_or(1)
            .clamp(1, Self::MAX_PAGES);
        let total_results = response
            .total_results
            .unwrap_or(items.len() as u64)
            .min(Self::MAX_DISPLAY_RESULTS);
        Self {
            items,
            total_pages,
            total_results,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImageCache {
    cache: HashMap<String, Handle>,
    pending: HashSet<String>,
    cache_directory: Option<PathBuf>,
}

impl ImageCache {
    pub fn new() -> Self {
        let cache_directory = get_cache_dir();
        if let Some(ref dir) = cache_directory {
            let _ = std::fs::create_dir_all(dir);
        }
        Self {
            cache: HashMap::new(),
            pending: HashSet::new(),
            cache_directory,
        }
    }

    pub fn get(&self, url: &str) -> Option<&Handle> {
        self.cache.get(url)
    }

    pub fn insert(&mut self, url: String, handle: Handle) {
        self.pending.remove(&url);
        self.cache.insert(url, handle);
    }

    pub fn fail(&mut self, url: &str) {
        self.pending.remove(url);
    }

    /// Whether a fetch for this url would be redundant.
    pub fn is_known(&self, url: &str) -> bool {
        self.cache.contains_key(url) || self.pending.contains(url)
    }

    pub fn mark_pending(&mut self, url: String) {
        self.pending.insert(url);
    }

    pub fn get_cache_path(&self, url: &str) -> Option<PathBuf> {
        self.cache_directory
            .as_ref()
            .map(|dir| dir.join(simple_hash(url)))
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    NavigateTo(Page),
    CycleTheme,
    GenresLoaded(GenreCatalog),
    GridLoaded(GridSlot, u64, Result<CollectionResult, ApiError>),
    ImageLoaded(String, Result<Handle, String>),
    HeroLoaded(CollectionResult),
    HeroTick(TimerToken),
    HeroSelect(usize),
    WindowFocusChanged(bool),
    WindowResized(f32),
    ScaleFactorChanged(f32),
    MainScrolled(f32),
    AnimationTick,
    DetailLoaded(MediaId, Result<MediaItem, ApiError>),
    DetailSectionsLoaded(MediaId, Box<DetailSections>),
    SearchInput(String),
    SearchDebounced(DebounceToken),
    SetGenreFilter(Option<u64>),
    SetSortOption(SortKey),
    SetYearFilter(Option<u32>),
    ResetFilters,
    PrevPage,
    NextPage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMediaResult {
    pub id: u64,
    pub title: Option<String>,
    pub name: Option<String>,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub tagline: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub vote_average: Option<f32>,
    pub vote_count: Option<u64>,
    pub popularity: Option<f64>,
    pub release_date: Option<String>,
    pub first_air_date: Option<String>,
    pub runtime: Option<u32>,
    pub budget: Option<u64>,
    pub revenue: Option<u64>,
    pub status: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<u64>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub spoken_languages: Vec<TmdbNamed>,
    #[serde(default)]
    pub production_countries: Vec<TmdbNamed>,
    #[serde(default)]
    pub production_companies: Vec<TmdbNamed>,
}

/// Language, country or company entry on a detail record. Some languages
/// have a blank native name and only carry the English one.
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbNamed {
    #[serde(default)]
    pub name: String,
    pub english_name: Option<String>,
}

fn names(entries: Vec<TmdbNamed>) -> Vec<String> {
    entries
        .into_iter()
        .filter_map(|entry| non_empty(Some(entry.name)).or(non_empty(entry.english_name)))
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl From<TmdbMediaResult> for MediaItem {
    fn from(result: TmdbMediaResult) -> Self {
        let genres = if result.genres.is_empty() {
            result.genre_ids.into_iter().map(GenreRef::Id).collect()
        } else {
            result
                .genres
                .into_iter()
                .map(|g| GenreRef::Named {
                    id: g.id,
                    name: g.name,
                })
                .collect()
        };
        Self {
            id: result.id,
            title: non_empty(result.title),
            alternate_title: non_empty(result.name),
            original_title: non_empty(result.original_title),
            release_date: non_empty(result.release_date).or(non_empty(result.first_air_date)),
            poster_path: non_empty(result.poster_path),
            backdrop_path: non_empty(result.backdrop_path),
            overview: non_empty(result.overview),
            tagline: non_empty(result.tagline),
            vote_average: result.vote_average,
            vote_count: result.vote_count,
            popularity: result.popularity,
            runtime: result.runtime.filter(|r| *r > 0),
            budget: result.budget.filter(|b| *b > 0),
            revenue: result.revenue.filter(|r| *r > 0),
            status: non_empty(result.status),
            genres,
            languages: names(result.spoken_languages),
            countries: names(result.production_countries),
            companies: names(result.production_companies),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbListResponse {
    #[serde(default)]
    pub results: Vec<TmdbMediaResult>,
    pub total_pages: Option<u32>,
    pub total_results: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_names_map_to_strategies() {
        assert_eq!(CollectionKind::from_name("Trending"), CollectionKind::Trending);
        assert_eq!(CollectionKind::from_name("populaires"), CollectionKind::Popular);
        assert_eq!(CollectionKind::from_name("topRated"), CollectionKind::TopRated);
        assert_eq!(CollectionKind::from_name("now"), CollectionKind::Recent);
        assert_eq!(CollectionKind::from_name("no-such-list"), CollectionKind::Trending);
        assert_eq!(CollectionKind::from_name(""), CollectionKind::Trending);
    }

    #[test]
    fn list_response_clamps_totals() {
        let response: TmdbListResponse = serde_json::from_value(serde_json::json!({
            "results": [{ "id": 7, "name": "Alt", "release_date": "", "genre_ids": [18] }],
            "total_pages": 41_000,
            "total_results": 820_000
        }))
        .unwrap();

        let result = CollectionResult::from(response);
        assert_eq!(result.total_pages, 500);
        assert_eq!(result.total_results, 10_000);
        assert_eq!(result.items[0].display_title(), "Alt");
        assert_eq!(result.items[0].release_date, None);
        assert_eq!(result.items[0].genres, vec![GenreRef::Id(18)]);
    }

    #[test]
    fn zero_total_pages_still_has_one_page() {
        let response: TmdbListResponse =
            serde_json::from_value(serde_json::json!({ "results": [], "total_pages": 0 }))
                .unwrap();
        let result = CollectionResult::from(response);
        assert_eq!(result.total_pages, 1);
        assert!(result.is_empty());
    }

    #[test]
    fn detail_genres_keep_their_names() {
        let result: TmdbMediaResult = serde_json::from_value(serde_json::json!({
            "id": 603,
            "title": "The Matrix",
            "runtime": 136,
            "budget": 0,
            "genres": [{ "id": 28, "name": "Action" }]
        }))
        .unwrap();
        let item = MediaItem::from(result);
        assert_eq!(item.runtime, Some(136));
        assert_eq!(item.budget, None);
        assert_eq!(
            item.genres,
            vec![GenreRef::Named {
                id: 28,
                name: String::from("Action")
            }]
        );
    }

    #[test]
    fn detail_production_entries_become_names() {
        let result: TmdbMediaResult = serde_json::from_value(serde_json::json!({
            "id": 949,
            "title": "Heat",
            "spoken_languages": [
                { "iso_639_1": "en", "english_name": "English", "name": "English" },
                { "iso_639_1": "xx", "english_name": "No Language", "name": "" }
            ],
            "production_countries": [{ "iso_3166_1": "US", "name": "United States of America" }],
            "production_companies": [
                { "id": 508, "name": "Regency Enterprises" },
                { "id": 675, "name": "Forward Pass" }
            ]
        }))
        .unwrap();
        let item = MediaItem::from(result);
        assert_eq!(item.languages, vec!["English", "No Language"]);
        assert_eq!(item.countries, vec!["United States of America"]);
        assert_eq!(item.companies, vec!["Regency Enterprises", "Forward Pass"]);
    }

    #[test]
    fn catalog_resolves_ids_and_skips_unknown() {
        let catalog = GenreCatalog::builtin();
        let genres = [GenreRef::Id(53), GenreRef::Id(424242), GenreRef::Id(18)];
        let names: Vec<&str> = catalog.resolve(&genres).collect();
        assert_eq!(names, vec!["Thriller", "Drama"]);
    }

    #[test]
    fn untitled_when_no_names() {
        let item = MediaItem {
            id: 1,
            ..Default::default()
        };
        assert_eq!(item.display_title(), "Untitled");
    }
}
