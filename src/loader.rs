use std::sync::Arc;

use tracing::warn;

use crate::fallback;
use crate::media::{
    ApiError, CollectionKind, CollectionRequest, CollectionResult, GenreCatalog, SortKey,
};
use crate::settings::AppSettings;
use crate::tmdb::{MetadataSource, TmdbClient};

/// Every discover call excludes titles with fewer votes than this.
pub const MIN_VOTE_COUNT: u32 = 50;
const TOP_RATED_VOTE_COUNT: u32 = 1000;

/// The remote call a request resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    Trending {
        page: u32,
    },
    Discover {
        page: u32,
        params: Vec<(&'static str, String)>,
    },
    Search {
        query: String,
        page: u32,
    },
}

pub fn plan(request: &CollectionRequest) -> Plan {
    let page = request.page.max(1);

    if let Some(query) = request.search_text() {
        return Plan::Search {
            query: query.to_string(),
            page,
        };
    }

    let (default_sort, vote_floor) = match request.collection {
        CollectionKind::Popular | CollectionKind::Browse => (SortKey::Popularity, MIN_VOTE_COUNT),
        CollectionKind::TopRated => (SortKey::Rating, TOP_RATED_VOTE_COUNT),
        CollectionKind::Recent => (SortKey::ReleaseDate, MIN_VOTE_COUNT),
        // Similar lists need a subject; without one they behave like trending.
        CollectionKind::Trending | CollectionKind::Similar => {
            if request.sort.is_none() && request.genre.is_none() && request.year.is_none() {
                return Plan::Trending { page };
            }
            (SortKey::Popularity, MIN_VOTE_COUNT)
        }
    };

    let sort = request.sort.unwrap_or(default_sort);
    let mut params = vec![
        ("sort_by", sort.as_param().to_string()),
        ("vote_count.gte", vote_floor.max(MIN_VOTE_COUNT).to_string()),
    ];
    if let Some(genre) = request.genre {
        params.push(("with_genres", genre.to_string()));
    }
    if let Some(year) = request.year {
        params.push(("primary_release_year", year.to_string()));
    }
    Plan::Discover { page, params }
}

/// Resolves collection requests against the remote source, degrading to
/// placeholder data on any failure.
#[derive(Clone)]
pub struct CollectionLoader {
    remote: Option<Arc<dyn MetadataSource>>,
}

impl CollectionLoader {
    pub fn new(remote: Option<Arc<dyn MetadataSource>>) -> Self {
        Self { remote }
    }

    pub fn from_settings(settings: &AppSettings) -> Self {
        if !settings.remote_enabled() {
            return Self::new(None);
        }
        Self::new(Some(Arc::new(TmdbClient::from_settings(settings))))
    }

    pub fn remote(&self) -> Option<Arc<dyn MetadataSource>> {
        self.remote.clone()
    }

    async fn fetch(
        remote: &dyn MetadataSource,
        request: &CollectionRequest,
    ) -> Result<CollectionResult, ApiError> {
        match plan(request) {
            Plan::Trending { page } => remote.trending(page).await,
            Plan::Discover { page, params } => remote.discover(page, &params).await,
            Plan::Search { query, page } => remote.search(&query, page).await,
        }
    }

    pub async fn load(self, request: CollectionRequest) -> CollectionResult {
        let Some(remote) = self.remote.as_deref() else {
            return Self::fallback(&request);
        };
        match Self::fetch(remote, &request).await {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    collection = ?request.collection,
                    page = request.page,
                    error = %e,
                    "Collection load failed, using placeholder data"
                );
                Self::fallback(&request)
            }
        }
    }

    pub fn fallback(request: &CollectionRequest) -> CollectionResult {
        CollectionResult::single_page(fallback::generate(request.collection))
    }

    pub async fn load_genres(self) -> GenreCatalog {
        let Some(remote) = self.remote.as_deref() else {
            return GenreCatalog::builtin();
        };
        match remote.genres().await {
            Ok(catalog) if !catalog.is_empty() => catalog,
            Ok(_) => GenreCatalog::builtin(),
            Err(e) => {
                warn!(error = %e, "Genre list unavailable, using built-in table");
                GenreCatalog::builtin()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tmdb::testing::StubSource;

    fn param<'a>(plan: &'a Plan, key: &str) -> Option<&'a str> {
        match plan {
            Plan::Discover { params, .. } => params
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    #[test]
    fn strategy_table() {
        assert_eq!(
            plan(&CollectionRequest::named("tendances")),
            Plan::Trending { page: 1 }
        );
        assert_eq!(
            plan(&CollectionRequest::named("unknown")),
            Plan::Trending { page: 1 }
        );

        let popular = plan(&CollectionRequest::named("popular"));
        assert_eq!(param(&popular, "sort_by"), Some("popularity.desc"));
        assert_eq!(param(&popular, "vote_count.gte"), Some("50"));

        let top = plan(&CollectionRequest::named("mieux-notes"));
        assert_eq!(param(&top, "sort_by"), Some("vote_average.desc"));
        assert_eq!(param(&top, "vote_count.gte"), Some("1000"));

        let recent = plan(&CollectionRequest::named("now"));
        assert_eq!(param(&recent, "sort_by"), Some("primary_release_date.desc"));
        assert_eq!(param(&recent, "vote_count.gte"), Some("50"));
    }

    #[test]
    fn filters_are_applied_to_discover() {
        let mut request = CollectionRequest::new(CollectionKind::Browse).with_page(3);
        request.sort = Some(SortKey::Title);
        request.genre = Some(27);
        request.year = Some(1999);
        let planned = plan(&request);
        assert_eq!(param(&planned, "sort_by"), Some("original_title.asc"));
        assert_eq!(param(&planned, "with_genres"), Some("27"));
        assert_eq!(param(&planned, "primary_release_year"), Some("1999"));
        assert!(matches!(planned, Plan::Discover { page: 3, .. }));
    }

    #[test]
    fn query_overrides_strategy() {
        let mut request = CollectionRequest::named("toprated");
        request.genre = Some(18);
        request.query = Some(String::from("  dune "));
        assert_eq!(
            plan(&request),
            Plan::Search {
                query: String::from("dune"),
                page: 1
            }
        );

        request.query = Some(String::from("   "));
        assert!(matches!(plan(&request), Plan::Discover { .. }));
    }

    #[tokio::test]
    async fn disabled_remote_yields_fallback_popular() {
        let loader = CollectionLoader::new(None);
        let result = loader.load(CollectionRequest::named("popular")).await;
        assert_eq!(result.total_pages, 1);
        assert_eq!(result.items, fallback::generate(CollectionKind::Popular));
    }

    #[tokio::test]
    async fn remote_failure_falls_back() {
        let stub = StubSource::new().with(
            "/discover/movie",
            Err(ApiError::Network(String::from("offline"))),
        );
        let loader = CollectionLoader::new(Some(Arc::new(stub)));
        let result = loader.load(CollectionRequest::named("recent")).await;
        assert_eq!(result.total_pages, 1);
        assert_eq!(result.items, fallback::generate(CollectionKind::Recent));
    }

    #[tokio::test]
    async fn remote_success_is_passed_through() {
        let stub = Arc::new(StubSource::new().with(
            "/search/movie",
            Ok(serde_json::json!({
                "results": [{ "id": 10, "title": "Dune" }],
                "total_pages": 3,
                "total_results": 41
            })),
        ));
        let remote: Arc<dyn MetadataSource> = stub.clone();
        let loader = CollectionLoader::new(Some(remote));
        let mut request = CollectionRequest::new(CollectionKind::Browse).with_page(2);
        request.query = Some(String::from("dune"));

        let result = loader.load(request).await;
        assert_eq!(result.total_pages, 3);
        assert_eq!(result.items[0].display_title(), "Dune");
        assert_eq!(stub.param(0, "query").as_deref(), Some("dune"));
        assert_eq!(stub.param(0, "page").as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn genres_fall_back_to_builtin_table() {
        let loader = CollectionLoader::new(Some(Arc::new(StubSource::new())));
        let catalog = loader.load_genres().await;
        assert_eq!(catalog.name(878), Some("Science Fiction"));
    }
}
