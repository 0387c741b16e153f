use std::time::{Duration, Instant};

use iced::widget::image::Handle;
use iced::Task;
use tracing::{debug, info, warn};

use crate::components::MAIN_SCROLL_ID;
use crate::detail::{DetailPage, DetailSections};
use crate::grid::PopulateTicket;
use crate::hero::{TimerToken, HERO_HEIGHT};
use crate::media::{
    ApiError, CollectionRequest, CollectionResult, GenreCatalog, GridSlot, MediaId, MediaItem,
    Message, Page,
};
use crate::search::SEARCH_DEBOUNCE;
use crate::tmdb::fetch_image_bytes;
use crate::StreamFlix;

pub fn handle_message(app: &mut StreamFlix, message: Message) -> Task<Message> {
    app.now = Instant::now();
    match message {
        Message::NavigateTo(page) => handle_navigate(app, page),
        Message::CycleTheme => handle_cycle_theme(app),
        Message::GenresLoaded(catalog) => handle_genres_loaded(app, catalog),
        Message::GridLoaded(slot, generation, result) => {
            handle_grid_loaded(app, slot, generation, result)
        }
        Message::ImageLoaded(url, result) => handle_image_loaded(app, url, result),
        Message::HeroLoaded(result) => handle_hero_loaded(app, result),
        Message::HeroTick(token) => {
            let next = app.hero.tick(token, app.now);
            Task::batch([schedule_hero_tick(app, next), app.request_hero_images()])
        }
        Message::HeroSelect(index) => {
            let next = app.hero.select(index, app.now);
            Task::batch([schedule_hero_tick(app, next), app.request_hero_images()])
        }
        Message::WindowFocusChanged(focused) => {
            app.window_focused = focused;
            sync_hero_visibility(app)
        }
        Message::WindowResized(width) => {
            app.window_width = width;
            Task::none()
        }
        Message::ScaleFactorChanged(factor) => handle_scale_factor_changed(app, factor),
        Message::MainScrolled(offset) => {
            app.main_scroll_offset = offset;
            sync_hero_visibility(app)
        }
        Message::AnimationTick => Task::none(),
        Message::DetailLoaded(id, result) => handle_detail_loaded(app, id, result),
        Message::DetailSectionsLoaded(id, sections) => {
            handle_detail_sections_loaded(app, id, *sections)
        }
        Message::SearchInput(input) => {
            let token = app.browse.input_changed(input);
            Task::perform(after(SEARCH_DEBOUNCE, token), Message::SearchDebounced)
        }
        Message::SearchDebounced(token) => {
            let ticket = app.browse.debounce_elapsed(token);
            dispatch(app, GridSlot::Browse, ticket)
        }
        Message::SetGenreFilter(genre) => {
            let ticket = app.browse.set_genre(genre);
            dispatch(app, GridSlot::Browse, ticket)
        }
        Message::SetSortOption(sort) => {
            let ticket = app.browse.set_sort(sort);
            dispatch(app, GridSlot::Browse, ticket)
        }
        Message::SetYearFilter(year) => {
            let ticket = app.browse.set_year(year);
            dispatch(app, GridSlot::Browse, ticket)
        }
        Message::ResetFilters => {
            let ticket = app.browse.reset();
            dispatch(app, GridSlot::Browse, ticket)
        }
        Message::PrevPage => {
            let ticket = app.browse.prev_page();
            change_page(app, ticket)
        }
        Message::NextPage => {
            let ticket = app.browse.next_page();
            change_page(app, ticket)
        }
    }
}

fn scroll_to_top() -> Task<Message> {
    let id = iced::widget::Id::new(MAIN_SCROLL_ID);
    let offset = iced::widget::scrollable::AbsoluteOffset { x: 0.0, y: 0.0 };
    iced::widget::operation::scroll_to(id, offset)
}

fn handle_navigate(app: &mut StreamFlix, page: Page) -> Task<Message> {
    info!(?page, "Navigating");
    app.current_page = page;
    app.main_scroll_offset = 0.0;

    let load = match page {
        Page::Home => Task::none(),
        Page::Browse => {
            let ticket = app.browse.start();
            dispatch(app, GridSlot::Browse, ticket)
        }
        Page::Detail(id) => open_detail(app, id),
    };
    Task::batch([load, scroll_to_top(), sync_hero_visibility(app)])
}

fn change_page(app: &mut StreamFlix, ticket: Option<PopulateTicket>) -> Task<Message> {
    if ticket.is_none() {
        return Task::none();
    }
    let load = dispatch(app, GridSlot::Browse, ticket);
    Task::batch([load, scroll_to_top()])
}

/// Posters still loading are requested again at the new density. The
/// configured density, when set, wins over the window.
fn handle_scale_factor_changed(app: &mut StreamFlix, factor: f32) -> Task<Message> {
    if app.density_override.is_some() || !factor.is_finite() || factor <= 0.0 {
        return Task::none();
    }
    if factor == app.scale_factor {
        return Task::none();
    }
    debug!(factor, "Display scale factor changed");
    app.scale_factor = factor;
    let urls = app.pending_image_urls();
    app.request_images(urls)
}

fn handle_cycle_theme(app: &mut StreamFlix) -> Task<Message> {
    app.theme = app.theme.next();
    app.theme_preference.save(app.theme);
    debug!(theme = %app.theme, "Theme changed");
    Task::none()
}

/// Start a collection load, or hold it until the genre catalog is ready so
/// cards never render with unresolved genre ids.
pub fn dispatch(
    app: &mut StreamFlix,
    slot: GridSlot,
    ticket: Option<PopulateTicket>,
) -> Task<Message> {
    let Some(ticket) = ticket else {
        return Task::none();
    };
    if !app.genres_ready {
        app.deferred.retain(|(pending, _)| *pending != slot);
        app.deferred.push((slot, ticket));
        return Task::none();
    }
    load_collection(app, slot, ticket)
}

fn load_collection(app: &StreamFlix, slot: GridSlot, ticket: PopulateTicket) -> Task<Message> {
    let generation = ticket.generation;
    Task::perform(app.loader.clone().load(ticket.request), move |result| {
        Message::GridLoaded(slot, generation, Ok(result))
    })
}

fn handle_genres_loaded(app: &mut StreamFlix, catalog: GenreCatalog) -> Task<Message> {
    info!(count = catalog.len(), "Genres ready");
    app.genres = catalog;
    app.genres_ready = true;
    let deferred = std::mem::take(&mut app.deferred);
    let app: &StreamFlix = app;
    Task::batch(
        deferred
            .into_iter()
            .map(|(slot, ticket)| load_collection(app, slot, ticket)),
    )
}

fn handle_grid_loaded(
    app: &mut StreamFlix,
    slot: GridSlot,
    generation: u64,
    result: Result<CollectionResult, ApiError>,
) -> Task<Message> {
    let applied = match slot {
        GridSlot::Home(index) => match app.home_sections.get_mut(index) {
            Some(section) => {
                section
                    .grid
                    .finish(generation, result, &app.genres, &app.images, app.now)
            }
            None => false,
        },
        GridSlot::Browse => {
            app.browse
                .apply(generation, result, &app.genres, &app.images, app.now)
        }
    };
    if !applied {
        debug!(?slot, generation, "Dropped stale collection result");
        return Task::none();
    }

    let pending = match slot {
        GridSlot::Home(index) => app
            .home_sections
            .get(index)
            .map(|section| section.grid.pending_images(app.scale_factor))
            .unwrap_or_default(),
        GridSlot::Browse => app.browse.grid().pending_images(app.scale_factor),
    };
    app.request_images(pending)
}

fn handle_hero_loaded(app: &mut StreamFlix, result: CollectionResult) -> Task<Message> {
    let next = app.hero.load(result.items);
    info!(items = app.hero.len(), phase = ?app.hero.phase(), "Hero rotation loaded");
    Task::batch([schedule_hero_tick(app, next), app.request_hero_images()])
}

fn schedule_hero_tick(app: &StreamFlix, token: Option<TimerToken>) -> Task<Message> {
    let Some(token) = token else {
        return Task::none();
    };
    Task::perform(after(app.hero.interval(), token), Message::HeroTick)
}

/// Resolves to `token` once `delay` has passed. Whoever receives it decides
/// whether the token is still current.
async fn after<T>(delay: Duration, token: T) -> T {
    tokio::time::sleep(delay).await;
    token
}

/// The hero rotates only while it can be seen: home page, focused window and
/// not scrolled past.
fn sync_hero_visibility(app: &mut StreamFlix) -> Task<Message> {
    let visible = app.current_page == Page::Home
        && app.window_focused
        && app.main_scroll_offset < HERO_HEIGHT * 0.5;
    let next = app.hero.set_visible(visible);
    schedule_hero_tick(app, next)
}

fn open_detail(app: &mut StreamFlix, id: MediaId) -> Task<Message> {
    app.detail = Some(DetailPage::new(id));
    Task::perform(app.details.clone().load_primary(id), move |result| {
        Message::DetailLoaded(id, result)
    })
}

fn handle_detail_loaded(
    app: &mut StreamFlix,
    id: MediaId,
    result: Result<MediaItem, ApiError>,
) -> Task<Message> {
    let Some(page) = app.detail.as_mut().filter(|page| page.id() == id) else {
        return Task::none();
    };
    if !page.apply_primary(result) {
        return Task::none();
    }
    let urls = page.image_urls(&app.images, app.scale_factor);
    let sections = Task::perform(app.details.clone().load_sections(id), move |sections| {
        Message::DetailSectionsLoaded(id, Box::new(sections))
    });
    Task::batch([sections, app.request_images(urls)])
}

fn handle_detail_sections_loaded(
    app: &mut StreamFlix,
    id: MediaId,
    sections: DetailSections,
) -> Task<Message> {
    let Some(page) = app.detail.as_mut().filter(|page| page.id() == id) else {
        return Task::none();
    };
    page.apply_sections(sections, &app.genres, &app.images, app.now);
    let urls = page.image_urls(&app.images, app.scale_factor);
    app.request_images(urls)
}

fn handle_image_loaded(
    app: &mut StreamFlix,
    url: String,
    result: Result<Handle, String>,
) -> Task<Message> {
    match result {
        Ok(handle) => {
            app.image_cache.insert(url.clone(), handle);
            app.notify_image_loaded(&url);
        }
        Err(error) => {
            warn!(%url, %error, "Image failed to load");
            app.image_cache.fail(&url);
        }
    }
    Task::none()
}

fn load_image(app: &mut StreamFlix, url: String) -> Task<Message> {
    app.image_cache.mark_pending(url.clone());
    let cache_path = app.image_cache.get_cache_path(&url);

    Task::perform(
        async move {
            if let Some(ref path) = cache_path {
                if let Ok(bytes) = tokio::fs::read(path).await {
                    return (url, Ok(bytes));
                }
            }
            let result = fetch_image_bytes(url.clone()).await;
            if let (Ok(bytes), Some(path)) = (&result, &cache_path) {
                if let Err(e) = tokio::fs::write(path, bytes).await {
                    debug!(error = %e, "Could not write image to disk cache");
                }
            }
            (url, result)
        },
        |(url, result)| Message::ImageLoaded(url, result.map(Handle::from_bytes)),
    )
}

impl StreamFlix {
    /// Fetch every url not already cached or in flight. Urls that are
    /// already cached are delivered to their listeners right away.
    pub fn request_images(&mut self, urls: Vec<String>) -> Task<Message> {
        let mut tasks = Vec::new();
        for url in urls {
            if self.image_cache.get(&url).is_some() {
                self.notify_image_loaded(&url);
            } else if !self.image_cache.is_known(&url) {
                tasks.push(load_image(self, url));
            }
        }
        Task::batch(tasks)
    }

    /// Every image the visible grids and the detail page still wait on.
    fn pending_image_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self
            .home_sections
            .iter()
            .flat_map(|section| section.grid.pending_images(self.scale_factor))
            .collect();
        urls.extend(self.browse.grid().pending_images(self.scale_factor));
        if let Some(detail) = &self.detail {
            urls.extend(detail.image_urls(&self.images, self.scale_factor));
        }
        urls
    }

    fn request_hero_images(&mut self) -> Task<Message> {
        let urls = self.hero_image_urls();
        self.request_images(urls)
    }

    fn notify_image_loaded(&mut self, url: &str) {
        for section in &mut self.home_sections {
            section.grid.notify_image_loaded(url);
        }
        self.browse.grid_mut().notify_image_loaded(url);
        if let Some(detail) = self.detail.as_mut() {
            detail.similar_mut().notify_image_loaded(url);
        }
    }

    /// Initial loads: skeletons everywhere, genres first, then every grid.
    pub fn boot(&mut self) -> Task<Message> {
        let mut tasks = Vec::new();

        if self.density_override.is_none() {
            tasks.push(
                iced::window::latest()
                    .and_then(iced::window::scale_factor)
                    .map(Message::ScaleFactorChanged),
            );
        }

        let genres = self.loader.clone().load_genres();
        tasks.push(Task::perform(genres, Message::GenresLoaded));

        self.hero.begin_loading();
        let hero = self.loader.clone().load(CollectionRequest::named("trending"));
        tasks.push(Task::perform(hero, Message::HeroLoaded));

        let tickets: Vec<(usize, Option<PopulateTicket>)> = self
            .home_sections
            .iter_mut()
            .enumerate()
            .map(|(index, section)| (index, section.populate()))
            .collect();
        for (index, ticket) in tickets {
            tasks.push(dispatch(self, GridSlot::Home(index), ticket));
        }

        let page = self.current_page;
        tasks.push(handle_navigate(self, page));
        Task::batch(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridPhase;
    use crate::hero::HeroPhase;
    use crate::media::{CollectionKind, MediaItem};
    use crate::settings::{AppSettings, ThemePreference};

    fn offline_app() -> StreamFlix {
        let settings = AppSettings {
            use_api: false,
            ..Default::default()
        };
        StreamFlix::with_settings(settings, Page::Home).0
    }

    fn hero_items() -> CollectionResult {
        CollectionResult::single_page(crate::fallback::generate(CollectionKind::Trending))
    }

    #[test]
    fn grid_loads_wait_for_genres() {
        let mut app = offline_app();
        assert!(!app.genres_ready);
        assert_eq!(app.deferred.len(), 4);
        assert!(app
            .home_sections
            .iter()
            .all(|section| section.grid.phase() == GridPhase::Skeleton));

        let _ = handle_message(&mut app, Message::GenresLoaded(GenreCatalog::builtin()));
        assert!(app.genres_ready);
        assert!(app.deferred.is_empty());
    }

    #[test]
    fn stale_grid_results_are_dropped() {
        let mut app = offline_app();
        let _ = handle_message(&mut app, Message::GenresLoaded(GenreCatalog::builtin()));
        let first = app.home_sections[0].populate().unwrap();
        let second = app.home_sections[0].populate().unwrap();

        let items = |n: u64| {
            CollectionResult::single_page(
                (1..=n)
                    .map(|id| MediaItem {
                        id,
                        ..Default::default()
                    })
                    .collect(),
            )
        };
        let _ = handle_message(
            &mut app,
            Message::GridLoaded(GridSlot::Home(0), second.generation, Ok(items(2))),
        );
        let _ = handle_message(
            &mut app,
            Message::GridLoaded(GridSlot::Home(0), first.generation, Ok(items(5))),
        );
        assert_eq!(app.home_sections[0].grid.cards().count(), 2);
    }

    #[test]
    fn hero_pauses_off_screen_and_when_unfocused() {
        let mut app = offline_app();
        let _ = handle_message(&mut app, Message::HeroLoaded(hero_items()));
        assert_eq!(app.hero.phase(), HeroPhase::Active);

        let _ = handle_message(&mut app, Message::MainScrolled(HERO_HEIGHT));
        assert_eq!(app.hero.phase(), HeroPhase::Paused);
        let _ = handle_message(&mut app, Message::MainScrolled(0.0));
        assert_eq!(app.hero.phase(), HeroPhase::Active);

        let _ = handle_message(&mut app, Message::WindowFocusChanged(false));
        assert_eq!(app.hero.phase(), HeroPhase::Paused);
        let _ = handle_message(&mut app, Message::WindowFocusChanged(true));
        assert_eq!(app.hero.phase(), HeroPhase::Active);

        let _ = handle_message(&mut app, Message::NavigateTo(Page::Browse));
        assert_eq!(app.hero.phase(), HeroPhase::Paused);
    }

    #[test]
    fn detail_results_for_another_movie_are_ignored() {
        let mut app = offline_app();
        let _ = handle_message(&mut app, Message::NavigateTo(Page::Detail(7)));
        let _ = handle_message(
            &mut app,
            Message::DetailLoaded(
                8,
                Ok(MediaItem {
                    id: 8,
                    title: Some(String::from("Other")),
                    ..Default::default()
                }),
            ),
        );
        let page = app.detail.as_ref().unwrap();
        assert_eq!(page.id(), 7);
        assert!(page.item().is_none());
    }

    #[test]
    fn image_results_reach_cards_and_cache() {
        let mut app = offline_app();
        let _ = handle_message(&mut app, Message::GenresLoaded(GenreCatalog::builtin()));
        let ticket = app.home_sections[0].populate().unwrap();
        let result = crate::loader::CollectionLoader::fallback(&ticket.request);
        let _ = handle_message(
            &mut app,
            Message::GridLoaded(GridSlot::Home(0), ticket.generation, Ok(result)),
        );

        let pending = app.home_sections[0].grid.pending_images(app.scale_factor);
        let url = pending[0].clone();
        assert!(app.image_cache.is_known(&url));

        let _ = handle_message(
            &mut app,
            Message::ImageLoaded(url.clone(), Ok(Handle::from_bytes(vec![0u8; 4]))),
        );
        assert!(app.image_cache.get(&url).is_some());
        let still_pending = app.home_sections[0].grid.pending_images(app.scale_factor);
        assert!(!still_pending.contains(&url));
    }

    fn tmdb_posters(n: u64) -> CollectionResult {
        CollectionResult::single_page(
            (1..=n)
                .map(|id| MediaItem {
                    id,
                    poster_path: Some(format!("/poster{}.jpg", id)),
                    ..Default::default()
                })
                .collect(),
        )
    }

    #[test]
    fn high_density_display_switches_to_large_posters() {
        let mut app = offline_app();
        let _ = handle_message(&mut app, Message::GenresLoaded(GenreCatalog::builtin()));
        let ticket = app.home_sections[0].populate().unwrap();
        let _ = handle_message(
            &mut app,
            Message::GridLoaded(GridSlot::Home(0), ticket.generation, Ok(tmdb_posters(3))),
        );
        let before = app.home_sections[0].grid.pending_images(app.scale_factor);
        assert!(before.iter().all(|url| url.contains("/w342/")));

        let _ = handle_message(&mut app, Message::ScaleFactorChanged(2.0));
        assert_eq!(app.scale_factor, 2.0);
        let after = app.home_sections[0].grid.pending_images(app.scale_factor);
        assert_eq!(after.len(), 3);
        assert!(after.iter().all(|url| url.contains("/w500/")));
        assert!(after.iter().all(|url| app.image_cache.is_known(url)));
    }

    #[test]
    fn configured_density_ignores_the_window() {
        let settings = AppSettings {
            use_api: false,
            image_density: Some(1.0),
            ..Default::default()
        };
        let mut app = StreamFlix::with_settings(settings, Page::Home).0;
        let _ = handle_message(&mut app, Message::ScaleFactorChanged(2.0));
        assert_eq!(app.scale_factor, 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn search_fires_once_typing_settles() {
        let mut app = offline_app();
        let _ = handle_message(&mut app, Message::GenresLoaded(GenreCatalog::builtin()));
        let stale = app.browse.input_changed(String::from("he"));
        let latest = app.browse.input_changed(String::from("heat"));

        let timer = tokio::spawn(after(SEARCH_DEBOUNCE, latest));
        tokio::time::advance(SEARCH_DEBOUNCE - Duration::from_millis(1)).await;
        assert!(!timer.is_finished());
        tokio::time::advance(Duration::from_millis(1)).await;
        let fired = timer.await.unwrap();

        assert!(app.browse.debounce_elapsed(stale).is_none());
        let ticket = app.browse.debounce_elapsed(fired).unwrap();
        assert_eq!(ticket.request.collection, CollectionKind::Browse);
        assert_eq!(ticket.request.query.as_deref(), Some("heat"));
    }

    #[tokio::test(start_paused = true)]
    async fn resumed_hero_waits_a_full_interval() {
        let mut app = offline_app();
        let _ = handle_message(&mut app, Message::HeroLoaded(hero_items()));
        let _ = handle_message(&mut app, Message::MainScrolled(HERO_HEIGHT));
        assert_eq!(app.hero.phase(), HeroPhase::Paused);
        app.main_scroll_offset = 0.0;
        let resumed = app.hero.set_visible(true).unwrap();

        let interval = app.hero.interval();
        let timer = tokio::spawn(after(interval, resumed));
        tokio::time::advance(interval - Duration::from_millis(1)).await;
        assert!(!timer.is_finished());
        tokio::time::advance(Duration::from_millis(1)).await;
        let token = timer.await.unwrap();

        let _ = handle_message(&mut app, Message::HeroTick(token));
        assert_eq!(app.hero.index(), 1);
    }

    #[test]
    fn theme_cycles_through_three_choices() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = offline_app();
        app.theme_preference = ThemePreference::at(dir.path().join("theme.json"));
        let start = app.theme;
        for _ in 0..3 {
            let _ = handle_message(&mut app, Message::CycleTheme);
        }
        assert_eq!(app.theme, start);
        assert_eq!(app.theme_preference.load(), start);
    }
}
