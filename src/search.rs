use std::time::{Duration, Instant};

use chrono::Datelike;
use iced::widget::{button, column, container, pick_list, row, text, text_input, Space};
use iced::{Border, Element, Length, Padding, Shadow, Theme};

use crate::format;
use crate::grid::{Grid, GridConfig, GridPhase, PopulateTicket, Stagger};
use crate::media::{
    ApiError, CollectionKind, CollectionRequest, CollectionResult, GenreCatalog, Message, SortKey,
};
use crate::tmdb::ImageConfig;
use crate::StreamFlix;

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);
pub const BROWSE_SKELETONS: usize = 20;
pub const OLDEST_YEAR: u32 = 1980;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DebounceToken(u64);

/// Only the most recently armed token survives to fire.
#[derive(Debug, Clone, Default)]
pub struct Debouncer {
    issued: u64,
    pending: Option<DebounceToken>,
}

impl Debouncer {
    pub fn arm(&mut self) -> DebounceToken {
        self.issued += 1;
        let token = DebounceToken(self.issued);
        self.pending = Some(token);
        token
    }

    pub fn fire(&mut self, token: DebounceToken) -> bool {
        if self.pending == Some(token) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct GenreOption {
    id: Option<u64>,
    name: String,
}

impl std::fmt::Display for GenreOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct YearOption(Option<u32>);

impl std::fmt::Display for YearOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(year) => write!(f, "{}", year),
            None => f.write_str("All years"),
        }
    }
}

/// Years offered by the year filter, newest first.
pub fn year_options(current_year: u32) -> Vec<u32> {
    (OLDEST_YEAR..=current_year.max(OLDEST_YEAR)).rev().collect()
}

#[derive(Debug, Clone)]
pub struct BrowseState {
    input: String,
    query: String,
    genre: Option<u64>,
    sort: SortKey,
    year: Option<u32>,
    page: u32,
    total_pages: u32,
    total_results: u64,
    debouncer: Debouncer,
    grid: Grid,
}

impl Default for BrowseState {
    fn default() -> Self {
        Self::new()
    }
}

impl BrowseState {
    pub fn new() -> Self {
        Self {
            input: String::new(),
            query: String::new(),
            genre: None,
            sort: SortKey::default(),
            year: None,
            page: 1,
            total_pages: 1,
            total_results: 0,
            debouncer: Debouncer::default(),
            grid: Grid::new(
                GridConfig::new("Catalog")
                    .skeletons(BROWSE_SKELETONS)
                    .untruncated()
                    .stagger(Stagger::BROWSE),
            ),
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn request(&self) -> CollectionRequest {
        CollectionRequest {
            sort: Some(self.sort),
            genre: self.genre,
            year: self.year,
            query: Some(self.query.clone()).filter(|q| !q.is_empty()),
            ..CollectionRequest::new(CollectionKind::Browse).with_page(self.page)
        }
    }

    fn reload(&mut self, page: u32) -> Option<PopulateTicket> {
        self.page = page.max(1);
        self.grid.populate(self.request())
    }

    /// First load when the page is opened, or when nothing is loaded yet.
    pub fn start(&mut self) -> Option<PopulateTicket> {
        match self.grid.phase() {
            GridPhase::Empty => self.reload(1),
            _ => None,
        }
    }

    pub fn input_changed(&mut self, input: String) -> DebounceToken {
        self.input = input;
        self.debouncer.arm()
    }

    /// Commits the typed text if `token` is still the latest keystroke.
    pub fn debounce_elapsed(&mut self, token: DebounceToken) -> Option<PopulateTicket> {
        if !self.debouncer.fire(token) {
            return None;
        }
        self.query = self.input.trim().to_string();
        self.reload(1)
    }

    pub fn set_genre(&mut self, genre: Option<u64>) -> Option<PopulateTicket> {
        self.genre = genre;
        self.reload(1)
    }

    pub fn set_sort(&mut self, sort: SortKey) -> Option<PopulateTicket> {
        self.sort = sort;
        self.reload(1)
    }

    pub fn set_year(&mut self, year: Option<u32>) -> Option<PopulateTicket> {
        self.year = year;
        self.reload(1)
    }

    pub fn reset(&mut self) -> Option<PopulateTicket> {
        self.debouncer.cancel();
        self.input.clear();
        self.query.clear();
        self.genre = None;
        self.sort = SortKey::default();
        self.year = None;
        self.reload(1)
    }

    pub fn can_go_back(&self) -> bool {
        self.page > 1
    }

    pub fn can_go_forward(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn next_page(&mut self) -> Option<PopulateTicket> {
        if !self.can_go_forward() {
            return None;
        }
        self.reload(self.page + 1)
    }

    pub fn prev_page(&mut self) -> Option<PopulateTicket> {
        if !self.can_go_back() {
            return None;
        }
        self.reload(self.page - 1)
    }

    pub fn apply(
        &mut self,
        generation: u64,
        result: Result<CollectionResult, ApiError>,
        genres: &GenreCatalog,
        images: &ImageConfig,
        now: Instant,
    ) -> bool {
        let totals = result
            .as_ref()
            .ok()
            .map(|r| (r.total_pages, r.total_results));
        if !self.grid.finish(generation, result, genres, images, now) {
            return false;
        }
        if let Some((pages, results)) = totals {
            self.total_pages = pages.clamp(1, CollectionResult::MAX_PAGES);
            self.total_results = results.min(CollectionResult::MAX_DISPLAY_RESULTS);
            self.page = self.page.min(self.total_pages);
        }
        true
    }

    pub fn results_label(&self) -> String {
        match self.grid.phase() {
            GridPhase::Empty | GridPhase::Skeleton => String::from("Loading…"),
            GridPhase::EmptyResult => String::from("No results"),
            GridPhase::ErrorResult => String::from("Error"),
            GridPhase::Populated => match self.total_results {
                1 => String::from("1 movie"),
                n => format!("{} movies", format::thousands(n)),
            },
        }
    }

    pub fn page_label(&self) -> String {
        format!("Page {} of {}", self.page, self.total_pages)
    }
}

fn control_style(theme: &Theme, _status: pick_list::Status) -> pick_list::Style {
    let palette = theme.extended_palette();
    pick_list::Style {
        text_color: palette.background.base.text,
        placeholder_color: palette.background.strong.text,
        handle_color: palette.background.base.text,
        background: iced::Background::Color(palette.background.weak.color),
        border: Border {
            color: palette.background.strong.color,
            width: 1.0,
            radius: 4.0.into(),
        },
    }
}

fn page_button(label: &str, message: Option<Message>) -> Element<'_, Message> {
    button(text(label).size(14))
        .padding(Padding::new(8.0).left(16.0).right(16.0))
        .style(|theme: &Theme, status| {
            let palette = theme.extended_palette();
            let background = match status {
                button::Status::Hovered => palette.primary.strong.color,
                button::Status::Disabled => palette.background.weak.color,
                _ => palette.primary.base.color,
            };
            let text_color = match status {
                button::Status::Disabled => palette.background.strong.text,
                _ => palette.primary.base.text,
            };
            button::Style {
                background: Some(iced::Background::Color(background)),
                text_color,
                border: Border::default().rounded(4),
                shadow: Shadow::default(),
                snap: false,
            }
        })
        .on_press_maybe(message)
        .into()
}

impl StreamFlix {
    pub fn view_browse_page(&self) -> Element<'_, Message> {
        let browse = &self.browse;

        let title = text("Browse").size(32).font(iced::Font {
            weight: iced::font::Weight::Bold,
            ..Default::default()
        });
        let count = text(browse.results_label()).size(14);

        let search = text_input("Search for a movie...", browse.input())
            .on_input(Message::SearchInput)
            .padding(10)
            .size(14)
            .width(Length::FillPortion(2));

        column![
            row![title, Space::new().width(Length::Fill), count].align_y(iced::Alignment::Center),
            row![search, self.view_filter_panel()]
                .spacing(12)
                .align_y(iced::Alignment::Center),
            self.view_grid(browse.grid(), self.grid_columns()),
            self.view_pagination(),
        ]
        .spacing(24)
        .padding(Padding::new(32.0).left(48.0).right(48.0))
        .width(Length::Fill)
        .into()
    }

    fn view_filter_panel(&self) -> Element<'_, Message> {
        let browse = &self.browse;

        let mut genres = vec![GenreOption {
            id: None,
            name: String::from("All genres"),
        }];
        genres.extend(self.genres.sorted().into_iter().map(|g| GenreOption {
            id: Some(g.id),
            name: g.name,
        }));
        let selected_genre = genres.iter().find(|g| g.id == browse.genre).cloned();
        let genre_picker = pick_list(genres, selected_genre, |option: GenreOption| {
            Message::SetGenreFilter(option.id)
        })
        .text_size(13)
        .style(control_style);

        let sort_picker = pick_list(SortKey::ALL, Some(browse.sort), Message::SetSortOption)
            .text_size(13)
            .style(control_style);

        let current_year = chrono::Local::now().year().max(0) as u32;
        let mut years = vec![YearOption(None)];
        years.extend(year_options(current_year).into_iter().map(|y| YearOption(Some(y))));
        let year_picker = pick_list(years, Some(YearOption(browse.year)), |option: YearOption| {
            Message::SetYearFilter(option.0)
        })
        .text_size(13)
        .style(control_style);

        let reset = button(text("Reset").size(13))
            .padding(Padding::new(8.0).left(16.0).right(16.0))
            .style(button::secondary)
            .on_press(Message::ResetFilters);

        row![genre_picker, sort_picker, year_picker, reset]
            .spacing(12)
            .align_y(iced::Alignment::Center)
            .into()
    }

    fn view_pagination(&self) -> Element<'_, Message> {
        let browse = &self.browse;
        let prev = page_button(
            "Previous",
            browse.can_go_back().then_some(Message::PrevPage),
        );
        let next = page_button(
            "Next",
            browse.can_go_forward().then_some(Message::NextPage),
        );
        container(
            row![prev, text(browse.page_label()).size(14), next]
                .spacing(16)
                .align_y(iced::Alignment::Center),
        )
        .width(Length::Fill)
        .center_x(Length::Fill)
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaItem;

    fn page_of(n: u64, total_pages: u32) -> CollectionResult {
        CollectionResult {
            items: (1..=n)
                .map(|id| MediaItem {
                    id,
                    title: Some(format!("M{}", id)),
                    ..Default::default()
                })
                .collect(),
            total_pages,
            total_results: n * total_pages as u64,
        }
    }

    fn apply(state: &mut BrowseState, ticket: &PopulateTicket, result: CollectionResult) -> bool {
        state.apply(
            ticket.generation,
            Ok(result),
            &GenreCatalog::builtin(),
            &ImageConfig::default(),
            Instant::now(),
        )
    }

    #[test]
    fn five_keystrokes_make_one_reload_with_the_final_text() {
        let mut state = BrowseState::new();
        let tokens: Vec<DebounceToken> = ["d", "du", "dun", "dune", "dune "]
            .iter()
            .map(|text| state.input_changed(text.to_string()))
            .collect();

        let reloads: Vec<PopulateTicket> = tokens
            .into_iter()
            .filter_map(|token| state.debounce_elapsed(token))
            .collect();

        assert_eq!(reloads.len(), 1);
        assert_eq!(reloads[0].request.query.as_deref(), Some("dune"));
        assert_eq!(reloads[0].request.page, 1);
    }

    #[test]
    fn a_token_fires_once() {
        let mut debouncer = Debouncer::default();
        let token = debouncer.arm();
        assert!(debouncer.fire(token));
        assert!(!debouncer.fire(token));
        let token = debouncer.arm();
        debouncer.cancel();
        assert!(!debouncer.fire(token));
    }

    #[test]
    fn filters_reload_at_page_one() {
        let mut state = BrowseState::new();
        let ticket = state.start().unwrap();
        apply(&mut state, &ticket, page_of(20, 7));
        state.next_page().unwrap();
        assert_eq!(state.page(), 2);

        let ticket = state.set_genre(Some(27)).unwrap();
        assert_eq!(ticket.request.page, 1);
        assert_eq!(ticket.request.genre, Some(27));

        let ticket = state.set_year(Some(2001)).unwrap();
        assert_eq!(ticket.request.year, Some(2001));
        let ticket = state.set_sort(SortKey::Rating).unwrap();
        assert_eq!(ticket.request.sort, Some(SortKey::Rating));
        assert_eq!(state.page(), 1);
    }

    #[test]
    fn pagination_bounds() {
        let mut state = BrowseState::new();
        let ticket = state.start().unwrap();
        assert!(!state.can_go_back());
        assert!(state.prev_page().is_none());

        apply(&mut state, &ticket, page_of(20, 2));
        assert!(state.can_go_forward());
        let ticket = state.next_page().unwrap();
        assert_eq!(ticket.request.page, 2);
        apply(&mut state, &ticket, page_of(20, 2));

        assert!(!state.can_go_forward());
        assert!(state.next_page().is_none());
        assert!(state.can_go_back());
        assert_eq!(state.prev_page().unwrap().request.page, 1);
    }

    #[test]
    fn labels_follow_the_grid() {
        let mut state = BrowseState::new();
        let ticket = state.start().unwrap();
        assert_eq!(state.results_label(), "Loading…");
        assert_eq!(state.grid().children().len(), BROWSE_SKELETONS);

        apply(&mut state, &ticket, page_of(20, 600));
        assert_eq!(state.total_pages(), 500);
        assert_eq!(state.results_label(), "10,000 movies");
        assert_eq!(state.page_label(), "Page 1 of 500");
        assert_eq!(state.grid().cards().count(), 20);

        let ticket = state.set_year(Some(1900)).unwrap();
        apply(&mut state, &ticket, CollectionResult::default());
        assert_eq!(state.results_label(), "No results");

        let ticket = state.set_year(None).unwrap();
        state.apply(
            ticket.generation,
            Err(ApiError::Network(String::from("offline"))),
            &GenreCatalog::builtin(),
            &ImageConfig::default(),
            Instant::now(),
        );
        assert_eq!(state.results_label(), "Error");
    }

    #[test]
    fn stale_page_results_do_not_move_totals() {
        let mut state = BrowseState::new();
        let first = state.start().unwrap();
        let second = state.set_genre(Some(18)).unwrap();
        assert!(apply(&mut state, &second, page_of(5, 3)));
        assert!(!apply(&mut state, &first, page_of(20, 90)));
        assert_eq!(state.total_pages(), 3);
    }

    #[test]
    fn reset_clears_filters() {
        let mut state = BrowseState::new();
        state.input_changed(String::from("alien"));
        state.set_genre(Some(27));
        let ticket = state.reset().unwrap();
        assert_eq!(ticket.request.genre, None);
        assert_eq!(ticket.request.query, None);
        assert_eq!(state.input(), "");
    }

    #[test]
    fn years_run_from_current_down_to_1980() {
        let years = year_options(2026);
        assert_eq!(years.first(), Some(&2026));
        assert_eq!(years.last(), Some(&1980));
        assert_eq!(years.len(), 47);
    }
}
