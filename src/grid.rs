use std::time::{Duration, Instant};

use iced::widget::{column, container, text, Column, Row};
use iced::{Element, Length};
use tracing::error;

use crate::cards::{self, CardNode, CardRole, CARD_WIDTH};
use crate::media::{ApiError, CollectionRequest, CollectionResult, GenreCatalog, Message};
use crate::tmdb::ImageConfig;
use crate::StreamFlix;

pub const DEFAULT_SKELETONS: usize = 6;
pub const TOP_TEN_SKELETONS: usize = 10;
pub const MIN_SKELETONS: usize = 3;

/// How long a card takes to fade in once its delay has elapsed.
pub const REVEAL_FADE: Duration = Duration::from_millis(250);

pub const EMPTY_MESSAGE: &str = "Nothing to show here yet.";
pub const ERROR_MESSAGE: &str = "Something went wrong while loading.";

const GRID_GAP: f32 = 16.0;
const CONTENT_MARGIN: f32 = 96.0;

/// Cards per row for a window of the given width, at least one.
pub fn columns_for_width(window_width: f32) -> usize {
    ((window_width - CONTENT_MARGIN) / (CARD_WIDTH + GRID_GAP))
        .floor()
        .max(1.0) as usize
}

/// `delay(i) = min(i * step, cap)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stagger {
    pub step: Duration,
    pub cap: Duration,
}

impl Stagger {
    pub const HOME: Stagger = Stagger {
        step: Duration::from_millis(40),
        cap: Duration::from_millis(400),
    };
    pub const BROWSE: Stagger = Stagger {
        step: Duration::from_millis(30),
        cap: Duration::from_millis(300),
    };

    pub fn delay(&self, index: usize) -> Duration {
        self.step
            .saturating_mul(index.min(u32::MAX as usize) as u32)
            .min(self.cap)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridConfig {
    pub label: String,
    pub skeleton_count: Option<usize>,
    pub top_ten: bool,
    pub skeleton_only: bool,
    pub truncate: bool,
    pub stagger: Stagger,
}

impl GridConfig {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            skeleton_count: None,
            top_ten: false,
            skeleton_only: false,
            truncate: true,
            stagger: Stagger::HOME,
        }
    }

    pub fn top_ten(mut self) -> Self {
        self.top_ten = true;
        self
    }

    pub fn skeleton_only(mut self) -> Self {
        self.skeleton_only = true;
        self
    }

    pub fn skeletons(mut self, count: usize) -> Self {
        self.skeleton_count = Some(count);
        self
    }

    pub fn untruncated(mut self) -> Self {
        self.truncate = false;
        self
    }

    pub fn stagger(mut self, stagger: Stagger) -> Self {
        self.stagger = stagger;
        self
    }

    pub fn skeleton_total(&self) -> usize {
        let default = if self.top_ten {
            TOP_TEN_SKELETONS
        } else {
            DEFAULT_SKELETONS
        };
        self.skeleton_count
            .filter(|count| *count > 0)
            .unwrap_or(default)
            .max(MIN_SKELETONS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridPhase {
    Empty,
    Skeleton,
    Populated,
    EmptyResult,
    ErrorResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Empty,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GridChild {
    Card(CardNode),
    Notice(NoticeKind, String),
}

/// Proof of a populate call. Only the latest ticket's result is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulateTicket {
    pub generation: u64,
    pub request: CollectionRequest,
}

#[derive(Debug, Clone)]
pub struct Grid {
    config: GridConfig,
    phase: GridPhase,
    children: Vec<GridChild>,
    generation: u64,
    revealed_at: Option<Instant>,
}

impl Grid {
    pub fn new(config: GridConfig) -> Self {
        Self {
            config,
            phase: GridPhase::Empty,
            children: Vec::new(),
            generation: 0,
            revealed_at: None,
        }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn phase(&self) -> GridPhase {
        self.phase
    }

    pub fn children(&self) -> &[GridChild] {
        &self.children
    }

    pub fn cards(&self) -> impl Iterator<Item = &CardNode> {
        self.children.iter().filter_map(|child| match child {
            GridChild::Card(card) => Some(card),
            GridChild::Notice(..) => None,
        })
    }

    /// Reset to skeletons. Returns the ticket to load with, unless the grid
    /// is skeleton-only.
    pub fn populate(&mut self, request: CollectionRequest) -> Option<PopulateTicket> {
        self.generation += 1;
        self.revealed_at = None;
        self.children = (0..self.config.skeleton_total())
            .map(|_| GridChild::Card(cards::render_skeleton()))
            .collect();
        self.phase = GridPhase::Skeleton;

        if self.config.skeleton_only {
            return None;
        }
        Some(PopulateTicket {
            generation: self.generation,
            request,
        })
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    /// Apply a load result. Stale generations are dropped and return false.
    pub fn finish(
        &mut self,
        generation: u64,
        result: Result<CollectionResult, ApiError>,
        genres: &GenreCatalog,
        images: &ImageConfig,
        now: Instant,
    ) -> bool {
        if !self.is_current(generation) {
            return false;
        }

        match result {
            Ok(result) if result.is_empty() => {
                self.phase = GridPhase::EmptyResult;
                self.children = vec![GridChild::Notice(
                    NoticeKind::Empty,
                    EMPTY_MESSAGE.to_string(),
                )];
            }
            Ok(result) => {
                let limit = if self.config.truncate {
                    self.config.skeleton_total()
                } else {
                    usize::MAX
                };
                let stagger = self.config.stagger;
                self.children = result
                    .items
                    .iter()
                    .take(limit)
                    .enumerate()
                    .map(|(i, item)| {
                        let mut card = cards::render(item, genres, images);
                        card.animation_delay = stagger.delay(i);
                        GridChild::Card(card)
                    })
                    .collect();
                self.phase = GridPhase::Populated;
                self.revealed_at = Some(now);
            }
            Err(e) => {
                error!(grid = %self.config.label, error = %e, "Grid load failed");
                self.phase = GridPhase::ErrorResult;
                self.children = vec![GridChild::Notice(
                    NoticeKind::Error,
                    ERROR_MESSAGE.to_string(),
                )];
            }
        }
        true
    }

    pub fn notify_image_loaded(&mut self, url: &str) -> bool {
        let mut changed = false;
        for child in &mut self.children {
            if let GridChild::Card(card) = child {
                changed |= card.media.notify_loaded(url);
            }
        }
        changed
    }

    /// Image URLs the populated cards are waiting on.
    pub fn pending_images(&self, scale_factor: f32) -> Vec<String> {
        self.cards()
            .filter(|card| card.media.is_listening())
            .filter_map(|card| card.media.source_for(scale_factor))
            .map(str::to_string)
            .collect()
    }

    pub fn is_revealed(&self, card: &CardNode, now: Instant) -> bool {
        match self.revealed_at {
            Some(start) => now.saturating_duration_since(start) >= card.animation_delay,
            None => false,
        }
    }

    /// Whether some card is still waiting on its stagger delay.
    pub fn is_revealing(&self, now: Instant) -> bool {
        let Some(start) = self.revealed_at else {
            return false;
        };
        let last = self
            .cards()
            .map(|card| card.animation_delay)
            .max()
            .unwrap_or_default();
        now.saturating_duration_since(start) < last + REVEAL_FADE
    }
}

impl StreamFlix {
    pub fn view_grid<'a>(&'a self, grid: &'a Grid, columns: usize) -> Element<'a, Message> {
        let now = self.now;
        let mut rows: Vec<Element<'a, Message>> = Vec::new();
        let mut current: Vec<Element<'a, Message>> = Vec::new();

        for child in grid.children() {
            match child {
                GridChild::Card(card) => {
                    let revealed = card.role == CardRole::Movie && grid.is_revealed(card, now);
                    current.push(self.view_card(card, revealed));
                    if current.len() == columns.max(1) {
                        rows.push(
                            Row::with_children(std::mem::take(&mut current))
                                .spacing(GRID_GAP)
                                .into(),
                        );
                    }
                }
                GridChild::Notice(kind, message) => {
                    let notice = text(message.as_str()).size(16);
                    let notice = match kind {
                        NoticeKind::Empty => notice,
                        NoticeKind::Error => notice.style(text::danger),
                    };
                    rows.push(
                        container(notice)
                            .padding(24)
                            .width(Length::Fill)
                            .center_x(Length::Fill)
                            .into(),
                    );
                }
            }
        }
        if !current.is_empty() {
            rows.push(Row::with_children(current).spacing(GRID_GAP).into());
        }

        Column::with_children(rows).spacing(24).into()
    }

    pub fn view_grid_section<'a>(&'a self, grid: &'a Grid) -> Element<'a, Message> {
        let title = text(grid.config().label.as_str()).size(24).font(iced::Font {
            weight: iced::font::Weight::Bold,
            ..Default::default()
        });
        column![title, self.view_grid(grid, columns_for_width(self.window_width))]
            .spacing(16)
            .width(Length::Fill)
            .into()
    }
}
