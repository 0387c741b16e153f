use std::time::{Duration, Instant};

use iced::widget::{button, column, container, image, mouse_area, row, text, Space};
use iced::{Border, Color, Element, Length, Padding, Shadow};

use crate::cards::truncate_overlay;
use crate::format;
use crate::media::{MediaItem, Message, Page, BRAND_RED, SKELETON_GRAY};
use crate::tmdb::ImageSize;
use crate::StreamFlix;

pub const ROTATION_INTERVAL: Duration = Duration::from_millis(15_000);
pub const FADE_DURATION: Duration = Duration::from_millis(600);
pub const PRELOAD_AHEAD: usize = 3;

pub const HERO_HEIGHT: f32 = 560.0;

/// Identifies one armed rotation timer. A tick carrying any other token is
/// ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeroPhase {
    Idle,
    Loading,
    Empty,
    Active,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fade {
    from: usize,
    started: Instant,
}

#[derive(Debug, Clone)]
pub struct HeroRotation {
    items: Vec<MediaItem>,
    index: usize,
    phase: HeroPhase,
    visible: bool,
    timer: Option<TimerToken>,
    issued: u64,
    fade: Option<Fade>,
    interval: Duration,
}

impl Default for HeroRotation {
    fn default() -> Self {
        Self::new(ROTATION_INTERVAL)
    }
}

impl HeroRotation {
    pub fn new(interval: Duration) -> Self {
        Self {
            items: Vec::new(),
            index: 0,
            phase: HeroPhase::Idle,
            visible: true,
            timer: None,
            issued: 0,
            fade: None,
            interval,
        }
    }

    /// Items the hero can show: poster, backdrop and overview all present.
    pub fn is_qualifying(item: &MediaItem) -> bool {
        let present = |field: &Option<String>| field.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&item.poster_path) && present(&item.backdrop_path) && present(&item.overview)
    }

    pub fn phase(&self) -> HeroPhase {
        self.phase
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn current(&self) -> Option<&MediaItem> {
        self.items.get(self.index)
    }

    pub fn begin_loading(&mut self) {
        self.timer = None;
        self.phase = HeroPhase::Loading;
    }

    fn arm(&mut self) -> TimerToken {
        self.issued += 1;
        let token = TimerToken(self.issued);
        self.timer = Some(token);
        token
    }

    /// Install the rotation set. Returns the first timer when rotation starts
    /// on a visible hero.
    pub fn load(&mut self, items: Vec<MediaItem>) -> Option<TimerToken> {
        self.items = items.into_iter().filter(Self::is_qualifying).collect();
        self.index = 0;
        self.fade = None;
        self.timer = None;

        if self.items.is_empty() {
            self.phase = HeroPhase::Empty;
            return None;
        }
        if !self.visible {
            self.phase = HeroPhase::Paused;
            return None;
        }
        self.phase = HeroPhase::Active;
        Some(self.arm())
    }

    /// Advance on the live timer and re-arm. Stale tokens change nothing.
    pub fn tick(&mut self, token: TimerToken, now: Instant) -> Option<TimerToken> {
        if self.phase != HeroPhase::Active || self.timer != Some(token) {
            return None;
        }
        self.show(self.index + 1, now);
        Some(self.arm())
    }

    /// Jump to an item and restart the interval.
    pub fn select(&mut self, index: usize, now: Instant) -> Option<TimerToken> {
        if self.items.is_empty() || index == self.index {
            return None;
        }
        self.show(index, now);
        match self.phase {
            HeroPhase::Active => Some(self.arm()),
            _ => None,
        }
    }

    fn show(&mut self, index: usize, now: Instant) {
        let from = self.index;
        self.index = index % self.items.len();
        self.fade = Some(Fade { from, started: now });
    }

    /// Hiding drops the timer, showing arms a fresh full interval.
    pub fn set_visible(&mut self, visible: bool) -> Option<TimerToken> {
        self.visible = visible;
        match (visible, self.phase) {
            (false, HeroPhase::Active) => {
                self.timer = None;
                self.phase = HeroPhase::Paused;
                None
            }
            (true, HeroPhase::Paused) => {
                self.phase = HeroPhase::Active;
                Some(self.arm())
            }
            _ => None,
        }
    }

    /// The next `n` items after the current one, for prefetching.
    pub fn upcoming(&self, n: usize) -> Vec<&MediaItem> {
        let len = self.items.len();
        if len < 2 {
            return Vec::new();
        }
        (1..=n.min(len - 1))
            .map(|offset| &self.items[(self.index + offset) % len])
            .collect()
    }

    /// Opacity of the current backdrop, 0.0 to 1.0 over the fade.
    pub fn fade_alpha(&self, now: Instant) -> f32 {
        match self.fade {
            Some(fade) => {
                let elapsed = now.saturating_duration_since(fade.started);
                (elapsed.as_secs_f32() / FADE_DURATION.as_secs_f32()).min(1.0)
            }
            None => 1.0,
        }
    }

    pub fn is_fading(&self, now: Instant) -> bool {
        self.fade_alpha(now) < 1.0
    }

    fn outgoing(&self, now: Instant) -> Option<&MediaItem> {
        self.fade
            .filter(|_| self.is_fading(now))
            .and_then(|fade| self.items.get(fade.from))
    }
}

impl StreamFlix {
    pub fn hero_image_urls(&self) -> Vec<String> {
        self.hero
            .current()
            .into_iter()
            .chain(self.hero.upcoming(PRELOAD_AHEAD))
            .filter_map(|item| item.backdrop_path.as_deref())
            .map(|path| self.images.url(path, ImageSize::BackdropLarge))
            .collect()
    }

    fn view_hero_layer(&self, item: &MediaItem, opacity: f32) -> Option<Element<'_, Message>> {
        let url = self
            .images
            .url(item.backdrop_path.as_deref()?, ImageSize::BackdropLarge);
        let handle = self.image_cache.get(&url)?;
        Some(
            image(handle.clone())
                .width(Length::Fill)
                .height(Length::Fixed(HERO_HEIGHT))
                .content_fit(iced::ContentFit::Cover)
                .opacity(opacity)
                .into(),
        )
    }

    pub fn view_hero_section(&self) -> Element<'_, Message> {
        match self.hero.phase() {
            HeroPhase::Active | HeroPhase::Paused => match self.hero.current() {
                Some(item) => self.view_hero_with_content(item),
                None => self.view_hero_placeholder(),
            },
            _ => self.view_hero_placeholder(),
        }
    }

    fn view_hero_placeholder(&self) -> Element<'_, Message> {
        container(Space::new().width(Length::Fill).height(Length::Fill))
            .width(Length::Fill)
            .height(Length::Fixed(HERO_HEIGHT))
            .style(|_theme| container::Style {
                background: Some(iced::Background::Color(SKELETON_GRAY)),
                ..Default::default()
            })
            .into()
    }

    fn view_hero_with_content<'a>(&'a self, item: &'a MediaItem) -> Element<'a, Message> {
        let now = self.now;
        let mut layers: Vec<Element<'a, Message>> = Vec::new();

        // Upcoming backdrops stay mounted but invisible so switching is instant.
        for upcoming in self.hero.upcoming(PRELOAD_AHEAD) {
            if let Some(layer) = self.view_hero_layer(upcoming, 0.0) {
                layers.push(layer);
            }
        }
        if let Some(outgoing) = self.hero.outgoing(now) {
            if let Some(layer) = self.view_hero_layer(outgoing, 1.0) {
                layers.push(layer);
            }
        }
        match self.view_hero_layer(item, self.hero.fade_alpha(now)) {
            Some(layer) => layers.push(layer),
            None => layers.push(self.view_hero_placeholder()),
        }

        let mut meta: Vec<String> = Vec::new();
        if let Some(year) = item.year() {
            meta.push(year.to_string());
        }
        if let Some(rating) = item.vote_average.filter(|r| *r > 0.0) {
            meta.push(format::rating(rating));
        }

        let title = text(item.display_title())
            .size(48)
            .color(Color::WHITE)
            .font(iced::Font {
                weight: iced::font::Weight::Bold,
                ..Default::default()
            });
        let details = text(meta.join(" • "))
            .size(14)
            .color(Color::from_rgb(0.8, 0.8, 0.8));
        let overview = container(
            text(truncate_overlay(item.overview.as_deref().unwrap_or_default()))
                .size(16)
                .color(Color::from_rgb(0.85, 0.85, 0.85)),
        )
        .max_width(520.0);

        let more_info = button(text("More Info").size(16).color(Color::WHITE))
            .padding(Padding::new(12.0).left(24.0).right(24.0))
            .style(|_theme, status| {
                let background = match status {
                    button::Status::Hovered => Color::from_rgb(0.698, 0.027, 0.063),
                    _ => BRAND_RED,
                };
                button::Style {
                    background: Some(iced::Background::Color(background)),
                    text_color: Color::WHITE,
                    border: Border::default().rounded(4),
                    shadow: Shadow::default(),
                    snap: false,
                }
            })
            .on_press(Message::NavigateTo(Page::Detail(item.id)));

        let content = column![title, details, overview, more_info, self.view_hero_dots()]
            .spacing(18)
            .padding(Padding::new(64.0));

        let shade = container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .align_y(iced::alignment::Vertical::Center)
            .style(|_theme| container::Style {
                background: Some(iced::Background::Gradient(iced::Gradient::Linear(
                    iced::gradient::Linear::new(0.0)
                        .add_stop(0.0, Color::from_rgba(0.0, 0.0, 0.0, 0.95))
                        .add_stop(0.4, Color::from_rgba(0.0, 0.0, 0.0, 0.6))
                        .add_stop(0.8, Color::TRANSPARENT),
                ))),
                ..Default::default()
            });
        layers.push(shade.into());

        iced::widget::Stack::with_children(layers)
            .width(Length::Fill)
            .height(Length::Fixed(HERO_HEIGHT))
            .into()
    }

    fn view_hero_dots(&self) -> Element<'_, Message> {
        let current = self.hero.index();
        let dots = (0..self.hero.len()).map(|i| {
            let color = if i == current {
                Color::WHITE
            } else {
                Color::from_rgba(1.0, 1.0, 1.0, 0.35)
            };
            let dot: Element<'_, Message> = mouse_area(
                container(Space::new().width(10).height(10)).style(move |_theme| {
                    container::Style {
                        background: Some(iced::Background::Color(color)),
                        border: Border::default().rounded(5),
                        ..Default::default()
                    }
                }),
            )
            .on_press(Message::HeroSelect(i))
            .into();
            dot
        });
        row(dots).spacing(8).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback;
    use crate::media::CollectionKind;

    fn loaded() -> (HeroRotation, TimerToken) {
        let mut hero = HeroRotation::default();
        hero.begin_loading();
        let token = hero.load(fallback::generate(CollectionKind::Trending)).unwrap();
        (hero, token)
    }

    #[test]
    fn three_ticks_advance_three_items() {
        let (mut hero, mut token) = loaded();
        assert_eq!(hero.phase(), HeroPhase::Active);
        let now = Instant::now();
        for _ in 0..3 {
            token = hero.tick(token, now).unwrap();
        }
        assert_eq!(hero.index(), 3);
    }

    #[test]
    fn index_wraps() {
        let (mut hero, mut token) = loaded();
        let now = Instant::now();
        for _ in 0..hero.len() {
            token = hero.tick(token, now).unwrap();
        }
        assert_eq!(hero.index(), 0);
    }

    #[test]
    fn stale_tokens_are_ignored() {
        let (mut hero, first) = loaded();
        let now = Instant::now();
        let second = hero.tick(first, now).unwrap();
        assert_eq!(hero.tick(first, now), None);
        assert_eq!(hero.index(), 1);
        assert!(hero.tick(second, now).is_some());
    }

    #[test]
    fn hiding_pauses_and_showing_rearms() {
        let (mut hero, token) = loaded();
        let now = Instant::now();
        let token = hero.tick(token, now).unwrap();

        assert_eq!(hero.set_visible(false), None);
        assert_eq!(hero.phase(), HeroPhase::Paused);
        assert_eq!(hero.tick(token, now), None);
        assert_eq!(hero.index(), 1);

        let resumed = hero.set_visible(true).unwrap();
        assert_ne!(resumed, token);
        assert_eq!(hero.phase(), HeroPhase::Active);
        assert_eq!(hero.set_visible(true), None);
        hero.tick(resumed, now).unwrap();
        assert_eq!(hero.index(), 2);
    }

    #[test]
    fn no_qualifying_items_never_starts() {
        let mut hero = HeroRotation::default();
        let bare = MediaItem {
            id: 1,
            title: Some(String::from("No art")),
            ..Default::default()
        };
        assert_eq!(hero.load(vec![bare]), None);
        assert_eq!(hero.phase(), HeroPhase::Empty);
        assert_eq!(hero.set_visible(true), None);
        assert!(hero.current().is_none());
    }

    #[test]
    fn loading_while_hidden_waits_for_visibility() {
        let mut hero = HeroRotation::default();
        hero.set_visible(false);
        assert_eq!(hero.load(fallback::generate(CollectionKind::Trending)), None);
        assert_eq!(hero.phase(), HeroPhase::Paused);
        assert!(hero.set_visible(true).is_some());
    }

    #[test]
    fn upcoming_lists_following_items() {
        let (mut hero, token) = loaded();
        let ids: Vec<u64> = hero.upcoming(PRELOAD_AHEAD).iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![2, 3, 4]);

        let now = Instant::now();
        let mut token = token;
        for _ in 0..5 {
            token = hero.tick(token, now).unwrap();
        }
        let ids: Vec<u64> = hero.upcoming(PRELOAD_AHEAD).iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn fade_runs_after_a_switch() {
        let (mut hero, token) = loaded();
        let now = Instant::now();
        assert_eq!(hero.fade_alpha(now), 1.0);
        hero.tick(token, now).unwrap();
        assert!(hero.is_fading(now));
        assert!(hero.outgoing(now).is_some());
        assert!(!hero.is_fading(now + FADE_DURATION));
    }

    #[test]
    fn selecting_restarts_the_interval() {
        let (mut hero, token) = loaded();
        let now = Instant::now();
        let fresh = hero.select(4, now).unwrap();
        assert_eq!(hero.index(), 4);
        assert_eq!(hero.tick(token, now), None);
        assert!(hero.tick(fresh, now).is_some());
    }
}
