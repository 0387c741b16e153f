use std::time::Duration;

use iced::widget::{column, container, image, mouse_area, text, tooltip, Space};
use iced::{Border, Color, Element, Length, Shadow, Theme};

use crate::media::{GenreCatalog, MediaId, MediaItem, Message, Page, SKELETON_GRAY};
use crate::tmdb::{ImageConfig, ImageSize};
use crate::StreamFlix;

pub const PLACEHOLDER_POSTER: &str = "https://placehold.co/300x450/222/888?text=Aucune+image";

pub const CARD_WIDTH: f32 = 160.0;
pub const POSTER_HEIGHT: f32 = 240.0;
const META_HEIGHT: f32 = 44.0;

const OVERLAY_LIMIT: usize = 160;
const ELLIPSIS: &str = "...";
const SUBTITLE_GENRES: usize = 2;
const BLANK: &str = "\u{200b}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardRole {
    Skeleton,
    Movie,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageState {
    #[default]
    Loading,
    Loaded,
}

/// Load listener that fires at most once and then disarms itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadOnce {
    armed: bool,
}

impl LoadOnce {
    fn arm(&mut self) {
        self.armed = true;
    }

    fn fire(&mut self) -> bool {
        std::mem::take(&mut self.armed)
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CardImage {
    src: Option<String>,
    src_2x: Option<String>,
    state: ImageState,
    listener: LoadOnce,
}

impl CardImage {
    fn with_sources(src: String, src_2x: Option<String>) -> Self {
        let mut image = Self::default();
        image.listener.arm();
        image.src = Some(src);
        image.src_2x = src_2x;
        image
    }

    pub fn src(&self) -> Option<&str> {
        self.src.as_deref()
    }

    pub fn src_2x(&self) -> Option<&str> {
        self.src_2x.as_deref()
    }

    pub fn state(&self) -> ImageState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.listener.is_armed()
    }

    /// The source to fetch for a display scale factor.
    pub fn source_for(&self, scale_factor: f32) -> Option<&str> {
        if scale_factor > 1.0 {
            self.src_2x().or(self.src())
        } else {
            self.src()
        }
    }

    /// Returns true only on the single Loading -> Loaded transition.
    pub fn notify_loaded(&mut self, url: &str) -> bool {
        let matches = self.src() == Some(url) || self.src_2x() == Some(url);
        if !matches || !self.listener.fire() {
            return false;
        }
        self.state = ImageState::Loaded;
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CardOverlay {
    pub title: String,
    pub description: String,
}

/// A rendered card. Skeletons and movies fill the same slots.
#[derive(Debug, Clone, PartialEq)]
pub struct CardNode {
    pub role: CardRole,
    pub id: Option<MediaId>,
    pub target: Option<Page>,
    pub title: String,
    pub subtitle: String,
    pub media: CardImage,
    pub overlay: CardOverlay,
    pub animation_delay: Duration,
}

pub fn render_skeleton() -> CardNode {
    CardNode {
        role: CardRole::Skeleton,
        id: None,
        target: None,
        title: BLANK.to_string(),
        subtitle: BLANK.to_string(),
        media: CardImage::default(),
        overlay: CardOverlay::default(),
        animation_delay: Duration::ZERO,
    }
}

pub fn render(item: &MediaItem, genres: &GenreCatalog, images: &ImageConfig) -> CardNode {
    let media = match item.poster_path.as_deref() {
        Some(path) => CardImage::with_sources(
            images.url(path, ImageSize::Poster),
            Some(images.url(path, ImageSize::PosterLarge)),
        ),
        None => CardImage::with_sources(PLACEHOLDER_POSTER.to_string(), None),
    };

    CardNode {
        role: CardRole::Movie,
        id: Some(item.id),
        target: Some(Page::Detail(item.id)),
        title: item.display_title().to_string(),
        subtitle: subtitle(item, genres),
        media,
        overlay: CardOverlay {
            title: item.display_title().to_string(),
            description: truncate_overlay(item.overview.as_deref().unwrap_or_default()),
        },
        animation_delay: Duration::ZERO,
    }
}

/// `"{year} • {genre}, {genre}"`, dropping whichever side is missing.
pub fn subtitle(item: &MediaItem, genres: &GenreCatalog) -> String {
    let mut names: Vec<&str> = Vec::with_capacity(SUBTITLE_GENRES);
    for name in genres.resolve(&item.genres) {
        if names.len() == SUBTITLE_GENRES {
            break;
        }
        if !names.contains(&name) {
            names.push(name);
        }
    }
    let genre_part = names.join(", ");

    [item.year().unwrap_or_default(), genre_part.as_str()]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" • ")
}

pub fn truncate_overlay(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= OVERLAY_LIMIT {
        return text.to_string();
    }
    let kept: String = text
        .chars()
        .take(OVERLAY_LIMIT - ELLIPSIS.len())
        .collect();
    format!("{}{}", kept, ELLIPSIS)
}

fn surface_style(theme: &Theme) -> container::Style {
    let palette = theme.extended_palette();
    container::Style {
        background: Some(iced::Background::Color(palette.background.weak.color)),
        border: Border {
            color: Color::TRANSPARENT,
            width: 0.0,
            radius: 8.0.into(),
        },
        shadow: Shadow {
            color: Color::from_rgba(0.0, 0.0, 0.0, 0.3),
            offset: iced::Vector::new(0.0, 4.0),
            blur_radius: 8.0,
        },
        ..Default::default()
    }
}

fn skeleton_block(width: f32, height: f32) -> Element<'static, Message> {
    container(Space::new().width(width).height(height))
        .width(Length::Fixed(width))
        .height(Length::Fixed(height))
        .style(|_theme| container::Style {
            background: Some(iced::Background::Color(SKELETON_GRAY)),
            border: Border::default().rounded(8),
            ..Default::default()
        })
        .into()
}

impl StreamFlix {
    pub fn view_card<'a>(&'a self, node: &'a CardNode, revealed: bool) -> Element<'a, Message> {
        let showing = revealed && node.role == CardRole::Movie;

        let poster: Element<'a, Message> = if showing && node.media.state() == ImageState::Loaded {
            let handle = node
                .media
                .source_for(self.scale_factor)
                .and_then(|url| self.image_cache.get(url));
            match handle {
                Some(h) => image(h.clone())
                    .width(Length::Fixed(CARD_WIDTH))
                    .height(Length::Fixed(POSTER_HEIGHT))
                    .content_fit(iced::ContentFit::Cover)
                    .into(),
                None => skeleton_block(CARD_WIDTH, POSTER_HEIGHT),
            }
        } else {
            skeleton_block(CARD_WIDTH, POSTER_HEIGHT)
        };

        let (title, subtitle) = if showing {
            (node.title.as_str(), node.subtitle.as_str())
        } else {
            (BLANK, BLANK)
        };

        let meta = column![
            text(title)
                .size(14)
                .font(iced::Font {
                    weight: iced::font::Weight::Bold,
                    ..Default::default()
                })
                .wrapping(text::Wrapping::None),
            text(subtitle)
                .size(12)
                .style(|theme: &Theme| text::Style {
                    color: Some(theme.extended_palette().background.strong.text),
                })
                .wrapping(text::Wrapping::None),
        ]
        .spacing(4)
        .height(Length::Fixed(META_HEIGHT))
        .clip(true);

        let card = container(column![poster, meta].spacing(8))
            .width(Length::Fixed(CARD_WIDTH))
            .style(surface_style);

        let Some(target) = node.target.filter(|_| showing) else {
            return card.into();
        };

        let overlay = container(
            column![
                text(node.overlay.title.as_str()).size(14).font(iced::Font {
                    weight: iced::font::Weight::Bold,
                    ..Default::default()
                }),
                text(node.overlay.description.as_str()).size(12),
            ]
            .spacing(6)
            .max_width(280),
        )
        .padding(10)
        .style(container::rounded_box);

        tooltip(
            mouse_area(card).on_press(Message::NavigateTo(target)),
            overlay,
            tooltip::Position::FollowCursor,
        )
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::GenreRef;

    fn nuit_blanche() -> MediaItem {
        MediaItem {
            id: 2,
            title: Some(String::from("Nuit Blanche")),
            release_date: Some(String::from("2024-03-01")),
            poster_path: Some(String::from("/nb.jpg")),
            genres: vec![GenreRef::Id(53), GenreRef::Id(53)],
            ..Default::default()
        }
    }

    #[test]
    fn subtitle_collapses_duplicate_genres() {
        let node = render(&nuit_blanche(), &GenreCatalog::builtin(), &ImageConfig::default());
        assert_eq!(node.subtitle, "2024 • Thriller");
        assert_eq!(node.target, Some(Page::Detail(2)));
    }

    #[test]
    fn subtitle_keeps_two_genres_and_drops_missing_parts() {
        let mut item = nuit_blanche();
        item.genres = vec![GenreRef::Id(28), GenreRef::Id(12), GenreRef::Id(16)];
        assert_eq!(subtitle(&item, &GenreCatalog::builtin()), "2024 • Action, Adventure");

        item.release_date = None;
        assert_eq!(subtitle(&item, &GenreCatalog::builtin()), "Action, Adventure");

        item.genres.clear();
        assert_eq!(subtitle(&item, &GenreCatalog::builtin()), "");
    }

    #[test]
    fn overlay_text_is_capped_at_160() {
        let long = "a".repeat(200);
        let cut = truncate_overlay(&long);
        assert_eq!(cut.chars().count(), 160);
        assert!(cut.starts_with(&"a".repeat(157)));
        assert!(cut.ends_with("..."));

        assert_eq!(truncate_overlay("  short  "), "short");
        assert_eq!(truncate_overlay(&"b".repeat(160)).len(), 160);
    }

    #[test]
    fn poster_sources() {
        let node = render(&nuit_blanche(), &GenreCatalog::default(), &ImageConfig::default());
        assert_eq!(node.media.src(), Some("https://image.tmdb.org/t/p/w342/nb.jpg"));
        assert_eq!(node.media.src_2x(), Some("https://image.tmdb.org/t/p/w500/nb.jpg"));
        assert_eq!(node.media.source_for(2.0), node.media.src_2x());

        let mut item = nuit_blanche();
        item.poster_path = None;
        item.title = None;
        let node = render(&item, &GenreCatalog::default(), &ImageConfig::default());
        assert_eq!(node.media.src(), Some(PLACEHOLDER_POSTER));
        assert_eq!(node.title, "Untitled");
    }

    #[test]
    fn image_loads_exactly_once() {
        let mut node = render(&nuit_blanche(), &GenreCatalog::default(), &ImageConfig::default());
        assert_eq!(node.media.state(), ImageState::Loading);
        assert!(node.media.is_listening());

        assert!(!node.media.notify_loaded("https://elsewhere/x.jpg"));
        assert!(node.media.notify_loaded("https://image.tmdb.org/t/p/w342/nb.jpg"));
        assert_eq!(node.media.state(), ImageState::Loaded);
        assert!(!node.media.is_listening());
        assert!(!node.media.notify_loaded("https://image.tmdb.org/t/p/w500/nb.jpg"));
    }

    #[test]
    fn skeleton_has_the_same_slots() {
        let skeleton = render_skeleton();
        assert_eq!(skeleton.role, CardRole::Skeleton);
        assert_eq!(skeleton.title, BLANK);
        assert_eq!(skeleton.subtitle, BLANK);
        assert_eq!(skeleton.media.src(), None);
        assert!(!skeleton.media.is_listening());
        assert_eq!(skeleton.target, None);
    }
}
