//! The single-movie page: a primary record plus cast, videos and similar
//! titles, each loaded and failing on its own.

use std::sync::Arc;
use std::time::Instant;

use iced::widget::{column, container, image, row, text, Column, Row, Space};
use iced::{Border, Element, Length, Padding, Theme};
use tracing::error;

use crate::fallback;
use crate::format;
use crate::grid::{Grid, GridConfig, Stagger};
use crate::media::{
    ApiError, CastMember, CollectionKind, CollectionRequest, CollectionResult, Credits,
    GenreCatalog, MediaId, MediaItem, Message, Video, MISSING_IMAGE_GRAY, SKELETON_GRAY,
};
use crate::tmdb::{ImageConfig, ImageSize, MetadataSource};
use crate::StreamFlix;

pub const CAST_LIMIT: usize = 12;
pub const VIDEO_LIMIT: usize = 6;
pub const SIMILAR_LIMIT: usize = 8;
pub const DASH: &str = "—";

pub const LOAD_FAILED_TITLE: &str = "Could not load this movie";
pub const LOAD_FAILED_OVERVIEW: &str = "The details for this movie are unavailable right now.";
const NO_OVERVIEW: &str = "No description available.";

const YOUTUBE: &str = "YouTube";
const TRAILER: &str = "Trailer";

/// Display state of one independently loaded region.
#[derive(Debug, Clone, PartialEq)]
pub enum Region<T> {
    Loading,
    Ready(T),
    Empty(&'static str),
    Failed(&'static str),
}

#[derive(Debug, Clone)]
pub struct DetailSections {
    pub credits: Result<Credits, ApiError>,
    pub videos: Result<Vec<Video>, ApiError>,
    pub similar: Result<CollectionResult, ApiError>,
}

#[derive(Clone)]
pub struct DetailController {
    remote: Option<Arc<dyn MetadataSource>>,
}

impl DetailController {
    pub fn new(remote: Option<Arc<dyn MetadataSource>>) -> Self {
        Self { remote }
    }

    pub async fn load_primary(self, id: MediaId) -> Result<MediaItem, ApiError> {
        match self.remote.as_deref() {
            Some(remote) => remote.details(id).await,
            None => Ok(fallback::movie(id)),
        }
    }

    /// Credits, videos and similar titles, fetched concurrently. One failing
    /// never affects the others.
    pub async fn load_sections(self, id: MediaId) -> DetailSections {
        let Some(remote) = self.remote.as_deref() else {
            return DetailSections {
                credits: Ok(fallback::credits(id)),
                videos: Ok(Vec::new()),
                similar: Ok(CollectionResult::single_page(fallback::generate(
                    CollectionKind::Similar,
                ))),
            };
        };
        let (credits, videos, similar) =
            tokio::join!(remote.credits(id), remote.videos(id), remote.similar(id, 1));
        DetailSections {
            credits,
            videos,
            similar,
        }
    }
}

/// First crew member credited as director.
pub fn director(credits: &Credits) -> Option<&str> {
    credits
        .crew
        .iter()
        .find(|member| member.job == "Director")
        .map(|member| member.name.as_str())
}

/// YouTube trailers first, then other YouTube videos, capped.
pub fn order_videos(videos: &[Video]) -> Vec<Video> {
    let on_youtube = |v: &&Video| v.site == YOUTUBE;
    videos
        .iter()
        .filter(on_youtube)
        .filter(|v| v.kind == TRAILER)
        .chain(videos.iter().filter(on_youtube).filter(|v| v.kind != TRAILER))
        .take(VIDEO_LIMIT)
        .cloned()
        .collect()
}

/// Readable label for a video type; unknown types pass through.
pub fn video_kind_label(kind: &str) -> &str {
    match kind {
        "Trailer" => "Trailer",
        "Teaser" => "Teaser",
        "Clip" => "Excerpt",
        "Featurette" => "Making-of",
        "Behind the Scenes" => "Behind the scenes",
        "Bloopers" => "Bloopers",
        "Opening Credits" => "Opening credits",
        other => other,
    }
}

/// Upper-cased first letter shown in place of a missing cast photo.
pub fn initial(name: &str) -> String {
    name.trim()
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_else(|| String::from("?"))
}

pub fn video_thumbnail(video: &Video) -> String {
    format!("https://img.youtube.com/vi/{}/mqdefault.jpg", video.key)
}

pub fn video_link(video: &Video) -> String {
    format!("https://www.youtube.com/watch?v={}", video.key)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailPhase {
    Loading,
    Ready,
    Failed,
}

#[derive(Debug, Clone)]
pub struct DetailPage {
    id: MediaId,
    phase: DetailPhase,
    item: Option<MediaItem>,
    director: Option<String>,
    cast: Region<Vec<CastMember>>,
    videos: Region<Vec<Video>>,
    similar: Grid,
    similar_generation: Option<u64>,
}

impl DetailPage {
    pub fn new(id: MediaId) -> Self {
        let mut similar = Grid::new(
            GridConfig::new("More like this")
                .skeletons(SIMILAR_LIMIT)
                .stagger(Stagger::HOME),
        );
        let similar_generation = similar
            .populate(CollectionRequest::new(CollectionKind::Similar))
            .map(|ticket| ticket.generation);
        Self {
            id,
            phase: DetailPhase::Loading,
            item: None,
            director: None,
            cast: Region::Loading,
            videos: Region::Loading,
            similar,
            similar_generation,
        }
    }

    pub fn id(&self) -> MediaId {
        self.id
    }

    pub fn phase(&self) -> DetailPhase {
        self.phase
    }

    pub fn item(&self) -> Option<&MediaItem> {
        self.item.as_ref()
    }

    pub fn cast(&self) -> &Region<Vec<CastMember>> {
        &self.cast
    }

    pub fn videos(&self) -> &Region<Vec<Video>> {
        &self.videos
    }

    pub fn similar(&self) -> &Grid {
        &self.similar
    }

    pub fn similar_mut(&mut self) -> &mut Grid {
        &mut self.similar
    }

    /// Returns true when the sections should be fetched next.
    pub fn apply_primary(&mut self, result: Result<MediaItem, ApiError>) -> bool {
        match result {
            Ok(item) => {
                self.item = Some(item);
                self.phase = DetailPhase::Ready;
                true
            }
            Err(e) => {
                error!(id = self.id, error = %e, "Movie details failed to load");
                self.phase = DetailPhase::Failed;
                false
            }
        }
    }

    pub fn apply_sections(
        &mut self,
        sections: DetailSections,
        genres: &GenreCatalog,
        images: &ImageConfig,
        now: Instant,
    ) {
        self.apply_credits(sections.credits);
        self.apply_videos(sections.videos);
        if let Some(generation) = self.similar_generation.take() {
            let similar = sections.similar.map(|mut result| {
                result.items.truncate(SIMILAR_LIMIT);
                result
            });
            self.similar.finish(generation, similar, genres, images, now);
        }
    }

    fn apply_credits(&mut self, result: Result<Credits, ApiError>) {
        match result {
            Ok(credits) => {
                self.director = director(&credits).map(str::to_string);
                let cast: Vec<CastMember> = credits.cast.into_iter().take(CAST_LIMIT).collect();
                self.cast = if cast.is_empty() {
                    Region::Empty("No cast information.")
                } else {
                    Region::Ready(cast)
                };
            }
            Err(e) => {
                error!(id = self.id, error = %e, "Cast failed to load");
                self.cast = Region::Failed("Could not load the cast.");
            }
        }
    }

    fn apply_videos(&mut self, result: Result<Vec<Video>, ApiError>) {
        match result {
            Ok(videos) => {
                let ordered = order_videos(&videos);
                self.videos = if ordered.is_empty() {
                    Region::Empty("No videos available.")
                } else {
                    Region::Ready(ordered)
                };
            }
            Err(e) => {
                error!(id = self.id, error = %e, "Videos failed to load");
                self.videos = Region::Failed("Could not load videos.");
            }
        }
    }

    pub fn title(&self) -> &str {
        match (self.phase, &self.item) {
            (DetailPhase::Failed, _) => LOAD_FAILED_TITLE,
            (_, Some(item)) => item.display_title(),
            (_, None) => "",
        }
    }

    pub fn overview(&self) -> &str {
        match (self.phase, &self.item) {
            (DetailPhase::Failed, _) => LOAD_FAILED_OVERVIEW,
            (_, Some(item)) => item.overview.as_deref().unwrap_or(NO_OVERVIEW),
            (_, None) => "",
        }
    }

    pub fn tagline(&self) -> Option<&str> {
        match self.phase {
            DetailPhase::Failed => None,
            _ => self.item.as_ref().and_then(|item| item.tagline.as_deref()),
        }
    }

    pub fn director_name(&self) -> &str {
        self.director.as_deref().unwrap_or(DASH)
    }

    /// `year • runtime • rating/10`, skipping missing parts.
    pub fn meta_line(&self) -> String {
        let Some(item) = &self.item else {
            return String::new();
        };
        let parts: Vec<String> = [
            item.year().map(str::to_string),
            item.runtime.map(format::runtime),
            item.vote_average.filter(|r| *r > 0.0).map(format::rating),
        ]
        .into_iter()
        .flatten()
        .collect();
        parts.join(" • ")
    }

    pub fn stats(&self) -> Vec<(&'static str, String)> {
        let item = self.item.as_ref();
        vec![
            (
                "Rating",
                item.and_then(|i| i.vote_average)
                    .filter(|r| *r > 0.0)
                    .map(format::rating)
                    .unwrap_or_else(|| DASH.to_string()),
            ),
            (
                "Votes",
                item.and_then(|i| i.vote_count)
                    .filter(|v| *v > 0)
                    .map(format::thousands)
                    .unwrap_or_else(|| DASH.to_string()),
            ),
            (
                "Popularity",
                item.and_then(|i| i.popularity)
                    .filter(|p| *p > 0.0)
                    .map(|p| format!("{}", p.round() as u64))
                    .unwrap_or_else(|| DASH.to_string()),
            ),
        ]
    }

    /// Labelled facts; rows without a value are left out.
    pub fn facts(&self) -> Vec<(&'static str, String)> {
        let Some(item) = &self.item else {
            return Vec::new();
        };
        [
            ("Original title", item.original_title.clone()),
            ("Director", self.director.clone()),
            (
                "Status",
                item.status.as_deref().map(|s| format::status(s).to_string()),
            ),
            (
                "Release date",
                item.release_date.as_deref().map(format::long_date),
            ),
            ("Runtime", item.runtime.map(format::runtime)),
            ("Budget", item.budget.map(format::money)),
            ("Revenue", item.revenue.map(format::money)),
            ("Languages", joined(&item.languages)),
            ("Countries", joined(&item.countries)),
            ("Companies", joined(&item.companies)),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.map(|v| (label, v)))
        .collect()
    }

    pub fn genre_names(&self, genres: &GenreCatalog) -> Vec<String> {
        self.item
            .as_ref()
            .map(|item| genres.resolve(&item.genres).map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn image_urls(&self, images: &ImageConfig, scale_factor: f32) -> Vec<String> {
        let mut urls = Vec::new();
        if let Some(path) = self.item.as_ref().and_then(|i| i.poster_path.as_deref()) {
            urls.push(images.url(path, ImageSize::PosterLarge));
        }
        if let Region::Ready(cast) = &self.cast {
            urls.extend(
                cast.iter()
                    .filter_map(|c| c.profile_path.as_deref())
                    .map(|path| images.url(path, ImageSize::Profile)),
            );
        }
        if let Region::Ready(videos) = &self.videos {
            urls.extend(videos.iter().map(video_thumbnail));
        }
        urls.extend(self.similar.pending_images(scale_factor));
        urls
    }
}

fn joined(names: &[String]) -> Option<String> {
    (!names.is_empty()).then(|| names.join(", "))
}

fn heading(label: &str) -> iced::widget::Text<'_> {
    text(label).size(22).font(iced::Font {
        weight: iced::font::Weight::Bold,
        ..Default::default()
    })
}

fn divider() -> Element<'static, Message> {
    container(Space::new().width(Length::Fill).height(1))
        .width(Length::Fill)
        .style(|theme: &Theme| container::Style {
            background: Some(iced::Background::Color(
                theme.extended_palette().background.strong.color,
            )),
            ..Default::default()
        })
        .into()
}

fn view_image_shell(width: f32, height: f32) -> Element<'static, Message> {
    container(Space::new().width(width).height(height))
        .style(|_theme| container::Style {
            background: Some(iced::Background::Color(SKELETON_GRAY)),
            border: Border::default().rounded(6),
            ..Default::default()
        })
        .into()
}

/// Shown when a record has no image at all, unlike the loading shell.
fn view_missing_image(label: String, width: f32, height: f32) -> Element<'static, Message> {
    container(text(label).size(36).style(muted))
        .width(Length::Fixed(width))
        .height(Length::Fixed(height))
        .center_x(Length::Fixed(width))
        .center_y(Length::Fixed(height))
        .style(|_theme| container::Style {
            background: Some(iced::Background::Color(MISSING_IMAGE_GRAY)),
            border: Border::default().rounded(6),
            ..Default::default()
        })
        .into()
}

fn muted(theme: &Theme) -> text::Style {
    text::Style {
        color: Some(theme.extended_palette().background.strong.text),
    }
}

impl StreamFlix {
    fn view_cached_image(
        &self,
        url: Option<String>,
        width: f32,
        height: f32,
        missing: &str,
    ) -> Element<'_, Message> {
        let Some(url) = url else {
            return view_missing_image(missing.to_string(), width, height);
        };
        match self.image_cache.get(&url) {
            Some(handle) => image(handle.clone())
                .width(Length::Fixed(width))
                .height(Length::Fixed(height))
                .content_fit(iced::ContentFit::Cover)
                .into(),
            None => view_image_shell(width, height),
        }
    }

    pub fn view_detail_page<'a>(&'a self, page: &'a DetailPage) -> Element<'a, Message> {
        let poster_url = page
            .item()
            .and_then(|i| i.poster_path.as_deref())
            .map(|path| self.images.url(path, ImageSize::PosterLarge));
        let poster = match page.phase() {
            DetailPhase::Loading => view_image_shell(300.0, 450.0),
            _ => self.view_cached_image(poster_url, 300.0, 450.0, ""),
        };

        let title = text(page.title()).size(40).font(iced::Font {
            weight: iced::font::Weight::Bold,
            ..Default::default()
        });
        let title = match page.phase() {
            DetailPhase::Failed => title.style(text::danger),
            _ => title,
        };

        let genres = Row::with_children(page.genre_names(&self.genres).into_iter().map(|name| {
            container(text(name).size(12))
                .padding(Padding::new(4.0).left(10.0).right(10.0))
                .style(container::rounded_box)
                .into()
        }))
        .spacing(8);

        let stats = Row::with_children(page.stats().into_iter().map(|(label, value)| {
            column![text(label).size(12).style(muted), text(value).size(20)]
                .spacing(2)
                .into()
        }))
        .spacing(32);

        let facts = Column::with_children(page.facts().into_iter().map(|(label, value)| {
            row![
                text(label).size(14).style(muted).width(Length::Fixed(140.0)),
                text(value).size(14)
            ]
            .into()
        }))
        .spacing(6);

        let mut summary = column![title].spacing(16).max_width(720);
        if let Some(tagline) = page.tagline() {
            summary = summary.push(text(tagline).size(17).style(muted).font(iced::Font {
                style: iced::font::Style::Italic,
                ..Default::default()
            }));
        }
        let summary = summary
            .push(text(page.meta_line()).size(15).style(muted))
            .push(genres)
            .push(text(page.overview()).size(16))
            .push(stats)
            .push(facts);

        let header = row![poster, summary].spacing(40);

        let mut body = column![header].spacing(36).padding(48);
        if page.phase() == DetailPhase::Ready {
            body = body
                .push(divider())
                .push(heading("Cast"))
                .push(self.view_cast(page.cast()))
                .push(heading("Videos"))
                .push(self.view_videos(page.videos()))
                .push(self.view_grid_section(page.similar()));
        }
        body.into()
    }

    fn view_cast<'a>(&'a self, region: &'a Region<Vec<CastMember>>) -> Element<'a, Message> {
        let cast = match region {
            Region::Ready(cast) => cast,
            other => return self.view_region_notice(other),
        };
        let cards = cast.iter().map(|member| {
            let photo = member
                .profile_path
                .as_deref()
                .map(|path| self.images.url(path, ImageSize::Profile));
            column![
                self.view_cached_image(photo, 120.0, 180.0, &initial(&member.name)),
                text(member.name.as_str()).size(13),
                text(member.character.as_str()).size(12).style(muted),
            ]
            .spacing(4)
            .width(Length::Fixed(120.0))
            .into()
        });
        Row::with_children(cards).spacing(16).wrap().into()
    }

    fn view_videos<'a>(&'a self, region: &'a Region<Vec<Video>>) -> Element<'a, Message> {
        let videos = match region {
            Region::Ready(videos) => videos,
            other => return self.view_region_notice(other),
        };
        let cards = videos.iter().map(|video| {
            column![
                self.view_cached_image(Some(video_thumbnail(video)), 320.0, 180.0, ""),
                text(video.name.as_str()).size(14),
                text(format!("{} • {}", video_kind_label(&video.kind), video_link(video)))
                    .size(12)
                    .style(muted),
            ]
            .spacing(4)
            .width(Length::Fixed(320.0))
            .into()
        });
        Row::with_children(cards).spacing(16).wrap().into()
    }

    fn view_region_notice<'a, T>(&'a self, region: &Region<T>) -> Element<'a, Message> {
        match region {
            Region::Loading => text("Loading…").size(14).style(muted).into(),
            Region::Empty(message) => text(*message).size(14).style(muted).into(),
            Region::Failed(message) => text(*message).size(14).style(text::danger).into(),
            Region::Ready(_) => Space::new().into(),
        }
    }
}
