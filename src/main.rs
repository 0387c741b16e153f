mod cards;
mod components;
mod detail;
mod fallback;
mod format;
mod grid;
mod handlers;
mod hero;
mod loader;
mod media;
mod search;
mod settings;
mod tmdb;

use std::time::{Duration, Instant};

use clap::Parser;
use iced::widget::container;
use iced::{event, window, Element, Event, Font, Length, Size, Subscription, Task, Theme};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use components::HomeSection;
use detail::{DetailController, DetailPage};
use grid::PopulateTicket;
use hero::HeroRotation;
use loader::CollectionLoader;
use media::{GenreCatalog, GridSlot, ImageCache, MediaId, Message, Page};
use search::BrowseState;
use settings::{AppSettings, ThemeChoice, ThemePreference};
use tmdb::ImageConfig;

const WINDOW_WIDTH: f32 = 1280.0;
const WINDOW_HEIGHT: f32 = 800.0;
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Native movie catalog browser.
#[derive(Debug, Parser)]
#[command(name = "streamflix", version, about)]
struct Cli {
    /// Open the detail page for this movie id
    #[arg(long, value_name = "ID", conflicts_with = "browse")]
    movie: Option<MediaId>,

    /// Open the browse page
    #[arg(long)]
    browse: bool,

    /// Never call the remote API; show placeholder data
    #[arg(long)]
    offline: bool,
}

impl Cli {
    fn start_page(&self) -> Page {
        match (self.movie, self.browse) {
            (Some(id), _) => Page::Detail(id),
            (None, true) => Page::Browse,
            (None, false) => Page::Home,
        }
    }
}

pub struct StreamFlix {
    pub images: ImageConfig,
    pub loader: CollectionLoader,
    pub details: DetailController,
    pub theme_preference: ThemePreference,
    pub theme: ThemeChoice,
    pub current_page: Page,
    pub genres: GenreCatalog,
    pub genres_ready: bool,
    pub deferred: Vec<(GridSlot, PopulateTicket)>,
    pub hero: HeroRotation,
    pub home_sections: Vec<HomeSection>,
    pub browse: BrowseState,
    pub detail: Option<DetailPage>,
    pub image_cache: ImageCache,
    pub window_focused: bool,
    pub window_width: f32,
    pub main_scroll_offset: f32,
    pub scale_factor: f32,
    pub density_override: Option<f32>,
    pub now: Instant,
}

impl StreamFlix {
    pub fn with_settings(settings: AppSettings, start_page: Page) -> (Self, Task<Message>) {
        let loader = CollectionLoader::from_settings(&settings);
        let theme_preference = ThemePreference::new();
        let mut app = Self {
            images: ImageConfig::new(&settings.image_base),
            details: DetailController::new(loader.remote()),
            loader,
            theme: theme_preference.load(),
            theme_preference,
            current_page: start_page,
            genres: GenreCatalog::default(),
            genres_ready: false,
            deferred: Vec::new(),
            hero: HeroRotation::default(),
            home_sections: components::home_sections(),
            browse: BrowseState::new(),
            detail: None,
            image_cache: ImageCache::new(),
            window_focused: true,
            window_width: WINDOW_WIDTH,
            main_scroll_offset: 0.0,
            scale_factor: settings.image_density.unwrap_or(1.0),
            density_override: settings.image_density,
            now: Instant::now(),
        };
        let boot = app.boot();
        (app, boot)
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        handlers::handle_message(self, message)
    }

    fn view(&self) -> Element<'_, Message> {
        container(self.view_main_content())
            .width(Length::Fill)
            .height(Length::Fill)
            .style(|theme: &Theme| container::Style {
                background: Some(iced::Background::Color(
                    theme.extended_palette().background.base.color,
                )),
                ..Default::default()
            })
            .into()
    }

    fn theme(&self) -> Theme {
        self.theme.to_theme()
    }

    fn is_animating(&self) -> bool {
        let grids_revealing = self
            .home_sections
            .iter()
            .map(|section| &section.grid)
            .chain(std::iter::once(self.browse.grid()))
            .chain(self.detail.as_ref().map(DetailPage::similar))
            .any(|grid| grid.is_revealing(self.now));
        grids_revealing || self.hero.is_fading(self.now)
    }

    fn subscription(&self) -> Subscription<Message> {
        let mut subs = vec![event::listen_with(window_event)];
        if self.is_animating() {
            subs.push(iced::time::every(FRAME_INTERVAL).map(|_| Message::AnimationTick));
        }
        Subscription::batch(subs)
    }
}

fn window_event(event: Event, _status: event::Status, _id: window::Id) -> Option<Message> {
    match event {
        Event::Window(window::Event::Focused) => Some(Message::WindowFocusChanged(true)),
        Event::Window(window::Event::Unfocused) => Some(Message::WindowFocusChanged(false)),
        Event::Window(window::Event::Resized(size)) => Some(Message::WindowResized(size.width)),
        Event::Window(window::Event::Rescaled(factor)) => Some(Message::ScaleFactorChanged(factor)),
        _ => None,
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "streamflix=info".into()))
        .with(fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut settings = AppSettings::load();
    if cli.offline {
        settings.use_api = false;
    }
    settings.log_summary();
    let start_page = cli.start_page();

    iced::application(
        move || StreamFlix::with_settings(settings.clone(), start_page),
        StreamFlix::update,
        StreamFlix::view,
    )
    .title("StreamFlix")
    .theme(StreamFlix::theme)
    .window_size(Size::new(WINDOW_WIDTH, WINDOW_HEIGHT))
    .font(iced_fonts::BOOTSTRAP_FONT_BYTES)
    .default_font(Font::DEFAULT)
    .subscription(StreamFlix::subscription)
    .run()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_picks_the_start_page() {
        let cli = Cli::parse_from(["streamflix", "--movie", "603"]);
        assert_eq!(cli.start_page(), Page::Detail(603));
        let cli = Cli::parse_from(["streamflix", "--browse", "--offline"]);
        assert_eq!(cli.start_page(), Page::Browse);
        assert!(cli.offline);
        let cli = Cli::parse_from(["streamflix"]);
        assert_eq!(cli.start_page(), Page::Home);
    }

    #[test]
    fn movie_and_browse_conflict() {
        assert!(Cli::try_parse_from(["streamflix", "--movie", "1", "--browse"]).is_err());
    }

    #[test]
    fn rescale_events_reach_the_app() {
        let message = window_event(
            Event::Window(window::Event::Rescaled(2.0)),
            event::Status::Ignored,
            window::Id::unique(),
        );
        assert!(matches!(message, Some(Message::ScaleFactorChanged(f)) if f == 2.0));
    }

    #[test]
    fn offline_boot_starts_from_skeletons() {
        let settings = AppSettings {
            use_api: false,
            ..Default::default()
        };
        let (app, _) = StreamFlix::with_settings(settings, Page::Detail(42));
        assert!(app.loader.remote().is_none());
        assert_eq!(app.detail.as_ref().map(DetailPage::id), Some(42));
        assert!(!app.is_animating());
    }
}
