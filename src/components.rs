use iced::widget::{button, column, container, row, scrollable, text, Column, Row, Space};
use iced::{Border, Color, Element, Length, Padding, Shadow, Theme};

use crate::grid::{Grid, GridConfig, PopulateTicket};
use crate::media::{CollectionRequest, Message, Page, BRAND_RED};
use crate::StreamFlix;

pub const MAIN_SCROLL_ID: &str = "main-scroll";
const HEADER_HEIGHT: f32 = 72.0;

const ICON_CIRCLE_HALF: char = '\u{F288}';

fn icon(icon_char: char) -> iced::widget::Text<'static> {
    text(icon_char.to_string()).font(iced::Font {
        family: iced::font::Family::Name("bootstrap-icons"),
        ..Default::default()
    })
}

fn hidden_rail() -> scrollable::Rail {
    scrollable::Rail {
        background: None,
        border: Border::default(),
        scroller: scrollable::Scroller {
            background: iced::Background::Color(Color::TRANSPARENT),
            border: Border::default(),
        },
    }
}

pub fn hidden_vertical_scrollbar_style(
    _theme: &Theme,
    _status: scrollable::Status,
) -> scrollable::Style {
    scrollable::Style {
        container: container::Style::default(),
        vertical_rail: hidden_rail(),
        horizontal_rail: hidden_rail(),
        gap: None,
        auto_scroll: scrollable::AutoScroll {
            background: iced::Background::Color(Color::TRANSPARENT),
            border: Border::default(),
            shadow: Shadow::default(),
            icon: Color::TRANSPARENT,
        },
    }
}

/// One collection row on the home page.
#[derive(Debug, Clone)]
pub struct HomeSection {
    pub collection: &'static str,
    pub grid: Grid,
}

impl HomeSection {
    fn new(collection: &'static str, config: GridConfig) -> Self {
        Self {
            collection,
            grid: Grid::new(config),
        }
    }

    pub fn populate(&mut self) -> Option<PopulateTicket> {
        self.grid.populate(CollectionRequest::named(self.collection))
    }
}

pub fn home_sections() -> Vec<HomeSection> {
    vec![
        HomeSection::new("trending", GridConfig::new("Trending now")),
        HomeSection::new("popular", GridConfig::new("Popular on StreamFlix")),
        HomeSection::new("toprated", GridConfig::new("Top 10 this week").top_ten()),
        HomeSection::new("recent", GridConfig::new("New releases")),
        HomeSection::new("trending", GridConfig::new("My List").skeleton_only()),
    ]
}

impl StreamFlix {
    pub fn view_header(&self) -> Element<'_, Message> {
        let logo = text("STREAMFLIX").size(26).color(BRAND_RED).font(iced::Font {
            weight: iced::font::Weight::Bold,
            ..Default::default()
        });

        let navigation = Row::with_children([
            self.view_nav_button("Home", Page::Home),
            self.view_nav_button("Browse", Page::Browse),
        ])
        .spacing(16)
        .align_y(iced::Alignment::Center);

        let header_content = row![
            logo,
            navigation,
            Space::new().width(Length::Fill),
            self.view_theme_toggle(),
        ]
        .spacing(32)
        .padding(Padding::new(16.0).left(48.0).right(48.0))
        .align_y(iced::Alignment::Center);

        let is_scrolled = self.main_scroll_offset > 0.0;
        container(header_content)
            .width(Length::Fill)
            .height(Length::Fixed(HEADER_HEIGHT))
            .style(move |theme: &Theme| {
                let mut background = theme.extended_palette().background.base.color;
                background.a = if is_scrolled { 0.95 } else { 0.6 };
                container::Style {
                    background: Some(iced::Background::Color(background)),
                    ..Default::default()
                }
            })
            .into()
    }

    fn view_nav_button(&self, label: &'static str, page: Page) -> Element<'_, Message> {
        let is_active = self.current_page == page;

        let label_text = text(label).size(15);
        let content: Element<'_, Message> = if is_active {
            let underline = container(Space::new().width(Length::Fill).height(2)).style(|_theme| {
                container::Style {
                    background: Some(iced::Background::Color(BRAND_RED)),
                    ..Default::default()
                }
            });
            column![label_text, underline]
                .spacing(4)
                .align_x(iced::Alignment::Center)
                .into()
        } else {
            label_text.into()
        };

        button(content)
            .padding(Padding::new(8.0).left(12.0).right(12.0))
            .style(move |theme: &Theme, status| {
                let palette = theme.extended_palette();
                let text_color = match status {
                    button::Status::Hovered => palette.background.base.text,
                    _ if is_active => palette.background.base.text,
                    _ => palette.background.strong.text,
                };
                button::Style {
                    background: Some(iced::Background::Color(Color::TRANSPARENT)),
                    text_color,
                    border: Border::default(),
                    shadow: Shadow::default(),
                    snap: false,
                }
            })
            .on_press(Message::NavigateTo(page))
            .into()
    }

    fn view_theme_toggle(&self) -> Element<'_, Message> {
        let content = row![icon(ICON_CIRCLE_HALF).size(14), text(self.theme.to_string()).size(13)]
            .spacing(8)
            .align_y(iced::Alignment::Center);

        button(content)
            .padding(Padding::new(6.0).left(14.0).right(14.0))
            .style(|theme: &Theme, status| {
                let palette = theme.extended_palette();
                let background = match status {
                    button::Status::Hovered => palette.background.strong.color,
                    _ => palette.background.weak.color,
                };
                button::Style {
                    background: Some(iced::Background::Color(background)),
                    text_color: palette.background.base.text,
                    border: Border::default().rounded(16),
                    shadow: Shadow::default(),
                    snap: false,
                }
            })
            .on_press(Message::CycleTheme)
            .into()
    }

    pub fn view_home_page(&self) -> Element<'_, Message> {
        let sections = Column::with_children(
            self.home_sections
                .iter()
                .map(|section| self.view_grid_section(&section.grid)),
        )
        .spacing(40)
        .padding(Padding::new(32.0).left(48.0).right(48.0));

        column![self.view_hero_section(), sections]
            .width(Length::Fill)
            .into()
    }

    pub fn view_main_content(&self) -> Element<'_, Message> {
        let page = match self.current_page {
            Page::Home => self.view_home_page(),
            Page::Browse => self.view_browse_page(),
            Page::Detail(_) => match &self.detail {
                Some(detail) => self.view_detail_page(detail),
                None => Space::new().into(),
            },
        };

        let body = scrollable(column![Space::new().height(HEADER_HEIGHT), page].width(Length::Fill))
            .id(iced::widget::Id::new(MAIN_SCROLL_ID))
            .direction(scrollable::Direction::Vertical(
                scrollable::Scrollbar::new().width(0).scroller_width(0),
            ))
            .on_scroll(|viewport| Message::MainScrolled(viewport.absolute_offset().y))
            .width(Length::Fill)
            .height(Length::Fill)
            .style(hidden_vertical_scrollbar_style);

        iced::widget::stack![body, self.view_header()]
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    /// How many cards fit side by side in the content area.
    pub fn grid_columns(&self) -> usize {
        crate::grid::columns_for_width(self.window_width)
    }
}
