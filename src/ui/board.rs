use iced::widget::{button, column, container, horizontal_space, image, row, text, Column};
use iced::{Alignment, Color, ContentFit, Element, Length};
use iced_aw::Wrap;

use super::ThumbnailCache;
use crate::state::data::{Category, CategoryTag, Project};
use crate::state::query::Board;
use crate::Message;

const CARD_WIDTH: f32 = 200.0;
const CARD_IMAGE_HEIGHT: f32 = 96.0;

/// The category columns, plus an Unfiled column when anything needs attention
pub fn view<'a>(board: &Board<'a>, thumbnails: &'a ThumbnailCache, vertical: bool) -> Element<'a, Message> {
    let mut columns = row![].spacing(24);

    for category in Category::ALL {
        columns = columns.push(bucket(category.label(), board.column(category), thumbnails, vertical));
    }

    if !board.unfiled.is_empty() {
        columns = columns.push(bucket("Unfiled", &board.unfiled, thumbnails, vertical));
    }

    columns.into()
}

fn bucket<'a>(
    title: &'a str,
    projects: &[&'a Project],
    thumbnails: &'a ThumbnailCache,
    vertical: bool,
) -> Element<'a, Message> {
    let body: Element<'a, Message> = if projects.is_empty() {
        text("No projects in this category.").size(14).into()
    } else {
        let cards: Vec<Element<'a, Message>> = projects
            .iter()
            .map(|&project| card(project, thumbnails, vertical))
            .collect();

        if vertical {
            Column::with_children(cards).spacing(12).into()
        } else {
            Wrap::with_elements(cards).spacing(12.0).line_spacing(12.0).into()
        }
    };

    container(column![text(title).size(22), body].spacing(16))
        .padding(20)
        .width(Length::FillPortion(1))
        .into()
}

fn card<'a>(project: &'a Project, thumbnails: &'a ThumbnailCache, vertical: bool) -> Element<'a, Message> {
    let mut content = column![].spacing(8);

    if let Some(handle) = project.main_image.as_ref().and_then(|main| thumbnails.get(main)) {
        content = content.push(
            image(handle.clone())
                .width(Length::Fill)
                .height(Length::Fixed(CARD_IMAGE_HEIGHT))
                .content_fit(ContentFit::Cover),
        );
    }

    content = content.push(
        row![
            text(&project.name).size(20),
            horizontal_space(),
            text("●").size(14).color(dot_color(&project.category)),
        ]
        .align_y(Alignment::Center),
    );

    let width = if vertical {
        Length::Fill
    } else {
        Length::Fixed(CARD_WIDTH)
    };

    button(content)
        .on_press(Message::OpenProject(project.id.clone()))
        .padding(16)
        .width(width)
        .style(button::secondary)
        .into()
}

fn dot_color(category: &CategoryTag) -> Color {
    match category {
        CategoryTag::Known(Category::Wishlist) => Color::from_rgb8(0x3B, 0x82, 0xF6),
        CategoryTag::Known(Category::InProgress) => Color::from_rgb8(0xEA, 0xB3, 0x08),
        CategoryTag::Known(Category::Finished) => Color::from_rgb8(0x22, 0xC5, 0x5E),
        CategoryTag::Unrecognized(_) => Color::from_rgb8(0x9C, 0xA3, 0xAF),
    }
}
