use iced::widget::{button, column, horizontal_space, image, row, text};
use iced::{Alignment, ContentFit, Element, Length};
use iced_aw::Wrap;

use super::ThumbnailCache;
use crate::state::data::ImagePayload;
use crate::Message;

const TILE_SIZE: f32 = 160.0;

/// "Recent Creations": newest photos first
pub fn view<'a>(photos: &[&'a ImagePayload], thumbnails: &'a ThumbnailCache, finished_only: bool) -> Element<'a, Message> {
    let toggle_label = if finished_only {
        "Show All Photos"
    } else {
        "Show Finished Only"
    };

    let header = row![
        text("Recent Creations").size(26),
        horizontal_space(),
        button(text(toggle_label).size(14))
            .on_press(Message::ToggleCollageFilter)
            .style(button::secondary),
    ]
    .align_y(Alignment::Center);

    let tiles: Vec<Element<'a, Message>> = photos
        .iter()
        .filter_map(|&payload| thumbnails.get(payload))
        .map(|handle| {
            image(handle.clone())
                .width(Length::Fixed(TILE_SIZE))
                .height(Length::Fixed(TILE_SIZE))
                .content_fit(ContentFit::Cover)
                .into()
        })
        .collect();

    let body: Element<'a, Message> = if tiles.is_empty() {
        text("No photos to display yet.").size(14).into()
    } else {
        Wrap::with_elements(tiles).spacing(12.0).line_spacing(12.0).into()
    };

    column![header, body].spacing(16).into()
}
