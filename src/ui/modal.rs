use iced::widget::{button, column, container, horizontal_space, image, pick_list, row, scrollable, text, text_input, Column};
use iced::{Alignment, ContentFit, Element, Length};
use iced_aw::Wrap;

use super::ThumbnailCache;
use crate::state::data::{Category, ProjectDraft};
use crate::state::form::{Field, FormController, ModalState};
use crate::Message;

const THUMB_SIZE: f32 = 80.0;

/// Add/edit project form. Returns `None` when the modal is closed.
pub fn view<'a>(form: &'a FormController, thumbnails: &'a ThumbnailCache) -> Option<Element<'a, Message>> {
    let (title, draft, existing) = match form.state() {
        ModalState::Closed => return None,
        ModalState::EditingNew { draft, .. } => ("Add New Project", draft, false),
        ModalState::EditingExisting { draft, .. } => ("Edit Project", draft, true),
    };
    let processing = form.is_processing();

    let fields = column![
        labeled("Project Name", &draft.name, Field::Name),
        column![
            text("Category").size(14),
            pick_list(Category::ALL, Some(draft.category), Message::CategorySelected).width(Length::Fill),
        ]
        .spacing(4),
        labeled("Pattern", &draft.pattern, Field::Pattern),
        labeled("Yarn", &draft.yarn, Field::Yarn),
        labeled("Hook Size", &draft.hook_size, Field::HookSize),
        labeled("Link to Notes", &draft.notes_link, Field::NotesLink),
        labeled("Notes", &draft.notes, Field::Notes),
        column![
            row![
                text("Images").size(14),
                horizontal_space(),
                button(text("Add Images…").size(14))
                    .on_press_maybe((!processing).then_some(Message::PickImages))
                    .style(button::secondary),
            ]
            .align_y(Alignment::Center),
            gallery(draft, thumbnails),
        ]
        .spacing(8),
    ]
    .spacing(14);

    let save_label = if processing { "Saving..." } else { "Save Project" };
    let mut actions = row![
        button(text(save_label)).on_press_maybe((!processing).then_some(Message::Save)).style(button::success),
        horizontal_space(),
        button(text("Cancel")).on_press(Message::Cancel).style(button::secondary),
    ]
    .spacing(12);

    if existing {
        actions = actions.push(
            button(text("Delete Project"))
                .on_press_maybe((!processing).then_some(Message::Delete))
                .style(button::danger),
        );
    }

    let content = column![
        text(title).size(28),
        scrollable(fields).height(Length::Fill),
        actions,
    ]
    .spacing(20)
    .max_width(720);

    Some(
        container(content)
            .padding(32)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .into(),
    )
}

fn labeled<'a>(label: &'a str, value: &'a str, field: Field) -> Element<'a, Message> {
    column![
        text(label).size(14),
        text_input("", value)
            .on_input(move |value| Message::FieldChanged(field, value))
            .padding(10),
    ]
    .spacing(4)
    .into()
}

/// Thumbnails of the draft's images, each with a "Set Main" button
fn gallery<'a>(draft: &'a ProjectDraft, thumbnails: &'a ThumbnailCache) -> Element<'a, Message> {
    let tiles: Vec<Element<'a, Message>> = draft
        .images
        .iter()
        .filter_map(|payload| thumbnails.get(payload).map(|handle| (payload, handle)))
        .map(|(payload, handle)| {
            let is_main = draft.main_image.as_ref() == Some(payload);
            let label = if is_main { "Main" } else { "Set Main" };

            let toggle = button(text(label).size(12)).on_press(Message::SetMainImage(payload.clone()));
            let toggle = if is_main {
                toggle.style(button::primary)
            } else {
                toggle.style(button::secondary)
            };

            Column::new()
                .push(
                    image(handle.clone())
                        .width(Length::Fixed(THUMB_SIZE))
                        .height(Length::Fixed(THUMB_SIZE))
                        .content_fit(ContentFit::Cover),
                )
                .push(toggle)
                .spacing(4)
                .align_x(Alignment::Center)
                .into()
        })
        .collect();

    if tiles.is_empty() {
        text("No images yet.").size(14).into()
    } else {
        Wrap::with_elements(tiles).spacing(8.0).line_spacing(8.0).into()
    }
}
