use iced::futures::channel::mpsc;
use iced::futures::SinkExt;
use iced::widget::{button, column, container, horizontal_space, row, scrollable, text, text_input, Column};
use iced::{stream, Alignment, Element, Length, Subscription, Task, Theme};
use rfd::{FileDialog, MessageButtons, MessageDialog, MessageDialogResult, MessageLevel};
use std::sync::Arc;
use tracing::{error, info, warn};

mod config;
mod error;
mod images;
mod state;
mod ui;

use config::AppConfig;
use error::{AppError, AuthError, FormError, PersistenceError};
use images::{ingest_batch, load_files, IngestOutcome};
use state::cache::{ProjectCache, Snapshot};
use state::data::{Category, ImagePayload, ProjectId};
use state::form::{Field, FormController, IngestTicket};
use state::gateway::{Gateway, ProjectCollection, Session};
use state::query::{self, Board};
use ui::ThumbnailCache;

/// File types offered by the image picker
const IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "gif", "webp", "bmp", "tiff"];

/// Main application state
struct CrochetTracker {
    config: AppConfig,
    /// None when the project database could not be opened
    gateway: Option<Gateway>,
    /// Set once anonymous sign-in succeeds; gates every persistence call
    collection: Option<ProjectCollection>,
    cache: ProjectCache,
    form: FormController,
    thumbnails: ThumbnailCache,
    search: String,
    vertical_layout: bool,
    finished_only: bool,
    /// Non-blocking error notices, newest last
    notices: Vec<String>,
}

/// Application messages (events)
#[derive(Debug, Clone)]
pub enum Message {
    SignedIn(Result<Session, Arc<AuthError>>),
    SnapshotArrived(Snapshot),
    SyncFailed(Arc<PersistenceError>),
    SearchChanged(String),
    ToggleLayout,
    ToggleCollageFilter,
    OpenNew,
    OpenProject(ProjectId),
    FieldChanged(Field, String),
    CategorySelected(Category),
    PickImages,
    ImagesIngested(IngestTicket, Vec<IngestOutcome>),
    SetMainImage(ImagePayload),
    Save,
    Saved(Result<(), Arc<PersistenceError>>),
    Delete,
    Deleted(Result<(), Arc<PersistenceError>>),
    Cancel,
    DismissNotice(usize),
}

impl CrochetTracker {
    /// Create a new instance of the application
    fn new() -> (Self, Task<Message>) {
        let config = AppConfig::load();

        let mut app = CrochetTracker {
            config,
            gateway: None,
            collection: None,
            cache: ProjectCache::new(),
            form: FormController::new(),
            thumbnails: ThumbnailCache::default(),
            search: String::new(),
            vertical_layout: false,
            finished_only: false,
            notices: Vec::new(),
        };

        let gateway = match Gateway::open(
            &app.config.database_path,
            &app.config.namespace,
            app.config.remote_timeout(),
        ) {
            Ok(gateway) => gateway,
            Err(e) => {
                error!("Failed to open project database: {}", e);
                app.notify(AppError::from(Arc::new(e)));
                return (app, Task::none());
            }
        };

        app.gateway = Some(gateway.clone());

        // Nothing touches the collection until this completes
        let sign_in = Task::perform(
            async move { gateway.sign_in_anonymously().await.map_err(Arc::new) },
            Message::SignedIn,
        );

        (app, sign_in)
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::SignedIn(Ok(session)) => {
                if let Some(gateway) = &self.gateway {
                    let collection = gateway.collection(&session);
                    info!("Signed in anonymously; projects at {}", collection.path());
                    self.collection = Some(collection);
                }
                Task::none()
            }
            Message::SignedIn(Err(e)) => {
                error!("Anonymous sign-in failed: {}", e);
                self.notify(AppError::from(e));
                Task::none()
            }
            Message::SnapshotArrived(snapshot) => {
                if let Some(event) = self.cache.replace(snapshot) {
                    info!("Projects loaded (r{}, {} projects)", event.revision, event.count);
                    self.refresh_thumbnails();
                }
                Task::none()
            }
            Message::SyncFailed(e) => {
                error!("Error loading projects: {}", e);
                self.notify(AppError::from(e));
                Task::none()
            }
            Message::SearchChanged(query) => {
                self.search = query;
                Task::none()
            }
            Message::ToggleLayout => {
                self.vertical_layout = !self.vertical_layout;
                Task::none()
            }
            Message::ToggleCollageFilter => {
                self.finished_only = !self.finished_only;
                Task::none()
            }
            Message::OpenNew => {
                self.form.open_for_create();
                Task::none()
            }
            Message::OpenProject(id) => {
                match self.cache.get(&id) {
                    Some(project) => self.form.open_for_edit(project),
                    None => warn!("Project {} is no longer in the cache", id),
                }
                Task::none()
            }
            Message::FieldChanged(field, value) => {
                self.form.edit(field, value);
                Task::none()
            }
            Message::CategorySelected(category) => {
                self.form.set_category(category);
                Task::none()
            }
            Message::PickImages => self.pick_images(),
            Message::ImagesIngested(ticket, outcomes) => {
                let report = self.form.finish_ingest(ticket, outcomes);
                for failure in report.failed {
                    self.notify(AppError::from(failure));
                }
                self.refresh_thumbnails();
                Task::none()
            }
            Message::SetMainImage(payload) => {
                if let Err(e) = self.form.set_main_image(&payload) {
                    self.notify(AppError::from(e));
                }
                Task::none()
            }
            Message::Save => self.save(),
            Message::Saved(result) => {
                if let Err(e) = self.form.finish_submit(result) {
                    self.notify(AppError::from(e));
                }
                Task::none()
            }
            Message::Delete => self.delete(),
            Message::Deleted(result) => {
                if let Err(e) = self.form.finish_delete(result) {
                    self.notify(AppError::from(e));
                }
                Task::none()
            }
            Message::Cancel => {
                self.form.cancel();
                self.refresh_thumbnails();
                Task::none()
            }
            Message::DismissNotice(index) => {
                if index < self.notices.len() {
                    self.notices.remove(index);
                }
                Task::none()
            }
        }
    }

    fn pick_images(&mut self) -> Task<Message> {
        let Some(paths) = FileDialog::new()
            .set_title("Select Project Photos")
            .add_filter("Images", &IMAGE_EXTENSIONS)
            .pick_files()
        else {
            return Task::none();
        };

        let ticket = match self.form.begin_ingest() {
            Ok(ticket) => ticket,
            Err(e) => {
                self.notify(AppError::from(e));
                return Task::none();
            }
        };

        info!("Ingesting {} images", paths.len());
        let settings = self.config.images;

        Task::perform(
            async move {
                let inputs = load_files(paths).await;
                ingest_batch(inputs, settings).await
            },
            move |outcomes| Message::ImagesIngested(ticket, outcomes),
        )
    }

    fn save(&mut self) -> Task<Message> {
        let Some(collection) = self.collection.clone() else {
            warn!("Save requested before sign-in completed");
            return Task::none();
        };

        match self.form.submit() {
            Ok(intent) => Task::perform(
                async move { intent.execute(&collection).await.map_err(Arc::new) },
                Message::Saved,
            ),
            Err(e) => {
                self.notify(AppError::from(e));
                Task::none()
            }
        }
    }

    fn delete(&mut self) -> Task<Message> {
        let Some(collection) = self.collection.clone() else {
            warn!("Delete requested before sign-in completed");
            return Task::none();
        };

        let intent = self.form.request_delete(|name| {
            MessageDialog::new()
                .set_level(MessageLevel::Warning)
                .set_title("Delete Project")
                .set_description(format!("Are you sure you want to delete \"{}\"?", name))
                .set_buttons(MessageButtons::YesNo)
                .show()
                == MessageDialogResult::Yes
        });

        match intent {
            Ok(intent) => Task::perform(
                async move { intent.execute(&collection).await.map_err(Arc::new) },
                Message::Deleted,
            ),
            Err(FormError::NotConfirmed) => Task::none(),
            Err(e) => {
                self.notify(AppError::from(e));
                Task::none()
            }
        }
    }

    fn notify(&mut self, error: AppError) {
        self.notices.push(error.to_string());
    }

    /// Decode handles for every image the views can show
    fn refresh_thumbnails(&mut self) {
        let cached = self.cache.projects().iter().flat_map(|project| project.images.iter());
        let drafted = self.form.draft().into_iter().flat_map(|draft| draft.images.iter());
        self.thumbnails.sync(cached.chain(drafted));
    }

    /// Push snapshots of the signed-in user's collection into the app.
    /// Dropping the subscription (window closed) unsubscribes.
    fn subscription(&self) -> Subscription<Message> {
        let Some(collection) = self.collection.clone() else {
            return Subscription::none();
        };

        Subscription::run_with_id(
            collection.path().clone(),
            stream::channel(16, move |mut output: mpsc::Sender<Message>| async move {
                let mut subscription = match collection.subscribe().await {
                    Ok(subscription) => subscription,
                    Err(e) => {
                        let _ = output.send(Message::SyncFailed(Arc::new(e))).await;
                        return;
                    }
                };

                if output.send(Message::SnapshotArrived(subscription.current())).await.is_err() {
                    return;
                }

                loop {
                    match subscription.changed().await {
                        Ok(snapshot) => {
                            if output.send(Message::SnapshotArrived(snapshot)).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            let _ = output.send(Message::SyncFailed(Arc::new(e))).await;
                            break;
                        }
                    }
                }

                subscription.unsubscribe();
            }),
        )
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        if let Some(modal) = ui::modal::view(&self.form, &self.thumbnails) {
            return column![self.notices_view(), modal].into();
        }

        let layout_label = if self.vertical_layout {
            "Switch to Gallery View"
        } else {
            "Switch to List View"
        };

        let header = row![
            column![
                text("Crochet Projects").size(40),
                text("Crafting happiness, one stitch at a time.").size(18),
            ]
            .spacing(4),
            horizontal_space(),
            button(text(layout_label)).on_press(Message::ToggleLayout).style(button::secondary),
            button(text("+ Add Project"))
                .on_press_maybe(self.collection.is_some().then_some(Message::OpenNew))
                .style(button::primary),
        ]
        .spacing(12)
        .align_y(Alignment::Center);

        let search = text_input(
            "Search projects by name, pattern, yarn, notes or hook size...",
            &self.search,
        )
        .on_input(Message::SearchChanged)
        .padding(12);

        let board = Board::build(self.cache.projects(), &self.search);
        let photos = query::collage(self.cache.projects(), self.finished_only, self.config.collage_limit);

        let content = column![
            header,
            self.notices_view(),
            search,
            ui::board::view(&board, &self.thumbnails, self.vertical_layout),
            ui::collage::view(&photos, &self.thumbnails, self.finished_only),
        ]
        .spacing(28)
        .padding(32);

        container(scrollable(content))
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn notices_view(&self) -> Element<Message> {
        let notices = self.notices.iter().enumerate().map(|(index, notice)| {
            row![
                text(notice).size(14),
                horizontal_space(),
                button(text("×")).on_press(Message::DismissNotice(index)).style(button::text),
            ]
            .align_y(Alignment::Center)
            .into()
        });

        Column::with_children(notices).spacing(6).into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Light
    }
}

impl Drop for CrochetTracker {
    fn drop(&mut self) {
        if let Some(gateway) = &self.gateway {
            gateway.close();
        }
    }
}

fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("🧶 Starting Crochet Tracker v{}", env!("CARGO_PKG_VERSION"));

    iced::application(
        "Crochet Tracker",
        CrochetTracker::update,
        CrochetTracker::view,
    )
    .subscription(CrochetTracker::subscription)
    .theme(CrochetTracker::theme)
    .centered()
    .run_with(CrochetTracker::new)
}
