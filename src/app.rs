use std::collections::HashMap;
use std::path::PathBuf;

use iced::widget::scrollable::{Direction, Properties};
use iced::widget::{
    button, column, container, image as iced_image, pick_list, progress_bar, row, scrollable, slider, text,
    text_input, tooltip, Column, Row, Space,
};
use iced::{
    executor, font, theme, Alignment, Application, Background, Color, Command, Element, Font, Length, Subscription,
    Theme,
};

use crate::config::{AppConfig, ControlStyle, DownloadPolicy, ProgressStyle};
use crate::export;
use crate::job::{self, JobEvent, UpscaleRequest};
use crate::logging::{log_error, log_message};
use crate::params::{ParamKind, Parameters};
use crate::progress::Progress;
use crate::source::{ImageSource, IMAGE_EXTENSIONS};
use crate::upscaler::ModelInfo;

const HEADING_FONT: Font = Font {
    weight: font::Weight::Bold,
    ..Font::DEFAULT
};

// Theme colors
const PRIMARY_COLOR: Color = Color::from_rgb(0.204, 0.596, 0.859);
const BACKGROUND_COLOR: Color = Color::from_rgb(0.97, 0.97, 0.98);
const CARD_COLOR: Color = Color::WHITE;
const TEXT_COLOR: Color = Color::from_rgb(0.2, 0.2, 0.3);
const TEXT_SECONDARY: Color = Color::from_rgb(0.4, 0.4, 0.5);
const ERROR_COLOR: Color = Color::from_rgb(0.8, 0.2, 0.2);

#[derive(Debug, Clone)]
pub enum Message {
    BrowseFile,
    FileSelected(Option<PathBuf>),
    ImageLoaded(Result<ImageSource, String>),
    ModelSelected(ModelInfo),
    ParamChanged(ParamKind, f32),
    ParamInput(ParamKind, String),
    ParamSubmitted(ParamKind),
    Upscale,
    Job(u64, JobEvent),
    Download,
    DownloadTargetChosen(Option<PathBuf>),
    Saved(Result<PathBuf, String>),
}

pub struct App {
    config: AppConfig,
    models: Vec<ModelInfo>,
    selected_model: ModelInfo,
    params: Parameters,
    drafts: HashMap<ParamKind, String>,
    param_error: Option<String>,
    original: Option<ImageSource>,
    original_handle: Option<iced_image::Handle>,
    upscaled: Option<ImageSource>,
    upscaled_handle: Option<iced_image::Handle>,
    busy: bool,
    job: Option<UpscaleRequest>,
    next_job_id: u64,
    progress: Progress,
    status_message: String,
}

impl App {
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn original(&self) -> Option<&ImageSource> {
        self.original.as_ref()
    }

    pub fn upscaled(&self) -> Option<&ImageSource> {
        self.upscaled.as_ref()
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn draft(&self, kind: ParamKind) -> &str {
        self.drafts.get(&kind).map(String::as_str).unwrap_or("")
    }

    pub fn param_error(&self) -> Option<&str> {
        self.param_error.as_deref()
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn job(&self) -> Option<&UpscaleRequest> {
        self.job.as_ref()
    }

    pub fn selected_model(&self) -> &ModelInfo {
        &self.selected_model
    }

    pub fn status(&self) -> &str {
        &self.status_message
    }

    pub fn can_upscale(&self) -> bool {
        self.original.is_some() && !self.busy
    }

    /// The image the download button would save, if any.
    pub fn download_source(&self) -> Option<&ImageSource> {
        match self.config.download {
            DownloadPolicy::Result => self.upscaled.as_ref(),
            DownloadPolicy::ResultOrOriginal => self.upscaled.as_ref().or(self.original.as_ref()),
        }
    }

    pub fn can_download(&self) -> bool {
        self.download_source().is_some()
    }

    fn reset_drafts(&mut self) {
        for kind in ParamKind::ALL {
            self.drafts.insert(kind, self.params.get(kind).display_value());
        }
    }

    /// Replaces the original only. A running job keeps going on the image it
    /// was started with, and the last result stays until a new one arrives.
    fn set_original(&mut self, source: ImageSource) {
        let (w, h) = source.dimensions();
        self.status_message = match source.origin() {
            Some(path) => format!("Loaded: {} ({}×{})", path.display(), w, h),
            None => format!("Loaded image ({}×{})", w, h),
        };
        self.original_handle = Some(handle_for(&source));
        self.original = Some(source);
    }

    fn start_upscale(&mut self) {
        let Some(source) = self.original.clone() else {
            return;
        };
        if self.busy {
            return;
        }

        let request = UpscaleRequest {
            id: self.next_job_id,
            source,
            model: self.selected_model.clone(),
            tiling: self.params.tiling(),
            models_dir: self.config.models_dir.clone(),
        };
        self.next_job_id += 1;

        log_message(&format!(
            "Starting upscale #{} (model {}, patch size {}, padding {})",
            request.id, request.model.name, request.tiling.patch_size, request.tiling.padding
        ));
        self.status_message = format!("Upscaling with {}...", request.model.name);
        self.progress = Progress::default();
        self.job = Some(request);
        self.busy = true;
    }

    fn on_job_event(&mut self, id: u64, event: JobEvent) {
        if self.job.as_ref().map(|j| j.id) != Some(id) {
            return;
        }
        match event {
            JobEvent::Started { rows, columns } => {
                self.progress.begin(rows, columns);
            }
            JobEvent::Patches(events) => {
                for event in events {
                    self.progress.record(event);
                }
            }
            JobEvent::Finished(result) => {
                self.busy = false;
                self.job = None;
                match result {
                    Ok(source) => {
                        let (w, h) = source.dimensions();
                        self.status_message = format!("Upscaled to {}×{}", w, h);
                        self.upscaled_handle = Some(handle_for(&source));
                        self.upscaled = Some(source);
                    }
                    Err(e) => {
                        self.status_message = format!("Error: {}", e);
                    }
                }
            }
        }
    }
}

impl Application for App {
    type Executor = executor::Default;
    type Message = Message;
    type Theme = Theme;
    type Flags = AppConfig;

    fn new(config: AppConfig) -> (Self, Command<Message>) {
        let selected_model = config.initial_model();
        let mut app = Self {
            config,
            models: ModelInfo::catalog(),
            selected_model,
            params: Parameters::default(),
            drafts: HashMap::new(),
            param_error: None,
            original: None,
            original_handle: None,
            upscaled: None,
            upscaled_handle: None,
            busy: false,
            job: None,
            next_job_id: 1,
            progress: Progress::default(),
            status_message: "Select an image to begin".to_string(),
        };
        app.reset_drafts();
        (app, Command::none())
    }

    fn title(&self) -> String {
        "Image Upscaler".to_string()
    }

    fn update(&mut self, message: Message) -> Command<Message> {
        match message {
            Message::BrowseFile => {
                if self.busy {
                    return Command::none();
                }
                return Command::perform(
                    async {
                        rfd::AsyncFileDialog::new()
                            .add_filter("Images", &IMAGE_EXTENSIONS)
                            .pick_file()
                            .await
                            .map(|f| f.path().to_path_buf())
                    },
                    Message::FileSelected,
                );
            }
            Message::FileSelected(path) => {
                if let Some(path) = path {
                    self.status_message = format!("Loading: {}", path.display());
                    return Command::perform(
                        async move { ImageSource::from_path(&path).map_err(|e| e.to_string()) },
                        Message::ImageLoaded,
                    );
                }
            }
            Message::ImageLoaded(result) => match result {
                Ok(source) => self.set_original(source),
                Err(e) => {
                    log_error(&format!("Failed to open image: {}", e));
                    self.status_message = format!("Error: {}", e);
                }
            },
            Message::ModelSelected(model) => {
                if !self.busy {
                    self.selected_model = model;
                }
            }
            Message::ParamChanged(kind, value) => {
                self.params.get_mut(kind).clamp(value);
                self.drafts.insert(kind, self.params.get(kind).display_value());
                self.param_error = None;
            }
            Message::ParamInput(kind, input) => {
                self.param_error = self.params.get_mut(kind).parse_and_set(&input).err().map(|e| e.to_string());
                self.drafts.insert(kind, input);
            }
            Message::ParamSubmitted(kind) => {
                self.drafts.insert(kind, self.params.get(kind).display_value());
                self.param_error = None;
            }
            Message::Upscale => self.start_upscale(),
            Message::Job(id, event) => self.on_job_event(id, event),
            Message::Download => {
                if self.can_download() {
                    return Command::perform(
                        async {
                            rfd::AsyncFileDialog::new()
                                .set_file_name(export::default_file_name())
                                .add_filter("PNG", &["png"])
                                .add_filter("JPEG", &["jpg", "jpeg"])
                                .save_file()
                                .await
                                .map(|f| f.path().to_path_buf())
                        },
                        Message::DownloadTargetChosen,
                    );
                }
            }
            Message::DownloadTargetChosen(path) => {
                if let (Some(path), Some(source)) = (path, self.download_source().cloned()) {
                    return Command::perform(
                        async move { export::save_image(&source, &path).map_err(|e| e.to_string()) },
                        Message::Saved,
                    );
                }
            }
            Message::Saved(result) => match result {
                Ok(path) => self.status_message = format!("Saved to: {}", path.display()),
                Err(e) => {
                    log_error(&format!("Failed to save image: {}", e));
                    self.status_message = format!("Error: {}", e);
                }
            },
        }

        Command::none()
    }

    fn subscription(&self) -> Subscription<Message> {
        match &self.job {
            Some(request) if self.busy => job::subscription(request.clone()).map(|(id, event)| Message::Job(id, event)),
            _ => Subscription::none(),
        }
    }

    fn view(&self) -> Element<Message> {
        let header = container(
            column![
                text("Image Upscaler").size(20).font(HEADING_FONT).style(Color::WHITE),
                text("Upscale images patch by patch")
                    .size(11)
                    .style(Color::from_rgba(1.0, 1.0, 1.0, 0.8)),
            ]
            .spacing(4),
        )
        .width(Length::Fill)
        .padding([18, 26])
        .style(theme::Container::Custom(Box::new(GradientContainer)));

        let mut file_btn = button("Browse File").padding(10);
        if !self.busy {
            file_btn = file_btn.on_press(Message::BrowseFile);
        }
        let input_card = card_container(
            column![
                section_title("Input"),
                Space::with_height(8),
                row![
                    file_btn,
                    text(
                        self.original
                            .as_ref()
                            .and_then(|s| s.origin())
                            .and_then(|p| p.to_str())
                            .unwrap_or("No file selected")
                    )
                    .size(14)
                    .style(TEXT_SECONDARY)
                ]
                .spacing(10)
                .align_items(Alignment::Center),
            ]
            .spacing(0),
        );

        let model_picker = pick_list(self.models.clone(), Some(&self.selected_model), Message::ModelSelected)
            .placeholder("Select model");

        let mut settings = column![
            section_title("Settings"),
            Space::with_height(8),
            row![
                text("Model:").size(14).style(TEXT_SECONDARY).width(Length::Fixed(170.0)),
                model_picker
            ]
            .spacing(10)
            .align_items(Alignment::Center),
        ]
        .spacing(8);
        for kind in ParamKind::ALL {
            settings = settings.push(self.param_control(kind));
        }
        if let Some(err) = &self.param_error {
            settings = settings.push(text(err).size(12).style(ERROR_COLOR));
        }
        settings = settings
            .push(Space::with_height(4))
            .push(self.action())
            .push(text(&self.status_message).size(12).style(TEXT_SECONDARY));
        let settings_card = card_container(settings);

        let mut content = column![header, input_card, settings_card].spacing(16);
        if self.original.is_some() {
            content = content.push(self.preview_card());
        }
        if !self.progress.table().is_empty() {
            content = content.push(self.patch_card());
        }
        content = content.push(Space::with_height(20));

        container(scrollable(container(content).width(Length::Fill).padding([6, 14, 6, 6])))
            .width(Length::Fill)
            .height(Length::Fill)
            .style(theme::Container::Custom(Box::new(BackgroundContainer)))
            .into()
    }

    fn theme(&self) -> Theme {
        Theme::Light
    }
}

impl App {
    fn param_control(&self, kind: ParamKind) -> Element<Message> {
        let param = self.params.get(kind);
        let spec = param.spec();

        let control: Element<Message> = match self.config.controls {
            ControlStyle::Slider => row![
                slider(spec.min..=spec.max, param.value(), move |v| Message::ParamChanged(kind, v))
                    .step(spec.step)
                    .width(Length::Fixed(260.0)),
                text(param.display_value()).size(14).style(TEXT_COLOR),
            ]
            .spacing(10)
            .align_items(Alignment::Center)
            .into(),
            ControlStyle::Numeric => text_input(&format!("{} - {}", spec.min, spec.max), self.draft(kind))
                .on_input(move |s| Message::ParamInput(kind, s))
                .on_submit(Message::ParamSubmitted(kind))
                .width(Length::Fixed(120.0))
                .into(),
        };

        row![
            text(kind.to_string()).size(14).style(TEXT_SECONDARY).width(Length::Fixed(170.0)),
            control
        ]
        .spacing(10)
        .align_items(Alignment::Center)
        .into()
    }

    /// Upscale button, or the busy indicator while a job runs.
    fn action(&self) -> Element<Message> {
        if self.busy {
            let pct = self.progress.percentage();
            return match self.config.progress {
                ProgressStyle::Spinner => text("Upscaling...").font(HEADING_FONT).size(14).into(),
                ProgressStyle::Labelled => row![
                    progress_bar(0.0..=100.0, pct as f32)
                        .width(Length::Fixed(260.0))
                        .height(Length::Fixed(12.0)),
                    text(format!("{}%", pct)).size(14).style(TEXT_COLOR),
                    text(format!("{}/{} patches", self.progress.processed(), self.progress.total()))
                        .size(12)
                        .style(TEXT_SECONDARY),
                ]
                .spacing(10)
                .align_items(Alignment::Center)
                .into(),
            };
        }

        let mut btn = button(text("Upscale Image").font(HEADING_FONT).size(14))
            .padding([8, 10])
            .style(theme::Button::Primary);
        if self.can_upscale() {
            btn = btn.on_press(Message::Upscale);
        }
        btn.into()
    }

    fn preview_card(&self) -> Element<Message> {
        let before = image_column("Original", self.original.as_ref(), self.original_handle.as_ref());
        let after: Element<Message> = match (&self.upscaled, &self.upscaled_handle) {
            (Some(_), Some(_)) => image_column("Upscaled", self.upscaled.as_ref(), self.upscaled_handle.as_ref()),
            _ => column![
                text("Upscaled").size(16).font(HEADING_FONT).style(TEXT_COLOR),
                Space::with_height(8),
                container(text("Upscale to see result").style(TEXT_SECONDARY))
                    .width(Length::Fill)
                    .height(Length::Fixed(360.0))
                    .center_x()
                    .center_y()
            ]
            .align_items(Alignment::Center)
            .width(Length::FillPortion(1))
            .into(),
        };

        let mut download_btn = button(text("Download Image").font(HEADING_FONT).size(14))
            .padding([8, 10])
            .style(theme::Button::Primary);
        if self.can_download() {
            download_btn = download_btn.on_press(Message::Download);
        }

        card_container(
            column![
                row![section_title("Preview"), Space::with_width(Length::Fill), download_btn]
                    .align_items(Alignment::Center),
                Space::with_height(16),
                row![before, Space::with_width(20), after].align_items(Alignment::Start),
            ]
            .spacing(0),
        )
    }

    fn patch_card(&self) -> Element<Message> {
        let gap = self.params.spacing.value();
        let rows: Vec<Element<Message>> = self
            .progress
            .table()
            .rows()
            .iter()
            .map(|thumbs| {
                let cells: Vec<Element<Message>> = thumbs
                    .iter()
                    .map(|thumb| {
                        tooltip(
                            iced_image::Image::new(thumb.handle.clone()),
                            text(thumb.label()).size(12),
                            tooltip::Position::FollowCursor,
                        )
                        .style(theme::Container::Box)
                        .into()
                    })
                    .collect();
                Row::with_children(cells).spacing(gap).into()
            })
            .collect();

        let (grid_rows, grid_cols) = self.progress.grid();
        card_container(
            column![
                section_title("Patches"),
                text(format!("{} of {} patches ({}×{})", self.progress.processed(), self.progress.total(), grid_cols, grid_rows))
                    .size(12)
                    .style(TEXT_SECONDARY),
                Space::with_height(8),
                scrollable(Column::with_children(rows).spacing(gap))
                    .direction(Direction::Both {
                        vertical: Properties::default(),
                        horizontal: Properties::default(),
                    })
                    .width(Length::Fill)
                    .height(Length::Fixed(240.0)),
            ]
            .spacing(0),
        )
    }
}

fn handle_for(source: &ImageSource) -> iced_image::Handle {
    let (w, h) = source.dimensions();
    iced_image::Handle::from_pixels(w, h, source.image().to_rgba8().into_raw())
}

fn image_column<'a>(
    title: &'a str,
    source: Option<&ImageSource>,
    handle: Option<&iced_image::Handle>,
) -> Element<'a, Message> {
    let mut col = column![text(title).size(16).font(HEADING_FONT).style(TEXT_COLOR), Space::with_height(8)]
        .align_items(Alignment::Center)
        .width(Length::FillPortion(1));
    if let Some(handle) = handle {
        col = col.push(
            iced_image::Image::new(handle.clone())
                .width(Length::Fill)
                .height(Length::Fixed(360.0)),
        );
    }
    if let Some((w, h)) = source.map(ImageSource::dimensions) {
        col = col
            .push(Space::with_height(8))
            .push(text(format!("{}×{}", w, h)).size(12).style(TEXT_SECONDARY));
    }
    col.into()
}

fn section_title(title: &str) -> Element<'static, Message> {
    text(title).size(14).font(HEADING_FONT).style(TEXT_COLOR).into()
}

fn card_container<'a>(content: impl Into<Element<'a, Message>>) -> Element<'a, Message> {
    container(content)
        .width(Length::Fill)
        .padding(14)
        .style(theme::Container::Custom(Box::new(CardContainer)))
        .into()
}

struct BackgroundContainer;
impl container::StyleSheet for BackgroundContainer {
    type Style = Theme;

    fn appearance(&self, _style: &Self::Style) -> container::Appearance {
        container::Appearance {
            background: Some(Background::Color(BACKGROUND_COLOR)),
            ..Default::default()
        }
    }
}

struct CardContainer;
impl container::StyleSheet for CardContainer {
    type Style = Theme;

    fn appearance(&self, _style: &Self::Style) -> container::Appearance {
        container::Appearance {
            background: Some(Background::Color(CARD_COLOR)),
            border: iced::Border {
                color: Color::from_rgba(0.0, 0.0, 0.0, 0.08),
                width: 1.0,
                radius: 12.0.into(),
            },
            ..Default::default()
        }
    }
}

struct GradientContainer;
impl container::StyleSheet for GradientContainer {
    type Style = Theme;

    fn appearance(&self, _style: &Self::Style) -> container::Appearance {
        container::Appearance {
            background: Some(Background::Color(PRIMARY_COLOR)),
            ..Default::default()
        }
    }
}
