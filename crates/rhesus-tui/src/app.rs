use ratatui::widgets::ListState;
use std::path::PathBuf;

use rhesus_core::chat::{ChatOrchestrator, PendingExchange};
use rhesus_core::config::Config;
use rhesus_core::directive::RenderNode;
use rhesus_core::prompt::GREETING;
use rhesus_core::provider::{LlmClient, Provider};
use rhesus_core::state::{Conversation, MessageContent};
use rhesus_core::structure::{
    FetchError, RcsbClient, SceneRecorder, SequenceView, StructureRequest, StructureViewer,
};

use crate::command::{self, Command};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStatus {
    Idle,
    InProgress,
    Saved(PathBuf),
}

pub enum WidgetKind {
    Structure {
        viewer: StructureViewer,
        scene: SceneRecorder,
    },
    Sequence(SequenceView),
    Download {
        filename: String,
        structure_id: String,
        status: DownloadStatus,
    },
    Preformatted {
        title: String,
        text: String,
    },
}

/// A widget attached to one message
pub struct Widget {
    pub message_id: String,
    pub kind: WidgetKind,
}

impl Widget {
    pub fn title(&self) -> String {
        match &self.kind {
            WidgetKind::Structure { viewer, .. } => format!("Structure {}", viewer.request()),
            WidgetKind::Sequence(view) => {
                format!("Sequence {}:{}", view.structure_id(), view.chain())
            }
            WidgetKind::Download { filename, .. } => format!("Download {}", filename),
            WidgetKind::Preformatted { title, .. } => title.clone(),
        }
    }
}

/// Background work requested by a state change
#[derive(Clone)]
pub enum Job {
    Ask {
        pending: PendingExchange,
        client: LlmClient,
    },
    FetchStructure {
        widget: usize,
        generation: u64,
        structure_id: String,
    },
    Download {
        widget: usize,
        structure_id: String,
        filename: String,
    },
    ListModels(Provider),
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Conversation
    pub chat: ChatOrchestrator,
    pub query_input: String,
    pub query_cursor: usize, // cursor position in query_input
    pub query_scroll: u16,
    pub query_chat_height: u16, // Height of chat area for scroll calculations
    pub query_chat_width: u16,  // Width of chat area for wrap calculations

    // Widgets, in conversation order
    pub widgets: Vec<Widget>,
    pub selected_widget: Option<usize>,
    pub widget_scroll: u16,
    widgets_synced: usize,

    // Collaborators
    pub config: Config,
    pub structures: RcsbClient,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Model picker state
    pub show_model_picker: bool,
    pub available_models: Vec<String>,
    pub model_picker_state: ListState,
    pub selected_model: String,

    // Provider state
    pub current_provider: Provider,
    pub show_provider_picker: bool,
    pub provider_picker_state: ListState,
}

impl App {
    pub fn new(config: Config) -> Self {
        let structures = RcsbClient::new(&config.structure_base_url);

        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            chat: ChatOrchestrator::new(Conversation::with_greeting(GREETING)),
            query_input: String::new(),
            query_cursor: 0,
            query_scroll: 0,
            query_chat_height: 0,
            query_chat_width: 0,
            widgets: Vec::new(),
            selected_widget: None,
            widget_scroll: 0,
            widgets_synced: 0,
            current_provider: config.provider(),
            selected_model: config.model(),
            structures,
            config,
            animation_frame: 0,
            show_model_picker: false,
            available_models: Vec::new(),
            model_picker_state: ListState::default(),
            show_provider_picker: false,
            provider_picker_state: ListState::default(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.chat.is_awaiting_reply()
    }

    /// Handle the input box contents: a slash command or a chat message
    pub fn submit_input(&mut self) -> Vec<Job> {
        let input = self.query_input.trim().to_string();
        if input.is_empty() {
            return Vec::new();
        }

        if let Some(parsed) = command::parse(&input) {
            self.clear_input();
            match parsed {
                Ok(Command::Open { caption, node }) => {
                    self.chat.push_system(MessageContent::Rendered {
                        raw: input,
                        nodes: vec![RenderNode::Text(caption), node],
                    });
                }
                Ok(Command::Help) => {
                    self.chat
                        .push_system(MessageContent::Text(command::HELP.to_string()));
                }
                Err(usage) => {
                    self.chat.push_system(MessageContent::Text(usage));
                }
            }
            self.scroll_query_to_bottom();
            return self.sync_widgets();
        }

        // Input stays put while a reply is pending
        if self.is_loading() {
            return Vec::new();
        }

        let client = match LlmClient::new(self.current_provider, &self.selected_model, &self.config)
        {
            Ok(client) => client,
            Err(error) => {
                tracing::warn!("cannot start exchange: {}", error);
                self.clear_input();
                if let Some(pending) = self.chat.submit(&input) {
                    let notice = self.current_provider.missing_key_message();
                    self.chat.resolve_with_notice(pending.exchange, &notice);
                }
                self.scroll_query_to_bottom();
                return Vec::new();
            }
        };

        let Some(pending) = self.chat.submit(&input) else {
            return Vec::new();
        };
        self.clear_input();
        self.scroll_query_to_bottom();
        vec![Job::Ask { pending, client }]
    }

    pub fn apply_reply(&mut self, exchange: u64, reply: anyhow::Result<String>) -> Vec<Job> {
        if !self.chat.resolve(exchange, reply) {
            return Vec::new();
        }
        self.scroll_query_to_bottom();
        self.sync_widgets()
    }

    /// Create widgets for messages appended since the last call
    pub fn sync_widgets(&mut self) -> Vec<Job> {
        let mut jobs = Vec::new();
        let messages = self.chat.conversation().messages();

        let mut created = Vec::new();
        for message in &messages[self.widgets_synced.min(messages.len())..] {
            for node in message.content.widgets() {
                created.push((message.id.clone(), node.clone()));
            }
        }
        self.widgets_synced = messages.len();

        for (message_id, node) in created {
            let index = self.widgets.len();
            let kind = match node {
                RenderNode::Structure(request) => {
                    let viewer = StructureViewer::new(request);
                    jobs.push(Job::FetchStructure {
                        widget: index,
                        generation: viewer.generation(),
                        structure_id: viewer.request().structure_id.clone(),
                    });
                    WidgetKind::Structure {
                        viewer,
                        scene: SceneRecorder::new(),
                    }
                }
                RenderNode::Sequence {
                    structure_id,
                    chain,
                } => {
                    let view = SequenceView::new(&structure_id, &chain);
                    jobs.push(Job::FetchStructure {
                        widget: index,
                        generation: view.generation(),
                        structure_id: view.structure_id().to_string(),
                    });
                    WidgetKind::Sequence(view)
                }
                RenderNode::Download {
                    filename,
                    structure_id,
                } => WidgetKind::Download {
                    filename,
                    structure_id,
                    status: DownloadStatus::Idle,
                },
                RenderNode::Preformatted { title, text } => WidgetKind::Preformatted { title, text },
                RenderNode::Text(_) => continue,
            };
            self.widgets.push(Widget { message_id, kind });
            // Newest widget gets the detail pane
            self.selected_widget = Some(index);
            self.widget_scroll = 0;
        }

        jobs
    }

    /// Route fetched structure text to its widget
    pub fn apply_structure(
        &mut self,
        widget: usize,
        generation: u64,
        result: Result<String, FetchError>,
    ) {
        let Some(widget) = self.widgets.get_mut(widget) else {
            return;
        };
        match &mut widget.kind {
            WidgetKind::Structure { viewer, scene } => {
                viewer.apply(generation, result, scene);
            }
            WidgetKind::Sequence(view) => {
                view.apply(generation, result);
            }
            _ => {}
        }
    }

    pub fn apply_download(&mut self, widget: usize, path: Option<PathBuf>) {
        if let Some(Widget {
            kind: WidgetKind::Download { status, .. },
            ..
        }) = self.widgets.get_mut(widget)
        {
            // A failed download is only logged
            *status = match path {
                Some(path) => DownloadStatus::Saved(path),
                None => DownloadStatus::Idle,
            };
        }
    }

    pub fn select_next_widget(&mut self) {
        let len = self.widgets.len();
        if len > 0 {
            let i = self.selected_widget.map(|i| (i + 1) % len).unwrap_or(0);
            self.selected_widget = Some(i);
            self.widget_scroll = 0;
        }
    }

    pub fn select_prev_widget(&mut self) {
        let len = self.widgets.len();
        if len > 0 {
            let i = self
                .selected_widget
                .map(|i| (i + len - 1) % len)
                .unwrap_or(len - 1);
            self.selected_widget = Some(i);
            self.widget_scroll = 0;
        }
    }

    pub fn selected(&self) -> Option<&Widget> {
        self.selected_widget.and_then(|i| self.widgets.get(i))
    }

    /// Cycle the presentation mode of the selected structure widget
    pub fn cycle_selected_mode(&mut self) -> Vec<Job> {
        let Some(index) = self.selected_widget else {
            return Vec::new();
        };
        let Some(Widget {
            kind: WidgetKind::Structure { viewer, scene },
            ..
        }) = self.widgets.get_mut(index)
        else {
            return Vec::new();
        };
        let Some(mode) = viewer.request().mode.cycled() else {
            return Vec::new();
        };

        let request = StructureRequest::with_mode(&viewer.request().structure_id, mode);
        match viewer.set_request(request, scene) {
            Some(generation) => vec![Job::FetchStructure {
                widget: index,
                generation,
                structure_id: viewer.request().structure_id.clone(),
            }],
            None => Vec::new(),
        }
    }

    /// Retry a failed fetch for the selected widget
    pub fn reload_selected(&mut self) -> Vec<Job> {
        let Some(index) = self.selected_widget else {
            return Vec::new();
        };
        let job = match self.widgets.get_mut(index).map(|w| &mut w.kind) {
            Some(WidgetKind::Structure { viewer, scene }) => Job::FetchStructure {
                widget: index,
                generation: viewer.restart(scene),
                structure_id: viewer.request().structure_id.clone(),
            },
            Some(WidgetKind::Sequence(view)) => Job::FetchStructure {
                widget: index,
                generation: view.restart(),
                structure_id: view.structure_id().to_string(),
            },
            _ => return Vec::new(),
        };
        vec![job]
    }

    /// Start the download offered by the selected widget
    pub fn download_selected(&mut self) -> Vec<Job> {
        let Some(index) = self.selected_widget else {
            return Vec::new();
        };
        match self.widgets.get_mut(index).map(|w| &mut w.kind) {
            Some(WidgetKind::Download {
                filename,
                structure_id,
                status,
            }) if *status != DownloadStatus::InProgress => {
                *status = DownloadStatus::InProgress;
                vec![Job::Download {
                    widget: index,
                    structure_id: structure_id.clone(),
                    filename: filename.clone(),
                }]
            }
            _ => Vec::new(),
        }
    }

    fn clear_input(&mut self) {
        self.query_input.clear();
        self.query_cursor = 0;
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Scroll chat to bottom so the newest message is visible
    pub fn scroll_query_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.query_chat_width > 0 {
            self.query_chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in self.chat.conversation().messages() {
            total_lines = total_lines.saturating_add(1); // Author line
            for node in msg.content.nodes() {
                match node {
                    RenderNode::Text(text) => {
                        for line in text.lines() {
                            // Use character count, not byte length, for proper UTF-8 handling
                            let char_count = line.chars().count();
                            let wrapped = u16::try_from(char_count / wrap_width + 1).unwrap_or(u16::MAX);
                            total_lines = total_lines.saturating_add(wrapped);
                        }
                    }
                    _ => total_lines = total_lines.saturating_add(1), // Widget reference line
                }
            }
            total_lines = total_lines.saturating_add(1); // Blank line after message
        }

        if self.is_loading() {
            total_lines = total_lines.saturating_add(2); // Author line + "Thinking..."
        }

        let visible_height = if self.query_chat_height > 0 {
            self.query_chat_height
        } else {
            20
        };

        if total_lines > visible_height {
            self.query_scroll = total_lines.saturating_sub(visible_height);
        }
    }

    pub fn scroll_up(&mut self) {
        self.query_scroll = self.query_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        self.query_scroll = self.query_scroll.saturating_add(1);
    }

    // Model picker methods
    pub fn open_model_picker(&mut self) -> Vec<Job> {
        self.show_model_picker = true;
        self.available_models.clear();
        self.model_picker_state.select(None);
        vec![Job::ListModels(self.current_provider)]
    }

    pub fn set_available_models(&mut self, models: Vec<String>) {
        let selected = models
            .iter()
            .position(|m| *m == self.selected_model)
            .or(if models.is_empty() { None } else { Some(0) });
        self.available_models = models;
        self.model_picker_state.select(selected);
    }

    pub fn model_picker_nav_down(&mut self) {
        let len = self.available_models.len();
        if len > 0 {
            let i = self.model_picker_state.selected().unwrap_or(0);
            self.model_picker_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn model_picker_nav_up(&mut self) {
        let i = self.model_picker_state.selected().unwrap_or(0);
        self.model_picker_state.select(Some(i.saturating_sub(1)));
    }

    pub fn select_model(&mut self) {
        if let Some(i) = self.model_picker_state.selected() {
            if let Some(model) = self.available_models.get(i) {
                self.selected_model = model.clone();
                self.show_model_picker = false;
                self.config.default_model = Some(self.selected_model.clone());
                self.save_config();
            }
        }
    }

    // Provider picker methods
    pub fn open_provider_picker(&mut self) {
        let current = Provider::all()
            .iter()
            .position(|p| *p == self.current_provider);
        self.provider_picker_state.select(current);
        self.show_provider_picker = true;
    }

    pub fn provider_picker_nav_down(&mut self) {
        let len = Provider::all().len();
        let i = self.provider_picker_state.selected().unwrap_or(0);
        self.provider_picker_state.select(Some((i + 1).min(len - 1)));
    }

    pub fn provider_picker_nav_up(&mut self) {
        let i = self.provider_picker_state.selected().unwrap_or(0);
        self.provider_picker_state.select(Some(i.saturating_sub(1)));
    }

    pub fn select_provider(&mut self) {
        let Some(provider) = self
            .provider_picker_state
            .selected()
            .and_then(|i| Provider::all().get(i).copied())
        else {
            return;
        };

        self.show_provider_picker = false;
        if provider == self.current_provider {
            return;
        }

        self.current_provider = provider;
        self.selected_model = provider.default_model().to_string();
        self.config.provider = Some(provider.as_str().to_string());
        self.config.default_model = None;
        self.save_config();
    }

    /// Whether a key is available for `provider`
    pub fn has_key(&self, provider: Provider) -> bool {
        provider == Provider::Ollama || self.config.api_key(provider).is_some()
    }

    fn save_config(&self) {
        if let Err(e) = self.config.save() {
            tracing::warn!("could not save config: {}", e);
        }
    }
}
