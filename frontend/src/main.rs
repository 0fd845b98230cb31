mod api;
mod components;
mod ticker;

use api::{HttpClassifier, HttpRecordStore, TokenSession, capture_token_from_url, stored_token};
use components::handlers;
use components::header::render_header;
use components::history::render_history;
use components::preview_area::render_preview_area;
use components::results::render_results;
use components::stats_cards::render_stats_cards;
use components::upload_section::render_upload_section;
use components::utils::render_notice;
use gloo_events::EventListener;
use gloo_file::{File as GlooFile, ObjectUrl};
use shared::api::UserInfo;
use shared::progress::{CancelHandle, ProgressSchedule};
use shared::{
    AnalysisController, ControllerState, ImageSelection, PlantCategory, PredictionRecord,
    StatsSnapshot, StatsUpdate, ValidationRejected,
};
use std::sync::Arc;
use ticker::GlooTicker;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{ClipboardEvent, DragEvent};
use yew::prelude::*;

pub struct Preview {
    file_name: String,
    size_label: String,
    url: ObjectUrl,
}

pub enum Msg {
    // File operations
    FilesAdded(Vec<GlooFile>),
    FileLoaded(ImageSelection, ObjectUrl),
    SetCategory(Option<PlantCategory>),

    // Analysis operations
    Analyze,
    Progress(u8),
    AnalysisFinished(Box<AnalysisController>, Option<ValidationRejected>),
    Cancel,
    Reset,

    // History and stats
    RefreshStats,
    StatsRefreshed(Result<StatsUpdate, String>),

    // Session
    UserLoaded(Option<UserInfo>),
    SignOut,

    // UI states
    SetNotice(Option<String>),
    SetDragging(bool),

    // Input events
    HandleDrop(DragEvent),
    HandlePaste(ClipboardEvent),
}

pub struct Model {
    /// `None` while an analysis task has it.
    controller: Option<AnalysisController>,
    analyzing: bool,
    refreshing: bool,
    /// Stats that arrived while the controller was lent out.
    pending_stats: Option<StatsUpdate>,
    progress: u8,
    cancel: CancelHandle,
    preview: Option<Preview>,
    stats: Option<StatsSnapshot>,
    recent: Vec<PredictionRecord>,
    user: Option<UserInfo>,
    notice: Option<String>,
    is_dragging: bool,
    _paste_listener: Option<EventListener>,
}

impl Model {
    /// `None` while the controller is lent out.
    fn state(&self) -> Option<&ControllerState> {
        self.controller.as_ref().map(|c| c.state())
    }

    fn category(&self) -> Option<PlantCategory> {
        self.controller.as_ref().and_then(|c| c.category())
    }

    fn is_editable(&self) -> bool {
        matches!(
            self.state(),
            Some(ControllerState::Idle) | Some(ControllerState::Selected)
        )
    }

    fn can_submit(&self) -> bool {
        self.controller.as_ref().is_some_and(|c| c.can_submit())
    }

    /// Takes the controller back from the analysis task, keeping a copy of
    /// its stats so the cards stay visible while it is lent out again.
    fn restore(&mut self, mut controller: AnalysisController) {
        if let Some(update) = self.pending_stats.take() {
            // A successful attempt already reloaded stats after its insert.
            if !matches!(controller.state(), ControllerState::Result(_)) {
                controller.apply_stats(update);
            }
        }
        self.controller = Some(controller);
        self.analyzing = false;
        self.sync_stats();
    }

    fn sync_stats(&mut self) {
        if let Some(controller) = &self.controller {
            self.stats = controller.stats().cloned();
            self.recent = controller.recent().to_vec();
        }
    }
}

impl Component for Model {
    type Message = Msg;
    type Properties = ();

    fn create(ctx: &Context<Self>) -> Self {
        capture_token_from_url();

        let link = ctx.link().clone();
        let controller = AnalysisController::new(
            Arc::new(HttpClassifier),
            Arc::new(HttpRecordStore),
            Arc::new(TokenSession),
        )
        .with_ticker(Arc::new(GlooTicker), ProgressSchedule::default())
        .on_progress(move |progress| link.send_message(Msg::Progress(progress)));
        let cancel = controller.cancel_handle();

        let paste_listener = web_sys::window().map(|window| {
            let link = ctx.link().clone();
            EventListener::new(&window, "paste", move |event| {
                if let Some(clipboard_event) = event.dyn_ref::<ClipboardEvent>() {
                    link.send_message(Msg::HandlePaste(clipboard_event.clone()));
                }
            })
        });

        if let Some(token) = stored_token() {
            let link = ctx.link().clone();
            spawn_local(async move {
                match api::fetch_user_info(&token).await {
                    Ok(info) => link.send_message(Msg::UserLoaded(Some(info))),
                    Err(e) => {
                        log::warn!("Stored token rejected: {}", e);
                        api::clear_token();
                        link.send_message(Msg::UserLoaded(None));
                    }
                }
            });
        }

        Self {
            controller: Some(controller),
            analyzing: false,
            refreshing: false,
            pending_stats: None,
            progress: 0,
            cancel,
            preview: None,
            stats: None,
            recent: Vec::new(),
            user: None,
            notice: None,
            is_dragging: false,
            _paste_listener: paste_listener,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            // File operations
            Msg::FilesAdded(files) => handlers::handle_files_added(self, ctx, files),
            Msg::FileLoaded(selection, url) => handlers::handle_file_loaded(self, selection, url),
            Msg::SetCategory(category) => handlers::handle_set_category(self, category),

            // Analysis operations
            Msg::Analyze => handlers::handle_analyze(self, ctx),
            Msg::Progress(progress) => {
                self.progress = progress;
                true
            }
            Msg::AnalysisFinished(controller, rejected) => {
                handlers::handle_analysis_finished(self, *controller, rejected)
            }
            Msg::Cancel => {
                log::info!("Cancelling running analysis");
                self.cancel.cancel();
                false
            }
            Msg::Reset => handlers::handle_reset(self),

            // History and stats
            Msg::RefreshStats => handlers::handle_refresh_stats(self, ctx),
            Msg::StatsRefreshed(update) => handlers::handle_stats_refreshed(self, update),

            // Session
            Msg::UserLoaded(user) => {
                let signed_in = user.is_some();
                self.user = user;
                if signed_in {
                    ctx.link().send_message(Msg::RefreshStats);
                }
                true
            }
            Msg::SignOut => {
                api::clear_token();
                self.user = None;
                if let Some(window) = web_sys::window() {
                    let _ = window.location().reload();
                }
                true
            }

            // UI states
            Msg::SetNotice(notice) => {
                self.notice = notice;
                true
            }
            Msg::SetDragging(is_dragging) => {
                self.is_dragging = is_dragging;
                true
            }

            // Input events
            Msg::HandleDrop(event) => handlers::handle_drop(self, ctx, event),
            Msg::HandlePaste(event) => handlers::handle_paste(self, ctx, event),
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        html! {
            <div class="container">
                { render_header(self, ctx) }

                <main class="main-content">
                    { render_stats_cards(self) }
                    { render_upload_section(self, ctx) }
                    { render_preview_area(self) }
                    { render_notice(self) }
                    { render_results(self, ctx) }
                    { render_history(self) }
                </main>

                <footer class="app-footer">
                    <p>{"Plant Disease Analysis | Fullstack Rust WASM"}</p>
                </footer>
            </div>
        }
    }
}

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("App starting...");
    yew::Renderer::<Model>::new().render();
}
