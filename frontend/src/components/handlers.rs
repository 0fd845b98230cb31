use super::super::{Model, Msg, Preview};
use super::utils::extract_image_files;
use gloo_file::{File as GlooFile, ObjectUrl};
use shared::{
    AnalysisController, ControllerState, ImageSelection, PlantCategory, StatsUpdate,
    ValidationRejected,
};
use wasm_bindgen_futures::spawn_local;
use web_sys::{ClipboardEvent, DragEvent, FileList};
use yew::prelude::*;

pub fn handle_files_added(model: &mut Model, ctx: &Context<Model>, files: Vec<GlooFile>) -> bool {
    if !model.is_editable() {
        model.notice = Some("Finish or reset the current analysis first.".into());
        return true;
    }
    // Only one image is analyzed at a time; the last one added wins.
    let Some(file) = files.into_iter().last() else {
        return false;
    };

    let link = ctx.link().clone();
    spawn_local(async move {
        match gloo_file::futures::read_as_bytes(&file).await {
            Ok(bytes) => {
                let selection = ImageSelection::new(file.name(), file.raw_mime_type(), bytes);
                let url = ObjectUrl::from(file);
                link.send_message(Msg::FileLoaded(selection, url));
            }
            Err(e) => {
                log::error!("Failed to read {}: {}", file.name(), e);
                link.send_message(Msg::SetNotice(Some(format!(
                    "Could not read {}",
                    file.name()
                ))));
            }
        }
    });
    false
}

pub fn handle_file_loaded(model: &mut Model, selection: ImageSelection, url: ObjectUrl) -> bool {
    let Some(controller) = model.controller.as_mut() else {
        return false;
    };
    let file_name = selection.file_name.clone();
    let size_label = selection.size_label();

    match controller.select_file(selection) {
        Ok(()) => {
            model.preview = Some(Preview {
                file_name,
                size_label,
                url,
            });
            model.notice = None;
            true
        }
        Err(rejected) => {
            log::debug!("Selection of {} ignored: {}", file_name, rejected);
            false
        }
    }
}

pub fn handle_set_category(model: &mut Model, category: Option<PlantCategory>) -> bool {
    match model.controller.as_mut().map(|c| c.set_category(category)) {
        Some(Ok(())) => true,
        Some(Err(rejected)) => {
            log::debug!("Category change ignored: {}", rejected);
            false
        }
        None => false,
    }
}

pub fn handle_analyze(model: &mut Model, ctx: &Context<Model>) -> bool {
    if !model.can_submit() {
        return false;
    }
    let Some(mut controller) = model.controller.take() else {
        return false;
    };
    model.analyzing = true;
    model.progress = 0;
    model.notice = None;

    let link = ctx.link().clone();
    spawn_local(async move {
        let rejected = controller.submit().await.err();
        if let ControllerState::Result(record) = controller.state() {
            log::info!("Analysis stored as {}", record.id);
            if let Err(e) = controller.refresh_stats().await {
                log::warn!("Failed to refresh stats after analysis: {}", e);
            }
        }
        link.send_message(Msg::AnalysisFinished(Box::new(controller), rejected));
    });
    true
}

pub fn handle_analysis_finished(
    model: &mut Model,
    controller: AnalysisController,
    rejected: Option<ValidationRejected>,
) -> bool {
    if let Some(rejected) = rejected {
        model.notice = Some(rejected.to_string());
    }
    // A cancelled attempt comes back idle with nothing selected.
    if matches!(controller.state(), ControllerState::Idle) {
        model.preview = None;
    }
    model.restore(controller);
    model.progress = 0;
    true
}

pub fn handle_reset(model: &mut Model) -> bool {
    let Some(controller) = model.controller.as_mut() else {
        return false;
    };
    controller.reset();
    model.preview = None;
    model.notice = None;
    true
}

pub fn handle_refresh_stats(model: &mut Model, ctx: &Context<Model>) -> bool {
    let Some(loader) = model.controller.as_ref().map(|c| c.stats_loader()) else {
        return false;
    };
    model.refreshing = true;

    let link = ctx.link().clone();
    spawn_local(async move {
        let update = loader.load().await.map_err(|e| {
            log::warn!("Failed to refresh stats: {}", e);
            e.to_string()
        });
        link.send_message(Msg::StatsRefreshed(update));
    });
    true
}

pub fn handle_stats_refreshed(model: &mut Model, update: Result<StatsUpdate, String>) -> bool {
    model.refreshing = false;
    match update {
        Ok(update) => match model.controller.as_mut() {
            Some(controller) => {
                controller.apply_stats(update);
                model.sync_stats();
            }
            None => {
                model.stats = Some(update.snapshot.clone());
                model.recent = update.recent.clone();
                model.pending_stats = Some(update);
            }
        },
        Err(error) => model.notice = Some(error),
    }
    true
}

pub fn handle_drop(model: &mut Model, ctx: &Context<Model>, event: DragEvent) -> bool {
    event.prevent_default();
    model.is_dragging = false;

    if let Some(data_transfer) = event.data_transfer() {
        if let Some(file_list) = data_transfer.files() {
            process_file_list(ctx, file_list);
        }
    }

    true
}

pub fn handle_paste(_model: &mut Model, ctx: &Context<Model>, event: ClipboardEvent) -> bool {
    if let Some(data_transfer) = event.clipboard_data() {
        if let Some(file_list) = data_transfer.files() {
            if file_list.length() > 0 {
                event.prevent_default();
                process_file_list(ctx, file_list);
                return true;
            }
        }
    }
    false
}

fn process_file_list(ctx: &Context<Model>, file_list: FileList) {
    let files = extract_image_files(&file_list);
    if files.is_empty() {
        log::debug!("Ignoring {} non-image file(s)", file_list.length());
    } else {
        ctx.link().send_message(Msg::FilesAdded(files));
    }
}
